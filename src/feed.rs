//! Listing and ranking of memes, templates and communities.
//!
//! Every listing goes through the same steps: normalise the query, resolve
//! the optional community scope, fetch the matching rows, sort them under a
//! total order and cut the requested page. The orderings always end in
//! `created_at` then `id` (both descending), so equal keys never leave the
//! order up to the backend and adjacent pages neither overlap nor skip.

use crate::communities::is_lookup_candidate;
use crate::domain::{CommunityRepository, MemeRepository, TemplateRepository};
use crate::errors::ServiceError;
use crate::models::{Community, Meme, Template};
use crate::store::StoreHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_COUNT: usize = 10;
/// Largest accepted `count` is one below this.
pub const COUNT_LIMIT: i64 = 100;

/// Epoch offset and time scale of the hot score: a meme posted 12.5 hours
/// later needs ten times the votes to rank level.
const HOT_EPOCH_SECS: f64 = 1_134_028_003.0;
const HOT_DECAY_SECS: f64 = 45_000.0;

/// A sort mode accepted by one kind of listing.
pub trait SortMode: Copy + Sized {
    const DEFAULT: Self;

    fn parse(raw: &str) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemeSort {
    New,
    Top,
    Hot,
}

impl SortMode for MemeSort {
    const DEFAULT: Self = MemeSort::Hot;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "new" => Some(MemeSort::New),
            "top" => Some(MemeSort::Top),
            "hot" => Some(MemeSort::Hot),
            _ => None,
        }
    }
}

/// Sort modes for templates and communities, which have no `hot` ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankSort {
    New,
    Top,
}

impl SortMode for RankSort {
    const DEFAULT: Self = RankSort::Top;

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "new" => Some(RankSort::New),
            "top" => Some(RankSort::Top),
            _ => None,
        }
    }
}

/// Raw listing parameters as they arrive on the query string.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub count: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<S> {
    pub sort: S,
    pub count: usize,
    pub offset: usize,
}

impl<S: SortMode> PageRequest<S> {
    pub fn from_query(query: &ListQuery) -> Self {
        Self {
            sort: normalize_sort(query.sort.as_deref()),
            count: normalize_count(query.count.as_deref()),
            offset: normalize_offset(query.offset.as_deref()),
        }
    }
}

pub fn normalize_sort<S: SortMode>(raw: Option<&str>) -> S {
    raw.and_then(S::parse).unwrap_or(S::DEFAULT)
}

/// Reads the leading integer of `raw`, ignoring anything after the digits:
/// `"12abc"` is 12 and `"5.0"` is 5. Overlong digit runs saturate.
fn leading_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, unsigned) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    let digits = &unsigned[..end];
    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// Accepts `0 < count < 100`; anything else, unparsable included, is 10.
pub fn normalize_count(raw: Option<&str>) -> usize {
    raw.and_then(leading_integer)
        .filter(|count| (1..COUNT_LIMIT).contains(count))
        .and_then(|count| usize::try_from(count).ok())
        .unwrap_or(DEFAULT_COUNT)
}

/// Negative or unparsable offsets start from the beginning.
pub fn normalize_offset(raw: Option<&str>) -> usize {
    raw.and_then(leading_integer)
        .map(|offset| usize::try_from(offset).unwrap_or(if offset < 0 { 0 } else { usize::MAX }))
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the whole filtered set, independent of the page window.
    pub total_count: usize,
}

/// Sorts `items` with `compare` and keeps the `[offset, offset + count)` window.
pub fn paginate<T, F>(mut items: Vec<T>, compare: F, count: usize, offset: usize) -> Page<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let total_count = items.len();
    items.sort_by(compare);
    let items = items.into_iter().skip(offset).take(count).collect();
    Page { items, total_count }
}

/// Hot score: order of magnitude of the net vote plus a linear recency bonus.
///
/// Strictly increasing in `net_vote` for a fixed creation time (the `+ 1`
/// keeps -1, 0 and +1 apart) and increasing in creation time for a fixed
/// vote. It depends on nothing but the meme.
pub fn hot_score(net_vote: i64, created_at: DateTime<Utc>) -> f64 {
    let magnitude = (net_vote.unsigned_abs() as f64 + 1.0).log10();
    let sign = net_vote.signum() as f64;
    let seconds = created_at.timestamp_millis() as f64 / 1000.0;
    sign * magnitude + (seconds - HOT_EPOCH_SECS) / HOT_DECAY_SECS
}

fn newest_first(a_created: DateTime<Utc>, a_id: i64, b_created: DateTime<Utc>, b_id: i64) -> Ordering {
    b_created.cmp(&a_created).then_with(|| b_id.cmp(&a_id))
}

pub fn compare_memes(sort: MemeSort, a: &Meme, b: &Meme) -> Ordering {
    let primary = match sort {
        MemeSort::New => Ordering::Equal,
        MemeSort::Top => b.net_vote.cmp(&a.net_vote),
        MemeSort::Hot => hot_score(b.net_vote, b.created_at)
            .total_cmp(&hot_score(a.net_vote, a.created_at))
            // Scores of nearby large votes can round to the same f64.
            .then_with(|| b.net_vote.cmp(&a.net_vote)),
    };
    primary.then_with(|| newest_first(a.created_at, a.id, b.created_at, b.id))
}

pub fn compare_templates(sort: RankSort, a: &Template, b: &Template) -> Ordering {
    let primary = match sort {
        RankSort::New => Ordering::Equal,
        RankSort::Top => b.usage_count.cmp(&a.usage_count),
    };
    primary.then_with(|| newest_first(a.created_at, a.id, b.created_at, b.id))
}

pub fn compare_communities(sort: RankSort, a: &Community, b: &Community) -> Ordering {
    let primary = match sort {
        RankSort::New => Ordering::Equal,
        RankSort::Top => b.favourites_count.cmp(&a.favourites_count),
    };
    primary.then_with(|| newest_first(a.created_at, a.id, b.created_at, b.id))
}

#[derive(Clone)]
pub struct FeedEngine {
    store: StoreHandle,
}

impl FeedEngine {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Looks up a scope by case-insensitive name. A missing community fails
    /// the whole listing rather than producing an empty page.
    pub async fn resolve_scope(&self, name: Option<&str>) -> Result<Option<Community>, ServiceError> {
        let Some(name) = name else {
            return Ok(None);
        };
        let community = if is_lookup_candidate(name) {
            self.store
                .call("find the community", self.store.store().find_community_by_name(name))
                .await?
        } else {
            None
        };
        match community {
            Some(community) => Ok(Some(community)),
            None => {
                tracing::debug!(community = %name, "Listing scope not found");
                Err(ServiceError::NotFound { resource: "community" })
            }
        }
    }

    pub async fn list_memes(
        &self,
        scope: Option<&str>,
        request: PageRequest<MemeSort>,
    ) -> Result<Page<Meme>, ServiceError> {
        let community_id = self.resolve_scope(scope).await?.map(|c| c.id);
        let memes = self
            .store
            .call("list the memes", self.store.store().list_memes(community_id))
            .await?;
        let page = paginate(memes, |a, b| compare_memes(request.sort, a, b), request.count, request.offset);
        tracing::debug!(?community_id, sort = ?request.sort, total = page.total_count, size = page.items.len(), "Listed memes");
        Ok(page)
    }

    pub async fn list_templates(
        &self,
        scope: Option<&str>,
        request: PageRequest<RankSort>,
    ) -> Result<Page<Template>, ServiceError> {
        let community_id = self.resolve_scope(scope).await?.map(|c| c.id);
        let templates = self
            .store
            .call("list the templates", self.store.store().list_templates(community_id))
            .await?;
        Ok(paginate(
            templates,
            |a, b| compare_templates(request.sort, a, b),
            request.count,
            request.offset,
        ))
    }

    pub async fn list_communities(&self, request: PageRequest<RankSort>) -> Result<Page<Community>, ServiceError> {
        let communities = self
            .store
            .call("list the communities", self.store.store().list_communities())
            .await?;
        Ok(paginate(
            communities,
            |a, b| compare_communities(request.sort, a, b),
            request.count,
            request.offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommunityRepository, MemeRepository, VoteRepository};
    use crate::models::{NewCommunity, NewMeme, VoteDirection};
    use crate::test_support::{meme_at, seeded_handle};
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn ids(memes: &[Meme]) -> Vec<i64> {
        memes.iter().map(|m| m.id).collect()
    }

    fn community_at(id: i64, favourites_count: i64, created_at: DateTime<Utc>) -> Community {
        Community {
            id,
            name: format!("community{}", id),
            title: format!("Community {}", id),
            description: String::new(),
            sidebar: String::new(),
            nsfw: false,
            creator_id: 1,
            favourites_count,
            created_at,
        }
    }

    fn template_at(id: i64, usage_count: i64, created_at: DateTime<Utc>) -> Template {
        Template {
            id,
            name: format!("template{}", id),
            community_id: None,
            usage_count,
            created_at,
        }
    }

    #[rstest]
    #[case(None, 10)]
    #[case(Some("25"), 25)]
    #[case(Some("1"), 1)]
    #[case(Some("99"), 99)]
    #[case(Some("100"), 10)]
    #[case(Some("500"), 10)]
    #[case(Some("0"), 10)]
    #[case(Some("-4"), 10)]
    #[case(Some("ten"), 10)]
    #[case(Some("12abc"), 12)]
    #[case(Some("5.0"), 5)]
    #[case(Some(" 7"), 7)]
    #[case(Some("99999999999999999999"), 10)]
    fn count_is_clamped(#[case] raw: Option<&str>, #[case] expected: usize) {
        assert_eq!(normalize_count(raw), expected);
    }

    #[rstest]
    #[case(None, 0)]
    #[case(Some("30"), 30)]
    #[case(Some("-3"), 0)]
    #[case(Some("abc"), 0)]
    #[case(Some("20px"), 20)]
    #[case(Some("-"), 0)]
    fn offset_is_clamped(#[case] raw: Option<&str>, #[case] expected: usize) {
        assert_eq!(normalize_offset(raw), expected);
    }

    #[test]
    fn sort_defaults_per_resource_kind() {
        assert_eq!(normalize_sort::<MemeSort>(None), MemeSort::Hot);
        assert_eq!(normalize_sort::<MemeSort>(Some("rising")), MemeSort::Hot);
        assert_eq!(normalize_sort::<MemeSort>(Some("new")), MemeSort::New);
        assert_eq!(normalize_sort::<RankSort>(None), RankSort::Top);
        assert_eq!(normalize_sort::<RankSort>(Some("hot")), RankSort::Top);
        assert_eq!(normalize_sort::<RankSort>(Some("new")), RankSort::New);
    }

    #[test]
    fn top_breaks_vote_ties_by_newest() {
        let a = meme_at(1, 5, t(1));
        let b = meme_at(2, 5, t(2));
        let c = meme_at(3, 2, t(3));
        let page = paginate(vec![a, c, b], |x, y| compare_memes(MemeSort::Top, x, y), 10, 0);
        assert_eq!(ids(&page.items), vec![2, 1, 3]);
    }

    #[test]
    fn new_breaks_timestamp_ties_by_id() {
        let memes = vec![meme_at(1, 0, t(5)), meme_at(3, 0, t(5)), meme_at(2, 9, t(1))];
        let page = paginate(memes, |x, y| compare_memes(MemeSort::New, x, y), 10, 0);
        assert_eq!(ids(&page.items), vec![3, 1, 2]);
    }

    #[test]
    fn hot_score_is_monotonic_in_votes_and_recency() {
        for votes in -50..50 {
            assert!(hot_score(votes + 1, t(0)) > hot_score(votes, t(0)));
            assert!(hot_score(votes, t(60)) > hot_score(votes, t(0)));
        }
    }

    #[test]
    fn hot_ranks_equal_age_memes_by_votes() {
        let memes = vec![meme_at(1, 1, t(0)), meme_at(2, 0, t(0)), meme_at(3, -1, t(0)), meme_at(4, 3, t(0))];
        let page = paginate(memes, |x, y| compare_memes(MemeSort::Hot, x, y), 10, 0);
        assert_eq!(ids(&page.items), vec![4, 1, 2, 3]);
    }

    #[rstest]
    #[case(-1, 0)]
    #[case(0, 1)]
    #[case(1, 2)]
    #[case(-2, -1)]
    #[case(1_000_000, 1_000_001)]
    fn hot_never_ranks_a_better_voted_equal_age_meme_lower(#[case] lower: i64, #[case] higher: i64) {
        // The better-voted meme is the older id, so the id tie-break alone would put it last.
        let better = meme_at(1, higher, t(30));
        let worse = meme_at(2, lower, t(30));
        assert_eq!(compare_memes(MemeSort::Hot, &better, &worse), Ordering::Less);
    }

    #[test]
    fn hot_prefers_fresh_memes_over_slightly_better_stale_ones() {
        let stale = meme_at(1, 12, t(0));
        let fresh = meme_at(2, 10, t(24 * 60));
        assert_eq!(compare_memes(MemeSort::Hot, &fresh, &stale), Ordering::Less);
    }

    #[test]
    fn top_is_non_increasing() {
        let memes: Vec<Meme> = (0..30).map(|i| meme_at(i, (i * 7) % 11 - 5, t(i))).collect();
        let page = paginate(memes, |x, y| compare_memes(MemeSort::Top, x, y), 99, 0);
        assert!(page.items.windows(2).all(|w| w[0].net_vote >= w[1].net_vote));
    }

    #[rstest]
    #[case(RankSort::Top, vec![3, 2, 4, 1, 5])]
    #[case(RankSort::New, vec![5, 4, 3, 2, 1])]
    fn communities_order_by_favourites_then_newest(#[case] sort: RankSort, #[case] expected: Vec<i64>) {
        let communities = vec![
            community_at(1, 2, t(1)),
            community_at(2, 7, t(2)),
            community_at(3, 7, t(3)),
            community_at(4, 2, t(4)),
            community_at(5, 0, t(5)),
        ];
        let page = paginate(communities, |x, y| compare_communities(sort, x, y), 10, 0);
        assert_eq!(page.items.iter().map(|c| c.id).collect::<Vec<_>>(), expected);
        if sort == RankSort::Top {
            assert!(page.items.windows(2).all(|w| w[0].favourites_count >= w[1].favourites_count));
        }
    }

    #[rstest]
    #[case(RankSort::Top, vec![4, 2, 5, 3, 1])]
    #[case(RankSort::New, vec![5, 4, 3, 2, 1])]
    fn templates_order_by_usage_then_newest(#[case] sort: RankSort, #[case] expected: Vec<i64>) {
        let templates = vec![
            template_at(1, 0, t(1)),
            template_at(2, 4, t(2)),
            template_at(3, 1, t(3)),
            template_at(4, 4, t(4)),
            template_at(5, 1, t(5)),
        ];
        let page = paginate(templates, |x, y| compare_templates(sort, x, y), 10, 0);
        assert_eq!(page.items.iter().map(|t| t.id).collect::<Vec<_>>(), expected);
        if sort == RankSort::Top {
            assert!(page.items.windows(2).all(|w| w[0].usage_count >= w[1].usage_count));
        }
    }

    #[test]
    fn equal_keys_and_timestamps_fall_back_to_id() {
        let communities = vec![community_at(1, 3, t(0)), community_at(9, 3, t(0)), community_at(4, 3, t(0))];
        let page = paginate(communities, |x, y| compare_communities(RankSort::Top, x, y), 10, 0);
        assert_eq!(page.items.iter().map(|c| c.id).collect::<Vec<_>>(), vec![9, 4, 1]);

        let templates = vec![template_at(2, 0, t(0)), template_at(6, 0, t(0))];
        let page = paginate(templates, |x, y| compare_templates(RankSort::Top, x, y), 10, 0);
        assert_eq!(page.items.iter().map(|t| t.id).collect::<Vec<_>>(), vec![6, 2]);
    }

    #[rstest]
    #[case(MemeSort::New)]
    #[case(MemeSort::Top)]
    #[case(MemeSort::Hot)]
    fn adjacent_pages_concatenate_to_the_double_page(#[case] sort: MemeSort) {
        let memes: Vec<Meme> = (0..25).map(|i| meme_at(i, (i * 3) % 4, t(i % 6))).collect();
        let cmp = |x: &Meme, y: &Meme| compare_memes(sort, x, y);
        let first = paginate(memes.clone(), cmp, 7, 0);
        let second = paginate(memes.clone(), cmp, 7, 7);
        let double = paginate(memes, cmp, 14, 0);

        let mut joined = ids(&first.items);
        joined.extend(ids(&second.items));
        assert_eq!(joined, ids(&double.items));
        assert!(ids(&first.items).iter().all(|id| !ids(&second.items).contains(id)));
    }

    #[rstest]
    #[case(10, 0, 10)]
    #[case(10, 20, 3)]
    #[case(10, 23, 0)]
    #[case(5, 100, 0)]
    fn page_length_matches_window(#[case] count: usize, #[case] offset: usize, #[case] expected: usize) {
        let memes: Vec<Meme> = (0..23).map(|i| meme_at(i, 0, t(i))).collect();
        let page = paginate(memes, |x, y| compare_memes(MemeSort::New, x, y), count, offset);
        assert_eq!(page.total_count, 23);
        assert_eq!(page.items.len(), expected);
        assert_eq!(page.items.len(), count.min(23usize.saturating_sub(offset)));
    }

    #[tokio::test]
    async fn scoped_listing_of_unknown_community_fails() {
        let (handle, _) = seeded_handle();
        let engine = FeedEngine::new(handle);
        let request = PageRequest { sort: MemeSort::Hot, count: 10, offset: 0 };
        let err = engine.list_memes(Some("nowhere"), request).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { resource: "community" }));
    }

    #[tokio::test]
    async fn community_top_listing_orders_ties_newest_first() {
        let (handle, _) = seeded_handle();
        let store = handle.store();
        let gaming = store
            .create_community(NewCommunity {
                name: "gaming".into(),
                title: "Gaming".into(),
                description: String::new(),
                sidebar: String::new(),
                nsfw: false,
                creator_id: 1,
            })
            .await
            .unwrap();
        let mut created = Vec::new();
        for (link, votes) in [("https://x.io/a", 5), ("https://x.io/b", 5), ("https://x.io/c", 2)] {
            let meme = store
                .create_meme(NewMeme {
                    title: link.into(),
                    link: link.into(),
                    canonical_link: link.into(),
                    creator_id: 1,
                    template_id: None,
                    community_id: Some(gaming.id),
                })
                .await
                .unwrap();
            for user in 0..votes {
                store.apply_vote(meme.id, user, VoteDirection::Up).await.unwrap();
            }
            created.push(meme.id);
        }
        // Outside the scope; must not be counted.
        store
            .create_meme(NewMeme {
                title: "elsewhere".into(),
                link: "https://x.io/d".into(),
                canonical_link: "https://x.io/d".into(),
                creator_id: 1,
                template_id: None,
                community_id: None,
            })
            .await
            .unwrap();

        let engine = FeedEngine::new(handle.clone());
        let request = PageRequest { sort: MemeSort::Top, count: 10, offset: 0 };
        let page = engine.list_memes(Some("GAMING"), request).await.unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(ids(&page.items), vec![created[1], created[0], created[2]]);

        let global = engine.list_memes(None, request).await.unwrap();
        assert_eq!(global.total_count, 4);
    }
}
