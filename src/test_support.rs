//! Shared fixtures for unit tests.

use crate::models::{Meme, NewCommunity, NewMeme};
use crate::repositories::MemoryStore;
use crate::store::StoreHandle;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Clock that moves forward one minute every time it is read, so records
/// created in sequence get strictly increasing timestamps.
pub(crate) struct SteppingClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.ticks.fetch_add(1, Ordering::SeqCst))
    }
}

/// A memory-backed handle plus direct access to the store behind it.
pub(crate) fn seeded_handle() -> (StoreHandle, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(Arc::new(SteppingClock::default())));
    let handle = StoreHandle::new(store.clone(), std::time::Duration::from_secs(5));
    (handle, store)
}

pub(crate) fn new_community(name: &str) -> NewCommunity {
    NewCommunity {
        name: name.to_string(),
        title: name.to_string(),
        description: String::new(),
        sidebar: String::new(),
        nsfw: false,
        creator_id: 1,
    }
}

pub(crate) fn new_meme(link: &str, community_id: Option<i64>) -> NewMeme {
    NewMeme {
        title: link.to_string(),
        link: link.to_string(),
        canonical_link: link.to_lowercase(),
        creator_id: 1,
        template_id: None,
        community_id,
    }
}

pub(crate) fn meme_at(id: i64, net_vote: i64, created_at: DateTime<Utc>) -> Meme {
    Meme {
        id,
        title: format!("meme {}", id),
        link: format!("https://memes.example/{}", id),
        net_vote,
        creator_id: 1,
        template_id: None,
        community_id: None,
        created_at,
    }
}
