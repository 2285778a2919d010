use crate::{
    domain::{
        CommunityRepository, FavouriteRepository, MemeRepository, SharedClock, TemplateRepository,
        UserRepository, VoteRepository,
    },
    errors::RepoError,
    models::{
        Community, CommunityId, Favourite, Meme, MemeId, NewCommunity, NewMeme, NewTemplate,
        NewUser, Template, TemplateId, User, UserId, VoteDirection,
    },
};
use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    last_user_id: UserId,
    last_community_id: CommunityId,
    last_meme_id: MemeId,
    last_template_id: TemplateId,
    users: BTreeMap<UserId, User>,
    communities: BTreeMap<CommunityId, Community>,
    /// Lower-cased name -> id.
    community_names: HashMap<String, CommunityId>,
    memes: BTreeMap<MemeId, Meme>,
    /// Lower-cased link -> id.
    meme_links: HashMap<String, MemeId>,
    templates: BTreeMap<TemplateId, Template>,
    favourites: HashSet<Favourite>,
    votes: HashMap<(MemeId, UserId), VoteDirection>,
}

/// Process-local entity store.
///
/// All tables sit behind one lock and every method is a single critical
/// section, so uniqueness checks, counters and join rows always change
/// together.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    clock: SharedClock,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl MemoryStore {
    pub fn new(clock: SharedClock) -> Self {
        tracing::info!("Initializing MemoryStore");
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: self.clock.utc(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl CommunityRepository for MemoryStore {
    async fn create_community(&self, community: NewCommunity) -> Result<Community, RepoError> {
        let key = community.name.to_lowercase();
        let mut tables = self.tables.write().await;
        if tables.community_names.contains_key(&key) {
            return Err(RepoError::Conflict { resource: "community", field: "name" });
        }
        tables.last_community_id += 1;
        let community = Community {
            id: tables.last_community_id,
            name: community.name,
            title: community.title,
            description: community.description,
            sidebar: community.sidebar,
            nsfw: community.nsfw,
            creator_id: community.creator_id,
            favourites_count: 0,
            created_at: self.clock.utc(),
        };
        tables.community_names.insert(key, community.id);
        tables.communities.insert(community.id, community.clone());
        Ok(community)
    }

    async fn find_community_by_name(&self, name: &str) -> Result<Option<Community>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .community_names
            .get(&name.to_lowercase())
            .and_then(|id| tables.communities.get(id))
            .cloned())
    }

    async fn list_communities(&self) -> Result<Vec<Community>, RepoError> {
        Ok(self.tables.read().await.communities.values().cloned().collect())
    }
}

#[async_trait]
impl MemeRepository for MemoryStore {
    async fn create_meme(&self, meme: NewMeme) -> Result<Meme, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.meme_links.contains_key(&meme.canonical_link) {
            return Err(RepoError::Conflict { resource: "meme", field: "link" });
        }
        if let Some(community_id) = meme.community_id {
            if !tables.communities.contains_key(&community_id) {
                return Err(RepoError::NotFound { resource: "community" });
            }
        }
        if let Some(template_id) = meme.template_id {
            match tables.templates.get_mut(&template_id) {
                Some(template) => template.usage_count += 1,
                None => return Err(RepoError::NotFound { resource: "template" }),
            }
        }
        tables.last_meme_id += 1;
        let created = Meme {
            id: tables.last_meme_id,
            title: meme.title,
            link: meme.link,
            net_vote: 0,
            creator_id: meme.creator_id,
            template_id: meme.template_id,
            community_id: meme.community_id,
            created_at: self.clock.utc(),
        };
        tables.meme_links.insert(meme.canonical_link, created.id);
        tables.memes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn canonical_link_exists(&self, canonical_link: &str) -> Result<bool, RepoError> {
        Ok(self.tables.read().await.meme_links.contains_key(canonical_link))
    }

    async fn get_meme(&self, id: MemeId) -> Result<Option<Meme>, RepoError> {
        Ok(self.tables.read().await.memes.get(&id).cloned())
    }

    async fn list_memes(&self, scope: Option<CommunityId>) -> Result<Vec<Meme>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .memes
            .values()
            .filter(|m| scope.is_none() || m.community_id == scope)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TemplateRepository for MemoryStore {
    async fn create_template(&self, template: NewTemplate) -> Result<Template, RepoError> {
        let mut tables = self.tables.write().await;
        if let Some(community_id) = template.community_id {
            if !tables.communities.contains_key(&community_id) {
                return Err(RepoError::NotFound { resource: "community" });
            }
        }
        tables.last_template_id += 1;
        let template = Template {
            id: tables.last_template_id,
            name: template.name,
            community_id: template.community_id,
            usage_count: 0,
            created_at: self.clock.utc(),
        };
        tables.templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn get_template(&self, id: TemplateId) -> Result<Option<Template>, RepoError> {
        Ok(self.tables.read().await.templates.get(&id).cloned())
    }

    async fn list_templates(&self, scope: Option<CommunityId>) -> Result<Vec<Template>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .templates
            .values()
            .filter(|t| scope.is_none() || t.community_id == scope)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FavouriteRepository for MemoryStore {
    async fn add_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let Tables { communities, favourites, .. } = &mut *tables;
        let community = communities
            .get_mut(&community_id)
            .ok_or(RepoError::NotFound { resource: "community" })?;
        if !favourites.insert(Favourite { user_id, community_id }) {
            return Ok(false);
        }
        community.favourites_count += 1;
        Ok(true)
    }

    async fn remove_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let Tables { communities, favourites, .. } = &mut *tables;
        let community = communities
            .get_mut(&community_id)
            .ok_or(RepoError::NotFound { resource: "community" })?;
        if !favourites.remove(&Favourite { user_id, community_id }) {
            return Ok(false);
        }
        community.favourites_count -= 1;
        Ok(true)
    }

    async fn is_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .favourites
            .contains(&Favourite { user_id, community_id }))
    }
}

#[async_trait]
impl VoteRepository for MemoryStore {
    async fn apply_vote(
        &self,
        meme_id: MemeId,
        user_id: UserId,
        direction: VoteDirection,
    ) -> Result<i64, RepoError> {
        let mut tables = self.tables.write().await;
        let Tables { memes, votes, .. } = &mut *tables;
        let meme = memes
            .get_mut(&meme_id)
            .ok_or(RepoError::NotFound { resource: "meme" })?;
        let previous = match direction {
            VoteDirection::None => votes.remove(&(meme_id, user_id)),
            _ => votes.insert((meme_id, user_id), direction),
        }
        .unwrap_or(VoteDirection::None);
        meme.net_vote += direction.weight() - previous.weight();
        Ok(meme.net_vote)
    }

    async fn current_vote(&self, meme_id: MemeId, user_id: UserId) -> Result<VoteDirection, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .votes
            .get(&(meme_id, user_id))
            .copied()
            .unwrap_or(VoteDirection::None))
    }
}
