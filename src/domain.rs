use crate::errors::RepoError;
use crate::models::{
    Community, CommunityId, Meme, MemeId, NewCommunity, NewMeme, NewTemplate, NewUser, Template,
    TemplateId, User, UserId, VoteDirection,
};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;

/// Timestamp source shared by the store backends.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// User records. Account management lives outside this service; creation is
/// exposed for seeding.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError>;
}

#[async_trait]
pub trait CommunityRepository: Send + Sync + 'static {
    /// Inserts a community unless another one has a case-insensitively equal
    /// name, in which case `RepoError::Conflict` is returned.
    async fn create_community(&self, community: NewCommunity) -> Result<Community, RepoError>;

    /// Case-insensitive lookup by name.
    async fn find_community_by_name(&self, name: &str) -> Result<Option<Community>, RepoError>;

    async fn list_communities(&self) -> Result<Vec<Community>, RepoError>;
}

#[async_trait]
pub trait MemeRepository: Send + Sync + 'static {
    /// Inserts a meme unless its canonical link is already taken
    /// (`RepoError::Conflict`). Bumps the referenced template's usage count
    /// in the same atomic step.
    async fn create_meme(&self, meme: NewMeme) -> Result<Meme, RepoError>;

    async fn canonical_link_exists(&self, canonical_link: &str) -> Result<bool, RepoError>;

    async fn get_meme(&self, id: MemeId) -> Result<Option<Meme>, RepoError>;

    /// All memes in `scope`, or every meme when `scope` is `None`. Unordered.
    async fn list_memes(&self, scope: Option<CommunityId>) -> Result<Vec<Meme>, RepoError>;
}

#[async_trait]
pub trait TemplateRepository: Send + Sync + 'static {
    async fn create_template(&self, template: NewTemplate) -> Result<Template, RepoError>;

    async fn get_template(&self, id: TemplateId) -> Result<Option<Template>, RepoError>;

    /// All templates in `scope`, or every template when `scope` is `None`. Unordered.
    async fn list_templates(&self, scope: Option<CommunityId>) -> Result<Vec<Template>, RepoError>;
}

#[async_trait]
pub trait FavouriteRepository: Send + Sync + 'static {
    /// Adds the join row and bumps the community's favourite count atomically.
    /// Returns `false` without touching the count when the row already exists.
    async fn add_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, RepoError>;

    /// Removes the join row and decrements the count atomically. Returns
    /// `false` when there was nothing to remove.
    async fn remove_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, RepoError>;

    async fn is_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait VoteRepository: Send + Sync + 'static {
    /// Replaces the user's effective vote on the meme and adjusts `net_vote` by
    /// the difference in one atomic step. Returns the meme's new net score.
    async fn apply_vote(
        &self,
        meme_id: MemeId,
        user_id: UserId,
        direction: VoteDirection,
    ) -> Result<i64, RepoError>;

    async fn current_vote(&self, meme_id: MemeId, user_id: UserId) -> Result<VoteDirection, RepoError>;
}

/// Everything the core needs from persistence.
pub trait EntityStore:
    UserRepository
    + CommunityRepository
    + MemeRepository
    + TemplateRepository
    + FavouriteRepository
    + VoteRepository
{
}

impl<T> EntityStore for T where
    T: UserRepository
        + CommunityRepository
        + MemeRepository
        + TemplateRepository
        + FavouriteRepository
        + VoteRepository
{
}
