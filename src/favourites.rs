use crate::domain::FavouriteRepository;
use crate::errors::ServiceError;
use crate::models::{CommunityId, UserId};
use crate::store::StoreHandle;

/// Per-user community favourites.
///
/// Adding an existing favourite or removing a missing one is a no-op that
/// reports `false`. The community's `favourites_count` changes in the same
/// store operation as the join row.
#[derive(Clone)]
pub struct FavouriteRegistry {
    store: StoreHandle,
}

impl FavouriteRegistry {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn add_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, ServiceError> {
        let created = self
            .store
            .call("favourite the community", self.store.store().add_favourite(user_id, community_id))
            .await?;
        tracing::info!(user_id, community_id, created, "Favourite added");
        Ok(created)
    }

    pub async fn remove_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, ServiceError> {
        let removed = self
            .store
            .call("unfavourite the community", self.store.store().remove_favourite(user_id, community_id))
            .await?;
        tracing::info!(user_id, community_id, removed, "Favourite removed");
        Ok(removed)
    }

    pub async fn is_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, ServiceError> {
        self.store
            .call("check the favourite", self.store.store().is_favourite(user_id, community_id))
            .await
    }
}
