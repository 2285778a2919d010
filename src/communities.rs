use crate::domain::{CommunityRepository, UserRepository};
use crate::errors::ServiceError;
use crate::models::{Community, NewCommunity, UserId};
use crate::store::StoreHandle;
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 64;

/// Whether `name` could belong to a stored community. Longer names can never
/// match and are not sent to the store.
pub fn is_lookup_candidate(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN
}

/// Body of `POST /communities`. Every field is optional on the wire so that
/// missing values surface as validation errors rather than decode failures.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreateCommunity {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sidebar: Option<String>,
    pub nsfw: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatorSummary {
    pub username: String,
}

/// A community together with its creator's public details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityDetail {
    #[serde(flatten)]
    pub community: Community,
    pub creator: Option<CreatorSummary>,
}

fn validate_name(name: Option<String>) -> Result<String, ServiceError> {
    let name = name.map(|n| n.trim().to_string()).unwrap_or_default();
    if name.is_empty() {
        return Err(ServiceError::Validation { field: "name", reason: "empty" });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ServiceError::Validation { field: "name", reason: "too long" });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(ServiceError::Validation {
            field: "name",
            reason: "only letters, digits, '_' and '-' are allowed",
        });
    }
    Ok(name)
}

/// Creation and lookup of communities by case-insensitive name.
#[derive(Clone)]
pub struct CommunityDirectory {
    store: StoreHandle,
}

impl CommunityDirectory {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn create(&self, creator_id: UserId, request: CreateCommunity) -> Result<Community, ServiceError> {
        let name = validate_name(request.name)?;
        let title = request.title.map(|t| t.trim().to_string()).unwrap_or_default();
        if title.is_empty() {
            return Err(ServiceError::Validation { field: "title", reason: "empty" });
        }
        let community = NewCommunity {
            name,
            title,
            description: request.description.unwrap_or_default(),
            sidebar: request.sidebar.unwrap_or_default(),
            nsfw: request.nsfw.unwrap_or(false),
            creator_id,
        };
        let created = self
            .store
            .call("create the community", self.store.store().create_community(community))
            .await?;
        tracing::info!(community_id = created.id, name = %created.name, creator_id, "Community created");
        Ok(created)
    }

    async fn find(&self, operation: &'static str, name: &str) -> Result<Option<Community>, ServiceError> {
        if !is_lookup_candidate(name) {
            return Ok(None);
        }
        self.store
            .call(operation, self.store.store().find_community_by_name(name))
            .await
    }

    /// Finds a community by name, failing with `NotFound` when absent.
    pub async fn get(&self, name: &str) -> Result<Community, ServiceError> {
        self.find("find the community", name)
            .await?
            .ok_or(ServiceError::NotFound { resource: "community" })
    }

    pub async fn detail(&self, name: &str) -> Result<CommunityDetail, ServiceError> {
        let community = self.get(name).await?;
        let creator = self
            .store
            .call("find the community", self.store.store().get_user(community.creator_id))
            .await?
            .map(|user| CreatorSummary { username: user.username });
        Ok(CommunityDetail { community, creator })
    }

    pub async fn exists(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(self.find("check the community", name).await?.is_some())
    }
}
