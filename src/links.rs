//! Meme link validation and case-insensitive uniqueness.

use crate::domain::MemeRepository;
use crate::errors::ServiceError;
use crate::store::StoreHandle;
use url::Url;

const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "ftp"];
/// Longest accepted link in bytes. The DynamoDB guard key adds a short
/// prefix and must stay under the 2048-byte partition key limit.
pub const MAX_LINK_LEN: usize = 2000;

/// A well-formed link together with its comparison key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalLink {
    /// The link as submitted, preserved for display.
    pub original: String,
    /// Lower-cased form used only for uniqueness comparison.
    pub canonical: String,
}

/// Checks that `candidate` is a usable meme link and derives its canonical form.
pub fn validate_link(candidate: &str) -> Result<CanonicalLink, ServiceError> {
    if candidate.trim().is_empty() {
        return Err(ServiceError::Validation { field: "link", reason: "empty" });
    }
    if candidate.len() > MAX_LINK_LEN {
        return Err(ServiceError::Validation { field: "link", reason: "too long" });
    }
    let malformed = ServiceError::Validation { field: "link", reason: "malformed" };
    if candidate.trim() != candidate {
        return Err(malformed);
    }
    let parsed = Url::parse(candidate).map_err(|_| ServiceError::Validation {
        field: "link",
        reason: "malformed",
    })?;
    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) || parsed.host_str().is_none_or(str::is_empty) {
        return Err(malformed);
    }
    Ok(CanonicalLink {
        original: candidate.to_string(),
        canonical: candidate.to_lowercase(),
    })
}

/// Validation plus the pre-insert existence check.
///
/// The check is advisory: two creators can both pass it, and the store's
/// unique guard then rejects the loser with the same conflict error.
#[derive(Clone)]
pub struct LinkGuard {
    store: StoreHandle,
}

impl LinkGuard {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn validate(&self, candidate: &str) -> Result<CanonicalLink, ServiceError> {
        let link = validate_link(candidate)?;
        let taken = self
            .store
            .call("create the meme", self.store.store().canonical_link_exists(&link.canonical))
            .await?;
        if taken {
            tracing::debug!(link = %link.original, "Rejecting duplicate meme link");
            return Err(ServiceError::Conflict { resource: "meme", field: "link" });
        }
        Ok(link)
    }
}
