use crate::domain::{MemeRepository, VoteRepository};
use crate::errors::ServiceError;
use crate::models::{MemeId, UserId, VoteDirection};
use crate::store::StoreHandle;

/// Net vote bookkeeping for memes.
///
/// Each (user, meme) pair has at most one effective vote; the store applies
/// the difference between the old and new vote to `net_vote` atomically.
#[derive(Clone)]
pub struct VoteLedger {
    store: StoreHandle,
}

impl VoteLedger {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn net_score(&self, meme_id: MemeId) -> Result<i64, ServiceError> {
        self.store
            .call("read the meme", self.store.store().get_meme(meme_id))
            .await?
            .map(|meme| meme.net_vote)
            .ok_or(ServiceError::NotFound { resource: "meme" })
    }

    /// The user's effective vote on an existing meme.
    pub async fn current_vote(&self, meme_id: MemeId, user_id: UserId) -> Result<VoteDirection, ServiceError> {
        self.net_score(meme_id).await?;
        self.store
            .call("read the vote", self.store.store().current_vote(meme_id, user_id))
            .await
    }

    /// Sets the user's vote and returns the meme's resulting net score.
    pub async fn apply_vote(
        &self,
        meme_id: MemeId,
        user_id: UserId,
        direction: VoteDirection,
    ) -> Result<i64, ServiceError> {
        let net_vote = self
            .store
            .call("vote on the meme", self.store.store().apply_vote(meme_id, user_id, direction))
            .await?;
        tracing::debug!(meme_id, user_id, ?direction, net_vote, "Vote applied");
        Ok(net_vote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MemeRepository;
    use crate::test_support::{new_meme, seeded_handle};
    use std::sync::Arc;

    #[tokio::test]
    async fn switching_and_clearing_votes_adjusts_the_score() {
        let (handle, _) = seeded_handle();
        let meme = handle.store().create_meme(new_meme("https://x.io/1", None)).await.unwrap();
        let ledger = VoteLedger::new(handle);

        assert_eq!(ledger.net_score(meme.id).await.unwrap(), 0);
        assert_eq!(ledger.apply_vote(meme.id, 1, VoteDirection::Up).await.unwrap(), 1);
        assert_eq!(ledger.apply_vote(meme.id, 1, VoteDirection::Up).await.unwrap(), 1);
        assert_eq!(ledger.apply_vote(meme.id, 1, VoteDirection::Down).await.unwrap(), -1);
        assert_eq!(ledger.apply_vote(meme.id, 2, VoteDirection::Down).await.unwrap(), -2);
        assert_eq!(ledger.apply_vote(meme.id, 1, VoteDirection::None).await.unwrap(), -1);
        assert_eq!(ledger.apply_vote(meme.id, 1, VoteDirection::None).await.unwrap(), -1);
        assert_eq!(ledger.net_score(meme.id).await.unwrap(), -1);
        assert_eq!(ledger.current_vote(meme.id, 1).await.unwrap(), VoteDirection::None);
        assert_eq!(ledger.current_vote(meme.id, 2).await.unwrap(), VoteDirection::Down);
    }

    #[tokio::test]
    async fn concurrent_flips_settle_on_the_sum_of_effective_votes() {
        let (handle, _) = seeded_handle();
        let meme_id = handle.store().create_meme(new_meme("https://x.io/1", None)).await.unwrap().id;
        let ledger = Arc::new(VoteLedger::new(handle));

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let ledger = ledger.clone();
                let user_id = i % 10;
                let direction = if i % 3 == 0 { VoteDirection::Down } else { VoteDirection::Up };
                tokio::spawn(async move { ledger.apply_vote(meme_id, user_id, direction).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut expected = 0;
        for user_id in 0..10 {
            expected += ledger.current_vote(meme_id, user_id).await.unwrap().weight();
        }
        assert_eq!(ledger.net_score(meme_id).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn voting_on_a_missing_meme_is_not_found() {
        let (handle, _) = seeded_handle();
        let ledger = VoteLedger::new(handle);
        let err = ledger.apply_vote(77, 1, VoteDirection::Up).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { resource: "meme" }));
        let err = ledger.current_vote(77, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { resource: "meme" }));
    }
}
