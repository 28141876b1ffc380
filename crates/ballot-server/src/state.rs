use std::sync::Arc;

use axum::http::HeaderMap;
use ballot_ledger::{InMemoryBallot, LedgerError, Receipt};
use ballot_store::{StateStore, StoreError};
use ballot_types::ParticipantId;
use tokio::sync::Mutex;

use crate::auth::{AuthProvider, HeaderAuth};
use crate::error::{ServerError, ServerResult};

/// Shared handler state.
///
/// Mutations run under `write_lock` together with the save that follows
/// them, so snapshots reach the store in the order the calls were applied.
/// A call whose save fails is rolled back before the lock is released.
#[derive(Clone)]
pub struct AppState {
    ballot: Arc<InMemoryBallot>,
    store: Option<Arc<dyn StateStore>>,
    auth: Arc<dyn AuthProvider>,
    write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(ballot: Arc<InMemoryBallot>) -> Self {
        Self {
            ballot,
            store: None,
            auth: Arc::new(HeaderAuth),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    pub fn ballot(&self) -> &InMemoryBallot {
        &self.ballot
    }

    pub async fn caller(&self, headers: &HeaderMap) -> ServerResult<ParticipantId> {
        self.auth.authenticate(headers).await
    }

    /// Apply one mutating call and persist the resulting snapshot.
    pub async fn commit<F>(&self, call: F) -> ServerResult<Receipt>
    where
        F: FnOnce(&InMemoryBallot) -> Result<Receipt, LedgerError>,
    {
        let _guard = self.write_lock.lock().await;
        let Some(store) = &self.store else {
            return Ok(call(&self.ballot)?);
        };

        let before = self.ballot.snapshot()?;
        let receipt = call(&self.ballot)?;
        if let Err(error) = self.persist(store, before.head()).await {
            tracing::warn!(seq = receipt.seq, %error, "call not persisted, rolling back");
            self.ballot.restore(before)?;
            if matches!(error, ServerError::Store(StoreError::HeadMoved)) {
                self.reload(store).await?;
            }
            return Err(error);
        }
        Ok(receipt)
    }

    async fn persist(
        &self,
        store: &Arc<dyn StateStore>,
        expected_head: Option<[u8; 32]>,
    ) -> ServerResult<()> {
        let snapshot = self.ballot.snapshot()?;
        let store = Arc::clone(store);
        tokio::task::spawn_blocking(move || store.save_if_head(&snapshot, expected_head))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))??;
        Ok(())
    }

    /// Adopt the stored ballot after another writer moved it ahead.
    async fn reload(&self, store: &Arc<dyn StateStore>) -> ServerResult<()> {
        let store = Arc::clone(store);
        let stored = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))??;
        if let Some(snapshot) = stored {
            self.ballot.restore(snapshot)?;
            tracing::info!("ballot reloaded from store");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use ballot_ledger::{BallotReader, BallotSnapshot, BallotWriter};
    use ballot_store::{InMemoryStateStore, StoreResult};
    use ballot_types::ProposalLabel;

    use super::*;

    struct FailingStore;

    impl StateStore for FailingStore {
        fn load(&self) -> StoreResult<Option<BallotSnapshot>> {
            Ok(None)
        }

        fn save(&self, _snapshot: &BallotSnapshot) -> StoreResult<()> {
            Err(io::Error::other("disk full").into())
        }

        fn save_if_head(
            &self,
            snapshot: &BallotSnapshot,
            _expected_head: Option<[u8; 32]>,
        ) -> StoreResult<()> {
            self.save(snapshot)
        }
    }

    fn chair() -> ParticipantId {
        ParticipantId::named("chair")
    }

    fn ballot() -> Arc<InMemoryBallot> {
        let labels = ["A", "B"]
            .iter()
            .map(|l| ProposalLabel::new(*l).unwrap())
            .collect();
        Arc::new(InMemoryBallot::deploy(chair(), labels).unwrap())
    }

    #[tokio::test]
    async fn failed_save_leaves_no_trace() {
        let ballot = ballot();
        let state = AppState::new(Arc::clone(&ballot)).with_store(Arc::new(FailingStore));

        let error = state.commit(|b| b.vote(&chair(), 1)).await.unwrap_err();
        assert!(matches!(error, ServerError::Store(StoreError::Io(_))));

        assert_eq!(ballot.proposals().unwrap()[1].vote_count, 0);
        assert_eq!(ballot.receipt_count().unwrap(), 1);
        assert!(!ballot.participant(&chair()).unwrap().voted());

        // the retry is judged on a clean ballot, not rejected as a double vote
        let retry = state.commit(|b| b.vote(&chair(), 1)).await.unwrap_err();
        assert!(matches!(retry, ServerError::Store(_)));
    }

    #[tokio::test]
    async fn rejected_call_skips_the_store() {
        let state = AppState::new(ballot()).with_store(Arc::new(FailingStore));
        let error = state.commit(|b| b.vote(&chair(), 7)).await.unwrap_err();
        assert!(matches!(
            error,
            ServerError::Ledger(LedgerError::InvalidProposal { index: 7, count: 2 })
        ));
    }

    #[tokio::test]
    async fn outside_writer_wins_and_is_adopted() {
        let ballot = ballot();
        let store = Arc::new(InMemoryStateStore::new());
        store.save_ballot(&ballot).unwrap();
        let state = AppState::new(Arc::clone(&ballot)).with_store(store.clone());

        // another process votes through the store behind the server's back
        let outside = store.open_ballot().unwrap().unwrap();
        outside.vote(&chair(), 0).unwrap();
        store.save_ballot(&outside).unwrap();

        let error = state.commit(|b| b.vote(&chair(), 1)).await.unwrap_err();
        assert!(matches!(error, ServerError::Store(StoreError::HeadMoved)));
        assert_eq!(error.status(), axum::http::StatusCode::CONFLICT);

        assert_eq!(ballot.participant(&chair()).unwrap().chosen_proposal(), Some(0));
        assert_eq!(ballot.snapshot().unwrap(), store.load().unwrap().unwrap());
    }
}
