use std::sync::RwLock;

use ballot_ledger::BallotSnapshot;

use crate::error::{StoreError, StoreResult};
use crate::traits::StateStore;

/// In-memory snapshot store for tests and embedding.
#[derive(Default)]
pub struct InMemoryStateStore {
    snapshot: RwLock<Option<BallotSnapshot>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self) -> StoreResult<Option<BallotSnapshot>> {
        let guard = self.snapshot.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, snapshot: &BallotSnapshot) -> StoreResult<()> {
        let mut guard = self.snapshot.write().map_err(|_| StoreError::LockPoisoned)?;
        *guard = Some(snapshot.clone());
        Ok(())
    }

    fn save_if_head(
        &self,
        snapshot: &BallotSnapshot,
        expected_head: Option<[u8; 32]>,
    ) -> StoreResult<()> {
        let mut guard = self.snapshot.write().map_err(|_| StoreError::LockPoisoned)?;
        if guard.as_ref().and_then(BallotSnapshot::head) != expected_head {
            return Err(StoreError::HeadMoved);
        }
        *guard = Some(snapshot.clone());
        Ok(())
    }
}
