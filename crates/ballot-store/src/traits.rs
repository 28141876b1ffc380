use ballot_ledger::{BallotSnapshot, InMemoryBallot};

use crate::error::StoreResult;

/// Durable home for a ballot's snapshot.
///
/// Implementations must replace the stored snapshot as a whole: a reader
/// never observes half of a save.
pub trait StateStore: Send + Sync {
    /// Load the stored snapshot. Returns `Ok(None)` if nothing was saved yet.
    fn load(&self) -> StoreResult<Option<BallotSnapshot>>;

    /// Replace the stored snapshot.
    fn save(&self, snapshot: &BallotSnapshot) -> StoreResult<()>;

    /// Replace the stored snapshot only if the stored journal still ends at
    /// `expected_head`; otherwise fail with
    /// [`StoreError::HeadMoved`](crate::StoreError::HeadMoved).
    ///
    /// The check and the write are one atomic step with respect to every
    /// other writer of the same store.
    fn save_if_head(
        &self,
        snapshot: &BallotSnapshot,
        expected_head: Option<[u8; 32]>,
    ) -> StoreResult<()>;

    /// Load and restore a ballot, replaying its journal.
    fn open_ballot(&self) -> StoreResult<Option<InMemoryBallot>> {
        match self.load()? {
            Some(snapshot) => Ok(Some(InMemoryBallot::from_snapshot(snapshot)?)),
            None => Ok(None),
        }
    }

    /// Snapshot `ballot` and save it.
    fn save_ballot(&self, ballot: &InMemoryBallot) -> StoreResult<()> {
        self.save(&ballot.snapshot()?)
    }
}
