//! Snapshot persistence for the ballot ledger.
//!
//! A ballot is persisted as a [`BallotSnapshot`](ballot_ledger::BallotSnapshot):
//! the ledger plus the journal that produced it. Opening a stored ballot
//! replays the journal, so a snapshot edited by hand is refused rather than
//! silently trusted.
//!
//! Backends implement [`StateStore`]:
//!
//! - [`InMemoryStateStore`] -- holds the snapshot in memory, for tests
//! - [`FileStateStore`] -- one JSON file, replaced atomically on save

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileStateStore;
pub use memory::InMemoryStateStore;
pub use traits::StateStore;
