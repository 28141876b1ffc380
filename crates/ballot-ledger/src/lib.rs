//! Weighted, delegable voting ledger.
//!
//! This crate is the heart of the ballot system. It provides:
//! - [`VotingLedger`], the synchronous state machine: rights, votes,
//!   transitive delegation, and the leading-proposal query
//! - Action receipts forming a hash-linked journal of accepted calls
//! - `BallotWriter` / `BallotReader` trait boundaries
//! - [`InMemoryBallot`], the lock-guarded shared ballot
//! - Deterministic journal replay and tally validation

pub mod error;
pub mod ledger;
pub mod memory;
pub mod records;
pub mod replay;
pub mod traits;
pub mod validation;

pub use error::LedgerError;
pub use ledger::{
    DelegationPlan, Participant, ParticipantState, Proposal, VotingLedger, MAX_DELEGATION_DEPTH,
};
pub use memory::InMemoryBallot;
pub use records::{Action, BallotSnapshot, Receipt};
pub use replay::{ReplayEngine, ReplayResult};
pub use traits::{BallotReader, BallotWriter};
pub use validation::{TallyValidator, ValidationReport, Violation, ViolationKind};
