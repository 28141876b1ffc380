//! Foundation types for the ballot ledger.
//!
//! Every other ballot crate depends on `ballot-types`.
//!
//! # Key Types
//!
//! - [`ParticipantId`] — 20-byte account address identifying a voter or the administrator
//! - [`IdentityMaterial`] — Material an address can be derived from
//! - [`ProposalLabel`] — Short proposal name, at most 32 bytes

pub mod error;
pub mod identity;
pub mod label;

pub use error::TypeError;
pub use identity::{IdentityMaterial, ParticipantId};
pub use label::{ProposalLabel, MAX_LABEL_BYTES};
