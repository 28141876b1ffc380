use ballot_types::{ParticipantId, ProposalLabel};

use crate::error::LedgerError;
use crate::ledger::{Participant, Proposal};
use crate::records::Receipt;

/// Write boundary for ballot operations.
///
/// Each call is applied atomically: it either appends exactly one receipt
/// and changes the ledger, or returns an error and changes nothing.
pub trait BallotWriter: Send + Sync {
    fn grant_right(
        &self,
        caller: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<Receipt, LedgerError>;

    fn vote(&self, caller: &ParticipantId, proposal: usize) -> Result<Receipt, LedgerError>;

    fn delegate(&self, caller: &ParticipantId, to: &ParticipantId)
        -> Result<Receipt, LedgerError>;
}

/// Read boundary for ballot queries.
pub trait BallotReader: Send + Sync {
    fn administrator(&self) -> Result<ParticipantId, LedgerError>;

    fn proposals(&self) -> Result<Vec<Proposal>, LedgerError>;

    fn participant(&self, id: &ParticipantId) -> Result<Participant, LedgerError>;

    fn leading_proposal(&self) -> Result<usize, LedgerError>;

    fn leading_proposal_label(&self) -> Result<ProposalLabel, LedgerError>;

    fn receipts(&self) -> Result<Vec<Receipt>, LedgerError>;

    fn receipt_count(&self) -> Result<u64, LedgerError>;
}
