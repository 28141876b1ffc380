use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ballot_types::{ParticipantId, ProposalLabel};

use crate::error::LedgerError;
use crate::ledger::{Participant, Proposal, VotingLedger};
use crate::records::{Action, BallotSnapshot, Receipt};
use crate::replay::ReplayEngine;
use crate::traits::{BallotReader, BallotWriter};
use crate::validation::{TallyValidator, ValidationReport};

/// Shared, thread-safe ballot: one [`VotingLedger`] and its journal behind a
/// single lock.
///
/// Every mutating call holds the write lock from validation to the journal
/// append, so calls are applied in a total order and a rejected call leaves
/// both ledger and journal untouched.
pub struct InMemoryBallot {
    inner: RwLock<BallotState>,
}

struct BallotState {
    ledger: VotingLedger,
    receipts: Vec<Receipt>,
}

impl BallotState {
    fn next_receipt(&self, caller: ParticipantId, action: Action) -> Result<Receipt, LedgerError> {
        let prev_hash = self.receipts.last().map(|r| r.receipt_hash);
        Receipt::seal(self.receipts.len() as u64 + 1, prev_hash, caller, action)
    }
}

impl InMemoryBallot {
    /// Create a new ballot; `administrator` becomes the chairperson.
    pub fn deploy(
        administrator: ParticipantId,
        proposals: Vec<ProposalLabel>,
    ) -> Result<Self, LedgerError> {
        let ledger = VotingLedger::new(administrator, proposals.clone())?;
        let genesis = Receipt::seal(1, None, administrator, Action::Deploy { proposals })?;

        tracing::info!(
            administrator = %administrator,
            proposals = ledger.proposals().len(),
            "ballot deployed"
        );

        Ok(Self {
            inner: RwLock::new(BallotState {
                ledger,
                receipts: vec![genesis],
            }),
        })
    }

    /// Restore a ballot from a snapshot.
    ///
    /// The journal is replayed and must reproduce the snapshot's ledger
    /// exactly.
    pub fn from_snapshot(snapshot: BallotSnapshot) -> Result<Self, LedgerError> {
        let replayed = ReplayEngine::replay(&snapshot.receipts)?;
        if replayed.ledger != snapshot.ledger {
            return Err(LedgerError::IntegrityViolation {
                seq: replayed.applied,
                reason: "ledger state diverges from its journal".into(),
            });
        }

        tracing::debug!(receipts = replayed.applied, "ballot restored from snapshot");

        Ok(Self {
            inner: RwLock::new(BallotState {
                ledger: snapshot.ledger,
                receipts: snapshot.receipts,
            }),
        })
    }

    /// Replace the whole ballot with `snapshot`, which must pass the same
    /// replay check as [`from_snapshot`](Self::from_snapshot).
    pub fn restore(&self, snapshot: BallotSnapshot) -> Result<(), LedgerError> {
        let restored = Self::from_snapshot(snapshot)?;
        let state = restored
            .inner
            .into_inner()
            .map_err(|_| LedgerError::LockPoisoned)?;
        let seq = state.receipts.len();
        *self.write()? = state;
        tracing::debug!(receipts = seq, "ballot state replaced");
        Ok(())
    }

    /// Hash of the latest receipt.
    pub fn head(&self) -> Result<Option<[u8; 32]>, LedgerError> {
        Ok(self.read()?.receipts.last().map(|r| r.receipt_hash))
    }

    pub fn snapshot(&self) -> Result<BallotSnapshot, LedgerError> {
        let state = self.read()?;
        Ok(BallotSnapshot {
            ledger: state.ledger.clone(),
            receipts: state.receipts.clone(),
        })
    }

    /// Run the tally validator against the current ledger.
    pub fn validate(&self) -> Result<ValidationReport, LedgerError> {
        let state = self.read()?;
        Ok(TallyValidator::validate(&state.ledger))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BallotState>, LedgerError> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BallotState>, LedgerError> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl BallotWriter for InMemoryBallot {
    fn grant_right(
        &self,
        caller: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<Receipt, LedgerError> {
        let mut state = self.write()?;
        let receipt = state.next_receipt(*caller, Action::GrantRight { target: *target })?;

        if let Err(error) = state.ledger.grant_right(caller, target) {
            tracing::debug!(caller = %caller, target = %target, %error, "grant rejected");
            return Err(error);
        }
        state.receipts.push(receipt.clone());

        tracing::info!(target = %target, seq = receipt.seq, "voting right granted");
        Ok(receipt)
    }

    fn vote(&self, caller: &ParticipantId, proposal: usize) -> Result<Receipt, LedgerError> {
        let mut state = self.write()?;
        let weight = state.ledger.participant(caller).weight;
        let receipt = state.next_receipt(*caller, Action::Vote { proposal, weight })?;

        if let Err(error) = state.ledger.vote(caller, proposal) {
            tracing::debug!(caller = %caller, proposal, %error, "vote rejected");
            return Err(error);
        }
        state.receipts.push(receipt.clone());

        tracing::info!(caller = %caller, proposal, weight, seq = receipt.seq, "vote recorded");
        Ok(receipt)
    }

    fn delegate(
        &self,
        caller: &ParticipantId,
        to: &ParticipantId,
    ) -> Result<Receipt, LedgerError> {
        let mut state = self.write()?;
        let plan = match state.ledger.plan_delegation(caller, to) {
            Ok(plan) => plan,
            Err(error) => {
                tracing::debug!(caller = %caller, to = %to, %error, "delegation rejected");
                return Err(error);
            }
        };

        let receipt = state.next_receipt(
            *caller,
            Action::Delegate {
                to: *to,
                resolved: plan.delegate(),
                weight: plan.weight(),
                applied_to: plan.applied_to(),
            },
        )?;
        state.ledger.commit_delegation(&plan);
        state.receipts.push(receipt.clone());

        tracing::info!(
            caller = %caller,
            to = %to,
            resolved = %plan.delegate(),
            weight = plan.weight(),
            applied_to = ?plan.applied_to(),
            seq = receipt.seq,
            "weight delegated"
        );
        Ok(receipt)
    }
}

impl BallotReader for InMemoryBallot {
    fn administrator(&self) -> Result<ParticipantId, LedgerError> {
        Ok(self.read()?.ledger.administrator())
    }

    fn proposals(&self) -> Result<Vec<Proposal>, LedgerError> {
        Ok(self.read()?.ledger.proposals().to_vec())
    }

    fn participant(&self, id: &ParticipantId) -> Result<Participant, LedgerError> {
        Ok(self.read()?.ledger.participant(id))
    }

    fn leading_proposal(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.ledger.leading_proposal())
    }

    fn leading_proposal_label(&self) -> Result<ProposalLabel, LedgerError> {
        Ok(self.read()?.ledger.leading_proposal_label().clone())
    }

    fn receipts(&self) -> Result<Vec<Receipt>, LedgerError> {
        Ok(self.read()?.receipts.clone())
    }

    fn receipt_count(&self) -> Result<u64, LedgerError> {
        Ok(self.read()?.receipts.len() as u64)
    }
}
