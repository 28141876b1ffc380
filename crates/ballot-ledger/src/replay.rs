use crate::error::LedgerError;
use crate::ledger::VotingLedger;
use crate::records::{Action, BallotSnapshot, Receipt};
use crate::traits::BallotReader;

/// Result of replaying a journal into a fresh ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayResult {
    pub ledger: VotingLedger,
    pub applied: u64,
    pub head: [u8; 32],
}

/// Deterministic journal replay.
///
/// Replay checks the hash chain receipt by receipt and re-executes each
/// action against a ledger built from the deploy receipt. Any divergence
/// from what the receipt recorded is an integrity violation.
pub struct ReplayEngine;

impl ReplayEngine {
    pub fn replay(receipts: &[Receipt]) -> Result<ReplayResult, LedgerError> {
        let Some((genesis, rest)) = receipts.split_first() else {
            return Err(violation(0, "journal is empty"));
        };

        check_link(genesis, None, 1)?;
        let Action::Deploy { proposals } = &genesis.action else {
            return Err(violation(genesis.seq, "first receipt must be a deploy"));
        };
        let mut ledger = VotingLedger::new(genesis.caller, proposals.clone())
            .map_err(|e| rejected(genesis.seq, &e))?;

        let mut prev = genesis;
        for receipt in rest {
            check_link(receipt, Some(prev.receipt_hash), prev.seq + 1)?;
            apply(&mut ledger, receipt)?;
            prev = receipt;
        }

        Ok(ReplayResult {
            ledger,
            applied: receipts.len() as u64,
            head: prev.receipt_hash,
        })
    }

    pub fn replay_from<R: BallotReader>(reader: &R) -> Result<ReplayResult, LedgerError> {
        Self::replay(&reader.receipts()?)
    }

    /// `true` when the snapshot's ledger equals the replay of its journal.
    pub fn verify_convergence(snapshot: &BallotSnapshot) -> Result<bool, LedgerError> {
        let replayed = Self::replay(&snapshot.receipts)?;
        Ok(replayed.ledger == snapshot.ledger)
    }
}

fn check_link(
    receipt: &Receipt,
    expected_prev: Option<[u8; 32]>,
    expected_seq: u64,
) -> Result<(), LedgerError> {
    if receipt.seq != expected_seq {
        return Err(violation(
            receipt.seq,
            &format!("expected seq {expected_seq}, found {}", receipt.seq),
        ));
    }
    if receipt.prev_hash != expected_prev {
        return Err(violation(receipt.seq, "previous hash link mismatch"));
    }
    if receipt.compute_hash()? != receipt.receipt_hash {
        return Err(violation(receipt.seq, "receipt hash mismatch"));
    }
    Ok(())
}

fn apply(ledger: &mut VotingLedger, receipt: &Receipt) -> Result<(), LedgerError> {
    let seq = receipt.seq;
    match &receipt.action {
        Action::Deploy { .. } => Err(violation(seq, "deploy after genesis")),
        Action::GrantRight { target } => ledger
            .grant_right(&receipt.caller, target)
            .map_err(|e| rejected(seq, &e)),
        Action::Vote { proposal, weight } => {
            let applied = ledger
                .vote(&receipt.caller, *proposal)
                .map_err(|e| rejected(seq, &e))?;
            if applied != *weight {
                return Err(violation(
                    seq,
                    &format!("vote weight {applied} differs from recorded {weight}"),
                ));
            }
            Ok(())
        }
        Action::Delegate {
            to,
            resolved,
            weight,
            applied_to,
        } => {
            let plan = ledger
                .delegate(&receipt.caller, to)
                .map_err(|e| rejected(seq, &e))?;
            if plan.delegate() != *resolved
                || plan.weight() != *weight
                || plan.applied_to() != *applied_to
            {
                return Err(violation(seq, "delegation resolved differently on replay"));
            }
            Ok(())
        }
    }
}

fn violation(seq: u64, reason: &str) -> LedgerError {
    LedgerError::IntegrityViolation {
        seq,
        reason: reason.to_string(),
    }
}

fn rejected(seq: u64, error: &LedgerError) -> LedgerError {
    violation(seq, &format!("action rejected on replay: {error}"))
}
