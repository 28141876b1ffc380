use std::fmt;

use ballot_types::{ParticipantId, ProposalLabel};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::VotingLedger;

/// A state change accepted by the ballot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Ballot creation; the caller becomes administrator.
    Deploy { proposals: Vec<ProposalLabel> },
    /// The administrator gave `target` the right to vote.
    GrantRight { target: ParticipantId },
    /// The caller voted with `weight` for the proposal at `proposal`.
    Vote { proposal: usize, weight: u64 },
    /// The caller delegated `weight` to `to`; the chain ended at `resolved`.
    /// `applied_to` is set when `resolved` had already voted.
    Delegate {
        to: ParticipantId,
        resolved: ParticipantId,
        weight: u64,
        applied_to: Option<usize>,
    },
}

impl Action {
    /// Human-readable action name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deploy { .. } => "Deploy",
            Self::GrantRight { .. } => "Give right to vote",
            Self::Vote { .. } => "Vote",
            Self::Delegate { .. } => "Delegate",
        }
    }
}

/// Journal entry for one accepted action, hash-linked to its predecessor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// 1-based position in the journal.
    pub seq: u64,
    pub prev_hash: Option<[u8; 32]>,
    pub receipt_hash: [u8; 32],
    pub caller: ParticipantId,
    pub action: Action,
}

impl Receipt {
    /// Build a receipt and fill in its hash.
    pub fn seal(
        seq: u64,
        prev_hash: Option<[u8; 32]>,
        caller: ParticipantId,
        action: Action,
    ) -> Result<Self, LedgerError> {
        let mut receipt = Self {
            seq,
            prev_hash,
            receipt_hash: [0; 32],
            caller,
            action,
        };
        receipt.receipt_hash = receipt.compute_hash()?;
        Ok(receipt)
    }

    /// Hash of the receipt contents, ignoring the stored `receipt_hash`.
    pub fn compute_hash(&self) -> Result<[u8; 32], LedgerError> {
        let mut canonical = self.clone();
        canonical.receipt_hash = [0; 32];
        let encoded = serde_json::to_vec(&canonical)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"ballot-receipt-v1:");
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.receipt_hash))
    }

    pub fn short_hash(&self) -> String {
        hex::encode(&self.receipt_hash[..4])
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r#{} [{}] {}", self.seq, self.short_hash(), self.action.name())
    }
}

/// Everything needed to restore a ballot: the current ledger and the
/// journal that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotSnapshot {
    pub ledger: VotingLedger,
    pub receipts: Vec<Receipt>,
}

impl BallotSnapshot {
    /// Hash of the last journal entry.
    pub fn head(&self) -> Option<[u8; 32]> {
        self.receipts.last().map(|r| r.receipt_hash)
    }
}
