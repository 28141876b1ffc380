use ballot_types::ParticipantId;

use crate::ledger::{ParticipantState, VotingLedger};

/// Result of checking a ledger's tally invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    /// Units of weight ever granted.
    pub issued_weight: u64,
    /// Weight counted in proposal tallies.
    pub tallied_weight: u64,
    /// Weight held by participants who have not voted or delegated yet.
    pub pending_weight: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub participant: Option<ParticipantId>,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    AdministratorDisenfranchised,
    WeightNotConserved,
    ProposalOutOfRange,
    UnknownDelegate,
}

/// Checks the invariants that tie participants to the tally.
///
/// Weight is conserved when every granted unit sits either in a proposal's
/// count or with a participant who has not used it yet:
/// `sum(vote_count) + sum(weight of idle participants) == issued_weight`.
pub struct TallyValidator;

impl TallyValidator {
    pub fn validate(ledger: &VotingLedger) -> ValidationReport {
        let mut violations = Vec::new();

        let administrator = ledger.administrator();
        if ledger.participant(&administrator).weight == 0 {
            violations.push(Violation {
                participant: Some(administrator),
                kind: ViolationKind::AdministratorDisenfranchised,
                description: "administrator has no voting weight".into(),
            });
        }

        let proposal_count = ledger.proposals().len();
        let mut pending_weight = 0u64;
        for (id, participant) in ledger.participants() {
            match participant.state {
                ParticipantState::Idle => pending_weight += participant.weight,
                ParticipantState::Voted { proposal } if proposal >= proposal_count => {
                    violations.push(Violation {
                        participant: Some(*id),
                        kind: ViolationKind::ProposalOutOfRange,
                        description: format!(
                            "voted for proposal {proposal}, only {proposal_count} exist"
                        ),
                    });
                }
                ParticipantState::Delegated { to } if !ledger.participant(&to).is_eligible() => {
                    violations.push(Violation {
                        participant: Some(*id),
                        kind: ViolationKind::UnknownDelegate,
                        description: format!("delegated to {to}, who holds no voting right"),
                    });
                }
                _ => {}
            }
        }

        let tallied_weight: u64 = ledger.proposals().iter().map(|p| p.vote_count).sum();
        let issued_weight = ledger.issued_weight();
        if tallied_weight + pending_weight != issued_weight {
            violations.push(Violation {
                participant: None,
                kind: ViolationKind::WeightNotConserved,
                description: format!(
                    "tallied {tallied_weight} + pending {pending_weight} != issued {issued_weight}"
                ),
            });
        }

        ValidationReport {
            issued_weight,
            tallied_weight,
            pending_weight,
            violations,
        }
    }
}
