use std::collections::HashMap;

use ballot_types::{ParticipantId, ProposalLabel};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Upper bound on the number of hops followed when resolving a delegation
/// chain. Chains longer than this are rejected with
/// [`LedgerError::DelegationChainTooLong`].
pub const MAX_DELEGATION_DEPTH: usize = 256;

/// A ballot option and its running tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub label: ProposalLabel,
    pub vote_count: u64,
}

/// What a participant has done with their weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParticipantState {
    /// Has not voted or delegated yet.
    #[default]
    Idle,
    /// Voted directly for the proposal at this index.
    Voted { proposal: usize },
    /// Handed their weight to another participant.
    Delegated { to: ParticipantId },
}

/// Voting record of a single participant.
///
/// Participants that were never granted a right are represented by the
/// default record: weight 0, idle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub weight: u64,
    pub state: ParticipantState,
}

impl Participant {
    /// `true` once the participant's weight has been used, either by voting
    /// or by delegating. Never reset.
    pub fn voted(&self) -> bool {
        !matches!(self.state, ParticipantState::Idle)
    }

    pub fn chosen_proposal(&self) -> Option<usize> {
        match self.state {
            ParticipantState::Voted { proposal } => Some(proposal),
            _ => None,
        }
    }

    pub fn delegated_to(&self) -> Option<ParticipantId> {
        match self.state {
            ParticipantState::Delegated { to } => Some(to),
            _ => None,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.weight > 0
    }
}

/// A resolved delegation that has not been applied yet.
///
/// Produced by [`VotingLedger::plan_delegation`], which performs every check
/// and walks the whole chain without mutating anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelegationPlan {
    caller: ParticipantId,
    target: ParticipantId,
    delegate: ParticipantId,
    weight: u64,
    applied_to: Option<usize>,
}

impl DelegationPlan {
    /// The participant the caller named.
    pub fn target(&self) -> ParticipantId {
        self.target
    }

    /// End of the delegation chain: the participant that ends up holding
    /// (or has already spent) the weight.
    pub fn delegate(&self) -> ParticipantId {
        self.delegate
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Proposal credited immediately, when the delegate already voted.
    pub fn applied_to(&self) -> Option<usize> {
        self.applied_to
    }
}

/// Single-chairperson weighted voting ledger with transitive delegation.
///
/// The ledger is a plain synchronous state machine. Every mutating call
/// validates fully before changing anything, so a rejected call leaves the
/// ledger untouched. Sharing across threads goes through
/// [`InMemoryBallot`](crate::InMemoryBallot).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LedgerRepr")]
pub struct VotingLedger {
    administrator: ParticipantId,
    proposals: Vec<Proposal>,
    participants: HashMap<ParticipantId, Participant>,
    issued_weight: u64,
}

impl VotingLedger {
    /// Create a ballot over `labels`, with `administrator` as the only
    /// participant allowed to grant voting rights. The administrator starts
    /// with weight 1.
    pub fn new(
        administrator: ParticipantId,
        labels: Vec<ProposalLabel>,
    ) -> Result<Self, LedgerError> {
        if labels.is_empty() {
            return Err(LedgerError::EmptyBallot);
        }

        let proposals = labels
            .into_iter()
            .map(|label| Proposal {
                label,
                vote_count: 0,
            })
            .collect();

        let mut participants = HashMap::new();
        participants.insert(
            administrator,
            Participant {
                weight: 1,
                state: ParticipantState::Idle,
            },
        );

        Ok(Self {
            administrator,
            proposals,
            participants,
            issued_weight: 1,
        })
    }

    pub fn administrator(&self) -> ParticipantId {
        self.administrator
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn proposal(&self, index: usize) -> Option<&Proposal> {
        self.proposals.get(index)
    }

    /// Record for `id`; unknown participants get the default record.
    pub fn participant(&self, id: &ParticipantId) -> Participant {
        self.participants.get(id).copied().unwrap_or_default()
    }

    /// All participants that have a record.
    pub fn participants(&self) -> impl Iterator<Item = (&ParticipantId, &Participant)> {
        self.participants.iter()
    }

    /// Total units of weight handed out: one for the administrator plus one
    /// per granted right.
    pub fn issued_weight(&self) -> u64 {
        self.issued_weight
    }

    /// Give `target` the right to vote. Only the administrator may call this.
    pub fn grant_right(
        &mut self,
        caller: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<(), LedgerError> {
        if *caller != self.administrator {
            return Err(LedgerError::Unauthorized);
        }

        let voter = self.participant(target);
        if voter.voted() {
            return Err(LedgerError::AlreadyVoted);
        }
        if voter.weight != 0 {
            return Err(LedgerError::AlreadyEnfranchised);
        }

        self.participants.entry(*target).or_default().weight = 1;
        self.issued_weight += 1;
        Ok(())
    }

    /// Cast the caller's whole weight for `proposal`. Returns the weight
    /// that was added to the tally.
    pub fn vote(&mut self, caller: &ParticipantId, proposal: usize) -> Result<u64, LedgerError> {
        let sender = self.participant(caller);
        if !sender.is_eligible() {
            return Err(LedgerError::Unauthorized);
        }
        if sender.voted() {
            return Err(LedgerError::AlreadyVoted);
        }
        let count = self.proposals.len();
        let Some(entry) = self.proposals.get_mut(proposal) else {
            return Err(LedgerError::InvalidProposal {
                index: proposal,
                count,
            });
        };

        entry.vote_count += sender.weight;
        self.participants.entry(*caller).or_default().state =
            ParticipantState::Voted { proposal };
        Ok(sender.weight)
    }

    /// Delegate the caller's weight to `target`, following `target`'s own
    /// delegations to the end of the chain.
    pub fn delegate(
        &mut self,
        caller: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<DelegationPlan, LedgerError> {
        let plan = self.plan_delegation(caller, target)?;
        self.commit_delegation(&plan);
        Ok(plan)
    }

    /// Run every check of [`delegate`](Self::delegate) and resolve the chain
    /// without changing state.
    pub fn plan_delegation(
        &self,
        caller: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<DelegationPlan, LedgerError> {
        if caller == target {
            return Err(LedgerError::InvalidDelegate);
        }

        let sender = self.participant(caller);
        if !sender.is_eligible() {
            return Err(LedgerError::Unauthorized);
        }
        if sender.voted() {
            return Err(LedgerError::AlreadyVoted);
        }

        let delegate = self.resolve_chain(caller, target)?;
        let terminal = self.participant(&delegate);
        if !terminal.is_eligible() {
            return Err(LedgerError::IneligibleDelegate);
        }
        if let Some(index) = terminal.chosen_proposal() {
            if index >= self.proposals.len() {
                return Err(LedgerError::IntegrityViolation {
                    seq: 0,
                    reason: format!("{delegate} voted for missing proposal {index}"),
                });
            }
        }

        Ok(DelegationPlan {
            caller: *caller,
            target: *target,
            delegate,
            weight: sender.weight,
            applied_to: terminal.chosen_proposal(),
        })
    }

    /// Apply a plan produced by [`plan_delegation`](Self::plan_delegation)
    /// against this same, unchanged ledger.
    pub(crate) fn commit_delegation(&mut self, plan: &DelegationPlan) {
        self.participants.entry(plan.caller).or_default().state =
            ParticipantState::Delegated { to: plan.target };

        match plan.applied_to {
            Some(index) => {
                if let Some(proposal) = self.proposals.get_mut(index) {
                    proposal.vote_count += plan.weight;
                }
            }
            None => self.participants.entry(plan.delegate).or_default().weight += plan.weight,
        }
    }

    fn resolve_chain(
        &self,
        caller: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<ParticipantId, LedgerError> {
        let mut current = *target;
        let mut hops = 0usize;
        while let Some(next) = self.participant(&current).delegated_to() {
            hops += 1;
            if next == *caller {
                return Err(LedgerError::SelfDelegationCycle);
            }
            if hops > MAX_DELEGATION_DEPTH {
                return Err(LedgerError::DelegationChainTooLong {
                    max: MAX_DELEGATION_DEPTH,
                });
            }
            current = next;
        }
        tracing::trace!(%target, delegate = %current, hops, "delegation chain resolved");
        Ok(current)
    }

    /// Index of the proposal with the most votes. Ties go to the lowest
    /// index; with no votes cast this is 0.
    pub fn leading_proposal(&self) -> usize {
        let mut leader = 0;
        let mut best = 0;
        for (index, proposal) in self.proposals.iter().enumerate() {
            if proposal.vote_count > best {
                best = proposal.vote_count;
                leader = index;
            }
        }
        leader
    }

    pub fn leading_proposal_label(&self) -> &ProposalLabel {
        &self.proposals[self.leading_proposal()].label
    }
}

#[derive(Deserialize)]
struct LedgerRepr {
    administrator: ParticipantId,
    proposals: Vec<Proposal>,
    participants: HashMap<ParticipantId, Participant>,
    issued_weight: u64,
}

impl TryFrom<LedgerRepr> for VotingLedger {
    type Error = LedgerError;

    fn try_from(repr: LedgerRepr) -> Result<Self, Self::Error> {
        if repr.proposals.is_empty() {
            return Err(LedgerError::EmptyBallot);
        }
        Ok(Self {
            administrator: repr.administrator,
            proposals: repr.proposals,
            participants: repr.participants,
            issued_weight: repr.issued_weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<ProposalLabel> {
        names.iter().map(|n| ProposalLabel::new(*n).unwrap()).collect()
    }

    fn id(name: &str) -> ParticipantId {
        ParticipantId::named(name)
    }

    fn ballot() -> VotingLedger {
        VotingLedger::new(id("a0"), labels(&["P1", "P2", "P3"])).unwrap()
    }

    fn enfranchise(ledger: &mut VotingLedger, names: &[&str]) {
        for name in names {
            ledger.grant_right(&id("a0"), &id(name)).unwrap();
        }
    }

    #[test]
    fn construction_sets_administrator_and_zero_counts() {
        let ledger = ballot();
        assert_eq!(ledger.administrator(), id("a0"));
        assert_eq!(ledger.participant(&id("a0")).weight, 1);
        assert_eq!(ledger.proposals().len(), 3);
        assert!(ledger.proposals().iter().all(|p| p.vote_count == 0));
        assert_eq!(ledger.proposal(2).unwrap().label.as_str(), "P3");
        assert_eq!(ledger.issued_weight(), 1);
    }

    #[test]
    fn construction_requires_proposals() {
        assert_eq!(
            VotingLedger::new(id("a0"), vec![]).unwrap_err(),
            LedgerError::EmptyBallot
        );
    }

    #[test]
    fn unknown_participants_have_default_record() {
        let record = ballot().participant(&id("nobody"));
        assert_eq!(record, Participant::default());
        assert!(!record.voted());
        assert!(!record.is_eligible());
    }

    #[test]
    fn only_administrator_grants_rights() {
        let mut ledger = ballot();
        assert_eq!(
            ledger.grant_right(&id("a1"), &id("a1")).unwrap_err(),
            LedgerError::Unauthorized
        );
        assert_eq!(ledger.participant(&id("a1")).weight, 0);
    }

    #[test]
    fn grant_is_not_idempotent() {
        let mut ledger = ballot();
        ledger.grant_right(&id("a0"), &id("a1")).unwrap();
        assert_eq!(ledger.participant(&id("a1")).weight, 1);
        assert_eq!(
            ledger.grant_right(&id("a0"), &id("a1")).unwrap_err(),
            LedgerError::AlreadyEnfranchised
        );
        assert_eq!(ledger.issued_weight(), 2);
    }

    #[test]
    fn administrator_cannot_regrant_self() {
        let mut ledger = ballot();
        assert_eq!(
            ledger.grant_right(&id("a0"), &id("a0")).unwrap_err(),
            LedgerError::AlreadyEnfranchised
        );
    }

    #[test]
    fn grant_to_voter_fails_with_already_voted() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1"]);
        ledger.vote(&id("a1"), 0).unwrap();
        assert_eq!(
            ledger.grant_right(&id("a0"), &id("a1")).unwrap_err(),
            LedgerError::AlreadyVoted
        );
    }

    #[test]
    fn vote_records_choice_and_weight() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1"]);
        assert_eq!(ledger.vote(&id("a1"), 0).unwrap(), 1);

        let voter = ledger.participant(&id("a1"));
        assert!(voter.voted());
        assert_eq!(voter.chosen_proposal(), Some(0));
        assert_eq!(ledger.proposal(0).unwrap().vote_count, 1);
    }

    #[test]
    fn vote_without_weight_is_unauthorized() {
        let mut ledger = ballot();
        assert_eq!(
            ledger.vote(&id("a1"), 0).unwrap_err(),
            LedgerError::Unauthorized
        );
    }

    #[test]
    fn double_vote_is_rejected() {
        let mut ledger = ballot();
        ledger.vote(&id("a0"), 1).unwrap();
        assert_eq!(
            ledger.vote(&id("a0"), 2).unwrap_err(),
            LedgerError::AlreadyVoted
        );
        assert_eq!(ledger.proposal(2).unwrap().vote_count, 0);
    }

    #[test]
    fn out_of_range_vote_is_rejected_without_side_effects() {
        let mut ledger = ballot();
        let before = ledger.clone();
        assert_eq!(
            ledger.vote(&id("a0"), 3).unwrap_err(),
            LedgerError::InvalidProposal { index: 3, count: 3 }
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn self_delegation_is_invalid_regardless_of_weight() {
        let mut ledger = ballot();
        assert_eq!(
            ledger.delegate(&id("a0"), &id("a0")).unwrap_err(),
            LedgerError::InvalidDelegate
        );
        assert_eq!(
            ledger.delegate(&id("ghost"), &id("ghost")).unwrap_err(),
            LedgerError::InvalidDelegate
        );
    }

    #[test]
    fn delegation_without_weight_is_unauthorized() {
        let mut ledger = ballot();
        assert_eq!(
            ledger.delegate(&id("a1"), &id("a0")).unwrap_err(),
            LedgerError::Unauthorized
        );
    }

    #[test]
    fn delegation_after_voting_is_rejected() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1"]);
        ledger.vote(&id("a1"), 0).unwrap();
        assert_eq!(
            ledger.delegate(&id("a1"), &id("a0")).unwrap_err(),
            LedgerError::AlreadyVoted
        );
    }

    #[test]
    fn delegation_to_idle_voter_accumulates_weight() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1", "a2"]);

        let plan = ledger.delegate(&id("a1"), &id("a2")).unwrap();
        assert_eq!(plan.delegate(), id("a2"));
        assert_eq!(plan.applied_to(), None);

        let delegator = ledger.participant(&id("a1"));
        assert!(delegator.voted());
        assert_eq!(delegator.delegated_to(), Some(id("a2")));
        assert_eq!(ledger.participant(&id("a2")).weight, 2);
        assert!(ledger.proposals().iter().all(|p| p.vote_count == 0));
    }

    #[test]
    fn delegation_to_voter_credits_their_proposal() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1", "a2"]);
        ledger.vote(&id("a1"), 1).unwrap();

        let plan = ledger.delegate(&id("a2"), &id("a1")).unwrap();
        assert_eq!(plan.applied_to(), Some(1));
        assert_eq!(ledger.proposal(1).unwrap().vote_count, 2);
        assert_eq!(ledger.participant(&id("a1")).weight, 1);
    }

    #[test]
    fn delegation_to_unenfranchised_terminal_is_rejected() {
        let mut ledger = ballot();
        assert_eq!(
            ledger.delegate(&id("a0"), &id("stranger")).unwrap_err(),
            LedgerError::IneligibleDelegate
        );
        assert!(!ledger.participant(&id("a0")).voted());
    }

    #[test]
    fn chained_delegation_flows_to_the_end_of_the_chain() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1", "a2", "a3"]);
        ledger.delegate(&id("a1"), &id("a2")).unwrap();
        ledger.delegate(&id("a2"), &id("a3")).unwrap();

        assert_eq!(ledger.participant(&id("a3")).weight, 3);
        assert!(ledger.proposals().iter().all(|p| p.vote_count == 0));

        // a late delegator to a1 walks a1 -> a2 -> a3
        enfranchise(&mut ledger, &["a4"]);
        let plan = ledger.delegate(&id("a4"), &id("a1")).unwrap();
        assert_eq!(plan.delegate(), id("a3"));
        assert_eq!(ledger.participant(&id("a4")).delegated_to(), Some(id("a1")));
        assert_eq!(ledger.participant(&id("a3")).weight, 4);

        ledger.vote(&id("a3"), 2).unwrap();
        assert_eq!(ledger.proposal(2).unwrap().vote_count, 4);
    }

    #[test]
    fn delegation_loop_is_detected_before_mutation() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1", "a2"]);
        ledger.delegate(&id("a1"), &id("a2")).unwrap();
        let before = ledger.clone();

        assert_eq!(
            ledger.delegate(&id("a2"), &id("a1")).unwrap_err(),
            LedgerError::SelfDelegationCycle
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn longer_loop_is_detected_before_mutation() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1", "a2", "a3"]);
        ledger.delegate(&id("a1"), &id("a2")).unwrap();
        ledger.delegate(&id("a2"), &id("a3")).unwrap();
        let before = ledger.clone();

        assert_eq!(
            ledger.delegate(&id("a3"), &id("a1")).unwrap_err(),
            LedgerError::SelfDelegationCycle
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn loop_past_the_bound_is_reported_as_loop() {
        let mut ledger = ballot();
        let chain: Vec<ParticipantId> = (0..=MAX_DELEGATION_DEPTH + 1)
            .map(|i| id(&format!("voter-{i}")))
            .collect();
        for voter in &chain {
            ledger.grant_right(&id("a0"), voter).unwrap();
        }
        for pair in chain.windows(2).rev() {
            ledger.delegate(&pair[0], &pair[1]).unwrap();
        }

        // the walk from voter-0 reaches the caller on hop MAX + 1
        let last = chain[MAX_DELEGATION_DEPTH + 1];
        assert_eq!(
            ledger.delegate(&last, &chain[0]).unwrap_err(),
            LedgerError::SelfDelegationCycle
        );
    }

    #[test]
    fn delegate_with_missing_proposal_is_an_integrity_error() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1"]);
        let mut json = serde_json::to_value(&ledger).unwrap();
        json["participants"][id("a1").to_hex()] =
            serde_json::json!({ "weight": 1, "state": { "status": "voted", "proposal": 9 } });
        let mut tampered: VotingLedger = serde_json::from_value(json).unwrap();
        let before = tampered.clone();

        assert!(matches!(
            tampered.delegate(&id("a0"), &id("a1")),
            Err(LedgerError::IntegrityViolation { .. })
        ));
        assert_eq!(tampered, before);
    }

    #[test]
    fn overlong_chain_is_rejected() {
        let mut ledger = ballot();
        let chain: Vec<ParticipantId> = (0..=MAX_DELEGATION_DEPTH + 1)
            .map(|i| id(&format!("voter-{i}")))
            .collect();
        for voter in &chain {
            ledger.grant_right(&id("a0"), voter).unwrap();
        }
        // voter-0 -> voter-1 -> ... with the tail delegating first so each
        // hop lands on an idle participant
        for pair in chain.windows(2).rev() {
            ledger.delegate(&pair[0], &pair[1]).unwrap();
        }

        assert_eq!(
            ledger.delegate(&id("a0"), &chain[0]).unwrap_err(),
            LedgerError::DelegationChainTooLong {
                max: MAX_DELEGATION_DEPTH
            }
        );
    }

    #[test]
    fn chain_at_the_bound_is_accepted() {
        let mut ledger = ballot();
        let chain: Vec<ParticipantId> = (0..=MAX_DELEGATION_DEPTH)
            .map(|i| id(&format!("voter-{i}")))
            .collect();
        for voter in &chain {
            ledger.grant_right(&id("a0"), voter).unwrap();
        }
        for pair in chain.windows(2).rev() {
            ledger.delegate(&pair[0], &pair[1]).unwrap();
        }

        let plan = ledger.delegate(&id("a0"), &chain[0]).unwrap();
        assert_eq!(plan.delegate(), chain[MAX_DELEGATION_DEPTH]);
    }

    #[test]
    fn leading_proposal_defaults_to_first() {
        let ledger = ballot();
        assert_eq!(ledger.leading_proposal(), 0);
        assert_eq!(ledger.leading_proposal_label().as_str(), "P1");
    }

    #[test]
    fn leading_proposal_follows_votes() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1"]);
        ledger.vote(&id("a1"), 1).unwrap();
        assert_eq!(ledger.leading_proposal(), 1);
        assert_eq!(ledger.leading_proposal_label().as_str(), "P2");
    }

    #[test]
    fn ties_keep_the_lower_index() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1"]);
        ledger.vote(&id("a0"), 2).unwrap();
        ledger.vote(&id("a1"), 1).unwrap();
        assert_eq!(ledger.leading_proposal(), 1);
    }

    #[test]
    fn chairperson_scenario() {
        let mut ledger = ballot();
        ledger.grant_right(&id("a0"), &id("a1")).unwrap();
        ledger.vote(&id("a1"), 1).unwrap();
        assert_eq!(ledger.proposal(1).unwrap().vote_count, 1);
        assert_eq!(ledger.leading_proposal(), 1);

        ledger.grant_right(&id("a0"), &id("a2")).unwrap();
        ledger.delegate(&id("a2"), &id("a1")).unwrap();
        assert_eq!(ledger.proposal(1).unwrap().vote_count, 2);

        assert_eq!(
            ledger.grant_right(&id("a0"), &id("a1")).unwrap_err(),
            LedgerError::AlreadyVoted
        );
    }

    #[test]
    fn serde_roundtrip_preserves_state() {
        let mut ledger = ballot();
        enfranchise(&mut ledger, &["a1", "a2"]);
        ledger.delegate(&id("a1"), &id("a2")).unwrap();
        ledger.vote(&id("a2"), 2).unwrap();

        let json = serde_json::to_string(&ledger).unwrap();
        let parsed: VotingLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ledger);
    }

    #[test]
    fn deserialization_rejects_empty_ballot() {
        let admin = id("a0").to_hex();
        let json = format!(
            r#"{{"administrator":"{admin}","proposals":[],"participants":{{}},"issued_weight":1}}"#
        );
        assert!(serde_json::from_str::<VotingLedger>(&json).is_err());
    }
}
