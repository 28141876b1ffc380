/// Errors produced by ballot operations.
///
/// The first group are rejections of a single call: they are returned before
/// any state is touched, so a failed call never has an observable effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("caller has no right to perform this action")]
    Unauthorized,

    #[error("the voter already voted")]
    AlreadyVoted,

    #[error("the voter already has the right to vote")]
    AlreadyEnfranchised,

    #[error("self-delegation is disallowed")]
    InvalidDelegate,

    #[error("found loop in delegation")]
    SelfDelegationCycle,

    #[error("delegation chain exceeds {max} hops")]
    DelegationChainTooLong { max: usize },

    #[error("proposal {index} does not exist ({count} proposals)")]
    InvalidProposal { index: usize, count: usize },

    #[error("delegate has no right to vote")]
    IneligibleDelegate,

    #[error("a ballot needs at least one proposal")]
    EmptyBallot,

    #[error("integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("ballot lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    /// Returns `true` for errors that reject a caller's request, as opposed
    /// to faults in the ledger itself.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::IntegrityViolation { .. } | Self::Serialization(_) | Self::LockPoisoned
        )
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::AlreadyVoted => "AlreadyVoted",
            Self::AlreadyEnfranchised => "AlreadyEnfranchised",
            Self::InvalidDelegate => "InvalidDelegate",
            Self::SelfDelegationCycle => "SelfDelegationCycle",
            Self::DelegationChainTooLong { .. } => "DelegationChainTooLong",
            Self::InvalidProposal { .. } => "InvalidProposal",
            Self::IneligibleDelegate => "IneligibleDelegate",
            Self::EmptyBallot => "EmptyBallot",
            Self::IntegrityViolation { .. } => "IntegrityViolation",
            Self::Serialization(_) => "Serialization",
            Self::LockPoisoned => "LockPoisoned",
        }
    }
}
