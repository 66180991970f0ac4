use arena_types::ChallengeStatus;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    #[error("invalid transition: cannot {action} while {from}")]
    InvalidTransition {
        from: ChallengeStatus,
        action: &'static str,
    },

    #[error("{0} is not a participant in this challenge")]
    NotAParticipant(String),

    #[error("{0} has already submitted a result")]
    DuplicateResult(String),

    #[error("creator cannot join their own challenge")]
    SelfChallenge,

    #[error("challenge already has a pending joiner")]
    JoinerAlreadyPending,

    #[error("challenge is full ({0} seats)")]
    ChallengeFull(u32),

    #[error("{0} has already joined this challenge")]
    AlreadyJoined(String),

    #[error("only the creator may fund at this stage, got {0}")]
    WrongCreator(String),

    #[error("only the confirmed joiner may fund at this stage, got {0}")]
    WrongJoiner(String),

    #[error("the {which} deadline has passed")]
    DeadlinePassed { which: &'static str },

    #[error("dispute resolution winner {0} is not a participant")]
    InvalidWinner(String),

    #[error("challenge has no bracket")]
    BracketMissing,

    #[error("{0} has no match in play")]
    NoMatchInPlay(String),
}
