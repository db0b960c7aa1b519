//! Engine error taxonomy. The codes are part of the wire protocol: they are
//! echoed to the offending client and recorded in INVALID_ACTION log events.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineErrorCode {
    InvalidBid,
    HookViolation,
    RoundNotReady,
    NotPlayersTurn,
    CardNotInHand,
    MustFollowSuit,
    CannotLeadTrump,
    TrickIncomplete,
    RoundNotComplete,
    InvalidPlay,
}

impl EngineErrorCode {
    /// Canonical SCREAMING_SNAKE_CASE string, exactly as it appears on the wire.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidBid => "INVALID_BID",
            Self::HookViolation => "HOOK_VIOLATION",
            Self::RoundNotReady => "ROUND_NOT_READY",
            Self::NotPlayersTurn => "NOT_PLAYERS_TURN",
            Self::CardNotInHand => "CARD_NOT_IN_HAND",
            Self::MustFollowSuit => "MUST_FOLLOW_SUIT",
            Self::CannotLeadTrump => "CANNOT_LEAD_TRUMP",
            Self::TrickIncomplete => "TRICK_INCOMPLETE",
            Self::RoundNotComplete => "ROUND_NOT_COMPLETE",
            Self::InvalidPlay => "INVALID_PLAY",
        }
    }
}

/// A rejected engine operation. Errors never mutate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub code: EngineErrorCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_bid(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::InvalidBid, message)
    }

    pub fn hook_violation(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::HookViolation, message)
    }

    pub fn round_not_ready(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::RoundNotReady, message)
    }

    pub fn not_players_turn(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::NotPlayersTurn, message)
    }

    pub fn card_not_in_hand(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::CardNotInHand, message)
    }

    pub fn must_follow_suit(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::MustFollowSuit, message)
    }

    pub fn cannot_lead_trump(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::CannotLeadTrump, message)
    }

    pub fn trick_incomplete(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::TrickIncomplete, message)
    }

    pub fn round_not_complete(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::RoundNotComplete, message)
    }

    pub fn invalid_play(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::InvalidPlay, message)
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl Error for EngineError {}

/// Replay failures: the log is either structurally broken or reproduces a
/// state that violates the engine invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    CorruptLog { detail: String },
    InvariantViolation { detail: String },
}

impl Display for ReplayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReplayError::CorruptLog { detail } => write!(f, "CORRUPT_LOG: {detail}"),
            ReplayError::InvariantViolation { detail } => {
                write!(f, "INVARIANT_VIOLATION: {detail}")
            }
        }
    }
}

impl Error for ReplayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_wire_stable() {
        assert_eq!(EngineErrorCode::InvalidBid.as_str(), "INVALID_BID");
        assert_eq!(EngineErrorCode::HookViolation.as_str(), "HOOK_VIOLATION");
        assert_eq!(EngineErrorCode::MustFollowSuit.as_str(), "MUST_FOLLOW_SUIT");
        assert_eq!(
            EngineErrorCode::CannotLeadTrump.as_str(),
            "CANNOT_LEAD_TRUMP"
        );
        let json = serde_json::to_string(&EngineErrorCode::NotPlayersTurn).unwrap();
        assert_eq!(json, "\"NOT_PLAYERS_TURN\"");
    }
}
