//! Rejection reasons reported by the state machine.

use thiserror::Error;

use auction_types::{Credential, Status, Timestamp};

/// Guard failures. Each is final for the given input: retrying the same
/// action without changing it cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Not authorized: {actor} may not {action}")]
    WrongActor {
        action: &'static str,
        actor: Credential,
    },

    #[error("Insufficient bid: {proposed} does not exceed current amount {current}")]
    InsufficientBid { current: u64, proposed: u64 },

    #[error("Deadline passed at {deadline} (now {now})")]
    DeadlinePassed { deadline: Timestamp, now: Timestamp },

    #[error("Auction has ended")]
    TerminalState,

    #[error("Malformed amount: {0}")]
    MalformedAmount(String),

    #[error("Cannot {action} while auction is {status}")]
    InvalidStatus {
        action: &'static str,
        status: Status,
    },

    #[error("No pending withdrawal for this party")]
    NoPendingWithdrawal,
}
