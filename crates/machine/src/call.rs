//! Action and transition types for the auction state machine.

use auction_types::{AuctionState, Credential, PendingWithdrawal, RedeemerKind};
use serde::{Deserialize, Serialize};

/// A user-requested action against the current auction record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionAction {
    /// Open bidding at a starting amount (smallest unit).
    Start { starting_amount: u64 },

    /// Bid, or raise if the actor already leads. The edge is decided by the
    /// state machine, never by the caller.
    BidOrRaise { amount: u64 },

    /// Reclaim funds from a pending withdrawal record.
    Withdraw,

    /// Close the auction, freezing bidder and amount.
    End,
}

impl AuctionAction {
    pub fn name(&self) -> &'static str {
        match self {
            AuctionAction::Start { .. } => "start",
            AuctionAction::BidOrRaise { .. } => "bid",
            AuctionAction::Withdraw => "withdraw",
            AuctionAction::End => "end",
        }
    }
}

/// The party performing an action, identified by its address credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub payment: Credential,
    pub stake: Credential,
}

/// Edge of the transition table that an accepted action took.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Start,
    Bid,
    Raise,
    Withdraw,
    End,
}

/// An accepted state transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub edge: Edge,
    pub redeemer: RedeemerKind,
    /// Successor record; `None` when the consumed record is not recreated
    pub next: Option<AuctionState>,
    /// Withdrawal claim created for a displaced bidder
    pub pending: Option<PendingWithdrawal>,
}
