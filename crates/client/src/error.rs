//! Error types for the auction client.

use thiserror::Error;

use auction_datum::DecodeError;
use auction_machine::Rejection;
use auction_types::{Address, OutRef, TxHash};

use crate::ledger::{LedgerError, SubmitError, WalletError};
use crate::selector::SelectionError;

/// Errors surfaced by `AuctionClient` actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Corrupt auction record: {0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    NotFound(#[from] SelectionError),

    #[error("Rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Every attempt found its input already consumed.
    #[error("Lost the race for the auction after {attempts} attempts, please retry")]
    LostRace { attempts: u32 },

    /// Submitted but not included. The auction must be re-fetched.
    #[error("Transaction {0} was not confirmed")]
    Unconfirmed(TxHash),

    /// The record selected after confirmation belongs to a different auction.
    #[error("Auction at {0} was replaced by another auction")]
    AuctionReplaced(Address),

    #[error("Output {0} carries no datum")]
    MissingDatum(OutRef),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl ClientError {
    /// True if the failure came from a competing transaction consuming our input.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Submit(SubmitError::Conflict(_)))
    }
}
