//! Collaborator interfaces for ledger reads, signing and submission.
//!
//! The client never talks to a ledger directly. Everything it needs from the
//! outside world goes through these traits so the orchestration logic can be
//! exercised against the in-memory ledger as well as a remote node.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use thiserror::Error;

use auction_types::{
    parse_key_address, Address, Confirmation, Credential, OutRef, SignedTransaction, Timestamp,
    TransactionRequest, TxHash, Utxo,
};

/// Errors from ledger queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Output not found: {0}")]
    OutputNotFound(OutRef),

    #[error("Ledger unavailable: {0}")]
    Transport(String),
}

/// Errors from the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Address has no key credentials: {0}")]
    NotAKeyAddress(Address),

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// Errors from transaction submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// A consumed output was already spent by a competing transaction.
    #[error("Output already consumed: {0}")]
    Conflict(OutRef),

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Submission transport failed: {0}")]
    Transport(String),
}

/// Payment and stake credentials of a key address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressCredentials {
    pub payment: Credential,
    pub stake: Credential,
}

impl AddressCredentials {
    /// Read the credentials embedded in a key address.
    pub fn from_address(address: &Address) -> Result<Self, WalletError> {
        parse_key_address(address)
            .map(|(payment, stake)| Self { payment, stake })
            .ok_or_else(|| WalletError::NotAKeyAddress(address.clone()))
    }
}

/// Read access to ledger outputs.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Unspent outputs at `address`, oldest first.
    async fn utxos_at_address(&self, address: &Address) -> Result<Vec<Utxo>, LedgerError>;

    /// Unspent outputs for the given references, in request order. Spent or
    /// unknown references are skipped.
    ///
    /// `AuctionClient` selects by address and never calls this. It serves
    /// callers that already hold output references, such as wallets and
    /// explorers talking to the mock chain.
    async fn utxos_by_out_ref(&self, refs: &[OutRef]) -> Result<Vec<Utxo>, LedgerError>;

    /// Datum bytes attached to `utxo`.
    async fn datum_of(&self, utxo: &Utxo) -> Result<Vec<u8>, LedgerError>;
}

/// The acting party's wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn address(&self) -> Result<Address, WalletError>;

    fn address_credentials(&self, address: &Address) -> Result<AddressCredentials, WalletError> {
        AddressCredentials::from_address(address)
    }

    async fn sign(&self, request: TransactionRequest) -> Result<SignedTransaction, WalletError>;
}

/// Transaction submission and confirmation.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, SubmitError>;

    /// Wait until `tx_hash` is included or known to have failed. Timeouts
    /// are reported as `Confirmation::Failed`.
    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Confirmation, SubmitError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Timestamp)
            .unwrap_or(0)
    }
}

#[async_trait]
impl<T: LedgerReader + ?Sized> LedgerReader for std::sync::Arc<T> {
    async fn utxos_at_address(&self, address: &Address) -> Result<Vec<Utxo>, LedgerError> {
        (**self).utxos_at_address(address).await
    }

    async fn utxos_by_out_ref(&self, refs: &[OutRef]) -> Result<Vec<Utxo>, LedgerError> {
        (**self).utxos_by_out_ref(refs).await
    }

    async fn datum_of(&self, utxo: &Utxo) -> Result<Vec<u8>, LedgerError> {
        (**self).datum_of(utxo).await
    }
}

#[async_trait]
impl<T: Submitter + ?Sized> Submitter for std::sync::Arc<T> {
    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, SubmitError> {
        (**self).submit(tx).await
    }

    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Confirmation, SubmitError> {
        (**self).await_confirmation(tx_hash).await
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now_millis(&self) -> Timestamp {
        (**self).now_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::key_address;

    #[test]
    fn test_address_credentials() {
        let payment = Credential([3u8; 28]);
        let stake = Credential([4u8; 28]);
        let creds = AddressCredentials::from_address(&key_address(&payment, &stake)).unwrap();
        assert_eq!(creds.payment, payment);
        assert_eq!(creds.stake, stake);

        let script = Address::from("script1abcdef");
        assert_eq!(
            AddressCredentials::from_address(&script),
            Err(WalletError::NotAKeyAddress(script))
        );
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01 in milliseconds
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
