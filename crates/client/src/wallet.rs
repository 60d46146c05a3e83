//! Seed-derived development wallet.
//!
//! Credentials are SHA-256 digests of the seed and the "signature" is a keyed
//! digest of the request body. This is enough for the in-memory ledger and
//! the mock chain to check that the right party authorised a transaction. It
//! is not a cryptographic signer.

use async_trait::async_trait;
use rand::RngCore;
use sha2::{Digest, Sha256};

use auction_types::{
    key_address, Address, Credential, SignedTransaction, TransactionRequest, VKeyWitness,
};

use crate::ledger::{AddressCredentials, WalletError, WalletSigner};

/// Length of a wallet seed in bytes.
pub const SEED_LEN: usize = 32;

/// Development wallet holding one payment and one stake credential.
#[derive(Clone)]
pub struct DevWallet {
    seed: [u8; SEED_LEN],
    credentials: AddressCredentials,
}

impl std::fmt::Debug for DevWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevWallet")
            .field("payment", &self.credentials.payment)
            .field("stake", &self.credentials.stake)
            .finish_non_exhaustive()
    }
}

impl DevWallet {
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        let credentials = AddressCredentials {
            payment: derive_credential(b"payment", &seed),
            stake: derive_credential(b"stake", &seed),
        };
        Self { seed, credentials }
    }

    /// Parse a hex-encoded seed.
    pub fn from_hex(seed: &str) -> Result<Self, WalletError> {
        let bytes = hex::decode(seed.trim())
            .map_err(|e| WalletError::SigningFailed(format!("invalid seed: {}", e)))?;
        let seed: [u8; SEED_LEN] = bytes
            .try_into()
            .map_err(|_| WalletError::SigningFailed("seed must be 32 bytes".into()))?;
        Ok(Self::from_seed(seed))
    }

    /// Generate a wallet with a fresh random seed.
    pub fn generate<R: RngCore>(rng: &mut R) -> Self {
        let mut seed = [0u8; SEED_LEN];
        rng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn seed_hex(&self) -> String {
        hex::encode(self.seed)
    }

    pub fn credentials(&self) -> AddressCredentials {
        self.credentials
    }

    pub fn key_address(&self) -> Address {
        key_address(&self.credentials.payment, &self.credentials.stake)
    }

    fn witness(&self, request: &TransactionRequest) -> VKeyWitness {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(request.body_bytes());
        VKeyWitness {
            credential: self.credentials.payment,
            signature: hasher.finalize().into(),
        }
    }
}

fn derive_credential(domain: &[u8], seed: &[u8]) -> Credential {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(seed);
    let digest = hasher.finalize();
    let mut bytes = [0u8; Credential::LEN];
    bytes.copy_from_slice(&digest[..Credential::LEN]);
    Credential(bytes)
}

#[async_trait]
impl WalletSigner for DevWallet {
    async fn address(&self) -> Result<Address, WalletError> {
        Ok(self.key_address())
    }

    async fn sign(&self, request: TransactionRequest) -> Result<SignedTransaction, WalletError> {
        let witness = self.witness(&request);
        Ok(SignedTransaction {
            request,
            witnesses: vec![witness],
        })
    }
}
