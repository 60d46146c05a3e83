//! Transaction request types exchanged with signing and submission collaborators.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{Address, Credential, OutRef, Timestamp, TxHash, ValidatorArtifact};

/// A script output consumed with a redeemer
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ScriptInput {
    pub out_ref: OutRef,
    /// Encoded redeemer data
    pub redeemer: Vec<u8>,
}

/// An output produced by the transaction
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub lovelace: u64,
    /// Inline datum bytes
    pub datum: Option<Vec<u8>>,
}

/// Fully specified, unsigned transaction.
///
/// Fee inputs and change are left to the wallet that completes and signs it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub script_inputs: Vec<ScriptInput>,
    pub outputs: Vec<TxOutput>,
    /// Validator attached to spend the script inputs
    pub validator: Option<ValidatorArtifact>,
    /// Lower bound of the validity interval
    pub valid_from: Timestamp,
    pub required_signers: Vec<Credential>,
}

impl TransactionRequest {
    /// Canonical bytes of the request body.
    pub fn body_bytes(&self) -> Vec<u8> {
        // Borsh serialization into a Vec cannot fail
        borsh::to_vec(self).unwrap_or_default()
    }
}

/// Key witness attached by a wallet
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct VKeyWitness {
    pub credential: Credential,
    pub signature: [u8; 32],
}

/// A transaction request with the signer witnesses attached
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub request: TransactionRequest,
    pub witnesses: Vec<VKeyWitness>,
}

impl SignedTransaction {
    /// True if every required signer has a witness.
    pub fn is_fully_signed(&self) -> bool {
        self.request
            .required_signers
            .iter()
            .all(|signer| self.witnesses.iter().any(|w| w.credential == *signer))
    }
}

/// Outcome of waiting for a submitted transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    Confirmed(TxHash),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(signers: Vec<Credential>) -> TransactionRequest {
        TransactionRequest {
            script_inputs: vec![],
            outputs: vec![TxOutput {
                address: Address::from("script1ff"),
                lovelace: 2_000_000,
                datum: Some(vec![0xd8, 0x79, 0x80]),
            }],
            validator: None,
            valid_from: 1_000,
            required_signers: signers,
        }
    }

    #[test]
    fn test_signed_transaction_borsh() {
        let signed = SignedTransaction {
            request: request(vec![Credential([1u8; 28])]),
            witnesses: vec![VKeyWitness {
                credential: Credential([1u8; 28]),
                signature: [7u8; 32],
            }],
        };
        let encoded = borsh::to_vec(&signed).unwrap();
        let decoded: SignedTransaction = borsh::from_slice(&encoded).unwrap();
        assert_eq!(signed, decoded);
    }

    #[test]
    fn test_missing_witness_detected() {
        let signed = SignedTransaction {
            request: request(vec![Credential([1u8; 28]), Credential([2u8; 28])]),
            witnesses: vec![VKeyWitness {
                credential: Credential([1u8; 28]),
                signature: [0u8; 32],
            }],
        };
        assert!(!signed.is_fully_signed());
    }
}
