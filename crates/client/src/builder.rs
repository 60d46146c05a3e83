//! Transaction building for accepted transitions.
//!
//! The builder performs no ledger I/O. It turns a transition into an
//! unsigned request; fees and funding are completed by the wallet.
//!
//! Output layout of a transition transaction:
//!
//! | index | address | value | datum |
//! |---|---|---|---|
//! | 0 | auction | continuing value | successor record |
//! | 1 | auction | displaced bid (`Bid` only) | withdrawal record |
//! | last | signer | payback (when non-zero) | none |
//!
//! The continuing record is always output 0, which the selector relies on.

use auction_datum::{encode, encode_redeemer};
use auction_machine::{Edge, Transition};
use auction_types::{
    Address, AuctionState, Credential, ScriptInput, Timestamp, TransactionRequest, TxOutput, Utxo,
    ValidatorArtifact,
};

use crate::config::ClientConfig;

/// Distribution of value across the outputs of a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueSplit {
    /// Value of the continuing auction record
    pub continuing: Option<u64>,
    /// Value of the withdrawal record for the displaced bidder
    pub pending: Option<u64>,
    /// Value returned from the consumed output to the signer
    pub payback: Option<(Address, u64)>,
}

impl ValueSplit {
    pub fn for_transition(
        consumed: &Utxo,
        transition: &Transition,
        config: &ClientConfig,
        signer_address: &Address,
    ) -> Self {
        let continuing = match (transition.edge, &transition.next) {
            (Edge::End, Some(_)) => Some(config.end_output_lovelace),
            (_, Some(next)) => Some(next.amount),
            (_, None) => None,
        };
        let pending = transition.pending.as_ref().map(|p| p.amount);

        // The part of the consumed value that stays at the script
        let relocked = match transition.edge {
            Edge::Bid => pending.unwrap_or(0),
            Edge::End => config.end_output_lovelace,
            _ => 0,
        };
        let back = consumed.lovelace.saturating_sub(relocked);
        let payback = (back > 0).then(|| (signer_address.clone(), back));

        Self {
            continuing,
            pending,
            payback,
        }
    }
}

/// Lower bound of the validity interval for a transaction built at `now`.
pub fn valid_from(now: Timestamp, config: &ClientConfig) -> Timestamp {
    now.saturating_sub(config.validity_offset_ms)
}

/// Build the request consuming `consumed` for an accepted transition.
pub fn build(
    consumed: &Utxo,
    transition: &Transition,
    split: &ValueSplit,
    valid_from: Timestamp,
    signer: &Credential,
    validator: &ValidatorArtifact,
    auction_address: &Address,
) -> TransactionRequest {
    let mut outputs = Vec::with_capacity(3);

    if let (Some(next), Some(lovelace)) = (&transition.next, split.continuing) {
        outputs.push(TxOutput {
            address: auction_address.clone(),
            lovelace,
            datum: Some(encode(next)),
        });

        if let (Some(pending), Some(lovelace)) = (&transition.pending, split.pending) {
            outputs.push(TxOutput {
                address: auction_address.clone(),
                lovelace,
                datum: Some(encode(&pending.to_record(next))),
            });
        }
    }

    if let Some((address, lovelace)) = &split.payback {
        outputs.push(TxOutput {
            address: address.clone(),
            lovelace: *lovelace,
            datum: None,
        });
    }

    TransactionRequest {
        script_inputs: vec![ScriptInput {
            out_ref: consumed.out_ref,
            redeemer: encode_redeemer(transition.redeemer),
        }],
        outputs,
        validator: Some(validator.clone()),
        valid_from,
        required_signers: vec![*signer],
    }
}

/// Build the request that places a new auction record at `address`.
pub fn build_creation(
    state: &AuctionState,
    address: &Address,
    lovelace: u64,
    valid_from: Timestamp,
    signer: &Credential,
) -> TransactionRequest {
    TransactionRequest {
        script_inputs: vec![],
        outputs: vec![TxOutput {
            address: address.clone(),
            lovelace,
            datum: Some(encode(state)),
        }],
        validator: None,
        valid_from,
        required_signers: vec![*signer],
    }
}
