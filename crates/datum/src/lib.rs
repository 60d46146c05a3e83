//! Datum codec for UTXO-backed auctions.
//!
//! The auction record lives in the inline datum of the auction output as
//! structured ledger data. This crate implements:
//!
//! - `plutus`: the structured data model and its CBOR wire form
//! - `codec`: the positional auction record and redeemer encodings
//! - `error`: decode failures, one variant per way a record can be corrupt
//!
//! Decoding never repairs a record: any deviation from the seven-field layout
//! is reported.

pub mod codec;
pub mod error;
pub mod plutus;

pub use codec::{decode, decode_redeemer, encode, encode_redeemer};
pub use error::{CborError, DecodeError};
pub use plutus::PlutusData;
