//! Core type definitions for UTXO-backed auctions.
//!
//! This crate provides the shared data structures used across the auction
//! client, including ledger primitives, the on-chain auction record, and the
//! transaction request types handed to signing and submission collaborators.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

pub mod transaction;

pub use transaction::{
    Confirmation, ScriptInput, SignedTransaction, TransactionRequest, TxOutput, VKeyWitness,
};

/// Smallest ledger units per display unit (lovelace per ADA).
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// POSIX time in milliseconds.
pub type Timestamp = u64;

// =========================
// LEDGER PRIMITIVES
// =========================

/// Payment or stake key hash (28 bytes)
#[serde_as]
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize, Serialize,
    Deserialize,
)]
pub struct Credential(#[serde_as(as = "[_; 28]")] pub [u8; 28]);

impl Credential {
    pub const LEN: usize = 28;

    /// Build a credential from a byte slice of exactly 28 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self([0u8; 28])
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", hex::encode(self.0))
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Transaction identifier (32 bytes)
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
    Serialize, Deserialize,
)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", hex::encode(self.0))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Reference to a transaction output.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize,
    BorshDeserialize, Serialize, Deserialize,
)]
pub struct OutRef {
    pub tx_hash: TxHash,
    pub output_index: u32,
}

impl OutRef {
    pub fn new(tx_hash: TxHash, output_index: u32) -> Self {
        Self {
            tx_hash,
            output_index,
        }
    }
}

impl fmt::Display for OutRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.output_index)
    }
}

/// Ledger address in its textual form.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Address(pub String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An unspent transaction output as reported by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Utxo {
    pub out_ref: OutRef,
    pub address: Address,
    pub lovelace: u64,
    /// Inline datum bytes, if any
    pub datum: Option<Vec<u8>>,
}

// =========================
// VALIDATOR
// =========================

/// Script language of the validator artifact
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum ScriptKind {
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

/// Opaque validator artifact passed through into transaction requests.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ValidatorArtifact {
    #[serde(rename = "type")]
    pub kind: ScriptKind,
    #[serde(with = "hex_bytes")]
    pub script: Vec<u8>,
}

impl ValidatorArtifact {
    /// Hash identifying the script (28 bytes, same width as key hashes).
    pub fn script_hash(&self) -> Credential {
        let digest = sha256(&self.script);
        let mut hash = [0u8; 28];
        hash.copy_from_slice(&digest[..28]);
        Credential(hash)
    }

    /// The address that locks outputs to this validator.
    pub fn address(&self) -> Address {
        Address(format!("{}{}", SCRIPT_ADDRESS_PREFIX, self.script_hash()))
    }
}

/// Prefix of script addresses.
pub const SCRIPT_ADDRESS_PREFIX: &str = "script1";

/// Prefix of key (wallet) addresses: payment hash followed by stake hash.
pub const KEY_ADDRESS_PREFIX: &str = "addr1";

/// Build a key address from its payment and stake credentials.
pub fn key_address(payment: &Credential, stake: &Credential) -> Address {
    Address(format!("{}{}{}", KEY_ADDRESS_PREFIX, payment, stake))
}

/// Split a key address into its payment and stake credentials.
pub fn parse_key_address(address: &Address) -> Option<(Credential, Credential)> {
    let body = address.as_str().strip_prefix(KEY_ADDRESS_PREFIX)?;
    let bytes = hex::decode(body).ok()?;
    if bytes.len() != 2 * Credential::LEN {
        return None;
    }
    let payment = Credential::from_slice(&bytes[..Credential::LEN])?;
    let stake = Credential::from_slice(&bytes[Credential::LEN..])?;
    Some((payment, stake))
}

// =========================
// AUCTION TYPES
// =========================

/// Auction lifecycle status as stored in the on-chain record
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize,
    Deserialize,
)]
pub enum Status {
    /// Created, waiting for the seller to start it
    NotStarted,
    /// Accepting bids
    Started,
    /// Side record: funds owed to a displaced bidder
    Outbid,
    /// Closed; bidder and amount are final
    Ended,
}

impl Status {
    /// Constructor tag of this status in the on-chain encoding.
    pub fn tag(self) -> u64 {
        match self {
            Status::NotStarted => 0,
            Status::Started => 1,
            Status::Outbid => 2,
            Status::Ended => 3,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(Status::NotStarted),
            1 => Some(Status::Started),
            2 => Some(Status::Outbid),
            3 => Some(Status::Ended),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Status::Ended
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::NotStarted => "not_started",
            Status::Started => "started",
            Status::Outbid => "outbid",
            Status::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// The on-chain auction record. Field order is the wire order.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionState {
    pub seller: Credential,
    pub object: Vec<u8>,
    pub deadline: Timestamp,
    pub status: Status,
    pub bidder: Credential,
    pub bidder_stake: Credential,
    pub amount: u64,
}

impl AuctionState {
    /// Record for a freshly created auction: no bids, seller as bidder of record.
    pub fn new(
        seller: Credential,
        seller_stake: Credential,
        object: impl Into<Vec<u8>>,
        deadline: Timestamp,
    ) -> Self {
        Self {
            seller,
            object: object.into(),
            deadline,
            status: Status::NotStarted,
            bidder: seller,
            bidder_stake: seller_stake,
            amount: 0,
        }
    }

    /// Human-readable label of the auctioned object.
    pub fn object_label(&self) -> String {
        String::from_utf8_lossy(&self.object).into_owned()
    }

    /// True if both records describe the same auction (immutable fields agree).
    pub fn same_auction(&self, other: &AuctionState) -> bool {
        self.seller == other.seller
            && self.object == other.object
            && self.deadline == other.deadline
    }
}

/// Funds owed to a bidder displaced by a newer bid.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct PendingWithdrawal {
    pub bidder: Credential,
    pub bidder_stake: Credential,
    pub amount: u64,
}

impl PendingWithdrawal {
    /// Snapshot the leading bid of `state` as a withdrawal claim.
    pub fn of_leader(state: &AuctionState) -> Self {
        Self {
            bidder: state.bidder,
            bidder_stake: state.bidder_stake,
            amount: state.amount,
        }
    }

    /// Read a withdrawal claim back from an `Outbid` record.
    pub fn from_record(record: &AuctionState) -> Option<Self> {
        (record.status == Status::Outbid).then(|| Self::of_leader(record))
    }

    /// The on-ledger record for this claim, tied to `auction` by its immutable fields.
    pub fn to_record(&self, auction: &AuctionState) -> AuctionState {
        AuctionState {
            seller: auction.seller,
            object: auction.object.clone(),
            deadline: auction.deadline,
            status: Status::Outbid,
            bidder: self.bidder,
            bidder_stake: self.bidder_stake,
            amount: self.amount,
        }
    }
}

/// Action tag supplied to the validator when consuming the auction output
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize,
    Deserialize,
)]
pub enum RedeemerKind {
    Start,
    Bid,
    Withdraw,
    End,
}

impl RedeemerKind {
    pub fn tag(self) -> u64 {
        match self {
            RedeemerKind::Start => 0,
            RedeemerKind::Bid => 1,
            RedeemerKind::Withdraw => 2,
            RedeemerKind::End => 3,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(RedeemerKind::Start),
            1 => Some(RedeemerKind::Bid),
            2 => Some(RedeemerKind::Withdraw),
            3 => Some(RedeemerKind::End),
            _ => None,
        }
    }
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}

/// Hex (de)serialization for byte vectors.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
