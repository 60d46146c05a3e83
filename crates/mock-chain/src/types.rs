//! RPC-compatible types for the mock chain.
//!
//! Ledger outputs use the wire types shared with the client
//! (`auction_client::rpc`); only the admin responses live here.

use serde::{Deserialize, Serialize};

use auction_types::Timestamp;

/// Chain time response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTime {
    pub timestamp: Timestamp,
}

/// Ledger summary response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    pub timestamp: Timestamp,
    pub included_transactions: usize,
}
