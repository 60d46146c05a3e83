//! Client SDK for UTXO-backed English auctions.
//!
//! This crate provides:
//! - Selection of the authoritative auction output at a script address
//! - Transaction building for state-machine transitions
//! - The `AuctionClient` orchestrator that fetches, decides, submits and
//!   confirms each action
//! - Collaborator traits with in-memory and JSON-RPC implementations
//! - A seed-derived development wallet

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod rpc;
pub mod selector;
pub mod wallet;

pub use builder::{build, build_creation, valid_from, ValueSplit};
pub use client::{AuctionClient, ClientResult};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use ledger::{
    AddressCredentials, Clock, LedgerError, LedgerReader, SubmitError, Submitter, SystemClock,
    WalletError, WalletSigner,
};
pub use memory::MemoryLedger;
pub use rpc::{OffsetClock, RpcLedger};
pub use selector::{pending_withdrawals_for, select, SelectionError};
pub use wallet::DevWallet;
