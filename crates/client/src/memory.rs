//! In-memory UTXO ledger for tests and the mock chain.
//!
//! The ledger enforces the one property the client relies on: an output can
//! be consumed by at most one transaction. Validator scripts are not run.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use auction_types::{
    sha256, Address, Confirmation, OutRef, SignedTransaction, Timestamp, TxHash, Utxo,
};

use crate::ledger::{Clock, LedgerError, LedgerReader, SubmitError, Submitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxStatus {
    Included,
    Dropped,
}

#[derive(Debug, Default)]
struct LedgerInner {
    /// Unspent outputs, oldest first
    utxos: Vec<Utxo>,
    spent: HashSet<OutRef>,
    transactions: HashMap<TxHash, TxStatus>,
    sequence: u64,
    time: Timestamp,
    /// Submissions to accept but never include
    drop_next: usize,
    /// Submissions to reject as if a competitor spent the input first
    conflict_next: usize,
}

/// Shared in-memory ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: RwLock<LedgerInner>,
}

impl MemoryLedger {
    /// Create an empty ledger at time `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            inner: RwLock::new(LedgerInner {
                time: now,
                ..Default::default()
            }),
        }
    }

    pub fn time(&self) -> Timestamp {
        self.inner.read().time
    }

    pub fn set_time(&self, time: Timestamp) {
        self.inner.write().time = time;
    }

    pub fn advance_time(&self, millis: u64) -> Timestamp {
        let mut inner = self.inner.write();
        inner.time = inner.time.saturating_add(millis);
        inner.time
    }

    /// Accept the next `count` submissions without ever including them.
    pub fn drop_next_submissions(&self, count: usize) {
        self.inner.write().drop_next = count;
    }

    /// Reject the next `count` submissions that spend an output as conflicts.
    pub fn conflict_next_submissions(&self, count: usize) {
        self.inner.write().conflict_next = count;
    }

    /// Unspent outputs at `address`, oldest first.
    pub fn unspent_at(&self, address: &Address) -> Vec<Utxo> {
        self.inner
            .read()
            .utxos
            .iter()
            .filter(|u| u.address == *address)
            .cloned()
            .collect()
    }

    /// Unspent outputs for `refs`, in request order. Unknown or spent
    /// references are skipped.
    pub fn unspent_by_out_ref(&self, refs: &[OutRef]) -> Vec<Utxo> {
        let inner = self.inner.read();
        refs.iter()
            .filter_map(|r| inner.utxos.iter().find(|u| u.out_ref == *r).cloned())
            .collect()
    }

    /// Total value held at `address`.
    pub fn balance_of(&self, address: &Address) -> u64 {
        self.unspent_at(address).iter().map(|u| u.lovelace).sum()
    }

    /// Number of transactions included so far.
    pub fn included_count(&self) -> usize {
        self.inner
            .read()
            .transactions
            .values()
            .filter(|s| **s == TxStatus::Included)
            .count()
    }

    /// Validate and apply a signed transaction.
    pub fn apply(&self, tx: &SignedTransaction) -> Result<TxHash, SubmitError> {
        let mut inner = self.inner.write();
        let request = &tx.request;

        if !tx.is_fully_signed() {
            return Err(SubmitError::Rejected("missing required signature".into()));
        }
        if request.valid_from > inner.time {
            return Err(SubmitError::Rejected(format!(
                "validity interval starts at {} after ledger time {}",
                request.valid_from, inner.time
            )));
        }

        if let Some(first) = request.script_inputs.first() {
            if inner.conflict_next > 0 {
                inner.conflict_next -= 1;
                return Err(SubmitError::Conflict(first.out_ref));
            }
        }

        for input in &request.script_inputs {
            if inner.spent.contains(&input.out_ref) {
                return Err(SubmitError::Conflict(input.out_ref));
            }
            if !inner.utxos.iter().any(|u| u.out_ref == input.out_ref) {
                return Err(SubmitError::Rejected(format!(
                    "unknown input {}",
                    input.out_ref
                )));
            }
        }

        inner.sequence += 1;
        let mut preimage = request.body_bytes();
        preimage.extend_from_slice(&inner.sequence.to_le_bytes());
        let tx_hash = TxHash(sha256(&preimage));

        if inner.drop_next > 0 {
            inner.drop_next -= 1;
            inner.transactions.insert(tx_hash, TxStatus::Dropped);
            debug!("Dropping transaction {}", tx_hash);
            return Ok(tx_hash);
        }

        for input in &request.script_inputs {
            inner.utxos.retain(|u| u.out_ref != input.out_ref);
            inner.spent.insert(input.out_ref);
        }
        for (index, output) in request.outputs.iter().enumerate() {
            inner.utxos.push(Utxo {
                out_ref: OutRef::new(tx_hash, index as u32),
                address: output.address.clone(),
                lovelace: output.lovelace,
                datum: output.datum.clone(),
            });
        }
        inner.transactions.insert(tx_hash, TxStatus::Included);

        info!(
            "Included transaction {} ({} inputs, {} outputs)",
            tx_hash,
            request.script_inputs.len(),
            request.outputs.len()
        );
        Ok(tx_hash)
    }

    /// Inclusion status of a submitted transaction.
    pub fn confirmation(&self, tx_hash: &TxHash) -> Confirmation {
        match self.inner.read().transactions.get(tx_hash) {
            Some(TxStatus::Included) => Confirmation::Confirmed(*tx_hash),
            Some(TxStatus::Dropped) => Confirmation::Failed("transaction was not included".into()),
            None => Confirmation::Failed("unknown transaction".into()),
        }
    }
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    async fn utxos_at_address(&self, address: &Address) -> Result<Vec<Utxo>, LedgerError> {
        let snapshot = self.unspent_at(address);
        // Let concurrent callers observe the same snapshot
        tokio::task::yield_now().await;
        Ok(snapshot)
    }

    async fn utxos_by_out_ref(&self, refs: &[OutRef]) -> Result<Vec<Utxo>, LedgerError> {
        Ok(self.unspent_by_out_ref(refs))
    }

    async fn datum_of(&self, utxo: &Utxo) -> Result<Vec<u8>, LedgerError> {
        utxo.datum
            .clone()
            .ok_or(LedgerError::OutputNotFound(utxo.out_ref))
    }
}

#[async_trait]
impl Submitter for MemoryLedger {
    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, SubmitError> {
        self.apply(&tx)
    }

    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Confirmation, SubmitError> {
        Ok(self.confirmation(tx_hash))
    }
}

impl Clock for MemoryLedger {
    fn now_millis(&self) -> Timestamp {
        self.time()
    }
}
