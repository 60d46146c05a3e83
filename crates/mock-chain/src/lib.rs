//! Mock chain server for local testing of the auction client.
//!
//! This provides a JSON-RPC server over an in-memory UTXO ledger. It
//! enforces single consumption of outputs and validity intervals but runs no
//! validator scripts.

use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use tracing::{info, warn};

use auction_client::rpc::{
    parse_out_ref, parse_tx_hash, ConfirmationRpc, UtxoRpc, CONFLICT_ERROR_CODE,
    REJECTED_ERROR_CODE,
};
use auction_client::{MemoryLedger, SubmitError};
use auction_types::{Address, Confirmation, SignedTransaction, Timestamp};

pub mod types;
pub use types::{ChainStats, ChainTime};

/// JSON-RPC invalid params code.
const INVALID_PARAMS_CODE: i32 = -32602;

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Ledger Methods ============

    /// Unspent outputs at an address, oldest first.
    #[method(name = "ledger_utxosAtAddress")]
    async fn ledger_utxos_at_address(
        &self,
        address: String,
    ) -> Result<Vec<UtxoRpc>, ErrorObjectOwned>;

    /// Unspent outputs for the given references.
    #[method(name = "ledger_utxosByOutRef")]
    async fn ledger_utxos_by_out_ref(
        &self,
        refs: Vec<String>,
    ) -> Result<Vec<UtxoRpc>, ErrorObjectOwned>;

    /// Hex datum of an unspent output, if it has one.
    #[method(name = "ledger_datumOf")]
    async fn ledger_datum_of(&self, out_ref: String) -> Result<Option<String>, ErrorObjectOwned>;

    /// Submit a hex-encoded, borsh-serialized signed transaction.
    #[method(name = "ledger_submit")]
    async fn ledger_submit(&self, tx: String) -> Result<String, ErrorObjectOwned>;

    /// Inclusion status of a submitted transaction.
    #[method(name = "ledger_awaitConfirmation")]
    async fn ledger_await_confirmation(
        &self,
        tx_hash: String,
    ) -> Result<ConfirmationRpc, ErrorObjectOwned>;

    // ============ Chain Methods ============

    /// Current ledger time in milliseconds.
    #[method(name = "chain_getTime")]
    async fn chain_get_time(&self) -> Result<Timestamp, ErrorObjectOwned>;

    #[method(name = "chain_getStats")]
    async fn chain_get_stats(&self) -> Result<ChainStats, ErrorObjectOwned>;

    // ============ Admin Methods ============

    /// Set ledger time (for testing time-dependent logic).
    #[method(name = "admin_setTime")]
    async fn admin_set_time(&self, timestamp: Timestamp) -> Result<ChainTime, ErrorObjectOwned>;

    /// Move ledger time forward.
    #[method(name = "admin_advanceTime")]
    async fn admin_advance_time(&self, millis: u64) -> Result<ChainTime, ErrorObjectOwned>;

    /// Accept the next submissions without including them.
    #[method(name = "admin_dropNext")]
    async fn admin_drop_next(&self, count: usize) -> Result<bool, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
pub struct MockChainServer {
    ledger: Arc<MemoryLedger>,
}

impl MockChainServer {
    pub fn new(ledger: Arc<MemoryLedger>) -> Self {
        Self { ledger }
    }

    fn invalid_params(msg: impl Into<String>) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(INVALID_PARAMS_CODE, msg.into(), None::<()>)
    }

    fn submit_error(err: SubmitError) -> ErrorObjectOwned {
        match err {
            SubmitError::Conflict(out_ref) => ErrorObjectOwned::owned(
                CONFLICT_ERROR_CODE,
                format!("Output already consumed: {}", out_ref),
                Some(out_ref.to_string()),
            ),
            other => ErrorObjectOwned::owned(REJECTED_ERROR_CODE, other.to_string(), None::<()>),
        }
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn ledger_utxos_at_address(
        &self,
        address: String,
    ) -> Result<Vec<UtxoRpc>, ErrorObjectOwned> {
        Ok(self
            .ledger
            .unspent_at(&Address(address))
            .iter()
            .map(UtxoRpc::from)
            .collect())
    }

    async fn ledger_utxos_by_out_ref(
        &self,
        refs: Vec<String>,
    ) -> Result<Vec<UtxoRpc>, ErrorObjectOwned> {
        let refs = refs
            .iter()
            .map(|r| parse_out_ref(r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::invalid_params)?;
        Ok(self
            .ledger
            .unspent_by_out_ref(&refs)
            .iter()
            .map(UtxoRpc::from)
            .collect())
    }

    async fn ledger_datum_of(&self, out_ref: String) -> Result<Option<String>, ErrorObjectOwned> {
        let out_ref = parse_out_ref(&out_ref).map_err(Self::invalid_params)?;
        Ok(self
            .ledger
            .unspent_by_out_ref(&[out_ref])
            .first()
            .and_then(|u| u.datum.as_ref())
            .map(hex::encode))
    }

    async fn ledger_submit(&self, tx: String) -> Result<String, ErrorObjectOwned> {
        let blob = hex::decode(&tx).map_err(|e| Self::invalid_params(e.to_string()))?;
        let signed: SignedTransaction =
            borsh::from_slice(&blob).map_err(|e| Self::invalid_params(e.to_string()))?;

        match self.ledger.apply(&signed) {
            Ok(tx_hash) => Ok(tx_hash.to_string()),
            Err(e) => {
                warn!("Submission rejected: {}", e);
                Err(Self::submit_error(e))
            }
        }
    }

    async fn ledger_await_confirmation(
        &self,
        tx_hash: String,
    ) -> Result<ConfirmationRpc, ErrorObjectOwned> {
        let hash = parse_tx_hash(&tx_hash).map_err(Self::invalid_params)?;
        let confirmation = self.ledger.confirmation(&hash);
        Ok(ConfirmationRpc {
            tx_hash,
            confirmed: matches!(confirmation, Confirmation::Confirmed(_)),
            reason: match confirmation {
                Confirmation::Failed(reason) => Some(reason),
                Confirmation::Confirmed(_) => None,
            },
        })
    }

    async fn chain_get_time(&self) -> Result<Timestamp, ErrorObjectOwned> {
        Ok(self.ledger.time())
    }

    async fn chain_get_stats(&self) -> Result<ChainStats, ErrorObjectOwned> {
        Ok(ChainStats {
            timestamp: self.ledger.time(),
            included_transactions: self.ledger.included_count(),
        })
    }

    async fn admin_set_time(&self, timestamp: Timestamp) -> Result<ChainTime, ErrorObjectOwned> {
        self.ledger.set_time(timestamp);
        info!("Time set to {}", timestamp);
        Ok(ChainTime { timestamp })
    }

    async fn admin_advance_time(&self, millis: u64) -> Result<ChainTime, ErrorObjectOwned> {
        let timestamp = self.ledger.advance_time(millis);
        info!("Time advanced to {}", timestamp);
        Ok(ChainTime { timestamp })
    }

    async fn admin_drop_next(&self, count: usize) -> Result<bool, ErrorObjectOwned> {
        self.ledger.drop_next_submissions(count);
        info!("Dropping the next {} submissions", count);
        Ok(true)
    }
}

/// Start serving `ledger` on `addr`. Returns the bound address, which
/// differs from `addr` when port 0 was requested.
pub async fn serve(
    addr: SocketAddr,
    ledger: Arc<MemoryLedger>,
) -> anyhow::Result<(SocketAddr, ServerHandle)> {
    let server = Server::builder().build(addr).await?;
    let bound = server.local_addr()?;
    let handle = server.start(MockChainServer::new(ledger).into_rpc());
    info!("Mock chain listening on {}", bound);
    Ok((bound, handle))
}
