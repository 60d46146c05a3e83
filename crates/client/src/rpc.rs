//! JSON-RPC collaborators backed by the mock chain.
//!
//! Binary values travel as hex strings. Output references are written
//! `"<tx hash hex>#<index>"`.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonrpsee::core::client::{ClientT, Error as RpcError};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use auction_types::{
    Address, Confirmation, OutRef, SignedTransaction, Timestamp, TxHash, Utxo,
};

use crate::ledger::{Clock, LedgerError, LedgerReader, SubmitError, Submitter};

/// Error code the mock chain uses when an input was already consumed.
pub const CONFLICT_ERROR_CODE: i32 = -32010;

/// Error code for any other rejected submission.
pub const REJECTED_ERROR_CODE: i32 = -32000;

/// Unspent output on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoRpc {
    pub out_ref: String,
    pub address: String,
    pub lovelace: u64,
    pub datum: Option<String>,
}

impl From<&Utxo> for UtxoRpc {
    fn from(utxo: &Utxo) -> Self {
        Self {
            out_ref: utxo.out_ref.to_string(),
            address: utxo.address.to_string(),
            lovelace: utxo.lovelace,
            datum: utxo.datum.as_ref().map(hex::encode),
        }
    }
}

impl TryFrom<UtxoRpc> for Utxo {
    type Error = String;

    fn try_from(rpc: UtxoRpc) -> Result<Self, Self::Error> {
        let datum = rpc
            .datum
            .map(|d| hex::decode(d).map_err(|e| format!("invalid datum hex: {}", e)))
            .transpose()?;
        Ok(Utxo {
            out_ref: parse_out_ref(&rpc.out_ref)?,
            address: Address(rpc.address),
            lovelace: rpc.lovelace,
            datum,
        })
    }
}

/// Outcome of `ledger_awaitConfirmation`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRpc {
    pub tx_hash: String,
    pub confirmed: bool,
    pub reason: Option<String>,
}

impl From<&Confirmation> for ConfirmationRpc {
    fn from(confirmation: &Confirmation) -> Self {
        match confirmation {
            Confirmation::Confirmed(tx_hash) => Self {
                tx_hash: tx_hash.to_string(),
                confirmed: true,
                reason: None,
            },
            Confirmation::Failed(reason) => Self {
                tx_hash: String::new(),
                confirmed: false,
                reason: Some(reason.clone()),
            },
        }
    }
}

/// Parse `"<hash>#<index>"`.
pub fn parse_out_ref(s: &str) -> Result<OutRef, String> {
    let (hash, index) = s
        .split_once('#')
        .ok_or_else(|| format!("malformed output reference: {}", s))?;
    let output_index = index
        .parse::<u32>()
        .map_err(|e| format!("invalid output index: {}", e))?;
    Ok(OutRef::new(parse_tx_hash(hash)?, output_index))
}

pub fn parse_tx_hash(s: &str) -> Result<TxHash, String> {
    let bytes: [u8; 32] = hex::decode(s)
        .map_err(|e| format!("invalid transaction hash: {}", e))?
        .try_into()
        .map_err(|_| "transaction hash must be 32 bytes".to_string())?;
    Ok(TxHash(bytes))
}

/// Ledger reader and submitter speaking to the mock chain over HTTP.
#[derive(Clone, Debug)]
pub struct RpcLedger {
    client: HttpClient,
}

impl RpcLedger {
    pub fn connect(url: &str) -> Result<Self, LedgerError> {
        let client = HttpClientBuilder::default()
            .build(url)
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Current ledger time.
    pub async fn chain_time(&self) -> Result<Timestamp, LedgerError> {
        self.client
            .request("chain_getTime", Vec::<()>::new())
            .await
            .map_err(transport)
    }

    /// A clock that follows ledger time, measured once against the local clock.
    pub async fn synced_clock(&self) -> Result<OffsetClock, LedgerError> {
        let chain = self.chain_time().await?;
        Ok(OffsetClock::new(chain as i64 - local_millis() as i64))
    }
}

fn transport(e: RpcError) -> LedgerError {
    LedgerError::Transport(e.to_string())
}

fn into_utxos(rpc: Vec<UtxoRpc>) -> Result<Vec<Utxo>, LedgerError> {
    rpc.into_iter()
        .map(|u| Utxo::try_from(u).map_err(LedgerError::Transport))
        .collect()
}

#[async_trait]
impl LedgerReader for RpcLedger {
    async fn utxos_at_address(&self, address: &Address) -> Result<Vec<Utxo>, LedgerError> {
        let utxos: Vec<UtxoRpc> = self
            .client
            .request("ledger_utxosAtAddress", vec![address.to_string()])
            .await
            .map_err(transport)?;
        debug!("{} outputs at {}", utxos.len(), address);
        into_utxos(utxos)
    }

    async fn utxos_by_out_ref(&self, refs: &[OutRef]) -> Result<Vec<Utxo>, LedgerError> {
        let refs: Vec<String> = refs.iter().map(|r| r.to_string()).collect();
        let utxos: Vec<UtxoRpc> = self
            .client
            .request("ledger_utxosByOutRef", vec![refs])
            .await
            .map_err(transport)?;
        into_utxos(utxos)
    }

    async fn datum_of(&self, utxo: &Utxo) -> Result<Vec<u8>, LedgerError> {
        if let Some(datum) = &utxo.datum {
            return Ok(datum.clone());
        }
        let datum: Option<String> = self
            .client
            .request("ledger_datumOf", vec![utxo.out_ref.to_string()])
            .await
            .map_err(transport)?;
        let datum = datum.ok_or(LedgerError::OutputNotFound(utxo.out_ref))?;
        hex::decode(datum).map_err(|e| LedgerError::Transport(e.to_string()))
    }
}

#[async_trait]
impl Submitter for RpcLedger {
    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, SubmitError> {
        let blob = borsh::to_vec(&tx).map_err(|e| SubmitError::Rejected(e.to_string()))?;
        let result: Result<String, RpcError> = self
            .client
            .request("ledger_submit", vec![hex::encode(blob)])
            .await;

        match result {
            Ok(hash) => parse_tx_hash(&hash).map_err(SubmitError::Transport),
            Err(RpcError::Call(err)) if err.code() == CONFLICT_ERROR_CODE => {
                let out_ref = err
                    .data()
                    .and_then(|raw| serde_json::from_str::<String>(raw.get()).ok())
                    .and_then(|s| parse_out_ref(&s).ok())
                    .or_else(|| tx.request.script_inputs.first().map(|i| i.out_ref))
                    .unwrap_or_default();
                Err(SubmitError::Conflict(out_ref))
            }
            Err(RpcError::Call(err)) => Err(SubmitError::Rejected(err.message().to_string())),
            Err(e) => Err(SubmitError::Transport(e.to_string())),
        }
    }

    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Confirmation, SubmitError> {
        let rpc: ConfirmationRpc = self
            .client
            .request("ledger_awaitConfirmation", vec![tx_hash.to_string()])
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        if rpc.confirmed {
            Ok(Confirmation::Confirmed(*tx_hash))
        } else {
            Ok(Confirmation::Failed(
                rpc.reason.unwrap_or_else(|| "not included".to_string()),
            ))
        }
    }
}

/// Local wall-clock time shifted by a fixed offset.
#[derive(Clone, Copy, Debug, Default)]
pub struct OffsetClock {
    offset_ms: i64,
}

impl OffsetClock {
    pub fn new(offset_ms: i64) -> Self {
        Self { offset_ms }
    }
}

impl Clock for OffsetClock {
    fn now_millis(&self) -> Timestamp {
        (local_millis() as i64).saturating_add(self.offset_ms).max(0) as Timestamp
    }
}

fn local_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_ref_text_form() {
        let out_ref = OutRef::new(TxHash([0xab; 32]), 7);
        assert_eq!(parse_out_ref(&out_ref.to_string()), Ok(out_ref));
        assert!(parse_out_ref("abcd").is_err());
        assert!(parse_out_ref("abcd#1").is_err());
        assert!(parse_out_ref(&format!("{}#x", TxHash([0; 32]))).is_err());
    }

    #[test]
    fn test_utxo_wire_form() {
        let utxo = Utxo {
            out_ref: OutRef::new(TxHash([1; 32]), 0),
            address: Address::from("script1aa"),
            lovelace: 2_000_000,
            datum: Some(vec![0xd8, 0x79, 0x80]),
        };
        let rpc = UtxoRpc::from(&utxo);
        assert_eq!(rpc.datum.as_deref(), Some("d87980"));
        assert_eq!(Utxo::try_from(rpc).unwrap(), utxo);
    }

    #[test]
    fn test_confirmation_wire_form() {
        let failed = ConfirmationRpc::from(&Confirmation::Failed("dropped".into()));
        assert!(!failed.confirmed);
        assert_eq!(failed.reason.as_deref(), Some("dropped"));
    }

    #[test]
    fn test_offset_clock() {
        let ahead = OffsetClock::new(3_600_000);
        let here = OffsetClock::default();
        assert!(ahead.now_millis() >= here.now_millis() + 3_599_000);
    }
}
