//! The auction orchestrator.
//!
//! Every action re-reads the ledger, so no auction state is cached between
//! calls. One action runs at a time per client; competing clients are
//! arbitrated by the ledger, and a lost race is retried from the fetch.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use auction_datum::decode;
use auction_machine::{transition, AuctionAction, Party, Rejection, Transition};
use auction_types::{
    Address, AuctionState, Confirmation, Timestamp, TransactionRequest, TxHash, Utxo,
    ValidatorArtifact,
};

use crate::builder::{build, build_creation, valid_from, ValueSplit};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::ledger::{Clock, LedgerError, LedgerReader, Submitter, WalletSigner};
use crate::selector::{pending_withdrawals_for, select};

pub type ClientResult<T> = Result<T, ClientError>;

/// Drives auctions locked at one validator on behalf of one wallet.
pub struct AuctionClient<L, W, S> {
    ledger: L,
    wallet: W,
    submitter: S,
    clock: Arc<dyn Clock>,
    validator: ValidatorArtifact,
    config: ClientConfig,
    in_flight: Mutex<()>,
}

impl<L, W, S> AuctionClient<L, W, S>
where
    L: LedgerReader,
    W: WalletSigner,
    S: Submitter,
{
    pub fn new(
        ledger: L,
        wallet: W,
        submitter: S,
        clock: Arc<dyn Clock>,
        validator: ValidatorArtifact,
        config: ClientConfig,
    ) -> Self {
        Self {
            ledger,
            wallet,
            submitter,
            clock,
            validator,
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// Address of auctions locked by this client's validator.
    pub fn auction_address(&self) -> Address {
        self.validator.address()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current auction record at `address`.
    pub async fn fetch_state(&self, address: &Address) -> ClientResult<AuctionState> {
        let (_, state) = self.fetch_current(address).await?;
        Ok(state)
    }

    /// Create an auction for `object` closing at `deadline`, with this
    /// wallet as seller.
    pub async fn create(
        &self,
        object: &str,
        deadline: Timestamp,
    ) -> ClientResult<(Address, AuctionState)> {
        let _guard = self.in_flight.lock().await;
        let (_, seller) = self.party().await?;
        let address = self.auction_address();
        let state = AuctionState::new(seller.payment, seller.stake, object, deadline);

        let request = build_creation(
            &state,
            &address,
            self.config.creation_lovelace,
            valid_from(self.clock.now_millis(), &self.config),
            &seller.payment,
        );
        let tx_hash = self.sign_and_confirm(request).await?;
        info!("Created auction '{}' at {} in {}", object, address, tx_hash);

        Ok((address, state))
    }

    /// Open bidding at `starting_amount` (smallest unit).
    pub async fn start(
        &self,
        address: &Address,
        starting_amount: u64,
    ) -> ClientResult<AuctionState> {
        self.act_and_refetch(address, AuctionAction::Start { starting_amount })
            .await
    }

    /// Bid `amount`, or raise if this wallet already leads.
    pub async fn bid_or_raise(&self, address: &Address, amount: u64) -> ClientResult<AuctionState> {
        self.act_and_refetch(address, AuctionAction::BidOrRaise { amount })
            .await
    }

    pub async fn end(&self, address: &Address) -> ClientResult<AuctionState> {
        self.act_and_refetch(address, AuctionAction::End).await
    }

    /// Reclaim the oldest withdrawal record owed to this wallet.
    pub async fn withdraw(&self, address: &Address) -> ClientResult<TxHash> {
        let _guard = self.in_flight.lock().await;
        let (tx_hash, _) = self.act(address, &AuctionAction::Withdraw).await?;
        Ok(tx_hash)
    }

    /// Withdrawal records at `address` owed to this wallet.
    pub async fn pending_withdrawals(
        &self,
        address: &Address,
    ) -> ClientResult<Vec<(Utxo, AuctionState)>> {
        let (_, party) = self.party().await?;
        let records = self.records_at(address).await?;
        Ok(pending_withdrawals_for(&records, &party.payment)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn act_and_refetch(
        &self,
        address: &Address,
        action: AuctionAction,
    ) -> ClientResult<AuctionState> {
        let _guard = self.in_flight.lock().await;
        let (_, acted_on) = self.act(address, &action).await?;

        let state = self.fetch_state(address).await?;
        if !state.same_auction(&acted_on) {
            warn!(
                "Auction at {} now holds '{}' instead of '{}'",
                address,
                state.object_label(),
                acted_on.object_label()
            );
            return Err(ClientError::AuctionReplaced(address.clone()));
        }
        info!(
            "Auction at {} is {} with {} from {}",
            address, state.status, state.amount, state.bidder
        );
        Ok(state)
    }

    /// Run fetch to confirmation, retrying from the fetch when a competing
    /// transaction consumed the input first. Returns the record the
    /// confirmed transaction consumed. Callers hold the in-flight lock.
    async fn act(
        &self,
        address: &Address,
        action: &AuctionAction,
    ) -> ClientResult<(TxHash, AuctionState)> {
        let (wallet_address, party) = self.party().await?;
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(address, action, &party, &wallet_address).await {
                Ok(done) => return Ok(done),
                Err(e) if e.is_conflict() && attempt < max_attempts => {
                    warn!(
                        "Attempt {}/{} to {} lost the race: {}",
                        attempt,
                        max_attempts,
                        action.name(),
                        e
                    );
                }
                Err(e) if e.is_conflict() => {
                    warn!("Giving up on {} after {} attempts", action.name(), attempt);
                    return Err(ClientError::LostRace { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        address: &Address,
        action: &AuctionAction,
        party: &Party,
        wallet_address: &Address,
    ) -> ClientResult<(TxHash, AuctionState)> {
        let (consumed, record) = match action {
            AuctionAction::Withdraw => {
                // Withdrawal records never end, so the main record decides
                let (_, main) = self.fetch_current(address).await?;
                if main.status.is_terminal() {
                    return Err(Rejection::TerminalState.into());
                }
                self.find_withdrawal(address, party).await?
            }
            _ => self.fetch_current(address).await?,
        };

        let now = self.clock.now_millis();
        let accepted = transition(&record, action, party, now)?;
        debug!(
            "Taking {:?} edge from {} at {}",
            accepted.edge, consumed.out_ref, now
        );

        let request = self.build_request(&consumed, &accepted, party, wallet_address, now, address);
        let tx_hash = self.sign_and_confirm(request).await?;
        Ok((tx_hash, record))
    }

    fn build_request(
        &self,
        consumed: &Utxo,
        accepted: &Transition,
        party: &Party,
        wallet_address: &Address,
        now: Timestamp,
        address: &Address,
    ) -> TransactionRequest {
        let split = ValueSplit::for_transition(consumed, accepted, &self.config, wallet_address);
        build(
            consumed,
            accepted,
            &split,
            valid_from(now, &self.config),
            &party.payment,
            &self.validator,
            address,
        )
    }

    async fn sign_and_confirm(&self, request: TransactionRequest) -> ClientResult<TxHash> {
        let signed = self.wallet.sign(request).await?;
        let tx_hash = self.submitter.submit(signed).await?;
        debug!("Submitted {}", tx_hash);

        match self.submitter.await_confirmation(&tx_hash).await? {
            Confirmation::Confirmed(confirmed) => {
                info!("Confirmed {}", confirmed);
                Ok(confirmed)
            }
            Confirmation::Failed(reason) => {
                warn!("Transaction {} not confirmed: {}", tx_hash, reason);
                Err(ClientError::Unconfirmed(tx_hash))
            }
        }
    }

    async fn party(&self) -> ClientResult<(Address, Party)> {
        let address = self.wallet.address().await?;
        let creds = self.wallet.address_credentials(&address)?;
        Ok((
            address,
            Party {
                payment: creds.payment,
                stake: creds.stake,
            },
        ))
    }

    async fn fetch_current(&self, address: &Address) -> ClientResult<(Utxo, AuctionState)> {
        let utxos = self.ledger.utxos_at_address(address).await?;
        let selected = select(&utxos)?.clone();
        let state = self.decode_utxo(&selected).await?;
        Ok((selected, state))
    }

    async fn find_withdrawal(
        &self,
        address: &Address,
        party: &Party,
    ) -> ClientResult<(Utxo, AuctionState)> {
        let records = self.records_at(address).await?;
        pending_withdrawals_for(&records, &party.payment)
            .into_iter()
            .next()
            .cloned()
            .ok_or(ClientError::Rejected(Rejection::NoPendingWithdrawal))
    }

    async fn records_at(&self, address: &Address) -> ClientResult<Vec<(Utxo, AuctionState)>> {
        let utxos = self.ledger.utxos_at_address(address).await?;
        let mut records = Vec::with_capacity(utxos.len());
        for utxo in utxos {
            let state = self.decode_utxo(&utxo).await?;
            records.push((utxo, state));
        }
        Ok(records)
    }

    async fn decode_utxo(&self, utxo: &Utxo) -> ClientResult<AuctionState> {
        let bytes = self.ledger.datum_of(utxo).await.map_err(|e| match e {
            LedgerError::OutputNotFound(out_ref) => ClientError::MissingDatum(out_ref),
            other => ClientError::Ledger(other),
        })?;
        Ok(decode(&bytes)?)
    }
}
