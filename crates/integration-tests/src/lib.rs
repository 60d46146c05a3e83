//! End-to-end integration tests for the UTXO auction client.
//!
//! These tests exercise the full auction lifecycle against the in-memory
//! ledger and, over JSON-RPC, against the mock chain:
//! 1. Auction creation
//! 2. Start, bids and raises
//! 3. Races between concurrent bidders
//! 4. Withdrawal of displaced bids, then End

#![cfg(test)]

use std::sync::Arc;

use auction_client::{
    AuctionClient, ClientConfig, ClientError, DevWallet, LedgerReader, MemoryLedger, RpcLedger,
};
use auction_datum::{decode, encode};
use auction_machine::{to_smallest_unit, Rejection};
use auction_types::{Address, AuctionState, ScriptKind, Status, Timestamp, ValidatorArtifact};

const NOW: Timestamp = 1_700_000_000_000;
const DEADLINE: Timestamp = NOW + 86_400_000;

const SELLER: u8 = 1;
const BIDDER_A: u8 = 2;
const BIDDER_B: u8 = 3;

type MemoryClient = AuctionClient<Arc<MemoryLedger>, DevWallet, Arc<MemoryLedger>>;

fn validator() -> ValidatorArtifact {
    ValidatorArtifact {
        kind: ScriptKind::PlutusV2,
        script: b"english-auction-v1".to_vec(),
    }
}

fn wallet(seed: u8) -> DevWallet {
    DevWallet::from_seed([seed; 32])
}

fn memory_client(ledger: &Arc<MemoryLedger>, seed: u8) -> MemoryClient {
    AuctionClient::new(
        ledger.clone(),
        wallet(seed),
        ledger.clone(),
        ledger.clone(),
        validator(),
        ClientConfig::default(),
    )
}

fn ada(display: &str) -> u64 {
    to_smallest_unit(display).unwrap()
}

/// Decode every record at `address` and check it re-encodes to the same bytes.
fn records_at(ledger: &MemoryLedger, address: &Address) -> Vec<AuctionState> {
    ledger
        .unspent_at(address)
        .iter()
        .map(|utxo| {
            let bytes = utxo.datum.as_ref().unwrap();
            let record = decode(bytes).unwrap();
            assert_eq!(&encode(&record), bytes);
            record
        })
        .collect()
}

/// Create and start an auction at 10 ADA.
async fn started_auction(ledger: &Arc<MemoryLedger>) -> (MemoryClient, Address) {
    let seller = memory_client(ledger, SELLER);
    let (address, _) = seller.create("Painting", DEADLINE).await.unwrap();
    seller.start(&address, ada("10")).await.unwrap();
    (seller, address)
}

/// Test the complete Painting auction flow.
#[tokio::test]
async fn test_painting_lifecycle() {
    let ledger = Arc::new(MemoryLedger::new(NOW));
    let seller = memory_client(&ledger, SELLER);
    let bidder_a = memory_client(&ledger, BIDDER_A);
    let seller_id = wallet(SELLER).credentials().payment;
    let a_id = wallet(BIDDER_A).credentials().payment;

    // Creation
    let (address, created) = seller.create("Painting", DEADLINE).await.unwrap();
    assert_eq!(created.object_label(), "Painting");
    assert_eq!(created.status, Status::NotStarted);
    assert_eq!(created.amount, 0);
    assert_eq!(created.bidder, seller_id);

    // Start at 10 ADA
    let state = seller.start(&address, ada("10")).await.unwrap();
    assert_eq!(state.status, Status::Started);
    assert_eq!(state.amount, 10_000_000);
    assert_eq!(state.bidder, seller_id);

    // A bids 15 ADA, displacing the seller's starting amount
    let state = bidder_a.bid_or_raise(&address, ada("15")).await.unwrap();
    assert_eq!(state.status, Status::Started);
    assert_eq!(state.amount, 15_000_000);
    assert_eq!(state.bidder, a_id);

    let owed = seller.pending_withdrawals(&address).await.unwrap();
    assert_eq!(owed.len(), 1);
    assert_eq!(owed[0].1.amount, 10_000_000);
    assert_eq!(owed[0].0.lovelace, 10_000_000);

    // A bids again: a raise, no new withdrawal record
    let state = bidder_a.bid_or_raise(&address, ada("20")).await.unwrap();
    assert_eq!(state.amount, 20_000_000);
    assert_eq!(state.bidder, a_id);
    assert!(bidder_a.pending_withdrawals(&address).await.unwrap().is_empty());
    assert_eq!(seller.pending_withdrawals(&address).await.unwrap().len(), 1);
    assert_eq!(records_at(&ledger, &address).len(), 2);

    // The displaced seller reclaims the starting amount while bidding is open
    assert_eq!(
        bidder_a.withdraw(&address).await,
        Err(ClientError::Rejected(Rejection::NoPendingWithdrawal))
    );
    seller.withdraw(&address).await.unwrap();
    assert!(seller.pending_withdrawals(&address).await.unwrap().is_empty());
    assert_eq!(records_at(&ledger, &address).len(), 1);

    // End freezes A's bid
    let state = seller.end(&address).await.unwrap();
    assert_eq!(state.status, Status::Ended);
    assert_eq!(state.amount, 20_000_000);
    assert_eq!(state.bidder, a_id);

    // Terminal: nothing moves the main record again, withdrawals included
    let before = ledger.included_count();
    assert_eq!(
        bidder_a.bid_or_raise(&address, ada("25")).await,
        Err(ClientError::Rejected(Rejection::TerminalState))
    );
    assert_eq!(
        seller.start(&address, ada("30")).await,
        Err(ClientError::Rejected(Rejection::TerminalState))
    );
    assert_eq!(
        seller.end(&address).await,
        Err(ClientError::Rejected(Rejection::TerminalState))
    );
    assert_eq!(
        bidder_a.withdraw(&address).await,
        Err(ClientError::Rejected(Rejection::TerminalState))
    );
    assert_eq!(
        seller.withdraw(&address).await,
        Err(ClientError::Rejected(Rejection::TerminalState))
    );
    assert_eq!(ledger.included_count(), before);

    let final_state = seller.fetch_state(&address).await.unwrap();
    assert_eq!(final_state.status, Status::Ended);
    assert_eq!(final_state.amount, 20_000_000);
    assert_eq!(final_state.bidder, a_id);
    assert_eq!(records_at(&ledger, &address), vec![final_state]);
}

#[tokio::test]
async fn test_amounts_strictly_increase() {
    let ledger = Arc::new(MemoryLedger::new(NOW));
    let (seller, address) = started_auction(&ledger).await;
    let bidder_a = memory_client(&ledger, BIDDER_A);
    let bidder_b = memory_client(&ledger, BIDDER_B);

    let mut last = seller.fetch_state(&address).await.unwrap().amount;
    for (client, amount) in [
        (&bidder_a, "11"),
        (&bidder_b, "12.5"),
        (&bidder_b, "13"),
        (&bidder_a, "20"),
    ] {
        let state = client.bid_or_raise(&address, ada(amount)).await.unwrap();
        assert!(state.amount > last);
        last = state.amount;
    }

    // Equal is not enough
    let before = ledger.included_count();
    assert_eq!(
        bidder_b.bid_or_raise(&address, ada("20")).await,
        Err(ClientError::Rejected(Rejection::InsufficientBid {
            current: 20_000_000,
            proposed: 20_000_000,
        }))
    );
    assert_eq!(ledger.included_count(), before);

    // A was displaced once and B once
    assert_eq!(bidder_a.pending_withdrawals(&address).await.unwrap().len(), 1);
    assert_eq!(bidder_b.pending_withdrawals(&address).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_bid_after_deadline_rejected() {
    let ledger = Arc::new(MemoryLedger::new(NOW));
    let (_, address) = started_auction(&ledger).await;
    let bidder_a = memory_client(&ledger, BIDDER_A);

    ledger.set_time(DEADLINE);
    let result = bidder_a.bid_or_raise(&address, ada("15")).await;
    assert!(matches!(
        result,
        Err(ClientError::Rejected(Rejection::DeadlinePassed { .. }))
    ));
}

#[tokio::test]
async fn test_concurrent_bidders_settle_on_one_state() {
    let ledger = Arc::new(MemoryLedger::new(NOW));
    let (seller, address) = started_auction(&ledger).await;
    let bidder_a = memory_client(&ledger, BIDDER_A);
    let bidder_b = memory_client(&ledger, BIDDER_B);

    let (a, b) = tokio::join!(
        bidder_a.bid_or_raise(&address, ada("15")),
        bidder_b.bid_or_raise(&address, ada("20")),
    );

    // B always wins. A either landed first and was outbid on B's retry, or
    // lost the race and was then rejected against B's higher bid.
    let b = b.unwrap();
    assert_eq!(b.amount, 20_000_000);
    match a {
        Ok(state) => assert_eq!(state.amount, 15_000_000),
        Err(e) => assert_eq!(
            e,
            ClientError::Rejected(Rejection::InsufficientBid {
                current: 20_000_000,
                proposed: 15_000_000,
            })
        ),
    }

    let state = seller.fetch_state(&address).await.unwrap();
    assert_eq!(state.bidder, wallet(BIDDER_B).credentials().payment);
    assert_eq!(state.amount, 20_000_000);
}

#[tokio::test]
async fn test_lost_race_after_max_attempts() {
    let ledger = Arc::new(MemoryLedger::new(NOW));
    let seller = memory_client(&ledger, SELLER);
    let (address, created) = seller.create("Painting", DEADLINE).await.unwrap();

    ledger.conflict_next_submissions(3);
    assert_eq!(
        seller.start(&address, ada("10")).await,
        Err(ClientError::LostRace { attempts: 3 })
    );
    assert_eq!(seller.fetch_state(&address).await.unwrap(), created);

    // The next attempt goes through
    assert_eq!(
        seller.start(&address, ada("10")).await.unwrap().status,
        Status::Started
    );
}

#[tokio::test]
async fn test_unconfirmed_leaves_state_unchanged() {
    let ledger = Arc::new(MemoryLedger::new(NOW));
    let (seller, address) = started_auction(&ledger).await;
    let bidder_a = memory_client(&ledger, BIDDER_A);
    let before = seller.fetch_state(&address).await.unwrap();

    ledger.drop_next_submissions(1);
    let result = bidder_a.bid_or_raise(&address, ada("15")).await;
    assert!(matches!(result, Err(ClientError::Unconfirmed(_))));
    assert_eq!(seller.fetch_state(&address).await.unwrap(), before);

    // Retrying from the fetch succeeds
    let state = bidder_a.bid_or_raise(&address, ada("15")).await.unwrap();
    assert_eq!(state.amount, 15_000_000);
}

#[tokio::test]
async fn test_lifecycle_over_rpc() {
    let ledger = Arc::new(MemoryLedger::new(NOW));
    let (bound, handle) = mock_chain::serve("127.0.0.1:0".parse().unwrap(), ledger.clone())
        .await
        .unwrap();
    let rpc = RpcLedger::connect(&format!("http://{}", bound)).unwrap();
    assert_eq!(rpc.chain_time().await.unwrap(), NOW);

    let client = |seed: u8| {
        AuctionClient::new(
            rpc.clone(),
            wallet(seed),
            rpc.clone(),
            ledger.clone(),
            validator(),
            ClientConfig::default(),
        )
    };
    let seller = client(SELLER);
    let bidder_a = client(BIDDER_A);

    let (address, _) = seller.create("Painting", DEADLINE).await.unwrap();
    seller.start(&address, ada("10")).await.unwrap();
    let state = bidder_a.bid_or_raise(&address, ada("15")).await.unwrap();
    assert_eq!(state.amount, 15_000_000);
    let owed = seller.pending_withdrawals(&address).await.unwrap();
    assert_eq!(owed.len(), 1);

    // Outputs can also be looked up directly by reference
    let looked_up = rpc.utxos_by_out_ref(&[owed[0].0.out_ref]).await.unwrap();
    assert_eq!(looked_up, vec![owed[0].0.clone()]);

    // Conflicts travel as a distinct error code and are retried
    ledger.conflict_next_submissions(3);
    assert_eq!(
        bidder_a.bid_or_raise(&address, ada("20")).await,
        Err(ClientError::LostRace { attempts: 3 })
    );

    // Non-inclusion is reported, not assumed
    ledger.drop_next_submissions(1);
    assert!(matches!(
        bidder_a.bid_or_raise(&address, ada("20")).await,
        Err(ClientError::Unconfirmed(_))
    ));

    let state = seller.end(&address).await.unwrap();
    assert_eq!(state.status, Status::Ended);
    assert_eq!(state.amount, 15_000_000);

    handle.stop().unwrap();
}
