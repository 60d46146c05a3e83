//! Selection of the authoritative auction output.
//!
//! Two reads close together can observe more than one output at the auction
//! address: a `Bid` leaves both the continuing record and a withdrawal
//! record, and a not-yet-settled ledger can briefly expose a predecessor.
//! The rule below picks one deterministically instead of failing:
//!
//! - no outputs: the auction does not exist
//! - one output: it is current
//! - otherwise look at the two newest outputs (the reader reports oldest
//!   first). If they come from the same transaction, take the lower output
//!   index, which is where transitions place the continuing record.
//!   Otherwise take the newest.
//!
//! This is a heuristic for a two-candidate window. Where the ledger exposes
//! confirmation depth it should be replaced by a finality check.

use thiserror::Error;

use auction_types::{AuctionState, Credential, Status, Utxo};

/// Errors from output selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Auction not found or not yet created")]
    NoUtxo,
}

/// Pick the output holding the current auction record.
pub fn select(utxos: &[Utxo]) -> Result<&Utxo, SelectionError> {
    match utxos {
        [] => Err(SelectionError::NoUtxo),
        [only] => Ok(only),
        [.., older, newest] => {
            if older.out_ref.tx_hash == newest.out_ref.tx_hash {
                if older.out_ref.output_index <= newest.out_ref.output_index {
                    Ok(older)
                } else {
                    Ok(newest)
                }
            } else {
                Ok(newest)
            }
        }
    }
}

/// Withdrawal records owed to `bidder`, in ledger order.
pub fn pending_withdrawals_for<'a>(
    records: &'a [(Utxo, AuctionState)],
    bidder: &Credential,
) -> Vec<&'a (Utxo, AuctionState)> {
    records
        .iter()
        .filter(|(_, record)| record.status == Status::Outbid && record.bidder == *bidder)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::{Address, OutRef, TxHash};

    fn utxo(tx: u8, index: u32) -> Utxo {
        Utxo {
            out_ref: OutRef::new(TxHash([tx; 32]), index),
            address: Address::from("script1aa"),
            lovelace: 2_000_000,
            datum: None,
        }
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(select(&[]), Err(SelectionError::NoUtxo));
    }

    #[test]
    fn test_single_output() {
        let utxos = [utxo(1, 0)];
        assert_eq!(select(&utxos), Ok(&utxos[0]));
    }

    #[test]
    fn test_distinct_transactions_pick_newest() {
        let utxos = [utxo(1, 1), utxo(2, 0)];
        for _ in 0..3 {
            assert_eq!(select(&utxos).unwrap().out_ref, OutRef::new(TxHash([2; 32]), 0));
        }
    }

    #[test]
    fn test_same_transaction_picks_lower_index() {
        let utxos = [utxo(3, 0), utxo(3, 1)];
        assert_eq!(select(&utxos).unwrap().out_ref.output_index, 0);

        let reversed = [utxo(3, 1), utxo(3, 0)];
        assert_eq!(select(&reversed).unwrap().out_ref.output_index, 0);
    }

    #[test]
    fn test_only_last_two_are_considered() {
        let utxos = [utxo(1, 0), utxo(2, 1), utxo(4, 0), utxo(4, 1)];
        assert_eq!(select(&utxos).unwrap().out_ref, OutRef::new(TxHash([4; 32]), 0));

        let utxos = [utxo(4, 0), utxo(4, 1), utxo(5, 1)];
        assert_eq!(select(&utxos).unwrap().out_ref, OutRef::new(TxHash([5; 32]), 1));
    }

    #[test]
    fn test_pending_withdrawals_filtered_by_bidder() {
        let seller = Credential([1u8; 28]);
        let other = Credential([2u8; 28]);
        let mut main = AuctionState::new(seller, seller, "Painting", 10);
        main.status = Status::Started;
        let mut owed_seller = main.clone();
        owed_seller.status = Status::Outbid;
        let mut owed_other = owed_seller.clone();
        owed_other.bidder = other;

        let records = vec![
            (utxo(1, 1), owed_seller.clone()),
            (utxo(2, 0), main),
            (utxo(2, 1), owed_other),
        ];

        let found = pending_withdrawals_for(&records, &seller);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, owed_seller);
        assert_eq!(pending_withdrawals_for(&records, &Credential([9u8; 28])).len(), 0);
    }
}
