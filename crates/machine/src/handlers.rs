//! Transition handlers for the auction state machine.
//!
//! These functions are pure: they read the current record and the actor and
//! either return the successor or the guard that failed.

use auction_types::{AuctionState, PendingWithdrawal, RedeemerKind, Status, Timestamp};

use crate::call::{AuctionAction, Edge, Party, Transition};
use crate::error::Rejection;

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, Rejection>;

/// Apply `action` by `actor` to `state` at time `now`.
///
/// Guards are checked in a fixed order: terminal state, status, amount
/// shape, deadline, actor, bid size.
pub fn transition(
    state: &AuctionState,
    action: &AuctionAction,
    actor: &Party,
    now: Timestamp,
) -> HandlerResult<Transition> {
    if state.status.is_terminal() {
        return Err(Rejection::TerminalState);
    }

    match action {
        AuctionAction::Start { starting_amount } => {
            handle_start(state, actor, *starting_amount)
        }
        AuctionAction::BidOrRaise { amount } => handle_bid_or_raise(state, actor, *amount, now),
        AuctionAction::Withdraw => handle_withdraw(state, actor),
        AuctionAction::End => handle_end(state, actor),
    }
}

/// Decide whether a bid from `actor` is a new bid or a raise.
pub fn classify_bid(state: &AuctionState, actor: &Party) -> Edge {
    if state.bidder == actor.payment {
        Edge::Raise
    } else {
        Edge::Bid
    }
}

/// Handle Start: the seller opens bidding.
pub fn handle_start(
    state: &AuctionState,
    actor: &Party,
    starting_amount: u64,
) -> HandlerResult<Transition> {
    require_status(state, Status::NotStarted, "start")?;
    require_positive(starting_amount)?;

    if actor.payment != state.seller {
        return Err(Rejection::WrongActor {
            action: "start",
            actor: actor.payment,
        });
    }

    let next = AuctionState {
        status: Status::Started,
        bidder: state.seller,
        bidder_stake: actor.stake,
        amount: starting_amount,
        ..state.clone()
    };

    Ok(Transition {
        edge: Edge::Start,
        redeemer: RedeemerKind::Start,
        next: Some(next),
        pending: None,
    })
}

/// Handle a bid request, taking the Bid or Raise edge depending on the actor.
pub fn handle_bid_or_raise(
    state: &AuctionState,
    actor: &Party,
    amount: u64,
    now: Timestamp,
) -> HandlerResult<Transition> {
    require_status(state, Status::Started, "bid")?;
    require_positive(amount)?;

    if now >= state.deadline {
        return Err(Rejection::DeadlinePassed {
            deadline: state.deadline,
            now,
        });
    }

    let edge = classify_bid(state, actor);

    if amount <= state.amount {
        return Err(Rejection::InsufficientBid {
            current: state.amount,
            proposed: amount,
        });
    }

    // A raise keeps the bidder; only a new bidder displaces the previous one
    let pending = match edge {
        Edge::Bid => Some(PendingWithdrawal::of_leader(state)),
        _ => None,
    };

    let next = AuctionState {
        status: Status::Started,
        bidder: actor.payment,
        bidder_stake: actor.stake,
        amount,
        ..state.clone()
    };

    Ok(Transition {
        edge,
        redeemer: RedeemerKind::Bid,
        next: Some(next),
        pending,
    })
}

/// Handle Withdraw: a displaced bidder consumes their pending record.
pub fn handle_withdraw(record: &AuctionState, actor: &Party) -> HandlerResult<Transition> {
    if record.status != Status::Outbid {
        return Err(Rejection::NoPendingWithdrawal);
    }

    if actor.payment != record.bidder {
        return Err(Rejection::WrongActor {
            action: "withdraw",
            actor: actor.payment,
        });
    }

    Ok(Transition {
        edge: Edge::Withdraw,
        redeemer: RedeemerKind::Withdraw,
        next: None,
        pending: None,
    })
}

/// Handle End: the seller freezes the leading bid.
pub fn handle_end(state: &AuctionState, actor: &Party) -> HandlerResult<Transition> {
    require_status(state, Status::Started, "end")?;

    if actor.payment != state.seller {
        return Err(Rejection::WrongActor {
            action: "end",
            actor: actor.payment,
        });
    }

    Ok(Transition {
        edge: Edge::End,
        redeemer: RedeemerKind::End,
        next: Some(AuctionState {
            status: Status::Ended,
            ..state.clone()
        }),
        pending: None,
    })
}

fn require_status(state: &AuctionState, expected: Status, action: &'static str) -> HandlerResult<()> {
    if state.status != expected {
        return Err(Rejection::InvalidStatus {
            action,
            status: state.status,
        });
    }
    Ok(())
}

fn require_positive(amount: u64) -> HandlerResult<()> {
    if amount == 0 {
        return Err(Rejection::MalformedAmount("amount must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::Credential;
    use proptest::prelude::*;

    const DEADLINE: Timestamp = 10_000;

    fn party(byte: u8) -> Party {
        Party {
            payment: Credential([byte; 28]),
            stake: Credential([byte + 100; 28]),
        }
    }

    fn seller() -> Party {
        party(1)
    }

    fn created() -> AuctionState {
        let s = seller();
        AuctionState::new(s.payment, s.stake, "Painting", DEADLINE)
    }

    fn started(amount: u64) -> AuctionState {
        transition(
            &created(),
            &AuctionAction::Start {
                starting_amount: amount,
            },
            &seller(),
            1_000,
        )
        .unwrap()
        .next
        .unwrap()
    }

    fn bid(state: &AuctionState, actor: &Party, amount: u64) -> HandlerResult<Transition> {
        transition(state, &AuctionAction::BidOrRaise { amount }, actor, 2_000)
    }

    #[test]
    fn test_start_by_seller() {
        let state = started(10_000_000);
        assert_eq!(state.status, Status::Started);
        assert_eq!(state.amount, 10_000_000);
        assert_eq!(state.bidder, seller().payment);
    }

    #[test]
    fn test_start_by_other_party() {
        let result = transition(
            &created(),
            &AuctionAction::Start {
                starting_amount: 5,
            },
            &party(2),
            1_000,
        );
        assert!(matches!(
            result,
            Err(Rejection::WrongActor { action: "start", .. })
        ));
    }

    #[test]
    fn test_start_twice() {
        let result = transition(
            &started(10),
            &AuctionAction::Start {
                starting_amount: 20,
            },
            &seller(),
            1_000,
        );
        assert!(matches!(
            result,
            Err(Rejection::InvalidStatus {
                status: Status::Started,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_amount_is_malformed() {
        let result = transition(
            &created(),
            &AuctionAction::Start { starting_amount: 0 },
            &seller(),
            1_000,
        );
        assert!(matches!(result, Err(Rejection::MalformedAmount(_))));
        assert!(matches!(
            bid(&started(10), &party(2), 0),
            Err(Rejection::MalformedAmount(_))
        ));
    }

    #[test]
    fn test_bid_displaces_leader() {
        let state = started(10_000_000);
        let t = bid(&state, &party(2), 15_000_000).unwrap();

        assert_eq!(t.edge, Edge::Bid);
        assert_eq!(t.redeemer, RedeemerKind::Bid);
        let next = t.next.unwrap();
        assert_eq!(next.bidder, party(2).payment);
        assert_eq!(next.bidder_stake, party(2).stake);
        assert_eq!(next.amount, 15_000_000);
        assert_eq!(
            t.pending,
            Some(PendingWithdrawal {
                bidder: seller().payment,
                bidder_stake: seller().stake,
                amount: 10_000_000,
            })
        );
    }

    #[test]
    fn test_leader_bid_is_raise() {
        let state = bid(&started(10), &party(2), 15).unwrap().next.unwrap();
        let t = bid(&state, &party(2), 20).unwrap();

        assert_eq!(t.edge, Edge::Raise);
        assert_eq!(t.redeemer, RedeemerKind::Bid);
        assert_eq!(t.pending, None);
        assert_eq!(t.next.unwrap().amount, 20);
    }

    #[test]
    fn test_classification_ignores_amount() {
        let state = bid(&started(10), &party(2), 15).unwrap().next.unwrap();
        for amount in [16, 1_000, u64::MAX] {
            assert_eq!(bid(&state, &party(2), amount).unwrap().edge, Edge::Raise);
            assert_eq!(bid(&state, &party(3), amount).unwrap().edge, Edge::Bid);
        }
    }

    #[test]
    fn test_insufficient_bid() {
        let state = started(10_000_000);
        for amount in [1, 9_999_999, 10_000_000] {
            assert_eq!(
                bid(&state, &party(2), amount),
                Err(Rejection::InsufficientBid {
                    current: 10_000_000,
                    proposed: amount,
                })
            );
        }
    }

    #[test]
    fn test_bid_after_deadline() {
        let result = transition(
            &started(10),
            &AuctionAction::BidOrRaise { amount: 20 },
            &party(2),
            DEADLINE,
        );
        assert_eq!(
            result,
            Err(Rejection::DeadlinePassed {
                deadline: DEADLINE,
                now: DEADLINE,
            })
        );
    }

    #[test]
    fn test_bid_before_start() {
        assert!(matches!(
            bid(&created(), &party(2), 20),
            Err(Rejection::InvalidStatus {
                status: Status::NotStarted,
                ..
            })
        ));
    }

    #[test]
    fn test_amount_strictly_increases() {
        let mut state = started(100);
        let bidders = [party(2), party(3), party(3), party(2), party(4)];
        let amounts = [150, 200, 250, 300, 301];

        for (actor, amount) in bidders.iter().zip(amounts) {
            let previous = state.amount;
            state = bid(&state, actor, amount).unwrap().next.unwrap();
            assert!(state.amount > previous);
        }
        assert_eq!(state.bidder, party(4).payment);
    }

    #[test]
    fn test_end_by_seller_freezes_leader() {
        let state = bid(&started(10), &party(2), 15).unwrap().next.unwrap();
        let t = transition(&state, &AuctionAction::End, &seller(), 3_000).unwrap();
        let ended = t.next.unwrap();

        assert_eq!(t.redeemer, RedeemerKind::End);
        assert_eq!(ended.status, Status::Ended);
        assert_eq!(ended.bidder, party(2).payment);
        assert_eq!(ended.amount, 15);
    }

    #[test]
    fn test_end_by_bidder_rejected() {
        let state = bid(&started(10), &party(2), 15).unwrap().next.unwrap();
        assert!(matches!(
            transition(&state, &AuctionAction::End, &party(2), 3_000),
            Err(Rejection::WrongActor { action: "end", .. })
        ));
    }

    #[test]
    fn test_terminal_state_rejects_everything() {
        let state = bid(&started(10), &party(2), 15).unwrap().next.unwrap();
        let ended = transition(&state, &AuctionAction::End, &seller(), 3_000)
            .unwrap()
            .next
            .unwrap();

        let actions = [
            (AuctionAction::BidOrRaise { amount: 100 }, party(3)),
            (AuctionAction::BidOrRaise { amount: 100 }, party(2)),
            (AuctionAction::Withdraw, party(2)),
            (
                AuctionAction::Start {
                    starting_amount: 5,
                },
                seller(),
            ),
            (AuctionAction::End, seller()),
        ];
        for (action, actor) in actions {
            assert_eq!(
                transition(&ended, &action, &actor, 3_000),
                Err(Rejection::TerminalState)
            );
        }
    }

    #[test]
    fn test_withdraw_pending_record() {
        let state = started(10);
        let t = bid(&state, &party(2), 15).unwrap();
        let record = t.pending.unwrap().to_record(&t.next.unwrap());

        let w = transition(&record, &AuctionAction::Withdraw, &seller(), 5_000).unwrap();
        assert_eq!(w.edge, Edge::Withdraw);
        assert_eq!(w.redeemer, RedeemerKind::Withdraw);
        assert_eq!(w.next, None);

        assert!(matches!(
            transition(&record, &AuctionAction::Withdraw, &party(2), 5_000),
            Err(Rejection::WrongActor {
                action: "withdraw",
                ..
            })
        ));
    }

    #[test]
    fn test_withdraw_from_main_record() {
        assert_eq!(
            transition(&started(10), &AuctionAction::Withdraw, &seller(), 5_000),
            Err(Rejection::NoPendingWithdrawal)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            .. ProptestConfig::default()
        })]

        #[test]
        fn accepted_bids_strictly_increase(
            steps in proptest::collection::vec((2u8..6, 0u64..2_000, 0u64..12_000), 1..32),
        ) {
            let mut state = started(100);
            for (who, amount, now) in steps {
                let actor = party(who);
                let action = AuctionAction::BidOrRaise { amount };
                match transition(&state, &action, &actor, now) {
                    Ok(t) => {
                        let next = t.next.unwrap();
                        prop_assert!(now < DEADLINE);
                        prop_assert!(next.amount > state.amount);
                        prop_assert_eq!(next.bidder, actor.payment);
                        prop_assert!(next.same_auction(&state));
                        match t.edge {
                            Edge::Bid => {
                                let pending = t.pending.unwrap();
                                prop_assert_eq!(pending.amount, state.amount);
                                prop_assert_eq!(pending.bidder, state.bidder);
                            }
                            Edge::Raise => {
                                prop_assert_eq!(state.bidder, actor.payment);
                                prop_assert!(t.pending.is_none());
                            }
                            other => {
                                prop_assert!(false, "unexpected edge {:?}", other);
                            }
                        }
                        state = next;
                    }
                    Err(_) => {
                        prop_assert!(amount <= state.amount || now >= DEADLINE);
                    }
                }
            }
        }
    }
}
