//! Off-chain state machine for UTXO-backed English auctions.
//!
//! The auction record is consumed and recreated by every transition. This
//! crate decides, without any ledger I/O, whether an action is allowed and
//! what the successor record is:
//!
//! - `call`: actions, parties and accepted transitions
//! - `handlers`: the transition function, one handler per action
//! - `amount`: display-unit to smallest-unit conversion
//! - `error`: rejection reasons
//!
//! # Example
//!
//! ```ignore
//! use auction_machine::{transition, AuctionAction, Edge};
//!
//! let t = transition(&state, &AuctionAction::BidOrRaise { amount }, &me, now)?;
//! if t.edge == Edge::Bid {
//!     // t.pending holds the displaced bidder's claim
//! }
//! ```

pub mod amount;
pub mod call;
pub mod error;
pub mod handlers;

pub use amount::{to_display, to_smallest_unit};
pub use call::{AuctionAction, Edge, Party, Transition};
pub use error::Rejection;
pub use handlers::{classify_bid, transition, HandlerResult};
