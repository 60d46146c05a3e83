//! Auction record and redeemer codecs.
//!
//! The record is constructor 0 with seven positional fields, in this order:
//! seller, object, deadline, status, bidder, bidder stake, amount.

use auction_types::{AuctionState, Credential, RedeemerKind, Status};

use crate::error::DecodeError;
use crate::plutus::PlutusData;

/// Number of positional fields in the auction record.
pub const RECORD_ARITY: usize = 7;

/// Constructor index of the auction record.
pub const RECORD_CONSTRUCTOR: u64 = 0;

/// Encode an auction record to datum bytes.
pub fn encode(state: &AuctionState) -> Vec<u8> {
    to_plutus(state).to_cbor()
}

/// Decode datum bytes into an auction record.
pub fn decode(bytes: &[u8]) -> Result<AuctionState, DecodeError> {
    let data = PlutusData::from_cbor(bytes)?;
    from_plutus(&data)
}

pub fn to_plutus(state: &AuctionState) -> PlutusData {
    PlutusData::Constr {
        tag: RECORD_CONSTRUCTOR,
        fields: vec![
            PlutusData::Bytes(state.seller.0.to_vec()),
            PlutusData::Bytes(state.object.clone()),
            PlutusData::Integer(state.deadline as i128),
            PlutusData::unit(state.status.tag()),
            PlutusData::Bytes(state.bidder.0.to_vec()),
            PlutusData::Bytes(state.bidder_stake.0.to_vec()),
            PlutusData::Integer(state.amount as i128),
        ],
    }
}

pub fn from_plutus(data: &PlutusData) -> Result<AuctionState, DecodeError> {
    let (tag, fields) = match data {
        PlutusData::Constr { tag, fields } => (*tag, fields),
        _ => {
            return Err(DecodeError::TypeMismatch {
                field: "record",
                expected: "constructor",
            })
        }
    };
    if tag != RECORD_CONSTRUCTOR {
        return Err(DecodeError::UnexpectedConstructor {
            expected: RECORD_CONSTRUCTOR,
            found: tag,
        });
    }
    let [seller, object, deadline, status, bidder, bidder_stake, amount] = fields.as_slice()
    else {
        return Err(DecodeError::ArityMismatch {
            expected: RECORD_ARITY,
            found: fields.len(),
        });
    };

    Ok(AuctionState {
        seller: credential("seller", seller)?,
        object: bytes("object", object)?.to_vec(),
        deadline: unsigned("deadline", deadline)?,
        status: status_field(status)?,
        bidder: credential("bidder", bidder)?,
        bidder_stake: credential("bidder_stake", bidder_stake)?,
        amount: unsigned("amount", amount)?,
    })
}

/// Encode the redeemer for an action.
pub fn encode_redeemer(kind: RedeemerKind) -> Vec<u8> {
    PlutusData::unit(kind.tag()).to_cbor()
}

pub fn decode_redeemer(bytes: &[u8]) -> Result<RedeemerKind, DecodeError> {
    match PlutusData::from_cbor(bytes)? {
        PlutusData::Constr { tag, fields } if fields.is_empty() => {
            RedeemerKind::from_tag(tag).ok_or(DecodeError::UnknownRedeemerTag(tag))
        }
        _ => Err(DecodeError::TypeMismatch {
            field: "redeemer",
            expected: "nullary constructor",
        }),
    }
}

fn bytes<'a>(field: &'static str, data: &'a PlutusData) -> Result<&'a [u8], DecodeError> {
    match data {
        PlutusData::Bytes(b) => Ok(b.as_slice()),
        _ => Err(DecodeError::TypeMismatch {
            field,
            expected: "bytes",
        }),
    }
}

fn credential(field: &'static str, data: &PlutusData) -> Result<Credential, DecodeError> {
    let raw = bytes(field, data)?;
    Credential::from_slice(raw).ok_or(DecodeError::InvalidLength {
        field,
        expected: Credential::LEN,
        found: raw.len(),
    })
}

fn unsigned(field: &'static str, data: &PlutusData) -> Result<u64, DecodeError> {
    match data {
        PlutusData::Integer(n) => {
            u64::try_from(*n).map_err(|_| DecodeError::IntegerOutOfRange { field })
        }
        _ => Err(DecodeError::TypeMismatch {
            field,
            expected: "integer",
        }),
    }
}

fn status_field(data: &PlutusData) -> Result<Status, DecodeError> {
    match data {
        PlutusData::Constr { tag, fields } if fields.is_empty() => {
            Status::from_tag(*tag).ok_or(DecodeError::UnknownStatusTag(*tag))
        }
        _ => Err(DecodeError::TypeMismatch {
            field: "status",
            expected: "nullary constructor",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn painting() -> AuctionState {
        AuctionState::new(
            Credential([1u8; 28]),
            Credential([2u8; 28]),
            "Painting",
            1_735_689_600_000,
        )
    }

    fn fields_of(state: &AuctionState) -> Vec<PlutusData> {
        match to_plutus(state) {
            PlutusData::Constr { fields, .. } => fields,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_roundtrip_across_lifecycle() {
        let created = painting();
        let started = AuctionState {
            status: Status::Started,
            amount: 10_000_000,
            ..created.clone()
        };
        let outbid = AuctionState {
            status: Status::Outbid,
            ..started.clone()
        };
        let bid = AuctionState {
            bidder: Credential([3u8; 28]),
            bidder_stake: Credential([4u8; 28]),
            amount: 15_000_000,
            ..started.clone()
        };
        let ended = AuctionState {
            status: Status::Ended,
            ..bid.clone()
        };

        for state in [created, started, outbid, bid, ended] {
            assert_eq!(decode(&encode(&state)).unwrap(), state);
        }
    }

    #[test]
    fn test_long_object_label_roundtrip() {
        let mut state = painting();
        state.object = vec![b'x'; 150];
        assert_eq!(decode(&encode(&state)).unwrap(), state);
    }

    #[test]
    fn test_wire_layout() {
        let encoded = encode(&painting());
        // Constructor 0, indefinite field list, 28-byte seller
        assert_eq!(&encoded[..5], &[0xd8, 0x79, 0x9f, 0x58, 0x1c]);
        assert_eq!(*encoded.last().unwrap(), 0xff);
    }

    #[test]
    fn test_arity_mismatch() {
        let mut fields = fields_of(&painting());
        fields.pop();
        let short = PlutusData::Constr { tag: 0, fields }.to_cbor();
        assert_eq!(
            decode(&short),
            Err(DecodeError::ArityMismatch {
                expected: 7,
                found: 6
            })
        );

        let mut fields = fields_of(&painting());
        fields.push(PlutusData::Integer(1));
        let long = PlutusData::Constr { tag: 0, fields }.to_cbor();
        assert!(matches!(
            decode(&long),
            Err(DecodeError::ArityMismatch { found: 8, .. })
        ));
    }

    #[test]
    fn test_type_mismatch_on_swapped_fields() {
        let mut fields = fields_of(&painting());
        fields.swap(2, 6);
        fields.swap(1, 2);
        let data = PlutusData::Constr { tag: 0, fields }.to_cbor();
        assert!(matches!(
            decode(&data),
            Err(DecodeError::TypeMismatch { field: "object", .. })
        ));

        let mut fields = fields_of(&painting());
        fields[3] = PlutusData::Integer(1);
        let data = PlutusData::Constr { tag: 0, fields }.to_cbor();
        assert!(matches!(
            decode(&data),
            Err(DecodeError::TypeMismatch { field: "status", .. })
        ));
    }

    #[test]
    fn test_unknown_status_tag() {
        let mut fields = fields_of(&painting());
        fields[3] = PlutusData::unit(4);
        let data = PlutusData::Constr { tag: 0, fields }.to_cbor();
        assert_eq!(decode(&data), Err(DecodeError::UnknownStatusTag(4)));
    }

    #[test]
    fn test_bad_credential_length() {
        let mut fields = fields_of(&painting());
        fields[4] = PlutusData::Bytes(vec![0u8; 32]);
        let data = PlutusData::Constr { tag: 0, fields }.to_cbor();
        assert_eq!(
            decode(&data),
            Err(DecodeError::InvalidLength {
                field: "bidder",
                expected: 28,
                found: 32
            })
        );
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut fields = fields_of(&painting());
        fields[6] = PlutusData::Integer(-5);
        let data = PlutusData::Constr { tag: 0, fields }.to_cbor();
        assert_eq!(
            decode(&data),
            Err(DecodeError::IntegerOutOfRange { field: "amount" })
        );
    }

    #[test]
    fn test_wrong_outer_constructor() {
        let data = PlutusData::Constr {
            tag: 1,
            fields: fields_of(&painting()),
        }
        .to_cbor();
        assert_eq!(
            decode(&data),
            Err(DecodeError::UnexpectedConstructor {
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn test_malformed_bytes() {
        assert!(matches!(decode(&[0xd8]), Err(DecodeError::Cbor(_))));
    }

    #[test]
    fn test_redeemers() {
        assert_eq!(encode_redeemer(RedeemerKind::Start), vec![0xd8, 0x79, 0x80]);
        assert_eq!(encode_redeemer(RedeemerKind::Bid), vec![0xd8, 0x7a, 0x80]);
        assert_eq!(encode_redeemer(RedeemerKind::Withdraw), vec![0xd8, 0x7b, 0x80]);
        assert_eq!(encode_redeemer(RedeemerKind::End), vec![0xd8, 0x7c, 0x80]);
        assert_eq!(
            decode_redeemer(&encode_redeemer(RedeemerKind::Withdraw)),
            Ok(RedeemerKind::Withdraw)
        );
        assert_eq!(
            decode_redeemer(&PlutusData::unit(9).to_cbor()),
            Err(DecodeError::UnknownRedeemerTag(9))
        );
    }

    fn credential_strategy() -> impl Strategy<Value = Credential> {
        any::<[u8; 28]>().prop_map(Credential)
    }

    fn state_strategy() -> impl Strategy<Value = AuctionState> {
        (
            credential_strategy(),
            proptest::collection::vec(any::<u8>(), 0..200),
            any::<u64>(),
            (0u64..4).prop_map(|tag| Status::from_tag(tag).unwrap()),
            credential_strategy(),
            credential_strategy(),
            any::<u64>(),
        )
            .prop_map(
                |(seller, object, deadline, status, bidder, bidder_stake, amount)| AuctionState {
                    seller,
                    object,
                    deadline,
                    status,
                    bidder,
                    bidder_stake,
                    amount,
                },
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            .. ProptestConfig::default()
        })]

        #[test]
        fn any_record_roundtrips(state in state_strategy()) {
            let bytes = encode(&state);
            prop_assert_eq!(decode(&bytes), Ok(state));
        }

        #[test]
        fn decode_never_panics_on_small_inputs(
            input in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let _ = decode(&input);
            let _ = decode_redeemer(&input);
        }
    }
}
