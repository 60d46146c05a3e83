//! Structured ledger data and its CBOR wire form.
//!
//! Constructors are encoded with the compact tags `121..=127` (indices 0-6),
//! `1280..=1400` (indices 7-127) and the general form `102 [index, fields]`.
//! Non-empty lists use indefinite-length arrays and byte strings longer than
//! 64 bytes are split into 64-byte chunks, matching what wallet tooling emits.
//! The decoder accepts both definite and indefinite forms.

use crate::error::CborError;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;

const INDEFINITE: u8 = 31;
const BREAK: u8 = 0xff;

const TAG_POS_BIGNUM: u64 = 2;
const TAG_NEG_BIGNUM: u64 = 3;
const TAG_CONSTR_GENERAL: u64 = 102;
const TAG_CONSTR_SMALL: u64 = 121;
const TAG_CONSTR_LARGE: u64 = 1280;

const BYTES_CHUNK: usize = 64;
const MAX_DEPTH: usize = 64;

/// A structured data value as stored in datums and redeemers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlutusData {
    Constr { tag: u64, fields: Vec<PlutusData> },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Integer(i128),
    Bytes(Vec<u8>),
}

impl PlutusData {
    /// Nullary constructor, used for enum-like values.
    pub fn unit(tag: u64) -> Self {
        PlutusData::Constr {
            tag,
            fields: Vec::new(),
        }
    }

    /// Serialize to CBOR.
    pub fn to_cbor(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    /// Parse a single CBOR item, rejecting trailing bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, CborError> {
        let mut reader = Reader { bytes, pos: 0 };
        let data = reader.item(0)?;
        if reader.pos != bytes.len() {
            return Err(CborError::TrailingBytes(bytes.len() - reader.pos));
        }
        Ok(data)
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            PlutusData::Constr { tag, fields } => {
                match *tag {
                    0..=6 => write_head(out, MAJOR_TAG, TAG_CONSTR_SMALL + tag),
                    7..=127 => write_head(out, MAJOR_TAG, TAG_CONSTR_LARGE + tag - 7),
                    _ => {
                        write_head(out, MAJOR_TAG, TAG_CONSTR_GENERAL);
                        write_head(out, MAJOR_ARRAY, 2);
                        write_head(out, MAJOR_UNSIGNED, *tag);
                    }
                }
                write_list(out, fields);
            }
            PlutusData::Map(entries) => {
                write_head(out, MAJOR_MAP, entries.len() as u64);
                for (k, v) in entries {
                    k.write(out);
                    v.write(out);
                }
            }
            PlutusData::List(items) => write_list(out, items),
            PlutusData::Integer(n) => write_integer(out, *n),
            PlutusData::Bytes(bytes) => write_bytes(out, bytes),
        }
    }
}

fn write_head(out: &mut Vec<u8>, major: u8, value: u64) {
    let m = major << 5;
    if value < 24 {
        out.push(m | value as u8);
    } else if value <= u8::MAX as u64 {
        out.push(m | 24);
        out.push(value as u8);
    } else if value <= u16::MAX as u64 {
        out.push(m | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u32::MAX as u64 {
        out.push(m | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(m | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn write_list(out: &mut Vec<u8>, items: &[PlutusData]) {
    if items.is_empty() {
        write_head(out, MAJOR_ARRAY, 0);
        return;
    }
    out.push((MAJOR_ARRAY << 5) | INDEFINITE);
    for item in items {
        item.write(out);
    }
    out.push(BREAK);
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() <= BYTES_CHUNK {
        write_head(out, MAJOR_BYTES, bytes.len() as u64);
        out.extend_from_slice(bytes);
        return;
    }
    out.push((MAJOR_BYTES << 5) | INDEFINITE);
    for chunk in bytes.chunks(BYTES_CHUNK) {
        write_head(out, MAJOR_BYTES, chunk.len() as u64);
        out.extend_from_slice(chunk);
    }
    out.push(BREAK);
}

fn write_integer(out: &mut Vec<u8>, n: i128) {
    if n >= 0 {
        match u64::try_from(n) {
            Ok(v) => write_head(out, MAJOR_UNSIGNED, v),
            Err(_) => write_bignum(out, TAG_POS_BIGNUM, n as u128),
        }
    } else {
        // -1 - n is non-negative for every negative i128
        let magnitude = (-1 - n) as u128;
        match u64::try_from(magnitude) {
            Ok(v) => write_head(out, MAJOR_NEGATIVE, v),
            Err(_) => write_bignum(out, TAG_NEG_BIGNUM, magnitude),
        }
    }
}

fn write_bignum(out: &mut Vec<u8>, tag: u64, magnitude: u128) {
    write_head(out, MAJOR_TAG, tag);
    let be = magnitude.to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len());
    write_bytes(out, &be[first..]);
}

/// Argument of an item head: a value or the indefinite marker.
enum Arg {
    Value(u64),
    Indefinite,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, CborError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(CborError::UnexpectedEof(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, len: u64) -> Result<&'a [u8], CborError> {
        let remaining = (self.bytes.len() - self.pos) as u64;
        if len > remaining {
            return Err(CborError::LengthOverflow(len));
        }
        let start = self.pos;
        self.pos += len as usize;
        Ok(&self.bytes[start..self.pos])
    }

    fn peek_break(&self) -> Result<bool, CborError> {
        self.bytes
            .get(self.pos)
            .map(|b| *b == BREAK)
            .ok_or(CborError::UnexpectedEof(self.pos))
    }

    fn head(&mut self) -> Result<(u8, Arg), CborError> {
        let initial = self.byte()?;
        let major = initial >> 5;
        let info = initial & 0x1f;
        let arg = match info {
            0..=23 => Arg::Value(info as u64),
            24 => Arg::Value(self.byte()? as u64),
            25 => Arg::Value(u16::from_be_bytes(self.fixed::<2>()?) as u64),
            26 => Arg::Value(u32::from_be_bytes(self.fixed::<4>()?) as u64),
            27 => Arg::Value(u64::from_be_bytes(self.fixed::<8>()?)),
            INDEFINITE if matches!(major, MAJOR_BYTES | MAJOR_ARRAY | MAJOR_MAP) => Arg::Indefinite,
            _ => return Err(CborError::InvalidAdditionalInfo(info, major)),
        };
        Ok((major, arg))
    }

    fn fixed<const N: usize>(&mut self) -> Result<[u8; N], CborError> {
        let slice = self.take(N as u64)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn item(&mut self, depth: usize) -> Result<PlutusData, CborError> {
        if depth > MAX_DEPTH {
            return Err(CborError::NestingTooDeep(MAX_DEPTH));
        }
        let (major, arg) = self.head()?;
        match (major, arg) {
            (MAJOR_UNSIGNED, Arg::Value(v)) => Ok(PlutusData::Integer(v as i128)),
            (MAJOR_NEGATIVE, Arg::Value(v)) => Ok(PlutusData::Integer(-1 - v as i128)),
            (MAJOR_BYTES, arg) => Ok(PlutusData::Bytes(self.bytes_body(arg)?)),
            (MAJOR_ARRAY, arg) => Ok(PlutusData::List(self.list_body(arg, depth)?)),
            (MAJOR_MAP, arg) => Ok(PlutusData::Map(self.map_body(arg, depth)?)),
            (MAJOR_TAG, Arg::Value(tag)) => self.tagged(tag, depth),
            (major, _) => Err(CborError::UnsupportedMajorType(major)),
        }
    }

    fn bytes_body(&mut self, arg: Arg) -> Result<Vec<u8>, CborError> {
        match arg {
            Arg::Value(len) => Ok(self.take(len)?.to_vec()),
            Arg::Indefinite => {
                let mut out = Vec::new();
                while !self.peek_break()? {
                    match self.head()? {
                        (MAJOR_BYTES, Arg::Value(len)) => out.extend_from_slice(self.take(len)?),
                        _ => return Err(CborError::InvalidChunk),
                    }
                }
                self.pos += 1;
                Ok(out)
            }
        }
    }

    fn list_body(&mut self, arg: Arg, depth: usize) -> Result<Vec<PlutusData>, CborError> {
        let mut items = Vec::new();
        match arg {
            Arg::Value(len) => {
                // Every item takes at least one byte
                if len > (self.bytes.len() - self.pos) as u64 {
                    return Err(CborError::LengthOverflow(len));
                }
                for _ in 0..len {
                    items.push(self.item(depth + 1)?);
                }
            }
            Arg::Indefinite => {
                while !self.peek_break()? {
                    items.push(self.item(depth + 1)?);
                }
                self.pos += 1;
            }
        }
        Ok(items)
    }

    fn map_body(
        &mut self,
        arg: Arg,
        depth: usize,
    ) -> Result<Vec<(PlutusData, PlutusData)>, CborError> {
        let mut entries = Vec::new();
        match arg {
            Arg::Value(len) => {
                if len > (self.bytes.len() - self.pos) as u64 {
                    return Err(CborError::LengthOverflow(len));
                }
                for _ in 0..len {
                    let k = self.item(depth + 1)?;
                    let v = self.item(depth + 1)?;
                    entries.push((k, v));
                }
            }
            Arg::Indefinite => {
                while !self.peek_break()? {
                    let k = self.item(depth + 1)?;
                    let v = self.item(depth + 1)?;
                    entries.push((k, v));
                }
                self.pos += 1;
            }
        }
        Ok(entries)
    }

    fn tagged(&mut self, tag: u64, depth: usize) -> Result<PlutusData, CborError> {
        match tag {
            121..=127 => self.constr(tag - TAG_CONSTR_SMALL, depth),
            1280..=1400 => self.constr(tag - TAG_CONSTR_LARGE + 7, depth),
            TAG_CONSTR_GENERAL => {
                let pair = self.item(depth + 1)?;
                match pair {
                    PlutusData::List(mut items) if items.len() == 2 => {
                        let fields = items.pop();
                        let index = items.pop();
                        match (index, fields) {
                            (Some(PlutusData::Integer(i)), Some(PlutusData::List(fields)))
                                if i >= 0 =>
                            {
                                let tag = u64::try_from(i).map_err(|_| CborError::IntegerOverflow)?;
                                Ok(PlutusData::Constr { tag, fields })
                            }
                            _ => Err(CborError::ConstrFieldsNotList),
                        }
                    }
                    _ => Err(CborError::ConstrFieldsNotList),
                }
            }
            TAG_POS_BIGNUM | TAG_NEG_BIGNUM => {
                let (major, arg) = self.head()?;
                if major != MAJOR_BYTES {
                    return Err(CborError::UnsupportedTag(tag));
                }
                let magnitude = self.bytes_body(arg)?;
                let significant: Vec<u8> =
                    magnitude.iter().copied().skip_while(|b| *b == 0).collect();
                if significant.len() > 16 {
                    return Err(CborError::IntegerOverflow);
                }
                let mut be = [0u8; 16];
                be[16 - significant.len()..].copy_from_slice(&significant);
                let value =
                    i128::try_from(u128::from_be_bytes(be)).map_err(|_| CborError::IntegerOverflow)?;
                Ok(PlutusData::Integer(if tag == TAG_POS_BIGNUM {
                    value
                } else {
                    -1 - value
                }))
            }
            other => Err(CborError::UnsupportedTag(other)),
        }
    }

    fn constr(&mut self, tag: u64, depth: usize) -> Result<PlutusData, CborError> {
        match self.item(depth + 1)? {
            PlutusData::List(fields) => Ok(PlutusData::Constr { tag, fields }),
            _ => Err(CborError::ConstrFieldsNotList),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_nullary_constructor_encoding() {
        assert_eq!(PlutusData::unit(0).to_cbor(), vec![0xd8, 0x79, 0x80]);
        assert_eq!(PlutusData::unit(3).to_cbor(), vec![0xd8, 0x7c, 0x80]);
        assert_eq!(PlutusData::unit(7).to_cbor(), vec![0xd9, 0x05, 0x00, 0x80]);
    }

    #[test]
    fn test_integer_encoding() {
        assert_eq!(PlutusData::Integer(0).to_cbor(), vec![0x00]);
        assert_eq!(PlutusData::Integer(-1).to_cbor(), vec![0x20]);
        assert_eq!(
            PlutusData::Integer(10_000_000).to_cbor(),
            vec![0x1a, 0x00, 0x98, 0x96, 0x80]
        );
    }

    #[test]
    fn test_big_integer_roundtrip() {
        let big = PlutusData::Integer(u64::MAX as i128 + 5);
        let encoded = big.to_cbor();
        assert_eq!(encoded[0], 0xc2);
        assert_eq!(PlutusData::from_cbor(&encoded).unwrap(), big);

        let negative = PlutusData::Integer(-(u64::MAX as i128) - 10);
        assert_eq!(PlutusData::from_cbor(&negative.to_cbor()).unwrap(), negative);
    }

    #[test]
    fn test_long_bytes_are_chunked() {
        let data = PlutusData::Bytes(vec![0xab; 100]);
        let encoded = data.to_cbor();
        assert_eq!(encoded[0], 0x5f);
        assert_eq!(*encoded.last().unwrap(), 0xff);
        assert_eq!(PlutusData::from_cbor(&encoded).unwrap(), data);
    }

    #[test]
    fn test_definite_and_indefinite_lists_decode_alike() {
        // Constr 0 [1, 2] with definite and indefinite arrays
        let definite = [0xd8, 0x79, 0x82, 0x01, 0x02];
        let indefinite = [0xd8, 0x79, 0x9f, 0x01, 0x02, 0xff];
        let expected = PlutusData::Constr {
            tag: 0,
            fields: vec![PlutusData::Integer(1), PlutusData::Integer(2)],
        };
        assert_eq!(PlutusData::from_cbor(&definite).unwrap(), expected);
        assert_eq!(PlutusData::from_cbor(&indefinite).unwrap(), expected);
        assert_eq!(expected.to_cbor(), indefinite.to_vec());
    }

    #[test]
    fn test_general_constructor_form() {
        let data = PlutusData::Constr {
            tag: 200,
            fields: vec![PlutusData::Bytes(vec![1, 2])],
        };
        let encoded = data.to_cbor();
        assert_eq!(&encoded[..2], &[0xd8, 0x66]);
        assert_eq!(PlutusData::from_cbor(&encoded).unwrap(), data);
    }

    #[test]
    fn test_map_roundtrip() {
        let data = PlutusData::Map(vec![(
            PlutusData::Bytes(b"k".to_vec()),
            PlutusData::List(vec![PlutusData::Integer(5)]),
        )]);
        assert_eq!(PlutusData::from_cbor(&data.to_cbor()).unwrap(), data);
    }

    #[test]
    fn test_truncated_input() {
        let encoded = PlutusData::Bytes(vec![1, 2, 3, 4]).to_cbor();
        let result = PlutusData::from_cbor(&encoded[..3]);
        assert!(matches!(result, Err(CborError::LengthOverflow(4))));

        let result = PlutusData::from_cbor(&[0xd8, 0x79, 0x9f, 0x01]);
        assert!(matches!(result, Err(CborError::UnexpectedEof(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let result = PlutusData::from_cbor(&[0x01, 0x02]);
        assert!(matches!(result, Err(CborError::TrailingBytes(1))));
    }

    #[test]
    fn test_unsupported_items_rejected() {
        // Text string
        assert!(matches!(
            PlutusData::from_cbor(&[0x61, 0x61]),
            Err(CborError::UnsupportedMajorType(3))
        ));
        // Unknown tag
        assert!(matches!(
            PlutusData::from_cbor(&[0xc1, 0x00]),
            Err(CborError::UnsupportedTag(1))
        ));
        // Constructor whose body is not a list
        assert!(matches!(
            PlutusData::from_cbor(&[0xd8, 0x79, 0x01]),
            Err(CborError::ConstrFieldsNotList)
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let mut encoded = vec![0x81; MAX_DEPTH + 2];
        encoded.push(0x00);
        assert!(matches!(
            PlutusData::from_cbor(&encoded),
            Err(CborError::NestingTooDeep(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            .. ProptestConfig::default()
        })]

        #[test]
        fn from_cbor_never_panics_on_corrupted_records(
            position in any::<prop::sample::Index>(),
            byte in any::<u8>(),
            cut in any::<prop::sample::Index>(),
        ) {
            let record = PlutusData::Constr {
                tag: 0,
                fields: vec![
                    PlutusData::Bytes(vec![7u8; 28]),
                    PlutusData::Bytes(vec![b'x'; 90]),
                    PlutusData::Integer(1_735_689_600_000),
                    PlutusData::unit(1),
                    PlutusData::Integer(-(1i128 << 100)),
                    PlutusData::Map(vec![(PlutusData::Integer(1), PlutusData::List(vec![]))]),
                ],
            };
            let mut bytes = record.to_cbor();
            let at = position.index(bytes.len());
            bytes[at] = byte;
            let _ = PlutusData::from_cbor(&bytes);
            let _ = PlutusData::from_cbor(&bytes[..cut.index(bytes.len())]);
        }
    }
}
