//! Conversion between display units and the ledger's smallest unit.

use auction_types::LOVELACE_PER_ADA;

use crate::error::Rejection;

/// Decimal places of the display unit.
const DECIMALS: usize = 6;

/// Convert a display amount such as `"15.5"` to smallest units.
///
/// The result must be a positive whole number of smallest units.
pub fn to_smallest_unit(display: &str) -> Result<u64, Rejection> {
    let s = display.trim();
    if s.starts_with('-') {
        return Err(malformed(display, "must be positive"));
    }

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(malformed(display, "not a number"));
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(malformed(display, "not a number"));
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() > DECIMALS {
        return Err(malformed(display, "finer than the smallest unit"));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| malformed(display, "out of range"))?
    };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = DECIMALS)
            .parse()
            .map_err(|_| malformed(display, "not a number"))?
    };

    let total = whole
        .checked_mul(LOVELACE_PER_ADA)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| malformed(display, "out of range"))?;

    if total == 0 {
        return Err(malformed(display, "must be positive"));
    }
    Ok(total)
}

/// Render smallest units in display units, without trailing zeros.
pub fn to_display(amount: u64) -> String {
    let whole = amount / LOVELACE_PER_ADA;
    let frac = amount % LOVELACE_PER_ADA;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = DECIMALS);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

fn malformed(input: &str, reason: &str) -> Rejection {
    Rejection::MalformedAmount(format!("{:?} {}", input, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_and_fractional_amounts() {
        assert_eq!(to_smallest_unit("10"), Ok(10_000_000));
        assert_eq!(to_smallest_unit("15.5"), Ok(15_500_000));
        assert_eq!(to_smallest_unit("0.000001"), Ok(1));
        assert_eq!(to_smallest_unit(" 2.50 "), Ok(2_500_000));
        assert_eq!(to_smallest_unit(".5"), Ok(500_000));
        assert_eq!(to_smallest_unit("1.2300000"), Ok(1_230_000));
    }

    #[test]
    fn test_rejected_amounts() {
        for input in ["0", "0.0", "-1", "", ".", "abc", "1.0000001", "1e6", "1.2.3"] {
            assert!(
                matches!(to_smallest_unit(input), Err(Rejection::MalformedAmount(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            to_smallest_unit("18446744073709551615"),
            Err(Rejection::MalformedAmount(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(to_display(10_000_000), "10");
        assert_eq!(to_display(15_500_000), "15.5");
        assert_eq!(to_display(1), "0.000001");
    }
}
