//! Full-precision `a * b / c` for [`Amount`]s.
//!
//! Pool reserves and exchange-rate mantissas are both around `10^18`, so
//! their product does not fit in 128 bits even when the quotient does. The
//! product is formed in 256 bits and divided back down.

use crate::Amount;

/// `floor(a * b / denominator)`, or `None` if `denominator` is zero or the
/// quotient does not fit in an [`Amount`].
pub fn mul_div(a: Amount, b: Amount, denominator: Amount) -> Option<Amount> {
    if denominator == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / denominator);
    }

    let (hi, lo) = widening_mul(a, b);
    if hi >= denominator {
        return None;
    }

    // Restoring long division of the 256-bit product. `rem < denominator`
    // holds at the top of every iteration.
    let mut rem = hi;
    let mut quotient: Amount = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= denominator {
            rem = rem.wrapping_sub(denominator);
            quotient |= 1;
        }
    }
    Some(quotient)
}

/// 128 x 128 → 256-bit product as `(high, low)`.
fn widening_mul(a: Amount, b: Amount) -> (Amount, Amount) {
    const MASK: Amount = u64::MAX as Amount;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_match_plain_arithmetic() {
        assert_eq!(mul_div(10, 20, 3), Some(66));
        assert_eq!(mul_div(0, Amount::MAX, 1), Some(0));
    }

    #[test]
    fn zero_denominator_is_none() {
        assert_eq!(mul_div(1, 1, 0), None);
    }

    #[test]
    fn wide_product_divides_back() {
        let e18: Amount = 1_000_000_000_000_000_000;
        // (5e24 * 1e21) / 1e24 = 5e21, product is 5e45 > u128::MAX.
        assert_eq!(
            mul_div(5_000_000 * e18, 1_000 * e18, 1_000_000 * e18),
            Some(5_000 * e18)
        );
    }

    #[test]
    fn max_times_max_over_max() {
        assert_eq!(mul_div(Amount::MAX, Amount::MAX, Amount::MAX), Some(Amount::MAX));
    }

    #[test]
    fn quotient_overflow_is_none() {
        assert_eq!(mul_div(Amount::MAX, 2, 1), None);
    }

    #[test]
    fn floors_wide_quotients() {
        let big: Amount = 1 << 127;
        assert_eq!(mul_div(big, 3, 2), Some(3 * (1 << 126)));
        // (3 * 2^127 - 3) / 2 = 3 * 2^126 - 1.5, floored.
        assert_eq!(mul_div(big - 1, 3, 2), Some(3 * (1 << 126) - 2));
    }
}
