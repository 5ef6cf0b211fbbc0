//! # Proportional Arithmetic
//!
//! The vault's mint, redeem, and pricing formulas all reduce to one shape:
//! `a * b / d` with floor division. With 18-decimal shares the intermediate
//! product routinely exceeds `u128` (a few million whole tokens of assets
//! against `10^24`-scale supply is enough), so [`mul_div`] computes the
//! product at 256-bit width before dividing.
//!
//! No floating point anywhere. Rounding is always toward zero, which is the
//! direction that favors the vault's existing holders over the caller.

/// Computes `a * b / d` with a 256-bit intermediate product and floor
/// rounding.
///
/// Returns `None` if `d == 0` or if the quotient itself does not fit in a
/// `u128`. Callers translate `None` into their own overflow error -- the
/// vault never wraps monetary arithmetic.
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    // Fast path: the product fits in 128 bits.
    if let Some(product) = a.checked_mul(b) {
        return Some(product / d);
    }

    let (hi, lo) = widening_mul(a, b);
    // The quotient needs more than 128 bits exactly when hi >= d.
    if hi >= d {
        return None;
    }
    Some(div_256_by_128(hi, lo, d))
}

/// Full 256-bit product of two `u128` values as `(high, low)` limbs.
///
/// Schoolbook multiplication on 64-bit halves:
/// `a * b = hh<<128 + (lh + hl)<<64 + ll`.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = (1 << 64) - 1;

    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // Middle column: lh + hl + carry from ll. Each overflow of the u128
    // accumulator is worth 2^64 in the high limb.
    let (mid, c1) = lh.overflowing_add(hl);
    let (mid, c2) = mid.overflowing_add(ll >> 64);
    let mid_carry = (u128::from(c1) + u128::from(c2)) << 64;

    let lo = (mid << 64) | (ll & MASK);
    let hi = hh + (mid >> 64) + mid_carry;
    (hi, lo)
}

/// Divides the 256-bit value `(hi, lo)` by `d` using bitwise long division.
///
/// Precondition: `d != 0` and `hi < d`, so the quotient fits in 128 bits.
fn div_256_by_128(hi: u128, lo: u128, d: u128) -> u128 {
    let mut quotient: u128 = 0;
    let mut rem = hi;

    for i in (0..128).rev() {
        // rem = rem * 2 + next bit of lo. The true remainder can exceed
        // u128 by one bit, tracked in `carry`.
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1 << i;
        }
    }
    quotient
}
