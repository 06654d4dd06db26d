//! Integer arithmetic shared by the farm, the venue and the enricher.
//!
//! Amounts are `u128` base units. Products of two amounts can exceed 128
//! bits, so every multiply-then-divide goes through a 256-bit intermediate
//! and is narrowed back with an explicit overflow check. No floating point.

use primitive_types::U256;

/// Token amount in base units.
pub type Amount = u128;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Raised when a result does not fit back into 128 bits, or a checked
/// operation overflows. Carries the name of the quantity being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("arithmetic overflow while computing {0}")]
pub struct Overflow(pub &'static str);

fn narrow(value: U256, what: &'static str) -> Result<u128, Overflow> {
    if value > U256::from(u128::MAX) {
        return Err(Overflow(what));
    }
    Ok(value.low_u128())
}

/// `n * mul / div`, rounded down. Division by zero yields zero.
pub fn mul_div(n: u128, mul: u128, div: u128, what: &'static str) -> Result<u128, Overflow> {
    if div == 0 {
        return Ok(0);
    }
    let product = U256::from(n) * U256::from(mul);
    narrow(product / U256::from(div), what)
}

/// `a * b * c / div`, rounded down, with a single 256-bit product.
pub fn mul3_div(
    a: u128,
    b: u128,
    c: u128,
    div: u128,
    what: &'static str,
) -> Result<u128, Overflow> {
    if div == 0 {
        return Ok(0);
    }
    let product = (U256::from(a) * U256::from(b))
        .checked_mul(U256::from(c))
        .ok_or(Overflow(what))?;
    narrow(product / U256::from(div), what)
}

/// Integer square root of `a * b`, rounded down.
pub fn sqrt_product(a: u128, b: u128, what: &'static str) -> Result<u128, Overflow> {
    let product = U256::from(a) * U256::from(b);
    narrow(product.integer_sqrt(), what)
}

/// Checked addition tagged with the quantity name.
#[inline]
pub fn add(a: u128, b: u128, what: &'static str) -> Result<u128, Overflow> {
    a.checked_add(b).ok_or(Overflow(what))
}

/// Checked subtraction tagged with the quantity name.
#[inline]
pub fn sub(a: u128, b: u128, what: &'static str) -> Result<u128, Overflow> {
    a.checked_sub(b).ok_or(Overflow(what))
}
