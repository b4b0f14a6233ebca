// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Exact decimal arithmetic for constant folding.
//!
//! Checked expressions are folded with arbitrary precision: a value is a
//! `BigInt` mantissa scaled by a power of ten. No floating point is involved
//! anywhere, so folding a constant produces exactly the value the generated
//! code would compute.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, Zero};

/// An exact decimal number: `mantissa / 10^scale`.
#[derive(Clone, Debug)]
pub struct Decimal {
    mantissa: BigInt,
    scale: u32,
}

/// Raised when a decimal literal cannot be parsed.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseDecimalError {
    #[error("empty decimal literal")]
    Empty,
    #[error("invalid character in decimal literal")]
    InvalidDigit,
    #[error("exponent out of range")]
    ExponentRange,
}

/// 10^exp computed by square-and-multiply.
pub fn pow10(exp: u32) -> BigInt {
    if exp == 0 {
        return BigInt::one();
    }

    let mut result = BigInt::one();
    let mut base = BigInt::from(10u8);
    let mut e = exp;

    while e > 0 {
        if e & 1 == 1 {
            result *= &base;
        }
        if e > 1 {
            base = &base * &base;
        }
        e >>= 1;
    }

    result
}

impl Decimal {
    pub fn zero() -> Self {
        Self {
            mantissa: BigInt::zero(),
            scale: 0,
        }
    }

    pub fn from_parts(mantissa: BigInt, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    /// Strip trailing fractional zeros so that equal values share one
    /// representation. `1.500` becomes `1.5`, `2.00` becomes `2`.
    pub fn normalize(&mut self) {
        let ten = BigInt::from(10u8);
        while self.scale > 0 && (&self.mantissa % &ten).is_zero() {
            self.mantissa = &self.mantissa / &ten;
            self.scale -= 1;
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Mantissa rescaled to exactly `scale` fractional digits. Digits beyond
    /// the current scale are zero-filled; callers must not request a smaller
    /// scale than the current one.
    fn mantissa_at_scale(&self, scale: u32) -> BigInt {
        debug_assert!(scale >= self.scale);
        &self.mantissa * pow10(scale - self.scale)
    }

    fn aligned(&self, other: &Self) -> (BigInt, BigInt, u32) {
        let scale = self.scale.max(other.scale);
        (
            self.mantissa_at_scale(scale),
            other.mantissa_at_scale(scale),
            scale,
        )
    }

    pub fn add(&self, rhs: &Self) -> Self {
        let (a, b, scale) = self.aligned(rhs);
        Self::from_parts(a + b, scale).normalized()
    }

    pub fn sub(&self, rhs: &Self) -> Self {
        let (a, b, scale) = self.aligned(rhs);
        Self::from_parts(a - b, scale).normalized()
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        Self::from_parts(&self.mantissa * &rhs.mantissa, self.scale + rhs.scale).normalized()
    }

    pub fn neg(&self) -> Self {
        Self::from_parts(-&self.mantissa, self.scale)
    }

    /// Quotient truncated toward zero at `max_scale` fractional digits.
    /// The divisor must be non-zero.
    pub fn div_trunc(&self, rhs: &Self, max_scale: u32) -> Self {
        debug_assert!(!rhs.is_zero());
        let num = &self.mantissa * pow10(rhs.scale + max_scale);
        let den = &rhs.mantissa * pow10(self.scale);
        // BigInt division truncates toward zero.
        Self::from_parts(num / den, max_scale).normalized()
    }

    /// Remainder of truncating integer division: `self - rhs * trunc(self / rhs)`.
    /// Keeps the fractional digits of the operands; the divisor must be
    /// non-zero.
    pub fn rem_trunc(&self, rhs: &Self) -> Self {
        let q = self.div_trunc(rhs, 0);
        self.sub(&rhs.mul(&q))
    }

    /// Drop fractional digits beyond `scale`, truncating toward zero.
    pub fn trunc(&self, scale: u32) -> Self {
        if self.scale <= scale {
            return self.clone();
        }
        let f = pow10(self.scale - scale);
        Self::from_parts(&self.mantissa / f, scale)
    }

    /// Round half away from zero to `scale` fractional digits.
    pub fn round(&self, scale: u32) -> Self {
        if self.scale <= scale {
            return self.clone();
        }
        let f = pow10(self.scale - scale);
        let q = &self.mantissa / &f;
        let r = &self.mantissa - &q * &f;
        let mut q = q;
        if r.magnitude() << 1u32 >= *f.magnitude() {
            if self.mantissa.is_negative() {
                q -= 1;
            } else {
                q += 1;
            }
        }
        Self::from_parts(q, scale)
    }

    pub fn is_integer(&self) -> bool {
        *self == self.trunc(0)
    }

    /// Number of digits in the integer part (at least 1, counting the zero
    /// in values below one).
    pub fn integer_digits(&self) -> usize {
        self.trunc(0).mantissa.magnitude().to_string().len()
    }

    /// Number of fractional digits after normalization.
    pub fn fractional_digits(&self) -> u32 {
        self.clone().normalized().scale
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, _) = self.aligned(other);
        a.cmp(&b)
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::from_parts(BigInt::from(value), 0)
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Self::from_parts(BigInt::from(value), 0)
    }
}

impl From<i32> for Decimal {
    fn from(value: i32) -> Self {
        Self::from_parts(BigInt::from(value), 0)
    }
}

impl From<BigInt> for Decimal {
    fn from(value: BigInt) -> Self {
        Self::from_parts(value, 0)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseDecimalError::Empty);
        }

        let (sign, rest) = if let Some(rest) = s.strip_prefix('-') {
            (Sign::Minus, rest)
        } else if let Some(rest) = s.strip_prefix('+') {
            (Sign::Plus, rest)
        } else {
            (Sign::Plus, s)
        };

        let (mantissa_part, exponent) = match rest.find(['e', 'E']) {
            Some(idx) => {
                let exp = rest[idx + 1..]
                    .parse::<i64>()
                    .map_err(|_| ParseDecimalError::InvalidDigit)?;
                (&rest[..idx], exp)
            }
            None => (rest, 0),
        };

        let mut digits = String::with_capacity(mantissa_part.len());
        let mut fraction_len: i64 = 0;
        let mut seen_dot = false;
        let mut seen_digit = false;
        for ch in mantissa_part.chars() {
            match ch {
                '.' => {
                    if seen_dot {
                        return Err(ParseDecimalError::InvalidDigit);
                    }
                    seen_dot = true;
                }
                '0'..='9' => {
                    digits.push(ch);
                    seen_digit = true;
                    if seen_dot {
                        fraction_len += 1;
                    }
                }
                _ => return Err(ParseDecimalError::InvalidDigit),
            }
        }
        if !seen_digit {
            return Err(ParseDecimalError::Empty);
        }

        let mut mantissa =
            BigInt::parse_bytes(digits.as_bytes(), 10).ok_or(ParseDecimalError::Empty)?;
        if sign == Sign::Minus {
            mantissa = -mantissa;
        }

        let scale = fraction_len
            .checked_sub(exponent)
            .ok_or(ParseDecimalError::ExponentRange)?;
        if scale < 0 {
            let shift = u32::try_from(-scale).map_err(|_| ParseDecimalError::ExponentRange)?;
            mantissa *= pow10(shift);
            Ok(Self::from_parts(mantissa, 0))
        } else {
            let scale = u32::try_from(scale).map_err(|_| ParseDecimalError::ExponentRange)?;
            Ok(Self::from_parts(mantissa, scale))
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let digits = self.mantissa.magnitude().to_string();
        let scale = self.scale as usize;
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        if digits.len() <= scale {
            write!(f, "{}0.{}{}", sign, "0".repeat(scale - digits.len()), digits)
        } else {
            let split = digits.len() - scale;
            write!(f, "{}{}.{}", sign, &digits[..split], &digits[split..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(dec("0").to_string(), "0");
        assert_eq!(dec("-12.340").to_string(), "-12.340");
        assert_eq!(dec("-12.340").normalized().to_string(), "-12.34");
        assert_eq!(dec(".5").to_string(), "0.5");
        assert_eq!(dec("1e3").to_string(), "1000");
        assert_eq!(dec("1.5e2").to_string(), "150");
        assert_eq!(dec("25e-2").to_string(), "0.25");
        assert!("".parse::<Decimal>().is_err());
        assert!("1.2.3".parse::<Decimal>().is_err());
        assert!("abc".parse::<Decimal>().is_err());
    }

    #[test]
    fn value_equality_ignores_scale() {
        assert_eq!(dec("1.50"), dec("1.5"));
        assert_eq!(dec("2.00"), dec("2"));
        assert!(dec("1.49") < dec("1.5"));
        assert!(dec("-3") < dec("2"));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(dec("1.5").add(&dec("2.25")), dec("3.75"));
        assert_eq!(dec("1").sub(&dec("2.5")), dec("-1.5"));
        assert_eq!(dec("1.5").mul(&dec("-2")), dec("-3"));
        assert_eq!(dec("10").neg(), dec("-10"));
    }

    #[test]
    fn division_truncates() {
        assert_eq!(dec("7").div_trunc(&dec("2"), 2), dec("3.5"));
        assert_eq!(dec("1").div_trunc(&dec("3"), 4), dec("0.3333"));
        assert_eq!(dec("-1").div_trunc(&dec("3"), 4), dec("-0.3333"));
        assert_eq!(dec("7").div_trunc(&dec("2"), 0), dec("3"));
    }

    #[test]
    fn remainder_of_integer_quotient() {
        assert_eq!(dec("7").rem_trunc(&dec("2")), dec("1"));
        assert_eq!(dec("7.5").rem_trunc(&dec("2")), dec("1.5"));
        assert_eq!(dec("-7").rem_trunc(&dec("2")), dec("-1"));
    }

    #[test]
    fn rounding_half_away_from_zero() {
        assert_eq!(dec("1.25").round(1), dec("1.3"));
        assert_eq!(dec("-1.25").round(1), dec("-1.3"));
        assert_eq!(dec("1.24").round(1), dec("1.2"));
        assert_eq!(dec("1.2").round(3), dec("1.2"));
    }

    #[test]
    fn integer_predicates() {
        assert!(dec("42").is_integer());
        assert!(dec("42.000").is_integer());
        assert!(!dec("42.5").is_integer());
        assert_eq!(dec("1024.25").integer_digits(), 4);
        assert_eq!(dec("0.5").integer_digits(), 1);
        assert_eq!(dec("1.500").fractional_digits(), 1);
    }

    #[test]
    fn pow10_matches_naive() {
        let mut expected = BigInt::one();
        for e in 0..40u32 {
            assert_eq!(pow10(e), expected);
            expected *= 10u8;
        }
    }
}
