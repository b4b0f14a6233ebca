// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Column data types and their 16-bit wire encoding.
//!
//! A data type is a `(major, minor)` pair packed into a `u16`. The major
//! picks the category; the minor carries the size parameter. Fixed-point
//! categories burn the width into the major (32 consecutive values each) and
//! keep the number of fractional digits in the minor.

use core::fmt;

use num_bigint::{BigInt, Sign};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::decimal::{pow10, Decimal};

/// Major category of a data type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Major(pub u8);

impl Major {
    pub const NULL: Major = Major(0x01);
    pub const BOOL: Major = Major(0x02);
    pub const ADDRESS: Major = Major(0x03);
    pub const INT: Major = Major(0x04);
    pub const UINT: Major = Major(0x05);
    pub const FIXED_BYTES: Major = Major(0x06);
    pub const DYNAMIC_BYTES: Major = Major(0x07);
    /// Base of the signed fixed-point block. `fixed{8(n+1)}xM` lives at
    /// `FIXED.0 + n`.
    pub const FIXED: Major = Major(0x10);
    /// Base of the unsigned fixed-point block.
    pub const UFIXED: Major = Major(0x30);

    pub fn is_fixed(self) -> bool {
        self.0 >= Self::FIXED.0 && self.0 < Self::FIXED.0 + 0x20
    }

    pub fn is_ufixed(self) -> bool {
        self.0 >= Self::UFIXED.0 && self.0 < Self::UFIXED.0 + 0x20
    }

    /// The fixed-point major for a width of `bytes` bytes, from this block's
    /// base. Valid on `FIXED` and `UFIXED` with `1 <= bytes <= 32`.
    pub fn with_width(self, bytes: u8) -> Major {
        debug_assert!(self == Self::FIXED || self == Self::UFIXED);
        debug_assert!((1..=32).contains(&bytes));
        Major(self.0 + bytes - 1)
    }

    /// Collapse a fixed-point major to its block base; other majors are
    /// returned unchanged.
    pub fn base(self) -> Major {
        if self.is_fixed() {
            Self::FIXED
        } else if self.is_ufixed() {
            Self::UFIXED
        } else {
            self
        }
    }
}

/// A packed column data type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataType(u16);

impl DataType {
    /// Sentinel: the type has not been determined yet.
    pub const PENDING: DataType = DataType(0xffff);
    /// Sentinel: type checking of the node already failed.
    pub const BAD: DataType = DataType(0xfffe);

    pub const NULL: DataType = DataType::compose(Major::NULL, 0);
    pub const BOOL: DataType = DataType::compose(Major::BOOL, 0);
    pub const ADDRESS: DataType = DataType::compose(Major::ADDRESS, 0);
    pub const INT256: DataType = DataType::compose(Major::INT, 31);
    pub const UINT256: DataType = DataType::compose(Major::UINT, 31);
    /// Default type of a fractional literal: 128 bits, 18 fractional digits.
    pub const FIXED128X18: DataType = DataType(((Major::FIXED.0 as u16 + 15) << 8) | 18);
    pub const UFIXED128X18: DataType = DataType(((Major::UFIXED.0 as u16 + 15) << 8) | 18);
    /// Dynamically-sized bytes.
    pub const BYTES: DataType = DataType::compose(Major::DYNAMIC_BYTES, 0);
    /// One-byte fixed bytes, the type of a LIKE escape byte.
    pub const BYTES1: DataType = DataType::compose(Major::FIXED_BYTES, 0);

    pub const fn compose(major: Major, minor: u8) -> DataType {
        DataType(((major.0 as u16) << 8) | minor as u16)
    }

    pub const fn decompose(self) -> (Major, u8) {
        (Major((self.0 >> 8) as u8), self.0 as u8)
    }

    pub const fn major(self) -> Major {
        Major((self.0 >> 8) as u8)
    }

    pub const fn minor(self) -> u8 {
        self.0 as u8
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub fn pending(self) -> bool {
        self == Self::PENDING
    }

    /// The fixed-size bytes type of the given length in `1..=32`.
    pub fn fixed_bytes(len: u8) -> DataType {
        debug_assert!((1..=32).contains(&len));
        DataType::compose(Major::FIXED_BYTES, len - 1)
    }

    /// The signed or unsigned integer type of the given width in bytes.
    pub fn integer(signed: bool, bytes: u8) -> DataType {
        debug_assert!((1..=32).contains(&bytes));
        let major = if signed { Major::INT } else { Major::UINT };
        DataType::compose(major, bytes - 1)
    }

    /// Storage size in bytes, `None` for dynamically-sized and sentinel
    /// types.
    pub fn size(self) -> Option<usize> {
        let (major, minor) = self.decompose();
        match major {
            Major::BOOL => Some(1),
            Major::ADDRESS => Some(20),
            Major::INT | Major::UINT | Major::FIXED_BYTES => Some(minor as usize + 1),
            m if m.is_fixed() => Some((m.0 - Major::FIXED.0) as usize + 1),
            m if m.is_ufixed() => Some((m.0 - Major::UFIXED.0) as usize + 1),
            _ => None,
        }
    }

    /// Width in bytes and fractional digits for the numeric categories.
    fn numeric_layout(self) -> Option<(u32, u32, bool)> {
        let (major, minor) = self.decompose();
        match major {
            Major::INT => Some((minor as u32 + 1, 0, true)),
            Major::UINT => Some((minor as u32 + 1, 0, false)),
            Major::ADDRESS => Some((20, 0, false)),
            m if m.is_fixed() => Some(((m.0 - Major::FIXED.0) as u32 + 1, minor as u32, true)),
            m if m.is_ufixed() => Some(((m.0 - Major::UFIXED.0) as u32 + 1, minor as u32, false)),
            _ => None,
        }
    }

    /// Inclusive value bounds of a numeric type, `None` for types without a
    /// numeric representation.
    pub fn min_max(self) -> Option<(Decimal, Decimal)> {
        let (width, frac, signed) = self.numeric_layout()?;
        let modulus = BigInt::one() << (width * 8);
        let (lo, hi) = if signed {
            let half = &modulus >> 1u32;
            (-&half, half - 1)
        } else {
            (BigInt::zero(), modulus - 1)
        };
        Some((
            Decimal::from_parts(lo, frac).normalized(),
            Decimal::from_parts(hi, frac).normalized(),
        ))
    }

    /// Encode a numeric value into big-endian two's complement of the type's
    /// width. Values outside the range wrap; fractional digits beyond the
    /// type's are truncated toward zero. `None` for non-numeric types.
    pub fn encode(self, value: &Decimal) -> Option<Vec<u8>> {
        let (width, frac, _) = self.numeric_layout()?;
        let scaled = value.trunc(frac);
        let mantissa = scaled.mantissa() * pow10(frac - scaled.scale());
        let modulus = BigInt::one() << (width * 8);
        let mut wrapped = &mantissa % &modulus;
        if wrapped.sign() == Sign::Minus {
            wrapped += &modulus;
        }
        let (_, be) = wrapped.to_bytes_be();
        let mut out = vec![0u8; width as usize];
        out[width as usize - be.len()..].copy_from_slice(&be);
        Some(out)
    }

    /// Decode big-endian two's complement of the type's width. `None` for
    /// non-numeric types or a length mismatch.
    pub fn decode(self, bytes: &[u8]) -> Option<Decimal> {
        let (width, frac, signed) = self.numeric_layout()?;
        if bytes.len() != width as usize {
            return None;
        }
        let mut value = BigInt::from_bytes_be(Sign::Plus, bytes);
        if signed {
            let half = BigInt::one() << (width * 8 - 1);
            if value >= half {
                value -= BigInt::one() << (width * 8);
            }
        }
        Some(Decimal::from_parts(value, frac).normalized())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::PENDING {
            return f.write_str("pending");
        }
        if *self == Self::BAD {
            return f.write_str("bad");
        }
        let (major, minor) = self.decompose();
        match major {
            Major::NULL => f.write_str("null"),
            Major::BOOL => f.write_str("bool"),
            Major::ADDRESS => f.write_str("address"),
            Major::INT => write!(f, "int{}", (minor as u16 + 1) * 8),
            Major::UINT => write!(f, "uint{}", (minor as u16 + 1) * 8),
            Major::FIXED_BYTES => write!(f, "bytes{}", minor as u16 + 1),
            Major::DYNAMIC_BYTES => f.write_str("bytes"),
            m if m.is_fixed() => {
                write!(f, "fixed{}x{}", ((m.0 - Major::FIXED.0) as u16 + 1) * 8, minor)
            }
            m if m.is_ufixed() => {
                write!(f, "ufixed{}x{}", ((m.0 - Major::UFIXED.0) as u16 + 1) * 8, minor)
            }
            _ => write!(f, "invalid({:04x})", self.0),
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
    fn compose_decompose() {
        let dt = DataType::compose(Major::INT, 31);
        assert_eq!(dt.raw(), 0x041f);
        assert_eq!(dt.decompose(), (Major::INT, 31));
        assert_eq!(DataType::FIXED128X18.raw(), 0x1f12);
        assert_eq!(DataType::UFIXED128X18.raw(), 0x3f12);
        assert!(DataType::PENDING.pending());
        assert!(!DataType::BAD.pending());
    }

    #[test]
    fn display_names() {
        assert_eq!(DataType::INT256.to_string(), "int256");
        assert_eq!(DataType::integer(false, 1).to_string(), "uint8");
        assert_eq!(DataType::FIXED128X18.to_string(), "fixed128x18");
        assert_eq!(DataType::UFIXED128X18.to_string(), "ufixed128x18");
        assert_eq!(DataType::fixed_bytes(4).to_string(), "bytes4");
        assert_eq!(DataType::BYTES.to_string(), "bytes");
        assert_eq!(DataType::BOOL.to_string(), "bool");
        assert_eq!(DataType::ADDRESS.to_string(), "address");
        assert_eq!(DataType::NULL.to_string(), "null");
        assert_eq!(DataType::PENDING.to_string(), "pending");
    }

    #[test]
    fn sizes() {
        assert_eq!(DataType::integer(true, 32).size(), Some(32));
        assert_eq!(DataType::ADDRESS.size(), Some(20));
        assert_eq!(DataType::fixed_bytes(7).size(), Some(7));
        assert_eq!(DataType::BYTES.size(), None);
        assert_eq!(DataType::FIXED128X18.size(), Some(16));
        assert_eq!(DataType::NULL.size(), None);
    }

    #[test]
    fn bounds() {
        let (lo, hi) = DataType::integer(true, 1).min_max().unwrap();
        assert_eq!(lo, dec("-128"));
        assert_eq!(hi, dec("127"));

        let (lo, hi) = DataType::integer(false, 1).min_max().unwrap();
        assert_eq!(lo, dec("0"));
        assert_eq!(hi, dec("255"));

        let dt = DataType::compose(Major::FIXED.with_width(1), 2);
        let (lo, hi) = dt.min_max().unwrap();
        assert_eq!(lo, dec("-1.28"));
        assert_eq!(hi, dec("1.27"));

        assert!(DataType::BOOL.min_max().is_none());
        assert!(DataType::BYTES.min_max().is_none());
    }

    #[test]
    fn encode_decode_round_trip() {
        let dt = DataType::integer(true, 2);
        let v = dec("-300");
        let bytes = dt.encode(&v).unwrap();
        assert_eq!(bytes, [0xfe, 0xd4]);
        assert_eq!(dt.decode(&bytes).unwrap(), v);

        let dt = DataType::compose(Major::UFIXED.with_width(1), 2);
        let v = dec("1.27");
        assert_eq!(dt.decode(&dt.encode(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn encode_wraps_out_of_range() {
        let dt = DataType::integer(false, 1);
        let bytes = dt.encode(&dec("256")).unwrap();
        assert_eq!(bytes, [0]);
        assert_eq!(dt.decode(&bytes).unwrap(), dec("0"));

        let bytes = dt.encode(&dec("-1")).unwrap();
        assert_eq!(bytes, [0xff]);
        assert_eq!(dt.decode(&bytes).unwrap(), dec("255"));
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        assert!(DataType::integer(true, 4).decode(&[0u8; 3]).is_none());
        assert!(DataType::BOOL.decode(&[0u8]).is_none());
    }
}
