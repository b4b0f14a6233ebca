// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Three-valued booleans and folded constant values.

use core::cmp::Ordering;
use core::fmt;

use crate::decimal::Decimal;

/// A boolean in three-valued logic. `Unknown` is the truth value of NULL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BoolValue {
    #[default]
    Unknown,
    False,
    True,
}

impl BoolValue {
    pub fn valid(self) -> bool {
        self != BoolValue::Unknown
    }

    pub fn not(self) -> BoolValue {
        match self {
            BoolValue::True => BoolValue::False,
            BoolValue::False => BoolValue::True,
            BoolValue::Unknown => BoolValue::Unknown,
        }
    }

    pub fn and(self, rhs: BoolValue) -> BoolValue {
        match (self, rhs) {
            (BoolValue::False, _) | (_, BoolValue::False) => BoolValue::False,
            (BoolValue::True, BoolValue::True) => BoolValue::True,
            _ => BoolValue::Unknown,
        }
    }

    pub fn or(self, rhs: BoolValue) -> BoolValue {
        match (self, rhs) {
            (BoolValue::True, _) | (_, BoolValue::True) => BoolValue::True,
            (BoolValue::False, BoolValue::False) => BoolValue::False,
            _ => BoolValue::Unknown,
        }
    }

    /// Ordering used by the comparison operators: `FALSE < TRUE`.
    fn rank(self) -> Option<u8> {
        match self {
            BoolValue::False => Some(0),
            BoolValue::True => Some(1),
            BoolValue::Unknown => None,
        }
    }

    pub(crate) fn compare(self, rhs: BoolValue, pick: fn(Ordering) -> bool) -> BoolValue {
        match (self.rank(), rhs.rank()) {
            (Some(a), Some(b)) => BoolValue::from(pick(a.cmp(&b))),
            _ => BoolValue::Unknown,
        }
    }

    pub fn equal(self, rhs: BoolValue) -> BoolValue {
        self.compare(rhs, Ordering::is_eq)
    }

    pub fn not_equal(self, rhs: BoolValue) -> BoolValue {
        self.compare(rhs, Ordering::is_ne)
    }

    pub fn greater(self, rhs: BoolValue) -> BoolValue {
        self.compare(rhs, Ordering::is_gt)
    }

    pub fn greater_or_equal(self, rhs: BoolValue) -> BoolValue {
        self.compare(rhs, Ordering::is_ge)
    }

    pub fn less(self, rhs: BoolValue) -> BoolValue {
        self.compare(rhs, Ordering::is_lt)
    }

    pub fn less_or_equal(self, rhs: BoolValue) -> BoolValue {
        self.compare(rhs, Ordering::is_le)
    }
}

impl From<bool> for BoolValue {
    fn from(value: bool) -> Self {
        if value {
            BoolValue::True
        } else {
            BoolValue::False
        }
    }
}

impl fmt::Display for BoolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolValue::True => f.write_str("TRUE"),
            BoolValue::False => f.write_str("FALSE"),
            BoolValue::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// A constant extracted from a folded node, kind-tagged so that typed NULLs
/// keep the kind of their partner operand. `None` payloads are NULLs.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Bool(BoolValue),
    Bytes(Option<Vec<u8>>),
    Number(Option<Decimal>),
}

impl Constant {
    /// The NULL of the same kind as `self`.
    pub fn null_of_same_kind(&self) -> Constant {
        match self {
            Constant::Bool(_) => Constant::Bool(BoolValue::Unknown),
            Constant::Bytes(_) => Constant::Bytes(None),
            Constant::Number(_) => Constant::Number(None),
        }
    }

    /// Three-valued equality between two constants of the same kind.
    pub fn equal(&self, rhs: &Constant) -> BoolValue {
        match (self, rhs) {
            (Constant::Bool(a), Constant::Bool(b)) => a.equal(*b),
            (Constant::Bytes(Some(a)), Constant::Bytes(Some(b))) => BoolValue::from(a == b),
            (Constant::Number(Some(a)), Constant::Number(Some(b))) => BoolValue::from(a == b),
            (Constant::Bytes(_), Constant::Bytes(_)) => BoolValue::Unknown,
            (Constant::Number(_), Constant::Number(_)) => BoolValue::Unknown,
            _ => panic!("cannot compare constants of different kinds"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: BoolValue = BoolValue::True;
    const F: BoolValue = BoolValue::False;
    const U: BoolValue = BoolValue::Unknown;

    #[test]
    fn three_valued_connectives() {
        assert_eq!(T.and(U), U);
        assert_eq!(F.and(U), F);
        assert_eq!(U.and(U), U);
        assert_eq!(T.or(U), T);
        assert_eq!(F.or(U), U);
        assert_eq!(U.not(), U);
        assert_eq!(T.not(), F);
    }

    #[test]
    fn three_valued_comparisons() {
        assert_eq!(T.equal(T), T);
        assert_eq!(T.equal(F), F);
        assert_eq!(T.equal(U), U);
        assert_eq!(F.less(T), T);
        assert_eq!(T.greater_or_equal(F), T);
        assert_eq!(F.less_or_equal(F), T);
        assert_eq!(U.less(F), U);
    }

    #[test]
    fn constant_equality() {
        let a = Constant::Bytes(Some(vec![1, 2]));
        let b = Constant::Bytes(Some(vec![1, 2]));
        assert_eq!(a.equal(&b), T);
        assert_eq!(a.equal(&a.null_of_same_kind()), U);

        let x = Constant::Number(Some("1.50".parse().unwrap()));
        let y = Constant::Number(Some("1.5".parse().unwrap()));
        assert_eq!(x.equal(&y), T);
    }
}
