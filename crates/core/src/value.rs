//! Constant values produced by elaboration-time evaluation.
//!
//! `ConstantValue` is the currency of the constant evaluator: a small sum
//! type over everything an elaboration-time expression can produce. The
//! distinguished `Bad` state marks a value whose computation already
//! produced a diagnostic, so downstream consumers can short-circuit without
//! cascading errors.

use crate::int::{Bit, SvInt};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// The result of evaluating a bound expression at elaboration time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Integer(SvInt),
    Real(f64),
    ShortReal(f32),
    Str(String),
    Null,
    /// The `$` bound in queue/range positions; carried opaquely.
    Unbounded,
    /// Array and struct values, element order matching the type's shape.
    Elements(Vec<ConstantValue>),
    /// A previously diagnosed failure. Silences further diagnostics.
    Bad,
}

impl ConstantValue {
    /// A 1-bit four-state value from a single bit.
    pub fn from_bit(bit: Bit) -> ConstantValue {
        let mut v = SvInt::zero(1, false).to_four_state();
        v.set_bit(0, bit);
        ConstantValue::Integer(v)
    }

    /// A 1-bit four-state boolean.
    pub fn from_bool(b: bool) -> ConstantValue {
        ConstantValue::from_bit(if b { Bit::One } else { Bit::Zero })
    }

    pub fn is_bad(&self) -> bool {
        matches!(self, ConstantValue::Bad)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConstantValue::Null)
    }

    /// Borrow the integer payload, if this is an integer.
    pub fn integer(&self) -> Option<&SvInt> {
        match self {
            ConstantValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Take the integer payload, if this is an integer.
    pub fn into_integer(self) -> Option<SvInt> {
        match self {
            ConstantValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Truth value for condition contexts. `None` means unknown (an integer
    /// with X/Z bits), which strict callers may want to diagnose.
    pub fn truthy(&self) -> Option<bool> {
        match self {
            ConstantValue::Integer(v) => match v.reduce_or() {
                Bit::One => Some(true),
                Bit::Zero => Some(false),
                _ => None,
            },
            ConstantValue::Real(r) => Some(*r != 0.0),
            ConstantValue::ShortReal(r) => Some(*r != 0.0),
            ConstantValue::Str(s) => Some(!s.is_empty()),
            ConstantValue::Null => Some(false),
            _ => None,
        }
    }

    /// Bit-exact equality as used by `===` and case-item matching. X and Z
    /// match only themselves; `Bad` matches nothing, including itself.
    pub fn case_equal(&self, other: &ConstantValue) -> bool {
        match (self, other) {
            (ConstantValue::Integer(a), ConstantValue::Integer(b)) => a.case_eq(b),
            (ConstantValue::Real(a), ConstantValue::Real(b)) => a == b,
            (ConstantValue::ShortReal(a), ConstantValue::ShortReal(b)) => a == b,
            (ConstantValue::Str(a), ConstantValue::Str(b)) => a == b,
            (ConstantValue::Null, ConstantValue::Null) => true,
            (ConstantValue::Unbounded, ConstantValue::Unbounded) => true,
            (ConstantValue::Elements(a), ConstantValue::Elements(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.case_equal(y))
            }
            _ => false,
        }
    }

    /// Ordering for `inside` and relational membership tests. `None` for
    /// unknown integers, mixed kinds that have no numeric meaning, or `Bad`.
    pub fn order(&self, other: &ConstantValue) -> Option<Ordering> {
        match (self, other) {
            (ConstantValue::Integer(a), ConstantValue::Integer(b)) => a.compare(b),
            (ConstantValue::Real(a), ConstantValue::Real(b)) => a.partial_cmp(b),
            (ConstantValue::ShortReal(a), ConstantValue::ShortReal(b)) => a.partial_cmp(b),
            (ConstantValue::Str(a), ConstantValue::Str(b)) => Some(a.cmp(b)),
            (ConstantValue::Integer(_), ConstantValue::Real(b)) => {
                self.to_real()?.partial_cmp(b)
            }
            (ConstantValue::Real(a), ConstantValue::Integer(_)) => {
                a.partial_cmp(&other.to_real()?)
            }
            (ConstantValue::Unbounded, ConstantValue::Unbounded) => Some(Ordering::Equal),
            // $ compares greater than any bounded value.
            (ConstantValue::Unbounded, _) => Some(Ordering::Greater),
            (_, ConstantValue::Unbounded) => Some(Ordering::Less),
            _ => None,
        }
    }

    /// The value as a real, converting integers per the LRM rounding rules.
    pub fn to_real(&self) -> Option<f64> {
        match self {
            ConstantValue::Real(r) => Some(*r),
            ConstantValue::ShortReal(r) => Some(*r as f64),
            ConstantValue::Integer(v) => {
                if v.is_signed() {
                    v.as_i64().map(|i| i as f64)
                } else {
                    v.as_u64().map(|u| u as f64)
                }
            }
            _ => None,
        }
    }
}

impl From<SvInt> for ConstantValue {
    fn from(v: SvInt) -> ConstantValue {
        ConstantValue::Integer(v)
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Integer(v) => write!(f, "{}", v),
            ConstantValue::Real(r) => write!(f, "{}", r),
            ConstantValue::ShortReal(r) => write!(f, "{}", r),
            ConstantValue::Str(s) => write!(f, "\"{}\"", s),
            ConstantValue::Null => write!(f, "null"),
            ConstantValue::Unbounded => write!(f, "$"),
            ConstantValue::Elements(elems) => {
                write!(f, "'{{")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "}}")
            }
            ConstantValue::Bad => write!(f, "<bad>"),
        }
    }
}

impl Serialize for ConstantValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int::parse_literal;

    fn int(text: &str) -> ConstantValue {
        ConstantValue::Integer(parse_literal(text).unwrap())
    }

    #[test]
    fn test_truthy() {
        assert_eq!(int("8'd3").truthy(), Some(true));
        assert_eq!(int("8'd0").truthy(), Some(false));
        assert_eq!(int("4'b0x00").truthy(), None);
        // A known 1 anywhere decides the answer even with unknowns present.
        assert_eq!(int("4'b1x00").truthy(), Some(true));
        assert_eq!(ConstantValue::Real(0.0).truthy(), Some(false));
        assert_eq!(ConstantValue::Str("hi".into()).truthy(), Some(true));
        assert_eq!(ConstantValue::Bad.truthy(), None);
    }

    #[test]
    fn test_case_equal_uses_bit_exact_matching() {
        assert!(int("3'b01x").case_equal(&int("3'b01x")));
        assert!(!int("3'b01x").case_equal(&int("3'b010")));
        assert!(!ConstantValue::Bad.case_equal(&ConstantValue::Bad));
    }

    #[test]
    fn test_order() {
        assert_eq!(int("8'd2").order(&int("8'd3")), Some(Ordering::Less));
        assert_eq!(int("4'b00x0").order(&int("4'd1")), None);
        assert_eq!(
            ConstantValue::Unbounded.order(&int("8'd255")),
            Some(Ordering::Greater)
        );
        assert_eq!(
            ConstantValue::Str("a".into()).order(&ConstantValue::Str("b".into())),
            Some(Ordering::Less)
        );
        assert_eq!(int("8'd2").order(&ConstantValue::Real(2.5)), Some(Ordering::Less));
    }

    #[test]
    fn test_bad_probe() {
        assert!(ConstantValue::Bad.is_bad());
        assert!(!int("8'd0").is_bad());
    }

    #[test]
    fn test_from_bit() {
        let v = ConstantValue::from_bit(Bit::X);
        let i = v.integer().unwrap();
        assert_eq!(i.width(), 1);
        assert!(i.has_unknown());
        assert_eq!(ConstantValue::from_bool(true).truthy(), Some(true));
    }

    #[test]
    fn test_display() {
        assert_eq!(int("8'd42").to_string(), "8'd42");
        assert_eq!(ConstantValue::Null.to_string(), "null");
        assert_eq!(
            ConstantValue::Elements(vec![int("4'd1"), int("4'd2")]).to_string(),
            "'{4'd1, 4'd2}"
        );
    }

    #[test]
    fn test_to_real() {
        assert_eq!(int("8'd5").to_real(), Some(5.0));
        let neg = ConstantValue::Integer(crate::int::SvInt::from_i64(8, true, -5));
        assert_eq!(neg.to_real(), Some(-5.0));
    }
}
