//! System subroutines (`$bits`, `$clog2`, ...).
//!
//! Each function carries its own argument checker and constant-evaluation
//! rule; the binder consults `result_type` and the evaluator dispatches to
//! `evaluate`. All of these are pure functions of their argument's type and
//! value, which is what makes them legal in constant context.

use crate::expr::Expression;
use crate::types::{TypeId, Types};
use sv_core::{Bit, ConstantValue, SvInt};

/// The system functions the constant evaluator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemFunc {
    Bits,
    Clog2,
    Signed,
    Unsigned,
    CountOnes,
    OneHot,
    IsUnknown,
}

impl SystemFunc {
    /// Resolve a `$`-prefixed call name.
    pub fn from_name(name: &str) -> Option<SystemFunc> {
        match name {
            "$bits" => Some(SystemFunc::Bits),
            "$clog2" => Some(SystemFunc::Clog2),
            "$signed" => Some(SystemFunc::Signed),
            "$unsigned" => Some(SystemFunc::Unsigned),
            "$countones" => Some(SystemFunc::CountOnes),
            "$onehot" => Some(SystemFunc::OneHot),
            "$isunknown" => Some(SystemFunc::IsUnknown),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SystemFunc::Bits => "$bits",
            SystemFunc::Clog2 => "$clog2",
            SystemFunc::Signed => "$signed",
            SystemFunc::Unsigned => "$unsigned",
            SystemFunc::CountOnes => "$countones",
            SystemFunc::OneHot => "$onehot",
            SystemFunc::IsUnknown => "$isunknown",
        }
    }

    pub fn arg_count(self) -> usize {
        1
    }

    /// The result type given the bound arguments, or `None` when the
    /// argument type is not acceptable.
    pub fn result_type(self, types: &mut Types, args: &[Expression]) -> Option<TypeId> {
        let arg = args.first()?;
        match self {
            SystemFunc::Bits => {
                types.bits_of(arg.ty)?;
                Some(types.builtins.int)
            }
            SystemFunc::Clog2 | SystemFunc::CountOnes => {
                types.integral_traits(arg.ty)?;
                Some(types.builtins.int)
            }
            SystemFunc::Signed => {
                let (w, _, f) = types.integral_traits(arg.ty)?;
                Some(types.integral(w, true, f))
            }
            SystemFunc::Unsigned => {
                let (w, _, f) = types.integral_traits(arg.ty)?;
                Some(types.integral(w, false, f))
            }
            SystemFunc::OneHot | SystemFunc::IsUnknown => {
                types.integral_traits(arg.ty)?;
                Some(types.builtins.bit)
            }
        }
    }

    /// Constant evaluation over already-evaluated argument values.
    pub fn evaluate(
        self,
        types: &Types,
        args: &[Expression],
        values: &[ConstantValue],
    ) -> ConstantValue {
        if values.iter().any(|v| v.is_bad()) {
            return ConstantValue::Bad;
        }
        match self {
            SystemFunc::Bits => {
                match types.bits_of(args[0].ty) {
                    Some(bits) => ConstantValue::Integer(SvInt::from_u64(32, true, bits)),
                    None => ConstantValue::Bad,
                }
            }
            SystemFunc::Clog2 => {
                let Some(v) = values[0].integer() else {
                    return ConstantValue::Bad;
                };
                if v.has_unknown() {
                    return ConstantValue::Integer(SvInt::filled(32, true, Bit::X));
                }
                ConstantValue::Integer(SvInt::from_u64(32, true, clog2(v)))
            }
            SystemFunc::Signed => match values[0].clone().into_integer() {
                Some(v) => ConstantValue::Integer(v.with_signed(true)),
                None => ConstantValue::Bad,
            },
            SystemFunc::Unsigned => match values[0].clone().into_integer() {
                Some(v) => ConstantValue::Integer(v.with_signed(false)),
                None => ConstantValue::Bad,
            },
            SystemFunc::CountOnes => match values[0].integer() {
                Some(v) => {
                    ConstantValue::Integer(SvInt::from_u64(32, true, v.count_ones() as u64))
                }
                None => ConstantValue::Bad,
            },
            SystemFunc::OneHot => match values[0].integer() {
                Some(v) => {
                    if v.has_unknown() {
                        ConstantValue::from_bit(Bit::X)
                    } else {
                        ConstantValue::Integer(SvInt::from_u64(
                            1,
                            false,
                            (v.count_ones() == 1) as u64,
                        ))
                    }
                }
                None => ConstantValue::Bad,
            },
            SystemFunc::IsUnknown => match values[0].integer() {
                Some(v) => ConstantValue::Integer(SvInt::from_u64(1, false, v.has_unknown() as u64)),
                None => ConstantValue::Bad,
            },
        }
    }
}

/// Ceiling log2 of a fully known value; 0 for 0 and 1.
fn clog2(v: &SvInt) -> u64 {
    // clog2(v) is the index just past the highest set bit of v - 1.
    if v.is_zero() {
        return 0;
    }
    let vm1 = v.sub(&SvInt::from_u64(v.width(), false, 1));
    for i in (0..vm1.width()).rev() {
        if vm1.bit(i) == Bit::One {
            return (i + 1) as u64;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(SystemFunc::from_name("$clog2"), Some(SystemFunc::Clog2));
        assert_eq!(SystemFunc::from_name("$display"), None);
    }

    #[test]
    fn test_clog2_values() {
        for (input, expected) in
            [(0u64, 0u64), (1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4), (1024, 10)]
        {
            let v = SvInt::from_u64(32, false, input);
            assert_eq!(clog2(&v), expected, "clog2({})", input);
        }
    }

    #[test]
    fn test_evaluate_countones() {
        let types = Types::new();
        let args = [Expression::new(
            types.builtins.int,
            crate::expr::ExpressionKind::IntegerLiteral(SvInt::from_u64(32, true, 0b1011)),
            crate::syntax::SourceLocation::default(),
        )];
        let values = [ConstantValue::Integer(SvInt::from_u64(32, true, 0b1011))];
        let out = SystemFunc::CountOnes.evaluate(&types, &args, &values);
        assert_eq!(out.integer().unwrap().as_u64(), Some(3));
    }
}
