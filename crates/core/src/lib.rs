//! Core value primitives for SystemVerilog elaboration.
//!
//! This crate is the numeric foundation shared by the elaboration front-end
//! and any outer tooling (serializers, formatters, future simulation): the
//! four-state arbitrary-precision integer [`SvInt`] and the evaluator
//! currency [`ConstantValue`]. It has no knowledge of types, symbols, or
//! syntax; those live in `sv-elab`.

pub mod int;
pub mod value;

pub use int::{Bit, IntLiteralError, LiteralBase, MAX_WIDTH, SvInt, parse_literal};
pub use value::ConstantValue;
