//! Semantic analysis and constant evaluation for SystemVerilog elaboration.
//!
//! This crate consumes a parsed, immutable syntax tree and produces typed,
//! bound expression and statement trees hung off a lazily-elaborated symbol
//! hierarchy, together with a constant evaluator able to execute
//! elaboration-time code. The lexer, preprocessor, and parser live in outer
//! layers; so do file handling, the CLI, and serialization proper (a JSON
//! writer can walk bound trees through the visitor protocol in [`expr`]).
//!
//! The usual flow: build a [`Compilation`], feed it member syntax, then
//! bind and fold through [`fold_constant`] or the [`Binder`] entry points.
//! Diagnostics accumulate in the compilation's sink as structured records.

pub mod binder;
pub mod builtins;
pub mod diagnostics;
pub mod eval;
pub mod expr;
pub mod symbols;
pub mod syntax;
pub mod types;

pub use binder::{BindContext, Binder};
pub use builtins::SystemFunc;
pub use diagnostics::{DiagArg, DiagCode, Diagnostic, Diagnostics, Severity};
pub use eval::{EvalContext, EvalOptions};
pub use expr::{Expression, ExpressionKind, ExpressionVisitor, Statement, StatementKind, walk_expression};
pub use symbols::{Compilation, LookupKind, Symbol, SymbolId, SymbolKind};
pub use syntax::{
    BinaryOp, DataTypeSyntax, ExpressionSyntax, MemberSyntax, SourceLocation, StatementSyntax,
    SyntaxKind, UnaryOp,
};
pub use types::{Compat, ConstantRange, TypeId, TypeKind, Types};

use sv_core::ConstantValue;

/// Bind `syntax` in `scope` and evaluate it as a required constant.
/// Evaluation diagnostics are promoted to the compilation's sink; a failed
/// fold yields [`ConstantValue::Bad`] with the cause already reported.
pub fn fold_constant(
    comp: &mut Compilation,
    syntax: &ExpressionSyntax,
    scope: SymbolId,
) -> ConstantValue {
    comp.eval_constant(syntax, scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{CaseItemSyntax, FormalArgSyntax, RangeSelectKind};
    use sv_core::Bit;

    fn lit(text: &str) -> ExpressionSyntax {
        ExpressionSyntax::int_literal(text)
    }

    fn fold(comp: &mut Compilation, syntax: &ExpressionSyntax) -> ConstantValue {
        let root = comp.root();
        fold_constant(comp, syntax, root)
    }

    // -- end-to-end elaboration scenarios --

    #[test]
    fn test_x_propagation_through_addition() {
        // 4'b10x0 + 4'b0001 -> 4'bxxxx
        let mut comp = Compilation::new();
        let value = fold(
            &mut comp,
            &ExpressionSyntax::binary(BinaryOp::Add, lit("4'b10x0"), lit("4'b0001")),
        );
        let v = value.integer().unwrap();
        assert_eq!(v.width(), 4);
        assert!(v.is_four_state());
        assert!((0..4).all(|i| v.bit(i) == Bit::X));
    }

    #[test]
    fn test_parameter_fold_and_bits() {
        // parameter int P = 3 + 2 * 4; $bits(P) is a 32-bit int worth 32.
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::parameter(
            "P",
            Some(DataTypeSyntax::int()),
            ExpressionSyntax::binary(
                BinaryOp::Add,
                lit("3"),
                ExpressionSyntax::binary(BinaryOp::Mul, lit("2"), lit("4")),
            ),
        ));
        let root = comp.root();
        let p = comp
            .lookup_unqualified("P", root, LookupKind::Definition, SourceLocation::default())
            .unwrap();
        assert_eq!(
            comp.parameter_value(p).integer().unwrap().as_i64(),
            Some(11)
        );
        assert_eq!(comp.parameter_type(p), comp.types.builtins.int);

        let bits = fold(
            &mut comp,
            &ExpressionSyntax::call("$bits", vec![ExpressionSyntax::ident("P")]),
        );
        let bits = bits.integer().unwrap();
        assert_eq!(bits.width(), 32);
        assert_eq!(bits.as_u64(), Some(32));
        assert!(!comp.diags.has_errors());
    }

    #[test]
    fn test_function_call_and_step_accounting() {
        // function automatic int f(int a); return a + 1; endfunction
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::function(
            "f",
            DataTypeSyntax::int(),
            vec![FormalArgSyntax::new("a", DataTypeSyntax::int())],
            vec![StatementSyntax::ret(Some(ExpressionSyntax::binary(
                BinaryOp::Add,
                ExpressionSyntax::ident("a"),
                lit("1"),
            )))],
        ));
        let root = comp.root();
        let call = ExpressionSyntax::call("f", vec![lit("41")]);
        let ctx = BindContext::constant(root);
        let expr = {
            let mut binder = Binder::new(&mut comp);
            binder.bind_self_determined(&call, &ctx)
        };
        let mut ectx = EvalContext::new(&comp, EvalOptions::default());
        let value = ectx.eval(&expr);
        assert_eq!(value.integer().unwrap().as_i64(), Some(42));
        // Exactly one statement executed: the return.
        assert_eq!(ectx.steps_used(), 1);
        assert!(ectx.diagnostics().is_empty());
    }

    #[test]
    fn test_partial_write_preserves_other_bits() {
        // logic [7:0] v; v[3:0] = 4'b1x01; low nibble 1x01, upper 0000.
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::variable(
            "v",
            DataTypeSyntax::logic_vector(7, 0),
            None,
        ));
        let root = comp.root();
        let assign = ExpressionSyntax::assign(
            ExpressionSyntax::range_select(
                ExpressionSyntax::ident("v"),
                RangeSelectKind::Simple,
                lit("3"),
                lit("0"),
            ),
            lit("4'b1x01"),
        );
        let read = ExpressionSyntax::ident("v");
        let ctx = BindContext::definition(root);
        let (assign, read) = {
            let mut binder = Binder::new(&mut comp);
            (
                binder.bind_self_determined(&assign, &ctx),
                binder.bind_self_determined(&read, &ctx),
            )
        };
        let mut ectx = EvalContext::new(&comp, EvalOptions::script());
        ectx.eval(&assign);
        let v = ectx.eval(&read);
        let v = v.integer().unwrap();
        assert_eq!(v.bit(0), Bit::One);
        assert_eq!(v.bit(1), Bit::Zero);
        assert_eq!(v.bit(2), Bit::X);
        assert_eq!(v.bit(3), Bit::One);
        for i in 4..8 {
            assert_eq!(v.bit(i), Bit::Zero, "upper bit {}", i);
        }
    }

    #[test]
    fn test_case_matches_bit_exactly() {
        // case (3'b01x): the 3'b010 arm must not match; the 3'b01x arm
        // matches by === equality.
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::variable("r", DataTypeSyntax::int(), None));
        let root = comp.root();
        let arm = |value: &str, result: &str| CaseItemSyntax {
            expressions: vec![lit(value)],
            body: StatementSyntax::expr_stmt(ExpressionSyntax::assign(
                ExpressionSyntax::ident("r"),
                lit(result),
            )),
        };
        let stmt = StatementSyntax::Case {
            selector: lit("3'b01x"),
            items: vec![arm("3'b010", "1"), arm("3'b01x", "2")],
            loc: SourceLocation::default(),
        };
        let ctx = BindContext::definition(root);
        let (stmt, read) = {
            let mut binder = Binder::new(&mut comp);
            (
                binder.bind_statement(&stmt, &ctx),
                binder.bind_self_determined(&ExpressionSyntax::ident("r"), &ctx),
            )
        };
        let mut ectx = EvalContext::new(&comp, EvalOptions::script());
        assert!(ectx.exec(&stmt));
        let r = ectx.eval(&read);
        assert_eq!(r.integer().unwrap().as_i64(), Some(2));
    }

    #[test]
    fn test_division_by_zero() {
        // 8'd10 / 8'd0 -> all-X, width 8, DivideByZero recorded.
        let mut comp = Compilation::new();
        let value = fold(
            &mut comp,
            &ExpressionSyntax::binary(BinaryOp::Div, lit("8'd10"), lit("8'd0")),
        );
        let v = value.integer().unwrap();
        assert_eq!(v.width(), 8);
        assert!((0..8).all(|i| v.bit(i) == Bit::X));
        assert!(comp.diags.iter().any(|d| d.code == DiagCode::DivideByZero));
    }

    // -- universal invariants --

    #[test]
    fn test_invalid_expressions_have_error_type() {
        let mut comp = Compilation::new();
        let root = comp.root();
        let ctx = BindContext::definition(root);
        let exprs = [
            ExpressionSyntax::ident("missing"),
            ExpressionSyntax::binary(BinaryOp::Add, ExpressionSyntax::ident("missing"), lit("1")),
        ];
        for syntax in &exprs {
            let e = {
                let mut binder = Binder::new(&mut comp);
                binder.bind_self_determined(syntax, &ctx)
            };
            assert_eq!(comp.types.is_error(e.ty), e.is_invalid());
        }
        // And a healthy expression never carries the error type.
        let e = {
            let mut binder = Binder::new(&mut comp);
            binder.bind_self_determined(&lit("1"), &ctx)
        };
        assert!(!comp.types.is_error(e.ty));
    }

    #[test]
    fn test_evaluation_purity() {
        // Same context snapshot, same expression: equal values, equal
        // diagnostics.
        let mut comp = Compilation::new();
        let root = comp.root();
        let syntax = ExpressionSyntax::binary(BinaryOp::Div, lit("8'd10"), lit("8'd0"));
        let ctx = BindContext::constant(root);
        let expr = {
            let mut binder = Binder::new(&mut comp);
            binder.bind_self_determined(&syntax, &ctx)
        };
        let mut first = EvalContext::new(&comp, EvalOptions::default());
        let v1 = first.eval(&expr);
        let d1 = first.take_diagnostics();
        let mut second = EvalContext::new(&comp, EvalOptions::default());
        let v2 = second.eval(&expr);
        let d2 = second.take_diagnostics();
        assert_eq!(v1, v2);
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_budget_exhaustion_on_runaway_loop() {
        // for (int i = 0; ; i++) ; never terminates on its own; the step
        // budget trips with EvalTimeout.
        let mut comp = Compilation::new();
        let root = comp.root();
        let stmt = StatementSyntax::For {
            declarations: vec![MemberSyntax::variable(
                "i",
                DataTypeSyntax::int(),
                Some(lit("0")),
            )],
            init: vec![],
            condition: None,
            steps: vec![ExpressionSyntax::unary(
                UnaryOp::Postincrement,
                ExpressionSyntax::ident("i"),
            )],
            body: Box::new(StatementSyntax::expr_stmt(lit("0"))),
            loc: SourceLocation::default(),
        };
        let ctx = BindContext::definition(root);
        let stmt = {
            let mut binder = Binder::new(&mut comp);
            binder.bind_statement(&stmt, &ctx)
        };
        assert!(!comp.diags.has_errors(), "{:?}", comp.diags.drain());
        let mut ectx = EvalContext::new(&comp, EvalOptions::default().with_max_steps(100));
        assert!(!ectx.exec(&stmt));
        assert!(
            ectx.diagnostics()
                .iter()
                .any(|d| d.code == DiagCode::EvalTimeout)
        );
    }

    #[test]
    fn test_for_loop_evaluates() {
        // function int sum(); int s; for (int i = 1; i <= 4; i++) s += i;
        // return s; endfunction -> 10
        let mut comp = Compilation::new();
        let body = vec![
            StatementSyntax::block(
                vec![MemberSyntax::variable(
                    "s",
                    DataTypeSyntax::int(),
                    Some(lit("0")),
                )],
                vec![
                    StatementSyntax::For {
                        declarations: vec![MemberSyntax::variable(
                            "i",
                            DataTypeSyntax::int(),
                            Some(lit("1")),
                        )],
                        init: vec![],
                        condition: Some(ExpressionSyntax::binary(
                            BinaryOp::LessThanEqual,
                            ExpressionSyntax::ident("i"),
                            lit("4"),
                        )),
                        steps: vec![ExpressionSyntax::unary(
                            UnaryOp::Postincrement,
                            ExpressionSyntax::ident("i"),
                        )],
                        body: Box::new(StatementSyntax::expr_stmt(
                            ExpressionSyntax::compound_assign(
                                ExpressionSyntax::ident("s"),
                                BinaryOp::Add,
                                ExpressionSyntax::ident("i"),
                            ),
                        )),
                        loc: SourceLocation::default(),
                    },
                    StatementSyntax::ret(Some(ExpressionSyntax::ident("s"))),
                ],
            ),
        ];
        comp.add_member(MemberSyntax::function(
            "sum",
            DataTypeSyntax::int(),
            vec![],
            body,
        ));
        let value = fold(&mut comp, &ExpressionSyntax::call("sum", vec![]));
        assert_eq!(value.integer().unwrap().as_i64(), Some(10));
        assert!(!comp.diags.has_errors());
    }

    #[test]
    fn test_recursion_limit() {
        // function int f(int a); return f(a); endfunction
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::function(
            "f",
            DataTypeSyntax::int(),
            vec![FormalArgSyntax::new("a", DataTypeSyntax::int())],
            vec![StatementSyntax::ret(Some(ExpressionSyntax::call(
                "f",
                vec![ExpressionSyntax::ident("a")],
            )))],
        ));
        let value = fold(&mut comp, &ExpressionSyntax::call("f", vec![lit("1")]));
        assert!(value.is_bad());
        assert!(
            comp.diags
                .iter()
                .any(|d| d.code == DiagCode::RecursionLimit)
        );
    }

    #[test]
    fn test_output_argument_copy_back() {
        // function void get(output int o); o = 7; endfunction
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::function(
            "get",
            DataTypeSyntax::keyword(crate::syntax::TypeKeyword::Void),
            vec![
                FormalArgSyntax::new("o", DataTypeSyntax::int())
                    .with_direction(crate::syntax::ArgDirection::Out),
            ],
            vec![StatementSyntax::expr_stmt(ExpressionSyntax::assign(
                ExpressionSyntax::ident("o"),
                lit("7"),
            ))],
        ));
        comp.add_member(MemberSyntax::variable("x", DataTypeSyntax::int(), None));
        let root = comp.root();
        let ctx = BindContext::definition(root);
        let (call, read) = {
            let mut binder = Binder::new(&mut comp);
            (
                binder.bind_self_determined(
                    &ExpressionSyntax::call("get", vec![ExpressionSyntax::ident("x")]),
                    &ctx,
                ),
                binder.bind_self_determined(&ExpressionSyntax::ident("x"), &ctx),
            )
        };
        let mut ectx = EvalContext::new(&comp, EvalOptions::script());
        ectx.eval(&call);
        let x = ectx.eval(&read);
        assert_eq!(x.integer().unwrap().as_i64(), Some(7));
    }

    #[test]
    fn test_conditional_with_unknown_selector_merges_arms() {
        // (1'bx ? 4'b1100 : 4'b1010) -> 4'b1xx0
        let mut comp = Compilation::new();
        let value = fold(
            &mut comp,
            &ExpressionSyntax::conditional(lit("1'bx"), lit("4'b1100"), lit("4'b1010")),
        );
        let v = value.integer().unwrap();
        assert_eq!(v.bit(3), Bit::One);
        assert_eq!(v.bit(2), Bit::X);
        assert_eq!(v.bit(1), Bit::X);
        assert_eq!(v.bit(0), Bit::Zero);
    }

    #[test]
    fn test_enum_members_resolve_and_fold() {
        // typedef enum { RED, GREEN = 5, BLUE } color_t;
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::typedef(
            "color_t",
            DataTypeSyntax::Enum {
                base: None,
                members: vec![
                    crate::syntax::EnumMemberSyntax::new("RED", None),
                    crate::syntax::EnumMemberSyntax::new("GREEN", Some(lit("5"))),
                    crate::syntax::EnumMemberSyntax::new("BLUE", None),
                ],
                loc: SourceLocation::default(),
            },
        ));
        let root = comp.root();
        // Force materialization through a lookup.
        comp.members(root);
        let blue = fold(&mut comp, &ExpressionSyntax::ident("BLUE"));
        assert_eq!(blue.integer().unwrap().as_i64(), Some(6));
        let b = comp
            .lookup_unqualified("BLUE", root, LookupKind::Definition, SourceLocation::default())
            .unwrap();
        assert!(matches!(
            comp.symbol(b).kind,
            SymbolKind::EnumMember { .. }
        ));
        assert!(!comp.diags.has_errors());
    }

    #[test]
    fn test_packed_struct_member_access() {
        // typedef struct packed { logic [3:0] hi; logic [3:0] lo; } pair_t;
        // parameter pair_t P = 8'hA5; P.hi == 4'hA, P.lo == 4'h5.
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::typedef(
            "pair_t",
            DataTypeSyntax::Struct {
                packed: true,
                fields: vec![
                    crate::syntax::StructFieldSyntax::new(
                        "hi",
                        DataTypeSyntax::logic_vector(3, 0),
                    ),
                    crate::syntax::StructFieldSyntax::new(
                        "lo",
                        DataTypeSyntax::logic_vector(3, 0),
                    ),
                ],
                loc: SourceLocation::default(),
            },
        ));
        comp.add_member(MemberSyntax::parameter(
            "P",
            Some(DataTypeSyntax::named("pair_t")),
            lit("8'ha5"),
        ));
        let hi = fold(
            &mut comp,
            &ExpressionSyntax::member(ExpressionSyntax::ident("P"), "hi"),
        );
        let lo = fold(
            &mut comp,
            &ExpressionSyntax::member(ExpressionSyntax::ident("P"), "lo"),
        );
        assert_eq!(hi.integer().unwrap().as_u64(), Some(0xa));
        assert_eq!(lo.integer().unwrap().as_u64(), Some(0x5));
        assert!(!comp.diags.has_errors());
    }

    #[test]
    fn test_package_qualified_parameter_is_constant() {
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::package(
            "pkg",
            vec![MemberSyntax::parameter("WIDTH", None, lit("16"))],
        ));
        let value = fold(
            &mut comp,
            &ExpressionSyntax::hierarchical(&["pkg", "WIDTH"]),
        );
        assert_eq!(value.integer().unwrap().as_i64(), Some(16));
        assert!(!comp.diags.has_errors());
    }

    #[test]
    fn test_hierarchical_module_reference_is_not_constant() {
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::module(
            "top",
            vec![MemberSyntax::variable("v", DataTypeSyntax::int(), None)],
        ));
        let value = fold(&mut comp, &ExpressionSyntax::hierarchical(&["top", "v"]));
        assert!(value.is_bad());
        assert!(comp.diags.iter().any(|d| d.code == DiagCode::NotAConstant));
    }

    #[test]
    fn test_indexed_range_select() {
        // 16'habcd[4 +: 8] -> 8'hbc (base 4, width 8 of 0xabcd).
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::parameter(
            "P",
            Some(DataTypeSyntax::logic_vector(15, 0)),
            lit("16'habcd"),
        ));
        let value = fold(
            &mut comp,
            &ExpressionSyntax::range_select(
                ExpressionSyntax::ident("P"),
                RangeSelectKind::IndexedUp,
                lit("4"),
                lit("8"),
            ),
        );
        assert_eq!(value.integer().unwrap().as_u64(), Some(0xbc));
    }

    #[test]
    fn test_out_of_bounds_select_yields_x_and_diagnoses() {
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::parameter(
            "P",
            Some(DataTypeSyntax::logic_vector(7, 0)),
            lit("8'hff"),
        ));
        let value = fold(
            &mut comp,
            &ExpressionSyntax::element_select(ExpressionSyntax::ident("P"), lit("12")),
        );
        let v = value.integer().unwrap();
        assert_eq!(v.bit(0), Bit::X);
        assert!(
            comp.diags
                .iter()
                .any(|d| d.code == DiagCode::IndexOutOfBounds)
        );
    }

    #[test]
    fn test_cancellation_flag_stops_evaluation() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicBool;
        let mut comp = Compilation::new();
        let root = comp.root();
        let stmt = StatementSyntax::expr_stmt(lit("1"));
        let ctx = BindContext::definition(root);
        let stmt = {
            let mut binder = Binder::new(&mut comp);
            binder.bind_statement(&stmt, &ctx)
        };
        let cancel = Arc::new(AtomicBool::new(true));
        let mut ectx = EvalContext::new(
            &comp,
            EvalOptions::default().with_cancel(Arc::clone(&cancel)),
        );
        assert!(!ectx.exec(&stmt));
        assert!(
            ectx.diagnostics()
                .iter()
                .any(|d| d.code == DiagCode::EvalCancelled)
        );
    }

    #[test]
    fn test_string_and_integral_conversion() {
        // Casting "AB" to a 16-bit vector packs the characters.
        let mut comp = Compilation::new();
        let value = fold(
            &mut comp,
            &ExpressionSyntax::cast(
                DataTypeSyntax::logic_vector(15, 0),
                ExpressionSyntax::string_literal("AB"),
            ),
        );
        assert_eq!(value.integer().unwrap().as_u64(), Some(0x4142));
    }

    #[test]
    fn test_signed_system_function() {
        // $signed(8'hff) reinterprets the bits as -1.
        let mut comp = Compilation::new();
        let value = fold(
            &mut comp,
            &ExpressionSyntax::call("$signed", vec![lit("8'hff")]),
        );
        assert_eq!(value.integer().unwrap().as_i64(), Some(-1));
    }

    #[test]
    fn test_clog2() {
        let mut comp = Compilation::new();
        let value = fold(
            &mut comp,
            &ExpressionSyntax::call("$clog2", vec![lit("1024")]),
        );
        assert_eq!(value.integer().unwrap().as_i64(), Some(10));
    }

    #[test]
    fn test_strict_mode_diagnoses_uninitialized_read() {
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::variable("v", DataTypeSyntax::int(), None));
        let root = comp.root();
        let ctx = BindContext::definition(root);
        let read = {
            let mut binder = Binder::new(&mut comp);
            binder.bind_self_determined(&ExpressionSyntax::ident("v"), &ctx)
        };
        let mut ectx = EvalContext::new(&comp, EvalOptions::strict());
        let v = ectx.eval(&read);
        assert!(v.is_bad());
        assert!(
            ectx.diagnostics()
                .iter()
                .any(|d| d.code == DiagCode::UninitializedVariable)
        );
    }

    #[test]
    fn test_concat_and_replication_fold() {
        // {2{4'b1010}, 4'b0101} == 12'b1010_1010_0101
        let mut comp = Compilation::new();
        let value = fold(
            &mut comp,
            &ExpressionSyntax::concat(vec![
                ExpressionSyntax::replicate(lit("2"), lit("4'b1010")),
                lit("4'b0101"),
            ]),
        );
        let v = value.integer().unwrap();
        assert_eq!(v.width(), 12);
        assert_eq!(v.as_u64(), Some(0b1010_1010_0101));
    }

    #[test]
    fn test_used_value_of_assignment_is_converted_value() {
        let mut comp = Compilation::new();
        comp.add_member(MemberSyntax::variable(
            "v",
            DataTypeSyntax::logic_vector(3, 0),
            None,
        ));
        let root = comp.root();
        let ctx = BindContext::definition(root);
        let assign = {
            let mut binder = Binder::new(&mut comp);
            binder.bind_self_determined(
                &ExpressionSyntax::assign(ExpressionSyntax::ident("v"), lit("8'hff")),
                &ctx,
            )
        };
        let mut ectx = EvalContext::new(&comp, EvalOptions::script());
        let value = ectx.eval(&assign);
        // The stored (and yielded) value is the truncated 4-bit result.
        assert_eq!(value.integer().unwrap().width(), 4);
        assert_eq!(value.integer().unwrap().as_u64(), Some(0xf));
    }

    #[test]
    fn test_unknown_shift_amount_is_all_x() {
        let mut comp = Compilation::new();
        let value = fold(
            &mut comp,
            &ExpressionSyntax::binary(
                BinaryOp::LogicalShiftLeft,
                lit("8'd3"),
                lit("4'b00x0"),
            ),
        );
        let v = value.integer().unwrap();
        assert!(v.has_unknown());
        assert_eq!(v.width(), 8);
    }
}
