//! The binder: syntax in, typed trees out.
//!
//! Expressions are built bottom-up in self-determined mode, each node
//! acquiring a provisional type from its operands. Context-determined
//! propagation then widens arithmetic and bitwise subtrees to the width and
//! signedness the surrounding expression requires, inserting `Conversion`
//! nodes at the boundaries where an operand stays self-determined (shift
//! amounts, comparisons, concatenation operands). Binding failures are
//! reported once and replaced with `Invalid` nodes; every operator
//! short-circuits on an `Invalid` operand without further diagnostics.

use crate::builtins::SystemFunc;
use crate::diagnostics::DiagCode;
use crate::eval::{EvalContext, EvalOptions};
use crate::expr::{BoundRange, CaseItem, Expression, ExpressionKind, Statement, StatementKind};
use crate::symbols::{Compilation, LookupKind, SymbolId, SymbolKind};
use crate::syntax::{
    ArgDirection, BinaryOp, CaseItemSyntax, DataTypeSyntax, EnumMemberSyntax, ExpressionSyntax,
    MemberSyntax, RangeSelectKind, RangeSyntax, SourceLocation, StatementSyntax, StructFieldSyntax,
    TypeKeyword, UnaryOp,
};
use crate::types::{Compat, ConstantRange, EnumMemberInfo, FieldInfo, TypeId, TypeKind};
use sv_core::{ConstantValue, SvInt};
use tracing::trace;

/// Where and how an expression is being bound.
#[derive(Debug, Clone, Copy)]
pub struct BindContext {
    /// Scope lookups start from.
    pub scope: SymbolId,
    pub lookup: LookupKind,
    /// The enclosing subroutine, if binding inside one.
    pub subroutine: Option<SymbolId>,
    /// Constant-required context: evaluation diagnostics get promoted.
    pub constant: bool,
}

impl BindContext {
    pub fn definition(scope: SymbolId) -> BindContext {
        BindContext {
            scope,
            lookup: LookupKind::Definition,
            subroutine: None,
            constant: false,
        }
    }

    pub fn constant(scope: SymbolId) -> BindContext {
        BindContext {
            constant: true,
            ..BindContext::definition(scope)
        }
    }

    pub fn in_subroutine(mut self, subroutine: SymbolId) -> BindContext {
        self.subroutine = Some(subroutine);
        self.lookup = LookupKind::Procedural;
        self
    }

    fn with_scope(mut self, scope: SymbolId) -> BindContext {
        self.scope = scope;
        self
    }
}

/// Stateless worker over a compilation; construct one per binding request.
pub struct Binder<'c> {
    comp: &'c mut Compilation,
}

impl<'c> Binder<'c> {
    pub fn new(comp: &'c mut Compilation) -> Binder<'c> {
        Binder { comp }
    }

    fn error_type(&self) -> TypeId {
        self.comp.types.builtins.error
    }

    fn invalid(&self, child: Option<Expression>, loc: SourceLocation) -> Expression {
        Expression::invalid(self.comp.types.builtins.error, child, loc)
    }

    /// True for integral shapes that take part in width propagation
    /// (scalars and packed vectors, not enums or structs).
    fn is_plain_integral(&self, ty: TypeId) -> bool {
        matches!(
            self.comp.types.kind(self.comp.types.canonical(ty)),
            TypeKind::Integral { .. } | TypeKind::PackedArray { .. }
        )
    }

    // -----------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------

    /// Bind an expression whose type is determined solely by its operands.
    pub fn bind_self_determined(
        &mut self,
        syntax: &ExpressionSyntax,
        ctx: &BindContext,
    ) -> Expression {
        self.bind_expr(syntax, ctx)
    }

    /// Bind an expression typed and width-adjusted to an assignment target.
    pub fn bind_assignment_like(
        &mut self,
        lhs_ty: TypeId,
        syntax: &ExpressionSyntax,
        ctx: &BindContext,
    ) -> Expression {
        let expr = self.bind_expr(syntax, ctx);
        self.convert_assignment(lhs_ty, expr, syntax.loc())
    }

    pub fn bind_statement_list(
        &mut self,
        list: &[StatementSyntax],
        ctx: &BindContext,
    ) -> Vec<Statement> {
        list.iter().map(|s| self.bind_statement(s, ctx)).collect()
    }

    // -----------------------------------------------------------------
    // Conversions and propagation
    // -----------------------------------------------------------------

    /// Convert `expr` for assignment into a target of type `target`,
    /// diagnosing incompatibility and warning on narrowing.
    fn convert_assignment(
        &mut self,
        target: TypeId,
        expr: Expression,
        loc: SourceLocation,
    ) -> Expression {
        if expr.is_invalid() || self.comp.types.is_error(target) {
            return expr;
        }
        match self.comp.types.assignable(target, expr.ty) {
            Compat::Implicit => {
                if let (Some((tw, _, _)), Some((ew, _, _))) = (
                    self.comp.types.integral_traits(target),
                    self.comp.types.integral_traits(expr.ty),
                ) && tw < ew
                {
                    self.comp
                        .diags
                        .add(DiagCode::WidthMismatch, loc, vec![ew.into(), tw.into()]);
                }
                self.convert(target, expr, true)
            }
            Compat::Explicit | Compat::Incompatible => {
                let from = self.comp.types.describe(expr.ty);
                let to = self.comp.types.describe(target);
                self.comp
                    .diags
                    .add(DiagCode::TypeMismatch, loc, vec![from.into(), to.into()]);
                self.invalid(Some(expr), loc)
            }
        }
    }

    /// Convert `expr` to `target`, propagating the context-determined type
    /// into integral subtrees and inserting a `Conversion` node otherwise.
    fn convert(&mut self, target: TypeId, expr: Expression, implicit: bool) -> Expression {
        if self.comp.types.equivalent(target, expr.ty) {
            return expr;
        }
        if self.is_plain_integral(target) && self.is_plain_integral(expr.ty) {
            return self.propagate_type(expr, target);
        }
        let loc = expr.loc;
        Expression::new(
            target,
            ExpressionKind::Conversion {
                implicit,
                operand: Box::new(expr),
            },
            loc,
        )
    }

    /// The context-determined pass: push `ty` down through operators whose
    /// operands share the result type. Self-determined positions get a
    /// `Conversion` at the boundary instead.
    fn propagate_type(&mut self, expr: Expression, ty: TypeId) -> Expression {
        if expr.ty == ty || expr.is_invalid() {
            return expr;
        }
        let Some((w, s, _f)) = self.comp.types.integral_traits(ty) else {
            return expr;
        };
        let loc = expr.loc;
        match expr.kind {
            ExpressionKind::IntegerLiteral(v) => {
                // Literals re-size in place; extension follows the
                // signedness of the context type.
                let resized = if w >= v.width() {
                    v.extend(w, s)
                } else {
                    v.truncate(w)
                };
                Expression::new(
                    ty,
                    ExpressionKind::IntegerLiteral(resized.with_signed(s)),
                    loc,
                )
            }
            ExpressionKind::Unary { op, operand }
                if matches!(op, UnaryOp::Plus | UnaryOp::Minus | UnaryOp::BitwiseNot) =>
            {
                let operand = self.propagate_type(*operand, ty);
                Expression::new(
                    ty,
                    ExpressionKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    loc,
                )
            }
            ExpressionKind::Binary { op, left, right }
                if op.is_arithmetic_or_bitwise() =>
            {
                let left = self.propagate_type(*left, ty);
                let right = self.propagate_type(*right, ty);
                Expression::new(
                    ty,
                    ExpressionKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    loc,
                )
            }
            ExpressionKind::Binary { op, left, right }
                if op.is_shift() || op == BinaryOp::Power =>
            {
                // The right operand is self-determined and stays put.
                let left = self.propagate_type(*left, ty);
                Expression::new(
                    ty,
                    ExpressionKind::Binary {
                        op,
                        left: Box::new(left),
                        right,
                    },
                    loc,
                )
            }
            ExpressionKind::Conditional {
                cond,
                if_true,
                if_false,
            } => {
                let if_true = self.propagate_type(*if_true, ty);
                let if_false = self.propagate_type(*if_false, ty);
                Expression::new(
                    ty,
                    ExpressionKind::Conditional {
                        cond,
                        if_true: Box::new(if_true),
                        if_false: Box::new(if_false),
                    },
                    loc,
                )
            }
            kind => {
                // Comparisons, selects, concatenations, calls, named values:
                // self-determined boundaries get an explicit width change.
                let operand = Expression { ty: expr.ty, loc, kind };
                Expression::new(
                    ty,
                    ExpressionKind::Conversion {
                        implicit: true,
                        operand: Box::new(operand),
                    },
                    loc,
                )
            }
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn bind_expr(&mut self, syntax: &ExpressionSyntax, ctx: &BindContext) -> Expression {
        trace!(kind = ?syntax.kind(), "binding expression");
        match syntax {
            ExpressionSyntax::IntegerLiteral {
                width,
                signed,
                base,
                digits,
                loc,
            } => self.bind_integer_literal(*width, *signed, *base, digits, *loc),
            ExpressionSyntax::RealLiteral { value, loc } => Expression::new(
                self.comp.types.builtins.real,
                ExpressionKind::RealLiteral(*value),
                *loc,
            ),
            ExpressionSyntax::StringLiteral { value, loc } => Expression::new(
                self.comp.types.builtins.string,
                ExpressionKind::StringLiteral(value.clone()),
                *loc,
            ),
            ExpressionSyntax::UnboundedLiteral { loc } => Expression::new(
                self.comp.types.builtins.int,
                ExpressionKind::UnboundedLiteral,
                *loc,
            ),
            ExpressionSyntax::Identifier { name, loc } => {
                match self
                    .comp
                    .lookup_unqualified(name, ctx.scope, ctx.lookup, *loc)
                {
                    None => {
                        self.comp.diags.add(
                            DiagCode::UndeclaredIdentifier,
                            *loc,
                            vec![name.as_str().into()],
                        );
                        self.invalid(None, *loc)
                    }
                    Some(symbol) => self.bind_named_value(symbol, false, *loc),
                }
            }
            ExpressionSyntax::Hierarchical { parts, loc } => {
                match self.comp.lookup_qualified(parts, ctx.scope, *loc) {
                    None => self.invalid(None, *loc),
                    Some(symbol) => {
                        let hierarchical = self.is_hierarchical_ref(symbol, ctx.scope);
                        self.bind_named_value(symbol, hierarchical, *loc)
                    }
                }
            }
            ExpressionSyntax::Unary { op, operand, loc } => {
                let operand = self.bind_expr(operand, ctx);
                self.make_unary(*op, operand, *loc)
            }
            ExpressionSyntax::Binary {
                op,
                left,
                right,
                loc,
            } => {
                let left = self.bind_expr(left, ctx);
                let right = self.bind_expr(right, ctx);
                self.make_binary(*op, left, right, *loc)
            }
            ExpressionSyntax::Conditional {
                cond,
                if_true,
                if_false,
                loc,
            } => self.bind_conditional(cond, if_true, if_false, ctx, *loc),
            ExpressionSyntax::Assignment {
                target,
                value,
                op,
                loc,
            } => self.bind_assignment(target, value, *op, ctx, *loc),
            ExpressionSyntax::ElementSelect { value, index, loc } => {
                self.bind_element_select(value, index, ctx, *loc)
            }
            ExpressionSyntax::RangeSelect {
                value,
                kind,
                left,
                right,
                loc,
            } => self.bind_range_select(value, *kind, left, right, ctx, *loc),
            ExpressionSyntax::MemberAccess { value, member, loc } => {
                self.bind_member_access(value, member, ctx, *loc)
            }
            ExpressionSyntax::Call { name, args, loc } => self.bind_call(name, args, ctx, *loc),
            ExpressionSyntax::Concat { operands, loc } => self.bind_concat(operands, ctx, *loc),
            ExpressionSyntax::Replication {
                count,
                operand,
                loc,
            } => self.bind_replication(count, operand, ctx, *loc),
            ExpressionSyntax::Cast { ty, operand, loc } => {
                let target = self.resolve_type(ty, ctx);
                let operand = self.bind_expr(operand, ctx);
                if operand.is_invalid() {
                    return operand;
                }
                match self.comp.types.assignable(target, operand.ty) {
                    Compat::Incompatible => {
                        let from = self.comp.types.describe(operand.ty);
                        let to = self.comp.types.describe(target);
                        self.comp.diags.add(
                            DiagCode::TypeMismatch,
                            *loc,
                            vec![from.into(), to.into()],
                        );
                        self.invalid(Some(operand), *loc)
                    }
                    _ => Expression::new(
                        target,
                        ExpressionKind::Conversion {
                            implicit: false,
                            operand: Box::new(operand),
                        },
                        *loc,
                    ),
                }
            }
        }
    }

    fn bind_integer_literal(
        &mut self,
        width: Option<u32>,
        signed: bool,
        base: sv_core::LiteralBase,
        digits: &str,
        loc: SourceLocation,
    ) -> Expression {
        match width {
            // Unsized literals take type int.
            None => match SvInt::from_literal(32, true, base, digits) {
                Ok(value) => Expression::new(
                    self.comp.types.builtins.int,
                    ExpressionKind::IntegerLiteral(value),
                    loc,
                ),
                Err(err) => {
                    self.comp.diags.add(
                        DiagCode::InvalidLiteral,
                        loc,
                        vec![err.to_string().into()],
                    );
                    self.invalid(None, loc)
                }
            },
            // Sized based literals are four-state (logic) vectors.
            Some(w) => match SvInt::from_literal(w, signed, base, digits) {
                Ok(value) => {
                    let ty = self.comp.types.integral(w, signed, true);
                    Expression::new(ty, ExpressionKind::IntegerLiteral(value), loc)
                }
                Err(err) => {
                    self.comp.diags.add(
                        DiagCode::InvalidLiteral,
                        loc,
                        vec![err.to_string().into()],
                    );
                    self.invalid(None, loc)
                }
            },
        }
    }

    fn bind_named_value(
        &mut self,
        symbol: SymbolId,
        hierarchical: bool,
        loc: SourceLocation,
    ) -> Expression {
        let ty = match &self.comp.symbol(symbol).kind {
            SymbolKind::Variable { ty, .. }
            | SymbolKind::FormalArg { ty, .. }
            | SymbolKind::EnumMember { ty, .. } => *ty,
            SymbolKind::Parameter { .. } => self.comp.parameter_type(symbol),
            _ => {
                let name = self.comp.symbol(symbol).name.clone();
                self.comp
                    .diags
                    .add(DiagCode::NotAValue, loc, vec![name.into()]);
                return self.invalid(None, loc);
            }
        };
        Expression::new(
            ty,
            ExpressionKind::NamedValue {
                symbol,
                hierarchical,
            },
            loc,
        )
    }

    /// A dotted reference is hierarchical when it reaches through a module
    /// that does not enclose the referencing scope. Package-qualified names
    /// stay constant-friendly.
    fn is_hierarchical_ref(&self, symbol: SymbolId, origin: SymbolId) -> bool {
        let mut enclosing = Vec::new();
        let mut cur = Some(origin);
        while let Some(s) = cur {
            enclosing.push(s);
            cur = self.comp.symbol(s).parent;
        }
        let mut cur = self.comp.symbol(symbol).parent;
        while let Some(s) = cur {
            if matches!(self.comp.symbol(s).kind, SymbolKind::Module { .. })
                && !enclosing.contains(&s)
            {
                return true;
            }
            cur = self.comp.symbol(s).parent;
        }
        false
    }

    fn make_unary(&mut self, op: UnaryOp, operand: Expression, loc: SourceLocation) -> Expression {
        if operand.is_invalid() {
            return self.invalid(Some(operand), loc);
        }
        let types = &mut self.comp.types;
        let integral = types.integral_traits(operand.ty);
        let ty = match op {
            UnaryOp::Plus | UnaryOp::Minus => {
                if integral.is_some() || types.is_real(operand.ty) {
                    operand.ty
                } else {
                    return self.type_mismatch_unary(operand, loc);
                }
            }
            UnaryOp::BitwiseNot => match integral {
                Some(_) => operand.ty,
                None => return self.type_mismatch_unary(operand, loc),
            },
            UnaryOp::LogicalNot => {
                if !self.is_boolean_convertible(operand.ty) {
                    return self.type_mismatch_unary(operand, loc);
                }
                self.one_bit_result(&[&operand])
            }
            op if op.is_reduction() => match integral {
                Some(_) => self.one_bit_result(&[&operand]),
                None => return self.type_mismatch_unary(operand, loc),
            },
            // Increment and decrement require an assignable target.
            _ => {
                if !self.is_lvalue(&operand) {
                    self.comp.diags.add(DiagCode::InvalidLValue, loc, vec![]);
                    return self.invalid(Some(operand), loc);
                }
                if integral.is_none() && !self.comp.types.is_real(operand.ty) {
                    return self.type_mismatch_unary(operand, loc);
                }
                let ty = operand.ty;
                return Expression::new(
                    ty,
                    ExpressionKind::IncDec {
                        target: Box::new(operand),
                        increment: matches!(op, UnaryOp::Preincrement | UnaryOp::Postincrement),
                        postfix: matches!(op, UnaryOp::Postincrement | UnaryOp::Postdecrement),
                    },
                    loc,
                );
            }
        };
        Expression::new(
            ty,
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
            loc,
        )
    }

    fn type_mismatch_unary(&mut self, operand: Expression, loc: SourceLocation) -> Expression {
        let desc = self.comp.types.describe(operand.ty);
        self.comp.diags.add(
            DiagCode::TypeMismatch,
            loc,
            vec![desc.into(), "an integral or real operand".into()],
        );
        self.invalid(Some(operand), loc)
    }

    /// 1-bit result type: logic if any operand is four-state, else bit.
    fn one_bit_result(&mut self, operands: &[&Expression]) -> TypeId {
        let four = operands.iter().any(|e| {
            self.comp
                .types
                .integral_traits(e.ty)
                .is_some_and(|(_, _, f)| f)
        });
        if four {
            self.comp.types.builtins.logic
        } else {
            self.comp.types.builtins.bit
        }
    }

    fn is_boolean_convertible(&self, ty: TypeId) -> bool {
        self.comp.types.integral_traits(ty).is_some()
            || self.comp.types.is_real(ty)
            || self.comp.types.is_string(ty)
    }

    fn type_mismatch_binary(
        &mut self,
        left: Expression,
        right: Expression,
        loc: SourceLocation,
    ) -> Expression {
        let l = self.comp.types.describe(left.ty);
        let r = self.comp.types.describe(right.ty);
        self.comp
            .diags
            .add(DiagCode::TypeMismatch, loc, vec![l.into(), r.into()]);
        self.invalid(Some(left), loc)
    }

    fn make_binary(
        &mut self,
        op: BinaryOp,
        left: Expression,
        right: Expression,
        loc: SourceLocation,
    ) -> Expression {
        if left.is_invalid() || right.is_invalid() {
            return self.invalid(None, loc);
        }
        if op.is_arithmetic_or_bitwise() {
            let Some(common) = self.comp.types.common_type(left.ty, right.ty, false) else {
                return self.type_mismatch_binary(left, right, loc);
            };
            // Mod and the bitwise family have no real-number meaning.
            if self.comp.types.is_real(common)
                && !matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
            {
                return self.type_mismatch_binary(left, right, loc);
            }
            let left = self.convert(common, left, true);
            let right = self.convert(common, right, true);
            return Expression::new(
                common,
                ExpressionKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                loc,
            );
        }
        if op == BinaryOp::Power {
            if self.comp.types.is_real(left.ty) || self.comp.types.is_real(right.ty) {
                let real = self.comp.types.builtins.real;
                let left = self.convert(real, left, true);
                let right = self.convert(real, right, true);
                return Expression::new(
                    real,
                    ExpressionKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    loc,
                );
            }
            let (Some((lw, ls, lf)), Some((_, _, rf))) = (
                self.comp.types.integral_traits(left.ty),
                self.comp.types.integral_traits(right.ty),
            ) else {
                return self.type_mismatch_binary(left, right, loc);
            };
            // Power takes the left operand's type; the exponent stays
            // self-determined.
            let ty = self.comp.types.integral(lw, ls, lf || rf);
            let left = self.propagate_type(left, ty);
            return Expression::new(
                ty,
                ExpressionKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                loc,
            );
        }
        if op.is_shift() {
            let (Some((lw, ls, lf)), Some((_, _, rf))) = (
                self.comp.types.integral_traits(left.ty),
                self.comp.types.integral_traits(right.ty),
            ) else {
                return self.type_mismatch_binary(left, right, loc);
            };
            // Shift result type comes from the left operand alone; an
            // unknown shift amount still makes the result four-state.
            let ty = self.comp.types.integral(lw, ls, lf || rf);
            let left = self.propagate_type(left, ty);
            return Expression::new(
                ty,
                ExpressionKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                loc,
            );
        }
        if op.is_comparison() {
            if self.comp.types.is_string(left.ty) && self.comp.types.is_string(right.ty) {
                let bit = self.comp.types.builtins.bit;
                return Expression::new(
                    bit,
                    ExpressionKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    loc,
                );
            }
            let Some(common) = self.comp.types.common_type(left.ty, right.ty, false) else {
                return self.type_mismatch_binary(left, right, loc);
            };
            let ty = if matches!(op, BinaryOp::CaseEquality | BinaryOp::CaseInequality) {
                // Case equality always yields a known 0/1.
                self.comp.types.builtins.bit
            } else if self.comp.types.is_real(common) {
                self.comp.types.builtins.bit
            } else {
                self.one_bit_result(&[&left, &right])
            };
            // Operands still share a common type for the comparison itself.
            let left = self.convert(common, left, true);
            let right = self.convert(common, right, true);
            return Expression::new(
                ty,
                ExpressionKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                loc,
            );
        }
        // Logical operators: each operand is its own 1-bit condition.
        if !self.is_boolean_convertible(left.ty) || !self.is_boolean_convertible(right.ty) {
            return self.type_mismatch_binary(left, right, loc);
        }
        let ty = self.one_bit_result(&[&left, &right]);
        Expression::new(
            ty,
            ExpressionKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            loc,
        )
    }

    fn bind_conditional(
        &mut self,
        cond: &ExpressionSyntax,
        if_true: &ExpressionSyntax,
        if_false: &ExpressionSyntax,
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Expression {
        let cond = self.bind_expr(cond, ctx);
        let if_true = self.bind_expr(if_true, ctx);
        let if_false = self.bind_expr(if_false, ctx);
        if cond.is_invalid() || if_true.is_invalid() || if_false.is_invalid() {
            return self.invalid(None, loc);
        }
        if !self.is_boolean_convertible(cond.ty) {
            let desc = self.comp.types.describe(cond.ty);
            self.comp.diags.add(
                DiagCode::TypeMismatch,
                cond.loc,
                vec![desc.into(), "a 1-bit condition".into()],
            );
            return self.invalid(Some(cond), loc);
        }
        let ty = match self.comp.types.common_type(if_true.ty, if_false.ty, false) {
            Some(common) => common,
            None if self.comp.types.equivalent(if_true.ty, if_false.ty) => if_true.ty,
            None => {
                return self.type_mismatch_binary(if_true, if_false, loc);
            }
        };
        let if_true = self.convert(ty, if_true, true);
        let if_false = self.convert(ty, if_false, true);
        Expression::new(
            ty,
            ExpressionKind::Conditional {
                cond: Box::new(cond),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
            },
            loc,
        )
    }

    fn bind_assignment(
        &mut self,
        target: &ExpressionSyntax,
        value: &ExpressionSyntax,
        compound: Option<BinaryOp>,
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Expression {
        let target = self.bind_expr(target, ctx);
        if target.is_invalid() {
            return self.invalid(Some(target), loc);
        }
        if !self.is_lvalue(&target) {
            self.comp.diags.add(DiagCode::InvalidLValue, loc, vec![]);
            return self.invalid(Some(target), loc);
        }
        let value = match compound {
            None => self.bind_assignment_like(target.ty, value, ctx),
            Some(op) => {
                // Compound assignment reads the target, combines, writes
                // back: lower to target = target op value.
                let rhs = self.bind_expr(value, ctx);
                let combined = self.make_binary(op, target.clone(), rhs, loc);
                self.convert_assignment(target.ty, combined, loc)
            }
        };
        let ty = target.ty;
        Expression::new(
            ty,
            ExpressionKind::Assignment {
                target: Box::new(target),
                value: Box::new(value),
            },
            loc,
        )
    }

    /// An expression denotes storage when it is a (non-hierarchical)
    /// variable or formal, possibly behind selects and member accesses.
    fn is_lvalue(&self, expr: &Expression) -> bool {
        match &expr.kind {
            ExpressionKind::NamedValue {
                symbol,
                hierarchical,
            } => {
                !hierarchical
                    && matches!(
                        self.comp.symbol(*symbol).kind,
                        SymbolKind::Variable { .. } | SymbolKind::FormalArg { .. }
                    )
            }
            ExpressionKind::ElementSelect { value, .. }
            | ExpressionKind::RangeSelect { value, .. }
            | ExpressionKind::MemberAccess { value, .. } => self.is_lvalue(value),
            _ => false,
        }
    }

    fn bind_element_select(
        &mut self,
        value: &ExpressionSyntax,
        index: &ExpressionSyntax,
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Expression {
        let value = self.bind_expr(value, ctx);
        let index = self.bind_expr(index, ctx);
        if value.is_invalid() || index.is_invalid() {
            return self.invalid(None, loc);
        }
        if self.comp.types.integral_traits(index.ty).is_none() {
            let desc = self.comp.types.describe(index.ty);
            self.comp.diags.add(
                DiagCode::TypeMismatch,
                index.loc,
                vec![desc.into(), "an integral index".into()],
            );
            return self.invalid(Some(index), loc);
        }
        let canonical = self.comp.types.canonical(value.ty);
        let elem_ty = match self.comp.types.kind(canonical).clone() {
            TypeKind::PackedArray { elem, .. } => elem,
            TypeKind::UnpackedArray { elem, .. } => elem,
            TypeKind::Str => self.comp.types.builtins.byte,
            TypeKind::Integral { four_state, .. } => {
                if four_state {
                    self.comp.types.builtins.logic
                } else {
                    self.comp.types.builtins.bit
                }
            }
            TypeKind::Enum { base, .. } => {
                let (_, _, four) = self.comp.types.integral_traits(base).unwrap_or((1, false, true));
                if four {
                    self.comp.types.builtins.logic
                } else {
                    self.comp.types.builtins.bit
                }
            }
            _ => {
                let desc = self.comp.types.describe(value.ty);
                self.comp
                    .diags
                    .add(DiagCode::InvalidSelect, loc, vec![desc.into()]);
                return self.invalid(Some(value), loc);
            }
        };
        Expression::new(
            elem_ty,
            ExpressionKind::ElementSelect {
                value: Box::new(value),
                index: Box::new(index),
            },
            loc,
        )
    }

    /// Width in bits of one element of the outermost dimension.
    fn select_elem_bits(&self, ty: TypeId) -> u32 {
        match self.comp.types.kind(self.comp.types.canonical(ty)) {
            TypeKind::PackedArray { elem, .. } => {
                self.comp
                    .types
                    .integral_traits(*elem)
                    .map(|(w, _, _)| w)
                    .unwrap_or(1)
            }
            _ => 1,
        }
    }

    /// The declared range of the outermost dimension, `[w-1:0]` for plain
    /// integrals.
    fn select_range(&self, ty: TypeId) -> Option<ConstantRange> {
        match self.comp.types.kind(self.comp.types.canonical(ty)) {
            TypeKind::PackedArray { range, .. } | TypeKind::UnpackedArray { range, .. } => {
                Some(*range)
            }
            TypeKind::Integral { width, .. } => Some(ConstantRange::new(*width as i64 - 1, 0)),
            TypeKind::Enum { base, .. } => self.select_range(*base),
            _ => None,
        }
    }

    fn bind_range_select(
        &mut self,
        value: &ExpressionSyntax,
        kind: RangeSelectKind,
        left: &ExpressionSyntax,
        right: &ExpressionSyntax,
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Expression {
        let value = self.bind_expr(value, ctx);
        if value.is_invalid() {
            return self.invalid(Some(value), loc);
        }
        let Some(declared) = self.select_range(value.ty) else {
            let desc = self.comp.types.describe(value.ty);
            self.comp
                .diags
                .add(DiagCode::InvalidSelect, loc, vec![desc.into()]);
            return self.invalid(Some(value), loc);
        };
        let elem_bits = self.select_elem_bits(value.ty);
        let (_, _, four) = self
            .comp
            .types
            .integral_traits(value.ty)
            .unwrap_or((1, false, true));
        match kind {
            RangeSelectKind::Simple => {
                let (Some(l), Some(r)) = (
                    self.fold_to_i64(left, ctx),
                    self.fold_to_i64(right, ctx),
                ) else {
                    return self.invalid(Some(value), loc);
                };
                // Select direction must match the declared range.
                let descending = declared.left >= declared.right;
                if (descending && l < r) || (!descending && l > r) {
                    self.comp.diags.add(
                        DiagCode::InvalidSelect,
                        loc,
                        vec![format!("[{}:{}]", l, r).into()],
                    );
                    return self.invalid(Some(value), loc);
                }
                let range = ConstantRange::new(l, r);
                let Some(width) =
                    self.check_width(range.width() as u64 * elem_bits as u64, loc)
                else {
                    return self.invalid(Some(value), loc);
                };
                let ty = self.comp.types.integral(width, false, four);
                Expression::new(
                    ty,
                    ExpressionKind::RangeSelect {
                        value: Box::new(value),
                        range: BoundRange::Constant(range),
                    },
                    loc,
                )
            }
            RangeSelectKind::IndexedUp | RangeSelectKind::IndexedDown => {
                let Some(count) = self.fold_to_i64(right, ctx) else {
                    return self.invalid(Some(value), loc);
                };
                if count < 1 {
                    self.comp.diags.add(
                        DiagCode::InvalidSelect,
                        loc,
                        vec![format!("width {}", count).into()],
                    );
                    return self.invalid(Some(value), loc);
                }
                let base = self.bind_expr(left, ctx);
                if base.is_invalid() {
                    return self.invalid(Some(base), loc);
                }
                let Some(width) =
                    self.check_width(count as u64 * elem_bits as u64, loc)
                else {
                    return self.invalid(Some(value), loc);
                };
                let count = count as u32;
                let ty = self.comp.types.integral(width, false, four);
                let range = if kind == RangeSelectKind::IndexedUp {
                    BoundRange::IndexedUp {
                        base: Box::new(base),
                        width: count,
                    }
                } else {
                    BoundRange::IndexedDown {
                        base: Box::new(base),
                        width: count,
                    }
                };
                Expression::new(
                    ty,
                    ExpressionKind::RangeSelect {
                        value: Box::new(value),
                        range,
                    },
                    loc,
                )
            }
        }
    }

    fn bind_member_access(
        &mut self,
        value: &ExpressionSyntax,
        member: &str,
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Expression {
        let value = self.bind_expr(value, ctx);
        if value.is_invalid() {
            return self.invalid(Some(value), loc);
        }
        let canonical = self.comp.types.canonical(value.ty);
        match self.comp.types.kind(canonical) {
            TypeKind::Struct { fields, .. } => {
                match fields.iter().enumerate().find(|(_, f)| f.name == member) {
                    Some((index, field)) => {
                        let ty = field.ty;
                        let offset = field.offset;
                        Expression::new(
                            ty,
                            ExpressionKind::MemberAccess {
                                value: Box::new(value),
                                member: member.to_string(),
                                field_index: index,
                                offset,
                            },
                            loc,
                        )
                    }
                    None => {
                        self.comp.diags.add(
                            DiagCode::UndeclaredIdentifier,
                            loc,
                            vec![member.into()],
                        );
                        self.invalid(Some(value), loc)
                    }
                }
            }
            _ => {
                let desc = self.comp.types.describe(value.ty);
                self.comp
                    .diags
                    .add(DiagCode::InvalidSelect, loc, vec![desc.into()]);
                self.invalid(Some(value), loc)
            }
        }
    }

    fn bind_call(
        &mut self,
        name: &str,
        args: &[ExpressionSyntax],
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Expression {
        if name.starts_with('$') {
            let Some(func) = SystemFunc::from_name(name) else {
                self.comp.diags.add(
                    DiagCode::UnknownSystemFunction,
                    loc,
                    vec![name.into()],
                );
                return self.invalid(None, loc);
            };
            if args.len() != func.arg_count() {
                self.comp.diags.add(
                    DiagCode::WrongArgCount,
                    loc,
                    vec![func.arg_count().into(), args.len().into()],
                );
                return self.invalid(None, loc);
            }
            let bound: Vec<Expression> = args.iter().map(|a| self.bind_expr(a, ctx)).collect();
            if bound.iter().any(|a| a.is_invalid()) {
                return self.invalid(None, loc);
            }
            let Some(ty) = func.result_type(&mut self.comp.types, &bound) else {
                let desc = self.comp.types.describe(bound[0].ty);
                self.comp.diags.add(
                    DiagCode::TypeMismatch,
                    loc,
                    vec![desc.into(), func.name().into()],
                );
                return self.invalid(None, loc);
            };
            return Expression::new(
                ty,
                ExpressionKind::SystemCall {
                    function: func,
                    args: bound,
                },
                loc,
            );
        }
        let Some(symbol) =
            self.comp
                .lookup_unqualified(name, ctx.scope, LookupKind::Definition, loc)
        else {
            self.comp.diags.add(
                DiagCode::UndeclaredIdentifier,
                loc,
                vec![name.into()],
            );
            return self.invalid(None, loc);
        };
        if !matches!(self.comp.symbol(symbol).kind, SymbolKind::Subroutine { .. }) {
            self.comp
                .diags
                .add(DiagCode::NotASubroutine, loc, vec![name.into()]);
            return self.invalid(None, loc);
        }
        let formals = self.comp.subroutine_args(symbol);
        if args.len() != formals.len() {
            self.comp.diags.add(
                DiagCode::WrongArgCount,
                loc,
                vec![formals.len().into(), args.len().into()],
            );
            return self.invalid(None, loc);
        }
        let mut bound = Vec::with_capacity(args.len());
        let mut failed = false;
        for (arg, &formal) in args.iter().zip(&formals) {
            let (ty, direction) = match &self.comp.symbol(formal).kind {
                SymbolKind::FormalArg { ty, direction } => (*ty, *direction),
                _ => (self.error_type(), ArgDirection::In),
            };
            let expr = match direction {
                ArgDirection::In => self.bind_assignment_like(ty, arg, ctx),
                ArgDirection::Out | ArgDirection::InOut | ArgDirection::Ref => {
                    let expr = self.bind_expr(arg, ctx);
                    if !expr.is_invalid() && !self.is_lvalue(&expr) {
                        self.comp
                            .diags
                            .add(DiagCode::InvalidLValue, expr.loc, vec![]);
                        failed = true;
                    }
                    expr
                }
            };
            failed |= expr.is_invalid();
            bound.push(expr);
        }
        if failed {
            return self.invalid(None, loc);
        }
        // Bind the body now so evaluation finds it cached. Recursive calls
        // mid-binding are fine; the outer bind completes the cache.
        self.comp.bind_subroutine_body(symbol);
        let ty = self.comp.subroutine_return_type(symbol);
        Expression::new(
            ty,
            ExpressionKind::Call {
                subroutine: symbol,
                args: bound,
            },
            loc,
        )
    }

    fn bind_concat(
        &mut self,
        operands: &[ExpressionSyntax],
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Expression {
        let mut bound = Vec::with_capacity(operands.len());
        for op in operands {
            // Zero replications are legal only here: they vanish entirely.
            if let ExpressionSyntax::Replication { count, .. } = op
                && let Some(0) = self.fold_to_i64_quiet(count, ctx)
            {
                continue;
            }
            bound.push(self.bind_expr(op, ctx));
        }
        if bound.iter().any(|b| b.is_invalid()) {
            return self.invalid(None, loc);
        }
        if bound.is_empty() {
            self.comp
                .diags
                .add(DiagCode::InvalidReplication, loc, vec![]);
            return self.invalid(None, loc);
        }
        if bound.iter().all(|b| self.comp.types.is_string(b.ty)) {
            let string = self.comp.types.builtins.string;
            return Expression::new(string, ExpressionKind::Concat { operands: bound }, loc);
        }
        let mut total = 0u64;
        let mut four = false;
        for b in &bound {
            match self.comp.types.integral_traits(b.ty) {
                Some((w, _, f)) => {
                    total += w as u64;
                    four |= f;
                }
                None => {
                    let desc = self.comp.types.describe(b.ty);
                    self.comp.diags.add(
                        DiagCode::TypeMismatch,
                        b.loc,
                        vec![desc.into(), "a packed operand".into()],
                    );
                    return self.invalid(None, loc);
                }
            }
        }
        let Some(total) = self.check_width(total, loc) else {
            return self.invalid(None, loc);
        };
        // Concatenation results are always unsigned.
        let ty = self.comp.types.integral(total, false, four);
        Expression::new(ty, ExpressionKind::Concat { operands: bound }, loc)
    }

    /// A replication reached outside a concatenation; zero counts were
    /// already consumed by `bind_concat`, so anything below one is an error.
    fn bind_replication(
        &mut self,
        count: &ExpressionSyntax,
        operand: &ExpressionSyntax,
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Expression {
        let Some(n) = self.fold_to_i64(count, ctx) else {
            return self.invalid(None, loc);
        };
        if n < 1 {
            self.comp
                .diags
                .add(DiagCode::InvalidReplication, loc, vec![]);
            return self.invalid(None, loc);
        }
        let operand = self.bind_expr(operand, ctx);
        if operand.is_invalid() {
            return self.invalid(Some(operand), loc);
        }
        let Some((w, _, f)) = self.comp.types.integral_traits(operand.ty) else {
            let desc = self.comp.types.describe(operand.ty);
            self.comp.diags.add(
                DiagCode::TypeMismatch,
                operand.loc,
                vec![desc.into(), "a packed operand".into()],
            );
            return self.invalid(Some(operand), loc);
        };
        let Some(width) = self.check_width(w as u64 * n as u64, loc) else {
            return self.invalid(Some(operand), loc);
        };
        let n = n as u32;
        let ty = self.comp.types.integral(width, false, f);
        Expression::new(
            ty,
            ExpressionKind::Replication {
                count: n,
                operand: Box::new(operand),
            },
            loc,
        )
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    pub fn bind_statement(&mut self, syntax: &StatementSyntax, ctx: &BindContext) -> Statement {
        let loc = syntax.loc();
        match syntax {
            StatementSyntax::Expression { expr, .. } => {
                let expr = self.bind_expr(expr, ctx);
                Statement::new(StatementKind::Expression(expr), loc)
            }
            StatementSyntax::Conditional {
                cond,
                has_matches_clause,
                then_branch,
                else_branch,
                ..
            } => {
                if *has_matches_clause {
                    self.comp
                        .diags
                        .add(DiagCode::UnsupportedPredicate, loc, vec![]);
                    return Statement::invalid(loc);
                }
                let cond = self.bind_expr(cond, ctx);
                if !cond.is_invalid() && !self.is_boolean_convertible(cond.ty) {
                    let desc = self.comp.types.describe(cond.ty);
                    self.comp.diags.add(
                        DiagCode::TypeMismatch,
                        cond.loc,
                        vec![desc.into(), "a 1-bit condition".into()],
                    );
                    return Statement::invalid(loc);
                }
                let then_branch = self.bind_statement(then_branch, ctx);
                let else_branch = else_branch
                    .as_ref()
                    .map(|e| Box::new(self.bind_statement(e, ctx)));
                Statement::new(
                    StatementKind::Conditional {
                        cond,
                        then_branch: Box::new(then_branch),
                        else_branch,
                    },
                    loc,
                )
            }
            StatementSyntax::Case {
                selector, items, ..
            } => self.bind_case(selector, items, ctx, loc),
            StatementSyntax::For {
                declarations,
                init,
                condition,
                steps,
                body,
                ..
            } => self.bind_for(declarations, init, condition.as_ref(), steps, body, ctx, loc),
            StatementSyntax::Return { expr, .. } => {
                let Some(sub) = ctx.subroutine else {
                    self.comp
                        .diags
                        .add(DiagCode::ReturnOutsideSubroutine, loc, vec![]);
                    return Statement::invalid(loc);
                };
                let ret_ty = self.comp.subroutine_return_type(sub);
                let name = self.comp.symbol(sub).name.clone();
                match (expr, self.comp.types.is_void(ret_ty)) {
                    (Some(_), true) => {
                        self.comp.diags.add(
                            DiagCode::UnexpectedReturnValue,
                            loc,
                            vec![name.into()],
                        );
                        Statement::invalid(loc)
                    }
                    (None, false) => {
                        self.comp
                            .diags
                            .add(DiagCode::MissingReturnValue, loc, vec![name.into()]);
                        Statement::invalid(loc)
                    }
                    (None, true) => Statement::new(StatementKind::Return { expr: None }, loc),
                    (Some(e), false) => {
                        let expr = self.bind_assignment_like(ret_ty, e, ctx);
                        Statement::new(StatementKind::Return { expr: Some(expr) }, loc)
                    }
                }
            }
            StatementSyntax::Block { members, body, .. } => {
                let scope = self.comp.create_block_scope(ctx.scope, loc);
                for member in members {
                    self.comp.materialize_member(scope, member.clone());
                }
                let inner = ctx.with_scope(scope);
                // Locals initialize in declaration order before the body.
                let locals = self.bind_block_locals(scope, &inner);
                let body = self.bind_statement_list(body, &inner);
                Statement::new(
                    StatementKind::Block {
                        scope,
                        locals,
                        body,
                    },
                    loc,
                )
            }
        }
    }

    fn bind_block_locals(
        &mut self,
        scope: SymbolId,
        ctx: &BindContext,
    ) -> Vec<(SymbolId, Option<Expression>)> {
        let members = self.comp.members(scope);
        let mut locals = Vec::new();
        for id in members {
            let (ty, init) = match &self.comp.symbol(id).kind {
                SymbolKind::Variable {
                    ty, initializer, ..
                } => (*ty, initializer.clone()),
                _ => continue,
            };
            let bound = init.map(|i| self.bind_assignment_like(ty, &i, ctx));
            locals.push((id, bound));
        }
        locals
    }

    fn bind_case(
        &mut self,
        selector: &ExpressionSyntax,
        items: &[CaseItemSyntax],
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Statement {
        let selector = self.bind_expr(selector, ctx);
        if selector.is_invalid() {
            return Statement::invalid(loc);
        }
        // All item expressions and the selector share a common type so the
        // bit-exact match compares like with like.
        let mut exprs: Vec<Vec<Expression>> = Vec::with_capacity(items.len());
        let mut common = selector.ty;
        let mut failed = false;
        for item in items {
            let mut arm = Vec::with_capacity(item.expressions.len());
            for e in &item.expressions {
                let bound = self.bind_expr(e, ctx);
                if bound.is_invalid() {
                    failed = true;
                } else if self.comp.types.equivalent(common, bound.ty) {
                    // Same type (strings, enums): nothing to widen.
                } else {
                    match self.comp.types.common_type(common, bound.ty, false) {
                        Some(c) => common = c,
                        None => {
                            let l = self.comp.types.describe(common);
                            let r = self.comp.types.describe(bound.ty);
                            self.comp.diags.add(
                                DiagCode::TypeMismatch,
                                bound.loc,
                                vec![l.into(), r.into()],
                            );
                            failed = true;
                        }
                    }
                }
                arm.push(bound);
            }
            exprs.push(arm);
        }
        if failed {
            return Statement::invalid(loc);
        }
        let selector = self.convert(common, selector, true);
        let mut default: Option<Box<Statement>> = None;
        let mut bound_items = Vec::new();
        for (item, arm) in items.iter().zip(exprs) {
            let body = self.bind_statement(&item.body, ctx);
            if arm.is_empty() {
                if default.is_some() {
                    self.comp.diags.add(
                        DiagCode::DuplicateDefinition,
                        item.body.loc(),
                        vec!["default".into()],
                    );
                }
                default = Some(Box::new(body));
            } else {
                let expressions = arm
                    .into_iter()
                    .map(|e| self.convert(common, e, true))
                    .collect();
                bound_items.push(CaseItem { expressions, body });
            }
        }
        Statement::new(
            StatementKind::Case {
                selector,
                items: bound_items,
                default,
            },
            loc,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn bind_for(
        &mut self,
        declarations: &[MemberSyntax],
        init: &[ExpressionSyntax],
        condition: Option<&ExpressionSyntax>,
        steps: &[ExpressionSyntax],
        body: &StatementSyntax,
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> Statement {
        let (scope, inner) = if declarations.is_empty() {
            (None, *ctx)
        } else {
            let scope = self.comp.create_block_scope(ctx.scope, loc);
            (Some(scope), ctx.with_scope(scope))
        };
        let mut loop_vars = Vec::new();
        for decl in declarations {
            let MemberSyntax::Data {
                name,
                ty,
                unpacked_dims,
                initializer,
                lifetime,
                loc: decl_loc,
            } = decl
            else {
                self.comp.diags.add(
                    DiagCode::TypeMismatch,
                    decl.loc(),
                    vec![decl.name().into(), "a loop variable declaration".into()],
                );
                continue;
            };
            let resolved = self.resolve_type_with_dims(ty, unpacked_dims, &inner);
            let id = self.comp.add_variable(
                inner.scope,
                name.clone(),
                resolved,
                initializer.clone(),
                *lifetime,
                *decl_loc,
            );
            let bound_init = initializer
                .as_ref()
                .map(|i| self.bind_assignment_like(resolved, i, &inner));
            loop_vars.push((id, bound_init));
        }
        let init = init.iter().map(|e| self.bind_expr(e, &inner)).collect();
        let condition = condition.map(|c| {
            let cond = self.bind_expr(c, &inner);
            if !cond.is_invalid() && !self.is_boolean_convertible(cond.ty) {
                let desc = self.comp.types.describe(cond.ty);
                self.comp.diags.add(
                    DiagCode::TypeMismatch,
                    cond.loc,
                    vec![desc.into(), "a 1-bit condition".into()],
                );
            }
            cond
        });
        let steps = steps.iter().map(|e| self.bind_expr(e, &inner)).collect();
        let body = self.bind_statement(body, &inner);
        Statement::new(
            StatementKind::For {
                scope,
                loop_vars,
                init,
                condition,
                steps,
                body: Box::new(body),
            },
            loc,
        )
    }

    // -----------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------

    /// Resolve a data type in the given context.
    pub fn resolve_type(&mut self, syntax: &DataTypeSyntax, ctx: &BindContext) -> TypeId {
        match syntax {
            DataTypeSyntax::Keyword {
                keyword,
                signing,
                packed_dims,
                loc,
            } => self.resolve_keyword_type(*keyword, *signing, packed_dims, ctx, *loc),
            DataTypeSyntax::Named {
                name,
                packed_dims,
                loc,
            } => {
                let Some(symbol) = self.comp.lookup_unqualified(
                    name,
                    ctx.scope,
                    LookupKind::Definition,
                    *loc,
                ) else {
                    self.comp.diags.add(
                        DiagCode::UndeclaredIdentifier,
                        *loc,
                        vec![name.as_str().into()],
                    );
                    return self.error_type();
                };
                let base = match &self.comp.symbol(symbol).kind {
                    SymbolKind::TypeAlias { ty } => *ty,
                    _ => {
                        self.comp
                            .diags
                            .add(DiagCode::NotAType, *loc, vec![name.as_str().into()]);
                        return self.error_type();
                    }
                };
                self.apply_packed_dims(base, packed_dims, None, ctx, *loc)
            }
            DataTypeSyntax::Enum { base, members, loc } => {
                self.resolve_enum_type(base.as_deref(), members, ctx, *loc)
            }
            DataTypeSyntax::Struct {
                packed,
                fields,
                loc,
            } => self.resolve_struct_type(*packed, fields, ctx, *loc),
        }
    }

    /// Resolve a declaration's type including unpacked dimensions
    /// (`int x [0:3]`); outermost dimension first.
    pub fn resolve_type_with_dims(
        &mut self,
        syntax: &DataTypeSyntax,
        unpacked_dims: &[RangeSyntax],
        ctx: &BindContext,
    ) -> TypeId {
        let mut ty = self.resolve_type(syntax, ctx);
        for dim in unpacked_dims.iter().rev() {
            let Some(range) = self.resolve_range(dim, ctx) else {
                return self.error_type();
            };
            ty = self.comp.types.unpacked_array(ty, range);
        }
        ty
    }

    fn resolve_keyword_type(
        &mut self,
        keyword: TypeKeyword,
        signing: Option<bool>,
        packed_dims: &[RangeSyntax],
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> TypeId {
        let b = self.comp.types.builtins;
        let base = match keyword {
            TypeKeyword::Bit => b.bit,
            TypeKeyword::Logic | TypeKeyword::Reg => b.logic,
            TypeKeyword::Byte => b.byte,
            TypeKeyword::ShortInt => b.shortint,
            TypeKeyword::Int => b.int,
            TypeKeyword::LongInt => b.longint,
            TypeKeyword::Integer => b.integer,
            TypeKeyword::Time => b.time,
            TypeKeyword::Real => b.real,
            TypeKeyword::ShortReal => b.shortreal,
            TypeKeyword::RealTime => b.real,
            TypeKeyword::String => b.string,
            TypeKeyword::Event => b.event,
            TypeKeyword::Void => b.void,
        };
        let base = match (signing, self.comp.types.integral_traits(base)) {
            (Some(s), Some((w, _, f))) if packed_dims.is_empty() => {
                self.comp.types.integral(w, s, f)
            }
            _ => base,
        };
        if packed_dims.is_empty() {
            return base;
        }
        // Packed dimensions require a vector element keyword.
        if !matches!(keyword, TypeKeyword::Bit | TypeKeyword::Logic | TypeKeyword::Reg) {
            let desc = self.comp.types.describe(base);
            self.comp.diags.add(
                DiagCode::TypeMismatch,
                loc,
                vec![desc.into(), "a vector element type".into()],
            );
            return self.error_type();
        }
        self.apply_packed_dims(base, packed_dims, signing, ctx, loc)
    }

    fn apply_packed_dims(
        &mut self,
        base: TypeId,
        packed_dims: &[RangeSyntax],
        signing: Option<bool>,
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> TypeId {
        if packed_dims.is_empty() {
            return base;
        }
        if self.comp.types.integral_traits(base).is_none() {
            let desc = self.comp.types.describe(base);
            self.comp.diags.add(
                DiagCode::TypeMismatch,
                loc,
                vec![desc.into(), "a packed element type".into()],
            );
            return self.error_type();
        }
        let mut ty = base;
        for (i, dim) in packed_dims.iter().enumerate().rev() {
            let Some(range) = self.resolve_range(dim, ctx) else {
                return self.error_type();
            };
            // Explicit signing lands on the outermost dimension.
            let signed = if i == 0 { signing.unwrap_or(false) } else { false };
            ty = self.comp.types.packed_array(ty, range, signed);
        }
        ty
    }

    fn resolve_enum_type(
        &mut self,
        base: Option<&DataTypeSyntax>,
        members: &[EnumMemberSyntax],
        ctx: &BindContext,
        loc: SourceLocation,
    ) -> TypeId {
        let base_ty = match base {
            Some(b) => {
                let t = self.resolve_type(b, ctx);
                if self.comp.types.integral_traits(t).is_none() {
                    let desc = self.comp.types.describe(t);
                    self.comp
                        .diags
                        .add(DiagCode::EnumBaseNotIntegral, loc, vec![desc.into()]);
                    self.comp.types.builtins.int
                } else {
                    t
                }
            }
            None => self.comp.types.builtins.int,
        };
        let (width, signed, _) = self
            .comp
            .types
            .integral_traits(base_ty)
            .unwrap_or((32, true, false));
        let mut infos = Vec::with_capacity(members.len());
        let mut prev: Option<SvInt> = None;
        for member in members {
            let value = match &member.initializer {
                Some(init) => {
                    match self.fold_constant_integer(init, ctx) {
                        Some(v) => v.resize(width).with_signed(signed),
                        None => SvInt::zero(width, signed),
                    }
                }
                None => match &prev {
                    Some(p) => p.add(&SvInt::from_u64(width, signed, 1)).truncate(width),
                    None => SvInt::zero(width, signed),
                },
            };
            prev = Some(value.clone());
            infos.push(EnumMemberInfo {
                name: member.name.clone(),
                value,
            });
        }
        let enum_ty = self
            .comp
            .types
            .add_enum(String::new(), base_ty, infos.clone());
        // Enum members become symbols in the enclosing scope, per the LRM
        // visibility rules.
        for (member, info) in members.iter().zip(infos) {
            self.comp.add_enum_member(
                ctx.scope,
                member.name.clone(),
                enum_ty,
                info.value,
                member.loc,
            );
        }
        enum_ty
    }

    fn resolve_struct_type(
        &mut self,
        packed: bool,
        fields: &[StructFieldSyntax],
        ctx: &BindContext,
        _loc: SourceLocation,
    ) -> TypeId {
        let mut resolved = Vec::with_capacity(fields.len());
        for field in fields {
            let ty = self.resolve_type(&field.ty, ctx);
            if packed && self.comp.types.integral_traits(ty).is_none() {
                let desc = self.comp.types.describe(ty);
                self.comp.diags.add(
                    DiagCode::TypeMismatch,
                    field.loc,
                    vec![desc.into(), "a packed field type".into()],
                );
                return self.error_type();
            }
            resolved.push((field.name.clone(), ty));
        }
        let infos = if packed {
            // First field is most significant: offsets count up from the
            // end of the field list.
            let widths: Vec<u32> = resolved
                .iter()
                .map(|(_, ty)| {
                    self.comp
                        .types
                        .integral_traits(*ty)
                        .map(|(w, _, _)| w)
                        .unwrap_or(0)
                })
                .collect();
            let mut offsets = vec![0u32; resolved.len()];
            let mut acc = 0;
            for i in (0..resolved.len()).rev() {
                offsets[i] = acc;
                acc += widths[i];
            }
            resolved
                .into_iter()
                .zip(offsets)
                .map(|((name, ty), offset)| FieldInfo { name, ty, offset })
                .collect()
        } else {
            resolved
                .into_iter()
                .enumerate()
                .map(|(i, (name, ty))| FieldInfo {
                    name,
                    ty,
                    offset: i as u32,
                })
                .collect()
        };
        self.comp.types.add_struct(String::new(), packed, infos)
    }

    fn resolve_range(&mut self, range: &RangeSyntax, ctx: &BindContext) -> Option<ConstantRange> {
        let left = self.fold_to_i64(&range.left, ctx)?;
        let right = self.fold_to_i64(&range.right, ctx)?;
        let resolved = ConstantRange::new(left, right);
        self.check_width(resolved.width() as u64, range.left.loc())?;
        Some(resolved)
    }

    /// Reject widths past the representable maximum before they reach the
    /// value layer, which treats them as internal invariants.
    fn check_width(&mut self, width: u64, loc: SourceLocation) -> Option<u32> {
        if width == 0 || width > sv_core::MAX_WIDTH as u64 {
            self.comp.diags.add(
                DiagCode::WidthTooLarge,
                loc,
                vec![(width.min(i64::MAX as u64) as i64).into()],
            );
            return None;
        }
        Some(width as u32)
    }

    // -----------------------------------------------------------------
    // Constant folding helpers
    // -----------------------------------------------------------------

    /// Bind and evaluate in constant context, promoting evaluation
    /// diagnostics to the sink.
    fn fold_constant_integer(
        &mut self,
        syntax: &ExpressionSyntax,
        ctx: &BindContext,
    ) -> Option<SvInt> {
        let expr = self.bind_expr(syntax, &BindContext::constant(ctx.scope));
        if expr.is_invalid() {
            return None;
        }
        let (value, diags) = {
            let mut ectx = EvalContext::new(self.comp, EvalOptions::default());
            let v = ectx.eval(&expr);
            (v, ectx.take_diagnostics())
        };
        self.comp.diags.extend(diags);
        match value {
            ConstantValue::Integer(v) => Some(v),
            ConstantValue::Bad => None,
            _ => {
                self.comp
                    .diags
                    .add(DiagCode::ConstantRequired, syntax.loc(), vec![]);
                None
            }
        }
    }

    fn fold_to_i64(&mut self, syntax: &ExpressionSyntax, ctx: &BindContext) -> Option<i64> {
        match self.fold_constant_integer(syntax, ctx) {
            Some(v) => match v.as_i64() {
                Some(i) => Some(i),
                None => {
                    self.comp
                        .diags
                        .add(DiagCode::ConstantRequired, syntax.loc(), vec![]);
                    None
                }
            },
            None => None,
        }
    }

    /// Like `fold_to_i64` but speculative: any diagnostics the probe emits
    /// are rolled back. Used to spot zero replication counts inside
    /// concatenations before the real bind runs.
    fn fold_to_i64_quiet(&mut self, syntax: &ExpressionSyntax, ctx: &BindContext) -> Option<i64> {
        let before = self.comp.diags.len();
        let expr = self.bind_expr(syntax, &BindContext::constant(ctx.scope));
        let result = if expr.is_invalid() {
            None
        } else {
            let mut ectx = EvalContext::new(self.comp, EvalOptions::default());
            let value = ectx.eval(&expr);
            value.integer().and_then(|v| v.as_i64())
        };
        self.comp.diags.truncate(before);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ExpressionSyntax as Es;

    fn comp() -> Compilation {
        Compilation::new()
    }

    fn bind(comp: &mut Compilation, syntax: &ExpressionSyntax) -> Expression {
        let root = comp.root();
        let ctx = BindContext::definition(root);
        Binder::new(comp).bind_self_determined(syntax, &ctx)
    }

    #[test]
    fn test_unsized_literal_is_int() {
        let mut c = comp();
        let e = bind(&mut c, &Es::int_literal("42"));
        assert_eq!(e.ty, c.types.builtins.int);
        assert_eq!(e.as_integer_literal().as_u64(), Some(42));
    }

    #[test]
    fn test_sized_literal_is_four_state_vector() {
        let mut c = comp();
        let e = bind(&mut c, &Es::int_literal("4'b10x0"));
        assert_eq!(c.types.integral_traits(e.ty), Some((4, false, true)));
    }

    #[test]
    fn test_binary_common_type_widens_operands() {
        let mut c = comp();
        // 8'd200 + 16'd100: common type is 16 bits unsigned... both
        // literals unsigned, so 16-bit unsigned four-state.
        let e = bind(
            &mut c,
            &Es::binary(
                BinaryOp::Add,
                Es::int_literal("8'd200"),
                Es::int_literal("16'd100"),
            ),
        );
        assert_eq!(c.types.integral_traits(e.ty), Some((16, false, true)));
        // The 8-bit literal was re-sized in place by propagation.
        match &e.kind {
            ExpressionKind::Binary { left, .. } => {
                assert_eq!(left.as_integer_literal().width(), 16);
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_result_is_one_bit() {
        let mut c = comp();
        let e = bind(
            &mut c,
            &Es::binary(
                BinaryOp::LessThan,
                Es::int_literal("8'd2"),
                Es::int_literal("8'd3"),
            ),
        );
        assert_eq!(c.types.integral_traits(e.ty), Some((1, false, true)));
        // Operands still widened to a common type for the comparison.
        match &e.kind {
            ExpressionKind::Binary { left, right, .. } => {
                assert_eq!(left.as_integer_literal().width(), 8);
                assert_eq!(right.as_integer_literal().width(), 8);
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_case_equality_is_two_state_bit() {
        let mut c = comp();
        let e = bind(
            &mut c,
            &Es::binary(
                BinaryOp::CaseEquality,
                Es::int_literal("4'b10x0"),
                Es::int_literal("4'b10x0"),
            ),
        );
        assert_eq!(e.ty, c.types.builtins.bit);
    }

    #[test]
    fn test_shift_takes_left_operand_type() {
        let mut c = comp();
        let e = bind(
            &mut c,
            &Es::binary(
                BinaryOp::LogicalShiftLeft,
                Es::int_literal("8'd3"),
                Es::int_literal("32'd1"),
            ),
        );
        // Result width 8, not influenced by the 32-bit shift amount.
        assert_eq!(c.types.integral_traits(e.ty).map(|(w, _, _)| w), Some(8));
    }

    #[test]
    fn test_undeclared_identifier_binds_invalid() {
        let mut c = comp();
        let e = bind(&mut c, &Es::ident("nope"));
        assert!(e.is_invalid());
        assert!(c.types.is_error(e.ty));
        assert!(
            c.diags
                .iter()
                .any(|d| d.code == DiagCode::UndeclaredIdentifier)
        );
        // Parents short-circuit without further diagnostics.
        let before = c.diags.len();
        let e2 = bind(
            &mut c,
            &Es::binary(BinaryOp::Add, Es::ident("nope"), Es::int_literal("1")),
        );
        assert!(e2.is_invalid());
        assert_eq!(c.diags.len(), before + 1); // only the second lookup miss
    }

    #[test]
    fn test_conditional_common_type() {
        let mut c = comp();
        let e = bind(
            &mut c,
            &Es::conditional(
                Es::int_literal("1'b1"),
                Es::int_literal("8'd1"),
                Es::int_literal("16'd2"),
            ),
        );
        assert_eq!(c.types.integral_traits(e.ty).map(|(w, _, _)| w), Some(16));
    }

    #[test]
    fn test_concat_is_unsigned_sum_of_widths() {
        let mut c = comp();
        let e = bind(
            &mut c,
            &Es::concat(vec![Es::int_literal("4'd1"), Es::int_literal("8'd2")]),
        );
        assert_eq!(c.types.integral_traits(e.ty), Some((12, false, true)));
    }

    #[test]
    fn test_replication_count_must_be_positive_outside_concat() {
        let mut c = comp();
        let e = bind(
            &mut c,
            &Es::replicate(Es::int_literal("0"), Es::int_literal("4'd1")),
        );
        assert!(e.is_invalid());
        assert!(
            c.diags
                .iter()
                .any(|d| d.code == DiagCode::InvalidReplication)
        );
    }

    #[test]
    fn test_zero_replication_dropped_inside_concat() {
        let mut c = comp();
        let e = bind(
            &mut c,
            &Es::concat(vec![
                Es::int_literal("4'd3"),
                Es::replicate(Es::int_literal("0"), Es::int_literal("8'd1")),
            ]),
        );
        assert!(!e.is_invalid());
        assert_eq!(c.types.integral_traits(e.ty).map(|(w, _, _)| w), Some(4));
    }

    #[test]
    fn test_system_call_unknown_diagnosed() {
        let mut c = comp();
        let e = bind(&mut c, &Es::call("$nosuch", vec![Es::int_literal("1")]));
        assert!(e.is_invalid());
        assert!(
            c.diags
                .iter()
                .any(|d| d.code == DiagCode::UnknownSystemFunction)
        );
    }

    #[test]
    fn test_bits_types_as_int() {
        let mut c = comp();
        let e = bind(&mut c, &Es::call("$bits", vec![Es::int_literal("8'd0")]));
        assert_eq!(e.ty, c.types.builtins.int);
    }

    #[test]
    fn test_assignment_to_rvalue_diagnosed() {
        let mut c = comp();
        let e = bind(
            &mut c,
            &Es::assign(Es::int_literal("1"), Es::int_literal("2")),
        );
        assert!(e.is_invalid());
        assert!(c.diags.iter().any(|d| d.code == DiagCode::InvalidLValue));
    }

    #[test]
    fn test_narrowing_assignment_warns() {
        let mut c = comp();
        c.add_member(MemberSyntax::variable(
            "v",
            DataTypeSyntax::logic_vector(3, 0),
            None,
        ));
        let root = c.root();
        let ctx = BindContext::definition(root);
        let e = {
            let mut b = Binder::new(&mut c);
            b.bind_self_determined(
                &Es::assign(Es::ident("v"), Es::int_literal("16'd300")),
                &ctx,
            )
        };
        assert!(!e.is_invalid());
        assert!(c.diags.iter().any(|d| d.code == DiagCode::WidthMismatch));
    }

    #[test]
    fn test_matches_clause_unsupported() {
        let mut c = comp();
        let root = c.root();
        let ctx = BindContext::definition(root);
        let stmt = StatementSyntax::Conditional {
            cond: Es::int_literal("1"),
            has_matches_clause: true,
            then_branch: Box::new(StatementSyntax::expr_stmt(Es::int_literal("1"))),
            else_branch: None,
            loc: SourceLocation::default(),
        };
        let bound = {
            let mut b = Binder::new(&mut c);
            b.bind_statement(&stmt, &ctx)
        };
        assert!(bound.is_invalid());
        assert!(
            c.diags
                .iter()
                .any(|d| d.code == DiagCode::UnsupportedPredicate)
        );
    }

    #[test]
    fn test_return_outside_subroutine() {
        let mut c = comp();
        let root = c.root();
        let ctx = BindContext::definition(root);
        let bound = {
            let mut b = Binder::new(&mut c);
            b.bind_statement(&StatementSyntax::ret(Some(Es::int_literal("1"))), &ctx)
        };
        assert!(bound.is_invalid());
        assert!(
            c.diags
                .iter()
                .any(|d| d.code == DiagCode::ReturnOutsideSubroutine)
        );
    }

    #[test]
    fn test_conversion_idempotence() {
        // convert(T, convert(T, e)) adds nothing beyond convert(T, e).
        let mut c = comp();
        let target = c.types.builtins.int;
        let root = c.root();
        let ctx = BindContext::definition(root);
        let once = {
            let mut b = Binder::new(&mut c);
            b.bind_assignment_like(target, &Es::int_literal("8'd5"), &ctx)
        };
        let twice = {
            let mut b = Binder::new(&mut c);
            let e = b.bind_assignment_like(target, &Es::int_literal("8'd5"), &ctx);
            b.convert_assignment(target, e, SourceLocation::default())
        };
        assert_eq!(once.ty, twice.ty);
        // No new conversion layers: both are the re-sized literal.
        assert!(matches!(twice.kind, ExpressionKind::IntegerLiteral(_)));
    }
}
