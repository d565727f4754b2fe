//! Bound expression and statement trees.
//!
//! These are the typed trees the binder produces from syntax: every
//! expression carries its [`TypeId`] and source location in a common header,
//! with variant payload in a closed [`ExpressionKind`] union. Cross links
//! (to types and symbols) are ids, never owning; children are owned by
//! their parent node. `Invalid` marks a subtree that failed to bind; its
//! type is the error type and parents short-circuit around it.

use crate::builtins::SystemFunc;
use crate::symbols::SymbolId;
use crate::syntax::{BinaryOp, SourceLocation, UnaryOp};
use crate::types::{ConstantRange, TypeId};
use sv_core::SvInt;

/// A bound, typed expression.
#[derive(Debug, Clone)]
pub struct Expression {
    pub ty: TypeId,
    pub loc: SourceLocation,
    pub kind: ExpressionKind,
}

/// How a bound range select addresses its operand.
#[derive(Debug, Clone)]
pub enum BoundRange {
    /// `[msb:lsb]` with both bounds folded at bind time.
    Constant(ConstantRange),
    /// `[base +: width]`; base may be a runtime value.
    IndexedUp { base: Box<Expression>, width: u32 },
    /// `[base -: width]`.
    IndexedDown { base: Box<Expression>, width: u32 },
}

/// The closed union of bound expression shapes.
#[derive(Debug, Clone)]
pub enum ExpressionKind {
    IntegerLiteral(SvInt),
    RealLiteral(f64),
    StringLiteral(String),
    UnboundedLiteral,
    /// A resolved reference to a value symbol. Hierarchical references are
    /// never constant.
    NamedValue {
        symbol: SymbolId,
        hierarchical: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        cond: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },
    /// Assignment; compound forms are lowered by the binder so `value`
    /// already contains the combining operation.
    Assignment {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    /// `++`/`--`, writing back through the target lvalue.
    IncDec {
        target: Box<Expression>,
        increment: bool,
        postfix: bool,
    },
    ElementSelect {
        value: Box<Expression>,
        index: Box<Expression>,
    },
    RangeSelect {
        value: Box<Expression>,
        range: BoundRange,
    },
    MemberAccess {
        value: Box<Expression>,
        member: String,
        field_index: usize,
        /// Bit offset from the LSB for packed structs; element index
        /// otherwise.
        offset: u32,
    },
    Concat {
        operands: Vec<Expression>,
    },
    Replication {
        count: u32,
        operand: Box<Expression>,
    },
    Call {
        subroutine: SymbolId,
        args: Vec<Expression>,
    },
    SystemCall {
        function: SystemFunc,
        args: Vec<Expression>,
    },
    /// A width/sign/representation change inserted by the binder or written
    /// as a cast.
    Conversion {
        implicit: bool,
        operand: Box<Expression>,
    },
    /// A subtree that failed to bind. Type is the error type.
    Invalid {
        child: Option<Box<Expression>>,
    },
}

impl Expression {
    pub fn new(ty: TypeId, kind: ExpressionKind, loc: SourceLocation) -> Expression {
        Expression { ty, loc, kind }
    }

    /// An invalid node wrapping an optional failed child. `error_type` must
    /// be the table's error type.
    pub fn invalid(
        error_type: TypeId,
        child: Option<Expression>,
        loc: SourceLocation,
    ) -> Expression {
        Expression {
            ty: error_type,
            loc,
            kind: ExpressionKind::Invalid {
                child: child.map(Box::new),
            },
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, ExpressionKind::Invalid { .. })
    }

    /// Checked downcast to an integer literal. Panics on the wrong kind;
    /// that is an internal invariant violation, not a user error.
    pub fn as_integer_literal(&self) -> &SvInt {
        match &self.kind {
            ExpressionKind::IntegerLiteral(v) => v,
            other => panic!("expected IntegerLiteral, found {:?}", kind_name(other)),
        }
    }

    /// Checked downcast to a named value reference.
    pub fn as_named_value(&self) -> SymbolId {
        match &self.kind {
            ExpressionKind::NamedValue { symbol, .. } => *symbol,
            other => panic!("expected NamedValue, found {:?}", kind_name(other)),
        }
    }

    /// Visit each direct child expression in evaluation order.
    pub fn for_each_child(&self, f: &mut impl FnMut(&Expression)) {
        match &self.kind {
            ExpressionKind::IntegerLiteral(_)
            | ExpressionKind::RealLiteral(_)
            | ExpressionKind::StringLiteral(_)
            | ExpressionKind::UnboundedLiteral
            | ExpressionKind::NamedValue { .. } => {}
            ExpressionKind::Unary { operand, .. } => f(operand),
            ExpressionKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            ExpressionKind::Conditional {
                cond,
                if_true,
                if_false,
            } => {
                f(cond);
                f(if_true);
                f(if_false);
            }
            ExpressionKind::Assignment { target, value } => {
                f(target);
                f(value);
            }
            ExpressionKind::IncDec { target, .. } => f(target),
            ExpressionKind::ElementSelect { value, index } => {
                f(value);
                f(index);
            }
            ExpressionKind::RangeSelect { value, range } => {
                f(value);
                match range {
                    BoundRange::Constant(_) => {}
                    BoundRange::IndexedUp { base, .. } | BoundRange::IndexedDown { base, .. } => {
                        f(base)
                    }
                }
            }
            ExpressionKind::MemberAccess { value, .. } => f(value),
            ExpressionKind::Concat { operands } => {
                for op in operands {
                    f(op);
                }
            }
            ExpressionKind::Replication { operand, .. } => f(operand),
            ExpressionKind::Call { args, .. } | ExpressionKind::SystemCall { args, .. } => {
                for a in args {
                    f(a);
                }
            }
            ExpressionKind::Conversion { operand, .. } => f(operand),
            ExpressionKind::Invalid { child } => {
                if let Some(c) = child {
                    f(c);
                }
            }
        }
    }
}

fn kind_name(kind: &ExpressionKind) -> &'static str {
    match kind {
        ExpressionKind::IntegerLiteral(_) => "IntegerLiteral",
        ExpressionKind::RealLiteral(_) => "RealLiteral",
        ExpressionKind::StringLiteral(_) => "StringLiteral",
        ExpressionKind::UnboundedLiteral => "UnboundedLiteral",
        ExpressionKind::NamedValue { .. } => "NamedValue",
        ExpressionKind::Unary { .. } => "Unary",
        ExpressionKind::Binary { .. } => "Binary",
        ExpressionKind::Conditional { .. } => "Conditional",
        ExpressionKind::Assignment { .. } => "Assignment",
        ExpressionKind::IncDec { .. } => "IncDec",
        ExpressionKind::ElementSelect { .. } => "ElementSelect",
        ExpressionKind::RangeSelect { .. } => "RangeSelect",
        ExpressionKind::MemberAccess { .. } => "MemberAccess",
        ExpressionKind::Concat { .. } => "Concat",
        ExpressionKind::Replication { .. } => "Replication",
        ExpressionKind::Call { .. } => "Call",
        ExpressionKind::SystemCall { .. } => "SystemCall",
        ExpressionKind::Conversion { .. } => "Conversion",
        ExpressionKind::Invalid { .. } => "Invalid",
    }
}

/// Walking interface for external serializers: implementors see every node
/// without matching on concrete variants themselves.
pub trait ExpressionVisitor {
    /// Called for each node in pre-order. Return false to prune descent.
    fn enter(&mut self, expr: &Expression) -> bool;
}

/// Drive a visitor over `expr` in pre-order.
pub fn walk_expression<V: ExpressionVisitor>(expr: &Expression, visitor: &mut V) {
    if !visitor.enter(expr) {
        return;
    }
    expr.for_each_child(&mut |child| walk_expression(child, visitor));
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// One arm of a bound case statement.
#[derive(Debug, Clone)]
pub struct CaseItem {
    pub expressions: Vec<Expression>,
    pub body: Statement,
}

/// A bound statement.
#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub loc: SourceLocation,
}

/// The closed union of bound statement shapes.
#[derive(Debug, Clone)]
pub enum StatementKind {
    Expression(Expression),
    Conditional {
        cond: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    /// Plain `case`; arms match by bit-exact (`===`) equality.
    Case {
        selector: Expression,
        items: Vec<CaseItem>,
        default: Option<Box<Statement>>,
    },
    For {
        /// Block scope holding loop variable declarations, when present.
        scope: Option<SymbolId>,
        loop_vars: Vec<(SymbolId, Option<Expression>)>,
        init: Vec<Expression>,
        condition: Option<Expression>,
        steps: Vec<Expression>,
        body: Box<Statement>,
    },
    Return {
        expr: Option<Expression>,
    },
    Block {
        scope: SymbolId,
        locals: Vec<(SymbolId, Option<Expression>)>,
        body: Vec<Statement>,
    },
    /// A statement that failed to bind.
    Invalid,
}

impl Statement {
    pub fn new(kind: StatementKind, loc: SourceLocation) -> Statement {
        Statement { kind, loc }
    }

    pub fn invalid(loc: SourceLocation) -> Statement {
        Statement {
            kind: StatementKind::Invalid,
            loc,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, StatementKind::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Types;
    use sv_core::SvInt;

    fn lit(types: &Types, v: u64) -> Expression {
        Expression::new(
            types.builtins.int,
            ExpressionKind::IntegerLiteral(SvInt::from_u64(32, true, v)),
            SourceLocation::default(),
        )
    }

    struct Counter {
        nodes: usize,
    }

    impl ExpressionVisitor for Counter {
        fn enter(&mut self, _expr: &Expression) -> bool {
            self.nodes += 1;
            true
        }
    }

    #[test]
    fn test_visitor_sees_all_nodes() {
        let types = Types::new();
        let e = Expression::new(
            types.builtins.int,
            ExpressionKind::Binary {
                op: BinaryOp::Add,
                left: Box::new(lit(&types, 1)),
                right: Box::new(Expression::new(
                    types.builtins.int,
                    ExpressionKind::Unary {
                        op: UnaryOp::Minus,
                        operand: Box::new(lit(&types, 2)),
                    },
                    SourceLocation::default(),
                )),
            },
            SourceLocation::default(),
        );
        let mut counter = Counter { nodes: 0 };
        walk_expression(&e, &mut counter);
        assert_eq!(counter.nodes, 4);
    }

    #[test]
    fn test_checked_downcast() {
        let types = Types::new();
        let e = lit(&types, 7);
        assert_eq!(e.as_integer_literal().as_u64(), Some(7));
    }

    #[test]
    #[should_panic(expected = "expected NamedValue")]
    fn test_checked_downcast_panics_on_wrong_kind() {
        let types = Types::new();
        lit(&types, 7).as_named_value();
    }

    #[test]
    fn test_invalid_probe() {
        let types = Types::new();
        let inv = Expression::invalid(types.builtins.error, None, SourceLocation::default());
        assert!(inv.is_invalid());
        assert!(types.is_error(inv.ty));
    }
}
