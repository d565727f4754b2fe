//! The constant evaluator.
//!
//! `EvalContext` executes bound trees over `ConstantValue`: a stack of call
//! frames mapping symbols to values, a step budget charged per executed
//! statement (and per loop iteration), a call-depth limit, an external
//! cancellation flag polled at statement granularity, and a provisional
//! diagnostic buffer. Evaluator diagnostics attach to the originating call
//! site and are only promoted to the compilation sink when the binding
//! context requires a constant; otherwise callers may discard them and the
//! value simply stays unknown.
//!
//! Lvalue evaluation produces a path (root variable plus selectors) rather
//! than a value; writes through a path are bit-accurate on four-state
//! integers, preserving unknown bits outside the written range, and
//! by-copy on aggregates.

use crate::diagnostics::{DiagArg, DiagCode, Diagnostic};
use crate::expr::{BoundRange, Expression, ExpressionKind, Statement, StatementKind};
use crate::symbols::{Compilation, SymbolId, SymbolKind};
use crate::syntax::{ArgDirection, BinaryOp, Lifetime, SourceLocation, UnaryOp};
use crate::types::{ConstantRange, TypeId, TypeKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use sv_core::{Bit, ConstantValue, SvInt};
use tracing::trace;

/// Evaluation limits and modes, in the style of an explicit options struct
/// rather than globals.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Statements (and loop iterations) the evaluator may execute.
    pub max_steps: u64,
    /// Frame-stack depth limit.
    pub max_call_depth: usize,
    /// Strict mode: unknown conditions and uninitialized reads diagnose
    /// instead of silently defaulting.
    pub strict: bool,
    /// Script mode: outer-frame (session) variables may be created and
    /// mutated, for interactive use.
    pub script_mode: bool,
    /// External cancellation flag, polled at statement granularity.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            max_steps: 1_000_000,
            max_call_depth: 128,
            strict: false,
            script_mode: false,
            cancel: None,
        }
    }
}

impl EvalOptions {
    pub fn strict() -> EvalOptions {
        EvalOptions {
            strict: true,
            ..EvalOptions::default()
        }
    }

    pub fn script() -> EvalOptions {
        EvalOptions {
            script_mode: true,
            ..EvalOptions::default()
        }
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> EvalOptions {
        self.max_steps = max_steps;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> EvalOptions {
        self.cancel = Some(cancel);
        self
    }
}

/// A storage location: a root variable plus a selector chain.
#[derive(Debug, Clone)]
pub struct LValue {
    root: SymbolId,
    path: Vec<Selector>,
}

#[derive(Debug, Clone, Copy)]
enum Selector {
    /// A bit slice of a packed value.
    BitRange { lsb: u32, width: u32 },
    /// An element of an unpacked array.
    Element(usize),
    /// A field of an unpacked struct.
    Field(usize),
}

#[derive(Debug, Default)]
struct Frame {
    storage: HashMap<SymbolId, ConstantValue>,
    subroutine: Option<SymbolId>,
    return_value: Option<ConstantValue>,
    has_returned: bool,
}

/// Outcome of resolving a range select against a declared range.
enum RangeBits {
    Bits { lsb: u32, width: u32 },
    OutOfBounds,
    Unknown,
}

/// Evaluation state over an immutable compilation.
pub struct EvalContext<'c> {
    comp: &'c Compilation,
    options: EvalOptions,
    frames: Vec<Frame>,
    steps_used: u64,
    diags: Vec<Diagnostic>,
}

impl<'c> EvalContext<'c> {
    pub fn new(comp: &'c Compilation, options: EvalOptions) -> EvalContext<'c> {
        EvalContext {
            comp,
            options,
            frames: vec![Frame::default()],
            steps_used: 0,
            diags: Vec::new(),
        }
    }

    /// Steps consumed so far (statements executed plus loop iterations).
    pub fn steps_used(&self) -> u64 {
        self.steps_used
    }

    /// The subroutine owning the innermost frame, if evaluation is inside
    /// a call. Diagnostics attach to this call site.
    pub fn current_subroutine(&self) -> Option<SymbolId> {
        self.frame().subroutine
    }

    /// Take the provisional diagnostics. Callers in constant-required
    /// context promote these to the compilation sink; others may drop them.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diags
    }

    /// Seed a variable in the current frame (session/script use).
    pub fn set_variable(&mut self, symbol: SymbolId, value: ConstantValue) {
        self.frame_mut().storage.insert(symbol, value);
    }

    /// Read a variable from the innermost frame that holds it.
    pub fn read_variable(&self, symbol: SymbolId) -> Option<&ConstantValue> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.storage.get(&symbol))
    }

    fn diag(&mut self, code: DiagCode, loc: SourceLocation, args: Vec<DiagArg>) {
        self.diags.push(Diagnostic::new(code, loc, args));
    }

    fn frame(&self) -> &Frame {
        self.frames.last().expect("evaluator frame stack is empty")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("evaluator frame stack is empty")
    }

    /// Charge one step; false means the budget or the cancellation flag
    /// tripped and evaluation must unwind.
    fn step(&mut self, loc: SourceLocation) -> bool {
        if let Some(cancel) = &self.options.cancel
            && cancel.load(AtomicOrdering::Relaxed)
        {
            self.diag(DiagCode::EvalCancelled, loc, vec![]);
            return false;
        }
        if self.steps_used >= self.options.max_steps {
            self.diag(DiagCode::EvalTimeout, loc, vec![]);
            return false;
        }
        self.steps_used += 1;
        true
    }

    // -----------------------------------------------------------------
    // Rvalue evaluation
    // -----------------------------------------------------------------

    pub fn eval(&mut self, expr: &Expression) -> ConstantValue {
        match &expr.kind {
            ExpressionKind::IntegerLiteral(v) => ConstantValue::Integer(v.clone()),
            ExpressionKind::RealLiteral(r) => ConstantValue::Real(*r),
            ExpressionKind::StringLiteral(s) => ConstantValue::Str(s.clone()),
            ExpressionKind::UnboundedLiteral => ConstantValue::Unbounded,
            ExpressionKind::NamedValue {
                symbol,
                hierarchical,
            } => self.eval_named(*symbol, *hierarchical, expr.loc),
            ExpressionKind::Unary { op, operand } => {
                let value = self.eval(operand);
                self.eval_unary(*op, value)
            }
            ExpressionKind::Binary { op, left, right } => {
                if op.is_logical() {
                    self.eval_logical(*op, left, right)
                } else {
                    let l = self.eval(left);
                    let r = self.eval(right);
                    self.eval_binary(*op, l, r, left, expr.loc)
                }
            }
            ExpressionKind::Conditional {
                cond,
                if_true,
                if_false,
            } => {
                let c = self.eval(cond);
                if c.is_bad() {
                    return ConstantValue::Bad;
                }
                match c.truthy() {
                    Some(true) => self.eval(if_true),
                    Some(false) => self.eval(if_false),
                    None => {
                        // Unknown selector: evaluate both arms and merge,
                        // keeping agreeing bits and X-ing the rest.
                        let t = self.eval(if_true);
                        let f = self.eval(if_false);
                        merge_conditional(t, f)
                    }
                }
            }
            ExpressionKind::Assignment { target, value } => {
                let v = self.eval(value);
                if v.is_bad() {
                    return ConstantValue::Bad;
                }
                let Some(lv) = self.eval_lvalue(target) else {
                    return ConstantValue::Bad;
                };
                self.store(&lv, v.clone(), expr.loc);
                v
            }
            ExpressionKind::IncDec {
                target,
                increment,
                postfix,
            } => {
                let old = self.eval(target);
                if old.is_bad() {
                    return ConstantValue::Bad;
                }
                let new = match &old {
                    ConstantValue::Integer(v) => {
                        let one = SvInt::from_u64(v.width(), v.is_signed(), 1);
                        let next = if *increment { v.add(&one) } else { v.sub(&one) };
                        ConstantValue::Integer(next.truncate(v.width()))
                    }
                    ConstantValue::Real(r) => {
                        ConstantValue::Real(if *increment { r + 1.0 } else { r - 1.0 })
                    }
                    _ => return ConstantValue::Bad,
                };
                let Some(lv) = self.eval_lvalue(target) else {
                    return ConstantValue::Bad;
                };
                self.store(&lv, new.clone(), expr.loc);
                if *postfix { old } else { new }
            }
            ExpressionKind::ElementSelect { value, index } => {
                self.eval_element_select(value, index, expr)
            }
            ExpressionKind::RangeSelect { value, range } => {
                let base = self.eval(value);
                if base.is_bad() {
                    return ConstantValue::Bad;
                }
                let Some(base_int) = base.integer() else {
                    return ConstantValue::Bad;
                };
                let width_bits = self
                    .comp
                    .types
                    .integral_traits(expr.ty)
                    .map(|(w, _, _)| w)
                    .unwrap_or(1);
                match self.resolve_range_bits(value.ty, range, expr.loc) {
                    RangeBits::Bits { lsb, width } => {
                        ConstantValue::Integer(extract_bits(base_int, lsb, width))
                    }
                    RangeBits::OutOfBounds => {
                        self.diag(
                            DiagCode::IndexOutOfBounds,
                            expr.loc,
                            vec![self.comp.types.describe(value.ty).into()],
                        );
                        ConstantValue::Integer(SvInt::filled(width_bits, false, Bit::X))
                    }
                    RangeBits::Unknown => {
                        ConstantValue::Integer(SvInt::filled(width_bits, false, Bit::X))
                    }
                }
            }
            ExpressionKind::MemberAccess {
                value,
                field_index,
                offset,
                ..
            } => {
                let base = self.eval(value);
                if base.is_bad() {
                    return ConstantValue::Bad;
                }
                let packed = self
                    .comp
                    .types
                    .integral_traits(value.ty)
                    .is_some();
                if packed {
                    let Some(base_int) = base.integer() else {
                        return ConstantValue::Bad;
                    };
                    let width = self
                        .comp
                        .types
                        .integral_traits(expr.ty)
                        .map(|(w, _, _)| w)
                        .unwrap_or(1);
                    ConstantValue::Integer(extract_bits(base_int, *offset, width))
                } else {
                    match base {
                        ConstantValue::Elements(elems) => elems
                            .get(*field_index)
                            .cloned()
                            .unwrap_or(ConstantValue::Bad),
                        _ => ConstantValue::Bad,
                    }
                }
            }
            ExpressionKind::Concat { operands } => {
                let values: Vec<ConstantValue> =
                    operands.iter().map(|o| self.eval(o)).collect();
                if values.iter().any(|v| v.is_bad()) {
                    return ConstantValue::Bad;
                }
                if self.comp.types.is_string(expr.ty) {
                    let mut out = String::new();
                    for v in values {
                        match v {
                            ConstantValue::Str(s) => out.push_str(&s),
                            _ => return ConstantValue::Bad,
                        }
                    }
                    return ConstantValue::Str(out);
                }
                let mut ints = Vec::with_capacity(values.len());
                for v in values {
                    match v {
                        ConstantValue::Integer(i) => ints.push(i),
                        _ => return ConstantValue::Bad,
                    }
                }
                ConstantValue::Integer(SvInt::concat(&ints))
            }
            ExpressionKind::Replication { count, operand } => {
                let v = self.eval(operand);
                match v {
                    ConstantValue::Integer(i) => ConstantValue::Integer(i.replicate(*count)),
                    _ => ConstantValue::Bad,
                }
            }
            ExpressionKind::Call { subroutine, args } => {
                self.eval_call(*subroutine, args, expr.loc)
            }
            ExpressionKind::SystemCall { function, args } => {
                let values: Vec<ConstantValue> = args.iter().map(|a| self.eval(a)).collect();
                function.evaluate(&self.comp.types, args, &values)
            }
            ExpressionKind::Conversion { operand, .. } => {
                let v = self.eval(operand);
                self.coerce(expr.ty, v)
            }
            ExpressionKind::Invalid { .. } => ConstantValue::Bad,
        }
    }

    fn eval_named(
        &mut self,
        symbol: SymbolId,
        hierarchical: bool,
        loc: SourceLocation,
    ) -> ConstantValue {
        let sym = self.comp.symbol(symbol);
        if hierarchical {
            self.diag(
                DiagCode::NotAConstant,
                loc,
                vec![sym.name.clone().into()],
            );
            return ConstantValue::Bad;
        }
        match &sym.kind {
            SymbolKind::Parameter { .. } => match self.comp.parameter_cached(symbol) {
                Some(value) => value,
                None => {
                    self.diag(
                        DiagCode::NotAConstant,
                        loc,
                        vec![sym.name.clone().into()],
                    );
                    ConstantValue::Bad
                }
            },
            SymbolKind::EnumMember { value, .. } => ConstantValue::Integer(value.clone()),
            SymbolKind::Variable { ty, lifetime, .. } => {
                let ty = *ty;
                let lifetime = *lifetime;
                if let Some(v) = self.read_variable(symbol) {
                    return v.clone();
                }
                if lifetime == Lifetime::Static && !self.options.script_mode {
                    self.diag(
                        DiagCode::NotAConstant,
                        loc,
                        vec![sym.name.clone().into()],
                    );
                    return ConstantValue::Bad;
                }
                if self.options.strict {
                    self.diag(
                        DiagCode::UninitializedVariable,
                        loc,
                        vec![sym.name.clone().into()],
                    );
                    return ConstantValue::Bad;
                }
                let value = self.default_value(ty);
                if self.options.script_mode {
                    // Session variables materialize in the root frame.
                    self.frames[0].storage.insert(symbol, value.clone());
                }
                value
            }
            SymbolKind::FormalArg { ty, .. } => {
                let ty = *ty;
                match self.read_variable(symbol) {
                    Some(v) => v.clone(),
                    None => self.default_value(ty),
                }
            }
            _ => {
                self.diag(
                    DiagCode::NotAConstant,
                    loc,
                    vec![sym.name.clone().into()],
                );
                ConstantValue::Bad
            }
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, value: ConstantValue) -> ConstantValue {
        if value.is_bad() {
            return ConstantValue::Bad;
        }
        match (&value, op) {
            (_, UnaryOp::Plus) => value,
            (ConstantValue::Integer(v), UnaryOp::Minus) => ConstantValue::Integer(v.neg()),
            (ConstantValue::Real(r), UnaryOp::Minus) => ConstantValue::Real(-r),
            (ConstantValue::ShortReal(r), UnaryOp::Minus) => ConstantValue::ShortReal(-r),
            (ConstantValue::Integer(v), UnaryOp::BitwiseNot) => ConstantValue::Integer(v.not()),
            (_, UnaryOp::LogicalNot) => match value.truthy() {
                Some(b) => ConstantValue::from_bool(!b),
                None => ConstantValue::from_bit(Bit::X),
            },
            (ConstantValue::Integer(v), UnaryOp::ReductionAnd) => {
                ConstantValue::from_bit(v.reduce_and())
            }
            (ConstantValue::Integer(v), UnaryOp::ReductionOr) => {
                ConstantValue::from_bit(v.reduce_or())
            }
            (ConstantValue::Integer(v), UnaryOp::ReductionXor) => {
                ConstantValue::from_bit(v.reduce_xor())
            }
            (ConstantValue::Integer(v), UnaryOp::ReductionNand) => {
                ConstantValue::from_bit(invert_bit(v.reduce_and()))
            }
            (ConstantValue::Integer(v), UnaryOp::ReductionNor) => {
                ConstantValue::from_bit(invert_bit(v.reduce_or()))
            }
            (ConstantValue::Integer(v), UnaryOp::ReductionXnor) => {
                ConstantValue::from_bit(invert_bit(v.reduce_xor()))
            }
            _ => ConstantValue::Bad,
        }
    }

    fn eval_logical(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> ConstantValue {
        let l = self.eval(left);
        if l.is_bad() {
            return ConstantValue::Bad;
        }
        let lt = l.truthy();
        // Short-circuit on a deciding left operand.
        match op {
            BinaryOp::LogicalAnd if lt == Some(false) => return ConstantValue::from_bool(false),
            BinaryOp::LogicalOr if lt == Some(true) => return ConstantValue::from_bool(true),
            BinaryOp::LogicalImplication if lt == Some(false) => {
                return ConstantValue::from_bool(true);
            }
            _ => {}
        }
        let r = self.eval(right);
        if r.is_bad() {
            return ConstantValue::Bad;
        }
        let rt = r.truthy();
        let result = match op {
            BinaryOp::LogicalAnd => match (lt, rt) {
                (_, Some(false)) => Some(false),
                (Some(a), Some(b)) => Some(a && b),
                _ => None,
            },
            BinaryOp::LogicalOr => match (lt, rt) {
                (_, Some(true)) => Some(true),
                (Some(a), Some(b)) => Some(a || b),
                _ => None,
            },
            BinaryOp::LogicalImplication => match (lt, rt) {
                (_, Some(true)) => Some(true),
                (Some(a), Some(b)) => Some(!a || b),
                _ => None,
            },
            BinaryOp::LogicalEquivalence => match (lt, rt) {
                (Some(a), Some(b)) => Some(a == b),
                _ => None,
            },
            _ => unreachable!("non-logical operator in eval_logical"),
        };
        match result {
            Some(b) => ConstantValue::from_bool(b),
            None => ConstantValue::from_bit(Bit::X),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: ConstantValue,
        right: ConstantValue,
        left_expr: &Expression,
        loc: SourceLocation,
    ) -> ConstantValue {
        if left.is_bad() || right.is_bad() {
            return ConstantValue::Bad;
        }
        match (&left, &right) {
            (ConstantValue::Integer(l), ConstantValue::Integer(r)) => {
                self.eval_integer_binary(op, l, r, left_expr, loc)
            }
            (ConstantValue::Str(l), ConstantValue::Str(r)) => {
                let result = match op {
                    BinaryOp::Equality => l == r,
                    BinaryOp::Inequality => l != r,
                    BinaryOp::CaseEquality => l == r,
                    BinaryOp::CaseInequality => l != r,
                    BinaryOp::GreaterThan => l > r,
                    BinaryOp::GreaterThanEqual => l >= r,
                    BinaryOp::LessThan => l < r,
                    BinaryOp::LessThanEqual => l <= r,
                    _ => return ConstantValue::Bad,
                };
                ConstantValue::from_bool(result)
            }
            _ => {
                let (Some(l), Some(r)) = (left.to_real(), right.to_real()) else {
                    return ConstantValue::Bad;
                };
                match op {
                    BinaryOp::Add => ConstantValue::Real(l + r),
                    BinaryOp::Sub => ConstantValue::Real(l - r),
                    BinaryOp::Mul => ConstantValue::Real(l * r),
                    BinaryOp::Div => {
                        if r == 0.0 {
                            self.diag(DiagCode::DivideByZero, loc, vec![]);
                        }
                        ConstantValue::Real(l / r)
                    }
                    BinaryOp::Power => ConstantValue::Real(l.powf(r)),
                    BinaryOp::Equality | BinaryOp::CaseEquality => {
                        ConstantValue::from_bool(l == r)
                    }
                    BinaryOp::Inequality | BinaryOp::CaseInequality => {
                        ConstantValue::from_bool(l != r)
                    }
                    BinaryOp::GreaterThan => ConstantValue::from_bool(l > r),
                    BinaryOp::GreaterThanEqual => ConstantValue::from_bool(l >= r),
                    BinaryOp::LessThan => ConstantValue::from_bool(l < r),
                    BinaryOp::LessThanEqual => ConstantValue::from_bool(l <= r),
                    _ => ConstantValue::Bad,
                }
            }
        }
    }

    fn eval_integer_binary(
        &mut self,
        op: BinaryOp,
        l: &SvInt,
        r: &SvInt,
        left_expr: &Expression,
        loc: SourceLocation,
    ) -> ConstantValue {
        let result = match op {
            BinaryOp::Add => l.add(r),
            BinaryOp::Sub => l.sub(r),
            BinaryOp::Mul => l.mul(r),
            BinaryOp::Div => {
                if r.is_zero() {
                    self.diag(DiagCode::DivideByZero, loc, vec![]);
                }
                l.div(r)
            }
            BinaryOp::Mod => {
                if r.is_zero() {
                    self.diag(DiagCode::DivideByZero, loc, vec![]);
                }
                l.rem(r)
            }
            BinaryOp::Power => l.pow(r),
            BinaryOp::BinaryAnd => l.and(r),
            BinaryOp::BinaryOr => l.or(r),
            BinaryOp::BinaryXor => l.xor(r),
            BinaryOp::BinaryXnor => l.xor(r).not(),
            BinaryOp::LogicalShiftLeft | BinaryOp::ArithmeticShiftLeft => l.shl(r),
            BinaryOp::LogicalShiftRight => l.lshr(r),
            BinaryOp::ArithmeticShiftRight => {
                // Arithmetic right shift only sign-fills signed operands.
                let signed = self
                    .comp
                    .types
                    .integral_traits(left_expr.ty)
                    .map(|(_, s, _)| s)
                    .unwrap_or(l.is_signed());
                if signed { l.ashr(r) } else { l.lshr(r) }
            }
            BinaryOp::Equality => return ConstantValue::from_bit(l.logical_eq(r)),
            BinaryOp::Inequality => {
                return ConstantValue::from_bit(invert_bit(l.logical_eq(r)));
            }
            BinaryOp::CaseEquality => return ConstantValue::from_bool(l.case_eq(r)),
            BinaryOp::CaseInequality => return ConstantValue::from_bool(!l.case_eq(r)),
            BinaryOp::GreaterThan => {
                return relational(l, r, |o| o == std::cmp::Ordering::Greater);
            }
            BinaryOp::GreaterThanEqual => {
                return relational(l, r, |o| o != std::cmp::Ordering::Less);
            }
            BinaryOp::LessThan => {
                return relational(l, r, |o| o == std::cmp::Ordering::Less);
            }
            BinaryOp::LessThanEqual => {
                return relational(l, r, |o| o != std::cmp::Ordering::Greater);
            }
            _ => return ConstantValue::Bad,
        };
        ConstantValue::Integer(result)
    }

    fn eval_element_select(
        &mut self,
        value: &Expression,
        index: &Expression,
        expr: &Expression,
    ) -> ConstantValue {
        let base = self.eval(value);
        let idx = self.eval(index);
        if base.is_bad() || idx.is_bad() {
            return ConstantValue::Bad;
        }
        let Some(idx_int) = idx.integer() else {
            return ConstantValue::Bad;
        };
        let elem_width = self
            .comp
            .types
            .integral_traits(expr.ty)
            .map(|(w, _, _)| w)
            .unwrap_or(1);
        let canonical = self.comp.types.canonical(value.ty);
        match self.comp.types.kind(canonical) {
            TypeKind::UnpackedArray { range, .. } => {
                let range = *range;
                let ConstantValue::Elements(elems) = base else {
                    return ConstantValue::Bad;
                };
                let Some(i) = idx_int.as_i64() else {
                    return ConstantValue::Bad;
                };
                match range.offset_of(i) {
                    Some(off) => elems
                        .get(off as usize)
                        .cloned()
                        .unwrap_or(ConstantValue::Bad),
                    None => {
                        self.diag(
                            DiagCode::IndexOutOfBounds,
                            expr.loc,
                            vec![i.into(), self.comp.types.describe(value.ty).into()],
                        );
                        ConstantValue::Bad
                    }
                }
            }
            TypeKind::Str => {
                let ConstantValue::Str(s) = base else {
                    return ConstantValue::Bad;
                };
                // Out-of-range string indexing reads zero, per the LRM.
                let byte = idx_int
                    .as_i64()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| s.as_bytes().get(i).copied())
                    .unwrap_or(0);
                ConstantValue::Integer(SvInt::from_u64(8, false, byte as u64))
            }
            _ => {
                // Bit select of a packed value.
                let Some(base_int) = base.integer() else {
                    return ConstantValue::Bad;
                };
                if idx_int.has_unknown() {
                    return ConstantValue::Integer(SvInt::filled(elem_width, false, Bit::X));
                }
                let Some(declared) = self.declared_range(value.ty) else {
                    return ConstantValue::Bad;
                };
                let eb = self.elem_bits(value.ty);
                match idx_int.as_i64().and_then(|i| declared.offset_of(i)) {
                    Some(off) => {
                        ConstantValue::Integer(extract_bits(base_int, off * eb, eb))
                    }
                    None => {
                        self.diag(
                            DiagCode::IndexOutOfBounds,
                            expr.loc,
                            vec![
                                idx_int.as_i64().unwrap_or(-1).into(),
                                self.comp.types.describe(value.ty).into(),
                            ],
                        );
                        ConstantValue::Integer(SvInt::filled(elem_width, false, Bit::X))
                    }
                }
            }
        }
    }

    /// The declared range of a packed value's outermost dimension.
    fn declared_range(&self, ty: TypeId) -> Option<ConstantRange> {
        match self.comp.types.kind(self.comp.types.canonical(ty)) {
            TypeKind::PackedArray { range, .. } | TypeKind::UnpackedArray { range, .. } => {
                Some(*range)
            }
            TypeKind::Integral { width, .. } => Some(ConstantRange::new(*width as i64 - 1, 0)),
            TypeKind::Enum { base, .. } => self.declared_range(*base),
            TypeKind::Struct { packed: true, .. } => {
                let (w, _, _) = self.comp.types.integral_traits(ty)?;
                Some(ConstantRange::new(w as i64 - 1, 0))
            }
            _ => None,
        }
    }

    /// Bits per element of the outermost packed dimension.
    fn elem_bits(&self, ty: TypeId) -> u32 {
        match self.comp.types.kind(self.comp.types.canonical(ty)) {
            TypeKind::PackedArray { elem, .. } => self
                .comp
                .types
                .integral_traits(*elem)
                .map(|(w, _, _)| w)
                .unwrap_or(1),
            _ => 1,
        }
    }

    /// Translate a bound range select to a bit slice of the operand.
    fn resolve_range_bits(
        &mut self,
        value_ty: TypeId,
        range: &BoundRange,
        _loc: SourceLocation,
    ) -> RangeBits {
        let Some(declared) = self.declared_range(value_ty) else {
            return RangeBits::OutOfBounds;
        };
        let eb = self.elem_bits(value_ty);
        let (lo_idx, hi_idx) = match range {
            BoundRange::Constant(r) => {
                let (a, b) = (r.left.min(r.right), r.left.max(r.right));
                (a, b)
            }
            BoundRange::IndexedUp { base, width } => {
                let b = self.eval(base);
                let Some(bi) = b.integer().and_then(|v| v.as_i64()) else {
                    return RangeBits::Unknown;
                };
                let w = *width as i64;
                (bi, bi + w - 1)
            }
            BoundRange::IndexedDown { base, width } => {
                let b = self.eval(base);
                let Some(bi) = b.integer().and_then(|v| v.as_i64()) else {
                    return RangeBits::Unknown;
                };
                let w = *width as i64;
                (bi - w + 1, bi)
            }
        };
        let (Some(off_a), Some(off_b)) = (
            declared.offset_of(lo_idx),
            declared.offset_of(hi_idx),
        ) else {
            return RangeBits::OutOfBounds;
        };
        let lsb = off_a.min(off_b);
        let count = off_a.max(off_b) - lsb + 1;
        RangeBits::Bits {
            lsb: lsb * eb,
            width: count * eb,
        }
    }

    // -----------------------------------------------------------------
    // Lvalues
    // -----------------------------------------------------------------

    /// Resolve an expression to a storage path. Diagnoses and returns
    /// `None` when the expression does not denote writable storage or the
    /// selects cannot be resolved.
    pub fn eval_lvalue(&mut self, expr: &Expression) -> Option<LValue> {
        match &expr.kind {
            ExpressionKind::NamedValue {
                symbol,
                hierarchical,
            } => {
                if *hierarchical {
                    let name = self.comp.symbol(*symbol).name.clone();
                    self.diag(DiagCode::NotAConstant, expr.loc, vec![name.into()]);
                    return None;
                }
                Some(LValue {
                    root: *symbol,
                    path: Vec::new(),
                })
            }
            ExpressionKind::ElementSelect { value, index } => {
                let mut lv = self.eval_lvalue(value)?;
                let idx = self.eval(index);
                let Some(i) = idx.integer().and_then(|v| v.as_i64()) else {
                    self.diag(
                        DiagCode::IndexOutOfBounds,
                        expr.loc,
                        vec!["unknown index".into()],
                    );
                    return None;
                };
                let canonical = self.comp.types.canonical(value.ty);
                match self.comp.types.kind(canonical) {
                    TypeKind::UnpackedArray { range, .. } => {
                        match range.offset_of(i) {
                            Some(off) => {
                                lv.path.push(Selector::Element(off as usize));
                                Some(lv)
                            }
                            None => {
                                self.diag(
                                    DiagCode::IndexOutOfBounds,
                                    expr.loc,
                                    vec![i.into(), self.comp.types.describe(value.ty).into()],
                                );
                                None
                            }
                        }
                    }
                    _ => {
                        let declared = self.declared_range(value.ty)?;
                        let eb = self.elem_bits(value.ty);
                        match declared.offset_of(i) {
                            Some(off) => {
                                lv.path.push(Selector::BitRange {
                                    lsb: off * eb,
                                    width: eb,
                                });
                                Some(lv)
                            }
                            None => {
                                self.diag(
                                    DiagCode::IndexOutOfBounds,
                                    expr.loc,
                                    vec![i.into(), self.comp.types.describe(value.ty).into()],
                                );
                                None
                            }
                        }
                    }
                }
            }
            ExpressionKind::RangeSelect { value, range } => {
                let mut lv = self.eval_lvalue(value)?;
                match self.resolve_range_bits(value.ty, range, expr.loc) {
                    RangeBits::Bits { lsb, width } => {
                        lv.path.push(Selector::BitRange { lsb, width });
                        Some(lv)
                    }
                    RangeBits::OutOfBounds | RangeBits::Unknown => {
                        self.diag(
                            DiagCode::IndexOutOfBounds,
                            expr.loc,
                            vec![self.comp.types.describe(value.ty).into()],
                        );
                        None
                    }
                }
            }
            ExpressionKind::MemberAccess {
                value,
                field_index,
                offset,
                ..
            } => {
                let mut lv = self.eval_lvalue(value)?;
                if self.comp.types.integral_traits(value.ty).is_some() {
                    let width = self
                        .comp
                        .types
                        .integral_traits(expr.ty)
                        .map(|(w, _, _)| w)
                        .unwrap_or(1);
                    lv.path.push(Selector::BitRange {
                        lsb: *offset,
                        width,
                    });
                } else {
                    lv.path.push(Selector::Field(*field_index));
                }
                Some(lv)
            }
            _ => {
                self.diag(DiagCode::InvalidLValue, expr.loc, vec![]);
                None
            }
        }
    }

    /// Apply a write through an lvalue path. Writes outside any active
    /// frame are only legal in script mode (session variables).
    fn store(&mut self, lv: &LValue, value: ConstantValue, loc: SourceLocation) {
        let frame_idx = self
            .frames
            .iter()
            .rposition(|f| f.storage.contains_key(&lv.root));
        let frame_idx = match frame_idx {
            Some(idx) => {
                if idx != self.frames.len() - 1 && !self.options.script_mode {
                    let name = self.comp.symbol(lv.root).name.clone();
                    self.diag(DiagCode::NotAConstant, loc, vec![name.into()]);
                    return;
                }
                idx
            }
            None => {
                // A write to storage no frame declares: only script mode
                // may create session variables, in the root frame.
                let writable = matches!(
                    self.comp.symbol(lv.root).kind,
                    SymbolKind::Variable { .. } | SymbolKind::FormalArg { .. }
                );
                if !writable || !self.options.script_mode {
                    let name = self.comp.symbol(lv.root).name.clone();
                    self.diag(DiagCode::NotAConstant, loc, vec![name.into()]);
                    return;
                }
                let ty = self.root_type(lv.root);
                let default = self.default_value(ty);
                self.frames[0].storage.insert(lv.root, default);
                0
            }
        };
        let mut current = self.frames[frame_idx]
            .storage
            .remove(&lv.root)
            .unwrap_or(ConstantValue::Bad);
        apply_path(&mut current, &lv.path, value);
        self.frames[frame_idx].storage.insert(lv.root, current);
    }

    fn root_type(&self, symbol: SymbolId) -> TypeId {
        match &self.comp.symbol(symbol).kind {
            SymbolKind::Variable { ty, .. } | SymbolKind::FormalArg { ty, .. } => *ty,
            _ => self.comp.types.builtins.error,
        }
    }

    // -----------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------

    fn eval_call(
        &mut self,
        subroutine: SymbolId,
        args: &[Expression],
        loc: SourceLocation,
    ) -> ConstantValue {
        let name = self.comp.symbol(subroutine).name.clone();
        if self.frames.len() >= self.options.max_call_depth {
            self.diag(DiagCode::RecursionLimit, loc, vec![name.into()]);
            return ConstantValue::Bad;
        }
        let Some(body) = self.comp.subroutine_body(subroutine) else {
            self.diag(DiagCode::NotAConstant, loc, vec![name.into()]);
            return ConstantValue::Bad;
        };
        let formals = self.comp.subroutine_args(subroutine);
        let mut frame = Frame {
            subroutine: Some(subroutine),
            ..Frame::default()
        };
        // Copy-in by direction; Out and InOut (and Ref) record the caller
        // lvalue for copy-out at return.
        let mut copy_out: Vec<(SymbolId, LValue)> = Vec::new();
        for (&formal, arg) in formals.iter().zip(args) {
            let (ty, direction) = match &self.comp.symbol(formal).kind {
                SymbolKind::FormalArg { ty, direction } => (*ty, *direction),
                _ => continue,
            };
            match direction {
                ArgDirection::In => {
                    let v = self.eval(arg);
                    if v.is_bad() {
                        return ConstantValue::Bad;
                    }
                    frame.storage.insert(formal, v);
                }
                ArgDirection::Out => {
                    let Some(lv) = self.eval_lvalue(arg) else {
                        return ConstantValue::Bad;
                    };
                    frame.storage.insert(formal, self.default_value(ty));
                    copy_out.push((formal, lv));
                }
                ArgDirection::InOut | ArgDirection::Ref => {
                    let v = self.eval(arg);
                    if v.is_bad() {
                        return ConstantValue::Bad;
                    }
                    let Some(lv) = self.eval_lvalue(arg) else {
                        return ConstantValue::Bad;
                    };
                    frame.storage.insert(formal, self.coerce(ty, v));
                    copy_out.push((formal, lv));
                }
            }
        }
        trace!(function = %name, "calling subroutine");
        self.frames.push(frame);
        let mut aborted = false;
        for stmt in body.iter() {
            if !self.exec(stmt) {
                aborted = true;
                break;
            }
            if self.frame().has_returned {
                break;
            }
        }
        let mut frame = self.frames.pop().expect("call frame missing");
        if aborted {
            return ConstantValue::Bad;
        }
        let ret_ty = self.comp.subroutine_return_type(subroutine);
        let result = match frame.return_value.take() {
            Some(v) => v,
            None if self.comp.types.is_void(ret_ty) => ConstantValue::Null,
            None => self.default_value(ret_ty),
        };
        // Propagate Out/InOut/Ref writes back to the caller.
        for (formal, lv) in copy_out {
            let v = frame
                .storage
                .remove(&formal)
                .unwrap_or(ConstantValue::Bad);
            self.store(&lv, v, loc);
        }
        result
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    /// Execute one statement. Returns false when the step budget or the
    /// cancellation flag tripped and evaluation must unwind.
    pub fn exec(&mut self, stmt: &Statement) -> bool {
        if self.frame().has_returned {
            return true;
        }
        if !self.step(stmt.loc) {
            return false;
        }
        match &stmt.kind {
            StatementKind::Expression(e) => {
                self.eval(e);
                true
            }
            StatementKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.eval(cond);
                let taken = match c.truthy() {
                    Some(b) => b,
                    None => {
                        // Unknown condition falls through to the else arm;
                        // strict mode calls it out.
                        if self.options.strict {
                            self.diag(DiagCode::UnknownCondition, cond.loc, vec![]);
                        }
                        false
                    }
                };
                if taken {
                    self.exec(then_branch)
                } else if let Some(e) = else_branch {
                    self.exec(e)
                } else {
                    true
                }
            }
            StatementKind::Case {
                selector,
                items,
                default,
            } => {
                let sel = self.eval(selector);
                if sel.is_bad() {
                    return true;
                }
                for item in items {
                    for e in &item.expressions {
                        let v = self.eval(e);
                        // Case items match by bit-exact equality, so an
                        // arm full of x bits matches the same x bits.
                        if v.case_equal(&sel) {
                            return self.exec(&item.body);
                        }
                    }
                }
                match default {
                    Some(d) => self.exec(d),
                    None => true,
                }
            }
            StatementKind::For {
                loop_vars,
                init,
                condition,
                steps,
                body,
                ..
            } => {
                for (var, init_expr) in loop_vars {
                    let value = match init_expr {
                        Some(e) => self.eval(e),
                        None => {
                            let ty = self.root_type(*var);
                            self.default_value(ty)
                        }
                    };
                    self.frame_mut().storage.insert(*var, value);
                }
                for e in init {
                    self.eval(e);
                }
                loop {
                    // Every iteration charges the budget, so even an
                    // empty body cannot spin forever.
                    if !self.step(stmt.loc) {
                        return false;
                    }
                    if let Some(c) = condition {
                        match self.eval(c).truthy() {
                            Some(true) => {}
                            Some(false) => break,
                            None => {
                                if self.options.strict {
                                    self.diag(DiagCode::UnknownCondition, c.loc, vec![]);
                                }
                                break;
                            }
                        }
                    }
                    if !self.exec(body) {
                        return false;
                    }
                    if self.frame().has_returned {
                        break;
                    }
                    for s in steps {
                        self.eval(s);
                    }
                }
                true
            }
            StatementKind::Return { expr } => {
                let value = expr.as_ref().map(|e| self.eval(e));
                let frame = self.frame_mut();
                frame.return_value = value;
                frame.has_returned = true;
                true
            }
            StatementKind::Block { locals, body, .. } => {
                // Locals initialize in declaration order before the body.
                for (var, init) in locals {
                    let value = match init {
                        Some(e) => self.eval(e),
                        None => {
                            let ty = self.root_type(*var);
                            self.default_value(ty)
                        }
                    };
                    self.frame_mut().storage.insert(*var, value);
                }
                for s in body {
                    if !self.exec(s) {
                        return false;
                    }
                    if self.frame().has_returned {
                        break;
                    }
                }
                true
            }
            StatementKind::Invalid => true,
        }
    }

    // -----------------------------------------------------------------
    // Value plumbing
    // -----------------------------------------------------------------

    /// Coerce a value to a type: width and sign adjustment for integrals,
    /// rounding for reals, the LRM packing rules for strings.
    fn coerce(&mut self, ty: TypeId, value: ConstantValue) -> ConstantValue {
        if value.is_bad() || matches!(value, ConstantValue::Unbounded) {
            return value;
        }
        if self.comp.types.is_error(ty) {
            return value;
        }
        if let Some((w, s, f)) = self.comp.types.integral_traits(ty) {
            let as_int = match value {
                ConstantValue::Integer(v) => {
                    if w > v.width() {
                        v.extend(w, v.is_signed())
                    } else if w < v.width() {
                        v.truncate(w)
                    } else {
                        v
                    }
                }
                ConstantValue::Real(r) => SvInt::from_i64(w, s, r.round() as i64),
                ConstantValue::ShortReal(r) => SvInt::from_i64(w, s, r.round() as i64),
                ConstantValue::Str(text) => string_to_int(&text).resize(w),
                _ => return ConstantValue::Bad,
            };
            let flagged = as_int.with_signed(s);
            return ConstantValue::Integer(if f {
                flagged.to_four_state()
            } else {
                flagged.to_two_state()
            });
        }
        let canonical = self.comp.types.canonical(ty);
        match self.comp.types.kind(canonical) {
            TypeKind::Real => match value.to_real() {
                Some(r) => ConstantValue::Real(r),
                None => ConstantValue::Bad,
            },
            TypeKind::ShortReal => match value.to_real() {
                Some(r) => ConstantValue::ShortReal(r as f32),
                None => ConstantValue::Bad,
            },
            TypeKind::Str => match value {
                ConstantValue::Str(_) => value,
                ConstantValue::Integer(v) => ConstantValue::Str(int_to_string(&v)),
                _ => ConstantValue::Bad,
            },
            TypeKind::UnpackedArray { .. } | TypeKind::Struct { .. } => match value {
                ConstantValue::Elements(_) => value,
                _ => ConstantValue::Bad,
            },
            _ => value,
        }
    }

    /// The value a declaration takes before any assignment: zero for
    /// integrals (strict mode diagnoses reads that get here), empty
    /// aggregates element-wise.
    fn default_value(&self, ty: TypeId) -> ConstantValue {
        if let Some((w, s, f)) = self.comp.types.integral_traits(ty) {
            let zero = SvInt::zero(w, s);
            return ConstantValue::Integer(if f { zero.to_four_state() } else { zero });
        }
        match self.comp.types.kind(self.comp.types.canonical(ty)) {
            TypeKind::Real => ConstantValue::Real(0.0),
            TypeKind::ShortReal => ConstantValue::ShortReal(0.0),
            TypeKind::Str => ConstantValue::Str(String::new()),
            TypeKind::UnpackedArray { elem, range } => {
                let elem_default = self.default_value(*elem);
                ConstantValue::Elements(vec![elem_default; range.width() as usize])
            }
            TypeKind::Struct { fields, .. } => ConstantValue::Elements(
                fields.iter().map(|fld| self.default_value(fld.ty)).collect(),
            ),
            _ => ConstantValue::Bad,
        }
    }
}

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

fn invert_bit(bit: Bit) -> Bit {
    match bit {
        Bit::Zero => Bit::One,
        Bit::One => Bit::Zero,
        other => other,
    }
}

fn relational(l: &SvInt, r: &SvInt, f: impl Fn(std::cmp::Ordering) -> bool) -> ConstantValue {
    match l.compare(r) {
        Some(ord) => ConstantValue::from_bool(f(ord)),
        None => ConstantValue::from_bit(Bit::X),
    }
}

/// Slice `width` bits starting at `lsb`; positions past the value read X.
fn extract_bits(v: &SvInt, lsb: u32, width: u32) -> SvInt {
    let mut bits = Vec::with_capacity(width as usize);
    for k in 0..width {
        let idx = lsb + k;
        bits.push(if idx < v.width() { v.bit(idx) } else { Bit::X });
    }
    SvInt::from_bits(false, v.is_four_state(), &bits)
}

/// Merge the two arms of a conditional with an unknown selector: agreeing
/// bits survive, the rest become X.
fn merge_conditional(t: ConstantValue, f: ConstantValue) -> ConstantValue {
    match (&t, &f) {
        (ConstantValue::Integer(a), ConstantValue::Integer(b)) if a.width() == b.width() => {
            let mut bits = Vec::with_capacity(a.width() as usize);
            for i in 0..a.width() {
                let (x, y) = (a.bit(i), b.bit(i));
                bits.push(if x == y { x } else { Bit::X });
            }
            ConstantValue::Integer(SvInt::from_bits(a.is_signed(), true, &bits))
        }
        _ if t.case_equal(&f) => t,
        _ => ConstantValue::Bad,
    }
}

/// LRM string packing: each character is one byte, first character most
/// significant. Strings longer than the maximum width keep their least
/// significant bytes; the conversion resizes to the target anyway.
fn string_to_int(s: &str) -> SvInt {
    if s.is_empty() {
        return SvInt::zero(8, false);
    }
    let max_bytes = sv_core::MAX_WIDTH as usize / 8;
    let bytes = s.as_bytes();
    let bytes = &bytes[bytes.len().saturating_sub(max_bytes)..];
    let parts: Vec<SvInt> = bytes
        .iter()
        .map(|&b| SvInt::from_u64(8, false, b as u64))
        .collect();
    SvInt::concat(&parts)
}

/// Inverse packing: bytes from most significant down, zero bytes skipped.
fn int_to_string(v: &SvInt) -> String {
    let v = v.to_two_state();
    let nbytes = v.width().div_ceil(8);
    let mut out = Vec::new();
    for i in (0..nbytes).rev() {
        let byte = extract_bits(&v, i * 8, 8).as_u64().unwrap_or(0) as u8;
        if byte != 0 || !out.is_empty() {
            out.push(byte);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Apply a write at the end of a selector path, preserving everything the
/// path does not name.
fn apply_path(target: &mut ConstantValue, path: &[Selector], value: ConstantValue) {
    let Some((sel, rest)) = path.split_first() else {
        *target = value;
        return;
    };
    match sel {
        Selector::Element(i) | Selector::Field(i) => {
            if let ConstantValue::Elements(elems) = target
                && let Some(slot) = elems.get_mut(*i)
            {
                apply_path(slot, rest, value);
            }
        }
        Selector::BitRange { lsb, width } => {
            let ConstantValue::Integer(cur) = target else {
                return;
            };
            if rest.is_empty() {
                let Some(nv) = value.integer() else {
                    return;
                };
                for k in 0..*width {
                    let idx = lsb + k;
                    if idx < cur.width() {
                        let bit = if k < nv.width() { nv.bit(k) } else { Bit::Zero };
                        cur.set_bit(idx, bit);
                    }
                }
            } else {
                // A nested packed selection: pull the slice out, recurse,
                // and write it back bit by bit.
                let mut sub = ConstantValue::Integer(extract_bits(cur, *lsb, *width));
                apply_path(&mut sub, rest, value);
                if let ConstantValue::Integer(sub) = sub {
                    for k in 0..*width {
                        let idx = lsb + k;
                        if idx < cur.width() && k < sub.width() {
                            cur.set_bit(idx, sub.bit(k));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sv_core::parse_literal;

    fn int(text: &str) -> ConstantValue {
        ConstantValue::Integer(parse_literal(text).unwrap())
    }

    #[test]
    fn test_extract_bits_reads_x_past_the_end() {
        let v = parse_literal("8'b1010_0110").unwrap();
        let nibble = extract_bits(&v, 4, 4);
        assert_eq!(nibble.as_u64(), Some(0b1010));
        let over = extract_bits(&v, 6, 4);
        assert_eq!(over.bit(0), Bit::Zero);
        assert_eq!(over.bit(1), Bit::One);
        assert_eq!(over.bit(2), Bit::X);
        assert_eq!(over.bit(3), Bit::X);
    }

    #[test]
    fn test_merge_conditional_keeps_agreeing_bits() {
        let merged = merge_conditional(int("4'b1100"), int("4'b1010"));
        let v = merged.integer().unwrap();
        assert_eq!(v.bit(3), Bit::One);
        assert_eq!(v.bit(2), Bit::X);
        assert_eq!(v.bit(1), Bit::X);
        assert_eq!(v.bit(0), Bit::Zero);
        // Non-integers merge only when identical.
        let same = merge_conditional(
            ConstantValue::Str("a".into()),
            ConstantValue::Str("a".into()),
        );
        assert_eq!(same, ConstantValue::Str("a".into()));
        let differ = merge_conditional(
            ConstantValue::Str("a".into()),
            ConstantValue::Str("b".into()),
        );
        assert!(differ.is_bad());
    }

    #[test]
    fn test_string_packing_round_trip() {
        let packed = string_to_int("Hi");
        assert_eq!(packed.width(), 16);
        assert_eq!(packed.as_u64(), Some(0x4869));
        assert_eq!(int_to_string(&packed), "Hi");
        // Leading zero bytes vanish when unpacking.
        assert_eq!(int_to_string(&packed.extend(32, false)), "Hi");
    }

    #[test]
    fn test_apply_path_bit_range_preserves_rest() {
        let mut target = int("8'b0000_0000");
        apply_path(
            &mut target,
            &[Selector::BitRange { lsb: 2, width: 4 }],
            int("4'b1x11"),
        );
        let v = target.integer().unwrap();
        assert_eq!(v.bit(1), Bit::Zero);
        assert_eq!(v.bit(2), Bit::One);
        assert_eq!(v.bit(3), Bit::One);
        assert_eq!(v.bit(4), Bit::X);
        assert_eq!(v.bit(5), Bit::One);
        assert_eq!(v.bit(6), Bit::Zero);
    }

    #[test]
    fn test_apply_path_element_write() {
        let mut target = ConstantValue::Elements(vec![int("8'd1"), int("8'd2")]);
        apply_path(&mut target, &[Selector::Element(1)], int("8'd9"));
        match target {
            ConstantValue::Elements(elems) => {
                assert_eq!(elems[0], int("8'd1"));
                assert_eq!(elems[1], int("8'd9"));
            }
            other => panic!("expected elements, got {:?}", other),
        }
    }

    #[test]
    fn test_options_defaults() {
        let opts = EvalOptions::default();
        assert!(!opts.strict);
        assert!(!opts.script_mode);
        assert!(opts.max_steps > 0);
        assert!(EvalOptions::strict().strict);
        assert!(EvalOptions::script().script_mode);
    }
}
