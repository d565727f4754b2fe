//! The elaboration type model.
//!
//! Types are interned in a [`Types`] table and referenced by [`TypeId`]
//! handles, so the cyclic symbol/expression graphs can point at types
//! without ownership questions. Integral types (including packed arrays)
//! are deduplicated structurally; structs and enums are nominal and every
//! declaration gets a fresh entry. Aliases resolve eagerly to a canonical
//! representative for equivalence checks.

use std::collections::HashMap;
use sv_core::{MAX_WIDTH, SvInt};

/// Handle into the [`Types`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A constant `[left:right]` dimension. `left >= right` is the usual
/// descending (little-endian) form; ascending ranges put the MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstantRange {
    pub left: i64,
    pub right: i64,
}

impl ConstantRange {
    pub fn new(left: i64, right: i64) -> ConstantRange {
        ConstantRange { left, right }
    }

    /// Number of elements (or bits) covered.
    pub fn width(&self) -> u32 {
        (self.left.abs_diff(self.right) + 1).min(u32::MAX as u64) as u32
    }

    pub fn contains(&self, index: i64) -> bool {
        let (lo, hi) = if self.left <= self.right {
            (self.left, self.right)
        } else {
            (self.right, self.left)
        };
        index >= lo && index <= hi
    }

    /// Offset of `index` from the LSB end of the storage. In a descending
    /// range `[7:0]` element 0 is offset 0; in an ascending range `[0:7]`
    /// element 7 is offset 0.
    pub fn offset_of(&self, index: i64) -> Option<u32> {
        if !self.contains(index) {
            return None;
        }
        let off = if self.left >= self.right {
            index - self.right
        } else {
            self.right - index
        };
        Some(off as u32)
    }
}

/// A field of a packed or unpacked struct. `offset` is the bit offset from
/// the LSB for packed structs and the element index otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeId,
    pub offset: u32,
}

/// A member of an enum type, with its fixed compile-time value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberInfo {
    pub name: String,
    pub value: SvInt,
}

/// The closed union of type shapes known to the core.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Two- or four-state integral scalar or vector, e.g. `int`, `logic`.
    Integral {
        width: u32,
        signed: bool,
        four_state: bool,
    },
    Real,
    ShortReal,
    Str,
    Event,
    Void,
    Null,
    Error,
    /// Packed array over an integral element; carries the declared range so
    /// selects can translate indices.
    PackedArray {
        elem: TypeId,
        range: ConstantRange,
        signed: bool,
    },
    UnpackedArray {
        elem: TypeId,
        range: ConstantRange,
    },
    Struct {
        name: String,
        packed: bool,
        fields: Vec<FieldInfo>,
    },
    Enum {
        name: String,
        base: TypeId,
        members: Vec<EnumMemberInfo>,
    },
    Alias {
        name: String,
        target: TypeId,
    },
}

/// Result of an assignment-compatibility query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compat {
    Implicit,
    Explicit,
    Incompatible,
}

/// Pre-interned handles for the predefined types.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTypes {
    pub bit: TypeId,
    pub logic: TypeId,
    pub byte: TypeId,
    pub shortint: TypeId,
    pub int: TypeId,
    pub longint: TypeId,
    pub integer: TypeId,
    pub time: TypeId,
    pub real: TypeId,
    pub shortreal: TypeId,
    pub string: TypeId,
    pub event: TypeId,
    pub void: TypeId,
    pub null: TypeId,
    pub error: TypeId,
}

/// Interning table over [`TypeKind`].
#[derive(Debug)]
pub struct Types {
    entries: Vec<TypeKind>,
    integral_cache: HashMap<(u32, bool, bool), TypeId>,
    packed_cache: HashMap<(TypeId, i64, i64, bool), TypeId>,
    unpacked_cache: HashMap<(TypeId, i64, i64), TypeId>,
    pub builtins: BuiltinTypes,
}

impl Default for Types {
    fn default() -> Self {
        Types::new()
    }
}

impl Types {
    pub fn new() -> Types {
        let mut table = Types {
            entries: Vec::new(),
            integral_cache: HashMap::new(),
            packed_cache: HashMap::new(),
            unpacked_cache: HashMap::new(),
            // Placeholder; replaced below once the entries exist.
            builtins: BuiltinTypes {
                bit: TypeId(0),
                logic: TypeId(0),
                byte: TypeId(0),
                shortint: TypeId(0),
                int: TypeId(0),
                longint: TypeId(0),
                integer: TypeId(0),
                time: TypeId(0),
                real: TypeId(0),
                shortreal: TypeId(0),
                string: TypeId(0),
                event: TypeId(0),
                void: TypeId(0),
                null: TypeId(0),
                error: TypeId(0),
            },
        };
        let builtins = BuiltinTypes {
            bit: table.integral(1, false, false),
            logic: table.integral(1, false, true),
            byte: table.integral(8, true, false),
            shortint: table.integral(16, true, false),
            int: table.integral(32, true, false),
            longint: table.integral(64, true, false),
            integer: table.integral(32, true, true),
            time: table.integral(64, false, true),
            real: table.intern(TypeKind::Real),
            shortreal: table.intern(TypeKind::ShortReal),
            string: table.intern(TypeKind::Str),
            event: table.intern(TypeKind::Event),
            void: table.intern(TypeKind::Void),
            null: table.intern(TypeKind::Null),
            error: table.intern(TypeKind::Error),
        };
        table.builtins = builtins;
        table
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.entries.len() as u32);
        self.entries.push(kind);
        id
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.entries[id.index()]
    }

    /// The canonical representative: aliases resolved away.
    pub fn canonical(&self, id: TypeId) -> TypeId {
        let mut cur = id;
        while let TypeKind::Alias { target, .. } = self.kind(cur) {
            cur = *target;
        }
        cur
    }

    /// Intern an integral type, deduplicated structurally.
    pub fn integral(&mut self, width: u32, signed: bool, four_state: bool) -> TypeId {
        if let Some(&id) = self.integral_cache.get(&(width, signed, four_state)) {
            return id;
        }
        let id = self.intern(TypeKind::Integral {
            width,
            signed,
            four_state,
        });
        self.integral_cache.insert((width, signed, four_state), id);
        id
    }

    pub fn packed_array(&mut self, elem: TypeId, range: ConstantRange, signed: bool) -> TypeId {
        let key = (elem, range.left, range.right, signed);
        if let Some(&id) = self.packed_cache.get(&key) {
            return id;
        }
        let id = self.intern(TypeKind::PackedArray {
            elem,
            range,
            signed,
        });
        self.packed_cache.insert(key, id);
        id
    }

    pub fn unpacked_array(&mut self, elem: TypeId, range: ConstantRange) -> TypeId {
        let key = (elem, range.left, range.right);
        if let Some(&id) = self.unpacked_cache.get(&key) {
            return id;
        }
        let id = self.intern(TypeKind::UnpackedArray { elem, range });
        self.unpacked_cache.insert(key, id);
        id
    }

    /// A fresh nominal struct type.
    pub fn add_struct(&mut self, name: String, packed: bool, fields: Vec<FieldInfo>) -> TypeId {
        self.intern(TypeKind::Struct {
            name,
            packed,
            fields,
        })
    }

    /// A fresh nominal enum type.
    pub fn add_enum(&mut self, name: String, base: TypeId, members: Vec<EnumMemberInfo>) -> TypeId {
        self.intern(TypeKind::Enum {
            name,
            base,
            members,
        })
    }

    /// A typedef alias.
    pub fn alias(&mut self, name: String, target: TypeId) -> TypeId {
        self.intern(TypeKind::Alias {
            name,
            target,
        })
    }

    // -- queries --

    pub fn is_error(&self, id: TypeId) -> bool {
        matches!(self.kind(self.canonical(id)), TypeKind::Error)
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.kind(self.canonical(id)), TypeKind::Void)
    }

    pub fn is_string(&self, id: TypeId) -> bool {
        matches!(self.kind(self.canonical(id)), TypeKind::Str)
    }

    pub fn is_real(&self, id: TypeId) -> bool {
        matches!(
            self.kind(self.canonical(id)),
            TypeKind::Real | TypeKind::ShortReal
        )
    }

    pub fn is_enum(&self, id: TypeId) -> bool {
        matches!(self.kind(self.canonical(id)), TypeKind::Enum { .. })
    }

    pub fn is_unpacked_aggregate(&self, id: TypeId) -> bool {
        matches!(
            self.kind(self.canonical(id)),
            TypeKind::UnpackedArray { .. } | TypeKind::Struct { packed: false, .. }
        )
    }

    pub fn is_integral(&self, id: TypeId) -> bool {
        self.integral_traits(id).is_some()
    }

    /// `(width, signed, four_state)` for anything with an integral bit
    /// pattern: integrals, packed arrays, packed structs, enums.
    pub fn integral_traits(&self, id: TypeId) -> Option<(u32, bool, bool)> {
        match self.kind(self.canonical(id)) {
            TypeKind::Integral {
                width,
                signed,
                four_state,
            } => Some((*width, *signed, *four_state)),
            TypeKind::PackedArray {
                elem,
                range,
                signed,
            } => {
                let (ew, _, ef) = self.integral_traits(*elem)?;
                // Widths past the representable maximum stop being
                // integral rather than wrapping.
                let width = ew as u64 * range.width() as u64;
                if width > MAX_WIDTH as u64 {
                    return None;
                }
                Some((width as u32, *signed, ef))
            }
            TypeKind::Struct {
                packed: true,
                fields,
                ..
            } => {
                let mut width = 0u64;
                let mut four = false;
                for f in fields {
                    let (fw, _, ff) = self.integral_traits(f.ty)?;
                    width += fw as u64;
                    four |= ff;
                }
                if width > MAX_WIDTH as u64 {
                    return None;
                }
                Some((width as u32, false, four))
            }
            TypeKind::Enum { base, .. } => self.integral_traits(*base),
            _ => None,
        }
    }

    /// Total bit size for `$bits`, including unpacked shapes.
    pub fn bits_of(&self, id: TypeId) -> Option<u64> {
        if let Some((w, _, _)) = self.integral_traits(id) {
            return Some(w as u64);
        }
        match self.kind(self.canonical(id)) {
            TypeKind::UnpackedArray { elem, range } => {
                Some(self.bits_of(*elem)? * range.width() as u64)
            }
            TypeKind::Struct { fields, .. } => {
                let mut total = 0;
                for f in fields {
                    total += self.bits_of(f.ty)?;
                }
                Some(total)
            }
            _ => None,
        }
    }

    /// The common type of two operands under the LRM expression rules:
    /// maximum width, signed only if both are, four-state if either is (or
    /// the context forces it). `None` when the operands have no common
    /// integral or floating type.
    pub fn common_type(
        &mut self,
        a: TypeId,
        b: TypeId,
        force_four_state: bool,
    ) -> Option<TypeId> {
        if self.is_error(a) || self.is_error(b) {
            return Some(self.builtins.error);
        }
        let a_real = self.is_real(a);
        let b_real = self.is_real(b);
        if a_real || b_real {
            let other_ok = |t: TypeId, t_real: bool| t_real || self.integral_traits(t).is_some();
            if !other_ok(a, a_real) || !other_ok(b, b_real) {
                return None;
            }
            let shortreal = |t: TypeId| matches!(self.kind(self.canonical(t)), TypeKind::ShortReal);
            if (a_real && !shortreal(a)) || (b_real && !shortreal(b)) {
                return Some(self.builtins.real);
            }
            return Some(self.builtins.shortreal);
        }
        let (aw, asig, af) = self.integral_traits(a)?;
        let (bw, bsig, bf) = self.integral_traits(b)?;
        Some(self.integral(
            aw.max(bw),
            asig && bsig,
            af || bf || force_four_state,
        ))
    }

    /// Type equivalence: structural on integrals and arrays, nominal on
    /// structs and enums (after alias resolution).
    pub fn equivalent(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.canonical(a);
        let b = self.canonical(b);
        if a == b {
            return true;
        }
        let ak = self.kind(a);
        let bk = self.kind(b);
        // Nominal kinds only match by identity, handled above. Packed
        // structs additionally match field-wise.
        match (ak, bk) {
            (TypeKind::Enum { .. }, _) | (_, TypeKind::Enum { .. }) => false,
            (
                TypeKind::Struct {
                    packed: true,
                    fields: af,
                    ..
                },
                TypeKind::Struct {
                    packed: true,
                    fields: bf,
                    ..
                },
            ) => {
                af.len() == bf.len()
                    && af
                        .iter()
                        .zip(bf)
                        .all(|(x, y)| self.equivalent(x.ty, y.ty))
            }
            (TypeKind::Struct { .. }, _) | (_, TypeKind::Struct { .. }) => false,
            (
                TypeKind::UnpackedArray {
                    elem: ae,
                    range: ar,
                },
                TypeKind::UnpackedArray {
                    elem: be,
                    range: br,
                },
            ) => ar.width() == br.width() && self.equivalent(*ae, *be),
            (TypeKind::UnpackedArray { .. }, _) | (_, TypeKind::UnpackedArray { .. }) => false,
            _ => {
                // Integral shapes (scalars and packed arrays) compare by
                // their bit traits.
                match (self.integral_traits(a), self.integral_traits(b)) {
                    (Some(x), Some(y)) => x == y,
                    _ => ak == bk,
                }
            }
        }
    }

    /// Assignment compatibility of `rhs` into a target of type `lhs`.
    pub fn assignable(&self, lhs: TypeId, rhs: TypeId) -> Compat {
        let l = self.canonical(lhs);
        let r = self.canonical(rhs);
        if self.is_error(l) || self.is_error(r) {
            // Invalid subtrees already diagnosed; do not cascade.
            return Compat::Implicit;
        }
        if self.equivalent(l, r) {
            return Compat::Implicit;
        }
        // Enums accept only their own members implicitly; anything integral
        // can be forced in with a cast.
        if self.is_enum(l) {
            return if self.integral_traits(r).is_some() || self.is_real(r) {
                Compat::Explicit
            } else {
                Compat::Incompatible
            };
        }
        let l_integral = self.integral_traits(l).is_some();
        let r_integral = self.integral_traits(r).is_some();
        if l_integral && r_integral {
            return Compat::Implicit;
        }
        // Real and integral convert freely with rounding.
        if (self.is_real(l) && (r_integral || self.is_real(r)))
            || (self.is_real(r) && l_integral)
        {
            return Compat::Implicit;
        }
        // Strings pack to and from integral bit vectors.
        if (self.is_string(l) && r_integral) || (l_integral && self.is_string(r)) {
            return Compat::Implicit;
        }
        // Unpacked aggregates assign element-wise when shapes line up.
        if let (
            TypeKind::UnpackedArray {
                elem: le,
                range: lr,
            },
            TypeKind::UnpackedArray {
                elem: re,
                range: rr,
            },
        ) = (self.kind(l), self.kind(r))
            && lr.width() == rr.width()
            && self.assignable(*le, *re) == Compat::Implicit
        {
            return Compat::Implicit;
        }
        Compat::Incompatible
    }

    /// Human-readable name for diagnostics.
    pub fn describe(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Alias { name, .. } => name.clone(),
            TypeKind::Integral {
                width,
                signed,
                four_state,
            } => {
                let b = self.builtins;
                for (candidate, label) in [
                    (b.bit, "bit"),
                    (b.logic, "logic"),
                    (b.byte, "byte"),
                    (b.shortint, "shortint"),
                    (b.int, "int"),
                    (b.longint, "longint"),
                    (b.integer, "integer"),
                    (b.time, "time"),
                ] {
                    if self.kind(candidate)
                        == (&TypeKind::Integral {
                            width: *width,
                            signed: *signed,
                            four_state: *four_state,
                        })
                    {
                        return label.to_string();
                    }
                }
                let base = if *four_state { "logic" } else { "bit" };
                let sign = if *signed { " signed" } else { "" };
                if *width == 1 {
                    format!("{}{}", base, sign)
                } else {
                    format!("{}{}[{}:0]", base, sign, width - 1)
                }
            }
            TypeKind::Real => "real".to_string(),
            TypeKind::ShortReal => "shortreal".to_string(),
            TypeKind::Str => "string".to_string(),
            TypeKind::Event => "event".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Null => "null".to_string(),
            TypeKind::Error => "<error>".to_string(),
            TypeKind::PackedArray {
                elem,
                range,
                signed,
            } => {
                let sign = if *signed { " signed" } else { "" };
                format!(
                    "{}{}[{}:{}]",
                    self.describe(*elem),
                    sign,
                    range.left,
                    range.right
                )
            }
            TypeKind::UnpackedArray { elem, range } => {
                format!("{}$[{}:{}]", self.describe(*elem), range.left, range.right)
            }
            TypeKind::Struct { name, packed, .. } => {
                let label = if name.is_empty() { "<anonymous>" } else { name };
                if *packed {
                    format!("struct packed {}", label)
                } else {
                    format!("struct {}", label)
                }
            }
            TypeKind::Enum { name, .. } => {
                if name.is_empty() {
                    "enum <anonymous>".to_string()
                } else {
                    format!("enum {}", name)
                }
            }
        }
    }
}
