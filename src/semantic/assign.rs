//! Assignability and constant-range checking.
//!
//! Stages run in order and the first failing stage ends the check:
//! structural validity, then the constant-range fast path, then general
//! type compatibility.

use tracing::trace;

use super::value::Value;
use crate::ast::Position;
use crate::diagnostics::{DiagnosticReporter, MessageKey};
use crate::types::bits::float_fits_bits;
use crate::types::{Lattice, NumericLiteral, Shape, TypeCode, TypeDescriptor};

/// Outcome of the constant-range stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstCheck {
    /// Not a pure numeric constant; continue with type compatibility.
    NotApplicable,
    Passed,
    Overflow,
}

/// Checks storing `value` into a destination of type `dst`.
#[derive(Debug, Clone, Copy)]
pub struct AssignChecker<'v> {
    pub dst: &'v TypeDescriptor,
    pub value: &'v Value,
    /// `any` destinations do not accept everything.
    pub ignore_any: bool,
    /// The destination is being assigned, so `nil` is accepted by nil-compatible types.
    pub allow_assign: bool,
    pub pos: &'v Position,
}

impl<'v> AssignChecker<'v> {
    pub fn new(dst: &'v TypeDescriptor, value: &'v Value, pos: &'v Position) -> Self {
        Self {
            dst,
            value,
            ignore_any: false,
            allow_assign: true,
            pos,
        }
    }

    pub fn ignore_any(mut self, ignore: bool) -> Self {
        self.ignore_any = ignore;
        self
    }

    pub fn allow_assign(mut self, allow: bool) -> Self {
        self.allow_assign = allow;
        self
    }

    /// Run every stage, reporting the first failure. Returns whether the
    /// assignment is valid.
    pub fn check(&self, lattice: &Lattice, reporter: &mut DiagnosticReporter) -> bool {
        if !self.check_validity(reporter) {
            return false;
        }
        match self.check_const(lattice) {
            ConstCheck::Passed => return true,
            ConstCheck::Overflow => {
                reporter.report_at(MessageKey::OverflowLimits, self.pos);
                return false;
            }
            ConstCheck::NotApplicable => {}
        }
        if self.check_type(lattice) {
            return true;
        }
        reporter.report(
            MessageKey::IncompatibleTypes,
            self.pos,
            [self.dst.kind.as_str(), self.value.ty.kind.as_str()],
        );
        false
    }

    /// Bound methods and generic functions cannot be used as plain function values.
    fn check_validity(&self, reporter: &mut DiagnosticReporter) -> bool {
        let Some(sig) = self.value.ty.fn_signature() else {
            return true;
        };
        if sig.has_receiver {
            reporter.report_at(MessageKey::MethodAsAnonymousFn, self.pos);
            return false;
        }
        if sig.generics > 0 {
            reporter.report_at(MessageKey::GenericedFnAsAnonymousFn, self.pos);
            return false;
        }
        true
    }

    /// Range check of a numeric constant against a pure numeric destination.
    pub fn check_const(&self, lattice: &Lattice) -> ConstCheck {
        let (dst, src) = (self.dst, &self.value.ty);
        if !dst.is_pure() || !src.is_pure() || !dst.code.is_numeric() || !src.code.is_numeric() {
            return ConstCheck::NotApplicable;
        }
        let Some(lit) = self.value.numeric() else {
            return ConstCheck::NotApplicable;
        };
        let fits = const_fits(lattice, dst.code, lit);
        trace!(dst = %dst.kind, literal = ?self.value.literal(), fits, "constant range check");
        if fits {
            ConstCheck::Passed
        } else {
            ConstCheck::Overflow
        }
    }

    /// General compatibility of the two types.
    pub fn check_type(&self, lattice: &Lattice) -> bool {
        let (dst, src) = (self.dst, &self.value.ty);
        if src.is_void() {
            return false;
        }
        if dst.code == TypeCode::Any && dst.shape == Shape::Plain && !self.ignore_any {
            return true;
        }
        if dst.is_multi_typed() || src.is_multi_typed() {
            return dst.kind == src.kind;
        }
        if src.is_nil() {
            return self.allow_assign && dst.is_nil_compatible();
        }
        match (&dst.shape, &src.shape) {
            (Shape::Plain, Shape::Plain) => lattice.is_compatible(dst.code, src.code, self.ignore_any),
            (Shape::Named(_), Shape::Named(_)) if dst.is_pure() && src.is_pure() => dst == src,
            _ => dst.kind == src.kind,
        }
    }
}

/// Whether the literal `lit` is representable by `dst`.
pub fn const_fits(lattice: &Lattice, dst: TypeCode, lit: NumericLiteral) -> bool {
    if dst.is_float() {
        let bits = lattice.bit_size(dst).unwrap_or(64);
        return float_fits_bits(lit.as_f64(), bits);
    }
    if let Some((min, max)) = lattice.signed_range(dst) {
        return match lit {
            NumericLiteral::Float(f) => f.fract() == 0.0 && f >= min as f64 && f <= max as f64,
            NumericLiteral::Unsigned(u) => u <= max as u64,
            NumericLiteral::Signed(i) => i >= min && i <= max,
        };
    }
    if let Some(max) = lattice.unsigned_max(dst) {
        return match lit {
            NumericLiteral::Float(f) => f >= 0.0 && f.fract() == 0.0 && f <= max as f64,
            NumericLiteral::Unsigned(u) => u <= max,
            NumericLiteral::Signed(i) => i >= 0 && (i as u64) <= max,
        };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PackageId;
    use crate::codegen::CodeNode;
    use crate::config::Arch;
    use crate::semantic::value::Constant;
    use crate::types::FnSignature;

    fn pos() -> Position {
        Position::new("t.x", PackageId::new("t"), 1, 1)
    }

    fn int(v: i64) -> Value {
        Value::constant(
            TypeDescriptor::builtin(TypeCode::Int),
            Constant::numeric(NumericLiteral::Signed(v)),
        )
    }

    fn check(dst: TypeCode, value: &Value) -> (bool, DiagnosticReporter) {
        let mut reporter = DiagnosticReporter::new();
        let dst = TypeDescriptor::builtin(dst);
        let at = pos();
        let ok = AssignChecker::new(&dst, value, &at).check(&Lattice::new(Arch::Amd64), &mut reporter);
        (ok, reporter)
    }

    #[test]
    fn u8_range() {
        assert!(check(TypeCode::U8, &int(255)).0);
        let (ok, reporter) = check(TypeCode::U8, &int(300));
        assert!(!ok);
        assert!(reporter.contains(MessageKey::OverflowLimits));
        let (ok, reporter) = check(TypeCode::U8, &int(-1));
        assert!(!ok);
        assert!(reporter.contains(MessageKey::OverflowLimits));
    }

    #[test]
    fn every_width_accepts_its_bounds_and_rejects_one_past() {
        let l = Lattice::new(Arch::Amd64);
        for dst in [TypeCode::I8, TypeCode::I16, TypeCode::I32] {
            let (min, max) = l.signed_range(dst).unwrap();
            assert!(check(dst, &int(min)).0);
            assert!(check(dst, &int(max)).0);
            assert!(!check(dst, &int(min - 1)).0);
            assert!(!check(dst, &int(max + 1)).0);
        }
        for dst in [TypeCode::U8, TypeCode::U16, TypeCode::U32] {
            let max = l.unsigned_max(dst).unwrap() as i64;
            assert!(check(dst, &int(0)).0);
            assert!(check(dst, &int(max)).0);
            assert!(!check(dst, &int(max + 1)).0);
            assert!(!check(dst, &int(-1)).0);
        }
    }

    #[test]
    fn float_literals_need_integral_values_for_integers() {
        let half = Value::constant(
            TypeDescriptor::builtin(TypeCode::F64),
            Constant::numeric(NumericLiteral::Float(1.5)),
        );
        assert!(!check(TypeCode::I32, &half).0);
        let two = Value::constant(
            TypeDescriptor::builtin(TypeCode::F64),
            Constant::numeric(NumericLiteral::Float(2.0)),
        );
        assert!(check(TypeCode::I32, &two).0);
        assert!(check(TypeCode::F32, &half).0);
    }

    #[test]
    fn non_constants_use_the_lattice() {
        let var = Value::new(TypeDescriptor::builtin(TypeCode::I64), CodeNode::lit("x_"));
        let (ok, reporter) = check(TypeCode::I32, &var);
        assert!(!ok);
        assert!(reporter.contains(MessageKey::IncompatibleTypes));
        assert!(check(TypeCode::F64, &var).0);
        assert!(check(TypeCode::Any, &var).0);
    }

    #[test]
    fn structural_failures_stop_the_check() {
        let method = Value::new(
            TypeDescriptor::func(FnSignature {
                has_receiver: true,
                generics: 0,
                params: Vec::new(),
                variadic: false,
                ret: TypeDescriptor::void(),
            }),
            CodeNode::lit("p.m_"),
        );
        let (ok, reporter) = check(TypeCode::Str, &method);
        assert!(!ok);
        assert!(reporter.contains(MessageKey::MethodAsAnonymousFn));
        assert!(!reporter.contains(MessageKey::IncompatibleTypes));
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn nil_needs_an_assignable_nilable_destination() {
        let nil = Value::new(TypeDescriptor::nil(), CodeNode::lit("nullptr"));
        let slice = TypeDescriptor::array(TypeDescriptor::builtin(TypeCode::I32));
        let at = pos();
        let lattice = Lattice::new(Arch::Amd64);
        let mut reporter = DiagnosticReporter::new();
        assert!(AssignChecker::new(&slice, &nil, &at).check(&lattice, &mut reporter));
        assert!(!AssignChecker::new(&slice, &nil, &at)
            .allow_assign(false)
            .check(&lattice, &mut reporter));
        assert!(!check(TypeCode::I32, &nil).0);
    }

    #[test]
    fn tuples_compare_by_kind() {
        let pair = |a, b| {
            TypeDescriptor::tuple(vec![TypeDescriptor::builtin(a), TypeDescriptor::builtin(b)])
        };
        let value = Value::new(pair(TypeCode::I32, TypeCode::Bool), CodeNode::lit("f()"));
        let at = pos();
        let lattice = Lattice::new(Arch::Amd64);
        let mut reporter = DiagnosticReporter::new();
        let same = pair(TypeCode::I32, TypeCode::Bool);
        assert!(AssignChecker::new(&same, &value, &at).check(&lattice, &mut reporter));
        let wider = pair(TypeCode::I64, TypeCode::Bool);
        assert!(!AssignChecker::new(&wider, &value, &at).check(&lattice, &mut reporter));
    }
}
