//! Type descriptors: a built-in code plus optional composite shape.

use std::fmt;

use super::{Lattice, TypeCode};
use crate::ast::PackageId;
use crate::codegen::mangle;

/// A user-defined type reference (struct, trait or enum).
#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub name: String,
    /// Owning package; `None` until the resolver has seen the reference.
    pub package: Option<PackageId>,
    pub generics: Vec<TypeDescriptor>,
}

/// Signature of a function value.
#[derive(Debug, Clone, PartialEq)]
pub struct FnSignature {
    pub has_receiver: bool,
    pub generics: usize,
    pub params: Vec<TypeDescriptor>,
    pub variadic: bool,
    pub ret: TypeDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Plain,
    Named(NamedType),
    /// Reference to the generic parameter at this index.
    Param(usize),
    Array(Box<TypeDescriptor>),
    Pointer(Box<TypeDescriptor>),
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Func(Box<FnSignature>),
    /// Multi-typed value; always at least two components.
    Tuple(Vec<TypeDescriptor>),
}

#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub code: TypeCode,
    /// Source spelling, used in diagnostics.
    pub kind: String,
    pub shape: Shape,
    /// Alias name when this descriptor was reached through a type alias.
    pub alias: Option<String>,
}

impl PartialEq for TypeDescriptor {
    /// Type identity; spelling and alias origin do not matter.
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.shape == other.shape
    }
}

impl TypeDescriptor {
    fn with_shape(code: TypeCode, kind: String, shape: Shape) -> Self {
        Self {
            code,
            kind,
            shape,
            alias: None,
        }
    }

    pub fn builtin(code: TypeCode) -> Self {
        Self::with_shape(code, code.name().to_string(), Shape::Plain)
    }

    pub fn void() -> Self {
        Self::builtin(TypeCode::Void)
    }

    pub fn nil() -> Self {
        Self::builtin(TypeCode::Nil)
    }

    /// Reference to a struct, trait or enum by name.
    pub fn named(code: TypeCode, name: &str) -> Self {
        Self::named_generic(code, name, Vec::new())
    }

    pub fn named_generic(code: TypeCode, name: &str, generics: Vec<TypeDescriptor>) -> Self {
        let kind = if generics.is_empty() {
            name.to_string()
        } else {
            let args: Vec<_> = generics.iter().map(|g| g.kind.as_str()).collect();
            format!("{}[{}]", name, args.join(","))
        };
        let named = NamedType {
            name: name.to_string(),
            package: None,
            generics,
        };
        Self::with_shape(code, kind, Shape::Named(named))
    }

    pub fn param(name: &str, index: usize) -> Self {
        Self::with_shape(TypeCode::Generic, name.to_string(), Shape::Param(index))
    }

    pub fn array(elem: TypeDescriptor) -> Self {
        let kind = format!("[]{}", elem.kind);
        Self::with_shape(TypeCode::Array, kind, Shape::Array(Box::new(elem)))
    }

    pub fn pointer(elem: TypeDescriptor) -> Self {
        let kind = format!("*{}", elem.kind);
        Self::with_shape(TypeCode::Pointer, kind, Shape::Pointer(Box::new(elem)))
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        let kind = format!("[{}:{}]", key.kind, value.kind);
        Self::with_shape(TypeCode::Map, kind, Shape::Map(Box::new(key), Box::new(value)))
    }

    pub fn func(sig: FnSignature) -> Self {
        let params: Vec<_> = sig.params.iter().map(|p| p.kind.as_str()).collect();
        let mut kind = format!("fn({})", params.join(","));
        if !sig.ret.is_void() {
            kind.push_str(&sig.ret.kind);
        }
        Self::with_shape(TypeCode::Func, kind, Shape::Func(Box::new(sig)))
    }

    /// Multi-typed descriptor; a single component collapses to itself.
    pub fn tuple(mut components: Vec<TypeDescriptor>) -> Self {
        if components.len() == 1 {
            return components.remove(0);
        }
        let kinds: Vec<_> = components.iter().map(|c| c.kind.as_str()).collect();
        let kind = format!("({})", kinds.join(","));
        Self::with_shape(TypeCode::Tuple, kind, Shape::Tuple(components))
    }

    /// Attach the owning scope to a named reference.
    pub fn in_package(mut self, package: PackageId) -> Self {
        if let Shape::Named(named) = &mut self.shape {
            named.package = Some(package);
        }
        self
    }

    /// Re-label a resolved alias target.
    pub fn aliased(mut self, alias: &str) -> Self {
        self.kind = alias.to_string();
        self.alias = Some(alias.to_string());
        self
    }

    pub fn is_void(&self) -> bool {
        self.code == TypeCode::Void && self.shape == Shape::Plain
    }

    pub fn is_nil(&self) -> bool {
        self.code == TypeCode::Nil
    }

    /// Neither generic nor an alias, and not a composite wrapper.
    pub fn is_pure(&self) -> bool {
        self.alias.is_none() && matches!(self.shape, Shape::Plain | Shape::Named(_))
    }

    pub fn is_multi_typed(&self) -> bool {
        matches!(self.shape, Shape::Tuple(_))
    }

    pub fn tuple_components(&self) -> Option<&[TypeDescriptor]> {
        match &self.shape {
            Shape::Tuple(components) => Some(components),
            _ => None,
        }
    }

    pub fn fn_signature(&self) -> Option<&FnSignature> {
        match &self.shape {
            Shape::Func(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn named_type(&self) -> Option<&NamedType> {
        match &self.shape {
            Shape::Named(named) => Some(named),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.shape, Shape::Pointer(_))
    }

    /// Whether `nil` may be stored in this type.
    pub fn is_nil_compatible(&self) -> bool {
        matches!(
            self.shape,
            Shape::Pointer(_) | Shape::Array(_) | Shape::Map(..) | Shape::Func(_)
        ) || matches!(self.code, TypeCode::Trait | TypeCode::Any)
    }

    /// Whether the type mentions a generic parameter anywhere.
    pub fn has_params(&self) -> bool {
        match &self.shape {
            Shape::Plain => false,
            Shape::Param(_) => true,
            Shape::Named(named) => named.generics.iter().any(Self::has_params),
            Shape::Array(elem) | Shape::Pointer(elem) => elem.has_params(),
            Shape::Map(key, value) => key.has_params() || value.has_params(),
            Shape::Func(sig) => sig.params.iter().any(Self::has_params) || sig.ret.has_params(),
            Shape::Tuple(components) => components.iter().any(Self::has_params),
        }
    }

    /// Zero-value expression of the type in generated code.
    pub fn default_literal(&self, lattice: &Lattice) -> String {
        match self.shape {
            Shape::Plain if self.code != TypeCode::Any => self.code.default_value().to_string(),
            _ => format!("{}{{}}", self.cpp(lattice)),
        }
    }

    /// C++ spelling of the type.
    pub fn cpp(&self, lattice: &Lattice) -> String {
        match &self.shape {
            Shape::Plain => lattice.cpp_name(self.code).to_string(),
            Shape::Named(named) => {
                let mut out = match &named.package {
                    Some(package) => mangle::out_id(&named.name, package),
                    None => named.name.clone(),
                };
                if !named.generics.is_empty() {
                    let args: Vec<_> = named.generics.iter().map(|g| g.cpp(lattice)).collect();
                    out.push('<');
                    out.push_str(&args.join(","));
                    out.push('>');
                }
                if self.code == TypeCode::Trait {
                    out = format!("trait_t<{out}>");
                }
                out
            }
            Shape::Param(index) => mangle::generic_param(*index),
            Shape::Array(elem) => format!("slice_t<{}>", elem.cpp(lattice)),
            Shape::Pointer(elem) => format!("ptr_t<{}>", elem.cpp(lattice)),
            Shape::Map(key, value) => {
                format!("map_t<{},{}>", key.cpp(lattice), value.cpp(lattice))
            }
            Shape::Func(sig) => {
                let params: Vec<_> = sig.params.iter().map(|p| p.cpp(lattice)).collect();
                format!("std::function<{}({})>", sig.ret.cpp(lattice), params.join(","))
            }
            Shape::Tuple(components) => {
                let parts: Vec<_> = components.iter().map(|c| c.cpp(lattice)).collect();
                format!("std::tuple<{}>", parts.join(","))
            }
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Arch;

    #[test]
    fn kind_strings() {
        let i32_t = TypeDescriptor::builtin(TypeCode::I32);
        assert_eq!(TypeDescriptor::array(i32_t.clone()).kind, "[]i32");
        assert_eq!(TypeDescriptor::pointer(i32_t.clone()).kind, "*i32");
        assert_eq!(
            TypeDescriptor::map(TypeDescriptor::builtin(TypeCode::Str), i32_t.clone()).kind,
            "[str:i32]"
        );
        let pair = TypeDescriptor::tuple(vec![i32_t.clone(), TypeDescriptor::builtin(TypeCode::Bool)]);
        assert_eq!(pair.kind, "(i32,bool)");
        assert!(pair.is_multi_typed());
        assert_eq!(TypeDescriptor::tuple(vec![i32_t.clone()]), i32_t);
    }

    #[test]
    fn purity() {
        let u8_t = TypeDescriptor::builtin(TypeCode::U8);
        assert!(u8_t.is_pure());
        assert!(!u8_t.clone().aliased("Byte").is_pure());
        assert!(!TypeDescriptor::param("T", 0).is_pure());
        assert!(!TypeDescriptor::array(u8_t).is_pure());
        assert!(TypeDescriptor::named(TypeCode::Struct, "Point").is_pure());
    }

    #[test]
    fn identity_ignores_alias_spelling() {
        let u8_t = TypeDescriptor::builtin(TypeCode::U8);
        assert_eq!(u8_t.clone().aliased("Byte"), u8_t);
    }

    #[test]
    fn cpp_spelling() {
        let lattice = Lattice::new(Arch::Amd64);
        let int_t = TypeDescriptor::builtin(TypeCode::Int);
        assert_eq!(int_t.cpp(&lattice), "i64_t");
        assert_eq!(TypeDescriptor::array(int_t.clone()).cpp(&lattice), "slice_t<i64_t>");
        let sig = FnSignature {
            has_receiver: false,
            generics: 0,
            params: vec![int_t.clone()],
            variadic: false,
            ret: TypeDescriptor::builtin(TypeCode::Bool),
        };
        assert_eq!(TypeDescriptor::func(sig).cpp(&lattice), "std::function<bool(i64_t)>");
        assert_eq!(TypeDescriptor::param("T", 1).cpp(&lattice), "T1");
    }

    #[test]
    fn default_literals() {
        let lattice = Lattice::new(Arch::Amd64);
        assert_eq!(TypeDescriptor::builtin(TypeCode::F64).default_literal(&lattice), "0");
        assert_eq!(TypeDescriptor::builtin(TypeCode::Bool).default_literal(&lattice), "false");
        let slice = TypeDescriptor::array(TypeDescriptor::builtin(TypeCode::Str));
        assert_eq!(slice.default_literal(&lattice), "slice_t<str_t>{}");
    }
}
