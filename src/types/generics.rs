//! Positional substitution of generic parameters.

use super::{FnSignature, Shape, TypeDescriptor};

/// Concrete arguments of one generic instantiation site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instantiation {
    pub args: Vec<TypeDescriptor>,
}

impl Instantiation {
    pub fn new(args: Vec<TypeDescriptor>) -> Self {
        Self { args }
    }

    /// Replace every parameter reference by the argument at its index.
    ///
    /// References past the argument list are kept unchanged.
    pub fn substitute(&self, ty: &TypeDescriptor) -> TypeDescriptor {
        if self.args.is_empty() || !ty.has_params() {
            return ty.clone();
        }
        match &ty.shape {
            Shape::Plain => ty.clone(),
            Shape::Param(index) => self.args.get(*index).cloned().unwrap_or_else(|| ty.clone()),
            Shape::Named(named) => {
                let generics = named.generics.iter().map(|g| self.substitute(g)).collect();
                let out = TypeDescriptor::named_generic(ty.code, &named.name, generics);
                match &named.package {
                    Some(package) => out.in_package(package.clone()),
                    None => out,
                }
            }
            Shape::Array(elem) => TypeDescriptor::array(self.substitute(elem)),
            Shape::Pointer(elem) => TypeDescriptor::pointer(self.substitute(elem)),
            Shape::Map(key, value) => {
                TypeDescriptor::map(self.substitute(key), self.substitute(value))
            }
            Shape::Func(sig) => TypeDescriptor::func(self.substitute_signature(sig)),
            Shape::Tuple(components) => {
                TypeDescriptor::tuple(components.iter().map(|c| self.substitute(c)).collect())
            }
        }
    }

    pub fn substitute_signature(&self, sig: &FnSignature) -> FnSignature {
        FnSignature {
            has_receiver: sig.has_receiver,
            generics: 0,
            params: sig.params.iter().map(|p| self.substitute(p)).collect(),
            variadic: sig.variadic,
            ret: self.substitute(&sig.ret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeCode;

    #[test]
    fn substitutes_by_index_not_name() {
        // Both parameters are spelled `T`; only the index decides.
        let pair = TypeDescriptor::tuple(vec![
            TypeDescriptor::param("T", 1),
            TypeDescriptor::array(TypeDescriptor::param("T", 0)),
        ]);
        let inst = Instantiation::new(vec![
            TypeDescriptor::builtin(TypeCode::Str),
            TypeDescriptor::builtin(TypeCode::I32),
        ]);
        let out = inst.substitute(&pair);
        assert_eq!(out.kind, "(i32,[]str)");
        assert!(!out.has_params());
    }

    #[test]
    fn named_generics_are_rebuilt() {
        let boxed = TypeDescriptor::named_generic(
            TypeCode::Struct,
            "Box",
            vec![TypeDescriptor::param("T", 0)],
        );
        let inst = Instantiation::new(vec![TypeDescriptor::builtin(TypeCode::U8)]);
        let out = inst.substitute(&boxed);
        assert_eq!(out.kind, "Box[u8]");
        assert_eq!(
            out,
            TypeDescriptor::named_generic(
                TypeCode::Struct,
                "Box",
                vec![TypeDescriptor::builtin(TypeCode::U8)]
            )
        );
    }

    #[test]
    fn signatures_lose_their_generics() {
        let sig = FnSignature {
            has_receiver: false,
            generics: 1,
            params: vec![TypeDescriptor::param("T", 0)],
            variadic: false,
            ret: TypeDescriptor::param("T", 0),
        };
        let inst = Instantiation::new(vec![TypeDescriptor::builtin(TypeCode::F64)]);
        let out = inst.substitute_signature(&sig);
        assert_eq!(out.generics, 0);
        assert_eq!(out.ret, TypeDescriptor::builtin(TypeCode::F64));
    }
}
