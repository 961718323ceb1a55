//! Evaluated expression results.

use crate::codegen::CodeNode;
use crate::types::{NumericLiteral, TypeDescriptor};

/// Compile-time value of a constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    /// Bytes of a string literal, escapes resolved.
    Str(Vec<u8>),
}

impl ConstValue {
    pub fn from_numeric(lit: NumericLiteral) -> Self {
        match lit {
            NumericLiteral::Signed(v) => ConstValue::Int(v),
            NumericLiteral::Unsigned(v) => ConstValue::Uint(v),
            NumericLiteral::Float(v) => ConstValue::Float(v),
        }
    }

    pub fn as_numeric(&self) -> Option<NumericLiteral> {
        match *self {
            ConstValue::Int(v) => Some(NumericLiteral::Signed(v)),
            ConstValue::Uint(v) => Some(NumericLiteral::Unsigned(v)),
            ConstValue::Float(v) => Some(NumericLiteral::Float(v)),
            _ => None,
        }
    }

    /// Exact source-level literal.
    pub fn literal(&self) -> String {
        match self {
            ConstValue::Bool(b) => b.to_string(),
            ConstValue::Str(s) => format!("{:?}", String::from_utf8_lossy(s)),
            other => other
                .as_numeric()
                .map(NumericLiteral::to_literal)
                .unwrap_or_default(),
        }
    }

    /// C++ spelling.
    pub fn cpp(&self) -> String {
        match self {
            ConstValue::Int(i64::MIN) => format!("({}LL-1)", i64::MIN + 1),
            ConstValue::Uint(v) => format!("{v}ULL"),
            ConstValue::Str(s) if s.is_empty() => "str_t{}".to_string(),
            ConstValue::Str(s) => {
                let bytes: Vec<_> = s.iter().map(|b| format!("0x{b:x}")).collect();
                format!("str_t{{{{{}}}}}", bytes.join(","))
            }
            other => other.literal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: ConstValue,
    /// Exact literal text, used by the constant-range check.
    pub literal: String,
}

impl Constant {
    pub fn new(value: ConstValue) -> Self {
        let literal = value.literal();
        Self { value, literal }
    }

    pub fn numeric(lit: NumericLiteral) -> Self {
        Self::new(ConstValue::from_numeric(lit))
    }
}

/// Result of evaluating an expression.
#[derive(Debug, Clone)]
pub struct Value {
    pub ty: TypeDescriptor,
    pub constant: Option<Constant>,
    /// Denotes storage that can be assigned to.
    pub lvalue: bool,
    pub mutable: bool,
    /// Names a function linked from the C++ side.
    pub extern_link: bool,
    pub node: CodeNode,
}

impl Value {
    pub fn new(ty: TypeDescriptor, node: CodeNode) -> Self {
        Self {
            ty,
            constant: None,
            lvalue: false,
            mutable: false,
            extern_link: false,
            node,
        }
    }

    pub fn constant(ty: TypeDescriptor, constant: Constant) -> Self {
        let node = CodeNode::lit(constant.value.cpp());
        Self {
            ty,
            constant: Some(constant),
            lvalue: false,
            mutable: false,
            extern_link: false,
            node,
        }
    }

    pub fn storage(ty: TypeDescriptor, node: CodeNode, mutable: bool) -> Self {
        Self {
            ty,
            constant: None,
            lvalue: true,
            mutable,
            extern_link: false,
            node,
        }
    }

    pub fn is_const(&self) -> bool {
        self.constant.is_some()
    }

    pub fn literal(&self) -> Option<&str> {
        self.constant.as_ref().map(|c| c.literal.as_str())
    }

    pub fn numeric(&self) -> Option<NumericLiteral> {
        self.constant.as_ref().and_then(|c| c.value.as_numeric())
    }

    pub fn const_bool(&self) -> Option<bool> {
        match self.constant.as_ref().map(|c| &c.value) {
            Some(ConstValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeCode;

    #[test]
    fn constants_carry_their_literal() {
        let v = Value::constant(
            TypeDescriptor::builtin(TypeCode::Int),
            Constant::numeric(NumericLiteral::Signed(-5)),
        );
        assert_eq!(v.literal(), Some("-5"));
        assert_eq!(v.node.to_string(), "-5");
        assert_eq!(v.numeric(), Some(NumericLiteral::Signed(-5)));
    }

    #[test]
    fn cpp_spelling_of_edge_values() {
        assert_eq!(ConstValue::Uint(u64::MAX).cpp(), "18446744073709551615ULL");
        assert_eq!(ConstValue::Int(i64::MIN).cpp(), "(-9223372036854775807LL-1)");
        assert_eq!(ConstValue::Bool(true).cpp(), "true");
        assert_eq!(ConstValue::Bool(true).literal(), "true");
    }

    #[test]
    fn strings_lower_to_bytes() {
        assert_eq!(ConstValue::Str(b"hi".to_vec()).cpp(), "str_t{{0x68,0x69}}");
        assert_eq!(ConstValue::Str("é".as_bytes().to_vec()).cpp(), "str_t{{0xc3,0xa9}}");
        assert_eq!(ConstValue::Str(Vec::new()).cpp(), "str_t{}");
        assert_eq!(ConstValue::Str(b"a\"b".to_vec()).literal(), "\"a\\\"b\"");
    }
}
