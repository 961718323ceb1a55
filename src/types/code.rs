//! Built-in type codes and the numeric lattice.

use std::fmt;

use crate::config::Arch;

/// Closed set of type codes.
///
/// The first group are the built-in scalar codes; the second group
/// classifies composite descriptors and never appears as a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Void,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Int,
    Uint,
    Uintptr,
    F32,
    F64,
    Bool,
    Str,
    Char,
    Enum,
    Any,
    Nil,
    Unsafe,

    Struct,
    Trait,
    Func,
    Map,
    Array,
    Pointer,
    Tuple,
    Generic,
}

impl TypeCode {
    /// Every built-in scalar code.
    pub const BUILTINS: [TypeCode; 21] = [
        TypeCode::Void,
        TypeCode::I8,
        TypeCode::I16,
        TypeCode::I32,
        TypeCode::I64,
        TypeCode::U8,
        TypeCode::U16,
        TypeCode::U32,
        TypeCode::U64,
        TypeCode::Int,
        TypeCode::Uint,
        TypeCode::Uintptr,
        TypeCode::F32,
        TypeCode::F64,
        TypeCode::Bool,
        TypeCode::Str,
        TypeCode::Char,
        TypeCode::Enum,
        TypeCode::Any,
        TypeCode::Nil,
        TypeCode::Unsafe,
    ];

    /// Look up a built-in type by its source spelling.
    pub fn from_name(name: &str) -> Option<TypeCode> {
        let code = match name {
            "i8" => TypeCode::I8,
            "i16" => TypeCode::I16,
            "i32" => TypeCode::I32,
            "i64" => TypeCode::I64,
            "u8" | "byte" => TypeCode::U8,
            "u16" => TypeCode::U16,
            "u32" => TypeCode::U32,
            "u64" => TypeCode::U64,
            "int" => TypeCode::Int,
            "uint" => TypeCode::Uint,
            "uintptr" => TypeCode::Uintptr,
            "f32" => TypeCode::F32,
            "f64" => TypeCode::F64,
            "bool" => TypeCode::Bool,
            "str" => TypeCode::Str,
            "char" | "rune" => TypeCode::Char,
            "any" => TypeCode::Any,
            "unsafe" => TypeCode::Unsafe,
            _ => return None,
        };
        Some(code)
    }

    /// Source spelling.
    pub fn name(self) -> &'static str {
        match self {
            TypeCode::Void => "void",
            TypeCode::I8 => "i8",
            TypeCode::I16 => "i16",
            TypeCode::I32 => "i32",
            TypeCode::I64 => "i64",
            TypeCode::U8 => "u8",
            TypeCode::U16 => "u16",
            TypeCode::U32 => "u32",
            TypeCode::U64 => "u64",
            TypeCode::Int => "int",
            TypeCode::Uint => "uint",
            TypeCode::Uintptr => "uintptr",
            TypeCode::F32 => "f32",
            TypeCode::F64 => "f64",
            TypeCode::Bool => "bool",
            TypeCode::Str => "str",
            TypeCode::Char => "char",
            TypeCode::Enum => "enum",
            TypeCode::Any => "any",
            TypeCode::Nil => "nil",
            TypeCode::Unsafe => "unsafe",
            TypeCode::Struct => "struct",
            TypeCode::Trait => "trait",
            TypeCode::Func => "fn",
            TypeCode::Map => "map",
            TypeCode::Array => "array",
            TypeCode::Pointer => "pointer",
            TypeCode::Tuple => "tuple",
            TypeCode::Generic => "generic",
        }
    }

    pub fn is_builtin(self) -> bool {
        Self::BUILTINS.contains(&self)
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            TypeCode::I8 | TypeCode::I16 | TypeCode::I32 | TypeCode::I64 | TypeCode::Int
        )
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            TypeCode::U8
                | TypeCode::U16
                | TypeCode::U32
                | TypeCode::U64
                | TypeCode::Uint
                | TypeCode::Uintptr
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(self) -> bool {
        matches!(self, TypeCode::F32 | TypeCode::F64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_signed_numeric(self) -> bool {
        self.is_signed_integer() || self.is_float()
    }

    /// Zero value literal of the code.
    pub fn default_value(self) -> &'static str {
        if self.is_numeric() || self == TypeCode::Enum || self == TypeCode::Char {
            return "0";
        }
        match self {
            TypeCode::Bool => "false",
            TypeCode::Str => "\"\"",
            _ => "nil",
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric rules parameterised by the target architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lattice {
    pub arch: Arch,
}

impl Lattice {
    pub fn new(arch: Arch) -> Self {
        Self { arch }
    }

    /// Map `int`/`uint`/`uintptr` to the fixed-width code of the target.
    pub fn resolve_platform_code(&self, code: TypeCode) -> TypeCode {
        let wide = self.arch.bit_size() == 64;
        match code {
            TypeCode::Int if wide => TypeCode::I64,
            TypeCode::Int => TypeCode::I32,
            TypeCode::Uint | TypeCode::Uintptr if wide => TypeCode::U64,
            TypeCode::Uint | TypeCode::Uintptr => TypeCode::U32,
            other => other,
        }
    }

    /// Bit width of a numeric code.
    pub fn bit_size(&self, code: TypeCode) -> Option<u32> {
        let bits = match self.resolve_platform_code(code) {
            TypeCode::I8 | TypeCode::U8 => 8,
            TypeCode::I16 | TypeCode::U16 => 16,
            TypeCode::I32 | TypeCode::U32 | TypeCode::F32 => 32,
            TypeCode::I64 | TypeCode::U64 | TypeCode::F64 => 64,
            _ => return None,
        };
        Some(bits)
    }

    /// Strict partial order choosing the operand type of a binary expression.
    pub fn is_wider(&self, a: TypeCode, b: TypeCode) -> bool {
        let (a, b) = (self.resolve_platform_code(a), self.resolve_platform_code(b));
        let (Some(wa), Some(wb)) = (self.bit_size(a), self.bit_size(b)) else {
            return false;
        };
        match a {
            TypeCode::F64 => b.is_integer() || b == TypeCode::F32,
            TypeCode::F32 => b.is_integer(),
            _ if a.is_signed_integer() => b.is_signed_integer() && wa > wb,
            _ if a.is_unsigned_integer() => b.is_unsigned_integer() && wa > wb,
            _ => false,
        }
    }

    /// May a value of `src` be used where `dst` is expected.
    pub fn is_compatible(&self, dst: TypeCode, src: TypeCode, ignore_any: bool) -> bool {
        if dst == TypeCode::Any {
            return !ignore_any;
        }
        let (d, s) = (self.resolve_platform_code(dst), self.resolve_platform_code(src));
        if d == s {
            return true;
        }
        let (Some(wd), Some(ws)) = (self.bit_size(d), self.bit_size(s)) else {
            return false;
        };
        if d.is_signed_integer() {
            s.is_integer() && ws < wd
        } else if d.is_unsigned_integer() {
            s.is_unsigned_integer() && ws <= wd
        } else if d.is_float() {
            s.is_integer() || (s.is_float() && ws < wd)
        } else {
            false
        }
    }

    /// Inclusive `[min, max]` of a signed integer code.
    pub fn signed_range(&self, code: TypeCode) -> Option<(i64, i64)> {
        let range = match self.resolve_platform_code(code) {
            TypeCode::I8 => (i8::MIN as i64, i8::MAX as i64),
            TypeCode::I16 => (i16::MIN as i64, i16::MAX as i64),
            TypeCode::I32 => (i32::MIN as i64, i32::MAX as i64),
            TypeCode::I64 => (i64::MIN, i64::MAX),
            _ => return None,
        };
        Some(range)
    }

    /// Maximum of an unsigned integer code.
    pub fn unsigned_max(&self, code: TypeCode) -> Option<u64> {
        let max = match self.resolve_platform_code(code) {
            TypeCode::U8 => u8::MAX as u64,
            TypeCode::U16 => u16::MAX as u64,
            TypeCode::U32 => u32::MAX as u64,
            TypeCode::U64 => u64::MAX,
            _ => return None,
        };
        Some(max)
    }

    /// C++ spelling of a scalar code; empty for composite codes.
    pub fn cpp_name(&self, code: TypeCode) -> &'static str {
        match self.resolve_platform_code(code) {
            TypeCode::Void | TypeCode::Unsafe => "void",
            TypeCode::I8 => "i8_t",
            TypeCode::I16 => "i16_t",
            TypeCode::I32 => "i32_t",
            TypeCode::I64 => "i64_t",
            TypeCode::U8 => "u8_t",
            TypeCode::U16 => "u16_t",
            TypeCode::U32 => "u32_t",
            TypeCode::U64 => "u64_t",
            TypeCode::F32 => "f32_t",
            TypeCode::F64 => "f64_t",
            TypeCode::Bool => "bool",
            TypeCode::Str => "str_t",
            TypeCode::Char => "char_t",
            TypeCode::Any => "any_t",
            TypeCode::Nil => "std::nullptr_t",
            _ => "",
        }
    }
}

pub fn int_from_bits(bits: u32) -> TypeCode {
    match bits {
        8 => TypeCode::I8,
        16 => TypeCode::I16,
        32 => TypeCode::I32,
        _ => TypeCode::I64,
    }
}

pub fn uint_from_bits(bits: u32) -> TypeCode {
    match bits {
        8 => TypeCode::U8,
        16 => TypeCode::U16,
        32 => TypeCode::U32,
        _ => TypeCode::U64,
    }
}

pub fn float_from_bits(bits: u32) -> TypeCode {
    match bits {
        32 => TypeCode::F32,
        _ => TypeCode::F64,
    }
}
