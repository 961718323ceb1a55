//! Type lattice, numeric rules and type descriptors.

pub mod bits;
mod code;
mod descriptor;
mod generics;

pub use bits::NumericLiteral;
pub use code::{float_from_bits, int_from_bits, uint_from_bits, Lattice, TypeCode};
pub use descriptor::{FnSignature, NamedType, Shape, TypeDescriptor};
pub use generics::Instantiation;
