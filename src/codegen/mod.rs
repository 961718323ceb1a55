//! C++ code generation: node trees, layouts and translation-unit assembly.

mod function;
mod indent;
pub mod mangle;
mod node;
mod structs;
mod traits;
mod unit;

pub use function::{template_args, template_header, FnLayout, Owner, ParamLayout};
pub use indent::{Indent, INDENT_WIDTH};
pub use node::{AnonFn, CodeNode, ReturnAssembly, ReturnSlot};
pub use structs::{FieldLayout, StructLayout};
pub use traits::TraitLayout;
pub use unit::{EnumLayout, GlobalLayout, TranslationUnit};
