//! Semantic analysis: definition lookup, type checking and lowering.

mod assign;
mod checker;
mod cursor;
mod defmap;
mod eval;
mod resolve;
mod ret;
mod symbol_table;
mod value;

pub use assign::{const_fits, AssignChecker, ConstCheck};
pub use checker::{Checker, FnReturn};
pub use cursor::Cursor;
pub use defmap::{
    AnyDefinition, Def, DefinitionMap, EnumDef, FnDef, GlobalDef, GlobalState, Lookup,
    NamespaceDef, StructDef, TraitDef, TypeAliasDef,
};
pub use resolve::{FieldInfo, MethodInfo, StructInfo, TraitInfo};
pub use symbol_table::{Scope, Symbol, SymbolKind, SymbolTable};
pub use value::{ConstValue, Constant, Value};
