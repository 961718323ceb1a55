//! Declaration shapes produced by the external parser.
//!
//! Expressions stay unevaluated: each carries its token slice and an
//! attachment slot the semantic pass fills with the lowered [`CodeNode`].

mod token;

pub use token::{split_top_level_commas, Token, TokenKind};

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use crate::codegen::CodeNode;
use crate::types::{FnSignature, TypeDescriptor};

/// The ignore identifier.
pub const IGNORE: &str = "_";

pub fn is_ignore(name: &str) -> bool {
    name == IGNORE
}

/// Identity of a package (its directory).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId(Arc<str>);

impl PackageId {
    pub fn new(path: &str) -> Self {
        Self(Arc::from(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a token or declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: Arc<str>,
    pub package: PackageId,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(file: &str, package: PackageId, line: usize, column: usize) -> Self {
        Self {
            file: Arc::from(file),
            package,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// An unevaluated expression.
#[derive(Debug, Clone, Default)]
pub struct Expr {
    pub tokens: Vec<Token>,
    /// Anonymous functions referenced by [`TokenKind::Closure`] tokens.
    pub closures: Vec<FnDecl>,
    /// Lowered form from the most recent check.
    model: RefCell<Option<CodeNode>>,
}

impl Expr {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            closures: Vec::new(),
            model: RefCell::new(None),
        }
    }

    pub fn with_closures(mut self, closures: Vec<FnDecl>) -> Self {
        self.closures = closures;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Store the lowered form; a later check replaces an earlier one.
    pub fn attach_model(&self, node: CodeNode) {
        self.model.replace(Some(node));
    }

    pub fn model(&self) -> Option<CodeNode> {
        self.model.borrow().clone()
    }
}

/// Declaration attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    /// Linked from the C++ side; called without generic instantiation syntax.
    Extern,
    Inline,
}

#[derive(Debug, Clone)]
pub struct Generic {
    pub name: String,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeDescriptor,
    pub pos: Position,
    pub variadic: bool,
    pub mutable: bool,
}

/// Declared result of a function, with optional named results.
#[derive(Debug, Clone)]
pub struct RetType {
    pub ty: TypeDescriptor,
    /// Empty, or one name per result component.
    pub names: Vec<String>,
}

impl RetType {
    pub fn void() -> Self {
        Self {
            ty: TypeDescriptor::void(),
            names: Vec::new(),
        }
    }

    pub fn new(ty: TypeDescriptor) -> Self {
        Self {
            ty,
            names: Vec::new(),
        }
    }

    pub fn named(ty: TypeDescriptor, names: Vec<String>) -> Self {
        Self { ty, names }
    }

    /// Whether every result component carries a name.
    pub fn all_named(&self) -> bool {
        let expected = self.ty.tuple_components().map_or(1, <[_]>::len);
        !self.names.is_empty() && self.names.len() == expected
    }
}

#[derive(Debug, Clone)]
pub struct Receiver {
    pub ty: TypeDescriptor,
    pub mutable: bool,
}

#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub public: bool,
    pub pos: Position,
    pub generics: Vec<Generic>,
    pub params: Vec<Param>,
    pub ret: RetType,
    pub receiver: Option<Receiver>,
    pub attributes: Vec<Attribute>,
    /// `None` for prototypes (trait methods, extern functions).
    pub body: Option<Vec<Stmt>>,
}

impl FnDecl {
    pub fn new(name: &str, pos: Position) -> Self {
        Self {
            name: name.to_string(),
            public: false,
            pos,
            generics: Vec::new(),
            params: Vec::new(),
            ret: RetType::void(),
            receiver: None,
            attributes: Vec::new(),
            body: None,
        }
    }

    pub fn has_attribute(&self, attr: Attribute) -> bool {
        self.attributes.contains(&attr)
    }

    pub fn is_extern(&self) -> bool {
        self.has_attribute(Attribute::Extern)
    }

    /// Type of the function when used as a value.
    pub fn signature(&self) -> FnSignature {
        FnSignature {
            has_receiver: self.receiver.is_some(),
            generics: self.generics.len(),
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
            variadic: self.params.last().is_some_and(|p| p.variadic),
            ret: self.ret.ty.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Var(VarDecl),
    Assign(AssignStmt),
    Return(ReturnStmt),
}

/// `target op value`, where `op` is `=` or a compound operator such as `+=`.
#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub pos: Position,
    pub target: Expr,
    pub op: String,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub pos: Position,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub public: bool,
    pub pos: Position,
    /// `None` for auto-type declarations.
    pub ty: Option<TypeDescriptor>,
    pub init: Option<Expr>,
    pub constant: bool,
    pub mutable: bool,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub public: bool,
    pub ty: TypeDescriptor,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub public: bool,
    pub pos: Position,
    pub generics: Vec<Generic>,
    pub fields: Vec<Field>,
    pub attributes: Vec<Attribute>,
}

/// Methods bound to a struct, optionally implementing a trait.
#[derive(Debug, Clone)]
pub struct ImplDecl {
    pub target: String,
    pub trait_name: Option<String>,
    pub pos: Position,
    pub methods: Vec<FnDecl>,
}

#[derive(Debug, Clone)]
pub struct TraitDecl {
    pub name: String,
    pub public: bool,
    pub pos: Position,
    pub methods: Vec<FnDecl>,
}

#[derive(Debug, Clone)]
pub struct EnumItem {
    pub name: String,
    pub pos: Position,
    pub expr: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub public: bool,
    pub pos: Position,
    /// Underlying integer type.
    pub ty: TypeDescriptor,
    pub items: Vec<EnumItem>,
}

#[derive(Debug, Clone)]
pub struct TypeAliasDecl {
    pub name: String,
    pub public: bool,
    pub pos: Position,
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: String,
    pub pos: Position,
    pub decls: Vec<Decl>,
}

/// Top-level declarations
#[derive(Debug, Clone)]
pub enum Decl {
    Fn(FnDecl),
    Var(VarDecl),
    Struct(StructDecl),
    Impl(ImplDecl),
    Trait(TraitDecl),
    Enum(EnumDecl),
    TypeAlias(TypeAliasDecl),
    Namespace(NamespaceDecl),
}

#[derive(Debug, Clone)]
pub struct UseDecl {
    pub package: PackageId,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct File {
    pub path: String,
    pub uses: Vec<UseDecl>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub files: Vec<File>,
}

impl Package {
    pub fn new(id: PackageId) -> Self {
        Self {
            id,
            files: Vec::new(),
        }
    }

    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.files.iter().flat_map(|f| f.decls.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_models_replace_earlier_ones() {
        let expr = Expr::default();
        assert_eq!(expr.model(), None);
        expr.attach_model(CodeNode::lit("1"));
        expr.attach_model(CodeNode::lit("2"));
        assert_eq!(expr.model(), Some(CodeNode::lit("2")));
    }
}
