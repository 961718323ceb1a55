//! Symbol table for block-local declarations.

use std::collections::HashMap;

use super::value::Constant;
use crate::ast::Position;
use crate::codegen::mangle;
use crate::types::TypeDescriptor;

/// Symbol table with nested scopes
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

/// A single scope level
#[derive(Debug, Clone)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
    /// Name of the scope (for functions)
    pub name: Option<String>,
}

impl Scope {
    pub fn new(name: Option<String>) -> Self {
        Self {
            symbols: HashMap::new(),
            name,
        }
    }
}

/// A local symbol
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: TypeDescriptor,
    pub is_mutable: bool,
    /// Value of a local constant.
    pub constant: Option<Constant>,
    pub is_used: bool,
    pub pos: Position,
}

impl Symbol {
    pub fn new(name: &str, kind: SymbolKind, ty: TypeDescriptor, pos: Position) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ty,
            is_mutable: false,
            constant: None,
            is_used: false,
            pos,
        }
    }

    /// Identifier in generated code.
    pub fn out_id(&self) -> String {
        match self.kind {
            SymbolKind::Receiver => mangle::SELF.to_string(),
            _ => mangle::local_id(&self.name),
        }
    }
}

/// Kind of symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    /// Named function result.
    NamedReturn,
    Receiver,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None)],
        }
    }

    /// Enter a new scope
    pub fn push_scope(&mut self, name: Option<String>) {
        self.scopes.push(Scope::new(name));
    }

    /// Exit current scope, returning its unused variables
    pub fn pop_scope(&mut self) -> Option<Vec<Symbol>> {
        if self.scopes.len() <= 1 {
            return None;
        }
        let scope = self.scopes.pop()?;
        let unused = scope
            .symbols
            .into_values()
            .filter(|s| !s.is_used && s.kind == SymbolKind::Variable)
            .collect();
        Some(unused)
    }

    /// Define a symbol in the current scope
    pub fn define(&mut self, symbol: Symbol) -> Result<(), Symbol> {
        let Some(scope) = self.scopes.last_mut() else {
            return Err(symbol);
        };
        if scope.symbols.contains_key(&symbol.name) {
            return Err(symbol);
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Look up a symbol by name (innermost scope first)
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|s| s.symbols.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|s| s.symbols.get_mut(name))
    }

    pub fn mark_used(&mut self, name: &str) {
        if let Some(symbol) = self.lookup_mut(name) {
            symbol.is_used = true;
        }
    }

    /// Check if a symbol is defined in the current scope only
    pub fn is_defined_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|s| s.symbols.contains_key(name))
    }

    /// Get current scope depth (0 = global)
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Get current function name (if in a function)
    pub fn current_function(&self) -> Option<&str> {
        self.scopes.iter().rev().find_map(|s| s.name.as_deref())
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PackageId;
    use crate::types::TypeCode;

    fn sym(name: &str, kind: SymbolKind) -> Symbol {
        Symbol::new(
            name,
            kind,
            TypeDescriptor::builtin(TypeCode::I32),
            Position::new("t.x", PackageId::new("t"), 1, 1),
        )
    }

    #[test]
    fn inner_scopes_shadow_outer_ones() {
        let mut table = SymbolTable::new();
        table.push_scope(Some("f".into()));
        table.define(sym("x", SymbolKind::Parameter)).unwrap();
        table.push_scope(None);
        let mut inner = sym("x", SymbolKind::Variable);
        inner.ty = TypeDescriptor::builtin(TypeCode::Str);
        table.define(inner).unwrap();
        assert_eq!(table.lookup("x").unwrap().ty.code, TypeCode::Str);
        assert_eq!(table.current_function(), Some("f"));
        assert_eq!(table.depth(), 2);
        let unused = table.pop_scope().unwrap();
        assert_eq!(unused.len(), 1);
        assert_eq!(table.lookup("x").unwrap().kind, SymbolKind::Parameter);
    }

    #[test]
    fn redefinition_in_one_scope_fails() {
        let mut table = SymbolTable::new();
        table.define(sym("x", SymbolKind::Variable)).unwrap();
        assert!(table.define(sym("x", SymbolKind::Variable)).is_err());
        assert!(table.is_defined_in_current_scope("x"));
        assert!(table.pop_scope().is_none());
    }

    #[test]
    fn receiver_renders_as_this() {
        assert_eq!(sym("self", SymbolKind::Receiver).out_id(), "(*this)");
        assert_eq!(sym("count", SymbolKind::Variable).out_id(), "count_");
    }
}
