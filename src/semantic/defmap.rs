//! Definition map: per-package declarations with visibility and shadowing.
//!
//! A map owns one ordered collection per definition kind. It may reference a
//! side map that is only consulted when a local lookup misses; hits found
//! there are flagged as shadowable, so a later local declaration of the same
//! name still takes precedence.

use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use tracing::trace;

use super::value::Constant;
use crate::ast::{
    is_ignore, Decl, EnumDecl, FnDecl, ImplDecl, NamespaceDecl, Package, PackageId, Position,
    StructDecl, TraitDecl, TypeAliasDecl, VarDecl,
};
use crate::codegen::mangle;
use crate::diagnostics::{Diagnostic, DiagnosticReporter, MessageKey};
use crate::types::TypeDescriptor;

/// Identity and visibility of an AST declaration.
pub trait Declared {
    fn id(&self) -> &str;
    fn is_public(&self) -> bool;
    fn pos(&self) -> &Position;
}

macro_rules! declared {
    ($($ty:ty),*) => {
        $(impl Declared for $ty {
            fn id(&self) -> &str {
                &self.name
            }

            fn is_public(&self) -> bool {
                self.public
            }

            fn pos(&self) -> &Position {
                &self.pos
            }
        })*
    };
}

declared!(FnDecl, VarDecl, StructDecl, TraitDecl, EnumDecl, TypeAliasDecl);

impl Declared for NamespaceDecl {
    fn id(&self) -> &str {
        &self.name
    }

    fn is_public(&self) -> bool {
        true
    }

    fn pos(&self) -> &Position {
        &self.pos
    }
}

/// A collected declaration.
#[derive(Debug)]
pub struct Def<'a, T> {
    pub decl: &'a T,
    /// Owning package; decides accessibility.
    pub package: PackageId,
    /// Mangling scope: the package, or the package plus namespace path.
    pub scope: PackageId,
    used: Cell<bool>,
}

impl<'a, T: Declared> Def<'a, T> {
    pub fn new(decl: &'a T, package: PackageId, scope: PackageId) -> Self {
        Self {
            decl,
            package,
            scope,
            used: Cell::new(false),
        }
    }

    pub fn id(&self) -> &'a str {
        self.decl.id()
    }

    pub fn pos(&self) -> &'a Position {
        self.decl.pos()
    }

    pub fn mark_used(&self) {
        self.used.set(true);
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    pub fn out_id(&self) -> String {
        mangle::out_id(self.id(), &self.scope)
    }
}

impl<'a> Def<'a, FnDecl> {
    /// Identifier used at call sites: extern functions keep their C++ name.
    pub fn call_id(&self) -> String {
        if self.decl.is_extern() {
            self.decl.name.clone()
        } else if self.decl.name == "main" && self.decl.receiver.is_none() {
            mangle::ENTRY_POINT.to_string()
        } else {
            self.out_id()
        }
    }
}

pub type FnDef<'a> = Def<'a, FnDecl>;
pub type EnumDef<'a> = Def<'a, EnumDecl>;
pub type TraitDef<'a> = Def<'a, TraitDecl>;
pub type TypeAliasDef<'a> = Def<'a, TypeAliasDecl>;

/// Resolved type of a global, set once when its declaration is checked.
#[derive(Debug, Clone)]
pub struct GlobalState {
    pub ty: TypeDescriptor,
    pub constant: Option<Constant>,
}

#[derive(Debug)]
pub struct GlobalDef<'a> {
    pub def: Def<'a, VarDecl>,
    state: OnceCell<GlobalState>,
}

impl<'a> GlobalDef<'a> {
    pub fn new(def: Def<'a, VarDecl>) -> Self {
        Self {
            def,
            state: OnceCell::new(),
        }
    }

    /// Record the checked type; later calls are ignored.
    pub fn resolve(&self, state: GlobalState) {
        let _ = self.state.set(state);
    }

    pub fn state(&self) -> Option<&GlobalState> {
        self.state.get()
    }

    /// Unchecked and failed (void) globals are invisible to lookups.
    fn is_visible(&self) -> bool {
        self.state().is_some_and(|s| !s.ty.is_void())
    }
}

#[derive(Debug)]
pub struct StructDef<'a> {
    pub def: Def<'a, StructDecl>,
    /// Impl blocks targeting this struct, in declaration order.
    pub impls: Vec<&'a ImplDecl>,
}

impl<'a> StructDef<'a> {
    pub fn methods(&self) -> impl Iterator<Item = &'a FnDecl> + '_ {
        self.impls.iter().flat_map(|&i| i.methods.iter())
    }

    pub fn find_method(&self, id: &str) -> Option<&'a FnDecl> {
        self.methods().find(|m| m.name == id)
    }

    /// Implemented traits with the position of their impl block.
    pub fn trait_names(&self) -> impl Iterator<Item = (&'a str, &'a Position)> + '_ {
        self.impls
            .iter()
            .filter_map(|&i| i.trait_name.as_deref().map(|t| (t, &i.pos)))
    }
}

#[derive(Debug)]
pub struct NamespaceDef<'a> {
    pub decl: &'a NamespaceDecl,
    pub defs: DefinitionMap<'a>,
}

/// Common view used by the generic lookup.
pub trait Resolvable {
    fn id(&self) -> &str;
    fn is_public(&self) -> bool;
    fn package(&self) -> &PackageId;
}

impl<T: Declared> Resolvable for Def<'_, T> {
    fn id(&self) -> &str {
        self.decl.id()
    }

    fn is_public(&self) -> bool {
        self.decl.is_public()
    }

    fn package(&self) -> &PackageId {
        &self.package
    }
}

impl Resolvable for StructDef<'_> {
    fn id(&self) -> &str {
        self.def.id()
    }

    fn is_public(&self) -> bool {
        self.def.decl.public
    }

    fn package(&self) -> &PackageId {
        &self.def.package
    }
}

impl Resolvable for GlobalDef<'_> {
    fn id(&self) -> &str {
        self.def.id()
    }

    fn is_public(&self) -> bool {
        self.def.decl.public
    }

    fn package(&self) -> &PackageId {
        &self.def.package
    }
}

/// Mangling scope of a definition.
pub trait HasScope {
    fn id(&self) -> &str;
    fn scope(&self) -> &PackageId;
}

impl<T: Declared> HasScope for Def<'_, T> {
    fn id(&self) -> &str {
        self.decl.id()
    }

    fn scope(&self) -> &PackageId {
        &self.scope
    }
}

impl HasScope for StructDef<'_> {
    fn id(&self) -> &str {
        self.def.id()
    }

    fn scope(&self) -> &PackageId {
        &self.def.scope
    }
}

/// Whether `def` may be used from `requester`.
pub fn is_accessible<T: Resolvable + ?Sized>(def: &T, requester: &PackageId) -> bool {
    def.is_public() || def.package() == requester
}

/// Outcome of a lookup.
#[derive(Debug)]
pub enum Lookup<'m, 'a, T> {
    Found {
        def: &'m T,
        /// Map the definition was found in.
        map: &'m DefinitionMap<'a>,
        /// Found through the side map; a local declaration would win.
        can_shadow: bool,
    },
    Missing,
}

impl<'m, 'a, T> Lookup<'m, 'a, T> {
    pub fn found(&self) -> Option<&'m T> {
        match self {
            Lookup::Found { def, .. } => Some(*def),
            Lookup::Missing => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found { .. })
    }

    pub fn can_shadow(&self) -> bool {
        matches!(self, Lookup::Found { can_shadow: true, .. })
    }
}

/// Result of [`DefinitionMap::find_any`].
#[derive(Debug, Clone, Copy)]
pub enum AnyDefinition<'m, 'a> {
    Global(&'m GlobalDef<'a>),
    Function(&'m FnDef<'a>),
    Enum(&'m EnumDef<'a>),
    Struct(&'m StructDef<'a>),
    TypeAlias(&'m TypeAliasDef<'a>),
    Trait(&'m TraitDef<'a>),
}

impl<'m, 'a> AnyDefinition<'m, 'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            AnyDefinition::Global(_) => "global",
            AnyDefinition::Function(_) => "function",
            AnyDefinition::Enum(_) => "enum",
            AnyDefinition::Struct(_) => "struct",
            AnyDefinition::TypeAlias(_) => "type alias",
            AnyDefinition::Trait(_) => "trait",
        }
    }

    pub fn pos(&self) -> &'a Position {
        match self {
            AnyDefinition::Global(d) => d.def.pos(),
            AnyDefinition::Function(d) => d.pos(),
            AnyDefinition::Enum(d) => d.pos(),
            AnyDefinition::Struct(d) => d.def.pos(),
            AnyDefinition::TypeAlias(d) => d.pos(),
            AnyDefinition::Trait(d) => d.pos(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DefinitionMap<'a> {
    pub namespaces: Vec<Rc<NamespaceDef<'a>>>,
    pub enums: Vec<Rc<EnumDef<'a>>>,
    pub structs: Vec<Rc<StructDef<'a>>>,
    pub traits: Vec<Rc<TraitDef<'a>>>,
    pub type_aliases: Vec<Rc<TypeAliasDef<'a>>>,
    pub functions: Vec<Rc<FnDef<'a>>>,
    pub globals: Vec<Rc<GlobalDef<'a>>>,
    side: Option<&'a DefinitionMap<'a>>,
}

impl<'a> DefinitionMap<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback consulted when a local lookup misses.
    pub fn set_side(&mut self, side: &'a DefinitionMap<'a>) {
        self.side = Some(side);
    }

    pub fn side(&self) -> Option<&'a DefinitionMap<'a>> {
        self.side
    }

    fn find<'m, T, S, F>(
        &'m self,
        select: S,
        id: &str,
        requester: &PackageId,
        accept: F,
    ) -> Lookup<'m, 'a, T>
    where
        T: Resolvable,
        S: for<'x> Fn(&'x DefinitionMap<'a>) -> &'x [Rc<T>] + Copy,
        F: Fn(&T) -> bool + Copy,
    {
        let local = select(self).iter().find(|d| {
            let def: &T = d;
            def.id() == id && accept(def) && is_accessible(def, requester)
        });
        if let Some(def) = local {
            return Lookup::Found {
                def: &**def,
                map: self,
                can_shadow: false,
            };
        }
        let Some(side) = self.side else {
            return Lookup::Missing;
        };
        match side.find(select, id, requester, accept) {
            Lookup::Found { def, map, .. } => {
                trace!(id, "resolved through side map");
                Lookup::Found {
                    def,
                    map,
                    can_shadow: true,
                }
            }
            Lookup::Missing => Lookup::Missing,
        }
    }

    pub fn find_struct(&self, id: &str, requester: &PackageId) -> Lookup<'_, 'a, StructDef<'a>> {
        self.find(|m| m.structs.as_slice(), id, requester, |_| true)
    }

    pub fn find_trait(&self, id: &str, requester: &PackageId) -> Lookup<'_, 'a, TraitDef<'a>> {
        self.find(|m| m.traits.as_slice(), id, requester, |_| true)
    }

    pub fn find_enum(&self, id: &str, requester: &PackageId) -> Lookup<'_, 'a, EnumDef<'a>> {
        self.find(|m| m.enums.as_slice(), id, requester, |_| true)
    }

    pub fn find_type_alias(
        &self,
        id: &str,
        requester: &PackageId,
    ) -> Lookup<'_, 'a, TypeAliasDef<'a>> {
        self.find(|m| m.type_aliases.as_slice(), id, requester, |_| true)
    }

    pub fn find_fn(&self, id: &str, requester: &PackageId) -> Lookup<'_, 'a, FnDef<'a>> {
        self.find(|m| m.functions.as_slice(), id, requester, |_| true)
    }

    /// Globals whose declaration has not been checked, or failed, are skipped.
    pub fn find_global(&self, id: &str, requester: &PackageId) -> Lookup<'_, 'a, GlobalDef<'a>> {
        self.find(|m| m.globals.as_slice(), id, requester, GlobalDef::is_visible)
    }

    fn in_scope<T, S>(&self, select: S, id: &str, scope: &PackageId) -> Option<&T>
    where
        S: for<'x> Fn(&'x DefinitionMap<'a>) -> &'x [Rc<T>] + Copy,
        T: HasScope,
    {
        select(self)
            .iter()
            .map(Rc::as_ref)
            .find(|d| d.id() == id && d.scope() == scope)
            .or_else(|| {
                self.namespaces
                    .iter()
                    .find_map(|ns| ns.defs.in_scope(select, id, scope))
            })
            .or_else(|| self.side.and_then(|side| side.in_scope(select, id, scope)))
    }

    /// Struct declared as `id` in mangling scope `scope`, regardless of access.
    pub fn struct_in_scope(&self, id: &str, scope: &PackageId) -> Option<&StructDef<'a>> {
        self.in_scope(|m| m.structs.as_slice(), id, scope)
    }

    pub fn trait_in_scope(&self, id: &str, scope: &PackageId) -> Option<&TraitDef<'a>> {
        self.in_scope(|m| m.traits.as_slice(), id, scope)
    }

    pub fn enum_in_scope(&self, id: &str, scope: &PackageId) -> Option<&EnumDef<'a>> {
        self.in_scope(|m| m.enums.as_slice(), id, scope)
    }

    /// Namespaces are looked up by identifier only.
    pub fn namespace(&self, id: &str) -> Option<&NamespaceDef<'a>> {
        match self.namespaces.iter().find(|ns| ns.decl.name == id) {
            Some(ns) => Some(ns.as_ref()),
            None => self.side.and_then(|side| side.namespace(id)),
        }
    }

    /// First match across all kinds: global, function, enum, struct, type alias, trait.
    pub fn find_any(&self, id: &str, requester: &PackageId) -> Option<AnyDefinition<'_, 'a>> {
        if let Some(def) = self.find_global(id, requester).found() {
            return Some(AnyDefinition::Global(def));
        }
        if let Some(def) = self.find_fn(id, requester).found() {
            return Some(AnyDefinition::Function(def));
        }
        if let Some(def) = self.find_enum(id, requester).found() {
            return Some(AnyDefinition::Enum(def));
        }
        if let Some(def) = self.find_struct(id, requester).found() {
            return Some(AnyDefinition::Struct(def));
        }
        if let Some(def) = self.find_type_alias(id, requester).found() {
            return Some(AnyDefinition::TypeAlias(def));
        }
        self.find_trait(id, requester)
            .found()
            .map(AnyDefinition::Trait)
    }

    /// Concatenate every collection of `other`, without deduplication.
    pub fn merge(&mut self, other: &DefinitionMap<'a>) {
        self.namespaces.extend(other.namespaces.iter().cloned());
        self.enums.extend(other.enums.iter().cloned());
        self.structs.extend(other.structs.iter().cloned());
        self.traits.extend(other.traits.iter().cloned());
        self.type_aliases.extend(other.type_aliases.iter().cloned());
        self.functions.extend(other.functions.iter().cloned());
        self.globals.extend(other.globals.iter().cloned());
    }

    /// Position of the declaration of `id` in this map, in any kind.
    fn declared_pos(&self, id: &str) -> Option<&'a Position> {
        self.namespaces
            .iter()
            .find(|d| d.decl.name == id)
            .map(|d| &d.decl.pos)
            .or_else(|| self.enums.iter().find(|d| d.id() == id).map(|d| d.pos()))
            .or_else(|| self.structs.iter().find(|d| d.def.id() == id).map(|d| d.def.pos()))
            .or_else(|| self.traits.iter().find(|d| d.id() == id).map(|d| d.pos()))
            .or_else(|| self.type_aliases.iter().find(|d| d.id() == id).map(|d| d.pos()))
            .or_else(|| self.functions.iter().find(|d| d.id() == id).map(|d| d.pos()))
            .or_else(|| self.globals.iter().find(|d| d.def.id() == id).map(|d| d.def.pos()))
    }

    /// Number of definitions across all kinds.
    pub fn len(&self) -> usize {
        self.namespaces.len()
            + self.enums.len()
            + self.structs.len()
            + self.traits.len()
            + self.type_aliases.len()
            + self.functions.len()
            + self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect the top-level declarations of `package`.
    pub fn collect(package: &'a Package, reporter: &mut DiagnosticReporter) -> Self {
        let mut map = Self::new();
        let decls: Vec<&'a Decl> = package.decls().collect();
        map.collect_decls(&decls, &package.id, &package.id, reporter);
        map
    }

    fn collect_decls(
        &mut self,
        decls: &[&'a Decl],
        package: &PackageId,
        scope: &PackageId,
        reporter: &mut DiagnosticReporter,
    ) {
        let impls: Vec<&'a ImplDecl> = decls
            .iter()
            .filter_map(|&d| match d {
                Decl::Impl(i) => Some(i),
                _ => None,
            })
            .collect();

        for &decl in decls {
            let (id, pos) = match decl {
                Decl::Impl(_) => continue,
                Decl::Fn(d) => (d.id(), d.pos()),
                Decl::Var(d) => (d.id(), d.pos()),
                Decl::Struct(d) => (d.id(), d.pos()),
                Decl::Trait(d) => (d.id(), d.pos()),
                Decl::Enum(d) => (d.id(), d.pos()),
                Decl::TypeAlias(d) => (d.id(), d.pos()),
                Decl::Namespace(d) => (d.id(), d.pos()),
            };
            if is_ignore(id) {
                reporter.report_at(MessageKey::IgnoreId, pos);
                continue;
            }
            if let Some(previous) = self.declared_pos(id) {
                let diagnostic = Diagnostic::error(MessageKey::ExistId, pos.clone())
                    .with_args([id])
                    .with_note(format!("previously declared at {previous}"));
                reporter.add(diagnostic);
                continue;
            }
            match decl {
                Decl::Fn(d) => {
                    self.functions
                        .push(Rc::new(Def::new(d, package.clone(), scope.clone())));
                }
                Decl::Var(d) => {
                    let def = Def::new(d, package.clone(), scope.clone());
                    self.globals.push(Rc::new(GlobalDef::new(def)));
                }
                Decl::Struct(d) => {
                    let impls = impls
                        .iter()
                        .copied()
                        .filter(|i| i.target == d.name)
                        .collect();
                    self.structs.push(Rc::new(StructDef {
                        def: Def::new(d, package.clone(), scope.clone()),
                        impls,
                    }));
                }
                Decl::Trait(d) => {
                    self.traits
                        .push(Rc::new(Def::new(d, package.clone(), scope.clone())));
                }
                Decl::Enum(d) => {
                    self.enums
                        .push(Rc::new(Def::new(d, package.clone(), scope.clone())));
                }
                Decl::TypeAlias(d) => {
                    self.type_aliases
                        .push(Rc::new(Def::new(d, package.clone(), scope.clone())));
                }
                Decl::Namespace(d) => {
                    let inner_scope = PackageId::new(&format!("{}::{}", scope, d.name));
                    let inner: Vec<&'a Decl> = d.decls.iter().collect();
                    let mut defs = DefinitionMap::new();
                    defs.collect_decls(&inner, package, &inner_scope, reporter);
                    self.namespaces.push(Rc::new(NamespaceDef { decl: d, defs }));
                }
                Decl::Impl(_) => {}
            }
        }

        for imp in impls {
            if !self.structs.iter().any(|s| s.def.id() == imp.target) {
                reporter.report(MessageKey::IdNoexist, &imp.pos, [imp.target.as_str()]);
            }
        }
    }
}
