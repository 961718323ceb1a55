//! Type resolution: named references, generic parameters and aliases.
//!
//! Parser-produced descriptors carry bare names. Resolution looks every
//! name up through the definition map, replaces generic parameter names by
//! their index, and records the scope of the declaration that was found.

use std::rc::Rc;

use super::checker::Checker;
use super::cursor::Cursor;
use super::defmap::{FnDef, StructDef, TraitDef, TypeAliasDef};
use crate::ast::{FnDecl, PackageId, Position, Token, TokenKind};
use crate::diagnostics::MessageKey;
use crate::types::{FnSignature, Shape, TypeCode, TypeDescriptor};

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub sig: FnSignature,
}

/// Resolved member types of a struct, in terms of its own parameters.
#[derive(Debug, Clone)]
pub struct StructInfo {
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
}

impl StructInfo {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct TraitInfo {
    pub methods: Vec<MethodInfo>,
}

impl TraitInfo {
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Type of `self` inside the methods of `def`.
pub fn struct_self_type(def: &StructDef<'_>) -> TypeDescriptor {
    let params = def
        .def
        .decl
        .generics
        .iter()
        .enumerate()
        .map(|(i, g)| TypeDescriptor::param(&g.name, i))
        .collect();
    TypeDescriptor::named_generic(TypeCode::Struct, def.def.id(), params)
        .in_package(def.def.scope.clone())
}

impl<'c, 'a> Checker<'c, 'a> {
    /// Run `f` as if checking code of `package` with `generics` in scope.
    pub(super) fn in_context<R>(
        &mut self,
        package: PackageId,
        generics: Vec<String>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let saved_package = std::mem::replace(&mut self.package, package);
        let saved_generics = std::mem::replace(&mut self.generics, generics);
        let out = f(self);
        self.package = saved_package;
        self.generics = saved_generics;
        out
    }

    /// Resolve a parser-produced descriptor. With `report` unset failures
    /// stay silent; they were reported where the type was declared.
    pub fn resolve_type(
        &mut self,
        ty: &TypeDescriptor,
        pos: &Position,
        report: bool,
    ) -> Option<TypeDescriptor> {
        let resolved = match &ty.shape {
            Shape::Plain | Shape::Param(_) => ty.clone(),
            Shape::Named(named) if named.package.is_some() => ty.clone(),
            Shape::Named(named) => {
                let generics = named.generics.clone();
                return self.resolve_named(&named.name, &generics, pos, report);
            }
            Shape::Array(elem) => TypeDescriptor::array(self.resolve_value_type(elem, pos, report)?),
            Shape::Pointer(elem) => {
                TypeDescriptor::pointer(self.resolve_value_type(elem, pos, report)?)
            }
            Shape::Map(key, value) => TypeDescriptor::map(
                self.resolve_value_type(key, pos, report)?,
                self.resolve_value_type(value, pos, report)?,
            ),
            Shape::Func(sig) => {
                let mut params = Vec::with_capacity(sig.params.len());
                for param in &sig.params {
                    params.push(self.resolve_value_type(param, pos, report)?);
                }
                let ret = self.resolve_type(&sig.ret, pos, report)?;
                TypeDescriptor::func(FnSignature {
                    params,
                    ret,
                    ..(**sig).clone()
                })
            }
            Shape::Tuple(components) => {
                let mut out = Vec::with_capacity(components.len());
                for component in components {
                    out.push(self.resolve_value_type(component, pos, report)?);
                }
                TypeDescriptor::tuple(out)
            }
        };
        Some(resolved)
    }

    /// Like [`Checker::resolve_type`], rejecting `void`.
    pub fn resolve_value_type(
        &mut self,
        ty: &TypeDescriptor,
        pos: &Position,
        report: bool,
    ) -> Option<TypeDescriptor> {
        let resolved = self.resolve_type(ty, pos, report)?;
        if resolved.is_void() {
            if report {
                self.reporter.report(MessageKey::InvalidType, pos, [ty.kind.as_str()]);
            }
            return None;
        }
        Some(resolved)
    }

    fn resolve_named(
        &mut self,
        name: &str,
        args: &[TypeDescriptor],
        pos: &Position,
        report: bool,
    ) -> Option<TypeDescriptor> {
        if args.is_empty() {
            if let Some(index) = self.generics.iter().position(|g| g == name) {
                return Some(TypeDescriptor::param(name, index));
            }
        }
        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            resolved.push(self.resolve_value_type(arg, pos, report)?);
        }

        let defs = self.defs;
        let package = self.package.clone();
        if let Some(def) = defs.find_struct(name, &package).found() {
            let expected = def.def.decl.generics.len();
            if !self.check_generic_count(expected, resolved.len(), pos, report) {
                return None;
            }
            def.def.mark_used();
            return Some(
                TypeDescriptor::named_generic(TypeCode::Struct, name, resolved)
                    .in_package(def.def.scope.clone()),
            );
        }
        if let Some(def) = defs.find_trait(name, &package).found() {
            if !self.check_generic_count(0, resolved.len(), pos, report) {
                return None;
            }
            def.mark_used();
            return Some(TypeDescriptor::named(TypeCode::Trait, name).in_package(def.scope.clone()));
        }
        if let Some(def) = defs.find_enum(name, &package).found() {
            if !self.check_generic_count(0, resolved.len(), pos, report) {
                return None;
            }
            def.mark_used();
            return Some(TypeDescriptor::named(TypeCode::Enum, name).in_package(def.scope.clone()));
        }
        if let Some(def) = defs.find_type_alias(name, &package).found() {
            if !self.check_generic_count(0, resolved.len(), pos, report) {
                return None;
            }
            return self.resolve_alias(def, pos, report);
        }
        if report {
            self.reporter.report(MessageKey::IdNoexist, pos, [name]);
        }
        None
    }

    fn check_generic_count(
        &mut self,
        expected: usize,
        got: usize,
        pos: &Position,
        report: bool,
    ) -> bool {
        if expected == got {
            return true;
        }
        if report {
            self.reporter.report(
                MessageKey::GenericArgumentCount,
                pos,
                [expected.to_string(), got.to_string()],
            );
        }
        false
    }

    fn resolve_alias(
        &mut self,
        def: &TypeAliasDef<'a>,
        pos: &Position,
        report: bool,
    ) -> Option<TypeDescriptor> {
        let key = def.out_id();
        if self.resolving_aliases.contains(&key) {
            if report {
                self.reporter.report(MessageKey::InvalidType, pos, [def.id()]);
            }
            return None;
        }
        def.mark_used();
        self.resolving_aliases.push(key);
        let target = def.decl.ty.clone();
        let alias_pos = def.pos();
        let resolved = self.in_context(def.package.clone(), Vec::new(), |ck| {
            ck.resolve_type(&target, alias_pos, report)
        });
        self.resolving_aliases.pop();
        Some(resolved?.aliased(def.id()))
    }

    /// Read a type from the token stream and resolve it.
    ///
    /// Grammar: `[]T`, `[K:V]`, `*T`, `(A,B)`, `fn(A,B)R`, builtin names,
    /// and `Name` or `Name[A,B]` for user types.
    pub fn parse_type(&mut self, cur: &mut Cursor<'_>) -> Option<TypeDescriptor> {
        let start = cur.peek().map(|t| t.pos.clone());
        let raw = self.parse_raw_type(cur)?;
        let pos = start.or_else(|| cur.end_pos().cloned())?;
        self.resolve_type(&raw, &pos, true)
    }

    /// Comma separated list of types, e.g. explicit generic arguments.
    pub fn parse_type_list(&mut self, tokens: &[Token]) -> Option<Vec<TypeDescriptor>> {
        let mut out = Vec::new();
        for (part, comma) in crate::ast::split_top_level_commas(tokens) {
            let Some(first) = part.first() else {
                if let Some(comma) = comma {
                    self.reporter.report_at(MessageKey::InvalidSyntax, &comma.pos);
                }
                return None;
            };
            let mut cur = Cursor::new(part);
            let ty = self.parse_type(&mut cur)?;
            if let Some(extra) = cur.peek() {
                self.reporter.report_at(MessageKey::InvalidSyntax, &extra.pos);
                return None;
            }
            if ty.is_void() {
                self.reporter.report(MessageKey::InvalidType, &first.pos, [ty.kind.as_str()]);
                return None;
            }
            out.push(ty);
        }
        Some(out)
    }

    fn parse_raw_type(&mut self, cur: &mut Cursor<'_>) -> Option<TypeDescriptor> {
        let Some(tok) = cur.bump() else {
            if let Some(pos) = cur.end_pos() {
                self.reporter.report_at(MessageKey::MissingExpr, pos);
            }
            return None;
        };
        match tok.kind {
            TokenKind::LBracket => {
                if cur.eat(TokenKind::RBracket).is_some() {
                    return Some(TypeDescriptor::array(self.parse_raw_type(cur)?));
                }
                let key = self.parse_raw_type(cur)?;
                self.expect(cur, TokenKind::Colon, tok)?;
                let value = self.parse_raw_type(cur)?;
                self.expect(cur, TokenKind::RBracket, tok)?;
                Some(TypeDescriptor::map(key, value))
            }
            TokenKind::Op if tok.text == "*" => {
                Some(TypeDescriptor::pointer(self.parse_raw_type(cur)?))
            }
            TokenKind::LParen => {
                let components = self.parse_raw_list(cur, TokenKind::RParen, tok)?;
                Some(TypeDescriptor::tuple(components))
            }
            TokenKind::Ident if tok.text == "fn" => {
                self.expect(cur, TokenKind::LParen, tok)?;
                let params = self.parse_raw_list(cur, TokenKind::RParen, tok)?;
                let ret = if starts_type(cur.peek()) {
                    self.parse_raw_type(cur)?
                } else {
                    TypeDescriptor::void()
                };
                Some(TypeDescriptor::func(FnSignature {
                    has_receiver: false,
                    generics: 0,
                    params,
                    variadic: false,
                    ret,
                }))
            }
            TokenKind::Ident => {
                if let Some(code) = TypeCode::from_name(&tok.text) {
                    return Some(TypeDescriptor::builtin(code));
                }
                let mut generics = Vec::new();
                if cur.eat(TokenKind::LBracket).is_some() {
                    generics = self.parse_raw_list(cur, TokenKind::RBracket, tok)?;
                }
                Some(TypeDescriptor::named_generic(TypeCode::Struct, &tok.text, generics))
            }
            _ => {
                self.reporter.report(MessageKey::InvalidType, &tok.pos, [tok.text.as_str()]);
                None
            }
        }
    }

    /// Types separated by commas up to `close`; the opener is already consumed.
    fn parse_raw_list(
        &mut self,
        cur: &mut Cursor<'_>,
        close: TokenKind,
        open: &Token,
    ) -> Option<Vec<TypeDescriptor>> {
        let mut out = Vec::new();
        if cur.eat(close).is_some() {
            return Some(out);
        }
        loop {
            out.push(self.parse_raw_type(cur)?);
            if cur.eat(close).is_some() {
                return Some(out);
            }
            self.expect(cur, TokenKind::Comma, open)?;
        }
    }

    fn expect<'t>(
        &mut self,
        cur: &mut Cursor<'t>,
        kind: TokenKind,
        context: &Token,
    ) -> Option<&'t Token> {
        if let Some(tok) = cur.eat(kind) {
            return Some(tok);
        }
        let pos = cur.peek().map_or(&context.pos, |t| &t.pos);
        self.reporter.report_at(MessageKey::InvalidSyntax, pos);
        None
    }

    /// Signature of `decl`, resolving its own generics after the ones in scope.
    pub fn signature_of(&mut self, decl: &FnDecl, report: bool) -> Option<FnSignature> {
        let outer = self.generics.len();
        self.generics.extend(decl.generics.iter().map(|g| g.name.clone()));
        let sig = self.resolve_signature(decl, report);
        self.generics.truncate(outer);
        sig
    }

    fn resolve_signature(&mut self, decl: &FnDecl, report: bool) -> Option<FnSignature> {
        let mut params = Vec::with_capacity(decl.params.len());
        let mut ok = true;
        for param in &decl.params {
            match self.resolve_value_type(&param.ty, &param.pos, report) {
                Some(ty) => params.push(ty),
                None => ok = false,
            }
        }
        let ret = self.resolve_type(&decl.ret.ty, &decl.pos, report);
        let ret = ret.filter(|_| ok)?;
        let mut sig = decl.signature();
        sig.params = params;
        sig.ret = ret;
        Some(sig)
    }

    /// Memoized signature of a package-level function.
    pub fn fn_signature(&mut self, def: &FnDef<'a>, report: bool) -> Option<FnSignature> {
        let key = def.out_id();
        if let Some(sig) = self.fn_sigs.get(&key) {
            return sig.clone();
        }
        let decl = def.decl;
        let sig = self.in_context(def.package.clone(), Vec::new(), |ck| {
            ck.signature_of(decl, report)
        });
        self.fn_sigs.insert(key, sig.clone());
        sig
    }

    /// Memoized member types of a struct.
    pub fn struct_info(&mut self, def: &StructDef<'a>, report: bool) -> Option<Rc<StructInfo>> {
        let key = def.def.out_id();
        if let Some(info) = self.struct_infos.get(&key) {
            return info.clone();
        }
        // Guards against re-entry while this struct is being resolved.
        self.struct_infos.insert(key.clone(), None);
        let generics = def.def.decl.generics.iter().map(|g| g.name.clone()).collect();
        let info = self.in_context(def.def.package.clone(), generics, |ck| {
            ck.collect_struct_info(def, report)
        });
        let info = info.map(Rc::new);
        self.struct_infos.insert(key, info.clone());
        info
    }

    fn collect_struct_info(&mut self, def: &StructDef<'a>, report: bool) -> Option<StructInfo> {
        let mut ok = true;
        let mut fields = Vec::new();
        for field in &def.def.decl.fields {
            if fields.iter().any(|f: &FieldInfo| f.name == field.name) {
                if report {
                    self.reporter.report(MessageKey::ExistId, &field.pos, [field.name.as_str()]);
                }
                ok = false;
                continue;
            }
            match self.resolve_value_type(&field.ty, &field.pos, report) {
                Some(ty) => fields.push(FieldInfo {
                    name: field.name.clone(),
                    ty,
                }),
                None => ok = false,
            }
        }
        let mut methods: Vec<MethodInfo> = Vec::new();
        for method in def.methods() {
            if methods.iter().any(|m| m.name == method.name) || fields.iter().any(|f| f.name == method.name) {
                if report {
                    self.reporter.report(MessageKey::ExistId, &method.pos, [method.name.as_str()]);
                }
                ok = false;
                continue;
            }
            if !method.generics.is_empty() {
                if report {
                    self.reporter.report_at(MessageKey::InvalidSyntax, &method.generics[0].pos);
                }
                ok = false;
                continue;
            }
            match self.signature_of(method, report) {
                Some(sig) => methods.push(MethodInfo {
                    name: method.name.clone(),
                    sig,
                }),
                None => ok = false,
            }
        }
        ok.then_some(StructInfo { fields, methods })
    }

    /// Memoized method signatures of a trait.
    pub fn trait_info(&mut self, def: &TraitDef<'a>, report: bool) -> Option<Rc<TraitInfo>> {
        let key = def.out_id();
        if let Some(info) = self.trait_infos.get(&key) {
            return info.clone();
        }
        let decl = def.decl;
        let info = self.in_context(def.package.clone(), Vec::new(), |ck| {
            let mut ok = true;
            let mut methods: Vec<MethodInfo> = Vec::new();
            for method in &decl.methods {
                if methods.iter().any(|m| m.name == method.name) {
                    if report {
                        ck.reporter.report(MessageKey::ExistId, &method.pos, [method.name.as_str()]);
                    }
                    ok = false;
                    continue;
                }
                match ck.signature_of(method, report) {
                    Some(mut sig) => {
                        sig.has_receiver = true;
                        methods.push(MethodInfo {
                            name: method.name.clone(),
                            sig,
                        });
                    }
                    None => ok = false,
                }
            }
            ok.then_some(TraitInfo { methods })
        });
        let info = info.map(Rc::new);
        self.trait_infos.insert(key, info.clone());
        info
    }
}

/// Whether `tok` can start a type.
fn starts_type(tok: Option<&Token>) -> bool {
    tok.is_some_and(|t| match t.kind {
        TokenKind::Ident | TokenKind::LBracket | TokenKind::LParen => true,
        TokenKind::Op => t.text == "*",
        _ => false,
    })
}
