//! Package checker: walks the definition map, checks every declaration and
//! lowers it into the translation unit.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::assign::{const_fits, AssignChecker};
use super::defmap::{DefinitionMap, EnumDef, FnDef, GlobalDef, GlobalState, StructDef, TraitDef};
use super::resolve::{struct_self_type, StructInfo, TraitInfo};
use super::symbol_table::{Symbol, SymbolKind, SymbolTable};
use super::value::{ConstValue, Constant, Value};
use crate::ast::{
    is_ignore, AssignStmt, Attribute, FnDecl, PackageId, Position, RetType, Stmt, Token, TokenKind,
    VarDecl,
};
use crate::codegen::{
    mangle, CodeNode, EnumLayout, FieldLayout, FnLayout, GlobalLayout, ParamLayout, StructLayout,
    TraitLayout, TranslationUnit,
};
use crate::diagnostics::{DiagnosticReporter, MessageKey};
use crate::types::{FnSignature, Lattice, NumericLiteral, Shape, TypeCode, TypeDescriptor};

/// Declared result of the function whose body is being checked.
#[derive(Debug, Clone)]
pub struct FnReturn {
    pub ty: TypeDescriptor,
    /// Empty, or one name per result component.
    pub names: Vec<String>,
    pub all_named: bool,
}

impl FnReturn {
    pub fn new(decl: &RetType, ty: TypeDescriptor) -> Self {
        Self {
            ty,
            names: decl.names.clone(),
            all_named: decl.all_named(),
        }
    }

    /// Type of result component `index`.
    pub fn component(&self, index: usize) -> &TypeDescriptor {
        self.ty
            .tuple_components()
            .and_then(|c| c.get(index))
            .unwrap_or(&self.ty)
    }
}

/// Checked variable declaration.
#[derive(Debug, Clone)]
pub(super) struct CheckedVar {
    pub ty: TypeDescriptor,
    pub init: CodeNode,
    pub constant: Option<Constant>,
}

/// Checks one package and lowers it.
pub struct Checker<'c, 'a> {
    pub(super) defs: &'c DefinitionMap<'a>,
    pub(super) reporter: &'c mut DiagnosticReporter,
    pub(super) lattice: Lattice,
    /// Package whose code is being checked; decides accessibility.
    pub(super) package: PackageId,
    pub(super) symbols: SymbolTable,
    /// Generic parameter names in scope, by index.
    pub(super) generics: Vec<String>,
    pub(super) current_ret: Option<FnReturn>,
    /// Anonymous functions of the expression being evaluated.
    pub(super) closures: &'a [FnDecl],
    pub(super) struct_infos: HashMap<String, Option<Rc<StructInfo>>>,
    pub(super) trait_infos: HashMap<String, Option<Rc<TraitInfo>>>,
    pub(super) fn_sigs: HashMap<String, Option<FnSignature>>,
    pub(super) resolving_aliases: Vec<String>,
}

impl<'c, 'a> Checker<'c, 'a> {
    pub fn new(
        defs: &'c DefinitionMap<'a>,
        reporter: &'c mut DiagnosticReporter,
        lattice: Lattice,
        package: PackageId,
    ) -> Self {
        Self {
            defs,
            reporter,
            lattice,
            package,
            symbols: SymbolTable::new(),
            generics: Vec::new(),
            current_ret: None,
            closures: &[],
            struct_infos: HashMap::new(),
            trait_infos: HashMap::new(),
            fn_sigs: HashMap::new(),
            resolving_aliases: Vec::new(),
        }
    }

    pub fn package(&self) -> &PackageId {
        &self.package
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Check every declaration of the map and lower it.
    pub fn check_package(&mut self) -> TranslationUnit {
        let defs = self.defs;
        let mut unit = TranslationUnit::new();
        debug!(package = %self.package, definitions = defs.len(), "checking definitions");

        // Namespaces first, so their globals are resolved before use
        for ns in &defs.namespaces {
            let mut inner =
                Checker::new(&ns.defs, &mut *self.reporter, self.lattice, self.package.clone());
            unit.extend(inner.check_package());
        }

        // First pass: enums, whose items are constants
        for def in &defs.enums {
            if let Some(layout) = self.check_enum(def) {
                unit.enums.push(layout);
            }
        }

        // Second pass: member and function types
        for def in &defs.structs {
            self.struct_info(def, true);
        }
        for def in &defs.traits {
            if let Some(layout) = self.check_trait(def) {
                unit.traits.push(layout);
            }
        }
        for def in &defs.functions {
            self.fn_signature(def, true);
        }

        // Third pass: globals, in declaration order
        for def in &defs.globals {
            if let Some(layout) = self.check_global(def) {
                unit.globals.push(layout);
            }
        }

        // Fourth pass: bodies
        for def in &defs.structs {
            if let Some(layout) = self.check_struct(def) {
                unit.structs.push(layout);
            }
        }
        for def in &defs.functions {
            if let Some(layout) = self.check_fn(def) {
                unit.functions.push(layout);
            }
        }

        let unused = defs
            .functions
            .iter()
            .filter(|d| !d.decl.public && !d.is_used() && d.decl.name != "main")
            .count();
        debug!(
            package = %self.package,
            errors = self.reporter.error_count(),
            unused,
            "definitions checked"
        );
        unit
    }

    fn check_enum(&mut self, def: &EnumDef<'a>) -> Option<EnumLayout> {
        let decl = def.decl;
        let ty = self.resolve_type(&decl.ty, &decl.pos, true)?;
        if ty.shape != Shape::Plain || !ty.code.is_integer() {
            self.reporter.report(MessageKey::InvalidType, &decl.pos, [ty.kind.as_str()]);
            return None;
        }
        let mut ok = true;
        let mut items = Vec::with_capacity(decl.items.len());
        let mut seen: Vec<&str> = Vec::new();
        let mut next: i128 = 0;
        for item in &decl.items {
            if seen.contains(&item.name.as_str()) {
                self.reporter.report(MessageKey::ExistId, &item.pos, [item.name.as_str()]);
                ok = false;
                continue;
            }
            seen.push(&item.name);
            let value = match &item.expr {
                Some(expr) if !expr.is_empty() => {
                    let Some(value) = self.eval_expr(expr) else {
                        ok = false;
                        continue;
                    };
                    match value.numeric() {
                        Some(NumericLiteral::Signed(v)) => i128::from(v),
                        Some(NumericLiteral::Unsigned(v)) => i128::from(v),
                        _ => {
                            self.reporter.report_at(MessageKey::ExprNotConst, &item.pos);
                            ok = false;
                            continue;
                        }
                    }
                }
                _ => next,
            };
            let lit = match (i64::try_from(value), u64::try_from(value)) {
                (Ok(v), _) => NumericLiteral::Signed(v),
                (_, Ok(v)) => NumericLiteral::Unsigned(v),
                _ => {
                    self.reporter.report_at(MessageKey::OverflowLimits, &item.pos);
                    ok = false;
                    continue;
                }
            };
            if !const_fits(&self.lattice, ty.code, lit) {
                self.reporter.report_at(MessageKey::OverflowLimits, &item.pos);
                ok = false;
                continue;
            }
            items.push((
                mangle::local_id(&item.name),
                ConstValue::from_numeric(lit).cpp(),
            ));
            next = value + 1;
        }
        ok.then(|| EnumLayout {
            out_id: def.out_id(),
            cpp_type: ty.cpp(&self.lattice),
            items,
        })
    }

    fn check_trait(&mut self, def: &TraitDef<'a>) -> Option<TraitLayout> {
        let info = self.trait_info(def, true)?;
        let methods = def
            .decl
            .methods
            .iter()
            .filter_map(|decl| {
                let method = info.method(&decl.name)?;
                Some(self.fn_head(decl, &method.sig, mangle::local_id(&decl.name)))
            })
            .collect();
        Some(TraitLayout {
            out_id: def.out_id(),
            methods,
        })
    }

    fn check_global(&mut self, def: &GlobalDef<'a>) -> Option<GlobalLayout> {
        let decl = def.def.decl;
        let Some(var) = self.check_var(decl) else {
            def.resolve(GlobalState {
                ty: TypeDescriptor::void(),
                constant: None,
            });
            return None;
        };
        def.resolve(GlobalState {
            ty: var.ty.clone(),
            constant: var.constant.clone(),
        });
        Some(GlobalLayout {
            out_id: def.def.out_id(),
            cpp_type: var.ty.cpp(&self.lattice),
            init: var.init,
            constant: decl.constant,
        })
    }

    fn check_struct(&mut self, def: &StructDef<'a>) -> Option<StructLayout> {
        let info = self.struct_info(def, false)?;
        let decl = def.def.decl;
        let defs = self.defs;
        let mut ok = true;

        let mut traits = Vec::new();
        for (name, pos) in def.trait_names() {
            let Some(trait_def) = defs.find_trait(name, &self.package).found() else {
                self.reporter.report(MessageKey::IdNoexist, pos, [name]);
                ok = false;
                continue;
            };
            trait_def.mark_used();
            let Some(trait_info) = self.trait_info(trait_def, false) else {
                ok = false;
                continue;
            };
            for required in &trait_info.methods {
                let implemented = info.method(&required.name).is_some_and(|own| {
                    own.sig.params == required.sig.params && own.sig.ret == required.sig.ret
                });
                if !implemented {
                    self.reporter.report(
                        MessageKey::TraitNotImplemented,
                        pos,
                        [decl.name.as_str(), required.name.as_str(), name],
                    );
                    ok = false;
                }
            }
            traits.push(trait_def.out_id());
        }

        let fields = info
            .fields
            .iter()
            .map(|f| FieldLayout {
                name: f.name.clone(),
                out_id: mangle::local_id(&f.name),
                cpp_type: f.ty.cpp(&self.lattice),
                boxed: f.ty.is_pointer(),
            })
            .collect();

        let self_ty = struct_self_type(def);
        let generics: Vec<String> = decl.generics.iter().map(|g| g.name.clone()).collect();
        let mut methods = Vec::new();
        for method in def.methods() {
            let Some(sig) = info.method(&method.name).map(|m| m.sig.clone()) else {
                continue;
            };
            let out_id = mangle::local_id(&method.name);
            let layout = self.in_context(def.def.package.clone(), generics.clone(), |ck| {
                ck.lower_fn(method, &sig, out_id, Some(&self_ty))
            });
            match layout {
                Some(layout) => methods.push(layout),
                None => ok = false,
            }
        }

        ok.then(|| StructLayout {
            name: decl.name.clone(),
            out_id: def.def.out_id(),
            generics: generics.len(),
            traits,
            fields,
            methods,
        })
    }

    fn check_fn(&mut self, def: &FnDef<'a>) -> Option<FnLayout> {
        let decl = def.decl;
        if decl.is_extern() || decl.body.is_none() {
            return None;
        }
        let sig = self.fn_signature(def, false)?;
        self.lower_fn(decl, &sig, def.call_id(), None)
    }

    /// Prototype layout: output id, result and parameters.
    fn fn_head(&self, decl: &FnDecl, sig: &FnSignature, out_id: String) -> FnLayout {
        let mut layout = FnLayout::new(out_id, sig.ret.cpp(&self.lattice));
        layout.generics = decl.generics.len();
        layout.inline = decl.has_attribute(Attribute::Inline);
        for (param, ty) in decl.params.iter().zip(&sig.params) {
            let ty = if param.variadic {
                TypeDescriptor::array(ty.clone())
            } else {
                ty.clone()
            };
            let out_id = if is_ignore(&param.name) {
                String::new()
            } else {
                mangle::local_id(&param.name)
            };
            layout.params.push(ParamLayout {
                out_id,
                cpp_type: ty.cpp(&self.lattice),
            });
        }
        layout
    }

    /// Check the body of `decl` and lower it.
    pub(super) fn lower_fn(
        &mut self,
        decl: &'a FnDecl,
        sig: &FnSignature,
        out_id: String,
        receiver: Option<&TypeDescriptor>,
    ) -> Option<FnLayout> {
        let mut layout = self.fn_head(decl, sig, out_id);
        let errors = self.reporter.error_count();
        let outer_generics = self.generics.len();
        self.generics.extend(decl.generics.iter().map(|g| g.name.clone()));
        self.symbols.push_scope(Some(decl.name.clone()));

        if let (Some(recv), Some(ty)) = (&decl.receiver, receiver) {
            let mut symbol = Symbol::new("self", SymbolKind::Receiver, ty.clone(), decl.pos.clone());
            symbol.is_mutable = recv.mutable;
            if self.symbols.define(symbol).is_err() {
                self.reporter.report(MessageKey::ExistId, &decl.pos, ["self"]);
            }
        }
        for (param, ty) in decl.params.iter().zip(&sig.params) {
            if is_ignore(&param.name) {
                continue;
            }
            let ty = if param.variadic {
                TypeDescriptor::array(ty.clone())
            } else {
                ty.clone()
            };
            let mut symbol = Symbol::new(&param.name, SymbolKind::Parameter, ty, param.pos.clone());
            symbol.is_mutable = param.mutable;
            if self.symbols.define(symbol).is_err() {
                self.reporter.report(MessageKey::ExistId, &param.pos, [param.name.as_str()]);
            }
        }

        let ret = FnReturn::new(&decl.ret, sig.ret.clone());
        for (i, name) in ret.names.iter().enumerate() {
            if is_ignore(name) {
                continue;
            }
            let ty = ret.component(i).clone();
            let declaration = format!(
                "{} {} = {};",
                ty.cpp(&self.lattice),
                mangle::local_id(name),
                ty.default_literal(&self.lattice)
            );
            let mut symbol = Symbol::new(name, SymbolKind::NamedReturn, ty, decl.pos.clone());
            symbol.is_mutable = true;
            if self.symbols.define(symbol).is_err() {
                self.reporter.report(MessageKey::ExistId, &decl.pos, [name.as_str()]);
                continue;
            }
            layout.body.push(CodeNode::lit(declaration));
        }

        let saved_ret = self.current_ret.replace(ret);
        if let Some(body) = &decl.body {
            for stmt in body {
                if let Some(node) = self.lower_stmt(stmt) {
                    layout.body.push(node);
                }
            }
        }
        self.current_ret = saved_ret;
        if let Some(unused) = self.symbols.pop_scope() {
            for symbol in unused {
                debug!(name = %symbol.name, function = %decl.name, "unused local");
            }
        }
        self.generics.truncate(outer_generics);

        (self.reporter.error_count() == errors).then_some(layout)
    }

    pub(super) fn lower_stmt(&mut self, stmt: &'a Stmt) -> Option<CodeNode> {
        match stmt {
            Stmt::Expr(expr) => {
                if expr.is_empty() {
                    return None;
                }
                let value = self.eval_expr(expr)?;
                Some(CodeNode::stmt(value.node))
            }
            Stmt::Var(decl) => self.lower_local(decl),
            Stmt::Assign(assign) => self.lower_assign(assign),
            Stmt::Return(ret) => Some(CodeNode::stmt(self.check_return(ret))),
        }
    }

    /// Shared checks of global and local variable declarations.
    pub(super) fn check_var(&mut self, decl: &'a VarDecl) -> Option<CheckedVar> {
        let init = decl.init.as_ref().filter(|e| !e.is_empty());
        if decl.constant && init.is_none() {
            self.reporter.report_at(MessageKey::MissingConstValue, &decl.pos);
            return None;
        }
        let declared = match &decl.ty {
            Some(ty) => Some(self.resolve_value_type(ty, &decl.pos, true)?),
            None => None,
        };
        let value = match init {
            Some(expr) => Some(self.eval_expr(expr)?),
            None => None,
        };
        let ty = match (declared, &value) {
            (Some(ty), Some(value)) => {
                let ok = self.assignable(&ty, value, &decl.pos);
                if !ok {
                    return None;
                }
                ty
            }
            (Some(ty), None) => ty,
            (None, None) => {
                self.reporter.report_at(MessageKey::MissingAutotypeValue, &decl.pos);
                return None;
            }
            (None, Some(value)) => {
                if value.ty.is_nil() {
                    self.reporter.report_at(MessageKey::NilForAutotype, &decl.pos);
                    return None;
                }
                if value.ty.is_void() {
                    self.reporter.report_at(MessageKey::VoidForAutotype, &decl.pos);
                    return None;
                }
                value.ty.clone()
            }
        };
        let constant = match value.as_ref().map(|v| v.constant.clone()) {
            Some(Some(constant)) if decl.constant => Some(constant),
            _ if decl.constant => {
                self.reporter.report_at(MessageKey::ExprNotConst, &decl.pos);
                return None;
            }
            _ => None,
        };
        let init = match value {
            Some(value) => value.node,
            None => CodeNode::lit(ty.default_literal(&self.lattice)),
        };
        Some(CheckedVar { ty, init, constant })
    }

    /// Whether `value` may be stored into `dst`; struct values are accepted
    /// by the traits they implement.
    pub(super) fn assignable(
        &mut self,
        dst: &TypeDescriptor,
        value: &Value,
        pos: &Position,
    ) -> bool {
        if self.implements(dst, &value.ty) {
            return true;
        }
        AssignChecker::new(dst, value, pos).check(&self.lattice, self.reporter)
    }

    /// Whether `src` is a struct implementing the trait `dst`.
    fn implements(&self, dst: &TypeDescriptor, src: &TypeDescriptor) -> bool {
        let (Some(want), Some(have)) = (dst.named_type(), src.named_type()) else {
            return false;
        };
        if dst.code != TypeCode::Trait || src.code != TypeCode::Struct {
            return false;
        }
        let (Some(trait_scope), Some(struct_scope)) = (&want.package, &have.package) else {
            return false;
        };
        let defs = self.defs;
        let Some(trait_def) = defs.trait_in_scope(&want.name, trait_scope) else {
            return false;
        };
        let Some(struct_def) = defs.struct_in_scope(&have.name, struct_scope) else {
            return false;
        };
        struct_def.trait_names().any(|(name, _)| {
            defs.find_trait(name, &struct_def.def.package)
                .found()
                .is_some_and(|t| std::ptr::eq(t, trait_def))
        })
    }

    fn lower_local(&mut self, decl: &'a VarDecl) -> Option<CodeNode> {
        let var = self.check_var(decl)?;
        if is_ignore(&decl.name) {
            return Some(CodeNode::stmt(CodeNode::seq(vec![
                CodeNode::lit("(void)"),
                CodeNode::paren(var.init),
            ])));
        }
        let cpp_type = var.ty.cpp(&self.lattice);
        let mut symbol = Symbol::new(&decl.name, SymbolKind::Variable, var.ty, decl.pos.clone());
        symbol.is_mutable = decl.mutable && !decl.constant;
        symbol.constant = var.constant;
        let out_id = symbol.out_id();
        if self.symbols.define(symbol).is_err() {
            self.reporter.report(MessageKey::ExistId, &decl.pos, [decl.name.as_str()]);
            return None;
        }
        let qualifier = if decl.constant { "const " } else { "" };
        Some(CodeNode::seq(vec![
            CodeNode::lit(format!("{qualifier}{cpp_type} {out_id} = ")),
            var.init,
            CodeNode::lit(";"),
        ]))
    }

    fn lower_assign(&mut self, stmt: &'a AssignStmt) -> Option<CodeNode> {
        if stmt.value.is_empty() || stmt.target.is_empty() {
            self.reporter.report_at(MessageKey::MissingExpr, &stmt.pos);
            return None;
        }
        let value = self.eval_expr(&stmt.value)?;
        if let [tok] = stmt.target.tokens.as_slice() {
            if tok.kind == TokenKind::Ident && is_ignore(&tok.text) {
                return Some(CodeNode::stmt(CodeNode::seq(vec![
                    CodeNode::lit("(void)"),
                    CodeNode::paren(value.node),
                ])));
            }
        }
        let target = self.eval_expr(&stmt.target)?;
        if target.is_const() {
            self.reporter.report_at(MessageKey::AssignConst, &stmt.pos);
            return None;
        }
        if !target.lvalue || !target.mutable {
            self.reporter.report_at(MessageKey::AssignNonLvalue, &stmt.pos);
            return None;
        }
        let value_node = value.node.clone();
        let ok = match stmt.op.strip_suffix('=').filter(|op| !op.is_empty()) {
            Some(op) => {
                let op = Token::new(TokenKind::Op, op, stmt.pos.clone());
                match self.binary(target.clone(), &op, value) {
                    Some(result) => self.assignable(&target.ty, &result, &stmt.pos),
                    None => false,
                }
            }
            None => self.assignable(&target.ty, &value, &stmt.pos),
        };
        ok.then(|| {
            CodeNode::seq(vec![
                target.node,
                CodeNode::lit(format!(" {} ", stmt.op)),
                value_node,
                CodeNode::lit(";"),
            ])
        })
    }
}
