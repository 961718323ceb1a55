//! Expression evaluation: typing, constant folding and lowering.
//!
//! Expressions are parsed by precedence climbing directly over their token
//! slice. Every evaluation step returns a [`Value`] whose node is built only
//! after the checks for it passed; `None` means a diagnostic was reported.

use std::cmp::Ordering;

use super::assign::const_fits;
use super::checker::Checker;
use super::cursor::Cursor;
use super::defmap::{AnyDefinition, DefinitionMap, FnDef, StructDef};
use super::value::{ConstValue, Constant, Value};
use crate::ast::{split_top_level_commas, Expr, Position, Token, TokenKind};
use crate::codegen::{mangle, AnonFn, CodeNode};
use crate::diagnostics::MessageKey;
use crate::types::bits::{parse_float_literal, parse_int_literal, parse_str_literal};
use crate::types::{FnSignature, Instantiation, NumericLiteral, Shape, TypeCode, TypeDescriptor};

/// Binding power of a binary operator; higher binds tighter.
fn precedence(tok: &Token) -> Option<u8> {
    if tok.kind != TokenKind::Op {
        return None;
    }
    let level = match tok.text.as_str() {
        "||" => 1,
        "&&" => 2,
        "==" | "!=" | "<" | "<=" | ">" | ">=" => 3,
        "+" | "-" | "|" | "^" => 4,
        "*" | "/" | "%" | "<<" | ">>" | "&" => 5,
        _ => return None,
    };
    Some(level)
}

fn infix(lhs: CodeNode, op: &str, rhs: CodeNode) -> CodeNode {
    CodeNode::paren(CodeNode::seq(vec![lhs, CodeNode::lit(format!(" {op} ")), rhs]))
}

fn is_plain(ty: &TypeDescriptor, code: TypeCode) -> bool {
    ty.shape == Shape::Plain && ty.code == code
}

fn is_plain_numeric(ty: &TypeDescriptor) -> bool {
    ty.shape == Shape::Plain && ty.code.is_numeric()
}

fn is_plain_integer(ty: &TypeDescriptor) -> bool {
    ty.shape == Shape::Plain && ty.code.is_integer()
}

fn as_i128(lit: NumericLiteral) -> i128 {
    match lit {
        NumericLiteral::Signed(v) => i128::from(v),
        NumericLiteral::Unsigned(v) => i128::from(v),
        NumericLiteral::Float(v) => v as i128,
    }
}

fn literal_from_i128(value: i128) -> Option<NumericLiteral> {
    if let Ok(v) = i64::try_from(value) {
        return Some(NumericLiteral::Signed(v));
    }
    u64::try_from(value).ok().map(NumericLiteral::Unsigned)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FoldError {
    DivideByZero,
    Overflow,
}

/// Fold a binary arithmetic operator over two numeric constants.
fn fold_numeric(
    op: &str,
    a: NumericLiteral,
    b: NumericLiteral,
) -> Result<NumericLiteral, FoldError> {
    if matches!(a, NumericLiteral::Float(_)) || matches!(b, NumericLiteral::Float(_)) {
        let (x, y) = (a.as_f64(), b.as_f64());
        let v = match op {
            "+" => x + y,
            "-" => x - y,
            "*" => x * y,
            "/" if y == 0.0 => return Err(FoldError::DivideByZero),
            "/" => x / y,
            _ => return Err(FoldError::Overflow),
        };
        return if v.is_finite() {
            Ok(NumericLiteral::Float(v))
        } else {
            Err(FoldError::Overflow)
        };
    }
    let (x, y) = (as_i128(a), as_i128(b));
    let v = match op {
        "+" => x.checked_add(y),
        "-" => x.checked_sub(y),
        "*" => x.checked_mul(y),
        "/" | "%" if y == 0 => return Err(FoldError::DivideByZero),
        "/" => x.checked_div(y),
        "%" => x.checked_rem(y),
        "<<" => u32::try_from(y)
            .ok()
            .filter(|&s| s < 64)
            .and_then(|s| x.checked_mul(1i128 << s)),
        ">>" => u32::try_from(y).ok().filter(|&s| s < 128).map(|s| x >> s),
        "&" => Some(x & y),
        "|" => Some(x | y),
        "^" => Some(x ^ y),
        _ => None,
    };
    v.and_then(literal_from_i128).ok_or(FoldError::Overflow)
}

fn compare_numeric(a: NumericLiteral, b: NumericLiteral) -> Option<Ordering> {
    match (a, b) {
        (NumericLiteral::Float(_), _) | (_, NumericLiteral::Float(_)) => {
            a.as_f64().partial_cmp(&b.as_f64())
        }
        _ => Some(as_i128(a).cmp(&as_i128(b))),
    }
}

fn fold_comparison(op: &str, lhs: &Value, rhs: &Value) -> Option<bool> {
    let ordering = match (&lhs.constant.as_ref()?.value, &rhs.constant.as_ref()?.value) {
        (ConstValue::Bool(a), ConstValue::Bool(b)) => a.cmp(b),
        (ConstValue::Str(a), ConstValue::Str(b)) => a.cmp(b),
        (a, b) => compare_numeric(a.as_numeric()?, b.as_numeric()?)?,
    };
    let result = match op {
        "==" => ordering == Ordering::Equal,
        "!=" => ordering != Ordering::Equal,
        "<" => ordering == Ordering::Less,
        "<=" => ordering != Ordering::Greater,
        ">" => ordering == Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        _ => return None,
    };
    Some(result)
}

/// Split `key: value` at the first colon outside brackets.
fn split_top_level_colon(tokens: &[Token]) -> Option<(&[Token], &[Token])> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.opens() {
            depth += 1;
        } else if tok.closes() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && tok.kind == TokenKind::Colon {
            return Some((&tokens[..i], &tokens[i + 1..]));
        }
    }
    None
}

/// Comma separated parts of a brace body; a trailing comma is allowed.
fn literal_parts(tokens: &[Token]) -> Vec<(&[Token], Option<&Token>)> {
    split_top_level_commas(tokens)
        .into_iter()
        .filter(|(part, comma)| !(part.is_empty() && comma.is_none()))
        .collect()
}

impl<'c, 'a> Checker<'c, 'a> {
    /// Evaluate `expr` and attach its lowered node.
    ///
    /// Empty expressions yield `None` without a diagnostic; callers report
    /// them at their own position.
    pub fn eval_expr(&mut self, expr: &'a Expr) -> Option<Value> {
        if expr.is_empty() {
            return None;
        }
        let outer = std::mem::replace(&mut self.closures, expr.closures.as_slice());
        let value = self.eval_tokens(&expr.tokens);
        self.closures = outer;
        if let Some(value) = &value {
            expr.attach_model(value.node.clone());
        }
        value
    }

    /// Evaluate a complete, non-empty token slice.
    pub fn eval_tokens(&mut self, tokens: &[Token]) -> Option<Value> {
        let mut cur = Cursor::new(tokens);
        let value = self.eval_binary(&mut cur, 1)?;
        if let Some(extra) = cur.peek() {
            self.reporter.report_at(MessageKey::InvalidSyntax, &extra.pos);
            return None;
        }
        Some(value)
    }

    fn eval_binary(&mut self, cur: &mut Cursor<'_>, min: u8) -> Option<Value> {
        let mut lhs = self.eval_unary(cur)?;
        while let Some(op) = cur.peek() {
            let Some(level) = precedence(op) else {
                break;
            };
            if level < min {
                break;
            }
            cur.bump();
            if cur.is_done() {
                self.reporter.report_at(MessageKey::MissingExpr, &op.pos);
                return None;
            }
            let rhs = self.eval_binary(cur, level + 1)?;
            lhs = self.binary(lhs, op, rhs)?;
        }
        Some(lhs)
    }

    fn eval_unary(&mut self, cur: &mut Cursor<'_>) -> Option<Value> {
        let Some(tok) = cur.peek() else {
            self.missing_expr(cur.end_pos());
            return None;
        };
        if tok.kind == TokenKind::Op && matches!(tok.text.as_str(), "-" | "+" | "!" | "^" | "*") {
            cur.bump();
            if cur.is_done() {
                self.reporter.report_at(MessageKey::MissingExpr, &tok.pos);
                return None;
            }
            let operand = self.eval_unary(cur)?;
            return self.unary(tok, operand);
        }
        let value = self.eval_primary(cur)?;
        self.eval_postfix(cur, value)
    }

    fn missing_expr(&mut self, pos: Option<&Position>) {
        if let Some(pos) = pos {
            self.reporter.report_at(MessageKey::MissingExpr, pos);
        }
    }

    fn invalid_syntax(&mut self, pos: &Position) -> Option<Value> {
        self.reporter.report_at(MessageKey::InvalidSyntax, pos);
        None
    }

    fn not_for_type(&mut self, op: &Token, ty: &TypeDescriptor) -> Option<Value> {
        self.reporter.report(
            MessageKey::OperatorNotForType,
            &op.pos,
            [op.text.as_str(), ty.kind.as_str()],
        );
        None
    }

    fn unary(&mut self, op: &Token, operand: Value) -> Option<Value> {
        let ty = operand.ty.clone();
        let cpp_op = match op.text.as_str() {
            "*" => {
                let Shape::Pointer(elem) = &ty.shape else {
                    return self.not_for_type(op, &ty);
                };
                let node = CodeNode::paren(CodeNode::seq(vec![CodeNode::lit("*"), operand.node]));
                return Some(Value::storage((**elem).clone(), node, true));
            }
            "!" => {
                if !is_plain(&ty, TypeCode::Bool) {
                    return self.not_for_type(op, &ty);
                }
                if let Some(b) = operand.const_bool() {
                    return Some(Value::constant(ty, Constant::new(ConstValue::Bool(!b))));
                }
                "!"
            }
            "+" => {
                if !is_plain_numeric(&ty) {
                    return self.not_for_type(op, &ty);
                }
                return Some(operand);
            }
            "-" => {
                if !is_plain_numeric(&ty) {
                    return self.not_for_type(op, &ty);
                }
                if let Some(lit) = operand.numeric() {
                    let negated = match lit {
                        NumericLiteral::Float(v) => NumericLiteral::Float(-v),
                        other => match literal_from_i128(-as_i128(other)) {
                            Some(v) => v,
                            None => {
                                self.reporter.report(
                                    MessageKey::InvalidNumericRange,
                                    &op.pos,
                                    [format!("-{}", lit.to_literal())],
                                );
                                return None;
                            }
                        },
                    };
                    let ty = match negated {
                        NumericLiteral::Signed(v) if v < 0 && ty.code.is_unsigned_integer() => {
                            TypeDescriptor::builtin(TypeCode::Int)
                        }
                        _ => ty,
                    };
                    return Some(Value::constant(ty, Constant::numeric(negated)));
                }
                if ty.code.is_unsigned_integer() {
                    return self.not_for_type(op, &ty);
                }
                "-"
            }
            "^" => {
                if !is_plain_integer(&ty) {
                    return self.not_for_type(op, &ty);
                }
                match operand.numeric() {
                    Some(NumericLiteral::Signed(v)) => {
                        return Some(Value::constant(ty, Constant::numeric(NumericLiteral::Signed(!v))));
                    }
                    Some(NumericLiteral::Unsigned(v)) => {
                        let bits = self.lattice.bit_size(ty.code).unwrap_or(64);
                        let mask = u64::MAX >> (64 - bits);
                        return Some(Value::constant(
                            ty,
                            Constant::numeric(NumericLiteral::Unsigned(!v & mask)),
                        ));
                    }
                    _ => {}
                }
                "~"
            }
            _ => return self.not_for_type(op, &ty),
        };
        let node = CodeNode::paren(CodeNode::seq(vec![CodeNode::lit(cpp_op), operand.node]));
        Some(Value::new(ty, node))
    }

    /// Type and lower `lhs op rhs`.
    pub(super) fn binary(&mut self, lhs: Value, op: &Token, rhs: Value) -> Option<Value> {
        match op.text.as_str() {
            "&&" | "||" => self.logical(lhs, op, rhs),
            "==" | "!=" | "<" | "<=" | ">" | ">=" => self.comparison(lhs, op, rhs),
            _ => self.arithmetic(lhs, op, rhs),
        }
    }

    fn logical(&mut self, lhs: Value, op: &Token, rhs: Value) -> Option<Value> {
        if !is_plain(&lhs.ty, TypeCode::Bool) || !is_plain(&rhs.ty, TypeCode::Bool) {
            self.reporter.report_at(MessageKey::LogicalNotBool, &op.pos);
            return None;
        }
        let ty = TypeDescriptor::builtin(TypeCode::Bool);
        if let (Some(a), Some(b)) = (lhs.const_bool(), rhs.const_bool()) {
            let v = if op.text == "&&" { a && b } else { a || b };
            return Some(Value::constant(ty, Constant::new(ConstValue::Bool(v))));
        }
        Some(Value::new(ty, infix(lhs.node, &op.text, rhs.node)))
    }

    fn comparison(&mut self, lhs: Value, op: &Token, rhs: Value) -> Option<Value> {
        let equality = matches!(op.text.as_str(), "==" | "!=");
        if is_plain_numeric(&lhs.ty) && is_plain_numeric(&rhs.ty) {
            self.unify(&lhs, op, &rhs)?;
        } else if equality {
            if !self.comparable(&lhs.ty, &rhs.ty) {
                self.reporter.report(
                    MessageKey::IncompatibleTypes,
                    &op.pos,
                    [lhs.ty.kind.as_str(), rhs.ty.kind.as_str()],
                );
                return None;
            }
        } else {
            let ordered = lhs.ty == rhs.ty
                && (is_plain(&lhs.ty, TypeCode::Str) || is_plain(&lhs.ty, TypeCode::Char));
            if !ordered {
                return self.not_for_type(op, &lhs.ty);
            }
        }
        let ty = TypeDescriptor::builtin(TypeCode::Bool);
        if let Some(result) = fold_comparison(&op.text, &lhs, &rhs) {
            return Some(Value::constant(ty, Constant::new(ConstValue::Bool(result))));
        }
        Some(Value::new(ty, infix(lhs.node, &op.text, rhs.node)))
    }

    /// Whether values of the two types may be tested for equality.
    fn comparable(&self, l: &TypeDescriptor, r: &TypeDescriptor) -> bool {
        if l == r {
            return true;
        }
        if l.is_nil() {
            return r.is_nil_compatible();
        }
        if r.is_nil() {
            return l.is_nil_compatible();
        }
        l.shape == Shape::Plain
            && r.shape == Shape::Plain
            && (self.lattice.is_compatible(l.code, r.code, true)
                || self.lattice.is_compatible(r.code, l.code, true))
    }

    /// Operand type of a binary numeric expression. A constant operand
    /// adopts the type of a non-constant one when its value fits.
    fn unify(&mut self, lhs: &Value, op: &Token, rhs: &Value) -> Option<TypeDescriptor> {
        let (l, r) = (&lhs.ty, &rhs.ty);
        if l == r {
            return Some(l.clone());
        }
        let lattice = self.lattice;
        match (lhs.numeric(), rhs.numeric()) {
            (Some(lit), None) if const_fits(&lattice, r.code, lit) => return Some(r.clone()),
            (None, Some(lit)) if const_fits(&lattice, l.code, lit) => return Some(l.clone()),
            _ => {}
        }
        if lattice.is_wider(l.code, r.code) || lattice.is_compatible(l.code, r.code, true) {
            return Some(l.clone());
        }
        if lattice.is_wider(r.code, l.code) || lattice.is_compatible(r.code, l.code, true) {
            return Some(r.clone());
        }
        self.reporter.report(
            MessageKey::IncompatibleTypes,
            &op.pos,
            [l.kind.as_str(), r.kind.as_str()],
        );
        None
    }

    fn arithmetic(&mut self, lhs: Value, op: &Token, rhs: Value) -> Option<Value> {
        let text = op.text.as_str();
        if text == "+" && is_plain(&lhs.ty, TypeCode::Str) && is_plain(&rhs.ty, TypeCode::Str) {
            let ty = lhs.ty.clone();
            let joined = match (&lhs.constant, &rhs.constant) {
                (Some(a), Some(b)) => match (&a.value, &b.value) {
                    (ConstValue::Str(a), ConstValue::Str(b)) => {
                        Some([a.as_slice(), b.as_slice()].concat())
                    }
                    _ => None,
                },
                _ => None,
            };
            if let Some(joined) = joined {
                return Some(Value::constant(ty, Constant::new(ConstValue::Str(joined))));
            }
            return Some(Value::new(ty, infix(lhs.node, text, rhs.node)));
        }
        if !is_plain_numeric(&lhs.ty) {
            return self.not_for_type(op, &lhs.ty);
        }
        if !is_plain_numeric(&rhs.ty) {
            return self.not_for_type(op, &rhs.ty);
        }
        let ty = self.unify(&lhs, op, &rhs)?;
        let integer_only = matches!(text, "%" | "<<" | ">>" | "&" | "|" | "^");
        if integer_only && !ty.code.is_integer() {
            return self.not_for_type(op, &ty);
        }
        if let (Some(a), Some(b)) = (lhs.numeric(), rhs.numeric()) {
            let folded = match fold_numeric(text, a, b) {
                Ok(folded) => folded,
                Err(FoldError::DivideByZero) => {
                    self.reporter.report_at(MessageKey::DivideByZero, &op.pos);
                    return None;
                }
                Err(FoldError::Overflow) => {
                    self.reporter.report_at(MessageKey::OverflowLimits, &op.pos);
                    return None;
                }
            };
            if !const_fits(&self.lattice, ty.code, folded) {
                self.reporter.report_at(MessageKey::OverflowLimits, &op.pos);
                return None;
            }
            return Some(Value::constant(ty, Constant::numeric(folded)));
        }
        let zero_divisor = rhs.numeric().is_some_and(|lit| lit.as_f64() == 0.0);
        if matches!(text, "/" | "%") && zero_divisor {
            self.reporter.report_at(MessageKey::DivideByZero, &op.pos);
            return None;
        }
        Some(Value::new(ty, infix(lhs.node, text, rhs.node)))
    }

    fn eval_primary(&mut self, cur: &mut Cursor<'_>) -> Option<Value> {
        let Some(tok) = cur.peek() else {
            self.missing_expr(cur.end_pos());
            return None;
        };
        match tok.kind {
            TokenKind::Int => {
                cur.bump();
                let Some(lit) = parse_int_literal(&tok.text) else {
                    self.reporter.report(MessageKey::InvalidNumericRange, &tok.pos, [tok.text.as_str()]);
                    return None;
                };
                let code = match lit {
                    NumericLiteral::Unsigned(_) => TypeCode::U64,
                    _ => TypeCode::Int,
                };
                Some(Value::constant(TypeDescriptor::builtin(code), Constant::numeric(lit)))
            }
            TokenKind::Float => {
                cur.bump();
                let Some(lit) = parse_float_literal(&tok.text) else {
                    self.reporter.report(MessageKey::InvalidNumericRange, &tok.pos, [tok.text.as_str()]);
                    return None;
                };
                Some(Value::constant(TypeDescriptor::builtin(TypeCode::F64), Constant::numeric(lit)))
            }
            TokenKind::Str => {
                cur.bump();
                let Some(bytes) = parse_str_literal(&tok.text) else {
                    return self.invalid_syntax(&tok.pos);
                };
                Some(Value::constant(
                    TypeDescriptor::builtin(TypeCode::Str),
                    Constant::new(ConstValue::Str(bytes)),
                ))
            }
            TokenKind::Char => {
                cur.bump();
                Some(Value::new(
                    TypeDescriptor::builtin(TypeCode::Char),
                    CodeNode::lit(tok.text.clone()),
                ))
            }
            TokenKind::LParen => {
                let Some(inner) = cur.group() else {
                    return self.invalid_syntax(&tok.pos);
                };
                if inner.is_empty() {
                    self.reporter.report_at(MessageKey::MissingExpr, &tok.pos);
                    return None;
                }
                let value = self.eval_tokens(inner)?;
                let node = CodeNode::paren(value.node.clone());
                Some(Value { node, ..value })
            }
            TokenKind::LBracket => self.eval_composite(cur),
            TokenKind::Closure => {
                cur.bump();
                self.eval_closure(tok)
            }
            TokenKind::Ident => self.eval_ident(cur),
            _ => self.invalid_syntax(&tok.pos),
        }
    }

    fn eval_ident(&mut self, cur: &mut Cursor<'_>) -> Option<Value> {
        let tok = cur.bump()?;
        match tok.text.as_str() {
            "true" | "false" => {
                return Some(Value::constant(
                    TypeDescriptor::builtin(TypeCode::Bool),
                    Constant::new(ConstValue::Bool(tok.text == "true")),
                ));
            }
            "nil" => return Some(Value::new(TypeDescriptor::nil(), CodeNode::lit("nullptr"))),
            _ => {}
        }
        if let Some(symbol) = self.symbols.lookup(&tok.text) {
            let value = match &symbol.constant {
                Some(constant) => Value::constant(symbol.ty.clone(), constant.clone()),
                None => Value::storage(
                    symbol.ty.clone(),
                    CodeNode::lit(symbol.out_id()),
                    symbol.is_mutable,
                ),
            };
            self.symbols.mark_used(&tok.text);
            return Some(value);
        }
        let defs = self.defs;
        if cur.peek().is_some_and(|t| t.is_op("::")) {
            cur.bump();
            let Some(ns) = defs.namespace(&tok.text) else {
                self.reporter.report(MessageKey::IdNoexist, &tok.pos, [tok.text.as_str()]);
                return None;
            };
            let Some(member) = cur.eat(TokenKind::Ident) else {
                return self.invalid_syntax(&tok.pos);
            };
            return self.eval_definition(cur, &ns.defs, member);
        }
        self.eval_definition(cur, defs, tok)
    }

    fn eval_definition(
        &mut self,
        cur: &mut Cursor<'_>,
        map: &'c DefinitionMap<'a>,
        tok: &Token,
    ) -> Option<Value> {
        let package = self.package.clone();
        let Some(def) = map.find_any(&tok.text, &package) else {
            self.reporter.report(MessageKey::IdNoexist, &tok.pos, [tok.text.as_str()]);
            return None;
        };
        match def {
            AnyDefinition::Global(global) => {
                global.def.mark_used();
                let state = global.state()?;
                let value = match &state.constant {
                    Some(constant) => Value::constant(state.ty.clone(), constant.clone()),
                    None => {
                        let decl = global.def.decl;
                        Value::storage(
                            state.ty.clone(),
                            CodeNode::lit(global.def.out_id()),
                            decl.mutable && !decl.constant,
                        )
                    }
                };
                Some(value)
            }
            AnyDefinition::Function(func) => self.fn_value(func),
            AnyDefinition::Enum(def) => {
                def.mark_used();
                if cur.eat(TokenKind::Dot).is_none() {
                    return self.invalid_syntax(&tok.pos);
                }
                let Some(item) = cur.eat(TokenKind::Ident) else {
                    return self.invalid_syntax(&tok.pos);
                };
                if !def.decl.items.iter().any(|i| i.name == item.text) {
                    self.reporter.report(MessageKey::ObjHaveNotId, &item.pos, [item.text.as_str()]);
                    return None;
                }
                let ty = TypeDescriptor::named(TypeCode::Enum, def.id()).in_package(def.scope.clone());
                let node = CodeNode::lit(format!("{}::{}", def.out_id(), mangle::local_id(&item.text)));
                Some(Value::new(ty, node))
            }
            AnyDefinition::Struct(def) => self.eval_struct_literal(cur, def, tok),
            AnyDefinition::TypeAlias(_) | AnyDefinition::Trait(_) => self.invalid_syntax(&tok.pos),
        }
    }

    fn fn_value(&mut self, def: &FnDef<'a>) -> Option<Value> {
        def.mark_used();
        let sig = self.fn_signature(def, false)?;
        let mut value = Value::new(TypeDescriptor::func(sig), CodeNode::lit(def.call_id()));
        value.extern_link = def.decl.is_extern();
        Some(value)
    }

    fn eval_postfix(&mut self, cur: &mut Cursor<'_>, mut value: Value) -> Option<Value> {
        while let Some(tok) = cur.peek() {
            value = match tok.kind {
                TokenKind::Dot => {
                    cur.bump();
                    let Some(name) = cur.eat(TokenKind::Ident) else {
                        return self.invalid_syntax(&tok.pos);
                    };
                    self.select(value, name)?
                }
                TokenKind::LParen => {
                    let Some(args) = cur.group() else {
                        return self.invalid_syntax(&tok.pos);
                    };
                    self.call(value, args, tok)?
                }
                TokenKind::LBracket => {
                    let Some(inner) = cur.group() else {
                        return self.invalid_syntax(&tok.pos);
                    };
                    if value.ty.fn_signature().is_some_and(|s| s.generics > 0) {
                        self.eval_generic_call(cur, value, inner, tok)?
                    } else {
                        self.index(value, inner, tok)?
                    }
                }
                _ => break,
            };
        }
        Some(value)
    }

    fn select(&mut self, value: Value, name: &Token) -> Option<Value> {
        let (target, through_pointer) = match &value.ty.shape {
            Shape::Pointer(elem) => ((**elem).clone(), true),
            _ => (value.ty.clone(), false),
        };
        let access = if through_pointer || target.code == TypeCode::Trait {
            "->"
        } else {
            "."
        };
        let member = CodeNode::seq(vec![
            value.node,
            CodeNode::lit(access),
            CodeNode::lit(mangle::local_id(&name.text)),
        ]);
        let defs = self.defs;
        let scoped = target
            .named_type()
            .and_then(|named| named.package.clone().map(|scope| (named, scope)));
        if let Some((named, scope)) = scoped {
            let struct_def = match target.code {
                TypeCode::Struct => defs.struct_in_scope(&named.name, &scope),
                _ => None,
            };
            let trait_def = match target.code {
                TypeCode::Trait => defs.trait_in_scope(&named.name, &scope),
                _ => None,
            };
            if let Some(def) = struct_def {
                let info = self.struct_info(def, false)?;
                let inst = Instantiation::new(named.generics.clone());
                if let Some(field) = info.field(&name.text) {
                    let mut out = Value::storage(inst.substitute(&field.ty), member, value.mutable);
                    out.lvalue = value.lvalue || through_pointer;
                    return Some(out);
                }
                if let Some(method) = info.method(&name.text) {
                    let sig = inst.substitute_signature(&method.sig);
                    return Some(Value::new(TypeDescriptor::func(sig), member));
                }
            }
            if let Some(def) = trait_def {
                let info = self.trait_info(def, false)?;
                if let Some(method) = info.method(&name.text) {
                    return Some(Value::new(TypeDescriptor::func(method.sig.clone()), member));
                }
            }
        }
        self.reporter.report(MessageKey::ObjHaveNotId, &name.pos, [name.text.as_str()]);
        None
    }

    fn index(&mut self, value: Value, tokens: &[Token], open: &Token) -> Option<Value> {
        if tokens.is_empty() {
            self.reporter.report_at(MessageKey::MissingExpr, &open.pos);
            return None;
        }
        let index = self.eval_tokens(tokens)?;
        let node = CodeNode::seq(vec![
            value.node.clone(),
            CodeNode::lit("["),
            index.node.clone(),
            CodeNode::lit("]"),
        ]);
        let elem = match &value.ty.shape {
            Shape::Map(key, elem) => {
                if !self.assignable(key, &index, &open.pos) {
                    return None;
                }
                return Some(Value::storage((**elem).clone(), node, value.mutable));
            }
            Shape::Array(elem) => Some((**elem).clone()),
            _ if is_plain(&value.ty, TypeCode::Str) => None,
            _ => return self.not_for_type(open, &value.ty),
        };
        if !is_plain_integer(&index.ty) {
            self.reporter.report(
                MessageKey::IncompatibleTypes,
                &open.pos,
                ["int", index.ty.kind.as_str()],
            );
            return None;
        }
        if let Some(NumericLiteral::Signed(v)) = index.numeric() {
            if v < 0 {
                self.reporter
                    .report(MessageKey::InvalidNumericRange, &open.pos, [v.to_string()]);
                return None;
            }
        }
        match elem {
            Some(elem) => Some(Value::storage(elem, node, value.mutable)),
            None => Some(Value::new(TypeDescriptor::builtin(TypeCode::U8), node)),
        }
    }

    fn call(&mut self, callee: Value, args: &[Token], open: &Token) -> Option<Value> {
        let Some(sig) = callee.ty.fn_signature().cloned() else {
            self.reporter.report_at(MessageKey::NotFunctionCall, &open.pos);
            return None;
        };
        if sig.generics > 0 {
            self.reporter.report(
                MessageKey::GenericArgumentCount,
                &open.pos,
                [sig.generics.to_string(), "0".to_string()],
            );
            return None;
        }
        self.call_with(callee.node, callee.extern_link, &sig, Vec::new(), args, open)
    }

    /// `f[T, U](args)`, or the instantiated function value without a call.
    fn eval_generic_call(
        &mut self,
        cur: &mut Cursor<'_>,
        callee: Value,
        type_tokens: &[Token],
        open: &Token,
    ) -> Option<Value> {
        let sig = callee.ty.fn_signature()?.clone();
        let args = if type_tokens.is_empty() {
            Vec::new()
        } else {
            self.parse_type_list(type_tokens)?
        };
        if args.len() != sig.generics {
            self.reporter.report(
                MessageKey::GenericArgumentCount,
                &open.pos,
                [sig.generics.to_string(), args.len().to_string()],
            );
            return None;
        }
        let generics: Vec<String> = args.iter().map(|t| t.cpp(&self.lattice)).collect();
        let concrete = Instantiation::new(args).substitute_signature(&sig);
        if let Some(paren) = cur.peek().filter(|t| t.kind == TokenKind::LParen) {
            let Some(arg_tokens) = cur.group() else {
                return self.invalid_syntax(&paren.pos);
            };
            return self.call_with(
                callee.node,
                callee.extern_link,
                &concrete,
                generics,
                arg_tokens,
                paren,
            );
        }
        let node = if callee.extern_link {
            callee.node
        } else {
            CodeNode::seq(vec![callee.node, CodeNode::Generics(generics)])
        };
        Some(Value::new(TypeDescriptor::func(concrete), node))
    }

    fn call_with(
        &mut self,
        callee: CodeNode,
        extern_link: bool,
        sig: &FnSignature,
        generics: Vec<String>,
        tokens: &[Token],
        open: &Token,
    ) -> Option<Value> {
        let parts = split_top_level_commas(tokens);
        let fixed = if sig.variadic {
            sig.params.len().saturating_sub(1)
        } else {
            sig.params.len()
        };
        let mut ok = true;
        let mut args = Vec::with_capacity(parts.len());
        let mut rest = Vec::new();
        for (i, &(part, comma)) in parts.iter().enumerate() {
            let Some(first) = part.first() else {
                let pos = comma.map_or(&open.pos, |c| &c.pos);
                self.reporter.report_at(MessageKey::MissingExpr, pos);
                ok = false;
                continue;
            };
            let Some(arg) = self.eval_tokens(part) else {
                ok = false;
                continue;
            };
            let param = if i < fixed {
                sig.params.get(i)
            } else if sig.variadic {
                sig.params.last()
            } else {
                None
            };
            if let Some(param) = param {
                if !self.assignable(param, &arg, &first.pos) {
                    ok = false;
                }
            }
            if sig.variadic && i >= fixed {
                rest.push(arg.node);
            } else {
                args.push(arg.node);
            }
        }
        if parts.len() < fixed {
            self.reporter.report_at(MessageKey::MissingArgument, &open.pos);
            ok = false;
        }
        if !sig.variadic && parts.len() > sig.params.len() {
            self.reporter.report_at(MessageKey::ArgumentOverflow, &open.pos);
            ok = false;
        }
        if !ok {
            return None;
        }
        if let Some(elem) = sig.params.last().filter(|_| sig.variadic) {
            args.push(CodeNode::Array {
                array_type: TypeDescriptor::array(elem.clone()).cpp(&self.lattice),
                elems: rest,
            });
        }
        let node = CodeNode::Call {
            callee: Box::new(callee),
            generics,
            args,
            extern_link,
        };
        Some(Value::new(sig.ret.clone(), node))
    }

    /// `[]T{a, b}` and `[K:V]{k: v}`.
    fn eval_composite(&mut self, cur: &mut Cursor<'_>) -> Option<Value> {
        let open = cur.peek()?;
        let ty = self.parse_type(cur)?;
        let Some(brace) = cur.peek().filter(|t| t.kind == TokenKind::LBrace) else {
            let pos = cur.peek().map_or(&open.pos, |t| &t.pos);
            return self.invalid_syntax(pos);
        };
        let Some(body) = cur.group() else {
            return self.invalid_syntax(&brace.pos);
        };
        let parts = literal_parts(body);
        let mut ok = true;
        match &ty.shape {
            Shape::Array(elem) => {
                let mut elems = Vec::with_capacity(parts.len());
                for (part, comma) in parts {
                    let Some(first) = part.first() else {
                        self.missing_expr(Some(comma.map_or(&brace.pos, |c| &c.pos)));
                        ok = false;
                        continue;
                    };
                    let Some(value) = self.eval_tokens(part) else {
                        ok = false;
                        continue;
                    };
                    if !self.assignable(elem, &value, &first.pos) {
                        ok = false;
                    }
                    elems.push(value.node);
                }
                let array_type = ty.cpp(&self.lattice);
                ok.then(|| Value::new(ty.clone(), CodeNode::Array { array_type, elems }))
            }
            Shape::Map(key_ty, value_ty) => {
                let mut entries = Vec::with_capacity(parts.len());
                for (part, comma) in parts {
                    let Some((key, value)) = split_top_level_colon(part) else {
                        let pos = part.first().map_or(comma.map_or(&brace.pos, |c| &c.pos), |t| &t.pos);
                        self.reporter.report_at(MessageKey::InvalidSyntax, pos);
                        ok = false;
                        continue;
                    };
                    let (Some(key_first), Some(value_first)) = (key.first(), value.first()) else {
                        self.reporter.report_at(MessageKey::MissingExpr, &brace.pos);
                        ok = false;
                        continue;
                    };
                    let (Some(k), Some(v)) = (self.eval_tokens(key), self.eval_tokens(value)) else {
                        ok = false;
                        continue;
                    };
                    if !self.assignable(key_ty, &k, &key_first.pos) {
                        ok = false;
                    }
                    if !self.assignable(value_ty, &v, &value_first.pos) {
                        ok = false;
                    }
                    entries.push((k.node, v.node));
                }
                let map_type = ty.cpp(&self.lattice);
                ok.then(|| Value::new(ty.clone(), CodeNode::Map { map_type, entries }))
            }
            _ => self.invalid_syntax(&open.pos),
        }
    }

    /// `Name{a, b}` or `Name[T]{a, b}`: positional construction.
    fn eval_struct_literal(
        &mut self,
        cur: &mut Cursor<'_>,
        def: &StructDef<'a>,
        tok: &Token,
    ) -> Option<Value> {
        def.def.mark_used();
        let mut args = Vec::new();
        if cur.peek_is(TokenKind::LBracket) {
            let Some(inner) = cur.group() else {
                return self.invalid_syntax(&tok.pos);
            };
            args = self.parse_type_list(inner)?;
        }
        let expected = def.def.decl.generics.len();
        if args.len() != expected {
            self.reporter.report(
                MessageKey::GenericArgumentCount,
                &tok.pos,
                [expected.to_string(), args.len().to_string()],
            );
            return None;
        }
        let Some(brace) = cur.peek().filter(|t| t.kind == TokenKind::LBrace) else {
            return self.invalid_syntax(&tok.pos);
        };
        let Some(body) = cur.group() else {
            return self.invalid_syntax(&brace.pos);
        };
        let info = self.struct_info(def, false)?;
        let inst = Instantiation::new(args.clone());
        let parts = literal_parts(body);
        let mut ok = true;
        let mut nodes = Vec::with_capacity(parts.len());
        for (i, &(part, comma)) in parts.iter().enumerate() {
            let Some(first) = part.first() else {
                self.missing_expr(Some(comma.map_or(&brace.pos, |c| &c.pos)));
                ok = false;
                continue;
            };
            let Some(value) = self.eval_tokens(part) else {
                ok = false;
                continue;
            };
            if let Some(field) = info.fields.get(i) {
                if !self.assignable(&inst.substitute(&field.ty), &value, &first.pos) {
                    ok = false;
                }
            }
            nodes.push(value.node);
        }
        if parts.len() < info.fields.len() {
            self.reporter.report_at(MessageKey::MissingArgument, &brace.pos);
            ok = false;
        }
        if parts.len() > info.fields.len() {
            self.reporter.report_at(MessageKey::ArgumentOverflow, &brace.pos);
            ok = false;
        }
        if !ok {
            return None;
        }
        let generics = args.iter().map(|t| t.cpp(&self.lattice)).collect();
        let ty = TypeDescriptor::named_generic(TypeCode::Struct, def.def.id(), args)
            .in_package(def.def.scope.clone());
        let node = CodeNode::seq(vec![
            CodeNode::lit(def.def.out_id()),
            CodeNode::Generics(generics),
            CodeNode::lit("("),
            CodeNode::Args(nodes),
            CodeNode::lit(")"),
        ]);
        Some(Value::new(ty, node))
    }

    /// Anonymous function referenced by a closure placeholder token.
    fn eval_closure(&mut self, tok: &Token) -> Option<Value> {
        let closures = self.closures;
        let Some(decl) = tok.text.parse::<usize>().ok().and_then(|i| closures.get(i)) else {
            return self.invalid_syntax(&tok.pos);
        };
        if !decl.generics.is_empty() {
            self.reporter.report_at(MessageKey::GenericedFnAsAnonymousFn, &tok.pos);
            return None;
        }
        let sig = self.signature_of(decl, true)?;
        let layout = self.lower_fn(decl, &sig, String::new(), None)?;
        let ty = TypeDescriptor::func(sig);
        let node = CodeNode::AnonFn(AnonFn {
            fn_type: ty.cpp(&self.lattice),
            params: layout.params_cpp(),
            ret: layout.ret,
            body: layout.body,
        });
        Some(Value::new(ty, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folding_integer_arithmetic() {
        let s = NumericLiteral::Signed;
        assert_eq!(fold_numeric("+", s(2), s(3)), Ok(s(5)));
        assert_eq!(fold_numeric("/", s(7), s(2)), Ok(s(3)));
        assert_eq!(fold_numeric("%", s(7), s(0)), Err(FoldError::DivideByZero));
        assert_eq!(fold_numeric("<<", s(1), s(63)), Ok(NumericLiteral::Unsigned(1 << 63)));
        assert_eq!(fold_numeric("<<", s(1), s(64)), Err(FoldError::Overflow));
        assert_eq!(
            fold_numeric("*", NumericLiteral::Unsigned(u64::MAX), s(2)),
            Err(FoldError::Overflow)
        );
    }

    #[test]
    fn folding_mixed_float_arithmetic() {
        assert_eq!(
            fold_numeric("+", NumericLiteral::Float(0.5), NumericLiteral::Signed(1)),
            Ok(NumericLiteral::Float(1.5))
        );
        assert_eq!(
            fold_numeric("/", NumericLiteral::Float(1.0), NumericLiteral::Float(0.0)),
            Err(FoldError::DivideByZero)
        );
    }
}
