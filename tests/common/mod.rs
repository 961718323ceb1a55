//! Builders for hand-assembled packages used by the integration tests.

#![allow(dead_code)]

use cppforge::ast::{
    Decl, Expr, FnDecl, File, Package, PackageId, Param, Position, RetType, ReturnStmt, Stmt,
    Token, TokenKind, UseDecl, VarDecl,
};
use cppforge::types::{TypeCode, TypeDescriptor};
use cppforge::{Arch, Config, Diagnostic, Driver, MessageKey};

pub fn pos(package: &str) -> Position {
    Position::new(&format!("{package}.x"), PackageId::new(package), 1, 1)
}

/// Split `src` into tokens, all placed at `pos`.
pub fn lex(src: &str, pos: &Position) -> Vec<Token> {
    const OPS: [&str; 10] = ["::", "==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "->"];
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let kind = if c.is_ascii_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            TokenKind::Ident
        } else if c.is_ascii_digit() {
            let mut float = false;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                float |= chars[i] == '.';
                i += 1;
            }
            if float {
                TokenKind::Float
            } else {
                TokenKind::Int
            }
        } else if c == '"' || c == '\'' || c == '`' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' && c != '`' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            if c != '\'' {
                TokenKind::Str
            } else {
                TokenKind::Char
            }
        } else {
            let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
            if OPS.contains(&two.as_str()) {
                i += 2;
                TokenKind::Op
            } else {
                i += 1;
                match c {
                    ',' => TokenKind::Comma,
                    '.' => TokenKind::Dot,
                    ':' => TokenKind::Colon,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '$' => TokenKind::Closure,
                    _ => TokenKind::Op,
                }
            }
        };
        let text: String = if kind == TokenKind::Closure {
            let digits: String = chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
            i += digits.len();
            digits
        } else {
            chars[start..i].iter().collect()
        };
        tokens.push(Token::new(kind, text, pos.clone()));
    }
    tokens
}

pub fn expr(src: &str, pos: &Position) -> Expr {
    Expr::new(lex(src, pos))
}

pub fn ty(code: TypeCode) -> TypeDescriptor {
    TypeDescriptor::builtin(code)
}

pub fn param(name: &str, ty: TypeDescriptor, pos: &Position) -> Param {
    Param {
        name: name.to_string(),
        ty,
        pos: pos.clone(),
        variadic: false,
        mutable: false,
    }
}

pub fn func(name: &str, pos: &Position, params: Vec<Param>, ret: RetType, body: Vec<Stmt>) -> FnDecl {
    let mut decl = FnDecl::new(name, pos.clone());
    decl.public = true;
    decl.params = params;
    decl.ret = ret;
    decl.body = Some(body);
    decl
}

pub fn var(name: &str, ty: Option<TypeDescriptor>, init: &str, pos: &Position) -> VarDecl {
    VarDecl {
        name: name.to_string(),
        public: true,
        pos: pos.clone(),
        ty,
        init: (!init.is_empty()).then(|| expr(init, pos)),
        constant: false,
        mutable: true,
    }
}

pub fn constant(name: &str, ty: Option<TypeDescriptor>, init: &str, pos: &Position) -> VarDecl {
    VarDecl {
        constant: true,
        mutable: false,
        ..var(name, ty, init, pos)
    }
}

pub fn ret(src: &str, pos: &Position) -> Stmt {
    Stmt::Return(ReturnStmt {
        pos: pos.clone(),
        expr: expr(src, pos),
    })
}

pub fn package(id: &str, uses: &[&str], decls: Vec<Decl>) -> Package {
    let id = PackageId::new(id);
    let at = Position::new(&format!("{id}.x"), id.clone(), 1, 1);
    let mut package = Package::new(id.clone());
    package.files.push(File {
        path: format!("{id}.x"),
        uses: uses
            .iter()
            .map(|u| UseDecl {
                package: PackageId::new(u),
                pos: at.clone(),
            })
            .collect(),
        decls,
    });
    package
}

pub fn driver() -> Driver {
    Driver::new(Config::new(Arch::Amd64))
}

pub fn compile(package: &Package) -> Result<String, Vec<Diagnostic>> {
    driver().compile(package)
}

/// Message keys of a failed compilation, in report order.
pub fn error_keys(result: Result<String, Vec<Diagnostic>>) -> Vec<MessageKey> {
    match result {
        Ok(out) => panic!("expected errors, got output:\n{out}"),
        Err(diagnostics) => diagnostics.iter().map(|d| d.key).collect(),
    }
}

pub fn output(result: Result<String, Vec<Diagnostic>>) -> String {
    match result {
        Ok(out) => out,
        Err(diagnostics) => {
            let keys: Vec<_> = diagnostics.iter().map(|d| d.message()).collect();
            panic!("expected success, got {keys:?}")
        }
    }
}
