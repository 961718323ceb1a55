//! Text-emitting expression trees.
//!
//! A node is built once, after all checks for it have run, and rendering
//! is a pure function of the node. Children render in construction order,
//! which is source evaluation order.

use std::fmt;

use super::Indent;

#[derive(Debug, Clone, PartialEq)]
pub enum CodeNode {
    /// Literal or identifier text.
    Literal(String),
    AnonFn(AnonFn),
    /// `T({a,b})`
    Array {
        array_type: String,
        elems: Vec<CodeNode>,
    },
    /// `T{{k,v},}`
    Map {
        map_type: String,
        entries: Vec<(CodeNode, CodeNode)>,
    },
    /// `<T,U>`; empty list renders nothing.
    Generics(Vec<String>),
    /// Comma separated call arguments.
    Args(Vec<CodeNode>),
    Call {
        callee: Box<CodeNode>,
        generics: Vec<String>,
        args: Vec<CodeNode>,
        /// Linked from the C++ side: no instantiation syntax.
        extern_link: bool,
    },
    Return(ReturnAssembly),
    /// Checked fragments mixed with punctuation.
    Sequence(Vec<CodeNode>),
}

impl CodeNode {
    pub fn lit(text: impl Into<String>) -> Self {
        CodeNode::Literal(text.into())
    }

    pub fn seq(nodes: Vec<CodeNode>) -> Self {
        CodeNode::Sequence(nodes)
    }

    /// Wrap into `(node)`.
    pub fn paren(node: CodeNode) -> Self {
        CodeNode::Sequence(vec![CodeNode::lit("("), node, CodeNode::lit(")")])
    }

    /// Terminate as a statement.
    pub fn stmt(node: CodeNode) -> Self {
        CodeNode::Sequence(vec![node, CodeNode::lit(";")])
    }

    pub fn render(&self, out: &mut String, indent: Indent) {
        match self {
            CodeNode::Literal(text) => out.push_str(text),
            CodeNode::AnonFn(f) => f.render(out, indent),
            CodeNode::Array { array_type, elems } => {
                out.push_str(array_type);
                out.push_str("({");
                render_list(elems, out, indent);
                out.push_str("})");
            }
            CodeNode::Map { map_type, entries } => {
                out.push_str(map_type);
                out.push('{');
                for (key, value) in entries {
                    out.push('{');
                    key.render(out, indent);
                    out.push(',');
                    value.render(out, indent);
                    out.push_str("},");
                }
                out.push('}');
            }
            CodeNode::Generics(types) => render_generics(types, out),
            CodeNode::Args(args) => render_list(args, out, indent),
            CodeNode::Call {
                callee,
                generics,
                args,
                extern_link,
            } => {
                callee.render(out, indent);
                if !extern_link {
                    render_generics(generics, out);
                }
                out.push('(');
                render_list(args, out, indent);
                out.push(')');
            }
            CodeNode::Return(ret) => ret.render(out, indent),
            CodeNode::Sequence(nodes) => {
                for node in nodes {
                    node.render(out, indent);
                }
            }
        }
    }
}

impl Default for CodeNode {
    fn default() -> Self {
        CodeNode::Literal(String::new())
    }
}

impl fmt::Display for CodeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, Indent::ZERO);
        f.write_str(&out)
    }
}

fn render_list(nodes: &[CodeNode], out: &mut String, indent: Indent) {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        node.render(out, indent);
    }
}

fn render_generics(types: &[String], out: &mut String) {
    if types.is_empty() {
        return;
    }
    out.push('<');
    out.push_str(&types.join(","));
    out.push('>');
}

/// Value-capturing closure with explicit parameter and result types.
#[derive(Debug, Clone, PartialEq)]
pub struct AnonFn {
    /// `std::function<...>` type of the closure.
    pub fn_type: String,
    /// Rendered parameter list including parentheses.
    pub params: String,
    pub ret: String,
    /// One node per statement.
    pub body: Vec<CodeNode>,
}

impl AnonFn {
    fn render(&self, out: &mut String, indent: Indent) {
        out.push_str(&self.fn_type);
        out.push_str("([=]");
        out.push_str(&self.params);
        out.push_str(" mutable -> ");
        out.push_str(&self.ret);
        out.push_str(" {\n");
        let inner = indent.deeper();
        for stmt in &self.body {
            inner.write(out);
            stmt.render(out, inner);
            out.push('\n');
        }
        indent.write(out);
        out.push_str("})");
    }
}

/// Destination of one result position of a function with named results.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSlot {
    pub out_id: String,
    pub cpp_type: String,
    /// Named `_` in source; `out_id` is then a fresh slot.
    pub ignored: bool,
}

/// Lowered return statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnAssembly {
    pub slots: Vec<ReturnSlot>,
    pub values: Vec<CodeNode>,
}

impl ReturnAssembly {
    pub fn new(values: Vec<CodeNode>) -> Self {
        Self {
            slots: Vec::new(),
            values,
        }
    }

    pub fn with_slots(slots: Vec<ReturnSlot>, values: Vec<CodeNode>) -> Self {
        Self { slots, values }
    }

    /// One tuple-typed expression feeding several named results.
    fn spreads_single_value(&self) -> bool {
        self.slots.len() > 1 && self.values.len() == 1
    }

    fn render(&self, out: &mut String, indent: Indent) {
        if self.spreads_single_value() {
            for slot in self.slots.iter().filter(|s| s.ignored) {
                out.push_str(&format!("{} {}; ", slot.cpp_type, slot.out_id));
            }
            let ids: Vec<_> = self.slots.iter().map(|s| s.out_id.as_str()).collect();
            out.push_str("std::tie(");
            out.push_str(&ids.join(","));
            out.push_str(") = ");
            self.values[0].render(out, indent);
            out.push_str("; return std::make_tuple(");
            out.push_str(&ids.join(","));
            out.push(')');
            return;
        }
        if self.slots.is_empty() {
            out.push_str("return");
            match self.values.len() {
                0 => {}
                1 => {
                    out.push(' ');
                    self.values[0].render(out, indent);
                }
                _ => {
                    out.push_str(" std::make_tuple(");
                    render_list(&self.values, out, indent);
                    out.push(')');
                }
            }
            return;
        }
        let mut ids = Vec::new();
        for (slot, value) in self.slots.iter().zip(&self.values) {
            if slot.ignored {
                out.push_str(&slot.cpp_type);
                out.push(' ');
            }
            out.push_str(&slot.out_id);
            out.push_str(" = ");
            value.render(out, indent);
            out.push_str("; ");
            ids.push(slot.out_id.as_str());
        }
        out.push_str("return ");
        if self.slots.len() > 1 {
            out.push_str("std::make_tuple(");
            out.push_str(&ids.join(","));
            out.push(')');
        } else {
            out.push_str(&ids.join(","));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> CodeNode {
        CodeNode::lit(s)
    }

    #[test]
    fn array_and_map_literals() {
        let array = CodeNode::Array {
            array_type: "slice_t<i32_t>".into(),
            elems: vec![lit("1"), lit("2")],
        };
        assert_eq!(array.to_string(), "slice_t<i32_t>({1,2})");
        let empty = CodeNode::Array {
            array_type: "slice_t<i32_t>".into(),
            elems: Vec::new(),
        };
        assert_eq!(empty.to_string(), "slice_t<i32_t>({})");
        let map = CodeNode::Map {
            map_type: "map_t<str_t,i32_t>".into(),
            entries: vec![(lit("a"), lit("1")), (lit("b"), lit("2"))],
        };
        assert_eq!(map.to_string(), "map_t<str_t,i32_t>{{a,1},{b,2},}");
    }

    #[test]
    fn extern_calls_skip_generics() {
        let call = |extern_link| CodeNode::Call {
            callee: Box::new(lit("sum")),
            generics: vec!["i32_t".into()],
            args: vec![lit("1"), lit("2")],
            extern_link,
        };
        assert_eq!(call(false).to_string(), "sum<i32_t>(1,2)");
        assert_eq!(call(true).to_string(), "sum(1,2)");
        assert_eq!(CodeNode::Generics(Vec::new()).to_string(), "");
    }

    #[test]
    fn plain_returns() {
        assert_eq!(CodeNode::Return(ReturnAssembly::new(Vec::new())).to_string(), "return");
        assert_eq!(
            CodeNode::Return(ReturnAssembly::new(vec![lit("1")])).to_string(),
            "return 1"
        );
        assert_eq!(
            CodeNode::Return(ReturnAssembly::new(vec![lit("1"), lit("2")])).to_string(),
            "return std::make_tuple(1,2)"
        );
    }

    #[test]
    fn named_returns_assign_in_order() {
        let slots = vec![
            ReturnSlot {
                out_id: "a_".into(),
                cpp_type: "i32_t".into(),
                ignored: false,
            },
            ReturnSlot {
                out_id: "__ret1".into(),
                cpp_type: "bool".into(),
                ignored: true,
            },
        ];
        let ret = ReturnAssembly::with_slots(slots.clone(), vec![lit("f()"), lit("g()")]);
        assert_eq!(
            CodeNode::Return(ret).to_string(),
            "a_ = f(); bool __ret1 = g(); return std::make_tuple(a_,__ret1)"
        );
        let spread = ReturnAssembly::with_slots(slots, vec![lit("pair()")]);
        assert_eq!(
            CodeNode::Return(spread).to_string(),
            "bool __ret1; std::tie(a_,__ret1) = pair(); return std::make_tuple(a_,__ret1)"
        );
    }

    #[test]
    fn anonymous_functions_indent_their_body() {
        let f = CodeNode::AnonFn(AnonFn {
            fn_type: "std::function<i32_t(void)>".into(),
            params: "(void)".into(),
            ret: "i32_t".into(),
            body: vec![CodeNode::stmt(CodeNode::Return(ReturnAssembly::new(vec![lit("1")])))],
        });
        let mut out = String::new();
        f.render(&mut out, Indent::new(1));
        assert_eq!(
            out,
            "std::function<i32_t(void)>([=](void) mutable -> i32_t {\n        return 1;\n    })"
        );
    }

    #[test]
    fn rendering_is_repeatable() {
        let node = CodeNode::seq(vec![
            lit("x_"),
            lit(" = "),
            CodeNode::Call {
                callee: Box::new(lit("f")),
                generics: Vec::new(),
                args: vec![lit("1")],
                extern_link: false,
            },
        ]);
        let first = node.to_string();
        assert_eq!(first, node.to_string());
        assert_eq!(first, "x_ = f(1)");
    }
}
