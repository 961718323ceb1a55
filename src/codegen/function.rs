//! Function prototypes and definitions.

use super::{CodeNode, Indent};

#[derive(Debug, Clone, PartialEq)]
pub struct ParamLayout {
    pub out_id: String,
    pub cpp_type: String,
}

/// A checked function ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct FnLayout {
    pub out_id: String,
    /// Number of template parameters (`T0`, `T1`, ...).
    pub generics: usize,
    pub ret: String,
    pub params: Vec<ParamLayout>,
    /// One node per statement; empty for prototypes only.
    pub body: Vec<CodeNode>,
    pub inline: bool,
}

/// Class a method is defined in, for out-of-line definitions.
#[derive(Debug, Clone, Copy)]
pub struct Owner<'s> {
    pub out_id: &'s str,
    pub generics: usize,
}

/// `template<typename T0, typename T1>`; empty when there are no parameters.
pub fn template_header(count: usize) -> String {
    if count == 0 {
        return String::new();
    }
    let params: Vec<_> = (0..count)
        .map(|i| format!("typename {}", super::mangle::generic_param(i)))
        .collect();
    format!("template<{}>", params.join(", "))
}

/// `<T0,T1>`; empty when there are no parameters.
pub fn template_args(count: usize) -> String {
    if count == 0 {
        return String::new();
    }
    let params: Vec<_> = (0..count).map(super::mangle::generic_param).collect();
    format!("<{}>", params.join(","))
}

impl FnLayout {
    pub fn new(out_id: impl Into<String>, ret: impl Into<String>) -> Self {
        Self {
            out_id: out_id.into(),
            generics: 0,
            ret: ret.into(),
            params: Vec::new(),
            body: Vec::new(),
            inline: false,
        }
    }

    /// Parenthesised parameter list.
    pub fn params_cpp(&self) -> String {
        if self.params.is_empty() {
            return "(void)".to_string();
        }
        let params: Vec<_> = self
            .params
            .iter()
            .map(|p| format!("{} {}", p.cpp_type, p.out_id))
            .collect();
        format!("({})", params.join(", "))
    }

    /// `std::function<R(A,B)>`
    pub fn fn_type(&self) -> String {
        let params: Vec<_> = self.params.iter().map(|p| p.cpp_type.as_str()).collect();
        format!("std::function<{}({})>", self.ret, params.join(","))
    }

    fn head(&self, name: &str) -> String {
        let mut out = String::new();
        if self.inline {
            out.push_str("inline ");
        }
        out.push_str(&self.ret);
        out.push(' ');
        out.push_str(name);
        out.push_str(&self.params_cpp());
        out
    }

    /// Declaration line, prefixed by its template header when generic.
    pub fn prototype(&self, indent: Indent) -> String {
        let mut out = String::new();
        let template = template_header(self.generics);
        if !template.is_empty() {
            indent.write(&mut out);
            out.push_str(&template);
            out.push('\n');
        }
        indent.write(&mut out);
        out.push_str(&self.head(&self.out_id));
        out.push(';');
        out
    }

    /// Full definition; methods are qualified with their owner.
    pub fn definition(&self, owner: Option<Owner<'_>>, indent: Indent) -> String {
        let mut out = String::new();
        let mut templates = Vec::new();
        let name = match owner {
            Some(owner) => {
                if owner.generics > 0 {
                    templates.push(template_header(owner.generics));
                }
                format!(
                    "{}{}::{}",
                    owner.out_id,
                    template_args(owner.generics),
                    self.out_id
                )
            }
            None => self.out_id.clone(),
        };
        if self.generics > 0 {
            templates.push(template_header(self.generics));
        }
        for template in templates {
            indent.write(&mut out);
            out.push_str(&template);
            out.push('\n');
        }
        indent.write(&mut out);
        out.push_str(&self.head(&name));
        out.push_str(" {\n");
        let inner = indent.deeper();
        for stmt in &self.body {
            inner.write(&mut out);
            stmt.render(&mut out, inner);
            out.push('\n');
        }
        indent.write(&mut out);
        out.push('}');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ReturnAssembly;

    fn add() -> FnLayout {
        let mut f = FnLayout::new("add_1234", "i32_t");
        f.params = vec![
            ParamLayout {
                out_id: "a_".into(),
                cpp_type: "i32_t".into(),
            },
            ParamLayout {
                out_id: "b_".into(),
                cpp_type: "i32_t".into(),
            },
        ];
        f.body = vec![CodeNode::stmt(CodeNode::Return(ReturnAssembly::new(vec![
            CodeNode::lit("(a_ + b_)"),
        ])))];
        f
    }

    #[test]
    fn prototypes() {
        let f = add();
        assert_eq!(f.prototype(Indent::ZERO), "i32_t add_1234(i32_t a_, i32_t b_);");
        let mut g = FnLayout::new("id_1", "T0");
        g.generics = 1;
        assert_eq!(g.prototype(Indent::ZERO), "template<typename T0>\nT0 id_1(void);");
        assert_eq!(f.fn_type(), "std::function<i32_t(i32_t,i32_t)>");
    }

    #[test]
    fn definitions() {
        assert_eq!(
            add().definition(None, Indent::ZERO),
            "i32_t add_1234(i32_t a_, i32_t b_) {\n    return (a_ + b_);\n}"
        );
        let method = FnLayout::new("len_", "int");
        let owner = Owner {
            out_id: "Box_1",
            generics: 2,
        };
        assert_eq!(
            method.definition(Some(owner), Indent::ZERO),
            "template<typename T0, typename T1>\nint Box_1<T0,T1>::len_(void) {\n}"
        );
    }
}
