//! Struct emission: class definition, constructors, equality and stream output.

use super::function::{template_args, template_header, Owner};
use super::{FnLayout, Indent};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    /// Source name, used by the stream operator.
    pub name: String,
    pub out_id: String,
    pub cpp_type: String,
    /// Pointer-typed fields take their constructor argument through `__must_heap`.
    pub boxed: bool,
}

/// A checked struct ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub name: String,
    pub out_id: String,
    pub generics: usize,
    /// Implemented trait identifiers, in declaration order.
    pub traits: Vec<String>,
    pub fields: Vec<FieldLayout>,
    pub methods: Vec<FnLayout>,
}

impl StructLayout {
    /// Out id with its template argument list, e.g. `Box_1<T0>`.
    fn self_type(&self) -> String {
        format!("{}{}", self.out_id, template_args(self.generics))
    }

    fn write_template(&self, out: &mut String, indent: Indent) {
        if self.generics > 0 {
            indent.write(out);
            out.push_str(&template_header(self.generics));
            out.push('\n');
        }
    }

    pub fn forward_decl(&self) -> String {
        let mut out = String::new();
        self.write_template(&mut out, Indent::ZERO);
        out.push_str("struct ");
        out.push_str(&self.out_id);
        out.push(';');
        out
    }

    fn bases(&self) -> String {
        if self.traits.is_empty() {
            return String::new();
        }
        let bases: Vec<_> = self.traits.iter().map(|t| format!("public {t}")).collect();
        format!(": {}", bases.join(", "))
    }

    /// Class definition with fields, constructors, method prototypes and operators.
    pub fn definition(&self) -> String {
        let inner = Indent::ZERO.deeper();
        let mut out = String::new();
        self.write_template(&mut out, Indent::ZERO);
        out.push_str("struct ");
        out.push_str(&self.out_id);
        out.push_str(&self.bases());
        out.push_str(" {\n");
        if !self.fields.is_empty() {
            for field in &self.fields {
                inner.write(&mut out);
                out.push_str(&format!("{} {}{{}};\n", field.cpp_type, field.out_id));
            }
            out.push('\n');
            out.push_str(&self.constructor(inner));
            out.push_str("\n\n");
        }
        inner.write(&mut out);
        out.push_str(&self.out_id);
        out.push_str("(void) noexcept {}\n\n");
        for method in &self.methods {
            out.push_str(&method.prototype(inner));
            out.push_str("\n\n");
        }
        out.push_str(&self.operators(inner));
        out.push_str("\n};");
        out
    }

    /// Positional constructor assigning every field.
    pub fn constructor(&self, indent: Indent) -> String {
        let mut out = String::new();
        indent.write(&mut out);
        out.push_str(&self.out_id);
        let params: Vec<_> = self
            .fields
            .iter()
            .map(|f| format!("{} {}", f.cpp_type, f.out_id))
            .collect();
        out.push_str(&format!("({}) noexcept {{", params.join(", ")));
        if !self.fields.is_empty() {
            let inner = indent.deeper();
            for field in &self.fields {
                out.push('\n');
                inner.write(&mut out);
                let value = if field.boxed {
                    format!("__must_heap({})", field.out_id)
                } else {
                    field.out_id.clone()
                };
                out.push_str(&format!("this->{} = {};", field.out_id, value));
            }
            out.push('\n');
            indent.write(&mut out);
        }
        out.push('}');
        out
    }

    /// `operator==` over every field in order and `operator!=` as its negation.
    pub fn operators(&self, indent: Indent) -> String {
        let self_type = self.self_type();
        let mut out = String::new();
        indent.write(&mut out);
        out.push_str(&format!("inline bool operator==(const {self_type} &_Src) const {{"));
        if self.fields.is_empty() {
            out.push_str(" return true; }");
        } else {
            let inner = indent.deeper();
            out.push('\n');
            inner.write(&mut out);
            out.push_str("return ");
            for (i, field) in self.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(" &&\n");
                    inner.deeper().write(&mut out);
                }
                out.push_str(&format!("this->{0} == _Src.{0}", field.out_id));
            }
            out.push_str(";\n");
            indent.write(&mut out);
            out.push('}');
        }
        out.push_str("\n\n");
        indent.write(&mut out);
        out.push_str(&format!(
            "inline bool operator!=(const {self_type} &_Src) const {{ return !this->operator==(_Src); }}"
        ));
        out
    }

    /// Stream operator rendering `Name{field:value, ...}`.
    pub fn ostream(&self) -> String {
        let inner = Indent::ZERO.deeper();
        let mut out = String::new();
        self.write_template(&mut out, Indent::ZERO);
        out.push_str(&format!(
            "std::ostream &operator<<(std::ostream &_Stream, const {} &_Src) {{\n",
            self.self_type()
        ));
        inner.write(&mut out);
        out.push_str(&format!("_Stream << \"{}{{\";\n", self.name));
        for (i, field) in self.fields.iter().enumerate() {
            inner.write(&mut out);
            out.push_str(&format!("_Stream << \"{}:\" << _Src.{}", field.name, field.out_id));
            if i + 1 < self.fields.len() {
                out.push_str(" << \", \"");
            }
            out.push_str(";\n");
        }
        inner.write(&mut out);
        out.push_str("_Stream << \"}\";\n");
        inner.write(&mut out);
        out.push_str("return _Stream;\n}");
        out
    }

    /// Out-of-line method definitions.
    pub fn method_definitions(&self) -> String {
        let owner = Owner {
            out_id: &self.out_id,
            generics: self.generics,
        };
        let defs: Vec<_> = self
            .methods
            .iter()
            .map(|m| m.definition(Some(owner), Indent::ZERO))
            .collect();
        defs.join("\n\n")
    }
}
