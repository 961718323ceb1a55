//! Assembly of the translation unit.

use super::{CodeNode, FnLayout, Indent, StructLayout, TraitLayout};

#[derive(Debug, Clone, PartialEq)]
pub struct EnumLayout {
    pub out_id: String,
    pub cpp_type: String,
    /// `(out id, value)` in declaration order.
    pub items: Vec<(String, String)>,
}

impl EnumLayout {
    pub fn definition(&self) -> String {
        let inner = Indent::ZERO.deeper();
        let mut out = format!("enum {}: {} {{\n", self.out_id, self.cpp_type);
        for (id, value) in &self.items {
            inner.write(&mut out);
            out.push_str(&format!("{id} = {value},\n"));
        }
        out.push_str("};");
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalLayout {
    pub out_id: String,
    pub cpp_type: String,
    pub init: CodeNode,
    pub constant: bool,
}

impl GlobalLayout {
    pub fn definition(&self) -> String {
        let qualifier = if self.constant { "const " } else { "" };
        format!("{}{} {}{{{}}};", qualifier, self.cpp_type, self.out_id, self.init)
    }
}

/// Every emitted definition of a package, grouped by section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationUnit {
    pub enums: Vec<EnumLayout>,
    pub traits: Vec<TraitLayout>,
    pub structs: Vec<StructLayout>,
    pub globals: Vec<GlobalLayout>,
    pub functions: Vec<FnLayout>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every definition of `other`.
    pub fn extend(&mut self, other: TranslationUnit) {
        self.enums.extend(other.enums);
        self.traits.extend(other.traits);
        self.structs.extend(other.structs);
        self.globals.extend(other.globals);
        self.functions.extend(other.functions);
    }

    /// Prelude, forward declarations, type definitions, prototypes,
    /// globals and definitions, in that order.
    pub fn render(&self, prelude: &str) -> String {
        let mut sections = Vec::new();
        if !prelude.is_empty() {
            sections.push(prelude.trim_end().to_string());
        }

        let mut forward: Vec<String> = Vec::new();
        forward.extend(self.enums.iter().map(EnumLayout::definition));
        forward.extend(self.traits.iter().map(TraitLayout::forward_decl));
        forward.extend(self.structs.iter().map(StructLayout::forward_decl));
        push_section(&mut sections, "// forward declarations", forward, "\n");

        let types = self
            .traits
            .iter()
            .map(TraitLayout::definition)
            .chain(self.structs.iter().map(StructLayout::definition))
            .collect();
        push_section(&mut sections, "// type definitions", types, "\n\n");

        let prototypes = self
            .functions
            .iter()
            .map(|f| f.prototype(Indent::ZERO))
            .collect();
        push_section(&mut sections, "// prototypes", prototypes, "\n");

        let globals = self.globals.iter().map(GlobalLayout::definition).collect();
        push_section(&mut sections, "// globals", globals, "\n");

        let mut defs = Vec::new();
        for layout in &self.structs {
            if !layout.methods.is_empty() {
                defs.push(layout.method_definitions());
            }
            defs.push(layout.ostream());
        }
        defs.extend(self.functions.iter().map(|f| f.definition(None, Indent::ZERO)));
        push_section(&mut sections, "// definitions", defs, "\n\n");

        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }
}

fn push_section(sections: &mut Vec<String>, title: &str, items: Vec<String>, sep: &str) {
    if items.is_empty() {
        return;
    }
    sections.push(format!("{}\n{}", title, items.join(sep)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_and_global_definitions() {
        let colors = EnumLayout {
            out_id: "Color_1".into(),
            cpp_type: "u8_t".into(),
            items: vec![("Red_".into(), "0".into()), ("Green_".into(), "1".into())],
        };
        assert_eq!(
            colors.definition(),
            "enum Color_1: u8_t {\n    Red_ = 0,\n    Green_ = 1,\n};"
        );
        let global = GlobalLayout {
            out_id: "limit_1".into(),
            cpp_type: "i32_t".into(),
            init: CodeNode::lit("10"),
            constant: true,
        };
        assert_eq!(global.definition(), "const i32_t limit_1{10};");
    }

    #[test]
    fn sections_appear_in_order() {
        let mut unit = TranslationUnit::new();
        unit.globals.push(GlobalLayout {
            out_id: "g_1".into(),
            cpp_type: "i32_t".into(),
            init: CodeNode::lit("1"),
            constant: false,
        });
        unit.functions.push(FnLayout::new("f_1", "void"));
        let out = unit.render("// prelude\n");
        let prelude = out.find("// prelude").unwrap();
        let protos = out.find("// prototypes").unwrap();
        let globals = out.find("// globals").unwrap();
        let defs = out.find("// definitions").unwrap();
        assert!(prelude < protos && protos < globals && globals < defs);
        assert!(!out.contains("// type definitions"));
    }
}
