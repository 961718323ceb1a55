//! Traits compile to abstract interfaces.

use super::{FnLayout, Indent};

#[derive(Debug, Clone, PartialEq)]
pub struct TraitLayout {
    pub out_id: String,
    /// Method prototypes; bodies are ignored.
    pub methods: Vec<FnLayout>,
}

impl TraitLayout {
    pub fn forward_decl(&self) -> String {
        format!("struct {};", self.out_id)
    }

    pub fn definition(&self) -> String {
        let inner = Indent::ZERO.deeper();
        let mut out = format!("struct {} {{\n", self.out_id);
        inner.write(&mut out);
        out.push_str(&format!("virtual ~{}(void) noexcept {{}}\n", self.out_id));
        for method in &self.methods {
            inner.write(&mut out);
            out.push_str("virtual ");
            out.push_str(&method.ret);
            out.push(' ');
            out.push_str(&method.out_id);
            out.push_str(&method.params_cpp());
            out.push_str(" = 0;\n");
        }
        out.push_str("};");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_virtual_interface() {
        let layout = TraitLayout {
            out_id: "Shape_1".into(),
            methods: vec![FnLayout::new("area_", "f64_t")],
        };
        assert_eq!(layout.forward_decl(), "struct Shape_1;");
        assert_eq!(
            layout.definition(),
            "struct Shape_1 {\n    virtual ~Shape_1(void) noexcept {}\n    virtual f64_t area_(void) = 0;\n};"
        );
    }
}
