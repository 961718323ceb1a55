//! Output identifiers for generated code.

use crate::ast::PackageId;

/// Name of the generated entry function the prelude calls.
pub const ENTRY_POINT: &str = "entry_main";

/// Receiver expression inside method bodies.
pub const SELF: &str = "(*this)";

/// Identifier of a package-level definition.
///
/// The scope hash keeps equally named definitions of different packages
/// (or namespaces) apart.
pub fn out_id(name: &str, scope: &PackageId) -> String {
    format!("{}_{:08x}", name, fnv1a32(scope.as_str().as_bytes()))
}

/// Identifier of a local, parameter, field or method.
pub fn local_id(name: &str) -> String {
    format!("{name}_")
}

/// Positional generic parameter name.
pub fn generic_param(index: usize) -> String {
    format!("T{index}")
}

/// Fresh slot replacing an ignored named result.
pub fn ret_slot(index: usize) -> String {
    format!("__ret{index}")
}

fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_ids_are_stable_and_distinct() {
        let app = PackageId::new("app");
        let lib = PackageId::new("lib");
        assert_eq!(out_id("Point", &app), out_id("Point", &app));
        assert_ne!(out_id("Point", &app), out_id("Point", &lib));
        assert!(out_id("Point", &app).starts_with("Point_"));
    }

    #[test]
    fn fnv_reference_values() {
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
    }

    #[test]
    fn local_names() {
        assert_eq!(local_id("x"), "x_");
        assert_eq!(generic_param(2), "T2");
        assert_eq!(ret_slot(1), "__ret1");
    }
}
