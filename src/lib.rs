//! cppforge - semantic analysis and C++ lowering for a Go-like language
//!
//! Parsed packages are checked declaration by declaration: every identifier
//! is resolved, every expression typed and constant-folded, and the checked
//! tree is lowered into a single C++ translation unit.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod semantic;
pub mod types;

// Re-export commonly used types
pub use config::{Arch, Config, ConfigError};
pub use diagnostics::{Diagnostic, DiagnosticReporter, MessageKey};
pub use driver::Driver;
