//! Diagnostic reporting for semantic analysis and code generation.

mod reporter;

pub use reporter::DiagnosticReporter;

use colored::Colorize;
use std::fmt;

use crate::ast::Position;

/// Broad failure classes; every [`MessageKey`] belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A bound method or generic function used as a plain function value.
    StructuralInvalidity,
    /// A constant does not fit its destination.
    ConstantRangeViolation,
    /// General assignability failure.
    TypeIncompatibility,
    /// Return arity or shape mismatch.
    ShapeMismatch,
    /// An identifier could not be resolved.
    LookupFailure,
    /// Malformed declarations and expressions.
    Declaration,
}

/// Closed vocabulary of diagnostic messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    MethodAsAnonymousFn,
    GenericedFnAsAnonymousFn,
    OverflowLimits,
    InvalidNumericRange,
    IncompatibleTypes,
    MissingMultiReturn,
    OverflowReturn,
    VoidFunctionReturnValue,
    RequireReturnValue,
    MissingExpr,
    IdNoexist,
    ExistId,
    IgnoreId,
    InvalidSyntax,
    InvalidType,
    NotFunctionCall,
    MissingArgument,
    ArgumentOverflow,
    ObjHaveNotId,
    OperatorNotForType,
    LogicalNotBool,
    MissingAutotypeValue,
    NilForAutotype,
    VoidForAutotype,
    MissingConstValue,
    GenericArgumentCount,
    TraitNotImplemented,
    DivideByZero,
    AssignNonLvalue,
    AssignConst,
    ExprNotConst,
}

impl MessageKey {
    /// Stable identifier used in tooling and tests.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::MethodAsAnonymousFn => "method_as_anonymous_fn",
            MessageKey::GenericedFnAsAnonymousFn => "genericed_fn_as_anonymous_fn",
            MessageKey::OverflowLimits => "overflow_limits",
            MessageKey::InvalidNumericRange => "invalid_numeric_range",
            MessageKey::IncompatibleTypes => "incompatible_types",
            MessageKey::MissingMultiReturn => "missing_multi_return",
            MessageKey::OverflowReturn => "overflow_return",
            MessageKey::VoidFunctionReturnValue => "void_function_return_value",
            MessageKey::RequireReturnValue => "require_return_value",
            MessageKey::MissingExpr => "missing_expr",
            MessageKey::IdNoexist => "id_noexist",
            MessageKey::ExistId => "exist_id",
            MessageKey::IgnoreId => "ignore_id",
            MessageKey::InvalidSyntax => "invalid_syntax",
            MessageKey::InvalidType => "invalid_type",
            MessageKey::NotFunctionCall => "not_function_call",
            MessageKey::MissingArgument => "missing_argument",
            MessageKey::ArgumentOverflow => "argument_overflow",
            MessageKey::ObjHaveNotId => "obj_have_not_id",
            MessageKey::OperatorNotForType => "operator_notfor_type",
            MessageKey::LogicalNotBool => "logical_not_bool",
            MessageKey::MissingAutotypeValue => "missing_autotype_value",
            MessageKey::NilForAutotype => "nil_for_autotype",
            MessageKey::VoidForAutotype => "void_for_autotype",
            MessageKey::MissingConstValue => "missing_const_value",
            MessageKey::GenericArgumentCount => "generic_argument_count",
            MessageKey::TraitNotImplemented => "trait_not_implemented",
            MessageKey::DivideByZero => "divide_by_zero",
            MessageKey::AssignNonLvalue => "assign_nonlvalue",
            MessageKey::AssignConst => "assign_const",
            MessageKey::ExprNotConst => "expr_not_const",
        }
    }

    /// Message template; `{}` placeholders are filled positionally.
    pub fn template(self) -> &'static str {
        match self {
            MessageKey::MethodAsAnonymousFn => "methods cannot be used as anonymous functions",
            MessageKey::GenericedFnAsAnonymousFn => {
                "generic functions cannot be used as anonymous functions"
            }
            MessageKey::OverflowLimits => "constant value overflows the limits of the destination type",
            MessageKey::InvalidNumericRange => "numeric literal is out of range: {}",
            MessageKey::IncompatibleTypes => "'{}' and '{}' data-types are not compatible",
            MessageKey::MissingMultiReturn => "missing return values for multi return",
            MessageKey::OverflowReturn => "overflow return expressions",
            MessageKey::VoidFunctionReturnValue => "void functions cannot return any value",
            MessageKey::RequireReturnValue => {
                "return statements of non-void functions should have a return value"
            }
            MessageKey::MissingExpr => "expression missing",
            MessageKey::IdNoexist => "identifier does not exist: {}",
            MessageKey::ExistId => "identifier already exists: {}",
            MessageKey::IgnoreId => "the ignore identifier cannot be used as an identifier",
            MessageKey::InvalidSyntax => "invalid syntax",
            MessageKey::InvalidType => "invalid data-type",
            MessageKey::NotFunctionCall => "value is not a function",
            MessageKey::MissingArgument => "missing argument(s)",
            MessageKey::ArgumentOverflow => "argument overflow",
            MessageKey::ObjHaveNotId => "object has no sub field with this identifier: {}",
            MessageKey::OperatorNotForType => "operator {} is not defined for '{}'",
            MessageKey::LogicalNotBool => "logical expressions accept only boolean values",
            MessageKey::MissingAutotypeValue => "auto-type declarations should have an initializer",
            MessageKey::NilForAutotype => "nil cannot be used with auto-type declarations",
            MessageKey::VoidForAutotype => "void data cannot be used for auto-type declarations",
            MessageKey::MissingConstValue => "constants must have a value",
            MessageKey::GenericArgumentCount => "expected {} generic argument(s), found {}",
            MessageKey::TraitNotImplemented => "'{}' does not implement '{}' of trait '{}'",
            MessageKey::DivideByZero => "divide by zero",
            MessageKey::AssignNonLvalue => "invalid assignment target",
            MessageKey::AssignConst => "constants cannot be assigned",
            MessageKey::ExprNotConst => "expression is not constant",
        }
    }

    /// Suggested fix shown under the diagnostic, for keys that have one.
    pub fn help(self) -> Option<&'static str> {
        match self {
            MessageKey::MethodAsAnonymousFn => Some("wrap the method call in an anonymous function"),
            MessageKey::GenericedFnAsAnonymousFn => {
                Some("wrap an explicit instantiation in an anonymous function")
            }
            MessageKey::OverflowLimits => Some("use a wider destination type"),
            MessageKey::RequireReturnValue => Some("name every result to allow a bare return"),
            MessageKey::NilForAutotype => Some("declare the variable with an explicit type"),
            _ => None,
        }
    }

    pub fn category(self) -> ErrorCategory {
        match self {
            MessageKey::MethodAsAnonymousFn | MessageKey::GenericedFnAsAnonymousFn => {
                ErrorCategory::StructuralInvalidity
            }
            MessageKey::OverflowLimits
            | MessageKey::InvalidNumericRange
            | MessageKey::DivideByZero => {
                ErrorCategory::ConstantRangeViolation
            }
            MessageKey::IncompatibleTypes
            | MessageKey::OperatorNotForType
            | MessageKey::LogicalNotBool
            | MessageKey::TraitNotImplemented => ErrorCategory::TypeIncompatibility,
            MessageKey::MissingMultiReturn
            | MessageKey::OverflowReturn
            | MessageKey::VoidFunctionReturnValue
            | MessageKey::RequireReturnValue
            | MessageKey::MissingArgument
            | MessageKey::ArgumentOverflow
            | MessageKey::GenericArgumentCount => ErrorCategory::ShapeMismatch,
            MessageKey::IdNoexist | MessageKey::ObjHaveNotId => ErrorCategory::LookupFailure,
            MessageKey::MissingExpr
            | MessageKey::ExistId
            | MessageKey::IgnoreId
            | MessageKey::InvalidSyntax
            | MessageKey::InvalidType
            | MessageKey::NotFunctionCall
            | MessageKey::MissingAutotypeValue
            | MessageKey::NilForAutotype
            | MessageKey::VoidForAutotype
            | MessageKey::MissingConstValue
            | MessageKey::AssignNonLvalue
            | MessageKey::AssignConst
            | MessageKey::ExprNotConst => ErrorCategory::Declaration,
        }
    }

    /// Fill the template with `args`; missing arguments leave the placeholder empty.
    pub fn format(self, args: &[String]) -> String {
        let mut out = String::new();
        let mut args = args.iter();
        let mut rest = self.template();
        while let Some(at) = rest.find("{}") {
            out.push_str(&rest[..at]);
            if let Some(arg) = args.next() {
                out.push_str(arg);
            }
            rest = &rest[at + 2..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiler diagnostic: `(position, message-key, format-args...)`
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub key: MessageKey,
    pub args: Vec<String>,
    pub position: Position,
    pub source_line: Option<String>,
    pub help: Option<String>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(key: MessageKey, position: Position) -> Self {
        Self {
            key,
            args: Vec::new(),
            position,
            source_line: None,
            help: None,
            notes: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_source_line(mut self, line: impl Into<String>) -> Self {
        self.source_line = Some(line.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn message(&self) -> String {
        self.key.format(&self.args)
    }

}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header: error[overflow_limits]: message
        writeln!(
            f,
            "{}[{}]: {}",
            "error".red().bold(),
            self.key.as_str().cyan(),
            self.message()
        )?;

        let loc = &self.position;
        let line_num_width = loc.line.to_string().len();
        let padding = " ".repeat(line_num_width);

        writeln!(f, "{}--> {}", padding, loc.to_string().blue())?;

        if let Some(ref source) = self.source_line {
            writeln!(f, "{} {}", padding, "|".blue())?;
            writeln!(f, "{} {} {}", loc.line.to_string().blue().bold(), "|".blue(), source)?;

            let underline_padding = " ".repeat(loc.column.saturating_sub(1));
            writeln!(f, "{} {} {}{}", padding, "|".blue(), underline_padding, "^".red().bold())?;
        }

        if let Some(ref help) = self.help {
            writeln!(f, "   {} {}: {}", "=".blue(), "help".green().bold(), help)?;
        }

        for note in &self.notes {
            writeln!(f, "   {} {}: {}", "=".blue(), "note".cyan().bold(), note)?;
        }

        Ok(())
    }
}
