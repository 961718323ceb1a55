//! Explicit indentation depth for rendering.

use std::fmt;

/// Spaces per indentation level
pub const INDENT_WIDTH: usize = 4;

/// Nesting depth passed down through every render call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Indent(usize);

impl Indent {
    pub const ZERO: Indent = Indent(0);

    pub fn new(depth: usize) -> Self {
        Self(depth)
    }

    pub fn depth(self) -> usize {
        self.0
    }

    /// One level further in.
    pub fn deeper(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn write(self, out: &mut String) {
        for _ in 0..self.0 * INDENT_WIDTH {
            out.push(' ');
        }
    }
}

impl fmt::Display for Indent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:width$}", "", width = self.0 * INDENT_WIDTH)
    }
}
