//! Return statement checking.

use super::checker::{Checker, FnReturn};
use super::value::Value;
use crate::ast::{is_ignore, split_top_level_commas, Position, ReturnStmt};
use crate::codegen::{mangle, CodeNode, ReturnAssembly, ReturnSlot};
use crate::diagnostics::MessageKey;
use crate::types::TypeDescriptor;

impl<'c, 'a> Checker<'c, 'a> {
    /// Check `stmt` against the enclosing function's result and lower it.
    ///
    /// Shape errors are reported but still produce a return node built from
    /// the values that could be evaluated.
    pub(super) fn check_return(&mut self, stmt: &'a ReturnStmt) -> CodeNode {
        let outer = std::mem::replace(&mut self.closures, stmt.expr.closures.as_slice());
        let node = CodeNode::Return(self.lower_return(stmt));
        self.closures = outer;
        stmt.expr.attach_model(node.clone());
        node
    }

    fn lower_return(&mut self, stmt: &'a ReturnStmt) -> ReturnAssembly {
        let Some(ret) = self.current_ret.clone() else {
            return ReturnAssembly::default();
        };
        if stmt.expr.is_empty() {
            if ret.ty.is_void() {
                return ReturnAssembly::default();
            }
            return self.bare_return(&ret, &stmt.pos);
        }

        // One entry per comma separated part; `None` where evaluation failed.
        let mut values: Vec<Option<(Value, &Position)>> = Vec::new();
        for (part, comma) in split_top_level_commas(&stmt.expr.tokens) {
            let Some(first) = part.first() else {
                let pos = comma.map_or(&stmt.pos, |c| &c.pos);
                self.reporter.report_at(MessageKey::MissingExpr, pos);
                values.push(None);
                continue;
            };
            values.push(self.eval_tokens(part).map(|value| (value, &first.pos)));
        }
        if ret.ty.is_void() {
            self.reporter.report_at(MessageKey::VoidFunctionReturnValue, &stmt.pos);
            return ReturnAssembly::new(return_nodes(values));
        }

        match ret.ty.tuple_components() {
            None => {
                if values.len() > 1 {
                    self.reporter.report_at(MessageKey::OverflowReturn, &stmt.pos);
                    values.truncate(1);
                }
                if let Some(Some((value, pos))) = values.first() {
                    self.assignable(&ret.ty, value, pos);
                }
            }
            Some(components) if values.len() == 1 => {
                if let Some((value, pos)) = &values[0] {
                    self.check_tuple_as_tuple(components, value, pos);
                }
            }
            Some(components) => {
                if values.len() > components.len() {
                    self.reporter.report_at(MessageKey::OverflowReturn, &stmt.pos);
                }
                for (slot, dst) in values.iter().zip(components) {
                    if let Some((value, pos)) = slot {
                        self.assignable(dst, value, pos);
                    }
                }
            }
        }

        ReturnAssembly::with_slots(self.ret_slots(&ret), return_nodes(values))
    }

    /// One tuple-typed value returned as a whole.
    fn check_tuple_as_tuple(&mut self, components: &[TypeDescriptor], value: &Value, pos: &Position) {
        let Some(given) = value.ty.tuple_components() else {
            self.reporter.report_at(MessageKey::MissingMultiReturn, pos);
            return;
        };
        if given.len() < components.len() {
            self.reporter.report_at(MessageKey::MissingMultiReturn, pos);
            return;
        }
        if given.len() > components.len() {
            self.reporter.report_at(MessageKey::OverflowReturn, pos);
            return;
        }
        for (src, dst) in given.iter().zip(components) {
            let component = Value::new(src.clone(), CodeNode::default());
            self.assignable(dst, &component, pos);
        }
    }

    /// `return` without values in a function with a result.
    fn bare_return(&mut self, ret: &FnReturn, pos: &Position) -> ReturnAssembly {
        if !ret.all_named {
            self.reporter.report_at(MessageKey::RequireReturnValue, pos);
            return ReturnAssembly::default();
        }
        let values = ret
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if is_ignore(name) {
                    CodeNode::lit(ret.component(i).default_literal(&self.lattice))
                } else {
                    CodeNode::lit(mangle::local_id(name))
                }
            })
            .collect();
        ReturnAssembly::new(values)
    }

    fn ret_slots(&self, ret: &FnReturn) -> Vec<ReturnSlot> {
        ret.names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let ignored = is_ignore(name);
                ReturnSlot {
                    out_id: if ignored {
                        mangle::ret_slot(i)
                    } else {
                        mangle::local_id(name)
                    },
                    cpp_type: ret.component(i).cpp(&self.lattice),
                    ignored,
                }
            })
            .collect()
    }
}

fn return_nodes(values: Vec<Option<(Value, &Position)>>) -> Vec<CodeNode> {
    values
        .into_iter()
        .map(|v| v.map_or_else(CodeNode::default, |(value, _)| value.node))
        .collect()
}
