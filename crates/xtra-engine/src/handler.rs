//! Sandboxed handler-script execution.
//!
//! `x-on:*` and `x-run` bodies compile to the small statement language in
//! `xtra-path` and run against an explicit, enumerated context: the store,
//! the bound element (`el.<prop>`), and the event payload
//! (`event.<field>`). Nothing else is reachable.

use crate::engine::Engine;
use xtra_dom::NodeId;
use xtra_types::script::{BinOp, Script, ScriptExpr, ScriptStmt, UnOp};
use xtra_types::Value;

impl Engine {
    /// Execute a compiled script. Assignments propagate synchronously
    /// through the store before the next statement runs.
    pub(crate) fn run_script(&mut self, script: &Script, el: NodeId, event: &Value) {
        for stmt in &script.stmts {
            match stmt {
                ScriptStmt::Assign { target, value } => {
                    let value = self.eval_expr(value, el, event);
                    self.set_path(target, value);
                }
                ScriptStmt::Delete(path) => {
                    self.delete_path(path);
                }
            }
        }
    }

    fn eval_expr(&mut self, expr: &ScriptExpr, el: NodeId, event: &Value) -> Value {
        match expr {
            ScriptExpr::Lit(value) => value.clone(),
            ScriptExpr::Store(path) => self.core.resolve(path),
            ScriptExpr::El(prop) => self.el_value(el, prop),
            ScriptExpr::Event(field) => event
                .child(&xtra_types::Seg::Key(field.clone()))
                .cloned()
                .unwrap_or(Value::Null),
            ScriptExpr::Unary { op, expr } => {
                let value = self.eval_expr(expr, el, event);
                match op {
                    UnOp::Not => Value::Bool(!value.is_truthy()),
                    UnOp::Neg => Value::Num(-to_num(&value)),
                }
            }
            ScriptExpr::Binary { left, op, right } => {
                // `or`/`and` are value-returning and short-circuit.
                match op {
                    BinOp::Or => {
                        let l = self.eval_expr(left, el, event);
                        if l.is_truthy() {
                            return l;
                        }
                        return self.eval_expr(right, el, event);
                    }
                    BinOp::And => {
                        let l = self.eval_expr(left, el, event);
                        if !l.is_truthy() {
                            return l;
                        }
                        return self.eval_expr(right, el, event);
                    }
                    _ => {}
                }
                let l = self.eval_expr(left, el, event);
                let r = self.eval_expr(right, el, event);
                apply_binop(*op, &l, &r)
            }
        }
    }

    /// `el.<prop>`: the element's live value/checked state, or any
    /// attribute by name.
    fn el_value(&self, el: NodeId, prop: &str) -> Value {
        match prop {
            "value" => Value::Str(self.doc.field_value(el)),
            "checked" => {
                let checked = match self.doc.prop(el, "checked") {
                    Some(v) => v.is_truthy(),
                    None => self.doc.has_attr(el, "checked"),
                };
                Value::Bool(checked)
            }
            other => match self.doc.prop(el, other) {
                Some(v) => v.clone(),
                None => self
                    .doc
                    .attr(el, other)
                    .map(|a| Value::Str(a.to_string()))
                    .unwrap_or(Value::Null),
            },
        }
    }
}

fn apply_binop(op: BinOp, l: &Value, r: &Value) -> Value {
    match op {
        BinOp::Eq => Value::Bool(l == r),
        BinOp::Ne => Value::Bool(l != r),
        BinOp::Lt => Value::Bool(to_num(l) < to_num(r)),
        BinOp::Gt => Value::Bool(to_num(l) > to_num(r)),
        BinOp::Le => Value::Bool(to_num(l) <= to_num(r)),
        BinOp::Ge => Value::Bool(to_num(l) >= to_num(r)),
        BinOp::Add => {
            // String on either side means concatenation.
            if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) {
                Value::Str(format!("{}{}", l.render(), r.render()))
            } else {
                Value::Num(to_num(l) + to_num(r))
            }
        }
        BinOp::Sub => Value::Num(to_num(l) - to_num(r)),
        BinOp::Mul => Value::Num(to_num(l) * to_num(r)),
        BinOp::Div => Value::Num(to_num(l) / to_num(r)),
        BinOp::Mod => Value::Num(to_num(l) % to_num(r)),
        BinOp::Or | BinOp::And => unreachable!("short-circuited by the caller"),
    }
}

/// Numeric coercion: null → 0, bool → 0/1, parseable string → its number,
/// everything else → NaN.
fn to_num(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Num(n) => *n,
        Value::Str(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Value::List(_) | Value::Map(_) => f64::NAN,
    }
}
