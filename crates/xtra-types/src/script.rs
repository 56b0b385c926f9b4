//! AST of the sandboxed handler script language.
//!
//! Event and run-once directives carry small statement lists instead of
//! arbitrary page script. The language is deliberately closed: the only
//! reachable names are store paths and the enumerated context roots `el`
//! (the bound element) and `event` (the triggering event payload).
//!
//! Grammar sketch:
//!
//! ```text
//! script  = stmt { ";" stmt }
//! stmt    = "delete" path | path "=" expr
//! expr    = or-chain over: literals, paths, el.<prop>, event.<field>,
//!           unary not/-, binary or/and/==/!=/</>/<=/>=/+/-/*//"%", parens
//! ```

use crate::{Path, Value};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// `not` — logical negation of truthiness.
    Not,
    /// `-` — numeric negation.
    Neg,
}

/// Binary operators, lowest to highest precedence tier:
/// `or` < `and` < comparisons < `+ -` < `* / %`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// An expression in the handler script language.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptExpr {
    /// Number, string, `true`, `false`, `null` literal.
    Lit(Value),
    /// A store (or computed) path, e.g. `items[0].qty`.
    Store(Path),
    /// `el.<prop>` — a property of the bound element (`value`, `checked`,
    /// or any attribute name).
    El(String),
    /// `event.<field>` — a field of the event payload map.
    Event(String),
    Unary {
        op: UnOp,
        expr: Box<ScriptExpr>,
    },
    Binary {
        left: Box<ScriptExpr>,
        op: BinOp,
        right: Box<ScriptExpr>,
    },
}

/// A statement: assign into the store, or delete a store entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStmt {
    Assign { target: Path, value: ScriptExpr },
    Delete(Path),
}

/// A compiled handler body: statements executed in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub stmts: Vec<ScriptStmt>,
}
