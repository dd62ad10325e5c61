//! Resolved statements.

use crate::expr::Expr;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum Lvalue {
    Local(String),
    Field {
        receiver: Option<Box<Expr>>,
        name: String,
    },
    Index {
        collection: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        name: String,
        ty: Type,
        init: Option<Expr>,
    },
    Assign {
        lhs: Lvalue,
        rhs: Expr,
    },
    /// Destructuring assignment from a method call with multiple
    /// out-parameters.
    MultiAssign {
        lhs: Vec<Lvalue>,
        call: Expr,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    ForRange {
        var: String,
        lo: Expr,
        hi: Expr,
        body: Vec<Stmt>,
    },
    ForEach {
        var: String,
        collection: Expr,
        body: Vec<Stmt>,
    },
    /// An unconditional loop with a break label, used by the tail-call
    /// transform and by source-level `while true`.
    Loop {
        label: Option<String>,
        body: Vec<Stmt>,
    },
    BreakLabel(String),
    Return(Vec<Expr>),
    /// Only valid inside an iterator body.
    Yield(Vec<Expr>),
    Print(Vec<Expr>),
    CallStmt(Expr),
    /// Assertions and lemma invocations are erased to this no-op by ghost
    /// erasure; it is never itself emitted.
    Absurd,
}
