//! Resolved expressions.

use crate::ids::MemberId;
use crate::types::Type;

/// Every compiled expression carries its resolved type.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub ty: Type,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(ty: Type, kind: ExprKind) -> Self {
        Self { ty, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    EuclideanDiv,
    EuclideanMod,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    RotateLeft,
    RotateRight,
    SetUnion,
    SetIntersect,
    SetDifference,
    SeqConcat,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    SetCardinality,
    SeqLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Set,
    Seq,
    Multiset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    Forall,
    Exists,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundVar {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub constructor: String,
    /// Non-ghost bindings introduced by this arm's destructuring pattern;
    /// ghost bindings never reach here (they are dropped at resolution).
    pub bindings: Vec<String>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    BoolLiteral(bool),
    CharLiteral(char),
    /// Decimal digit string (optionally signed); the core never performs
    /// arithmetic on it, only re-emits it through a backend's big-integer
    /// constructor.
    IntLiteral(String),
    RealLiteral(String),
    BitvectorLiteral {
        width: u32,
        value: u64,
    },
    StringLiteral(String),

    CollectionDisplay {
        kind: CollectionKind,
        elements: Vec<Expr>,
    },
    MapDisplay {
        entries: Vec<(Expr, Expr)>,
    },

    /// A local variable or formal, by resolved name.
    Ident(String),
    This,

    FieldAccess {
        receiver: Option<Box<Expr>>,
        member: MemberId,
        is_static: bool,
    },

    Index {
        collection: Box<Expr>,
        index: Box<Expr>,
    },
    IndexUpdate {
        collection: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    Slice {
        seq: Box<Expr>,
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
    },
    ArraySelect {
        array: Box<Expr>,
        indices: Vec<Expr>,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Conversion {
        expr: Box<Expr>,
        target: Type,
    },

    Quantifier {
        kind: QuantifierKind,
        bound: Vec<BoundVar>,
        range: Option<Box<Expr>>,
        body: Box<Expr>,
    },
    SetComprehension {
        bound: Vec<BoundVar>,
        range: Box<Expr>,
        term: Box<Expr>,
    },
    MapComprehension {
        bound: Vec<BoundVar>,
        range: Box<Expr>,
        key: Box<Expr>,
        value: Box<Expr>,
    },

    Lambda {
        params: Vec<BoundVar>,
        body: Box<Expr>,
    },
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// A match over a ghost scrutinee has already been reduced to its taken
    /// arm upstream; `ghost_scrutinee` records that this node
    /// was such a match so the driver can assert the invariant in tests.
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
        ghost_scrutinee: bool,
    },

    Call {
        callee: MemberId,
        type_args: Vec<Type>,
        args: Vec<Expr>,
    },
    /// Constructs a datatype value. Datatype constructors are not members
    ///, so construction is its own
    /// expression form rather than a `Call`.
    ConstructDatatype {
        decl: crate::ids::DeclId,
        ctor_index: usize,
        args: Vec<Expr>,
    },
    Apply {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Reached only when a resolver bug lets an assert/requires/ensures
    /// survive to lowering; the driver erases it to this and it is never
    /// actually emitted.
    Absurd,
}
