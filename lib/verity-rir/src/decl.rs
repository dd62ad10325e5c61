//! Top-level declarations and members.

use crate::expr::Expr;
use crate::ids::{DeclId, MemberId};
use crate::stmt::Stmt;
use crate::types::Type;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    /// Free-form attribute names surviving from resolution (e.g. a
    /// `{:tailrecursive}` marker); the driver only interprets the handful it
    /// knows about (see `Member::is_tail_recursive`).
    pub names: Vec<String>,
}

impl Attributes {
    pub fn has(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Formal {
    pub name: String,
    pub ty: Type,
    pub ghost: bool,
    pub default_value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    pub name: String,
    pub formals: Vec<Formal>,
}

impl Constructor {
    pub fn non_ghost_formals(&self) -> impl Iterator<Item = &Formal> {
        self.formals.iter().filter(|f| !f.ghost)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub members: Vec<MemberId>,
    pub implemented_traits: Vec<DeclId>,
    pub is_default_class: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trait {
    pub members: Vec<MemberId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datatype {
    pub constructors: Vec<Constructor>,
    pub co_inductive: bool,
    /// Index into `constructors` of the constructor `DefaultValue` applies
    /// recursively. Required for
    /// inductive datatypes; meaningless (but still present, pointing at
    /// constructor 0) for co-inductive ones, which default via thunked self-
    /// reference rather than eager recursion.
    pub default_ctor: usize,
}

impl Datatype {
    pub fn is_record(&self) -> bool {
        self.constructors.len() == 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Newtype {
    pub base: Type,
    pub witness: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubsetType {
    pub base: Type,
    pub bound_var: String,
    pub constraint: Expr,
    pub witness: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Iterator {
    pub formals: Vec<Formal>,
    pub outs: Vec<Formal>,
    pub body: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopLevelDeclKind {
    Class(Class),
    Trait(Trait),
    Datatype(Datatype),
    Newtype(Newtype),
    SubsetType(SubsetType),
    Iterator(Iterator),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopLevelDecl {
    pub id: DeclId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub attrs: Attributes,
    pub module: crate::ids::ModuleId,
    pub kind: TopLevelDeclKind,
    /// Set by the resolver for ghost-only declarations (e.g. a datatype used
    /// only in specifications); the compilability filter drops every member
    /// of a declaration with this flag set.
    pub ghost: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberKind {
    Field {
        is_const: bool,
        ty: Type,
        rhs: Option<Expr>,
    },
    Method {
        type_params: Vec<TypeParam>,
        formals: Vec<Formal>,
        outs: Vec<Formal>,
        body: Option<Vec<Stmt>>,
    },
    Function {
        type_params: Vec<TypeParam>,
        formals: Vec<Formal>,
        result_ty: Type,
        body: Option<Expr>,
    },
    Constructor {
        formals: Vec<Formal>,
        body: Option<Vec<Stmt>>,
    },
    Lemma {
        formals: Vec<Formal>,
    },
    Predicate {
        formals: Vec<Formal>,
        body: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub ghost: bool,
    pub is_static: bool,
    pub enclosing: DeclId,
    pub attrs: Attributes,
    pub kind: MemberKind,
}

impl Member {
    pub fn is_tail_recursive(&self) -> bool {
        self.attrs.has("tailrecursive")
    }

    /// Formals for whichever kind carries them; constants and plain fields
    /// have none.
    pub fn formals(&self) -> &[Formal] {
        match &self.kind {
            MemberKind::Method { formals, .. }
            | MemberKind::Function { formals, .. }
            | MemberKind::Constructor { formals, .. }
            | MemberKind::Lemma { formals }
            | MemberKind::Predicate { formals, .. } => formals,
            MemberKind::Field { .. } => &[],
        }
    }

    pub fn outs(&self) -> &[Formal] {
        match &self.kind {
            MemberKind::Method { outs, .. } => outs,
            _ => &[],
        }
    }

    /// A method whose only out-parameters are ghost is elided entirely
    ///.
    pub fn has_only_ghost_outs(&self) -> bool {
        let outs = self.outs();
        !outs.is_empty() && outs.iter().all(|o| o.ghost)
    }
}
