//! Resolved Intermediate Representation (RIR).
//!
//! This crate is the data model the lowering core consumes. It
//! has no parser and no type-checker: a `Program` is built by the resolver
//! (external to this workspace) or, in tests, by hand. Every field here
//! mirrors an entity or invariant the resolved program must satisfy;
//! nothing in this crate performs lowering itself.

pub mod decl;
pub mod expr;
pub mod ids;
pub mod program;
pub mod stmt;
pub mod types;

pub use decl::{
    Attributes, Class, Constructor, Datatype, Formal, Iterator, Member, MemberKind, Newtype,
    SubsetType, Trait, TopLevelDecl, TopLevelDeclKind, TypeParam,
};
pub use expr::{BinaryOp, BoundVar, CollectionKind, Expr, ExprKind, MatchArm, QuantifierKind, UnaryOp};
pub use ids::{DeclId, MemberId, ModuleId};
pub use program::{Module, Program};
pub use stmt::{Lvalue, Stmt};
pub use types::Type;
