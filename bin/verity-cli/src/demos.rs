//! Hand-built demonstration programs.
//!
//! This workspace has no parser or resolver (`verity-rir`'s own doc comment:
//! "a `Program` is built by the resolver ... or, in tests, by hand"); the CLI
//! plays the resolver's part for a couple of fixed programs so the pipeline
//! has something concrete to lower. `list_sum` is the "List sum" scenario
//!: an inductive `List` datatype, a recursive `Sum`
//! function matching over it, and a `Main` that builds `Cons(0, .., Cons(6,
//! Nil))` and prints its sum.
//!
//! Arena ids are assigned by push order (`Program::push_*`); every id used
//! before its own push call below is a literal matching where that push
//! falls in the sequence, the same convention `verity-core`'s own tests use
//! for hand-built programs.

use verity_rir::{
    BinaryOp, Class, Constructor, Datatype, DeclId, Expr, ExprKind, Formal, Member, MemberId,
    MemberKind, MatchArm, Module, ModuleId, Program, Stmt, TopLevelDecl, TopLevelDeclKind, Type,
};

fn int_lit(digits: impl Into<String>) -> Expr {
    Expr::new(Type::Int, ExprKind::IntLiteral(digits.into()))
}

fn string_lit(text: impl Into<String>) -> Expr {
    Expr::new(Type::Seq(Box::new(Type::Char)), ExprKind::StringLiteral(text.into()))
}

fn build_list(list_ty: &Type, list_decl: DeclId, values: &[i64]) -> Expr {
    let mut acc = Expr::new(list_ty.clone(), ExprKind::ConstructDatatype { decl: list_decl, ctor_index: 0, args: vec![] });
    for &v in values.iter().rev() {
        acc = Expr::new(
            list_ty.clone(),
            ExprKind::ConstructDatatype { decl: list_decl, ctor_index: 1, args: vec![int_lit(v.to_string()), acc] },
        );
    }
    acc
}

/// Builds the "List sum" program: one module, one `List` datatype, one class
/// holding `Sum` (a recursive `Function`) and `Main` (the entry point).
pub fn list_sum() -> Program {
    let mut program = Program::new();

    // First decl pushed: List. Self-referential (`Cons.tail: List`), so its
    // own id is needed before the push that creates it.
    let list_decl: DeclId = DeclId(0);
    let list_ty = Type::UserDefined { decl: list_decl, args: vec![] };

    let nil = Constructor { name: "Nil".to_string(), formals: vec![] };
    let cons = Constructor {
        name: "Cons".to_string(),
        formals: vec![
            Formal { name: "head".to_string(), ty: Type::Int, ghost: false, default_value: None },
            Formal { name: "tail".to_string(), ty: list_ty.clone(), ghost: false, default_value: None },
        ],
    };
    let list_decl = program.push_decl(TopLevelDecl {
        id: DeclId(0),
        name: "List".to_string(),
        type_params: vec![],
        attrs: Default::default(),
        module: ModuleId(0),
        ghost: false,
        kind: TopLevelDeclKind::Datatype(Datatype { constructors: vec![nil, cons], co_inductive: false, default_ctor: 0 }),
    });
    debug_assert_eq!(list_decl, DeclId(0));

    // Second decl pushed: the class enclosing Sum and Main. Its members
    // reference it as `enclosing` before it is pushed, same reasoning.
    let class_decl: DeclId = DeclId(1);

    // First member pushed: Sum. Recursive, so it needs its own id up front.
    let sum_id: MemberId = MemberId(0);
    let sum_body = Expr::new(
        Type::Int,
        ExprKind::Match {
            scrutinee: Box::new(Expr::new(list_ty.clone(), ExprKind::Ident("l".to_string()))),
            arms: vec![
                MatchArm { constructor: "Nil".to_string(), bindings: vec![], body: int_lit("0") },
                MatchArm {
                    constructor: "Cons".to_string(),
                    bindings: vec!["head".to_string(), "tail".to_string()],
                    body: Expr::new(
                        Type::Int,
                        ExprKind::Binary {
                            op: BinaryOp::Add,
                            lhs: Box::new(Expr::new(Type::Int, ExprKind::Ident("head".to_string()))),
                            rhs: Box::new(Expr::new(
                                Type::Int,
                                ExprKind::Call {
                                    callee: sum_id,
                                    type_args: vec![],
                                    args: vec![Expr::new(list_ty.clone(), ExprKind::Ident("tail".to_string()))],
                                },
                            )),
                        },
                    ),
                },
            ],
            ghost_scrutinee: false,
        },
    );
    let sum_id = program.push_member(Member {
        id: MemberId(0),
        name: "Sum".to_string(),
        ghost: false,
        is_static: true,
        enclosing: class_decl,
        attrs: Default::default(),
        kind: MemberKind::Function {
            type_params: vec![],
            formals: vec![Formal { name: "l".to_string(), ty: list_ty.clone(), ghost: false, default_value: None }],
            result_ty: Type::Int,
            body: Some(sum_body),
        },
    });
    debug_assert_eq!(sum_id, MemberId(0));

    let main_body = vec![
        Stmt::VarDecl { name: "l".to_string(), ty: list_ty.clone(), init: Some(build_list(&list_ty, list_decl, &[0, 1, 2, 3, 4, 5, 6])) },
        Stmt::Print(vec![
            string_lit("0 + 1 + 2 + 3 + 4 + 5 + 6 == "),
            Expr::new(
                Type::Int,
                ExprKind::Call { callee: sum_id, type_args: vec![], args: vec![Expr::new(list_ty.clone(), ExprKind::Ident("l".to_string()))] },
            ),
            string_lit(" (once more, that's 21)"),
        ]),
    ];
    let main_id = program.push_member(Member {
        id: MemberId(0),
        name: "Main".to_string(),
        ghost: false,
        is_static: true,
        enclosing: class_decl,
        attrs: Default::default(),
        kind: MemberKind::Method { type_params: vec![], formals: vec![], outs: vec![], body: Some(main_body) },
    });

    let class_decl = program.push_decl(TopLevelDecl {
        id: DeclId(0),
        name: "Demo".to_string(),
        type_params: vec![],
        attrs: Default::default(),
        module: ModuleId(0),
        ghost: false,
        kind: TopLevelDeclKind::Class(Class { members: vec![sum_id, main_id], implemented_traits: vec![], is_default_class: true }),
    });
    debug_assert_eq!(class_decl, DeclId(1));

    let module_id = program.push_module(Module {
        id: ModuleId(0),
        name: "Demo".to_string(),
        is_default: true,
        decls: vec![list_decl, class_decl],
        parent: None,
        imports: vec![],
    });
    program.roots = vec![module_id];
    program
}

/// Named demos the CLI can select by name.
pub fn by_name(name: &str) -> Option<Program> {
    match name {
        "list-sum" => Some(list_sum()),
        _ => None,
    }
}

pub const AVAILABLE: &[&str] = &["list-sum"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_sum_has_one_module_with_the_list_datatype_and_demo_class() {
        let program = list_sum();
        assert_eq!(program.roots.len(), 1);
        let module = program.module(program.roots[0]);
        assert_eq!(module.decls.len(), 2);
        assert_eq!(program.decl(module.decls[0]).name, "List");
        assert_eq!(program.decl(module.decls[1]).name, "Demo");
    }

    #[test]
    fn by_name_resolves_the_registered_demo_and_rejects_unknown_names() {
        assert!(by_name("list-sum").is_some());
        assert!(by_name("nonexistent").is_none());
    }
}
