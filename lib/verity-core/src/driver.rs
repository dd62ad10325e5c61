//! The lowering driver: traverses the RIR in a fixed order
//! and issues structured write operations against a `Backend`, validating
//! and transforming in stages and short-circuiting on the first hard error.

use std::path::PathBuf;

use crate::backend::Backend;
use crate::errors::{CoreError, Diagnostic, DriverStage, SourceToken};
use crate::filter::member_survives;
use crate::options::{CompilationDefaults, CompileLevel, Options};
use verity_emit::Substrate;
use verity_rir::{Member, MemberKind, ModuleId, Program, TopLevelDecl};

/// The result of one compilation: rendered files plus the non-fatal
/// diagnostics accumulated along the way.
#[derive(Debug, Clone, Default)]
pub struct LoweringReport {
    pub files: Vec<(PathBuf, String)>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Topologically sorts modules so that a module is lowered before any
/// module importing it. A cycle is an internal invariant violation: the resolver is
/// assumed to reject recursive module imports upstream.
pub fn module_order(program: &Program) -> Result<Vec<ModuleId>, CoreError> {
    let modules = program.modules();
    let mut order = Vec::with_capacity(modules.len());
    let mut state = vec![0u8; modules.len()]; // 0 = unvisited, 1 = in-progress, 2 = done

    fn visit(
        id: ModuleId,
        program: &Program,
        state: &mut [u8],
        order: &mut Vec<ModuleId>,
    ) -> Result<(), CoreError> {
        match state[id.index()] {
            2 => return Ok(()),
            1 => {
                return Err(CoreError::InternalInvariant {
                    stage: DriverStage::ModuleOrdering,
                    detail: format!("cyclic module import through {}", id),
                })
            }
            _ => {}
        }
        state[id.index()] = 1;
        for &dep in &program.module(id).imports {
            visit(dep, program, state, order)?;
        }
        state[id.index()] = 2;
        order.push(id);
        Ok(())
    }

    for module in modules {
        visit(module.id, program, &mut state, &mut order)?;
    }
    Ok(order)
}

/// Qualifies as the program's entry point: non-ghost, zero non-ghost
/// in-parameters, static or otherwise callable with no required instance
/// state.
pub fn qualifies_as_main(member: &Member) -> bool {
    if member.ghost {
        return false;
    }
    match &member.kind {
        MemberKind::Method { formals, .. } => {
            member.is_static && formals.iter().filter(|f| !f.ghost).count() == 0
        }
        _ => false,
    }
}

/// Scans every surviving member for a main-method candidate. Zero matches is
/// a no-main artifact (`Ok(None)`); more than one is an error.
pub fn discover_main(program: &Program) -> Result<Option<&Member>, CoreError> {
    let mut found: Option<&Member> = None;
    for member in program.members() {
        if !member_survives(member, program) {
            continue;
        }
        if qualifies_as_main(member) {
            if let Some(existing) = found {
                return Err(CoreError::InternalInvariant {
                    stage: DriverStage::MainMethodDiscovery,
                    detail: format!(
                        "multiple main-method candidates: `{}` and `{}`",
                        existing.name, member.name
                    ),
                });
            }
            found = Some(member);
        }
    }
    Ok(found)
}

/// A self-call rewritten by the tail-call transform: assign the bound
/// parameters, then jump to the loop label.
#[derive(Debug, Clone, PartialEq)]
pub struct TailCallRewrite {
    pub label: String,
    pub param_assignments: Vec<(String, verity_rir::Expr)>,
}

/// Builds the rewrite for one self-call site inside a method/function the
/// resolver flagged `{:tailrecursive}`. `formal_names` is the callee's
/// non-ghost formal names in order, `args` the call's non-ghost arguments in
/// the same order (ghost arguments never appear — they were already dropped
/// or defaulted upstream).
pub fn tail_call_rewrite(
    label: &str,
    formal_names: &[String],
    args: &[verity_rir::Expr],
) -> Result<TailCallRewrite, CoreError> {
    if formal_names.len() != args.len() {
        return Err(CoreError::InternalInvariant {
            stage: DriverStage::TailCallTransform,
            detail: format!(
                "tail-call arity mismatch: {} formals vs {} arguments",
                formal_names.len(),
                args.len()
            ),
        });
    }
    Ok(TailCallRewrite {
        label: label.to_string(),
        param_assignments: formal_names.iter().cloned().zip(args.iter().cloned()).collect(),
    })
}

/// Declarations ordered the way a member group should be emitted within one
/// enclosing type: static members before instance members, preserving each group's original
/// relative order (a stable sort).
pub fn order_members_static_first<'a>(members: &[&'a Member]) -> Vec<&'a Member> {
    let mut ordered: Vec<&Member> = members.to_vec();
    ordered.sort_by_key(|m| !m.is_static);
    ordered
}

/// A minimal synthetic source token for declarations that have none of
/// their own (e.g. a driver-level diagnostic not tied to a specific AST
/// node). Real tokens flow in from the resolver via the RIR in a full
/// implementation; this workspace's `verity-rir` does not yet carry them on
/// every node, so driver-level diagnostics use this placeholder position.
pub fn synthetic_token(text: impl Into<String>) -> SourceToken {
    SourceToken { line: 0, column: 0, text: text.into() }
}

/// Runs the whole pipeline against one backend, given an already-lowered
/// `Program`. This orchestrates module ordering, main-method discovery,
/// and member filtering; it stops at the first fatal `CoreError` and
/// otherwise accumulates non-fatal ones into the returned report.
pub fn lower<B: Backend>(backend: &B, program: &Program, options: &Options) -> Result<LoweringReport, CoreError> {
    let mut diagnostics = Vec::new();
    let order = module_order(program)?;

    let main = discover_main(program)?;
    if let Some(name) = &options.main_override {
        if main.map(|m| &m.name) != Some(name) {
            diagnostics.push(Diagnostic {
                token: synthetic_token("main-override"),
                message: format!("requested main override `{}` does not match the discovered entry point", name),
            });
        }
    }

    for &module_id in &order {
        let module = program.module(module_id);
        for &decl_id in &module.decls {
            let decl: &TopLevelDecl = program.decl(decl_id);
            if decl.ghost {
                continue;
            }
            for &member_id in decl_members(decl) {
                let member = program.member(member_id);
                if !member_survives(member, program) {
                    continue;
                }
                let formal_types: Vec<&verity_rir::Type> = member.formals().iter().map(|f| &f.ty).collect();
                if !crate::filter::member_signature_is_representable(&formal_types, &backend.capabilities()) {
                    diagnostics.push(Diagnostic {
                        token: synthetic_token(member.name.clone()),
                        message: format!(
                            "`{}` is not supported when targeting {}: unwitnessed abstract type parameter",
                            member.name,
                            backend.target()
                        ),
                    });
                }
            }
        }
    }

    if options.compile_level == CompileLevel::None {
        return Ok(LoweringReport { files: Vec::new(), diagnostics });
    }

    let defaults = CompilationDefaults::default();
    let mut sub = Substrate::new(defaults.indent_unit.clone());
    let mut files = crate::walk::emit_program(backend, &mut sub, program, &order)?;

    let (runtime_name, runtime_contents) = backend.runtime_resource();
    files.push((PathBuf::from(runtime_name), runtime_contents.to_string()));

    Ok(LoweringReport { files, diagnostics })
}

fn decl_members(decl: &TopLevelDecl) -> &[verity_rir::MemberId] {
    match &decl.kind {
        verity_rir::TopLevelDeclKind::Class(c) => &c.members,
        verity_rir::TopLevelDeclKind::Trait(t) => &t.members,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_rir::{Attributes, DeclId, Formal, MemberId, Module, Type};

    fn push_linear_modules(program: &mut Program) -> (ModuleId, ModuleId, ModuleId) {
        let a = program.push_module(Module { id: ModuleId(0), name: "A".into(), is_default: false, decls: vec![], parent: None, imports: vec![] });
        let b = program.push_module(Module { id: ModuleId(0), name: "B".into(), is_default: false, decls: vec![], parent: None, imports: vec![a] });
        let c = program.push_module(Module { id: ModuleId(0), name: "C".into(), is_default: false, decls: vec![], parent: None, imports: vec![b] });
        (a, b, c)
    }

    #[test]
    fn module_order_places_dependencies_first() {
        let mut program = Program::new();
        let (a, b, c) = push_linear_modules(&mut program);
        let order = module_order(&program).unwrap();
        let pos = |id: ModuleId| order.iter().position(|&m| m == id).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(b) < pos(c));
    }

    #[test]
    fn module_order_rejects_a_cycle() {
        let mut program = Program::new();
        let a = program.push_module(Module { id: ModuleId(0), name: "A".into(), is_default: false, decls: vec![], parent: None, imports: vec![ModuleId(1)] });
        program.push_module(Module { id: ModuleId(0), name: "B".into(), is_default: false, decls: vec![], parent: None, imports: vec![a] });
        let err = module_order(&program).unwrap_err();
        assert!(matches!(err, CoreError::InternalInvariant { stage: DriverStage::ModuleOrdering, .. }));
    }

    fn static_method_member(enclosing: DeclId, name: &str, formals: Vec<Formal>) -> Member {
        Member {
            id: MemberId(0),
            name: name.to_string(),
            ghost: false,
            is_static: true,
            enclosing,
            attrs: Attributes::default(),
            kind: MemberKind::Method { type_params: vec![], formals, outs: vec![], body: None },
        }
    }

    #[test]
    fn main_qualifies_with_zero_non_ghost_formals_and_static() {
        let m = static_method_member(DeclId(0), "Main", vec![]);
        assert!(qualifies_as_main(&m));
    }

    #[test]
    fn main_disqualified_by_a_non_ghost_formal() {
        let formals = vec![Formal { name: "x".into(), ty: Type::Int, ghost: false, default_value: None }];
        let m = static_method_member(DeclId(0), "Main", formals);
        assert!(!qualifies_as_main(&m));
    }

    #[test]
    fn main_disqualified_when_instance_method() {
        let mut m = static_method_member(DeclId(0), "Main", vec![]);
        m.is_static = false;
        assert!(!qualifies_as_main(&m));
    }

    #[test]
    fn tail_call_rewrite_pairs_formals_with_args_in_order() {
        let rewrite = tail_call_rewrite(
            "loop0",
            &["x".to_string(), "y".to_string()],
            &[
                verity_rir::Expr::new(Type::Int, verity_rir::ExprKind::IntLiteral("1".into())),
                verity_rir::Expr::new(Type::Int, verity_rir::ExprKind::IntLiteral("2".into())),
            ],
        )
        .unwrap();
        assert_eq!(rewrite.label, "loop0");
        assert_eq!(rewrite.param_assignments[0].0, "x");
        assert_eq!(rewrite.param_assignments[1].0, "y");
    }

    #[test]
    fn tail_call_rewrite_rejects_arity_mismatch() {
        let err = tail_call_rewrite("loop0", &["x".to_string()], &[]).unwrap_err();
        assert!(matches!(err, CoreError::InternalInvariant { stage: DriverStage::TailCallTransform, .. }));
    }

    #[test]
    fn order_members_static_first_is_stable_within_each_group() {
        let decl = DeclId(0);
        let s1 = static_method_member(decl, "s1", vec![]);
        let mut i1 = static_method_member(decl, "i1", vec![]);
        i1.is_static = false;
        let s2 = static_method_member(decl, "s2", vec![]);
        let members = vec![&i1, &s1, &s2];
        let ordered = order_members_static_first(&members);
        let names: Vec<&str> = ordered.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["s1", "s2", "i1"]);
    }
}
