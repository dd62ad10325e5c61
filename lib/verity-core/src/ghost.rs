//! Ghost erasure. Five transformations, each a small free
//! function so the driver can apply them independently and tests can target
//! each one in isolation.

use crate::defaults::default_value;
use verity_rir::{Expr, ExprKind, Formal, Program};

/// Drops ghost formals from a signature.
pub fn non_ghost_formals(formals: &[Formal]) -> Vec<&Formal> {
    formals.iter().filter(|f| !f.ghost).collect()
}

/// A method whose only out-parameters are ghost is elided entirely
///. The driver calls this before emitting a member
/// and skips emission on `true`.
pub fn elide_method(outs: &[Formal]) -> bool {
    !outs.is_empty() && outs.iter().all(|o| o.ghost)
}

/// A function keeps its signature even when every parameter is ghost, as
/// long as its result is not; call sites fill the
/// ghost arguments with `DefaultValue` rather than dropping them, since the
/// backend never sees which parameters were ghost.
pub fn call_args_with_ghost_defaults(
    formals: &[Formal],
    non_ghost_args: &[Expr],
    program: &Program,
) -> Result<Vec<Expr>, crate::errors::CoreError> {
    let mut non_ghost_args = non_ghost_args.iter();
    let mut out = Vec::with_capacity(formals.len());
    for formal in formals {
        if formal.ghost {
            out.push(default_value(&formal.ty, program)?);
        } else if let Some(arg) = non_ghost_args.next() {
            out.push(arg.clone());
        }
    }
    Ok(out)
}

/// A `match` over a ghost scrutinee is replaced by its then-taken arm
///; the resolver records which arm that is by
/// leaving exactly one arm in `arms` and setting `ghost_scrutinee`. This
/// just extracts that arm's body, panicking on a malformed RIR (an
/// internal-invariant condition the driver checks before calling this).
pub fn reduce_ghost_match(expr: &Expr) -> Option<&Expr> {
    match &expr.kind {
        ExprKind::Match { arms, ghost_scrutinee: true, .. } => arms.first().map(|arm| &arm.body),
        _ => None,
    }
}

/// Assertions and lemma invocations become no-ops;
/// the RIR already represents them as `Stmt::Absurd` / `ExprKind::Absurd`,
/// so erasure is just "do not emit this node".
pub fn is_erased_noop_stmt(stmt: &verity_rir::Stmt) -> bool {
    matches!(stmt, verity_rir::Stmt::Absurd)
}

/// A constant whose RHS mentions ghost state is emitted with the RHS erased
/// to a default value. `mentions_ghost` is supplied
/// by the driver, which has the member table needed to check field/call
/// references; this function only performs the substitution.
pub fn erase_ghost_rhs(ty: &verity_rir::Type, mentions_ghost: bool, program: &Program) -> Result<Option<Expr>, crate::errors::CoreError> {
    if mentions_ghost {
        Ok(Some(default_value(ty, program)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_rir::{MatchArm, Type};

    fn formal(name: &str, ghost: bool) -> Formal {
        Formal { name: name.to_string(), ty: Type::Int, ghost, default_value: None }
    }

    #[test]
    fn non_ghost_formals_drops_ghost_ones() {
        let formals = vec![formal("a", false), formal("b", true), formal("c", false)];
        let kept: Vec<&str> = non_ghost_formals(&formals).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(kept, vec!["a", "c"]);
    }

    #[test]
    fn elide_method_true_only_when_every_out_is_ghost() {
        assert!(elide_method(&[formal("r", true)]));
        assert!(!elide_method(&[formal("r", true), formal("s", false)]));
        assert!(!elide_method(&[]));
    }

    #[test]
    fn call_args_fill_ghost_slots_with_defaults() {
        let program = Program::new();
        let formals = vec![formal("x", false), formal("g", true), formal("y", false)];
        let args = vec![
            Expr::new(Type::Int, ExprKind::IntLiteral("1".to_string())),
            Expr::new(Type::Int, ExprKind::IntLiteral("2".to_string())),
        ];
        let filled = call_args_with_ghost_defaults(&formals, &args, &program).unwrap();
        assert_eq!(filled.len(), 3);
        assert_eq!(filled[1].kind, ExprKind::IntLiteral("0".to_string()));
    }

    #[test]
    fn ghost_match_reduces_to_its_single_surviving_arm() {
        let scrutinee = Expr::new(Type::Bool, ExprKind::BoolLiteral(true));
        let body = Expr::new(Type::Int, ExprKind::IntLiteral("7".to_string()));
        let matched = Expr::new(
            Type::Int,
            ExprKind::Match {
                scrutinee: Box::new(scrutinee),
                arms: vec![MatchArm { constructor: "Taken".to_string(), bindings: vec![], body: body.clone() }],
                ghost_scrutinee: true,
            },
        );
        assert_eq!(reduce_ghost_match(&matched), Some(&body));
    }

    #[test]
    fn non_ghost_match_is_not_reduced() {
        let scrutinee = Expr::new(Type::Bool, ExprKind::BoolLiteral(true));
        let body = Expr::new(Type::Int, ExprKind::IntLiteral("7".to_string()));
        let matched = Expr::new(
            Type::Int,
            ExprKind::Match {
                scrutinee: Box::new(scrutinee),
                arms: vec![MatchArm { constructor: "Taken".to_string(), bindings: vec![], body }],
                ghost_scrutinee: false,
            },
        );
        assert_eq!(reduce_ghost_match(&matched), None);
    }

    #[test]
    fn assert_and_lemma_statements_are_erased() {
        assert!(is_erased_noop_stmt(&verity_rir::Stmt::Absurd));
        assert!(!is_erased_noop_stmt(&verity_rir::Stmt::BreakLabel("l".to_string())));
    }

    #[test]
    fn ghost_mentioning_constant_rhs_becomes_a_default_value() {
        let program = Program::new();
        let erased = erase_ghost_rhs(&Type::Int, true, &program).unwrap();
        assert_eq!(erased.unwrap().kind, ExprKind::IntLiteral("0".to_string()));
        let kept = erase_ghost_rhs(&Type::Int, false, &program).unwrap();
        assert!(kept.is_none());
    }
}
