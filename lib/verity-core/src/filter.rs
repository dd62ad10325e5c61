//! The compilability filter: decides,
//! before any write is issued, which declarations and members reach the
//! backend at all.

use crate::backend::Capabilities;
use crate::errors::{CoreError, DriverStage, SourceToken};
use crate::options::Target;
use verity_rir::{Member, Program, TopLevelDecl, Type};

/// Drop ghost members entirely, and drop non-ghost members whose enclosing
/// type is itself ghost.
pub fn member_survives(member: &Member, program: &Program) -> bool {
    if member.ghost {
        return false;
    }
    !program.decl(member.enclosing).ghost
}

/// Drop members whose signature mentions abstract (unsized) type parameters
/// with no witness when the backend lacks erased generics. A "witness" here is any concrete type argument supplied at the
/// use site; `formal_types` is the member's formal/result types as already
/// resolved, so an unwitnessed abstract type shows up as a bare
/// `Type::TypeParameter`.
pub fn member_signature_is_representable(formal_types: &[&Type], capabilities: &Capabilities) -> bool {
    if capabilities.erased_generics {
        return true;
    }
    !formal_types.iter().any(|ty| ty.is_unsized_parameter())
}

/// Rejects a construct the active backend declares unsupported via its
/// capability bits; non-fatal, the driver
/// accumulates this and keeps going.
pub fn reject_unsupported(token: SourceToken, construct: impl Into<String>, target: Target) -> CoreError {
    CoreError::UnsupportedConstruct { token, construct: construct.into(), target }
}

/// Filters a declaration's member list down to the ones that survive the
/// filter, returning the kept members plus one `CoreError` per dropped
/// member whose drop is attributable to a capability gap rather than plain
/// ghost erasure (ghost drops are expected and silent; capability-gap drops
/// are surfaced as diagnostics).
pub fn filter_members<'a>(
    decl: &TopLevelDecl,
    members: &'a [&'a Member],
    capabilities: &Capabilities,
    target: Target,
    token_for: impl Fn(&Member) -> SourceToken,
) -> (Vec<&'a Member>, Vec<CoreError>) {
    let mut kept = Vec::new();
    let mut errors = Vec::new();
    for member in members {
        if member.ghost || decl.ghost {
            continue;
        }
        let formal_types: Vec<&Type> = member.formals().iter().map(|f| &f.ty).collect();
        if !member_signature_is_representable(&formal_types, capabilities) {
            errors.push(reject_unsupported(
                token_for(member),
                format!("member `{}` has an unwitnessed abstract type parameter", member.name),
                target,
            ));
            continue;
        }
        kept.push(*member);
    }
    (kept, errors)
}

/// Asserts the driver-invariant that a dropped member was dropped for a
/// known reason, not silently lost; used by the driver to turn "kept +
/// total - kept == unaccounted" into a fatal internal error rather than a
/// quietly wrong output.
pub fn assert_accounted_for(total: usize, kept: usize, errored: usize, ghost_dropped: usize) -> Result<(), CoreError> {
    if kept + errored + ghost_dropped != total {
        return Err(CoreError::InternalInvariant {
            stage: DriverStage::CompilabilityFilter,
            detail: format!(
                "member accounting mismatch: {} kept + {} errored + {} ghost-dropped != {} total",
                kept, errored, ghost_dropped, total
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StringRepr;
    use verity_rir::{Attributes, DeclId, MemberId, MemberKind, ModuleId, TopLevelDeclKind};

    fn capabilities(erased_generics: bool) -> Capabilities {
        Capabilities {
            erased_generics,
            native_int_widths: &[32, 64],
            trait_typed_collections: false,
            native_codatatypes: false,
            labeled_loops: true,
            max_tuple_arity: None,
            string_repr: StringRepr::CodeUnits,
        }
    }

    fn plain_decl(ghost: bool) -> TopLevelDecl {
        TopLevelDecl {
            id: DeclId(0),
            name: "C".to_string(),
            type_params: vec![],
            attrs: Attributes::default(),
            module: ModuleId(0),
            ghost,
            kind: TopLevelDeclKind::Class(verity_rir::Class {
                members: vec![],
                implemented_traits: vec![],
                is_default_class: false,
            }),
        }
    }

    fn field_member(name: &str, ghost: bool, enclosing: DeclId) -> Member {
        Member {
            id: MemberId(0),
            name: name.to_string(),
            ghost,
            is_static: false,
            enclosing,
            attrs: Attributes::default(),
            kind: MemberKind::Field { is_const: false, ty: Type::Int, rhs: None },
        }
    }

    #[test]
    fn ghost_member_does_not_survive() {
        let mut program = Program::new();
        let decl_id = program.push_decl(plain_decl(false));
        let member = field_member("g", true, decl_id);
        assert!(!member_survives(&member, &program));
    }

    #[test]
    fn non_ghost_member_of_ghost_type_does_not_survive() {
        let mut program = Program::new();
        let decl_id = program.push_decl(plain_decl(true));
        let member = field_member("f", false, decl_id);
        assert!(!member_survives(&member, &program));
    }

    #[test]
    fn non_ghost_member_of_non_ghost_type_survives() {
        let mut program = Program::new();
        let decl_id = program.push_decl(plain_decl(false));
        let member = field_member("f", false, decl_id);
        assert!(member_survives(&member, &program));
    }

    #[test]
    fn unwitnessed_type_param_rejected_without_erased_generics() {
        let caps = capabilities(false);
        let unsized = Type::TypeParameter("T".to_string());
        assert!(!member_signature_is_representable(&[&unsized], &caps));
        let caps_erased = capabilities(true);
        assert!(member_signature_is_representable(&[&unsized], &caps_erased));
    }

    #[test]
    fn accounting_mismatch_is_an_internal_invariant() {
        assert!(assert_accounted_for(10, 5, 2, 2).is_err());
        assert!(assert_accounted_for(10, 5, 2, 3).is_ok());
    }
}
