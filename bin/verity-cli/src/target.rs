//! Target selection: maps a `--target` string to a `Target` tag and drives
//! `verity_core::lower` against the matching concrete backend. `Backend`'s
//! `lower` entry point is generic (`fn lower<B: Backend>`), so picking the
//! backend at runtime means a match arm per target rather than a trait
//! object.

use anyhow::{bail, Result};
use verity_core::{lower, LoweringReport, Options, Target};
use verity_rir::Program;

/// Parses a `--target` value. Accepts each backend's `Target::tag()` plus
/// the handful of spelling variants a user is likely to type.
pub fn parse_target(s: &str) -> Result<Target> {
    if s.is_empty() {
        bail!("Target name cannot be empty");
    }
    match s.to_lowercase().as_str() {
        "java" => Ok(Target::Java),
        "csharp" | "cs" | "c#" => Ok(Target::CSharp),
        "go" | "golang" => Ok(Target::Go),
        "javascript" | "js" => Ok(Target::JavaScript),
        "python" | "py" => Ok(Target::Python),
        "cpp" | "c++" => Ok(Target::Cpp),
        _ => bail!("Unknown target: {}. Available targets: {}", s, available_targets()),
    }
}

pub fn available_targets() -> String {
    Target::ALL.iter().map(|t| t.tag()).collect::<Vec<_>>().join(", ")
}

/// Lowers `program` against the backend `target` names.
///
/// # Errors
/// Returns an error if the driver reports a fatal `CoreError`.
pub fn lower_for_target(target: Target, program: &Program, options: &Options) -> Result<LoweringReport> {
    let report = match target {
        Target::Java => lower(&verity_backend_java::JavaBackend, program, options)?,
        Target::CSharp => lower(&verity_backend_csharp::CSharpBackend, program, options)?,
        Target::Go => lower(&verity_backend_go::GoBackend, program, options)?,
        Target::JavaScript => lower(&verity_backend_javascript::JavaScriptBackend, program, options)?,
        Target::Python => lower(&verity_backend_python::PythonBackend, program, options)?,
        Target::Cpp => lower(&verity_backend_cpp::CppBackend, program, options)?,
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_target_accepts_tags_and_common_aliases() {
        assert_eq!(parse_target("java").unwrap(), Target::Java);
        assert_eq!(parse_target("JS").unwrap(), Target::JavaScript);
        assert_eq!(parse_target("py").unwrap(), Target::Python);
        assert_eq!(parse_target("c++").unwrap(), Target::Cpp);
    }

    #[test]
    fn parse_target_rejects_empty_and_unknown() {
        assert!(parse_target("").is_err());
        assert!(parse_target("brainfuck").is_err());
    }
}
