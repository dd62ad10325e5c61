//! CLI command implementations.

use crate::demos;
use crate::target::{available_targets, lower_for_target, parse_target};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use verity_core::{CompileLevel, Diagnostic, Options};
use verity_emit::write_rendered_atomically;

/// The `--json` rendering of one run: the files actually written plus the
/// non-fatal diagnostics collected along the way. Kept separate from
/// `verity_core::LoweringReport` (whose `files` carry full source text, not
/// just paths) since a JSON consumer wants a manifest, not the source.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    demo: &'a str,
    target: &'a str,
    written: Vec<PathBuf>,
    diagnostics: &'a [Diagnostic],
}

/// Parses a `--compile-level` value.
pub fn parse_compile_level(s: &str) -> Result<CompileLevel> {
    match s.to_lowercase().as_str() {
        "none" | "verify" => Ok(CompileLevel::None),
        "source" => Ok(CompileLevel::Source),
        "compile" => Ok(CompileLevel::Compile),
        "run" | "compile-and-run" => Ok(CompileLevel::CompileAndRun),
        _ => bail!("Unknown compile level: {}. Expected one of: none, source, compile, run", s),
    }
}

/// Lowers the named demo program against `target` and, if `compile_level`
/// calls for output, flushes the rendered files (plus the backend's
/// embedded runtime blob) atomically under `output`. With `json`, the
/// summary goes to stdout as a single `JsonReport` instead of prose lines
///.
///
/// # Errors
/// Returns an error if the demo name is unrecognized, the target string
/// doesn't resolve, the driver reports a fatal error, or the atomic flush
/// to disk fails partway through.
pub fn run_lower(
    demo_name: &str,
    target_str: &str,
    compile_level_str: &str,
    output: PathBuf,
    main_override: Option<String>,
    json: bool,
) -> Result<()> {
    let program = demos::by_name(demo_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown demo: {}. Available demos: {}", demo_name, demos::AVAILABLE.join(", ")))?;

    let target = parse_target(target_str)?;
    let compile_level = parse_compile_level(compile_level_str)?;

    let options = Options { target, compile_level, verify: true, main_override, output: output.clone() };

    let report = lower_for_target(target, &program, &options).with_context(|| format!("Failed to lower `{}` for {}", demo_name, target))?;

    let written = if report.files.is_empty() {
        Vec::new()
    } else {
        write_rendered_atomically(&output, &report.files).with_context(|| format!("Failed to write output to {}", output.display()))?
    };

    if json {
        let summary = JsonReport { demo: demo_name, target: target.tag(), written, diagnostics: &report.diagnostics };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for diagnostic in &report.diagnostics {
        eprintln!("warning: {}", diagnostic.message);
    }
    if written.is_empty() {
        println!("Verified `{}` with no emitted output (compile-level=none).", demo_name);
    } else {
        println!("Lowered `{}` to {} ({} file(s)):", demo_name, target, written.len());
        for path in &written {
            println!("  {}", path.display());
        }
    }

    Ok(())
}

/// Print usage information.
pub fn print_usage() {
    println!("Verity CLI v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("  verity lower <demo> --target <name> [options]");
    println!("  verity --help");
    println!("  verity --version");
    println!();
    println!("COMMANDS:");
    println!("  lower   Lower a built-in demo program to a target and write it to disk");
    println!();
    println!("OPTIONS:");
    println!("  -t, --target <name>          Target backend (available: {})", available_targets());
    println!("  -c, --compile-level <level>  none | source | compile | run (default: source)");
    println!("  -o, --output <dir>           Output directory (default: ./out)");
    println!("      --main <name>            Assert a specific entry point name was discovered");
    println!("      --json                   Emit a machine-readable JSON report instead of prose");
    println!("  -h, --help                   Print help information");
    println!("  -v, --version                Print version information");
    println!();
    println!("DEMOS:");
    for demo in demos::AVAILABLE {
        println!("  {}", demo);
    }
    println!();
    println!("EXAMPLES:");
    println!("  verity lower list-sum --target java -o out/java");
    println!("  verity lower list-sum -t python -c none");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_compile_level_accepts_all_four_spellings() {
        assert_eq!(parse_compile_level("none").unwrap(), CompileLevel::None);
        assert_eq!(parse_compile_level("source").unwrap(), CompileLevel::Source);
        assert_eq!(parse_compile_level("compile").unwrap(), CompileLevel::Compile);
        assert_eq!(parse_compile_level("run").unwrap(), CompileLevel::CompileAndRun);
    }

    #[test]
    fn parse_compile_level_rejects_unknown() {
        assert!(parse_compile_level("whatever").is_err());
    }

    #[test]
    fn run_lower_rejects_an_unknown_demo_name() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_lower("nonexistent", "java", "source", dir.path().to_path_buf(), None, false);
        assert!(result.is_err());
    }

    #[test]
    fn run_lower_rejects_an_unknown_target() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_lower("list-sum", "brainfuck", "source", dir.path().to_path_buf(), None, false);
        assert!(result.is_err());
    }

    #[test]
    fn run_lower_writes_java_output_for_the_list_sum_demo() {
        let dir = tempfile::tempdir().unwrap();
        run_lower("list-sum", "java", "source", dir.path().to_path_buf(), None, false).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(!entries.is_empty());
    }

    #[test]
    fn run_lower_with_compile_level_none_emits_no_files() {
        let dir = tempfile::tempdir().unwrap();
        run_lower("list-sum", "go", "none", dir.path().to_path_buf(), None, false).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn run_lower_json_mode_writes_files_and_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        run_lower("list-sum", "python", "source", dir.path().to_path_buf(), None, true).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(!entries.is_empty());
    }
}
