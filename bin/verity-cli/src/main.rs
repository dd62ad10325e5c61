//! Verity CLI
//!
//! Thin demonstration binary driving the lowering core: this
//! workspace has no parser or resolver, so the program lowered on each
//! invocation comes from a small built-in demo registry (`demos`) rather
//! than from source text on disk.

mod commands;
mod demos;
mod target;

use anyhow::{bail, Result};
use commands::{print_usage, run_lower};
use std::env;
use std::path::PathBuf;

/// Maximum number of command line arguments to prevent abuse.
const MAX_ARGS: usize = 1000;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() > MAX_ARGS {
        bail!("Too many arguments (max {})", MAX_ARGS);
    }

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = &args[1];

    match command.as_str() {
        "lower" => handle_lower_command(&args)?,
        "--help" | "-h" | "help" => print_usage(),
        "--version" | "-v" | "version" => println!("verity {}", env!("CARGO_PKG_VERSION")),
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn handle_lower_command(args: &[String]) -> Result<()> {
    if args.len() < 3 {
        eprintln!("Error: 'lower' command requires a demo name");
        print_usage();
        std::process::exit(1);
    }

    let demo_name = args[2].clone();
    let mut target = String::new();
    let mut compile_level = "source".to_string();
    let mut output = PathBuf::from("out");
    let mut main_override = None;
    let mut json = false;

    let mut i = 3;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--target" | "-t" => {
                target = require_value(args, i, arg)?;
                i += 2;
            }
            "--compile-level" | "-c" => {
                compile_level = require_value(args, i, arg)?;
                i += 2;
            }
            "--output" | "-o" => {
                output = PathBuf::from(require_value(args, i, arg)?);
                i += 2;
            }
            "--main" => {
                main_override = Some(require_value(args, i, arg)?);
                i += 2;
            }
            "--json" => {
                json = true;
                i += 1;
            }
            other => bail!("Unknown option: {}", other),
        }
    }

    if target.is_empty() {
        bail!("'lower' requires --target/-t");
    }

    run_lower(&demo_name, &target, &compile_level, output, main_override, json)
}

fn require_value(args: &[String], i: usize, flag: &str) -> Result<String> {
    args.get(i + 1).cloned().ok_or_else(|| anyhow::anyhow!("{} requires a value", flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn handle_lower_command_requires_target() {
        let args = make_args(&["verity", "lower", "list-sum"]);
        assert!(handle_lower_command(&args).is_err());
    }

    #[test]
    fn handle_lower_command_rejects_an_unknown_flag() {
        let args = make_args(&["verity", "lower", "list-sum", "--bogus", "x"]);
        assert!(handle_lower_command(&args).is_err());
    }

    #[test]
    fn handle_lower_command_rejects_a_flag_missing_its_value() {
        let args = make_args(&["verity", "lower", "list-sum", "--target"]);
        assert!(handle_lower_command(&args).is_err());
    }
}
