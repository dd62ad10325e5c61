//! The command surface consumed from the (external) CLI layer,
//! represented as an immutable record passed by reference into the driver —
//! never a global (Design Notes: "Global mutable options → an immutable
//! options record").

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// JVM-class target.
    Java,
    /// C-family managed-runtime target.
    CSharp,
    /// Garbage-collected systems-language target.
    Go,
    /// Prototype-based scripting target.
    JavaScript,
    /// Dynamic interpreted target.
    Python,
    /// C++ dialect target.
    Cpp,
}

impl Target {
    pub const ALL: [Target; 6] = [
        Target::Java,
        Target::CSharp,
        Target::Go,
        Target::JavaScript,
        Target::Python,
        Target::Cpp,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Target::Java => "java",
            Target::CSharp => "csharp",
            Target::Go => "go",
            Target::JavaScript => "javascript",
            Target::Python => "python",
            Target::Cpp => "cpp",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompileLevel {
    /// Verification only; no files emitted.
    None,
    /// Emit target source, nothing else.
    Source,
    /// Emit target source and invoke the target's native compiler/assembler.
    Compile,
    /// Emit, compile, and run, surfacing the run's stdout/exit code.
    CompileAndRun,
}

/// Everything the driver needs to know about one invocation. Built once by
/// the (external) CLI and threaded through by reference; the driver never
/// reads configuration from anywhere else.
#[derive(Debug, Clone)]
pub struct Options {
    pub target: Target,
    pub compile_level: CompileLevel,
    pub verify: bool,
    pub main_override: Option<String>,
    pub output: PathBuf,
}

impl Options {
    pub fn new(target: Target, output: impl Into<PathBuf>) -> Self {
        Self {
            target,
            compile_level: CompileLevel::Source,
            verify: true,
            main_override: None,
            output: output.into(),
        }
    }
}

/// The handful of tunables that aren't part of any one invocation's
/// options but still need a single source of truth rather than a
/// scattered literal in each backend (e.g. the default indentation unit a
/// backend falls back to if it doesn't care to override it).
#[derive(Debug, Clone)]
pub struct CompilationDefaults {
    pub indent_unit: String,
    /// Tuple arity ceiling assumed when a backend's capability bits leave
    /// `max_tuple_arity` unset.
    pub fallback_max_tuple_arity: usize,
}

impl Default for CompilationDefaults {
    fn default() -> Self {
        Self {
            indent_unit: "    ".to_string(),
            fallback_max_tuple_arity: 20,
        }
    }
}
