//! Error handling design: four error kinds, two severities.
//! `UnsupportedConstruct` is accumulated per-declaration and the driver
//! moves on; the other three abort the run immediately.

use crate::options::Target;
use thiserror::Error;

/// A pointer back into the original source, carried through the resolver's
/// RIR so an error can still be reported against real source text even
/// though this crate never sees that text itself.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SourceToken {
    pub line: usize,
    pub column: usize,
    pub text: String,
}

/// Which driver stage an internal invariant violation was detected in
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStage {
    ModuleOrdering,
    CompilabilityFilter,
    MainMethodDiscovery,
    TailCallTransform,
    DatatypeLowering,
    DefaultValueComputation,
    StatementLowering,
    ExpressionLowering,
    Emission,
}

impl std::fmt::Display for DriverStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DriverStage::ModuleOrdering => "module ordering",
            DriverStage::CompilabilityFilter => "compilability filter",
            DriverStage::MainMethodDiscovery => "main-method discovery",
            DriverStage::TailCallTransform => "tail-call transform",
            DriverStage::DatatypeLowering => "datatype lowering",
            DriverStage::DefaultValueComputation => "default-value computation",
            DriverStage::StatementLowering => "statement lowering",
            DriverStage::ExpressionLowering => "expression lowering",
            DriverStage::Emission => "emission",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// Kind 1: non-fatal, accumulated, surfaced per declaration.
    #[error("unsupported construct `{construct}` for target {target} at {token:?}")]
    UnsupportedConstruct {
        token: SourceToken,
        construct: String,
        target: Target,
    },

    /// Kind 2: fatal.
    #[error("internal invariant violated during {stage}: {detail}")]
    InternalInvariant { stage: DriverStage, detail: String },

    /// Kind 3: fatal.
    #[error("output I/O failure: {0}")]
    OutputIo(#[from] verity_emit::EmitError),

    /// Kind 4: fatal.
    #[error("native tool `{tool}` failed: {stderr}")]
    NativeToolFailure { tool: String, stderr: String },
}

impl CoreError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CoreError::UnsupportedConstruct { .. })
    }
}

/// One entry in a `LoweringReport`. A non-fatal `CoreError` becomes exactly
/// one diagnostic; a fatal one short-circuits the whole run instead of
/// being collected here. Serializable so the CLI's `--json` mode can emit a
/// report without printing through `Display`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
    pub token: SourceToken,
    pub message: String,
}

impl From<&CoreError> for Option<Diagnostic> {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::UnsupportedConstruct { token, construct, target } => Some(Diagnostic {
                token: token.clone(),
                message: format!("`{}` is not supported when targeting {}", construct, target),
            }),
            _ => None,
        }
    }
}
