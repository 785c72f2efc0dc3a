use doc_model::DocumentError;
use std::path::PathBuf;
use text_reconciler::ReconcileError;
use thiserror::Error;

/// Why a scenario could not be loaded or did not hold.
///
/// `step` is the zero-based index into the scenario's steps; the initial
/// attach is reported as step 0 with `attach` in the message.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario TOML: {0}")]
    Parse(#[source] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
    #[error("unknown node label '{0}'")]
    UnknownLabel(String),
    #[error("node label '{0}' is used twice")]
    DuplicateLabel(String),
    #[error("step {step}: document edit failed: {source}")]
    Document {
        step: usize,
        #[source]
        source: DocumentError,
    },
    #[error("step {step}: reconciliation failed: {source}")]
    Reconcile {
        step: usize,
        #[source]
        source: ReconcileError,
    },
    #[error("step {step}: surface diverged from the document\n{diff}")]
    SurfaceDiverged { step: usize, diff: String },
    #[error("step {step}: surface rejected edits: {errors:?}")]
    Frontend { step: usize, errors: Vec<String> },
    #[error("step {step}: {message}")]
    Expectation { step: usize, message: String },
}
