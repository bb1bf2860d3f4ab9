//! State machine compiler
//!
//! Turns a [`Grammar`] into a deterministic, minimized state machine and emits
//! it as C source plus a header fragment. The orchestration layer only sees the
//! [`Compiler`] trait, so another emitter can be swapped in without touching
//! the build or merge code.
//!
//! The reference [`CCompiler`] runs four passes:
//! 1. `validate` - reject inconsistent graphs before any lowering
//! 2. `lower` - match nodes become byte tries, chains collapse into sequences
//! 3. `minimize` - merge structurally equivalent states
//! 4. `emit` - render the header fragment and the C body

mod emit;
mod lower;
mod minimize;
mod validate;

use crate::grammar::Grammar;
use log::debug;
use thiserror::Error;

/// The only output kind this crate's pipeline asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    CSourceWithHeader,
}

/// Knobs passed to every compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub output: OutputKind,
    /// Base name of the header the C body includes (`<name>.h`).
    pub header_name: String,
    /// Debug entry point called from every byte-consuming state, if any.
    pub debug: Option<String>,
    pub generate_bitcode: bool,
    pub header_guard: String,
}

/// Compiler output for one grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// `None` when the compiler produced only declarations.
    pub c: Option<String>,
    pub header: String,
}

/// The grammar graph is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("invalid builder call on node '{node}': {message}")]
    Misuse { node: String, message: String },

    #[error("entry node is out of range")]
    MissingEntry,

    #[error("node '{0}' is unreachable from the entry node")]
    Unreachable(String),

    #[error("node '{0}' has no otherwise transition")]
    MissingOtherwise(String),

    #[error("ambiguous transition on node '{node}': key {key:?} appears more than once")]
    AmbiguousTransition { node: String, key: String },

    #[error("malformed span '{callback}': {message}")]
    MalformedSpan { callback: String, message: String },

    #[error("node '{node}' refers to undeclared property '{property}'")]
    UnknownProperty { node: String, property: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("unsupported output: {0}")]
    UnsupportedOutput(String),
}

/// A pluggable grammar-to-code engine.
pub trait Compiler {
    fn compile(&self, grammar: &Grammar, options: &CompileOptions) -> Result<Artifact, CompileError>;
}

impl<C: Compiler + ?Sized> Compiler for &C {
    fn compile(&self, grammar: &Grammar, options: &CompileOptions) -> Result<Artifact, CompileError> {
        (**self).compile(grammar, options)
    }
}

/// Reference engine emitting C.
#[derive(Debug, Clone, Copy, Default)]
pub struct CCompiler;

impl CCompiler {
    pub fn new() -> Self {
        CCompiler
    }
}

impl Compiler for CCompiler {
    fn compile(&self, grammar: &Grammar, options: &CompileOptions) -> Result<Artifact, CompileError> {
        if options.generate_bitcode {
            return Err(CompileError::UnsupportedOutput(
                "bitcode generation is not available in the C emitter".to_string(),
            ));
        }

        validate::validate(grammar)?;
        let machine = lower::lower(grammar);
        let lowered = machine.states.len();
        let machine = minimize::minimize(machine);
        debug!(
            "{}: {} states after lowering, {} after minimization",
            grammar.prefix(),
            lowered,
            machine.states.len()
        );

        let header = emit::header(grammar, options);
        let c = emit::body(grammar, &machine, options);
        Ok(Artifact { c: Some(c), header })
    }
}
