//! # llrtsp
//!
//! Generator for an allocation-free RTSP/1.0 parser emitted as C.
//!
//! The RTSP grammar ([`rtsp`]) is built twice, once strict and once loose, and
//! compiled by a [`compiler::Compiler`] into C source plus a header fragment.
//! The two artifacts are folded into one `llrtsp.c` and one `llrtsp.h`; where
//! they differ, the texts sit under `#if LLRTSP_STRICT_MODE` so the consumer
//! picks a parser at compile time.
//!
//! ## Layout
//!
//! - [`grammar`]: grammar graph and its builder
//! - [`compiler`]: validation, lowering, minimization and C emission
//! - [`rtsp`]: the RTSP grammar, its constants and the shared C declarations
//! - [`build`], [`merge`], [`header`], [`output`]: the generation stages
//! - [`generate`]: the pipeline tying the stages together
//! - [`config`]: layered configuration with embedded defaults

pub mod build;
pub mod compiler;
pub mod config;
pub mod error;
pub mod generate;
pub mod grammar;
pub mod header;
pub mod merge;
pub mod output;
pub mod rtsp;
pub mod variant;
pub mod version;

pub use error::GenerateError;
pub use generate::{Generator, Rendered, Report};
pub use variant::{Variant, VariantBinding};
pub use version::VersionTriple;
