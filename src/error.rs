//! Top-level failure of a generation run

use crate::compiler::CompileError;
use crate::variant::Variant;
use crate::version::VersionError;
use config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid package version: {0}")]
    Version(#[from] VersionError),

    #[error("failed to compile the {variant} variant: {source}")]
    Compile {
        variant: Variant,
        #[source]
        source: CompileError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GenerateError {
    /// Pipeline stage that failed, for logs and reports.
    pub fn stage(&self) -> &'static str {
        match self {
            GenerateError::Version(_) => "version",
            GenerateError::Compile { .. } => "compile",
            GenerateError::Config(_) => "config",
            GenerateError::Read { .. } => "read",
            GenerateError::Write { .. } => "write",
        }
    }

    /// Variant whose compilation failed, if any.
    pub fn variant(&self) -> Option<Variant> {
        match self {
            GenerateError::Compile { variant, .. } => Some(*variant),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::GrammarError;

    #[test]
    fn test_compile_error_names_variant() {
        let err = GenerateError::Compile {
            variant: Variant::Loose,
            source: CompileError::Grammar(GrammarError::MissingOtherwise("start".into())),
        };
        assert_eq!(err.stage(), "compile");
        assert_eq!(err.variant(), Some(Variant::Loose));
        assert_eq!(
            err.to_string(),
            "failed to compile the loose variant: node 'start' has no otherwise transition"
        );
    }

    #[test]
    fn test_version_error_converts() {
        let err: GenerateError = VersionError::Malformed("x".into()).into();
        assert_eq!(err.stage(), "version");
        assert!(err.variant().is_none());
    }
}
