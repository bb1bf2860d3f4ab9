//! Dual build: one compiler run per variant

use crate::compiler::{Artifact, CompileOptions, Compiler};
use crate::error::GenerateError;
use crate::grammar::Grammar;
use crate::rtsp::Mode;
use crate::variant::{Variant, VariantBinding};
use log::{debug, info};

/// The two artifacts of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub strict: Artifact,
    pub loose: Artifact,
}

impl Artifacts {
    pub fn get(&self, variant: Variant) -> &Artifact {
        match variant {
            Variant::Strict => &self.strict,
            Variant::Loose => &self.loose,
        }
    }
}

/// Compiles the grammar once per slot with the same options. Performs no I/O.
pub struct DualBuild<'a, C: Compiler> {
    compiler: &'a C,
    options: &'a CompileOptions,
    binding: VariantBinding,
}

impl<'a, C: Compiler> DualBuild<'a, C> {
    pub fn new(compiler: &'a C, options: &'a CompileOptions) -> Self {
        DualBuild {
            compiler,
            options,
            binding: VariantBinding::default(),
        }
    }

    pub fn with_binding(mut self, binding: VariantBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Build one slot. `grammar` constructs the grammar for a mode.
    pub fn compile<F>(&self, variant: Variant, grammar: &F) -> Result<Artifact, GenerateError>
    where
        F: Fn(Mode) -> Grammar,
    {
        let mode = self.binding.mode(variant);
        info!("Compiling {} variant ({} grammar)", variant, mode);
        let artifact = self
            .compiler
            .compile(&grammar(mode), self.options)
            .map_err(|source| GenerateError::Compile { variant, source })?;
        debug!(
            "{} variant: {} bytes of C, {} bytes of header",
            variant,
            artifact.c.as_deref().map_or(0, str::len),
            artifact.header.len()
        );
        Ok(artifact)
    }

    /// Build both slots, strict first. The first failure aborts the run.
    pub fn run<F>(&self, grammar: F) -> Result<Artifacts, GenerateError>
    where
        F: Fn(Mode) -> Grammar,
    {
        let strict = self.compile(Variant::Strict, &grammar)?;
        let loose = self.compile(Variant::Loose, &grammar)?;
        Ok(Artifacts { strict, loose })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileError, GrammarError, OutputKind};
    use crate::grammar::Builder;
    use std::cell::RefCell;

    /// Records the prefix of every grammar it sees; fails on `fail_on`.
    struct Recording {
        seen: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl Compiler for Recording {
        fn compile(&self, grammar: &Grammar, _: &CompileOptions) -> Result<Artifact, CompileError> {
            self.seen.borrow_mut().push(grammar.prefix().to_string());
            if Some(grammar.prefix()) == self.fail_on {
                return Err(GrammarError::MissingEntry.into());
            }
            Ok(Artifact {
                c: Some(format!("/* {} */", grammar.prefix())),
                header: String::new(),
            })
        }
    }

    fn recording(fail_on: Option<&'static str>) -> Recording {
        Recording {
            seen: RefCell::new(Vec::new()),
            fail_on,
        }
    }

    fn grammar_named(mode: Mode) -> Grammar {
        let mut b = Builder::new(mode.as_str());
        let start = b.node("start");
        b.build(start)
    }

    fn options() -> CompileOptions {
        CompileOptions {
            output: OutputKind::CSourceWithHeader,
            header_name: "x".into(),
            debug: None,
            generate_bitcode: false,
            header_guard: "X_H_".into(),
        }
    }

    #[test]
    fn test_compiles_each_slot_with_its_mode() {
        let compiler = recording(None);
        let options = options();
        let artifacts = DualBuild::new(&compiler, &options).run(grammar_named).unwrap();
        assert_eq!(*compiler.seen.borrow(), vec!["strict", "loose"]);
        assert_eq!(artifacts.get(Variant::Loose).c.as_deref(), Some("/* loose */"));
    }

    #[test]
    fn test_binding_aliases_loose_slot() {
        let compiler = recording(None);
        let options = options();
        let artifacts = DualBuild::new(&compiler, &options)
            .with_binding(VariantBinding::loose_as_strict())
            .run(grammar_named)
            .unwrap();
        assert_eq!(artifacts.strict, artifacts.loose);
    }

    #[test]
    fn test_failure_names_variant() {
        let compiler = recording(Some("loose"));
        let options = options();
        let err = DualBuild::new(&compiler, &options).run(grammar_named).unwrap_err();
        assert_eq!(err.variant(), Some(Variant::Loose));
    }

    #[test]
    fn test_strict_failure_stops_before_loose() {
        let compiler = recording(Some("strict"));
        let options = options();
        let err = DualBuild::new(&compiler, &options).run(grammar_named).unwrap_err();
        assert_eq!(err.variant(), Some(Variant::Strict));
        assert_eq!(compiler.seen.borrow().len(), 1);
    }
}
