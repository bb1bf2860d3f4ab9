//! The generation pipeline
//!
//! version -> compile strict -> compile loose -> merge -> assemble -> write.
//! Every stage before `write` is pure, and the version is parsed before any
//! compiler runs.

use crate::build::DualBuild;
use crate::compiler::Compiler;
use crate::config::{self, GeneratorConfig};
use crate::error::GenerateError;
use crate::header::{HeaderAssembler, PUBLIC_API};
use crate::merge::merge_artifacts;
use crate::output::OutputWriter;
use crate::rtsp::{self, CHeaders};
use crate::version::VersionTriple;
use log::info;
use serde::Serialize;
use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;

/// Final texts of a run, before anything touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub version: VersionTriple,
    pub c: String,
    pub header: String,
    pub c_guarded: bool,
    pub header_guarded: bool,
}

/// Summary printed by the binary after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub version: VersionTriple,
    pub c_path: PathBuf,
    pub header_path: PathBuf,
    pub c_bytes: usize,
    pub header_bytes: usize,
    pub c_guarded: bool,
    pub header_guarded: bool,
}

pub struct Generator<C: Compiler> {
    compiler: C,
    config: GeneratorConfig,
}

impl<C: Compiler> Generator<C> {
    pub fn new(compiler: C, config: GeneratorConfig) -> Self {
        Generator { compiler, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Produce both output texts for `version` without writing them.
    pub fn render(&self, version: &str) -> Result<Rendered, GenerateError> {
        let version: VersionTriple = version.parse()?;
        info!("Generating llrtsp {}", version);

        let options = self.config.compile_options();
        let prefix = self.config.compiler.prefix.as_str();
        let artifacts = DualBuild::new(&self.compiler, &options)
            .with_binding(self.config.variants)
            .run(|mode| rtsp::grammar(prefix, mode))?;

        info!("Merging variants");
        let merged = merge_artifacts(&self.config.header.strict_flag, &artifacts.strict, &artifacts.loose);

        info!("Assembling header");
        let api = self.public_api()?;
        let header = HeaderAssembler::new(version)
            .include_guard(self.config.header.include_guard.as_str())
            .strict_flag(self.config.header.strict_flag.as_str())
            .version_prefix(self.config.header.version_prefix.as_str())
            .assemble(&merged.header, &CHeaders::new().build(), &api);

        Ok(Rendered {
            version,
            c: merged.c,
            header,
            c_guarded: merged.c_guarded,
            header_guarded: merged.header_guarded,
        })
    }

    /// Render and write both files.
    pub fn generate(&self, version: &str) -> Result<Report, GenerateError> {
        let rendered = self.render(version)?;
        let writer = OutputWriter::new(self.config.output_paths());
        info!(
            "Writing {} and {}",
            writer.paths().c.display(),
            writer.paths().header.display()
        );
        writer.write(&rendered.c, &rendered.header)?;

        Ok(Report {
            version: rendered.version,
            c_path: writer.paths().c.clone(),
            header_path: writer.paths().header.clone(),
            c_bytes: rendered.c.len(),
            header_bytes: rendered.header.len(),
            c_guarded: rendered.c_guarded,
            header_guarded: rendered.header_guarded,
        })
    }

    /// [`generate`](Self::generate) with the version read from the configured
    /// package descriptor.
    pub fn generate_from_manifest(&self) -> Result<Report, GenerateError> {
        let version = config::manifest_version(&self.config.package.manifest)?;
        self.generate(&version)
    }

    fn public_api(&self) -> Result<Cow<'static, str>, GenerateError> {
        match &self.config.header.api {
            Some(path) => fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| GenerateError::Read {
                    path: path.clone(),
                    source,
                }),
            None => Ok(Cow::Borrowed(PUBLIC_API)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CCompiler;
    use crate::config::load_defaults;

    #[test]
    fn test_render_guards_c_for_distinct_modes() {
        let generator = Generator::new(CCompiler::new(), load_defaults().unwrap());
        let rendered = generator.render("1.0.0").unwrap();
        assert!(rendered.c_guarded);
        assert!(!rendered.header_guarded);
        assert_eq!(rendered.c.matches("#if LLRTSP_STRICT_MODE\n").count(), 1);
        assert!(rendered.header.contains("#define LLRTSP_VERSION_MAJOR 1\n"));
        assert!(rendered.header.contains("RTSP_METHOD_MAP"));
        assert!(rendered.header.contains("llrtsp_settings_s"));
    }

    #[test]
    fn test_bad_version_fails_fast() {
        let generator = Generator::new(CCompiler::new(), load_defaults().unwrap());
        let err = generator.render("not-a-version").unwrap_err();
        assert_eq!(err.stage(), "version");
    }

    #[test]
    fn test_missing_api_override_is_a_read_error() {
        let mut config = load_defaults().unwrap();
        config.header.api = Some(PathBuf::from("/nonexistent/api.h"));
        let err = Generator::new(CCompiler::new(), config).render("1.0.0").unwrap_err();
        assert_eq!(err.stage(), "read");
    }
}
