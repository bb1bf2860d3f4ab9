//! Generator configuration
//!
//! `defaults/llrtsp.default.toml` is embedded into the binary. Callers layer a
//! user file and single-key overrides on top through [`Loader`] before
//! deserializing into [`GeneratorConfig`].

use crate::compiler::{CompileOptions, OutputKind};
use crate::output::OutputPaths;
use crate::variant::VariantBinding;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/llrtsp.default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    pub output: OutputConfig,
    pub compiler: CompilerConfig,
    pub header: HeaderConfig,
    pub variants: VariantBinding,
    pub package: PackageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub c_file: String,
    pub header_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    pub prefix: String,
    pub header_name: String,
    pub header_guard: String,
    pub debug: bool,
    pub debug_symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderConfig {
    pub include_guard: String,
    pub strict_flag: String,
    pub version_prefix: String,
    /// Replaces the embedded public API block when set.
    #[serde(default)]
    pub api: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageConfig {
    pub manifest: PathBuf,
}

impl GeneratorConfig {
    /// Options shared by both compiler runs.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            output: OutputKind::CSourceWithHeader,
            header_name: self.compiler.header_name.clone(),
            debug: self
                .compiler
                .debug
                .then(|| self.compiler.debug_symbol.clone()),
            generate_bitcode: false,
            header_guard: self.compiler.header_guard.clone(),
        }
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths::new(&self.output.dir, &self.output.c_file, &self.output.header_file)
    }
}

/// Builds a [`GeneratorConfig`] from `defaults/llrtsp.default.toml` plus
/// whatever the caller stacks on top; later sources win.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Stack a TOML file that must exist (`--config`).
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), true)
    }

    /// Stack a TOML file, skipped silently when missing.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), false)
    }

    /// Pin one dotted key, e.g. `compiler.debug` or `variants.loose`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<GeneratorConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }

    fn layer(mut self, path: &Path, required: bool) -> Self {
        let source = File::from(path).format(FileFormat::Toml).required(required);
        self.builder = self.builder.add_source(source);
        self
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<GeneratorConfig, ConfigError> {
    Loader::new().build()
}

/// Read the version string from a package descriptor: `version` in a
/// `package.json`, `package.version` in anything else (parsed as TOML).
pub fn manifest_version(path: &Path) -> Result<String, ConfigError> {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let (format, key) = if is_json {
        (FileFormat::Json, "version")
    } else {
        (FileFormat::Toml, "package.version")
    };
    Config::builder()
        .add_source(File::from(path).format(format).required(true))
        .build()?
        .get_string(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtsp::Mode;
    use std::fs;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.output.dir, PathBuf::from("build"));
        assert_eq!(config.compiler.prefix, "llrtsp__internal");
        assert_eq!(config.header.strict_flag, "LLRTSP_STRICT_MODE");
        assert_eq!(config.variants, VariantBinding::default());
        assert!(config.header.api.is_none());

        let options = config.compile_options();
        assert_eq!(options.header_guard, "INCLUDE_LLRTSP_ITSELF_H_");
        assert_eq!(options.debug, None);
        assert!(!options.generate_bitcode);

        let paths = config.output_paths();
        assert_eq!(paths.c, PathBuf::from("build/c/llrtsp.c"));
        assert_eq!(paths.header, PathBuf::from("build/llrtsp.h"));
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("compiler.debug", true)
            .unwrap()
            .set_override("variants.loose", "strict")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.compile_options().debug.as_deref(), Some("llrtsp__debug"));
        assert_eq!(config.variants.loose, Mode::Strict);
    }

    #[test]
    fn layers_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llrtsp.toml");
        fs::write(&path, "[output]\ndir = \"out\"\n\n[header]\napi = \"my_api.h\"\n").unwrap();
        let config = Loader::new().with_file(&path).build().unwrap();
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert_eq!(config.output.c_file, "c/llrtsp.c");
        assert_eq!(config.header.api, Some(PathBuf::from("my_api.h")));
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/llrtsp.toml")
            .build()
            .unwrap();
        assert_eq!(config.compiler.header_name, "llrtsp");
    }

    #[test]
    fn rejects_unknown_mode() {
        let result = Loader::new()
            .set_override("variants.loose", "lenient")
            .unwrap()
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn reads_version_from_cargo_and_npm_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let cargo = dir.path().join("Cargo.toml");
        fs::write(&cargo, "[package]\nname = \"x\"\nversion = \"2.5.10\"\n").unwrap();
        assert_eq!(manifest_version(&cargo).unwrap(), "2.5.10");

        let npm = dir.path().join("package.json");
        fs::write(&npm, r#"{ "name": "llrtsp", "version": "1.1.4" }"#).unwrap();
        assert_eq!(manifest_version(&npm).unwrap(), "1.1.4");
    }

    #[test]
    fn manifest_without_version_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cargo = dir.path().join("Cargo.toml");
        fs::write(&cargo, "[package]\nname = \"x\"\n").unwrap();
        assert!(manifest_version(&cargo).is_err());
    }
}
