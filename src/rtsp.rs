//! The RTSP/1.0 grammar in its strict and loose interpretations

pub mod c_headers;
pub mod constants;
pub mod parser;
pub mod url;

pub use c_headers::CHeaders;
pub use parser::Rtsp;
pub use url::Url;

use crate::grammar::{Builder, Grammar};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of every symbol in the generated parser.
pub const INTERNAL_PREFIX: &str = "llrtsp__internal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Strict,
    Loose,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Strict => "strict",
            Mode::Loose => "loose",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Mode::Strict),
            "loose" => Ok(Mode::Loose),
            other => Err(format!("unknown mode '{}', expected strict or loose", other)),
        }
    }
}

/// Build the complete RTSP grammar for `mode`.
pub fn grammar(prefix: &str, mode: Mode) -> Grammar {
    let mut b = Builder::new(prefix);
    let entry = Rtsp::new(&mut b, mode).build();
    b.build(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CCompiler, CompileOptions, Compiler, OutputKind};

    fn options() -> CompileOptions {
        CompileOptions {
            output: OutputKind::CSourceWithHeader,
            header_name: "llrtsp".into(),
            debug: None,
            generate_bitcode: false,
            header_guard: "INCLUDE_LLRTSP_ITSELF_H_".into(),
        }
    }

    #[test]
    fn test_mode_parses() {
        assert_eq!("strict".parse::<Mode>(), Ok(Mode::Strict));
        assert_eq!("loose".parse::<Mode>(), Ok(Mode::Loose));
        assert!("lenient".parse::<Mode>().is_err());
        assert_eq!(Mode::Loose.to_string(), "loose");
    }

    #[test]
    fn test_both_modes_compile() {
        for mode in [Mode::Strict, Mode::Loose] {
            let g = grammar(INTERNAL_PREFIX, mode);
            let artifact = CCompiler::new().compile(&g, &options());
            assert!(artifact.is_ok(), "{}: {:?}", mode, artifact.err());
        }
    }

    #[test]
    fn test_modes_produce_different_bodies() {
        let compile = |mode| {
            CCompiler::new()
                .compile(&grammar(INTERNAL_PREFIX, mode), &options())
                .unwrap()
        };
        let strict = compile(Mode::Strict);
        let loose = compile(Mode::Loose);
        assert_ne!(strict.c, loose.c);
        // Same properties and spans, so the interface is shared.
        assert_eq!(strict.header, loose.header);
    }

    #[test]
    fn test_compiled_body_names_callbacks() {
        let artifact = CCompiler::new()
            .compile(&grammar(INTERNAL_PREFIX, Mode::Strict), &options())
            .unwrap();
        let c = artifact.c.unwrap();
        for callback in [
            "llrtsp__on_message_begin",
            "llrtsp__on_url",
            "llrtsp__on_header_value",
            "llrtsp__after_message_complete",
        ] {
            assert!(c.contains(callback), "missing {}", callback);
        }
        assert!(c.contains("#include \"llrtsp.h\""));
    }
}
