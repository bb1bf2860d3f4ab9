//! Public header composition
//!
//! The final `llrtsp.h` is, in order: include guard, version macros, the
//! strict-flag default, the merged parser interface, the shared C
//! declarations, the public API block, and the guard close.

use crate::version::VersionTriple;

/// Hand-maintained public API, appended verbatim.
pub const PUBLIC_API: &str = include_str!("../native/api.h");

#[derive(Debug, Clone)]
pub struct HeaderAssembler {
    include_guard: String,
    strict_flag: String,
    version_prefix: String,
    version: VersionTriple,
}

impl HeaderAssembler {
    pub fn new(version: VersionTriple) -> Self {
        HeaderAssembler {
            include_guard: "INCLUDE_LLRTSP_H_".to_string(),
            strict_flag: crate::merge::STRICT_FLAG.to_string(),
            version_prefix: "LLRTSP_VERSION".to_string(),
            version,
        }
    }

    pub fn include_guard(mut self, guard: impl Into<String>) -> Self {
        self.include_guard = guard.into();
        self
    }

    pub fn strict_flag(mut self, flag: impl Into<String>) -> Self {
        self.strict_flag = flag.into();
        self
    }

    pub fn version_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.version_prefix = prefix.into();
        self
    }

    pub fn assemble(&self, merged_header: &str, common: &str, api: &str) -> String {
        let guard = &self.include_guard;
        let flag = &self.strict_flag;
        let mut out = String::with_capacity(merged_header.len() + common.len() + api.len() + 256);

        out.push_str(&format!("#ifndef {}\n#define {}\n\n", guard, guard));
        out.push_str(&self.version.macros(&self.version_prefix));
        out.push('\n');
        // Defaults to the loose parser unless the consumer defines the flag.
        out.push_str(&format!("#ifndef {}\n# define {} 0\n#endif\n\n", flag, flag));
        out.push_str(merged_header);
        out.push('\n');
        out.push_str(common);
        out.push('\n');
        out.push_str(api);
        out.push_str(&format!("\n#endif  /* {} */\n", guard));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> HeaderAssembler {
        HeaderAssembler::new(VersionTriple::new(2, 5, 10))
    }

    #[test]
    fn test_layout() {
        let out = assembler().assemble("HDR", "COMMON", "API");
        insta::assert_snapshot!(out.trim_end(), @r###"
        #ifndef INCLUDE_LLRTSP_H_
        #define INCLUDE_LLRTSP_H_

        #define LLRTSP_VERSION_MAJOR 2
        #define LLRTSP_VERSION_MINOR 5
        #define LLRTSP_VERSION_PATCH 10

        #ifndef LLRTSP_STRICT_MODE
        # define LLRTSP_STRICT_MODE 0
        #endif

        HDR
        COMMON
        API
        #endif  /* INCLUDE_LLRTSP_H_ */
        "###);
    }

    #[test]
    fn test_flag_default_precedes_guarded_fragment() {
        let merged = crate::merge::guard(crate::merge::STRICT_FLAG, "a", "b");
        let out = assembler().assemble(&merged, "", "");
        let default_at = out.find("# define LLRTSP_STRICT_MODE 0").unwrap();
        let guard_at = out.find("#if LLRTSP_STRICT_MODE").unwrap();
        let version_at = out.find("#define LLRTSP_VERSION_PATCH 10").unwrap();
        assert!(version_at < default_at);
        assert!(default_at < guard_at);
    }

    #[test]
    fn test_custom_names() {
        let out = assembler()
            .include_guard("MY_H_")
            .strict_flag("MY_STRICT")
            .version_prefix("MY_VERSION")
            .assemble("", "", "");
        assert!(out.starts_with("#ifndef MY_H_\n#define MY_H_\n\n#define MY_VERSION_MAJOR 2\n"));
        assert!(out.contains("#ifndef MY_STRICT\n# define MY_STRICT 0\n#endif\n"));
        assert!(out.ends_with("\n#endif  /* MY_H_ */\n"));
    }

    #[test]
    fn test_public_api_is_embedded() {
        assert!(PUBLIC_API.contains("llrtsp_execute"));
        assert!(PUBLIC_API.contains("typedef llrtsp__internal_t llrtsp_t;"));
    }
}
