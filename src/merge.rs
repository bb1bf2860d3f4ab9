//! Folding the strict and loose artifacts into one text per output
//!
//! Equality is byte equality. When the two texts match the result is that
//! text unchanged, otherwise both are kept under a preprocessor guard:
//!
//! ```text
//! #if FLAG
//!
//! <strict>
//!
//! #else  /* !FLAG */
//!
//! <loose>
//!
//! #endif  /* FLAG */
//! ```

use crate::compiler::Artifact;
use log::debug;

/// Preprocessor flag selecting the strict parser.
pub const STRICT_FLAG: &str = "LLRTSP_STRICT_MODE";

pub fn guard(flag: &str, strict: &str, loose: &str) -> String {
    if strict == loose {
        return strict.to_string();
    }
    let mut out = String::with_capacity(strict.len() + loose.len() + 3 * flag.len() + 48);
    out.push_str(&format!("#if {}\n\n", flag));
    out.push_str(strict);
    out.push_str(&format!("\n\n#else  /* !{} */\n\n", flag));
    out.push_str(loose);
    out.push_str(&format!("\n\n#endif  /* {} */\n", flag));
    out
}

/// Both merged texts plus whether each needed a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub c: String,
    pub header: String,
    pub c_guarded: bool,
    pub header_guarded: bool,
}

/// Merge C bodies and header fragments independently. A missing C body
/// counts as empty text.
pub fn merge_artifacts(flag: &str, strict: &Artifact, loose: &Artifact) -> Merged {
    let strict_c = strict.c.as_deref().unwrap_or("");
    let loose_c = loose.c.as_deref().unwrap_or("");
    let c_guarded = strict_c != loose_c;
    let header_guarded = strict.header != loose.header;
    debug!(
        "merge: C body {}, header fragment {}",
        if c_guarded { "guarded" } else { "shared" },
        if header_guarded { "guarded" } else { "shared" }
    );
    Merged {
        c: guard(flag, strict_c, loose_c),
        header: guard(flag, &strict.header, &loose.header),
        c_guarded,
        header_guarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn artifact(c: Option<&str>, header: &str) -> Artifact {
        Artifact {
            c: c.map(str::to_string),
            header: header.to_string(),
        }
    }

    #[test]
    fn test_guard_layout() {
        insta::assert_snapshot!(guard("FLAG", "strict body", "loose body").trim_end(), @r###"
        #if FLAG

        strict body

        #else  /* !FLAG */

        loose body

        #endif  /* FLAG */
        "###);
    }

    #[test]
    fn test_equal_texts_are_returned_unchanged() {
        assert_eq!(guard("FLAG", "same", "same"), "same");
        assert_eq!(guard("FLAG", "", ""), "");
    }

    #[test]
    fn test_missing_bodies_merge_as_empty() {
        let merged = merge_artifacts(STRICT_FLAG, &artifact(None, "h"), &artifact(None, "h"));
        assert_eq!(merged.c, "");
        assert!(!merged.c_guarded);
        assert_eq!(merged.header, "h");
    }

    #[test]
    fn test_one_missing_body_is_guarded() {
        let merged = merge_artifacts(STRICT_FLAG, &artifact(Some("int x;"), "h"), &artifact(None, "h"));
        assert!(merged.c_guarded);
        assert!(merged.c.contains("#if LLRTSP_STRICT_MODE\n\nint x;\n\n#else"));
    }

    #[test]
    fn test_outputs_are_merged_independently() {
        let merged = merge_artifacts(
            STRICT_FLAG,
            &artifact(Some("body"), "strict header"),
            &artifact(Some("body"), "loose header"),
        );
        assert_eq!(merged.c, "body");
        assert!(!merged.c_guarded);
        assert!(merged.header_guarded);
        assert_eq!(merged.header.matches("#if LLRTSP_STRICT_MODE").count(), 1);
    }

    proptest! {
        #[test]
        fn merge_of_identical_texts_is_identity(text in ".*") {
            prop_assert_eq!(guard(STRICT_FLAG, &text, &text), text);
        }

        #[test]
        fn merge_of_distinct_texts_keeps_both_in_order(
            strict in "[a-z ]{0,40}",
            loose in "[a-z ]{0,40}",
        ) {
            prop_assume!(strict != loose);
            let out = guard(STRICT_FLAG, &strict, &loose);

            prop_assert_eq!(out.matches("#if ").count(), 1);
            prop_assert_eq!(out.matches("#else").count(), 1);
            prop_assert_eq!(out.matches("#endif").count(), 1);

            let open = format!("#if {}\n\n", STRICT_FLAG);
            let (head, rest) = out.split_at(open.len());
            prop_assert_eq!(head, open.as_str());
            let else_at = rest.find("\n\n#else").unwrap();
            prop_assert_eq!(&rest[..else_at], strict.as_str());
            let endif_at = rest.find("\n\n#endif").unwrap();
            let loose_start = rest.find("*/\n\n").unwrap() + 4;
            prop_assert_eq!(&rest[loose_start..endif_at], loose.as_str());
        }
    }
}
