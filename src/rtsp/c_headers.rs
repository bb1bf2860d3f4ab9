//! Shared C declarations: the enums and X-macros every variant relies on
//!
//! The output is identical for strict and loose builds, so it is emitted once
//! into the merged header, outside the strict-mode guard.

use super::constants::{flags, Error, Finish, MessageType, Method};

const GUARD: &str = "LLRTSP_C_HEADERS_";

#[derive(Debug, Default)]
pub struct CHeaders;

impl CHeaders {
    pub fn new() -> Self {
        CHeaders
    }

    pub fn build(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("#ifndef {}\n#define {}\n", GUARD, GUARD));
        out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");

        let errors: Vec<(String, i64)> = Error::ALL
            .iter()
            .map(|e| (format!("HPE_{}", e.name()), e.code() as i64))
            .collect();
        enumeration(&mut out, "llrtsp_errno", &errors, false);

        let bits: Vec<(String, i64)> = flags::ALL
            .iter()
            .map(|(name, bit)| (format!("F_{}", name), *bit))
            .collect();
        enumeration(&mut out, "llrtsp_flags", &bits, true);

        let types: Vec<(String, i64)> = MessageType::ALL
            .iter()
            .map(|t| (format!("RTSP_{}", t.name()), t.value()))
            .collect();
        enumeration(&mut out, "llrtsp_type", &types, false);

        let finish: Vec<(String, i64)> = Finish::ALL
            .iter()
            .map(|f| (format!("RTSP_FINISH_{}", f.name()), f.value()))
            .collect();
        enumeration(&mut out, "llrtsp_finish", &finish, false);

        let methods: Vec<(String, i64)> = Method::ALL
            .iter()
            .map(|m| (format!("RTSP_{}", m.token()), m.value()))
            .collect();
        enumeration(&mut out, "llrtsp_method", &methods, false);

        let errno_map: Vec<String> = Error::ALL
            .iter()
            .map(|e| format!("XX({}, {}, {})", e.code(), e.name(), e.name()))
            .collect();
        x_macro(&mut out, "RTSP_ERRNO_MAP", &errno_map);

        let method_map: Vec<String> = Method::ALL
            .iter()
            .map(|m| format!("XX({}, {}, {})", m.value(), m.token(), m.token()))
            .collect();
        x_macro(&mut out, "RTSP_METHOD_MAP", &method_map);

        out.push_str("#ifdef __cplusplus\n}  /* extern \"C\" */\n#endif\n");
        out.push_str(&format!("#endif  /* {} */\n", GUARD));
        out
    }
}

fn enumeration(out: &mut String, name: &str, items: &[(String, i64)], hex: bool) {
    out.push_str(&format!("enum {} {{\n", name));
    for (i, (item, value)) in items.iter().enumerate() {
        let sep = if i + 1 == items.len() { "" } else { "," };
        if hex {
            out.push_str(&format!("  {} = 0x{:x}{}\n", item, value, sep));
        } else {
            out.push_str(&format!("  {} = {}{}\n", item, value, sep));
        }
    }
    out.push_str("};\n");
    out.push_str(&format!("typedef enum {} {}_t;\n\n", name, name));
}

fn x_macro(out: &mut String, name: &str, rows: &[String]) {
    out.push_str(&format!("#define {}(XX) \\\n", name));
    for row in rows {
        out.push_str(&format!("  {} \\\n", row));
    }
    out.push_str("\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enums_and_typedefs() {
        let out = CHeaders::new().build();
        assert!(out.starts_with("#ifndef LLRTSP_C_HEADERS_\n"));
        assert!(out.contains("  HPE_OK = 0,\n"));
        assert!(out.contains("  HPE_USER = 23\n};\ntypedef enum llrtsp_errno llrtsp_errno_t;\n"));
        assert!(out.contains("  F_TRANSFER_ENCODING = 0x200\n"));
        assert!(out.contains("  RTSP_FINISH_SAFE_WITH_CB = 1,\n"));
        assert!(out.contains("typedef enum llrtsp_method llrtsp_method_t;"));
        assert!(out.ends_with("#endif  /* LLRTSP_C_HEADERS_ */\n"));
    }

    #[test]
    fn test_x_macros() {
        let out = CHeaders::new().build();
        assert!(out.contains("#define RTSP_ERRNO_MAP(XX) \\\n  XX(0, OK, OK) \\\n"));
        assert!(out.contains("  XX(2, GET_PARAMETER, GET_PARAMETER) \\\n"));
        assert!(out.contains("  XX(10, TEARDOWN, TEARDOWN) \\\n\n\n"));
    }

    #[test]
    fn test_output_is_stable() {
        assert_eq!(CHeaders::new().build(), CHeaders::new().build());
    }
}
