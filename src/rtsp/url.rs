//! Request-URI sub-grammar
//!
//! Accepts `*`, an absolute path, or `scheme://server[/path][?query][#fragment]`.
//! The URL ends at the first space, which is left for the request line.

use super::constants::{self, Error, ALPHA, NUM};
use super::Mode;
use crate::grammar::{Builder, NodeId, SpanId};

const SERVER_PUNCT: &str = "-._~%!$&'()*+,;=:@[]";
const SCHEME_PUNCT: &str = "+-.";

pub struct Url<'b> {
    b: &'b mut Builder,
    mode: Mode,
}

impl<'b> Url<'b> {
    pub fn new(b: &'b mut Builder, mode: Mode) -> Self {
        Url { b, mode }
    }

    /// Wire the URL states; returns the node that opens `span`. Control
    /// reaches `next` with the terminating space still unread.
    pub fn build(self, span: SpanId, next: NodeId) -> NodeId {
        let Url { b, mode } = self;

        let start = b.span_start(span);
        let end = b.span_end(span);
        b.otherwise(end, next);

        let entry = b.node("url_entry");
        let schema = b.node("url_schema");
        let schema_delim = b.node("url_schema_delim");
        let server = b.node("url_server");
        let path = b.node("url_path");
        let query = b.node("url_query");
        let fragment = b.node("url_fragment");
        let asterisk = b.node("url_asterisk");

        b.otherwise(start, entry);

        let e = b.error(Error::InvalidUrl.code(), "Unexpected start char in url");
        b.on(entry, "/", path)
            .on(entry, "*", asterisk)
            .on_any(entry, ALPHA, schema)
            .otherwise(entry, e);

        let e = b.error(Error::InvalidUrl.code(), "Unexpected char in url schema");
        b.on_any(schema, ALPHA, schema)
            .on_any(schema, NUM, schema)
            .on_any(schema, SCHEME_PUNCT, schema)
            .on(schema, ":", schema_delim)
            .otherwise(schema, e);
        b.on(schema_delim, "//", server).otherwise(schema_delim, e);

        let e = b.error(Error::InvalidUrl.code(), "Unexpected char in url server");
        b.on_any(server, ALPHA, server)
            .on_any(server, NUM, server)
            .on_any(server, SERVER_PUNCT, server)
            .on(server, "/", path)
            .on(server, "?", query)
            .peek(server, " ", end)
            .otherwise(server, e);

        let high: Vec<u8> = match mode {
            Mode::Strict => Vec::new(),
            Mode::Loose => (0x80u8..=0xff).collect(),
        };

        let e = b.error(Error::InvalidUrl.code(), "Invalid char in url path");
        b.on_any(path, constants::url_chars(b"?#"), path)
            .on_any(path, &high, path)
            .on(path, "?", query)
            .on(path, "#", fragment)
            .peek(path, " ", end)
            .otherwise(path, e);

        let e = b.error(Error::InvalidUrl.code(), "Invalid char in url query");
        b.on_any(query, constants::url_chars(b"#"), query)
            .on_any(query, &high, query)
            .on(query, "#", fragment)
            .peek(query, " ", end)
            .otherwise(query, e);

        let e = b.error(Error::InvalidUrl.code(), "Invalid char in url fragment");
        b.on_any(fragment, constants::url_chars(b""), fragment)
            .on_any(fragment, &high, fragment)
            .peek(fragment, " ", end)
            .otherwise(fragment, e);

        let e = b.error(Error::InvalidUrl.code(), "Expected space after `*`");
        b.peek(asterisk, " ", end).otherwise(asterisk, e);

        start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, NodeKind};

    fn url_grammar(mode: Mode) -> Grammar {
        let mut b = Builder::new("u");
        let span = b.span("u__on_url");
        let done = b.node("done");
        let start = Url::new(&mut b, mode).build(span, done);
        b.skip_to(done, start);
        b.build(start)
    }

    fn path_edge_count(g: &Grammar) -> usize {
        let path = g.nodes().iter().find(|n| n.name == "url_path").unwrap();
        match &path.kind {
            NodeKind::Match { edges, .. } => edges.len(),
            _ => panic!("Expected match node"),
        }
    }

    #[test]
    fn test_loose_path_accepts_high_bytes() {
        let strict = url_grammar(Mode::Strict);
        let loose = url_grammar(Mode::Loose);
        assert_eq!(path_edge_count(&loose), path_edge_count(&strict) + 128);
    }

    #[test]
    fn test_url_grammar_validates() {
        use crate::compiler::{CCompiler, CompileOptions, Compiler, OutputKind};
        let options = CompileOptions {
            output: OutputKind::CSourceWithHeader,
            header_name: "u".into(),
            debug: None,
            generate_bitcode: false,
            header_guard: "U_H_".into(),
        };
        for mode in [Mode::Strict, Mode::Loose] {
            let artifact = CCompiler::new().compile(&url_grammar(mode), &options);
            assert!(artifact.is_ok(), "{:?}: {:?}", mode, artifact.err());
        }
    }
}
