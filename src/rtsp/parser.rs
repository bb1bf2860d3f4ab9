//! RTSP/1.0 message grammar
//!
//! One grammar covers requests and responses. The `type` property selects the
//! start line (0 detects it from the first word). Strict and loose builds share
//! every state; they differ only in the line-ending edges, the header-name and
//! header-value byte classes, and what happens after `on_message_complete`
//! asks to close the connection.

use super::constants::{self, flags, Error, Finish, HeaderState, MessageType, Method};
use super::url::Url;
use super::Mode;
use crate::grammar::{Builder, Code, NodeId, PropertyType, SpanId, Transform};

/// Callback names, exported by the native glue.
pub const ON_MESSAGE_BEGIN: &str = "llrtsp__on_message_begin";
pub const BEFORE_HEADERS_COMPLETE: &str = "llrtsp__before_headers_complete";
pub const ON_HEADERS_COMPLETE: &str = "llrtsp__on_headers_complete";
pub const AFTER_HEADERS_COMPLETE: &str = "llrtsp__after_headers_complete";
pub const ON_MESSAGE_COMPLETE: &str = "llrtsp__on_message_complete";
pub const AFTER_MESSAGE_COMPLETE: &str = "llrtsp__after_message_complete";

/// Properties of the generated `llrtsp__internal_t`, in struct order.
pub const PROPERTIES: [(PropertyType, &str); 11] = [
    (PropertyType::I8, "type"),
    (PropertyType::I8, "method"),
    (PropertyType::I8, "rtsp_major"),
    (PropertyType::I8, "rtsp_minor"),
    (PropertyType::I8, "header_state"),
    (PropertyType::I16, "flags"),
    (PropertyType::I8, "upgrade"),
    (PropertyType::I8, "finish"),
    (PropertyType::I16, "status_code"),
    (PropertyType::I64, "content_length"),
    (PropertyType::Ptr, "settings"),
];

struct Spans {
    url: SpanId,
    status: SpanId,
    header_field: SpanId,
    header_value: SpanId,
    body: SpanId,
}

pub struct Rtsp<'b> {
    b: &'b mut Builder,
    mode: Mode,
    spans: Spans,
}

impl<'b> Rtsp<'b> {
    /// Declares the properties and spans on `b`.
    pub fn new(b: &'b mut Builder, mode: Mode) -> Self {
        for (ty, name) in PROPERTIES {
            b.property(ty, name);
        }
        let spans = Spans {
            url: b.span("llrtsp__on_url"),
            status: b.span("llrtsp__on_status"),
            header_field: b.span("llrtsp__on_header_field"),
            header_value: b.span("llrtsp__on_header_value"),
            body: b.span("llrtsp__on_body"),
        };
        Rtsp { b, mode, spans }
    }

    /// Wire the whole message grammar and return its entry node.
    pub fn build(mut self) -> NodeId {
        let start = self.b.node("start");
        let header_field_start = self.b.node("header_field_start");

        let req = self.request_line(header_field_start);
        let res = self.response_line(header_field_start);
        let headers_done = self.headers(header_field_start);
        self.message(start, req, res, headers_done);

        start
    }

    fn message(&mut self, start: NodeId, req: StartLine, res: NodeId, headers_done: NodeId) {
        let reset_finish = self.update("finish", Finish::Unsafe.value());
        let reset_length = self.update("content_length", 0);
        let on_begin = self.b.invoke(Code::Match(ON_MESSAGE_BEGIN.into()));
        let load_type = self.b.invoke(Code::Load("type".into()));
        let start_req = self.b.node("start_req");
        let start_res = self.b.node("start_res");
        let start_req_or_res = self.b.node("start_req_or_res");

        self.b
            .on(start, "\r", start)
            .on(start, "\n", start)
            .otherwise(start, reset_finish);
        self.b.otherwise(reset_finish, reset_length);
        self.b.otherwise(reset_length, on_begin);

        let e = self.err(Error::CbMessageBegin, "`on_message_begin` callback error");
        self.b.map(on_begin, 0, load_type).otherwise(on_begin, e);

        self.b
            .map(load_type, MessageType::Request.value(), start_req)
            .map(load_type, MessageType::Response.value(), start_res)
            .otherwise(load_type, start_req_or_res);

        let e = self.err(Error::InvalidMethod, "Invalid method encountered");
        self.b
            .select(start_req, Method::select_map(), req.method)
            .otherwise(start_req, e);

        let e = self.err(Error::InvalidConstant, "Expected RTSP/");
        self.b.on(start_res, "RTSP/", res).otherwise(start_res, e);

        // Detection: a method makes this a request, `RTSP/` a response.
        let store_method = self.b.invoke(Code::Store("method".into()));
        let as_request = self.update("type", MessageType::Request.value());
        let as_response = self.update("type", MessageType::Response.value());
        self.b.otherwise(store_method, as_request);
        self.b.otherwise(as_request, req.after_method);
        self.b.otherwise(as_response, res);

        let e = self.err(Error::InvalidConstant, "Invalid word encountered");
        self.b
            .select(start_req_or_res, Method::select_map(), store_method)
            .on(start_req_or_res, "RTSP/", as_response)
            .otherwise(start_req_or_res, e);

        let body = self.body(headers_done);
        let done = self.message_done(start);
        self.b.otherwise(body.after, done);
        for (value, target) in body.dispatch {
            let target = match target {
                BodyTarget::Node(node) => node,
                BodyTarget::Done => done,
            };
            self.b.map(body.after_headers, value, target);
        }
    }

    fn request_line(&mut self, next: NodeId) -> StartLine {
        let store_method = self.b.invoke(Code::Store("method".into()));
        let first_space = self.b.node("req_first_space");
        let spaces_before_url = self.b.node("req_spaces_before_url");
        let rtsp_start = self.b.node("req_rtsp_start");
        let line_end = self.b.node("req_line_end");

        self.b.otherwise(store_method, first_space);

        let e = self.err(Error::InvalidConstant, "Expected space after method");
        self.b.on(first_space, " ", spaces_before_url).otherwise(first_space, e);

        let url = Url::new(&mut *self.b, self.mode).build(self.spans.url, rtsp_start);
        self.b
            .on(spaces_before_url, " ", spaces_before_url)
            .otherwise(spaces_before_url, url);

        let version = self.version("req_rtsp", line_end);
        let e = self.err(Error::InvalidConstant, "Expected RTSP/");
        self.b
            .on(rtsp_start, " ", rtsp_start)
            .on(rtsp_start, "RTSP/", version)
            .otherwise(rtsp_start, e);

        self.line_end(line_end, next);
        let e = self.err(Error::InvalidVersion, "Expected CRLF after version");
        self.b.otherwise(line_end, e);

        StartLine {
            method: store_method,
            after_method: first_space,
        }
    }

    fn response_line(&mut self, next: NodeId) -> NodeId {
        let after_version = self.b.node("res_after_version");
        let code_reset = self.update("status_code", 0);
        let code = self.b.node("res_status_code");
        let code_acc = self.b.invoke(Code::MulAdd {
            field: "status_code".into(),
            base: 10,
            max: Some(999),
        });
        let code_done = self.b.node("res_status_code_done");
        let status_start = self.b.span_start(self.spans.status);
        let status = self.b.node("res_status");
        let status_end = self.b.span_end(self.spans.status);
        let line_end = self.b.node("res_line_end");

        let version = self.version("res_rtsp", after_version);

        let e = self.err(Error::InvalidVersion, "Expected space after version");
        self.b.on(after_version, " ", code_reset).otherwise(after_version, e);
        self.b.otherwise(code_reset, code);

        let e = self.err(Error::InvalidStatus, "Invalid status code");
        self.b
            .select(code, constants::num_map(), code_acc)
            .otherwise(code, code_done);
        self.b.map(code_acc, 1, e).otherwise(code_acc, code);

        self.b.on(code_done, " ", status_start);
        self.line_end(code_done, next);
        let e = self.err(Error::InvalidStatus, "Invalid response status");
        self.b.otherwise(code_done, e);

        self.b.otherwise(status_start, status);
        self.b
            .peek(status, "\r", status_end)
            .peek(status, "\n", status_end)
            .skip_to(status, status);
        self.b.otherwise(status_end, line_end);

        self.line_end(line_end, next);
        let e = self.err(Error::LfExpected, "Expected LF after response line");
        self.b.otherwise(line_end, e);

        version
    }

    /// `<major>.<minor>` after the `RTSP/` literal.
    fn version(&mut self, tag: &str, next: NodeId) -> NodeId {
        let major = self.b.node(&format!("{}_major", tag));
        let store_major = self.b.invoke(Code::Store("rtsp_major".into()));
        let dot = self.b.node(&format!("{}_dot", tag));
        let minor = self.b.node(&format!("{}_minor", tag));
        let store_minor = self.b.invoke(Code::Store("rtsp_minor".into()));

        let e = self.err(Error::InvalidVersion, "Invalid major version");
        self.b
            .select(major, constants::num_map(), store_major)
            .otherwise(major, e);
        self.b.otherwise(store_major, dot);

        let e = self.err(Error::InvalidVersion, "Expected dot");
        self.b.on(dot, ".", minor).otherwise(dot, e);

        let e = self.err(Error::InvalidVersion, "Invalid minor version");
        self.b
            .select(minor, constants::num_map(), store_minor)
            .otherwise(minor, e);
        self.b.otherwise(store_minor, next);

        major
    }

    /// Returns the state reached once the empty line ends the header block.
    fn headers(&mut self, field_start: NodeId) -> NodeId {
        let headers_done = self.b.invoke(Code::Match(BEFORE_HEADERS_COMPLETE.into()));

        let field_span = self.b.span_start(self.spans.header_field);
        let field = self.b.node("header_field");
        let store_state = self.b.invoke(Code::Store("header_state".into()));
        let colon = self.b.node("header_field_colon");
        let general_reset = self.update("header_state", HeaderState::General.value());
        let general = self.b.node("header_field_general");
        let field_end = self.b.span_end(self.spans.header_field);
        let field_sep = self.b.node("header_field_sep");

        self.line_end(field_start, headers_done);
        self.b.otherwise(field_start, field_span);
        self.b.otherwise(field_span, field);

        self.b
            .transform(field, Transform::ToLowerUnsafe)
            .select(field, HeaderState::special_headers(), store_state)
            .otherwise(field, general_reset);
        self.b.otherwise(store_state, colon);
        self.b.peek(colon, ":", field_end).otherwise(colon, general_reset);
        self.b.otherwise(general_reset, general);

        let field_chars = match self.mode {
            Mode::Strict => constants::token_chars(),
            Mode::Loose => constants::loose_header_field_chars(),
        };
        let e = self.err(Error::InvalidHeaderToken, "Invalid header field char");
        self.b
            .on_any(general, field_chars, general)
            .peek(general, ":", field_end)
            .otherwise(general, e);

        self.b.otherwise(field_end, field_sep);
        let value = self.header_value(field_start);
        let e = self.err(Error::InvalidHeaderToken, "Expected `:` after header field");
        self.b.on(field_sep, ":", value).otherwise(field_sep, e);

        headers_done
    }

    fn header_value(&mut self, field_start: NodeId) -> NodeId {
        let discard_ws = self.b.node("header_value_discard_ws");
        let discard_lws = self.b.node("header_value_discard_lws");
        let empty_start = self.b.span_start(self.spans.header_value);
        let empty_end = self.b.span_end(self.spans.header_value);
        let value_start = self.b.span_start(self.spans.header_value);
        let dispatch = self.b.invoke(Code::Load("header_state".into()));
        let general = self.b.node("header_value");
        let value_end = self.b.span_end(self.spans.header_value);
        let almost_done = self.b.node("header_value_almost_done");

        self.b
            .on(discard_ws, " ", discard_ws)
            .on(discard_ws, "\t", discard_ws);
        self.line_end(discard_ws, discard_lws);
        self.b.otherwise(discard_ws, value_start);

        // obs-fold: a continuation line starts with whitespace.
        self.b
            .peek(discard_lws, " ", discard_ws)
            .peek(discard_lws, "\t", discard_ws)
            .otherwise(discard_lws, empty_start);
        self.b.otherwise(empty_start, empty_end);
        self.b.otherwise(empty_end, field_start);

        self.b.otherwise(value_start, dispatch);

        let connection = self.connection_value(general);
        let content_length = self.content_length_value(value_end);
        let transfer_encoding = self.transfer_encoding_value(general);
        let upgrade = self.or_flags(flags::UPGRADE);
        self.b.otherwise(upgrade, general);
        self.b
            .map(dispatch, HeaderState::Connection.value(), connection)
            .map(dispatch, HeaderState::ContentLength.value(), content_length)
            .map(dispatch, HeaderState::TransferEncoding.value(), transfer_encoding)
            .map(dispatch, HeaderState::Upgrade.value(), upgrade)
            .otherwise(dispatch, general);

        self.b
            .peek(general, "\r", value_end)
            .peek(general, "\n", value_end);
        match self.mode {
            Mode::Strict => {
                let e = self.err(Error::InvalidHeaderToken, "Invalid header value char");
                let chars: Vec<u8> = constants::header_value_chars();
                self.b.on_any(general, chars, general).otherwise(general, e);
            }
            Mode::Loose => {
                self.b.skip_to(general, general);
            }
        }

        self.b.otherwise(value_end, almost_done);
        self.line_end(almost_done, field_start);
        let e = self.err(Error::LfExpected, "Missing expected LF after header value");
        self.b.otherwise(almost_done, e);

        discard_ws
    }

    fn connection_value(&mut self, general: NodeId) -> NodeId {
        let node = self.b.node("header_value_connection");
        let close = self.or_flags(flags::CONNECTION_CLOSE);
        let keep_alive = self.or_flags(flags::CONNECTION_KEEP_ALIVE);
        let upgrade = self.or_flags(flags::CONNECTION_UPGRADE);
        for flag in [close, keep_alive, upgrade] {
            self.b.otherwise(flag, general);
        }
        self.b
            .transform(node, Transform::ToLowerUnsafe)
            .on(node, "close", close)
            .on(node, "keep-alive", keep_alive)
            .on(node, "upgrade", upgrade)
            .otherwise(node, general);
        node
    }

    fn content_length_value(&mut self, value_end: NodeId) -> NodeId {
        let check = self.b.invoke(Code::Test("flags".into(), flags::CONTENT_LENGTH));
        let mark = self.or_flags(flags::CONTENT_LENGTH);
        let digits = self.b.node("header_value_content_length");
        let acc = self.b.invoke(Code::MulAdd {
            field: "content_length".into(),
            base: 10,
            max: None,
        });
        let ws = self.b.node("header_value_content_length_ws");

        let e = self.err(Error::UnexpectedContentLength, "Duplicate Content-Length");
        self.b.map(check, 0, mark).otherwise(check, e);
        self.b.otherwise(mark, digits);

        let invalid = self.err(Error::InvalidContentLength, "Invalid character in Content-Length");
        let overflow = self.err(Error::InvalidContentLength, "Content-Length overflow");
        self.b
            .select(digits, constants::num_map(), acc)
            .on(digits, " ", ws)
            .peek(digits, "\r", value_end)
            .peek(digits, "\n", value_end)
            .otherwise(digits, invalid);
        self.b.map(acc, 1, overflow).otherwise(acc, digits);
        self.b
            .on(ws, " ", ws)
            .peek(ws, "\r", value_end)
            .peek(ws, "\n", value_end)
            .otherwise(ws, invalid);

        check
    }

    fn transfer_encoding_value(&mut self, general: NodeId) -> NodeId {
        let node = self.b.node("header_value_te");
        let chunked = self.or_flags(flags::TRANSFER_ENCODING | flags::CHUNKED);
        let other = self.or_flags(flags::TRANSFER_ENCODING);
        self.b.otherwise(chunked, general);
        self.b.otherwise(other, general);
        self.b
            .transform(node, Transform::ToLowerUnsafe)
            .on(node, "chunked", chunked)
            .otherwise(node, other);
        node
    }

    /// Header completion callbacks and body framing. Return values of
    /// `after_headers_complete`: 0 no body, 1 upgrade, 2 chunked, 3 identity
    /// body, 4 read until EOF, 5 invalid transfer-encoding.
    fn body(&mut self, headers_done: NodeId) -> Body {
        let on_headers = self.b.invoke(Code::Match(ON_HEADERS_COMPLETE.into()));
        let after_headers = self.b.invoke(Code::Match(AFTER_HEADERS_COMPLETE.into()));
        let skip_body = self.or_flags(flags::SKIPBODY);
        let upgrade_skip = self.or_flags(flags::SKIPBODY);
        let set_upgrade = self.update("upgrade", 1);
        let pause_headers = self.b.pause(Error::Paused.code(), "Paused by on_headers_complete");

        self.b.otherwise(headers_done, on_headers);
        let e = self.err(Error::CbHeadersComplete, "User callback error");
        self.b
            .map(on_headers, 0, after_headers)
            .map(on_headers, 1, skip_body)
            .map(on_headers, 2, upgrade_skip)
            .map(on_headers, Error::Paused.code() as i64, pause_headers)
            .otherwise(on_headers, e);
        self.b.otherwise(skip_body, after_headers);
        self.b.otherwise(upgrade_skip, set_upgrade);
        self.b.otherwise(set_upgrade, after_headers);
        self.b.otherwise(pause_headers, after_headers);

        let body_start = self.b.span_start(self.spans.body);
        let consume = self.b.consume("content_length");
        let body_end = self.b.span_end(self.spans.body);
        self.b.otherwise(body_start, consume);
        self.b.otherwise(consume, body_end);

        let eof_finish = self.update("finish", Finish::SafeWithCb.value());
        let eof_start = self.b.span_start(self.spans.body);
        let eof = self.b.node("body_identity_eof");
        self.b.otherwise(eof_finish, eof_start);
        self.b.otherwise(eof_start, eof);
        self.b.skip_to(eof, eof);

        let upgrade_finish = self.update("finish", Finish::Safe.value());
        let upgrade_complete = self.b.invoke(Code::Match(ON_MESSAGE_COMPLETE.into()));
        let pause_upgrade = self.b.pause(Error::PausedUpgrade.code(), "Pause on CONNECT/Upgrade");
        let start = self.b.node("upgraded");
        self.b.otherwise(upgrade_finish, upgrade_complete);
        let e = self.err(Error::CbMessageComplete, "`on_message_complete` callback error");
        self.b
            .map(upgrade_complete, 0, pause_upgrade)
            .otherwise(upgrade_complete, e);
        self.b.otherwise(pause_upgrade, start);
        // Bytes after an upgrade belong to the new protocol.
        self.b.skip_to(start, start);

        let chunked = self.err(Error::InvalidTransferEncoding, "Chunked encoding is not supported");
        let invalid_te = self.err(
            Error::InvalidTransferEncoding,
            "Request has invalid `Transfer-Encoding`",
        );
        let e = self.err(Error::Internal, "`after_headers_complete` unknown return code");
        self.b.otherwise(after_headers, e);

        Body {
            after_headers,
            after: body_end,
            dispatch: vec![
                (0, BodyTarget::Done),
                (1, BodyTarget::Node(upgrade_finish)),
                (2, BodyTarget::Node(chunked)),
                (3, BodyTarget::Node(body_start)),
                (4, BodyTarget::Node(eof_finish)),
                (5, BodyTarget::Node(invalid_te)),
            ],
        }
    }

    fn message_done(&mut self, start: NodeId) -> NodeId {
        let finish = self.update("finish", Finish::Safe.value());
        let on_complete = self.b.invoke(Code::Match(ON_MESSAGE_COMPLETE.into()));
        let pause = self.b.pause(Error::Paused.code(), "Paused by on_message_complete");
        let after = self.b.invoke(Code::Match(AFTER_MESSAGE_COMPLETE.into()));

        self.b.otherwise(finish, on_complete);
        let e = self.err(Error::CbMessageComplete, "`on_message_complete` callback error");
        self.b
            .map(on_complete, 0, after)
            .map(on_complete, Error::Paused.code() as i64, pause)
            .otherwise(on_complete, e);
        self.b.otherwise(pause, after);

        // `after_message_complete` returns 0 when the connection must close.
        match self.mode {
            Mode::Strict => {
                let closed = self.b.node("closed");
                let e = self.err(Error::ClosedConnection, "Data after `Connection: close`");
                self.b
                    .on(closed, "\r", closed)
                    .on(closed, "\n", closed)
                    .otherwise(closed, e);
                self.b.map(after, 0, closed).otherwise(after, start);
            }
            Mode::Loose => {
                self.b.otherwise(after, start);
            }
        }

        finish
    }

    /// CRLF edges to `next`. Loose mode also accepts a bare CR or LF.
    fn line_end(&mut self, node: NodeId, next: NodeId) {
        self.b.on(node, "\r\n", next);
        match self.mode {
            Mode::Strict => {
                let lf = self.err(Error::LfExpected, "Expected LF after CR");
                let cr = self.err(Error::Strict, "Expected CR before LF");
                self.b.on(node, "\r", lf).on(node, "\n", cr);
            }
            Mode::Loose => {
                self.b.on(node, "\r", next).on(node, "\n", next);
            }
        }
    }

    fn update(&mut self, field: &str, value: i64) -> NodeId {
        self.b.invoke(Code::Update(field.into(), value))
    }

    fn or_flags(&mut self, bits: i64) -> NodeId {
        self.b.invoke(Code::Or("flags".into(), bits))
    }

    fn err(&mut self, error: Error, reason: &str) -> NodeId {
        self.b.error(error.code(), reason)
    }
}

struct StartLine {
    /// Stores the selected method, then reads the request line.
    method: NodeId,
    /// Request line right after the method token.
    after_method: NodeId,
}

enum BodyTarget {
    Node(NodeId),
    Done,
}

struct Body {
    after_headers: NodeId,
    after: NodeId,
    dispatch: Vec<(i64, BodyTarget)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, NodeKind};

    fn build(mode: Mode) -> Grammar {
        let mut b = Builder::new("llrtsp__internal");
        let entry = Rtsp::new(&mut b, mode).build();
        b.build(entry)
    }

    fn named<'g>(g: &'g Grammar, name: &str) -> Option<&'g crate::grammar::Node> {
        g.nodes().iter().find(|n| n.name == name)
    }

    #[test]
    fn test_declares_properties_in_order() {
        let g = build(Mode::Strict);
        let names: Vec<_> = g.properties().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names[0], "type");
        assert_eq!(names.last(), Some(&"settings"));
        assert_eq!(g.spans().len(), 5);
        assert!(g.misuse().is_empty(), "{:?}", g.misuse());
    }

    #[test]
    fn test_closed_state_only_in_strict() {
        assert!(named(&build(Mode::Strict), "closed").is_some());
        assert!(named(&build(Mode::Loose), "closed").is_none());
    }

    #[test]
    fn test_loose_header_value_skips_anything() {
        let strict = build(Mode::Strict);
        let loose = build(Mode::Loose);
        let skip = |g: &Grammar| named(g, "header_value").and_then(|n| n.otherwise).map(|o| o.skip);
        assert_eq!(skip(&strict), Some(false));
        assert_eq!(skip(&loose), Some(true));
    }

    #[test]
    fn test_header_field_lowercases_input() {
        let g = build(Mode::Loose);
        match &named(&g, "header_field").unwrap().kind {
            NodeKind::Match { transform, edges } => {
                assert_eq!(*transform, Some(Transform::ToLowerUnsafe));
                assert_eq!(edges.len(), 4);
            }
            other => panic!("Expected match node, got {:?}", other),
        }
    }
}
