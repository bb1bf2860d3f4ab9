//! RTSP vocabulary shared by the grammar and the C declarations
//!
//! Every table here is ordered; the generated enums and X-macros follow the
//! declaration order so regenerated headers stay byte-stable.

/// Parser error codes (`HPE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Ok = 0,
    Internal = 1,
    Strict = 2,
    LfExpected = 3,
    UnexpectedContentLength = 4,
    ClosedConnection = 5,
    InvalidMethod = 6,
    InvalidUrl = 7,
    InvalidConstant = 8,
    InvalidVersion = 9,
    InvalidHeaderToken = 10,
    InvalidContentLength = 11,
    InvalidChunkSize = 12,
    InvalidStatus = 13,
    InvalidEofState = 14,
    InvalidTransferEncoding = 15,
    CbMessageBegin = 16,
    CbHeadersComplete = 17,
    CbMessageComplete = 18,
    CbChunkHeader = 19,
    CbChunkComplete = 20,
    Paused = 21,
    PausedUpgrade = 22,
    User = 23,
}

impl Error {
    pub const ALL: [Error; 24] = [
        Error::Ok,
        Error::Internal,
        Error::Strict,
        Error::LfExpected,
        Error::UnexpectedContentLength,
        Error::ClosedConnection,
        Error::InvalidMethod,
        Error::InvalidUrl,
        Error::InvalidConstant,
        Error::InvalidVersion,
        Error::InvalidHeaderToken,
        Error::InvalidContentLength,
        Error::InvalidChunkSize,
        Error::InvalidStatus,
        Error::InvalidEofState,
        Error::InvalidTransferEncoding,
        Error::CbMessageBegin,
        Error::CbHeadersComplete,
        Error::CbMessageComplete,
        Error::CbChunkHeader,
        Error::CbChunkComplete,
        Error::Paused,
        Error::PausedUpgrade,
        Error::User,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Name without the `HPE_` prefix.
    pub fn name(self) -> &'static str {
        match self {
            Error::Ok => "OK",
            Error::Internal => "INTERNAL",
            Error::Strict => "STRICT",
            Error::LfExpected => "LF_EXPECTED",
            Error::UnexpectedContentLength => "UNEXPECTED_CONTENT_LENGTH",
            Error::ClosedConnection => "CLOSED_CONNECTION",
            Error::InvalidMethod => "INVALID_METHOD",
            Error::InvalidUrl => "INVALID_URL",
            Error::InvalidConstant => "INVALID_CONSTANT",
            Error::InvalidVersion => "INVALID_VERSION",
            Error::InvalidHeaderToken => "INVALID_HEADER_TOKEN",
            Error::InvalidContentLength => "INVALID_CONTENT_LENGTH",
            Error::InvalidChunkSize => "INVALID_CHUNK_SIZE",
            Error::InvalidStatus => "INVALID_STATUS",
            Error::InvalidEofState => "INVALID_EOF_STATE",
            Error::InvalidTransferEncoding => "INVALID_TRANSFER_ENCODING",
            Error::CbMessageBegin => "CB_MESSAGE_BEGIN",
            Error::CbHeadersComplete => "CB_HEADERS_COMPLETE",
            Error::CbMessageComplete => "CB_MESSAGE_COMPLETE",
            Error::CbChunkHeader => "CB_CHUNK_HEADER",
            Error::CbChunkComplete => "CB_CHUNK_COMPLETE",
            Error::Paused => "PAUSED",
            Error::PausedUpgrade => "PAUSED_UPGRADE",
            Error::User => "USER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Both = 0,
    Request = 1,
    Response = 2,
}

impl MessageType {
    pub const ALL: [MessageType; 3] = [MessageType::Both, MessageType::Request, MessageType::Response];

    pub fn value(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::Both => "BOTH",
            MessageType::Request => "REQUEST",
            MessageType::Response => "RESPONSE",
        }
    }
}

/// Bits of the `flags` property.
pub mod flags {
    pub const CONNECTION_KEEP_ALIVE: i64 = 0x1;
    pub const CONNECTION_CLOSE: i64 = 0x2;
    pub const CONNECTION_UPGRADE: i64 = 0x4;
    pub const CHUNKED: i64 = 0x8;
    pub const UPGRADE: i64 = 0x10;
    pub const CONTENT_LENGTH: i64 = 0x20;
    pub const SKIPBODY: i64 = 0x40;
    pub const TRAILING: i64 = 0x80;
    pub const LENIENT: i64 = 0x100;
    pub const TRANSFER_ENCODING: i64 = 0x200;

    pub const ALL: [(&str, i64); 10] = [
        ("CONNECTION_KEEP_ALIVE", CONNECTION_KEEP_ALIVE),
        ("CONNECTION_CLOSE", CONNECTION_CLOSE),
        ("CONNECTION_UPGRADE", CONNECTION_UPGRADE),
        ("CHUNKED", CHUNKED),
        ("UPGRADE", UPGRADE),
        ("CONTENT_LENGTH", CONTENT_LENGTH),
        ("SKIPBODY", SKIPBODY),
        ("TRAILING", TRAILING),
        ("LENIENT", LENIENT),
        ("TRANSFER_ENCODING", TRANSFER_ENCODING),
    ];
}

/// Value of the `finish` property: what `llrtsp_finish()` does on EOF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Safe = 0,
    SafeWithCb = 1,
    Unsafe = 2,
}

impl Finish {
    pub const ALL: [Finish; 3] = [Finish::Safe, Finish::SafeWithCb, Finish::Unsafe];

    pub fn value(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            Finish::Safe => "SAFE",
            Finish::SafeWithCb => "SAFE_WITH_CB",
            Finish::Unsafe => "UNSAFE",
        }
    }
}

/// RTSP/1.0 request methods (RFC 2326 section 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Describe = 0,
    Announce = 1,
    GetParameter = 2,
    Options = 3,
    Pause = 4,
    Play = 5,
    Record = 6,
    Redirect = 7,
    Setup = 8,
    SetParameter = 9,
    Teardown = 10,
}

impl Method {
    pub const ALL: [Method; 11] = [
        Method::Describe,
        Method::Announce,
        Method::GetParameter,
        Method::Options,
        Method::Pause,
        Method::Play,
        Method::Record,
        Method::Redirect,
        Method::Setup,
        Method::SetParameter,
        Method::Teardown,
    ];

    pub fn value(self) -> i64 {
        self as i64
    }

    /// Wire spelling, also used as the C enumerator suffix.
    pub fn token(self) -> &'static str {
        match self {
            Method::Describe => "DESCRIBE",
            Method::Announce => "ANNOUNCE",
            Method::GetParameter => "GET_PARAMETER",
            Method::Options => "OPTIONS",
            Method::Pause => "PAUSE",
            Method::Play => "PLAY",
            Method::Record => "RECORD",
            Method::Redirect => "REDIRECT",
            Method::Setup => "SETUP",
            Method::SetParameter => "SET_PARAMETER",
            Method::Teardown => "TEARDOWN",
        }
    }

    /// `(token, value)` pairs for a select edge.
    pub fn select_map() -> Vec<(&'static str, i64)> {
        Method::ALL.iter().map(|m| (m.token(), m.value())).collect()
    }
}

/// Value of the `header_state` property while a header value is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    General = 0,
    Connection = 1,
    ContentLength = 2,
    TransferEncoding = 3,
    Upgrade = 4,
}

impl HeaderState {
    pub fn value(self) -> i64 {
        self as i64
    }

    /// Lowercase header names with special handling.
    pub fn special_headers() -> [(&'static str, i64); 4] {
        [
            ("connection", HeaderState::Connection.value()),
            ("content-length", HeaderState::ContentLength.value()),
            ("transfer-encoding", HeaderState::TransferEncoding.value()),
            ("upgrade", HeaderState::Upgrade.value()),
        ]
    }
}

pub const ALPHA: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const NUM: &str = "0123456789";

/// `(digit, value)` pairs for decimal accumulation.
pub fn num_map() -> Vec<(String, i64)> {
    (0..10).map(|d| (d.to_string(), d)).collect()
}

/// RFC 7230 `tchar`.
pub fn token_chars() -> Vec<u8> {
    let mut out: Vec<u8> = "!#$%&'*+-.^_`|~".bytes().collect();
    out.extend(NUM.bytes());
    out.extend(ALPHA.bytes());
    out
}

/// Bytes allowed in a header value: HTAB, visible ASCII, space and obs-text.
pub fn header_value_chars() -> Vec<u8> {
    let mut out = vec![b'\t'];
    out.extend(0x20u8..=0x7e);
    out.extend(0x80u8..=0xff);
    out
}

/// Bytes allowed in a loose header field name: everything printable but `:`.
pub fn loose_header_field_chars() -> Vec<u8> {
    let mut out = vec![b'\t'];
    out.extend((0x20u8..=0x7e).filter(|b| *b != b':'));
    out
}

/// Visible URL bytes excluding the delimiters the URL grammar branches on.
pub fn url_chars(exclude: &[u8]) -> Vec<u8> {
    (0x21u8..=0x7e).filter(|b| !exclude.contains(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_dense() {
        for (i, e) in Error::ALL.iter().enumerate() {
            assert_eq!(e.code(), i as i32);
        }
        assert_eq!(Error::User.name(), "USER");
    }

    #[test]
    fn test_method_values_follow_declaration_order() {
        for (i, m) in Method::ALL.iter().enumerate() {
            assert_eq!(m.value(), i as i64);
        }
        assert_eq!(Method::select_map()[2], ("GET_PARAMETER", 2));
    }

    #[test]
    fn test_flags_are_distinct_bits() {
        let mut seen = 0;
        for (_, bit) in flags::ALL {
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(seen & bit, 0);
            seen |= bit;
        }
    }

    #[test]
    fn test_char_classes() {
        let tokens = token_chars();
        assert!(tokens.contains(&b'-'));
        assert!(!tokens.contains(&b' '));
        assert!(!tokens.contains(&b':'));

        let loose = loose_header_field_chars();
        assert!(loose.contains(&b' '));
        assert!(!loose.contains(&b':'));

        let url = url_chars(b"?#");
        assert!(!url.contains(&b'?'));
        assert!(!url.contains(&b' '));
        assert_eq!(header_value_chars().len(), 1 + 95 + 128);
    }
}
