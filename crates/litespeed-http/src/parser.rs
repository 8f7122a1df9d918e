//! Incremental HTTP/1.1 request parsing.
//!
//! [`parse_request`] inspects a read buffer and either produces a complete
//! [`Request`] plus the number of bytes consumed, or reports that more input
//! is needed. The serving loop keeps appending reads until one of those two
//! outcomes (or an error, answered with 400/431 and a closed connection).

use crate::query::{parse_query, percent_decode};
use litespeed_core::{Cookie, Method, Request};
use memchr::memmem;

/// Hard cap on the head section (request line + headers).
const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Hard cap on a declared body.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Outcome of a parse attempt over the current buffer.
#[derive(Debug)]
pub enum ParseStatus {
    /// A full request was parsed; `consumed` bytes belong to it.
    Complete {
        request: Request,
        consumed: usize,
        /// Whether the connection may serve another request afterwards.
        /// HTTP/1.1 defaults to keep-alive unless `Connection: close`;
        /// HTTP/1.0 defaults to close unless `Connection: keep-alive`.
        keep_alive: bool,
    },
    /// The buffer does not yet hold a complete request.
    Partial,
}

/// Malformed or unsupported request. All variants end the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The request line is not `METHOD TARGET HTTP/1.x`.
    RequestLine,
    /// The method token is not a recognized verb.
    Method(String),
    /// Not an HTTP/1.x request.
    Version,
    /// A header line has no colon or a non-UTF-8 name/value.
    Header,
    /// `content-length` is not a valid integer.
    ContentLength,
    /// `transfer-encoding` request bodies are not supported.
    TransferEncoding,
    /// Head section exceeds the size cap.
    HeadTooLarge,
    /// Declared body exceeds the size cap.
    BodyTooLarge,
}

impl ParseError {
    /// Status code the connection is answered with before closing.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::HeadTooLarge => 431,
            Self::BodyTooLarge => 413,
            _ => 400,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestLine => write!(f, "malformed request line"),
            Self::Method(token) => write!(f, "unrecognized method {token:?}"),
            Self::Version => write!(f, "unsupported protocol version"),
            Self::Header => write!(f, "malformed header line"),
            Self::ContentLength => write!(f, "invalid content-length"),
            Self::TransferEncoding => write!(f, "transfer-encoding bodies are not supported"),
            Self::HeadTooLarge => write!(f, "request head too large"),
            Self::BodyTooLarge => write!(f, "request body too large"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Try to parse one request from the front of `buf`.
///
/// # Errors
/// [`ParseError`] for malformed or unsupported requests; see the variant
/// docs. `Ok(Partial)` is not an error, just an incomplete buffer.
pub fn parse_request(buf: &[u8]) -> Result<ParseStatus, ParseError> {
    let Some(head_end) = memmem::find(buf, b"\r\n\r\n") else {
        if buf.len() > MAX_HEAD_BYTES {
            return Err(ParseError::HeadTooLarge);
        }
        return Ok(ParseStatus::Partial);
    };
    if head_end > MAX_HEAD_BYTES {
        return Err(ParseError::HeadTooLarge);
    }

    let head = std::str::from_utf8(&buf[..head_end]).map_err(|_| ParseError::Header)?;
    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or(ParseError::RequestLine)?;

    let mut parts = request_line.split_ascii_whitespace();
    let method_token = parts.next().ok_or(ParseError::RequestLine)?;
    let target = parts.next().ok_or(ParseError::RequestLine)?;
    let version = parts.next().ok_or(ParseError::RequestLine)?;
    if parts.next().is_some() {
        return Err(ParseError::RequestLine);
    }
    if version != "HTTP/1.1" && version != "HTTP/1.0" {
        return Err(ParseError::Version);
    }
    let method = Method::parse(method_token)
        .ok_or_else(|| ParseError::Method(method_token.to_string()))?;

    let (raw_path, raw_query) = match target.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (target, None),
    };
    if !raw_path.starts_with('/') {
        return Err(ParseError::RequestLine);
    }

    let mut request = Request::new(method, percent_decode(raw_path).into_owned());
    if let Some(raw_query) = raw_query {
        request.set_query(parse_query(raw_query));
    }

    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':').ok_or(ParseError::Header)?;
        request.headers_mut().insert(name.trim(), value.trim());
    }

    if request.headers().contains("transfer-encoding") {
        return Err(ParseError::TransferEncoding);
    }

    if let Some(raw_cookies) = request.headers().get("cookie").map(str::to_string) {
        for pair in raw_cookies.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            request.insert_cookie(name.trim(), Cookie::new(value.trim()));
        }
    }

    let body_len = match request.headers().get("content-length") {
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| ParseError::ContentLength)?,
        None => 0,
    };
    if body_len > MAX_BODY_BYTES {
        return Err(ParseError::BodyTooLarge);
    }

    let body_start = head_end + 4;
    if buf.len() < body_start + body_len {
        return Ok(ParseStatus::Partial);
    }
    request.set_body(buf[body_start..body_start + body_len].to_vec());

    let connection = request
        .headers()
        .get("connection")
        .map(str::to_ascii_lowercase);
    let keep_alive = if version == "HTTP/1.0" {
        connection.as_deref().is_some_and(|v| v.contains("keep-alive"))
    } else {
        !connection.as_deref().is_some_and(|v| v.contains("close"))
    };

    Ok(ParseStatus::Complete {
        request,
        consumed: body_start + body_len,
        keep_alive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(raw: &[u8]) -> (Request, usize) {
        match parse_request(raw).unwrap() {
            ParseStatus::Complete {
                request, consumed, ..
            } => (request, consumed),
            ParseStatus::Partial => panic!("expected a complete request"),
        }
    }

    fn keep_alive_of(raw: &[u8]) -> bool {
        match parse_request(raw).unwrap() {
            ParseStatus::Complete { keep_alive, .. } => keep_alive,
            ParseStatus::Partial => panic!("expected a complete request"),
        }
    }

    #[test]
    fn parses_a_simple_get() {
        let (request, consumed) =
            complete(b"GET /user/?a=1&a=2 HTTP/1.1\r\nHost: localhost\r\n\r\n");
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.path(), "/user/");
        assert_eq!(request.query().get_all("a"), &["1".to_string(), "2".to_string()]);
        assert_eq!(request.headers().get("host"), Some("localhost"));
        assert_eq!(consumed, b"GET /user/?a=1&a=2 HTTP/1.1\r\nHost: localhost\r\n\r\n".len());
    }

    #[test]
    fn percent_decodes_the_path_but_not_plus() {
        let (request, _) = complete(b"GET /a%20b+c/ HTTP/1.1\r\n\r\n");
        assert_eq!(request.path(), "/a b+c/");
    }

    #[test]
    fn waits_for_the_full_head_and_body() {
        assert!(matches!(
            parse_request(b"GET / HTTP/1.1\r\nHost: x\r\n").unwrap(),
            ParseStatus::Partial
        ));
        assert!(matches!(
            parse_request(b"POST /u/ HTTP/1.1\r\ncontent-length: 5\r\n\r\nab").unwrap(),
            ParseStatus::Partial
        ));
        let (request, consumed) =
            complete(b"POST /u/ HTTP/1.1\r\ncontent-length: 5\r\n\r\nabcdeLEFTOVER");
        assert_eq!(request.body(), b"abcde");
        assert_eq!(consumed, b"POST /u/ HTTP/1.1\r\ncontent-length: 5\r\n\r\nabcde".len());
    }

    #[test]
    fn splits_cookie_pairs() {
        let (request, _) =
            complete(b"GET / HTTP/1.1\r\nCookie: session=abc; theme=dark\r\n\r\n");
        assert_eq!(request.cookies()["session"].value, "abc");
        assert_eq!(request.cookies()["theme"].value, "dark");
    }

    #[test]
    fn keep_alive_follows_version_and_connection_header() {
        assert!(keep_alive_of(b"GET / HTTP/1.1\r\n\r\n"));
        assert!(!keep_alive_of(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n"));
        assert!(!keep_alive_of(b"GET / HTTP/1.0\r\n\r\n"));
        assert!(keep_alive_of(
            b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n"
        ));
    }

    #[test]
    fn rejects_unknown_methods_and_versions() {
        assert_eq!(
            parse_request(b"BREW / HTTP/1.1\r\n\r\n").unwrap_err(),
            ParseError::Method("BREW".to_string())
        );
        assert_eq!(
            parse_request(b"GET / HTTP/2\r\n\r\n").unwrap_err(),
            ParseError::Version
        );
    }

    #[test]
    fn rejects_transfer_encoding_bodies() {
        let err = parse_request(
            b"POST / HTTP/1.1\r\ntransfer-encoding: chunked\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(err, ParseError::TransferEncoding);
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn rejects_bad_content_length() {
        assert_eq!(
            parse_request(b"POST / HTTP/1.1\r\ncontent-length: nope\r\n\r\n").unwrap_err(),
            ParseError::ContentLength
        );
    }
}
