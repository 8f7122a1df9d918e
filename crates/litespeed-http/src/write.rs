//! HTTP/1.1 response writing.

use litespeed_core::{reason_phrase, Response};

/// Encode a response for the wire.
///
/// `content-length` is always computed from the body; any `content-length`
/// or `transfer-encoding` header on the response is dropped so the framing
/// can never disagree with the payload.
#[must_use]
pub fn encode_response(response: &Response) -> Vec<u8> {
    let status = response.status();
    let body = response.body_bytes();

    let mut out = Vec::with_capacity(body.len() + 256);
    out.extend_from_slice(
        format!("HTTP/1.1 {status} {}\r\n", reason_phrase(status)).as_bytes(),
    );
    for (name, value) in response.headers() {
        if name.eq_ignore_ascii_case("content-length")
            || name.eq_ignore_ascii_case("transfer-encoding")
        {
            continue;
        }
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    out.extend_from_slice(format!("content-length: {}\r\n\r\n", body.len()).as_bytes());
    out.extend_from_slice(body);
    out
}
