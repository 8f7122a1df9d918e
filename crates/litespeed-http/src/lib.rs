//! HTTP/1.1 wire layer for litespeed.
//!
//! Request parsing is incremental ([`ParseStatus::Partial`] until a full
//! head and declared body are buffered), query strings decode into
//! multi-valued parameters, and responses are written with a computed
//! `content-length` (bodies are always fully buffered, never chunked).

#![forbid(unsafe_code)]

mod parser;
mod query;
mod write;

pub use parser::{parse_request, ParseError, ParseStatus};
pub use query::{form_decode, parse_query, percent_decode};
pub use write::encode_response;
