//! Core types for the litespeed routing and dispatch engine.
//!
//! This crate provides the fundamental building blocks:
//! - [`Request`] and [`Response`] types
//! - The handler signature and [`HandlerResult`] normalization
//! - [`FileServer`] (byte-range aware) and [`Renderer`] (flat templates)
//! - The WebSocket frame codec and the [`WebSocketHub`] session registry
//! - Leveled stderr logging
//!
//! # Design Principles
//!
//! - Handlers are plain synchronous functions; no runtime reflection
//! - Every handler return shape normalizes into one [`Response`] form
//! - All shared types are `Send + Sync`
//! - The hub never holds its lock across handler or transport calls

#![forbid(unsafe_code)]

pub mod files;
pub mod handler;
pub mod hub;
pub mod logging;
pub mod mime;
pub mod render;
mod request;
mod response;
pub mod websocket;

pub use files::FileServer;
pub use handler::{Handler, HandlerError, HandlerOutcome, HandlerResult, PathArgs, Payload};
pub use hub::{
    ClientConnection, ConnectionHandler, EventHandlers, MessageHandler, WebSocketHub, WsTransport,
};
pub use logging::{LogConfig, LogLevel};
pub use render::Renderer;
pub use request::{Cookie, Headers, Method, QueryParams, Request, UploadedFile};
pub use response::{reason_phrase, Response};
pub use websocket::{
    accept_key, decode_frame, encode_frame, Frame, FrameError, HandshakeError, OpCode,
};
