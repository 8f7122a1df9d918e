//! TCP serving loop.
//!
//! One OS thread per connection. HTTP requests are parsed incrementally and
//! answered on the same socket; the parser decides keep-alive (HTTP/1.1
//! unless `Connection: close`, HTTP/1.0 only with `Connection: keep-alive`).
//! A WebSocket upgrade hands the socket over to a frame
//! loop; the write half goes behind a mutex so hub broadcasts and control
//! replies never interleave on the wire.

use crate::app::App;
use crate::dispatch::dispatch;
use litespeed_core::{
    accept_key, decode_frame, encode_frame, logging, ClientConnection, Frame, Method, OpCode,
    Request, Response, WsTransport,
};
use litespeed_http::{encode_response, parse_request, ParseStatus};
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;

const READ_CHUNK: usize = 8192;

/// A bound TCP server.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind to an address.
    ///
    /// # Errors
    /// Propagates bind failures.
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr)?,
        })
    }

    /// The bound local address.
    ///
    /// # Errors
    /// Propagates socket introspection failures.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, spawning one worker thread per
    /// connection.
    ///
    /// # Errors
    /// Propagates listener introspection failures; per-connection errors are
    /// logged and end only that connection.
    pub fn run(self, app: Arc<App>) -> io::Result<()> {
        logging::info(&format!("listening on {}", self.listener.local_addr()?));
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let app = Arc::clone(&app);
                    std::thread::spawn(move || {
                        if let Err(e) = handle_connection(&app, stream) {
                            logging::debug(&format!("connection ended: {e}"));
                        }
                    });
                }
                Err(e) => logging::warn(&format!("accept failed: {e}")),
            }
        }
        Ok(())
    }
}

fn handle_connection(app: &App, mut stream: TcpStream) -> io::Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match parse_request(&buf) {
            Ok(ParseStatus::Complete {
                request,
                consumed,
                keep_alive,
            }) => {
                buf.drain(..consumed);
                if wants_upgrade(&request) {
                    return ws_session(app, stream, &request);
                }
                let response = dispatch(app, &request);
                stream.write_all(&encode_response(&response))?;
                if !keep_alive {
                    return Ok(());
                }
            }
            Ok(ParseStatus::Partial) => {
                let n = stream.read(&mut chunk)?;
                if n == 0 {
                    return Ok(());
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            Err(e) => {
                logging::warn(&format!("rejecting connection: {e}"));
                let _ = stream.write_all(&encode_response(&Response::empty(e.status())));
                return Ok(());
            }
        }
    }
}

fn wants_upgrade(request: &Request) -> bool {
    request.method() == Method::Get
        && request
            .headers()
            .get("connection")
            .is_some_and(|v| v.to_ascii_lowercase().contains("upgrade"))
        && request
            .headers()
            .get("upgrade")
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

/// Socket-backed transport. The mutex serializes writers: hub sends from
/// other threads and control replies from the read loop.
struct TcpTransport {
    stream: Mutex<TcpStream>,
}

impl TcpTransport {
    fn send_frame(&self, frame: &Frame) -> io::Result<()> {
        self.stream.lock().write_all(&encode_frame(frame))
    }
}

impl WsTransport for TcpTransport {
    fn send_text(&self, payload: &str) -> io::Result<()> {
        self.send_frame(&Frame::text(payload))
    }

    fn close(&self) -> io::Result<()> {
        self.send_frame(&Frame::close())
    }
}

fn ws_session(app: &App, mut stream: TcpStream, request: &Request) -> io::Result<()> {
    let key = request.headers().get("sec-websocket-key").unwrap_or("");
    let accept = match accept_key(key) {
        Ok(accept) => accept,
        Err(e) => {
            logging::warn(&format!("websocket handshake rejected: {e}"));
            let _ = stream.write_all(&encode_response(&Response::empty(400)));
            return Ok(());
        }
    };
    // 101 goes out by hand: an upgrade response carries no body framing
    let head = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         upgrade: websocket\r\n\
         connection: Upgrade\r\n\
         sec-websocket-accept: {accept}\r\n\r\n"
    );
    stream.write_all(head.as_bytes())?;

    let transport = Arc::new(TcpTransport {
        stream: Mutex::new(stream.try_clone()?),
    });
    let connection = app
        .hub()
        .connect(Arc::clone(&transport) as Arc<dyn WsTransport>);
    let result = ws_read_loop(app, &mut stream, &transport, &connection);
    app.hub().disconnect(connection.id());
    result
}

fn ws_read_loop(
    app: &App,
    stream: &mut TcpStream,
    transport: &TcpTransport,
    connection: &ClientConnection,
) -> io::Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match decode_frame(&buf) {
            Ok(Some((frame, consumed))) => {
                buf.drain(..consumed);
                match frame.opcode {
                    OpCode::Text | OpCode::Binary => {
                        let text = String::from_utf8_lossy(&frame.payload).into_owned();
                        app.hub().handle_message(connection, &text);
                    }
                    OpCode::Ping => transport.send_frame(&Frame::pong(frame.payload))?,
                    OpCode::Close => {
                        let _ = transport.send_frame(&Frame::close());
                        return Ok(());
                    }
                    // unsolicited pongs and unassembled continuations are dropped
                    OpCode::Pong | OpCode::Continuation => {}
                }
            }
            Ok(None) => {
                let n = stream.read(&mut chunk)?;
                if n == 0 {
                    return Ok(());
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            Err(e) => {
                logging::warn(&format!(
                    "websocket connection {}: {e}",
                    connection.id()
                ));
                let _ = transport.send_frame(&Frame::close());
                return Ok(());
            }
        }
    }
}
