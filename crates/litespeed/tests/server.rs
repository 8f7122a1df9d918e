//! Serving-loop behavior over real sockets: keep-alive, the WebSocket
//! upgrade handshake, frame echo, and connection-terminating rejections.

use litespeed::prelude::*;
use litespeed::{App, Server};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

fn hello(_req: &Request, _args: &PathArgs) -> HandlerOutcome {
    Ok("hello".into())
}

fn echo_app() -> App {
    App::builder()
        .route(RouteDef::new("hello", hello))
        .on_message(|conn, hub, msg| hub.send(conn, msg))
        .build()
        .unwrap()
}

fn spawn_server(app: App) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    let app = Arc::new(app);
    std::thread::spawn(move || {
        let _ = server.run(app);
    });
    addr
}

fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

/// Read one HTTP response off the socket: status, raw head, body (sized by
/// `content-length`, empty when the head carries none).
fn read_response(stream: &mut TcpStream) -> (u16, String, String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "connection closed mid-response");
        buf.extend_from_slice(&chunk[..n]);
    };
    let head = String::from_utf8(buf[..head_end].to_vec()).unwrap();
    let status: u16 = head
        .split_whitespace()
        .nth(1)
        .unwrap()
        .parse()
        .unwrap();

    let mut content_length = 0usize;
    for line in head.lines() {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "connection closed mid-body");
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);
    (status, head, String::from_utf8(body).unwrap())
}

fn response_header(head: &str, name: &str) -> Option<String> {
    head.lines().find_map(|line| {
        let (n, v) = line.split_once(':')?;
        n.eq_ignore_ascii_case(name).then(|| v.trim().to_string())
    })
}

fn masked_frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mask = [0x11, 0x22, 0x33, 0x44];
    let mut out = vec![0x80 | opcode, 0x80 | u8::try_from(payload.len()).unwrap()];
    out.extend_from_slice(&mask);
    out.extend(payload.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]));
    out
}

/// Read one short server frame: `(first byte, payload)`.
fn read_frame(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).unwrap();
    assert_eq!(header[1] & 0x80, 0, "server frames must be unmasked");
    let mut payload = vec![0u8; usize::from(header[1] & 0x7F)];
    stream.read_exact(&mut payload).unwrap();
    (header[0], payload)
}

#[test]
fn keep_alive_serves_multiple_requests_then_honors_close() {
    let addr = spawn_server(echo_app());
    let mut stream = connect(addr);

    stream
        .write_all(b"GET /hello/ HTTP/1.1\r\nhost: t\r\n\r\n")
        .unwrap();
    let (status, _, body) = read_response(&mut stream);
    assert_eq!((status, body.as_str()), (200, "hello"));

    // same socket serves a second exchange
    stream
        .write_all(b"GET /missing/ HTTP/1.1\r\nhost: t\r\n\r\n")
        .unwrap();
    let (status, _, _) = read_response(&mut stream);
    assert_eq!(status, 404);

    // close ends the connection after the response
    stream
        .write_all(b"GET /hello/ HTTP/1.1\r\nconnection: close\r\n\r\n")
        .unwrap();
    let (status, _, _) = read_response(&mut stream);
    assert_eq!(status, 200);
    let mut rest = Vec::new();
    assert_eq!(stream.read_to_end(&mut rest).unwrap(), 0);
}

#[test]
fn http_1_0_closes_after_the_response() {
    let addr = spawn_server(echo_app());
    let mut stream = connect(addr);
    stream.write_all(b"GET /hello/ HTTP/1.0\r\n\r\n").unwrap();
    let (status, _, body) = read_response(&mut stream);
    assert_eq!((status, body.as_str()), (200, "hello"));
    let mut rest = Vec::new();
    assert_eq!(stream.read_to_end(&mut rest).unwrap(), 0);
}

#[test]
fn malformed_requests_answer_400_and_close() {
    let addr = spawn_server(echo_app());
    let mut stream = connect(addr);
    stream.write_all(b"BREW /hello/ HTTP/1.1\r\n\r\n").unwrap();
    let (status, _, _) = read_response(&mut stream);
    assert_eq!(status, 400);
    let mut rest = Vec::new();
    assert_eq!(stream.read_to_end(&mut rest).unwrap(), 0);
}

#[test]
fn websocket_upgrade_echoes_frames_and_answers_ping() {
    let addr = spawn_server(echo_app());
    let mut stream = connect(addr);
    stream
        .write_all(
            b"GET /ws/ HTTP/1.1\r\n\
              host: t\r\n\
              connection: Upgrade\r\n\
              upgrade: websocket\r\n\
              sec-websocket-key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
        )
        .unwrap();
    let (status, head, _) = read_response(&mut stream);
    assert_eq!(status, 101);
    assert_eq!(
        response_header(&head, "sec-websocket-accept").as_deref(),
        Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=")
    );
    assert_eq!(
        response_header(&head, "upgrade").as_deref(),
        Some("websocket")
    );

    // text echo through the hub's message handler
    stream.write_all(&masked_frame(0x1, b"hello hub")).unwrap();
    let (first, payload) = read_frame(&mut stream);
    assert_eq!(first, 0x81);
    assert_eq!(payload, b"hello hub");

    // ping answered with a pong carrying the same payload
    stream.write_all(&masked_frame(0x9, b"pi")).unwrap();
    let (first, payload) = read_frame(&mut stream);
    assert_eq!(first, 0x8A);
    assert_eq!(payload, b"pi");

    // close handshake completes
    stream.write_all(&masked_frame(0x8, b"")).unwrap();
    let (first, _) = read_frame(&mut stream);
    assert_eq!(first, 0x88);
}

#[test]
fn bad_websocket_handshakes_answer_400_and_close() {
    let addr = spawn_server(echo_app());
    let mut stream = connect(addr);
    stream
        .write_all(
            b"GET /ws/ HTTP/1.1\r\n\
              connection: Upgrade\r\n\
              upgrade: websocket\r\n\
              sec-websocket-key: short\r\n\r\n",
        )
        .unwrap();
    let (status, _, _) = read_response(&mut stream);
    assert_eq!(status, 400);
    let mut rest = Vec::new();
    assert_eq!(stream.read_to_end(&mut rest).unwrap(), 0);
}
