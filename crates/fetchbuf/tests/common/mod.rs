//! Loopback HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of routes on 127.0.0.1 from a background thread and
//! records every request it receives.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// Size of the body served by `/big`
pub const BIG_BODY_LEN: usize = 100_000;

/// Number of chunks served by `/chunked`
pub const CHUNK_COUNT: usize = 200;

/// One request as seen by the server.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct TestServer {
    port: u16,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    /// Bind an ephemeral port and start serving.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let log = Arc::clone(&log);
                thread::spawn(move || handle(stream, &log));
            }
        });

        Self { port, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("request log").clone()
    }
}

fn handle(stream: TcpStream, log: &Mutex<Vec<Recorded>>) {
    let Some(request) = read_request(&stream) else {
        return;
    };
    log.lock().expect("request log").push(request.clone());

    let mut stream = stream;
    let _ = respond(&mut stream, &request);
    let _ = stream.flush();
}

fn read_request(stream: &TcpStream) -> Option<Recorded> {
    let mut reader = BufReader::new(stream);

    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;

    Some(Recorded {
        method,
        path,
        headers,
        body,
    })
}

fn respond(stream: &mut TcpStream, request: &Recorded) -> std::io::Result<()> {
    match request.path.as_str() {
        "/hello" => fixed(stream, "200 OK", &[("Content-Type", "text/plain")], b"hello world"),
        "/echo" => {
            let content_type = request.header("content-type").unwrap_or("none");
            fixed(
                stream,
                "200 OK",
                &[
                    ("X-Method", request.method.as_str()),
                    ("X-Content-Type", content_type),
                ],
                &request.body,
            )
        }
        "/redirect" => fixed(stream, "302 Found", &[("Location", "/hello")], b"moved"),
        "/loop" => fixed(stream, "302 Found", &[("Location", "/loop")], b""),
        "/empty" => fixed(stream, "200 OK", &[], b""),
        "/missing" => fixed(stream, "404 Not Found", &[], b"no such thing"),
        "/binary" => fixed(
            stream,
            "200 OK",
            &[("Content-Type", "application/octet-stream")],
            &[0x00, 0xff, 0x00, 0x41],
        ),
        "/big" => fixed(stream, "200 OK", &[], &vec![b'A'; BIG_BODY_LEN]),
        "/chunked" => chunked(stream),
        _ => fixed(stream, "404 Not Found", &[], b""),
    }
}

fn fixed(
    stream: &mut TcpStream,
    status: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> std::io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for (k, v) in headers {
        head.push_str(&format!("{}: {}\r\n", k, v));
    }
    head.push_str("\r\n");
    stream.write_all(head.as_bytes())?;
    stream.write_all(body)
}

/// `CHUNK_COUNT` chunks of "0123456789" with no declared length.
fn chunked(stream: &mut TcpStream) -> std::io::Result<()> {
    stream.write_all(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
    )?;
    for _ in 0..CHUNK_COUNT {
        stream.write_all(b"a\r\n0123456789\r\n")?;
        stream.flush()?;
    }
    stream.write_all(b"0\r\n\r\n")
}
