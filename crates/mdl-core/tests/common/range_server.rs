//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of routes. Each route answers HEAD with its length (and
//! `Accept-Ranges: bytes` when it supports ranges) and GET with either the
//! full body or a 206 slice for `Range: bytes=X-Y`. Bodies can be streamed in
//! small chunks with a delay so tests can observe a transfer in flight.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub body: Vec<u8>,
    /// Honour `Range` and advertise `Accept-Ranges: bytes`.
    pub ranges: bool,
    /// Status for every request to this route; bodies are sent only with 200.
    pub status: u16,
    /// Answer the first N GETs with 500 before serving normally.
    pub fail_first: usize,
    /// Leave `Content-Length` out of the HEAD response.
    pub omit_length: bool,
}

impl Route {
    /// Range-capable file.
    pub fn file(body: Vec<u8>) -> Self {
        Self {
            body,
            ranges: true,
            status: 200,
            fail_first: 0,
            omit_length: false,
        }
    }

    /// File served only as a whole.
    pub fn plain(body: Vec<u8>) -> Self {
        Self {
            ranges: false,
            ..Self::file(body)
        }
    }

    pub fn text(body: &str) -> Self {
        Self::plain(body.as_bytes().to_vec())
    }

    /// Every request gets `code` and an empty body.
    pub fn status(code: u16) -> Self {
        Self {
            status: code,
            ..Self::plain(Vec::new())
        }
    }

    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn without_length(mut self) -> Self {
        self.omit_length = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ServerOptions {
    /// Write bodies in pieces of this size (0 = all at once).
    pub chunk_size: usize,
    /// Sleep between pieces.
    pub chunk_delay: Option<Duration>,
    /// Sleep before answering a HEAD request.
    pub head_delay: Option<Duration>,
}

struct State {
    routes: HashMap<String, Route>,
    /// GET count per path.
    hits: HashMap<String, usize>,
}

pub struct TestServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl TestServer {
    /// Absolute URL for `path` (which starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Add or replace a route on the running server.
    pub fn add_route(&self, path: &str, route: Route) {
        self.state.lock().unwrap().routes.insert(path.to_string(), route);
    }

    /// How many GET requests reached `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.state.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }
}

/// Starts a server in a background thread. Runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> TestServer {
    start_with_options(routes, ServerOptions::default())
}

pub fn start_with_options(routes: Vec<(&str, Route)>, opts: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(State {
        routes: routes
            .into_iter()
            .map(|(p, r)| (p.to_string(), r))
            .collect(),
        hits: HashMap::new(),
    }));
    let shared = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&shared);
            thread::spawn(move || handle(stream, &state, opts));
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        state,
    }
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        206 => "Partial Content",
        404 => "Not Found",
        416 => "Range Not Satisfiable",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>, opts: ServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, range) = parse_request(request);
    let is_get = method.eq_ignore_ascii_case("GET");

    let (route, attempt) = {
        let mut st = state.lock().unwrap();
        let route = st.routes.get(path).cloned();
        let attempt = if is_get {
            let hits = st.hits.entry(path.to_string()).or_insert(0);
            *hits += 1;
            *hits
        } else {
            0
        };
        (route, attempt)
    };
    let Some(route) = route else {
        let _ = write_head(&mut stream, 404, &[("Content-Length", "0".to_string())]);
        return;
    };
    if route.status != 200 {
        let _ = write_head(&mut stream, route.status, &[("Content-Length", "0".to_string())]);
        return;
    }

    let total = route.body.len() as u64;
    let mut headers = Vec::new();
    if route.ranges {
        headers.push(("Accept-Ranges", "bytes".to_string()));
    }

    if method.eq_ignore_ascii_case("HEAD") {
        if let Some(d) = opts.head_delay {
            thread::sleep(d);
        }
        if !route.omit_length {
            headers.push(("Content-Length", total.to_string()));
        }
        let _ = write_head(&mut stream, 200, &headers);
        return;
    }
    if !is_get {
        let _ = write_head(&mut stream, 405, &[("Content-Length", "0".to_string())]);
        return;
    }
    if attempt <= route.fail_first {
        let _ = write_head(&mut stream, 500, &[("Content-Length", "0".to_string())]);
        return;
    }

    let (status, slice) = match range {
        Some((start, end_incl)) if route.ranges => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl || start >= total {
                headers.push(("Content-Range", format!("bytes */{}", total)));
                headers.push(("Content-Length", "0".to_string()));
                let _ = write_head(&mut stream, 416, &headers);
                return;
            }
            headers.push((
                "Content-Range",
                format!("bytes {}-{}/{}", start, end_incl, total),
            ));
            (206, &route.body[start as usize..=end_incl as usize])
        }
        _ => (200, &route.body[..]),
    };
    headers.push(("Content-Length", slice.len().to_string()));
    if write_head(&mut stream, status, &headers).is_err() {
        return;
    }
    write_body(&mut stream, slice, opts);
}

fn write_head(
    stream: &mut TcpStream,
    status: u16,
    headers: &[(&str, String)],
) -> std::io::Result<()> {
    let mut head = format!("HTTP/1.1 {} {}\r\nConnection: close\r\n", status, reason(status));
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    stream.write_all(head.as_bytes())
}

fn write_body(stream: &mut TcpStream, body: &[u8], opts: ServerOptions) {
    if opts.chunk_size == 0 {
        let _ = stream.write_all(body);
        return;
    }
    for piece in body.chunks(opts.chunk_size) {
        if stream.write_all(piece).is_err() {
            return;
        }
        let _ = stream.flush();
        if let Some(d) = opts.chunk_delay {
            thread::sleep(d);
        }
    }
}

/// Returns (method, path, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut method = "";
    let mut path = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            let mut parts = line.split_whitespace();
            method = parts.next().unwrap_or("");
            path = parts.next().unwrap_or("/");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    let part = value[6..].trim();
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, path, range)
}
