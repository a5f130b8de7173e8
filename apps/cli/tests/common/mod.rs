//! Test helpers for the command-line crate.
//!
//! [`FakeAnkiConnect`] is a one-thread HTTP listener that answers each
//! request with the next canned JSON body and records what it was sent.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use serde_json::Value;

pub struct FakeAnkiConnect {
    pub url: String,
    handle: JoinHandle<Vec<Value>>,
}

impl FakeAnkiConnect {
    /// Answer one request per entry of `responses`, in order.
    pub fn serve(responses: Vec<Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));

        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().expect("accept");
                requests.push(read_request(&mut stream));

                let body = response.to_string();
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
                .expect("write response");
            }
            requests
        });

        Self { url, handle }
    }

    /// Wait for every canned response to be served and return the requests.
    pub fn requests(self) -> Vec<Value> {
        self.handle.join().expect("fake server thread")
    }
}

fn read_request(stream: &mut TcpStream) -> Value {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut content_length = 0;

    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header");
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().expect("content length");
            }
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).expect("read body");
    serde_json::from_slice(&body).expect("json request")
}

/// A URL nothing listens on.
pub fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

pub fn ok(result: Value) -> Value {
    serde_json::json!({ "result": result, "error": null })
}

pub fn err(message: &str) -> Value {
    serde_json::json!({ "result": null, "error": message })
}

/// Write `content` to `dir/name` and return the path.
pub fn write_note(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write note");
    path
}
