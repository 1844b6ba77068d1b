#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use csv::WriterBuilder;
use feedback_ingest::ingest::{ParseOptions, ParsedTable, parse_table};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// Builds a CSV with columns `id`, `column`, `rating`: `filled` rows carry
/// feedback text, followed by `blank` rows whose feedback is whitespace.
pub fn feedback_csv(column: &str, filled: usize, blank: usize) -> String {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(["id", column, "rating"])
        .expect("write headers");
    for idx in 0..filled {
        let text = format!("Review {idx}, delivery was quick");
        let rating = (idx % 5 + 1).to_string();
        writer
            .write_record([(idx + 1).to_string(), text, rating])
            .expect("write filled row");
    }
    for idx in 0..blank {
        writer
            .write_record([(filled + idx + 1).to_string(), "   ".to_string(), "3".to_string()])
            .expect("write blank row");
    }
    String::from_utf8(writer.into_inner().expect("csv buffer")).expect("utf-8 csv")
}

pub fn parse(text: &str) -> ParsedTable {
    parse_table(text.as_bytes(), &ParseOptions::default()).expect("parse table")
}

/// Serves a single HTTP request with `status` and a JSON `body`, returning
/// the base URL and a handle yielding the raw request text.
pub fn spawn_stub(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
    let addr = listener.local_addr().expect("stub address");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept connection");
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            reason_phrase(status),
            body.len()
        );
        stream
            .write_all(response.as_bytes())
            .expect("write response");
        let _ = stream.flush();
        request
    });
    (format!("http://{addr}/api/v1"), handle)
}

/// A base URL nothing is listening on.
pub fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{addr}/api/v1")
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = stream.read(&mut chunk).expect("read request");
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        let text = String::from_utf8_lossy(&buffer);
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let head = &text[..header_end];
        let boundary = head.lines().find_map(|line| {
            line.to_ascii_lowercase()
                .starts_with("content-type:")
                .then(|| line.split("boundary=").nth(1).map(|b| b.trim().to_string()))
                .flatten()
        });
        match boundary {
            Some(boundary) => {
                if text[header_end..].contains(&format!("--{boundary}--")) {
                    break;
                }
            }
            None => break,
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
