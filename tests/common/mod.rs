#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use image::{DynamicImage, Rgb, RgbImage};

use cat_sentry::{CycleTimestamp, FrameAcquirer, Notifier};

pub fn write_jpeg(path: &Path) {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(48, 32, Rgb([120, 80, 40])))
        .save_with_format(path, image::ImageFormat::Jpeg)
        .expect("write test jpeg");
}

pub fn ts(raw: &str) -> CycleTimestamp {
    CycleTimestamp::parse(raw).expect("valid timestamp")
}

/// What a scripted acquirer does on a given call.
#[derive(Clone, Copy, Debug)]
pub enum Step {
    Jpeg,
    Fail,
    Panic,
}

/// Acquirer that follows a script, repeating the last step once exhausted.
pub struct ScriptedAcquirer {
    steps: Vec<Step>,
    pub calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedAcquirer {
    pub fn new(steps: &[Step]) -> Self {
        Self {
            steps: steps.to_vec(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FrameAcquirer for ScriptedAcquirer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn capture(&mut self, path: &Path) -> bool {
        let mut calls = self.calls.lock().unwrap();
        let idx = calls.len().min(self.steps.len() - 1);
        calls.push(path.to_path_buf());
        let step = self.steps[idx];
        drop(calls);
        match step {
            Step::Jpeg => {
                write_jpeg(path);
                true
            }
            Step::Fail => false,
            Step::Panic => panic!("camera driver exploded"),
        }
    }
}

/// Notifier that records every call and optionally fails.
pub struct RecordingNotifier {
    pub calls: Arc<Mutex<Vec<(PathBuf, CycleTimestamp)>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new(fail: bool) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail,
        }
    }
}

impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn notify(&mut self, image_path: &Path, ts: &CycleTimestamp) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((image_path.to_path_buf(), ts.clone()));
        if self.fail {
            Err(anyhow!("webhook returned HTTP 500"))
        } else {
            Ok(())
        }
    }
}

/// One-shot HTTP server that answers every request with `status`.
///
/// The join handle yields the raw requests received, in order.
pub struct CannedServer {
    pub url: String,
    handle: JoinHandle<Vec<Vec<u8>>>,
}

impl CannedServer {
    pub fn start(status: u16, requests: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..requests {
                let (mut stream, _) = listener.accept().expect("accept");
                let request = read_request(&mut stream);
                let reason = if status < 300 { "OK" } else { "Internal Server Error" };
                let body = if status < 300 { "" } else { "upstream broke" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).expect("write response");
                seen.push(request);
            }
            seen
        });
        Self {
            url: format!("http://{}/api/webhooks/1/token", addr),
            handle,
        }
    }

    pub fn requests(self) -> Vec<Vec<u8>> {
        self.handle.join().expect("server thread")
    }
}

fn read_request(stream: &mut std::net::TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).expect("read request");
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).expect("read body");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    buf
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
