#![allow(dead_code)]

//! A minimal in-process stand-in for the session API, enough to record
//! what the engine sends and answer with canned JSON.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::json;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

pub struct StubApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubApi {
    /// Starts the stub on an ephemeral port. `open_status` is the status
    /// answered to session-open calls; every other route answers 200.
    pub fn start(open_status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let addr = listener.local_addr().expect("stub addr");
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            let mut next_id: i64 = 101;
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let Some(request) = read_request(&mut stream) else {
                    continue;
                };

                let is_open = request.method == "POST"
                    && request.path.ends_with("/client/lesson-sessions");

                recorded.lock().unwrap().push(request.clone());

                if is_open {
                    if (200..300).contains(&open_status) {
                        let body = json!({
                            "id": next_id,
                            "lessonId": request.body.get("lessonId").cloned(),
                            "studentId": request.body.get("studentId").cloned(),
                            "isActive": true,
                        })
                        .to_string();
                        next_id += 1;
                        respond(&mut stream, open_status, &body);
                    } else {
                        respond(&mut stream, open_status, r#"{"message":"rejected"}"#);
                    }
                } else {
                    respond(&mut stream, 200, "{}");
                }
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded activity-log bodies, in arrival order.
    pub fn activity_kinds(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter(|r| r.path.ends_with("/client/activity-logs"))
            .filter_map(|r| r.body.get("kind").and_then(|k| k.as_str()).map(String::from))
            .collect()
    }
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .ok()?;
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
        if lower.starts_with("authorization:") {
            authorization = Some(line["authorization:".len()..].trim().to_string());
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).ok()?;
    }
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    Some(RecordedRequest {
        method,
        path,
        authorization,
        body,
    })
}

fn respond(stream: &mut TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

pub fn test_config(base_url: &str) -> studywatch::Config {
    studywatch::Config {
        base_url: base_url.to_string(),
        auth_token: "test-token".to_string(),
        student_id: "student-9".to_string(),
        institution_id: "inst-3".to_string(),
        idle_threshold: Duration::from_secs(30),
        tick_interval: Duration::from_millis(50),
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
