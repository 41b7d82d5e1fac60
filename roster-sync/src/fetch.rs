//! Fetch the roster snapshot from its remote endpoint.

use std::time::Duration;

use serde_json::Value;

use crate::error::SyncError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// `GET url` and return the body if it is a JSON array.
///
/// Non-2xx responses and connection failures are [`SyncError::Transport`];
/// a body that is not an array is [`SyncError::MalformedPayload`].
pub fn fetch_snapshot(url: &str) -> Result<Value, SyncError> {
    tracing::info!("fetching roster snapshot from {url}");

    let agent = ureq::AgentBuilder::new().timeout(FETCH_TIMEOUT).build();
    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            tracing::error!("snapshot fetch failed: status={status} body={body}");
            return Err(SyncError::Transport {
                status: Some(status),
                body,
            });
        }
        Err(err) => {
            tracing::error!("snapshot fetch failed: {err}");
            return Err(SyncError::Transport {
                status: None,
                body: err.to_string(),
            });
        }
    };

    let data: Value = response.into_json().map_err(|e| SyncError::Transport {
        status: None,
        body: format!("invalid JSON body: {e}"),
    })?;
    check_snapshot(data)
}

fn check_snapshot(data: Value) -> Result<Value, SyncError> {
    if data.is_array() {
        Ok(data)
    } else {
        tracing::error!("snapshot endpoint did not return a JSON array: {data}");
        Err(SyncError::malformed(
            "snapshot endpoint did not return a JSON array",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve every connection on a local port with one canned HTTP response.
    fn serve(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().expect("clone"));
                let mut line = String::new();
                while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
                    if line == "\r\n" {
                        break;
                    }
                    line.clear();
                }
                let _ = write!(
                    stream,
                    "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
            }
        });
        format!("http://{addr}/roster.json")
    }

    #[test]
    fn non_2xx_keeps_status_and_body() {
        let url = serve("503 Service Unavailable", "quota");
        let err = fetch_snapshot(&url).unwrap_err();
        match &err {
            SyncError::Transport { status, body } => {
                assert_eq!(*status, Some(503));
                assert_eq!(body, "quota");
            }
            other => panic!("expected transport failure, got {other:?}"),
        }
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn array_body_is_returned() {
        let url = serve("200 OK", r#"[{"EMPLOYEE ID NUMBER":"E1"}]"#);
        let data = fetch_snapshot(&url).expect("fetch");
        assert_eq!(data, json!([{ "EMPLOYEE ID NUMBER": "E1" }]));
    }

    #[test]
    fn arrays_pass_objects_fail() {
        assert!(check_snapshot(json!([{ "EMPLOYEE ID NUMBER": "E1" }])).is_ok());
        let err = check_snapshot(json!({ "error": "quota" })).unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn unreachable_host_is_transport_failure() {
        // Port 9 on localhost is closed on any sane test machine.
        let err = fetch_snapshot("http://127.0.0.1:9/roster.json").unwrap_err();
        assert!(
            matches!(err, SyncError::Transport { status: None, .. }),
            "got: {err}"
        );
    }
}
