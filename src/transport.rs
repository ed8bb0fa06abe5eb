use crate::error::{Error, Result};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// A single request/response exchange with the chat client.
pub trait Transport {
    /// Issue `method` with `options` and return the response's `result` field.
    fn call(&self, method: &str, options: Value) -> Result<Value>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn call(&self, method: &str, options: Value) -> Result<Value> {
        (**self).call(method, options)
    }
}

/// Drives `keybase chat api -m <payload>`, spawning one process per call.
#[derive(Debug, Clone)]
pub struct KeybaseCli {
    binary: PathBuf,
}

impl KeybaseCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Transport for KeybaseCli {
    fn call(&self, method: &str, options: Value) -> Result<Value> {
        let payload = request_payload(method, options);
        debug!(method, binary = %self.binary.display(), "calling chat api");

        let output = Command::new(&self.binary)
            .args(["chat", "api", "-m", &payload])
            .output()
            .map_err(|source| Error::Spawn {
                binary: self.binary.display().to_string(),
                method: method.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::Transport {
                method: method.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        decode_response(method, strip_line_terminator(&output.stdout))
    }
}

fn request_payload(method: &str, options: Value) -> String {
    let options = if options.is_null() { json!({}) } else { options };
    json!({ "method": method, "params": { "options": options } }).to_string()
}

/// Remove exactly one trailing `\n` (or `\r\n`).
fn strip_line_terminator(out: &[u8]) -> &[u8] {
    match out.strip_suffix(b"\n") {
        Some(rest) => rest.strip_suffix(b"\r").unwrap_or(rest),
        None => out,
    }
}

/// Decode raw stdout. Invalid UTF-8 is a decode failure, never replaced.
fn decode_response(method: &str, body: &[u8]) -> Result<Value> {
    let mut response: Value = serde_json::from_slice(body).map_err(|source| Error::Decode {
        method: method.to_string(),
        source,
    })?;

    let Some(obj) = response.as_object_mut() else {
        return Err(Error::protocol(method, "response is not a JSON object"));
    };

    if let Some(err) = obj.get("error").filter(|e| !e.is_null()) {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(Error::protocol(method, format!("client error: {}", message)));
    }

    obj.remove("result")
        .ok_or_else(|| Error::protocol(method, "response has no `result` field"))
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records every call and replays scripted results in order.
    ///
    /// `download` calls without a scripted reply succeed and create the
    /// requested `output` file, like the real client does.
    #[derive(Default)]
    pub struct MockTransport {
        replies: RefCell<VecDeque<(String, Result<Value>)>>,
        pub calls: RefCell<Vec<(String, Value)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, method: &str, result: Value) -> Self {
            self.replies
                .borrow_mut()
                .push_back((method.to_string(), Ok(result)));
            self
        }

        pub fn fail(self, method: &str, err: Error) -> Self {
            self.replies
                .borrow_mut()
                .push_back((method.to_string(), Err(err)));
            self
        }

        pub fn calls_to(&self, method: &str) -> Vec<Value> {
            self.calls
                .borrow()
                .iter()
                .filter(|(m, _)| m == method)
                .map(|(_, o)| o.clone())
                .collect()
        }
    }

    impl Transport for MockTransport {
        fn call(&self, method: &str, options: Value) -> Result<Value> {
            self.calls
                .borrow_mut()
                .push((method.to_string(), options.clone()));

            let mut replies = self.replies.borrow_mut();
            if replies.front().is_some_and(|(m, _)| m == method) {
                return replies.pop_front().map(|(_, r)| r).unwrap();
            }
            drop(replies);

            if method == "download" {
                let output = options["output"].as_str().unwrap();
                std::fs::write(output, format!("payload of {}", options["message_id"])).unwrap();
                return Ok(json!({}));
            }
            panic!("unexpected `{}` call with {}", method, options);
        }
    }
}
