//! Execution engine: line protocol and result types.
//!
//! One JSON object per `\n`-terminated line in each direction. Requests carry
//! a single `code` field. Replies carry either the captured `stdout`/`stderr`
//! pair or a lone `error`.

use serde::{Deserialize, Serialize};

pub mod driver;
pub mod executor;
pub mod session;

pub use driver::Interpreter;
pub use executor::serve;
pub use session::{Limits, Session};

/// Reply sent when a request has no `code`.
pub const NO_CODE_MESSAGE: &str = "No code to execute";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Kept as a raw value so a non-string payload can be reported as a failed unit of work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
}

impl Request {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: Some(serde_json::Value::String(code.into())) }
    }
}

/// Everything one unit of work wrote to its two output channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Output(ExecutionResult),
    Rejected { error: String },
}

impl Response {
    pub fn no_code() -> Self {
        Response::Rejected { error: NO_CODE_MESSAGE.to_string() }
    }

    pub fn invalid(reason: impl std::fmt::Display) -> Self {
        Response::Rejected { error: format!("Invalid request: {}", reason) }
    }
}

/// Serialize a message as one protocol line, newline included.
pub fn encode_line<T: Serialize>(msg: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(msg)? + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_line_shape() {
        let line = encode_line(&Request::new("print(1)")).unwrap();
        assert_eq!(line, "{\"code\":\"print(1)\"}\n");
    }

    #[test]
    fn output_serializes_without_error_field() {
        let resp = Response::Output(ExecutionResult { stdout: "15\n".into(), stderr: String::new() });
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v, json!({"stdout": "15\n", "stderr": ""}));
    }

    #[test]
    fn rejection_serializes_as_lone_error() {
        let v = serde_json::to_value(Response::no_code()).unwrap();
        assert_eq!(v, json!({"error": "No code to execute"}));
    }

    #[test]
    fn replies_parse_into_the_right_variant() {
        let out: Response = serde_json::from_str(r#"{"stdout":"a","stderr":"b"}"#).unwrap();
        assert_eq!(out, Response::Output(ExecutionResult { stdout: "a".into(), stderr: "b".into() }));

        let rej: Response = serde_json::from_str(r#"{"error":"No code to execute"}"#).unwrap();
        assert_eq!(rej, Response::no_code());
    }

    #[test]
    fn missing_and_null_code_both_read_as_none() {
        let a: Request = serde_json::from_str(r#"{"foo":"bar"}"#).unwrap();
        let b: Request = serde_json::from_str(r#"{"code":null}"#).unwrap();
        assert!(a.code.is_none());
        assert!(b.code.is_none());
    }
}
