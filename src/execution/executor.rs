//! Executor loop: one request line in, one response line out, until EOF.

use anyhow::Result;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::{encode_line, ExecutionResult, Request, Response, Session};

/// Serve requests from `reader` until it is exhausted.
///
/// Only I/O failures on the stream itself end the loop early; bad requests
/// and failing units of work are answered and the loop carries on.
pub async fn serve<R, W>(reader: R, mut writer: W, session: &mut Session) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = reader;
    let mut buf = Vec::new();
    let mut served = 0usize;

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            tracing::info!(served, "input closed, executor stopping");
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => handle_line(line.trim_end_matches(['\r', '\n']), session),
            Err(e) => reject(e),
        };
        writer.write_all(encode_line(&response)?.as_bytes()).await?;
        writer.flush().await?;
        served += 1;
    }

    Ok(())
}

/// Turn one request line into its response.
pub fn handle_line(line: &str, session: &mut Session) -> Response {
    let request: Request = match serde_json::from_str::<Value>(line) {
        Ok(value @ Value::Object(_)) => match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => return reject(e),
        },
        Ok(other) => return reject(format!("expected a JSON object, got {}", kind(&other))),
        Err(e) => return reject(e),
    };

    match request.code {
        None => {
            tracing::warn!("request has no code");
            Response::no_code()
        }
        Some(Value::String(code)) => {
            tracing::debug!(bytes = code.len(), "executing unit of work");
            Response::Output(session.execute(&code))
        }
        Some(other) => Response::Output(ExecutionResult {
            stdout: String::new(),
            stderr: format!("Execution Error: code must be a string, got {}\n", kind(&other)),
        }),
    }
}

fn reject(reason: impl std::fmt::Display) -> Response {
    tracing::warn!(%reason, "invalid request");
    Response::invalid(reason)
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
