//! Driver side of the line protocol: submit code, wait for one reply.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::{encode_line, ExecutionResult, Request, Response};
use crate::{
    error::{DriverError, DriverResult},
    printer::OutputPrinter,
};

pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for a running executor loop, one request in flight at a time.
pub struct Interpreter<W, R> {
    writer: W,
    reader: R,
    timeout: Duration,
    printer: OutputPrinter,
    desynced: bool,
}

impl<W, R> Interpreter<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    pub fn new(writer: W, reader: R) -> Self {
        Self {
            writer,
            reader,
            timeout: DEFAULT_RESPONSE_TIMEOUT,
            printer: OutputPrinter::detect(),
            desynced: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_printer(mut self, printer: OutputPrinter) -> Self {
        self.printer = printer;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one unit of work and return what it printed.
    pub async fn submit(&mut self, code: &str) -> DriverResult<ExecutionResult> {
        if self.desynced {
            return Err(DriverError::Desynchronized);
        }

        let line = encode_line(&Request::new(code)).map_err(|source| DriverError::Malformed {
            line: code.to_string(),
            source,
        })?;
        tracing::debug!(bytes = code.len(), "submitting unit of work");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        let mut reply = String::new();
        let n = match tokio::time::timeout(self.timeout, self.reader.read_line(&mut reply)).await {
            Ok(read) => read?,
            Err(_) => {
                self.desynced = true;
                return Err(DriverError::Timeout(self.timeout));
            }
        };
        if n == 0 {
            return Err(DriverError::EndOfStream);
        }

        match serde_json::from_str::<Response>(reply.trim_end()) {
            Ok(Response::Output(result)) => Ok(result),
            Ok(Response::Rejected { error }) => Err(DriverError::Rejected(error)),
            Err(source) => Err(DriverError::Malformed { line: reply, source }),
        }
    }

    /// Submit and relay the captured output to this process's stdout/stderr.
    pub async fn run_code(&mut self, code: &str) -> DriverResult<ExecutionResult> {
        let result = self.submit(code).await?;
        self.printer.print(&result);
        Ok(result)
    }

    pub fn into_inner(self) -> (W, R) {
        (self.writer, self.reader)
    }
}
