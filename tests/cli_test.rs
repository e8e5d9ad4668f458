//! Drives the real `codebox serve` binary through the process launcher.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Result;
use codebox::{
    error::DriverError,
    process::{ExecutorProcess, Launcher},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

fn launcher() -> Launcher {
    Launcher {
        program: env!("CARGO_BIN_EXE_codebox").to_string(),
        args: vec!["serve".into()],
    }
}

#[tokio::test]
async fn serve_binary_keeps_state_between_units() -> Result<()> {
    let mut p = ExecutorProcess::spawn(&launcher(), Duration::from_secs(30)).await?;

    let first = p.interpreter().submit("let greeting = \"hello\";").await?;
    assert_eq!(first.stdout, "");
    assert_eq!(first.stderr, "");

    let second = p.interpreter().submit("print(greeting + \", world\")").await?;
    assert_eq!(second.stdout, "hello, world\n");

    p.terminate().await?;
    Ok(())
}

#[tokio::test]
async fn serve_binary_speaks_the_wire_format() -> Result<()> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_codebox"))
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap()).lines();

    stdin
        .write_all(b"{\"code\": \"let x = 5;\"}\n{\"foo\": \"bar\"}\n{\"code\": \"print(x + 10)\"}\n")
        .await?;
    stdin.flush().await?;

    let a = stdout.next_line().await?.unwrap();
    let b = stdout.next_line().await?.unwrap();
    let c = stdout.next_line().await?.unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&a)?, serde_json::json!({"stdout": "", "stderr": ""}));
    assert_eq!(serde_json::from_str::<serde_json::Value>(&b)?, serde_json::json!({"error": "No code to execute"}));
    assert_eq!(serde_json::from_str::<serde_json::Value>(&c)?, serde_json::json!({"stdout": "15\n", "stderr": ""}));

    drop(stdin);
    let status = child.wait().await?;
    assert!(status.success());
    assert!(stdout.next_line().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn run_subcommand_relays_output() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_codebox"))
        .args(["run", "-c", "let n = 2;", "-c", "print(n * 21); debug(\"note\");"])
        .env("EXECUTOR_COMMAND", format!("{} serve", env!("CARGO_BIN_EXE_codebox")))
        .stdin(Stdio::null())
        .output()
        .await?;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "42\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("note"));
    Ok(())
}

#[tokio::test]
async fn executor_that_dies_surfaces_end_of_stream() -> Result<()> {
    let mut p = ExecutorProcess::spawn(
        &Launcher { program: env!("CARGO_BIN_EXE_codebox").to_string(), args: vec!["no-such-subcommand".into()] },
        Duration::from_secs(30),
    )
    .await?;

    match p.interpreter().submit("print(1)").await {
        Err(DriverError::EndOfStream) | Err(DriverError::Io(_)) => Ok(()),
        other => panic!("expected end of stream, got {other:?}"),
    }
}
