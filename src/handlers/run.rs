//! `codebox run`: start an executor and drive it.

use std::{
    io::{self, Read, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    config::Config,
    error::DriverError,
    execution::driver::DEFAULT_RESPONSE_TIMEOUT,
    process::{ExecutorProcess, Launcher},
};

pub async fn run(
    cfg: &Config,
    code: Vec<String>,
    files: Vec<PathBuf>,
    timeout: Option<u64>,
    executor: Option<String>,
) -> Result<()> {
    let timeout = response_timeout(cfg, timeout)?;
    let launcher = match executor.as_deref() {
        Some(cmd) => Launcher::parse(cmd)?,
        None => Launcher::from_config(cfg)?,
    };

    let mut units = code;
    for path in &files {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        units.push(text);
    }

    let mut process = ExecutorProcess::spawn(&launcher, timeout).await?;

    let outcome = if !units.is_empty() {
        submit_all(&mut process, &units).await
    } else if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        submit_all(&mut process, &[buf]).await
    } else {
        interactive(&mut process).await
    };

    let terminated = process.terminate().await;
    outcome?;
    terminated
}

fn response_timeout(cfg: &Config, flag: Option<u64>) -> Result<Duration> {
    match flag {
        Some(0) => bail!("--timeout must be at least 1 second"),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(cfg.get_duration_secs("RESPONSE_TIMEOUT")?.unwrap_or(DEFAULT_RESPONSE_TIMEOUT)),
    }
}

async fn submit_all(process: &mut ExecutorProcess, units: &[String]) -> Result<()> {
    for (i, unit) in units.iter().enumerate() {
        if let Err(e) = process.run_code(unit).await {
            if matches!(e, DriverError::Rejected(_)) {
                tracing::warn!(unit = i + 1, error = %e, "unit of work rejected");
            }
            return Err(e).with_context(|| format!("unit of work #{} failed", i + 1));
        }
    }
    Ok(())
}

/// Read blocks from the terminal; a blank line submits, EOF ends the session.
async fn interactive(process: &mut ExecutorProcess) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut block = String::new();

    loop {
        prompt(if block.is_empty() { ">>> " } else { "... " });
        let Some(line) = lines.next_line().await? else {
            break;
        };

        if !line.trim().is_empty() {
            block.push_str(&line);
            block.push('\n');
            continue;
        }
        if block.is_empty() {
            continue;
        }

        let unit = std::mem::take(&mut block);
        match process.run_code(&unit).await {
            Ok(_) => {}
            Err(DriverError::Rejected(msg)) => eprintln!("rejected: {}", msg),
            Err(e) => return Err(e.into()),
        }
    }

    if !block.trim().is_empty() {
        process.run_code(&block).await?;
    }
    println!();
    Ok(())
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = io::stdout().flush();
}
