//! `codebox serve`: executor loop on this process's stdin/stdout.

use anyhow::Result;
use tokio::io::{self, BufReader};

use crate::{
    config::Config,
    execution::{serve, Limits, Session},
};

pub async fn run(cfg: &Config) -> Result<()> {
    let limits = Limits::from_config(cfg)?;
    tracing::info!(?limits, "executor ready");

    let mut session = Session::new(limits);
    serve(BufReader::new(io::stdin()), io::stdout(), &mut session).await
}
