use anyhow::Result;
use codebox::{
    cli::{Cli, Command},
    config::Config,
    handlers, logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    logging::init(args.verbose);

    let cfg = Config::load();

    match args.command {
        Command::Serve => handlers::serve::run(&cfg).await,
        Command::Run { code, file, timeout, executor } => {
            handlers::run::run(&cfg, code, file, timeout, executor).await
        }
        Command::DbCheck { table } => handlers::db_check::run(&cfg, table).await,
        Command::Analyze { query, context, model, no_md } => {
            handlers::analyze::run(&cfg, &query, context, model, no_md).await
        }
    }
}
