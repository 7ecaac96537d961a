// src/main.rs

use runcast::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(err) => {
            eprintln!("runcast error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<runcast::Outcome> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
