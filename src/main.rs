// src/main.rs

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = watchrun::cli::parse();
    watchrun::logging::init_logging(args.log_level)?;
    watchrun::run(args).await
}
