use anyhow::Result;
use recap::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
