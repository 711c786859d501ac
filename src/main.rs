use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    quietsave::cli::run().await
}
