#[tokio::main]
async fn main() -> anyhow::Result<()> {
    extracts_cli::run().await
}
