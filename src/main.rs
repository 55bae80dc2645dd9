#[tokio::main]
async fn main() -> anyhow::Result<()> {
    risk_console::run().await
}
