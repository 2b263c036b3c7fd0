#[tokio::main]
async fn main() -> eyre::Result<()> {
    replayq::run().await
}
