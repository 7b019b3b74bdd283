//! Tagging station binary.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tagger_station::run().await
}
