#[tokio::main]
async fn main() -> anyhow::Result<()> {
    review_import_backend::run().await
}
