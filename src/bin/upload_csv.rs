//! Uploads a CSV of loan products to the ingestion pipeline.
//!
//! Usage: `upload_csv <path>` with `UPLOAD_SERVICE_URL` set.

use dotenvy::dotenv;
use rust_loan_finder_api::upload_client::UploadClient;
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let path = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: upload_csv <path-to-csv>"))?;
    let base_url = env::var("UPLOAD_SERVICE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("UPLOAD_SERVICE_URL environment variable required"))?;

    let contents = tokio::fs::read(&path).await?;
    let file_name = Path::new(&path)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);

    let client = UploadClient::new(base_url)?;
    let response = client.upload_csv(file_name.as_deref(), contents).await?;

    println!("{}", response.status);
    if let Some(key) = response.key {
        println!("Object key: {}", key);
    }

    Ok(())
}
