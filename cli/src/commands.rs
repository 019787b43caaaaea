/// Handlers for the one-shot subcommands (feed, report, download).
use std::fs;

use anyhow::Context;
use sha2::{Digest, Sha256};
use tracing::info;

use triage_client::api::MAX_PAGE_SIZE;
use triage_client::models::FeedSubset;
use triage_client::TriageClient;

use crate::cli::{DownloadArgs, FeedArgs, ReportArgs};

/// `feed`: print one line per entry of the newest feed page.
pub async fn feed(client: &TriageClient, args: &FeedArgs) -> anyhow::Result<()> {
    let subset = if args.owned {
        FeedSubset::Owned
    } else {
        FeedSubset::Public
    };
    let page = client.feed_page(subset, MAX_PAGE_SIZE, None).await?;
    for item in &page.data {
        println!(
            "{}  {}  {}",
            item.id,
            item.submitted.format("%Y-%m-%d %H:%M:%S"),
            item.filename.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

/// `report`: dump the static report as compact JSON.
pub async fn report(client: &TriageClient, args: &ReportArgs) -> anyhow::Result<()> {
    let report = client.static_report(&args.sample_id).await?;
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

/// `download`: fetch one sample and store it under its content digest.
pub async fn download(client: &TriageClient, args: &DownloadArgs) -> anyhow::Result<()> {
    let content = client.download(&args.sample_id).await?;
    let path = args.output_dir.join(content_digest(&content));
    info!("writing {} bytes to {}", content.len(), path.display());
    fs::write(&path, &content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Hex-encoded SHA-256 of the payload; doubles as the on-disk file name.
pub fn content_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_digest_matches_known_vector() {
        // sha256("abc")
        assert_eq!(
            content_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_content_digest_is_stable() {
        let payload = vec![0u8; 1024];
        assert_eq!(content_digest(&payload), content_digest(&payload));
        assert_eq!(content_digest(&payload).len(), 64);
    }
}
