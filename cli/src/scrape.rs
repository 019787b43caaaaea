/// Feed scraping into a local mirror directory.
///
/// Layout under the target directory:
///   reports/<id>.json   cached static reports
///   samples/<sha256>    downloaded payloads, named by content digest
///   state.json          timestamp of the last completed scrape
///
/// Deduplication is by file name: a sample whose root sha256 already exists
/// under `samples/` is never downloaded again.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use tracing::{debug, info};

use triage_client::api::MAX_PAGE_SIZE;
use triage_client::models::{FeedSubset, ReportFile, SampleKind, StaticReport};
use triage_client::TriageClient;

use crate::cli::ScrapeArgs;
use crate::state::ScrapeState;

/// Resolved mirror layout.
#[derive(Debug)]
pub struct MirrorDirs {
    reports: PathBuf,
    samples: PathBuf,
    state_file: PathBuf,
}

impl MirrorDirs {
    /// Validate the target directory and create the subdirectories.
    pub fn prepare(target: &Path) -> anyhow::Result<Self> {
        if !target.is_dir() {
            bail!("target dir {} does not exist", target.display());
        }
        let reports = target.join("reports");
        let samples = target.join("samples");
        fs::create_dir_all(&reports)
            .with_context(|| format!("failed to create {}", reports.display()))?;
        fs::create_dir_all(&samples)
            .with_context(|| format!("failed to create {}", samples.display()))?;
        Ok(Self {
            reports,
            samples,
            state_file: target.join("state.json"),
        })
    }

    /// Path of the cached report for a sample.
    pub fn report_path(&self, sample_id: &str) -> PathBuf {
        self.reports.join(format!("{sample_id}.json"))
    }

    /// Path a sample with this digest is stored at.
    pub fn sample_path(&self, sha256: &str) -> PathBuf {
        self.samples.join(sha256)
    }

    /// Whether a sample with this digest is already mirrored.
    pub fn has_sample(&self, sha256: &str) -> bool {
        self.sample_path(sha256).exists()
    }

    /// Path of the scrape state file.
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }
}

/// Run a scrape. Returns the number of new sample files written.
pub async fn run(client: &TriageClient, args: &ScrapeArgs) -> anyhow::Result<usize> {
    let dirs = MirrorDirs::prepare(&args.target_dir)?;
    let state = ScrapeState::load(dirs.state_file())?;
    let started_at = Utc::now();

    let mut processed = 0usize;
    let mut new_samples = 0usize;
    let mut offset: Option<String> = None;

    'feed: loop {
        let page = client
            .feed_page(FeedSubset::Public, MAX_PAGE_SIZE, offset.as_deref())
            .await?;
        for item in &page.data {
            if progress_due(processed) {
                debug!("processed {} reports", processed);
            }
            processed += 1;

            let report = cached_report(client, &dirs, &item.id).await?;

            // The feed is newest first: once a report predates the last
            // scrape, everything after it does too.
            if let Some(reported) = report.analysis.reported {
                if state.predates_last_scrape(reported) && !args.ignore_last_scrape_date {
                    break 'feed;
                }
            }

            match item.kind {
                SampleKind::Url => continue,
                SampleKind::Unknown => bail!("unknown feed item kind for sample {}", item.id),
                SampleKind::File => {}
            }

            let root = select_root_file(&report)
                .with_context(|| format!("report {} has no usable root file", item.id))?;
            if dirs.has_sample(&root.sha256) {
                continue;
            }

            let sample_ref = report
                .sample
                .as_ref()
                .with_context(|| format!("report {} has no sample reference", item.id))?;
            let content = client.download(&sample_ref.sample).await?;
            let sample_path = dirs.sample_path(&root.sha256);
            debug!("writing {} bytes to {}", content.len(), sample_path.display());
            fs::write(&sample_path, &content)
                .with_context(|| format!("failed to write {}", sample_path.display()))?;
            new_samples += 1;

            if new_samples >= args.max_new_sample_count {
                break 'feed;
            }
        }

        match page.next {
            Some(next) => offset = Some(next),
            None => break,
        }
    }

    info!("{} new sample(s) found", new_samples);
    ScrapeState {
        last_scrape: Some(started_at),
    }
    .store(dirs.state_file())?;

    Ok(new_samples)
}

/// Load a report from the on-disk cache, fetching and caching it on miss.
async fn cached_report(
    client: &TriageClient,
    dirs: &MirrorDirs,
    sample_id: &str,
) -> anyhow::Result<StaticReport> {
    let path = dirs.report_path(sample_id);
    if path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read cached report {}", path.display()))?;
        return serde_json::from_str(&raw)
            .with_context(|| format!("cached report {} is not valid JSON", path.display()));
    }
    let report = client.static_report(sample_id).await?;
    let raw = serde_json::to_string(&report)?;
    fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(report)
}

/// Progress is logged every 100 reports, before the next one is handled.
fn progress_due(processed: usize) -> bool {
    processed > 0 && processed % 100 == 0
}

/// The submitted file is the unique report entry at depth 0; anything else is
/// a report shape this client does not understand.
fn select_root_file(report: &StaticReport) -> anyhow::Result<&ReportFile> {
    let mut roots = report.files.iter().filter(|f| f.depth == 0);
    match (roots.next(), roots.next()) {
        (Some(root), None) => Ok(root),
        (None, _) => bail!("no file at depth 0"),
        (Some(_), Some(_)) => bail!("multiple files at depth 0"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn report_with_files(files: serde_json::Value) -> StaticReport {
        serde_json::from_value(json!({
            "sample": { "sample": "230101-abcdef" },
            "analysis": { "reported": "2023-01-01T12:00:00Z" },
            "files": files,
        }))
        .unwrap()
    }

    fn offline_client() -> TriageClient {
        // Never actually contacted in these tests.
        TriageClient::with_base_url("test-key", "test-agent/1.0", "http://127.0.0.1:9")
            .unwrap()
    }

    #[test]
    fn test_prepare_creates_mirror_layout() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = MirrorDirs::prepare(dir.path()).unwrap();
        assert!(dir.path().join("reports").is_dir());
        assert!(dir.path().join("samples").is_dir());
        assert_eq!(dirs.state_file(), dir.path().join("state.json"));
    }

    #[test]
    fn test_prepare_rejects_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let err = MirrorDirs::prepare(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_existing_sample_is_not_new() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = MirrorDirs::prepare(dir.path()).unwrap();
        let sha = "aa".repeat(32);
        assert!(!dirs.has_sample(&sha));
        fs::write(dirs.sample_path(&sha), b"payload").unwrap();
        assert!(dirs.has_sample(&sha));
    }

    #[test]
    fn test_select_root_file_picks_depth_zero() {
        let report = report_with_files(json!([
            { "sha256": "aa".repeat(32), "depth": 0 },
            { "sha256": "bb".repeat(32), "depth": 1 },
            { "sha256": "cc".repeat(32), "depth": 2 },
        ]));
        let root = select_root_file(&report).unwrap();
        assert_eq!(root.sha256, "aa".repeat(32));
    }

    #[test]
    fn test_select_root_file_rejects_zero_or_many() {
        let none = report_with_files(json!([
            { "sha256": "bb".repeat(32), "depth": 1 },
        ]));
        assert!(select_root_file(&none).is_err());

        let many = report_with_files(json!([
            { "sha256": "aa".repeat(32), "depth": 0 },
            { "sha256": "bb".repeat(32), "depth": 0 },
        ]));
        assert!(select_root_file(&many).is_err());
    }

    #[tokio::test]
    async fn test_cached_report_is_served_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = MirrorDirs::prepare(dir.path()).unwrap();
        let raw = json!({
            "sample": { "sample": "230101-abcdef" },
            "analysis": { "reported": "2023-01-01T12:00:00Z" },
            "files": [ { "sha256": "aa".repeat(32), "depth": 0 } ],
        });
        fs::write(dirs.report_path("230101-abcdef"), raw.to_string()).unwrap();

        // The client points at a closed port; a cache hit must not touch it.
        let client = offline_client();
        let report = cached_report(&client, &dirs, "230101-abcdef").await.unwrap();
        assert_eq!(report.sample.unwrap().sample, "230101-abcdef");
        assert_eq!(report.files.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_cached_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = MirrorDirs::prepare(dir.path()).unwrap();
        fs::write(dirs.report_path("230101-abcdef"), "not json").unwrap();

        let client = offline_client();
        let err = cached_report(&client, &dirs, "230101-abcdef")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_progress_cadence() {
        assert!(!progress_due(0));
        assert!(!progress_due(99));
        assert!(progress_due(100));
        assert!(!progress_due(101));
        assert!(progress_due(200));
    }

    /// Stub a two-page feed: two file submissions on page one, one url
    /// submission on page two. Report and payload endpoints for both files.
    /// Payload ids differ from feed ids to pin the `sample.sample` lookup.
    async fn mount_remote(server: &MockServer, sha_a: &str, sha_b: &str) {
        Mock::given(method("GET"))
            .and(path("/samples"))
            .and(query_param("offset", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "230101-url001",
                    "kind": "url",
                    "status": "reported",
                    "submitted": "2023-01-01T12:06:00Z"
                }]
            })))
            .with_priority(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/samples"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {
                        "id": "230101-aaa001",
                        "kind": "file",
                        "filename": "dropper.exe",
                        "status": "reported",
                        "submitted": "2023-01-01T12:00:00.123456Z"
                    },
                    {
                        "id": "230101-bbb002",
                        "kind": "file",
                        "filename": "payload.bin",
                        "status": "reported",
                        "submitted": "2023-01-01T11:00:00Z"
                    }
                ],
                "next": "page2"
            })))
            .mount(server)
            .await;

        // Reports are cached for url submissions too, before the kind check.
        Mock::given(method("GET"))
            .and(path("/samples/230101-url001/reports/static"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sample": { "sample": "dl-230101-url001" },
                "analysis": { "reported": "2023-01-01T12:05:00Z" }
            })))
            .mount(server)
            .await;

        for (id, sha) in [("230101-aaa001", sha_a), ("230101-bbb002", sha_b)] {
            Mock::given(method("GET"))
                .and(path(format!("/samples/{id}/reports/static")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "sample": { "sample": format!("dl-{id}") },
                    "analysis": { "reported": "2023-01-01T12:03:00Z" },
                    "files": [ { "sha256": sha, "depth": 0 } ]
                })))
                .mount(server)
                .await;

            Mock::given(method("GET"))
                .and(path(format!("/samples/dl-{id}/sample")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_bytes(format!("payload-{id}").into_bytes()),
                )
                .mount(server)
                .await;
        }
    }

    fn scrape_args(target: &Path, max: usize, ignore: bool) -> ScrapeArgs {
        ScrapeArgs {
            target_dir: target.to_path_buf(),
            max_new_sample_count: max,
            ignore_last_scrape_date: ignore,
        }
    }

    fn sample_names(target: &Path) -> HashSet<String> {
        fs::read_dir(target.join("samples"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_scrape_mirrors_new_samples_once() {
        let sha_a = "aa".repeat(32);
        let sha_b = "bb".repeat(32);
        let server = MockServer::start().await;
        mount_remote(&server, &sha_a, &sha_b).await;

        let client =
            TriageClient::with_base_url("test-key", "test-agent/1.0", &server.uri()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        // First pass walks both pages and mirrors the two file submissions.
        let first = run(&client, &scrape_args(dir.path(), 10, false))
            .await
            .unwrap();
        assert_eq!(first, 2);
        let after_first = sample_names(dir.path());
        assert_eq!(
            after_first,
            HashSet::from([sha_a.clone(), sha_b.clone()])
        );

        // Second pass hits the cut-off: nothing remote is newer than the
        // recorded scrape time, so zero files are written.
        let second = run(&client, &scrape_args(dir.path(), 10, false))
            .await
            .unwrap();
        assert_eq!(second, 0);

        // Even walking the whole feed again, hashes already present as file
        // names are never re-downloaded; the sample set stays identical.
        let third = run(&client, &scrape_args(dir.path(), 10, true))
            .await
            .unwrap();
        assert_eq!(third, 0);
        assert_eq!(sample_names(dir.path()), after_first);
    }

    #[tokio::test]
    async fn test_scrape_stops_at_max_new_sample_count() {
        let sha_a = "aa".repeat(32);
        let sha_b = "bb".repeat(32);
        let server = MockServer::start().await;
        mount_remote(&server, &sha_a, &sha_b).await;

        let client =
            TriageClient::with_base_url("test-key", "test-agent/1.0", &server.uri()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let count = run(&client, &scrape_args(dir.path(), 1, false))
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(sample_names(dir.path()), HashSet::from([sha_a]));
    }
}
