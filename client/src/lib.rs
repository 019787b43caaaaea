/// Client library for the Hatching Triage v0 API.
///
/// Thin typed wrapper over the three endpoints the scraper needs: the sample
/// feed, static analysis reports, and sample payload download.
pub mod api;
pub mod error;
pub mod models;

pub use api::TriageClient;
pub use error::{ClientError, ClientResult};
