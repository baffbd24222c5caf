//! Trait for the telemetry backend that publishes meter exports.

use anyhow::Result;
use chrono::NaiveDate;

/// Abstraction over the export side of a telemetry backend.
///
/// Downloading is a two-step dance: ask the API for the export link for a
/// date range, then fetch that link. Implementations only handle the first
/// step; the returned URL is pre-signed and needs no credentials.
#[async_trait::async_trait]
pub trait ExportApi {
    /// Resolves the CSV download URL for readings in `[start, end]`.
    async fn export_url(&self, start: NaiveDate, end: NaiveDate) -> Result<String>;
}
