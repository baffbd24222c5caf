use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

use crate::services::export_api::ExportApi;
use hidro_report::fetch::auth::ApiKey;
use hidro_report::fetch::{BasicClient, fetch_bytes};

/// Backend and report used by the production deployment.
const DEFAULT_BASE_URL: &str = "https://backend.metam.com.br";
const DEFAULT_REPORT_ID: &str = "68298";

/// Client for the Metam telemetry backend.
///
/// `GET {base}/api/last-report/{report_id}/export?start=..&end=..` with a
/// bearer token returns a JSON body whose `last_report_export` field is the
/// pre-signed CSV download link.
pub struct MetamClient {
    base_url: String,
    report_id: String,
    client: ApiKey<BasicClient>,
}

impl MetamClient {
    pub fn with_base_url(base_url: String, report_id: String, access_token: String) -> Self {
        Self {
            base_url,
            report_id,
            client: ApiKey::bearer(BasicClient::new(), access_token),
        }
    }

    /// Builds a client from the environment: `ACCESS_TOKEN` (required, the
    /// `.env` file is honored), `METAM_BASE_URL` and `METAM_REPORT_ID`
    /// (optional overrides).
    pub fn from_env() -> Result<Self> {
        let access_token =
            std::env::var("ACCESS_TOKEN").context("ACCESS_TOKEN must be set (see .env)")?;
        let base_url =
            std::env::var("METAM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let report_id =
            std::env::var("METAM_REPORT_ID").unwrap_or_else(|_| DEFAULT_REPORT_ID.to_string());

        Ok(Self::with_base_url(base_url, report_id, access_token))
    }
}

#[async_trait::async_trait]
impl ExportApi for MetamClient {
    async fn export_url(&self, start: NaiveDate, end: NaiveDate) -> Result<String> {
        let url = format!(
            "{}/api/last-report/{}/export?start={}&end={}",
            self.base_url,
            self.report_id,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );

        let body = fetch_bytes(&self.client, &url)
            .await
            .context("export request to the telemetry API failed")?;

        let json: serde_json::Value =
            serde_json::from_slice(&body).context("export response was not valid JSON")?;

        json["last_report_export"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("`last_report_export` link missing from export response"))
    }
}
