use std::sync::Arc;

use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_models::SheetTable;

use crate::error::SheetsError;
use crate::token::AccessTokenProvider;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Client for the Google Sheets v4 `values` endpoints.
pub struct GoogleSheetsClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl GoogleSheetsClient {
    pub fn new(config: &AppConfig, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_base_url(&config.google_sheets_base_url, tokens)
    }

    pub fn with_base_url(base_url: &str, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SheetsError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);

        Ok(url)
    }

    async fn request(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value, SheetsError> {
        debug!("Making {} request to {}", method, url);

        let token = self.tokens.access_token().await?;
        let mut req = self.client.request(method, url).bearer_auth(token);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Sheets API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => SheetsError::Auth(error_text),
                code => SheetsError::Api { status: code, message: error_text },
            });
        }

        Ok(response.json::<Value>().await?)
    }

    /// Reads a range; the first row becomes the table header.
    pub async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<SheetTable, SheetsError> {
        let url = self.values_url(spreadsheet_id, range)?;
        let body = self.request(Method::GET, url, None).await?;

        let value_range: ValueRange = serde_json::from_value(body).map_err(|e| SheetsError::Api {
            status: 200,
            message: format!("Unexpected response body: {}", e),
        })?;

        let values = value_range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();

        Ok(SheetTable::from_values(values)?)
    }

    /// Tries `get_values` up to `max_tries` times, returning the first
    /// success or the last error.
    pub async fn get_values_with_retry(
        &self,
        spreadsheet_id: &str,
        range: &str,
        max_tries: u32,
        label: &str,
    ) -> Result<SheetTable, SheetsError> {
        let attempts = max_tries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            info!("Attempt {}: reading {} from the Sheets API", attempt, label);

            match self.get_values(spreadsheet_id, range).await {
                Ok(table) => return Ok(table),
                Err(e) => {
                    warn!("Reading {} failed: {}", label, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SheetsError::Api {
            status: 0,
            message: format!("No attempt made to read {}", label),
        }))
    }

    /// Writes a single cell, letting the spreadsheet parse the value as if
    /// typed by a user.
    pub async fn update_cell(&self, spreadsheet_id: &str, range: &str, value: &str) -> Result<(), SheetsError> {
        let mut url = self.values_url(spreadsheet_id, range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");

        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        });

        self.request(Method::PUT, url, Some(body)).await?;
        Ok(())
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
