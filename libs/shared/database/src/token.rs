use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::ServiceAccountAuthenticator;

use shared_config::AppConfig;

use crate::error::SheetsError;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Source of the bearer token sent to the Sheets API.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, SheetsError>;
}

/// A token issued elsewhere (`GOOGLE_ACCESS_TOKEN`, tests).
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, SheetsError> {
        Ok(self.token.clone())
    }
}

/// Service-account flow; the authenticator caches and refreshes tokens.
pub struct ServiceAccountTokenProvider {
    authenticator: DefaultAuthenticator,
}

impl ServiceAccountTokenProvider {
    pub async fn from_key_file(path: &str) -> Result<Self, SheetsError> {
        debug!("Reading service account key from {}", path);

        let key = yup_oauth2::read_service_account_key(path)
            .await
            .map_err(|e| SheetsError::Credentials(format!("Failed to read key file {}: {}", path, e)))?;

        let authenticator = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| SheetsError::Credentials(format!("Failed to build authenticator: {}", e)))?;

        Ok(Self { authenticator })
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String, SheetsError> {
        let token = self
            .authenticator
            .token(&[SPREADSHEETS_SCOPE])
            .await
            .map_err(|e| SheetsError::Auth(e.to_string()))?;

        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| SheetsError::Auth("Service account returned no access token".to_string()))
    }
}

/// Picks the token source from configuration: an explicit token wins over
/// the key file.
pub async fn provider_from_config(config: &AppConfig) -> Result<Arc<dyn AccessTokenProvider>, SheetsError> {
    if let Some(token) = &config.google_access_token {
        info!("Using GOOGLE_ACCESS_TOKEN for spreadsheet access");
        return Ok(Arc::new(StaticTokenProvider::new(token.clone())));
    }

    match &config.google_application_credentials {
        Some(path) => {
            info!("Using service account credentials for spreadsheet access");
            Ok(Arc::new(ServiceAccountTokenProvider::from_key_file(path).await?))
        }
        None => Err(SheetsError::Credentials(
            "Neither GOOGLE_ACCESS_TOKEN nor GOOGLE_APPLICATION_CREDENTIALS is set".to_string(),
        )),
    }
}
