use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_config::AppConfig;
use shared_models::AppError;

// ==============================================================================
// LOGIN PAGE LOCATORS
// ==============================================================================

pub const LOGIN_EMAIL_XPATH: &str = r#"//*[@id="loginform"]/div[1]/div/div/input"#;
pub const LOGIN_PASSWORD_XPATH: &str = r#"//*[@id="loginform"]/div[2]/div/div/input"#;
pub const LOGIN_SUBMIT_XPATH: &str = r#"//*[@id="loginform"]/div[3]/div/button"#;
pub const AGENDA_LINK_XPATH: &str = r#"//*[@id="navigation"]/ul/li[2]/a"#;
pub const CAPTCHA_RESPONSE_ELEMENT_ID: &str = "g-recaptcha-response-100000";

pub const AUTHORIZATION_HEADER: &str = "authorization";

// ==============================================================================
// SESSION SETTINGS
// ==============================================================================

#[derive(Debug, Clone)]
pub struct AmplimedSettings {
    pub base_url: String,
    pub login_url: String,
    pub email: String,
    pub password: String,
    pub website_key: String,
    pub authorization_key: Option<String>,
    pub manual_captcha: bool,
    /// Pause after each navigation so the page scripts can run.
    pub page_settle: Duration,
    /// How long the operator gets to solve the captcha and log in by hand.
    pub manual_login_wait: Duration,
    pub navigation_timeout: Duration,
}

impl AmplimedSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.amplimed_base_url.trim_end_matches('/').to_string(),
            login_url: config.amplimed_login_url.clone(),
            email: config.amplimed_login_email.clone(),
            password: config.amplimed_login_password.clone(),
            website_key: config.anticaptcha_website_key.clone(),
            authorization_key: config.amplimed_authorization_key.clone(),
            manual_captcha: config.always_manually_solve_captcha,
            page_settle: Duration::from_secs(10),
            manual_login_wait: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

// ==============================================================================
// ANTI-CAPTCHA WIRE TYPES
// ==============================================================================

pub const RECAPTCHA_V2_TASK: &str = "RecaptchaV2TaskProxyless";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest<'a> {
    pub client_key: &'a str,
    pub task: RecaptchaTask<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecaptchaTask<'a> {
    #[serde(rename = "type")]
    pub task_type: &'a str,
    #[serde(rename = "websiteURL")]
    pub website_url: &'a str,
    pub website_key: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResultRequest<'a> {
    pub client_key: &'a str,
    pub task_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    pub error_id: i64,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub task_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResultResponse {
    pub error_id: i64,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub status: Option<String>,
    pub solution: Option<RecaptchaSolution>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecaptchaSolution {
    pub g_recaptcha_response: String,
}

/// What an in-page XHR reports back.
#[derive(Debug, Deserialize)]
pub struct XhrOutcome {
    pub status: u16,
    #[serde(default)]
    pub body: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum CaptchaError {
    #[error("Anti-captcha service error {code}: {description}")]
    Service { code: String, description: String },

    #[error("Captcha not solved after {polls} polls")]
    Timeout { polls: u32 },

    #[error("Anti-captcha returned an unexpected response: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum AmplimedError {
    #[error("Browser error: {message}")]
    Browser { message: String },

    #[error("Element {xpath} not found within {seconds}s")]
    ElementTimeout { xpath: String, seconds: u64 },

    #[error("Captcha error: {0}")]
    Captcha(#[from] CaptchaError),

    #[error("No authorization header was captured after login")]
    MissingAuthorization,

    #[error("Amplimed API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected script result: {message}")]
    Script { message: String },
}

impl From<chromiumoxide::error::CdpError> for AmplimedError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        AmplimedError::Browser { message: e.to_string() }
    }
}

impl From<CaptchaError> for AppError {
    fn from(e: CaptchaError) -> Self {
        AppError::Captcha(e.to_string())
    }
}

impl From<AmplimedError> for AppError {
    fn from(e: AmplimedError) -> Self {
        match e {
            AmplimedError::Browser { .. } | AmplimedError::ElementTimeout { .. } => AppError::Browser(e.to_string()),
            AmplimedError::Captcha(inner) => AppError::Captcha(inner.to_string()),
            other => AppError::Amplimed(other.to_string()),
        }
    }
}
