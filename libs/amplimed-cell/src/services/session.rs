use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::models::{
    AmplimedError, AmplimedSettings, XhrOutcome, AGENDA_LINK_XPATH, CAPTCHA_RESPONSE_ELEMENT_ID, LOGIN_EMAIL_XPATH,
    LOGIN_PASSWORD_XPATH, LOGIN_SUBMIT_XPATH,
};
use crate::services::browser::BrowserDriver;
use crate::services::captcha::CaptchaSolver;

/// Arguments: id of the hidden response field, captcha token.
const INJECT_CAPTCHA_SCRIPT: &str = r#"
var field = document.getElementById(arguments[0]);
if (!field) { return false; }
field.innerHTML = arguments[1];
return true;
"#;

/// Arguments: url, method, form body, authorization token.
const XHR_SCRIPT: &str = r#"
var xhr = new XMLHttpRequest();
xhr.open(arguments[1], arguments[0], false);
xhr.setRequestHeader('Content-type', 'application/x-www-form-urlencoded');
xhr.setRequestHeader('authorization', arguments[3]);
xhr.send(arguments[2]);
return { status: xhr.status, body: xhr.responseText };
"#;

/// Authenticated access to Amplimed's internal endpoints.
#[async_trait]
pub trait AmplimedApi: Send {
    async fn post_form(&mut self, path: &str, form_body: &str) -> Result<String, AmplimedError>;
}

/// A browser logged into Amplimed. Opened lazily on the first API call.
pub struct AmplimedSession<D, C> {
    driver: D,
    captcha: C,
    settings: AmplimedSettings,
    authorization_key: Option<String>,
    opened: bool,
}

impl<D, C> AmplimedSession<D, C>
where
    D: BrowserDriver,
    C: CaptchaSolver,
{
    pub fn new(driver: D, captcha: C, settings: AmplimedSettings) -> Self {
        let authorization_key = settings.authorization_key.clone();
        Self {
            driver,
            captcha,
            settings,
            authorization_key,
            opened: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Launches the browser and logs in. A failed login closes the browser,
    /// so the next call starts again from the login page.
    pub async fn ensure_open(&mut self) -> Result<(), AmplimedError> {
        if self.opened {
            return Ok(());
        }

        self.driver.launch().await?;
        self.opened = true;

        if let Err(e) = self.open_login_page().await {
            warn!("Amplimed login failed: {}", e);
            self.discard().await;
            return Err(e);
        }
        Ok(())
    }

    async fn open_login_page(&mut self) -> Result<(), AmplimedError> {
        self.driver.goto(&self.settings.login_url).await?;
        sleep(self.settings.page_settle).await;

        if self.authorization_key.is_some() {
            info!("AMPLIMED_AUTHORIZATION_KEY already set; Amplimed opened without logging in");
            return Ok(());
        }

        self.login().await
    }

    async fn discard(&mut self) {
        self.opened = false;
        self.authorization_key = self.settings.authorization_key.clone();
        if let Err(e) = self.driver.close().await {
            warn!("Closing the browser after a failed login: {}", e);
        }
    }

    async fn login(&mut self) -> Result<(), AmplimedError> {
        info!("Starting Amplimed login");
        self.driver.fill(LOGIN_EMAIL_XPATH, &self.settings.email).await?;
        self.driver.fill(LOGIN_PASSWORD_XPATH, &self.settings.password).await?;

        if self.settings.manual_captcha {
            info!(
                "Waiting {}s for the operator to log into Amplimed manually",
                self.settings.manual_login_wait.as_secs()
            );
            sleep(self.settings.manual_login_wait).await;
        } else {
            info!("Solving the login captcha");
            let token = self
                .captcha
                .solve_recaptcha_v2(&self.settings.login_url, &self.settings.website_key)
                .await?;

            let injected = self
                .driver
                .execute(INJECT_CAPTCHA_SCRIPT, &[json!(CAPTCHA_RESPONSE_ELEMENT_ID), json!(token)])
                .await?;
            if injected != Value::Bool(true) {
                return Err(AmplimedError::Script {
                    message: format!("Captcha response field {} not found", CAPTCHA_RESPONSE_ELEMENT_ID),
                });
            }

            self.driver.click(LOGIN_SUBMIT_XPATH).await?;
            sleep(self.settings.page_settle).await;
        }

        // The agenda page issues requests carrying the authorization header.
        info!("Opening the Amplimed agenda to capture the authorization header");
        self.driver
            .wait_and_click(AGENDA_LINK_XPATH, self.settings.navigation_timeout)
            .await?;
        sleep(self.settings.page_settle).await;
        Ok(())
    }

    pub async fn authorization_key(&mut self) -> Result<String, AmplimedError> {
        self.ensure_open().await?;

        if let Some(key) = &self.authorization_key {
            return Ok(key.clone());
        }

        let Some(key) = self.driver.captured_authorization().await else {
            self.discard().await;
            return Err(AmplimedError::MissingAuthorization);
        };

        info!("Captured the Amplimed authorization header");
        self.authorization_key = Some(key.clone());
        Ok(key)
    }

    /// Issues a synchronous XHR from inside the logged-in page and returns
    /// the response body.
    pub async fn call_api(&mut self, path: &str, method: &str, form_body: &str) -> Result<String, AmplimedError> {
        let token = self.authorization_key().await?;
        let url = format!("{}{}", self.settings.base_url, path);
        debug!("{} {} ({} bytes)", method, url, form_body.len());

        let result = self
            .driver
            .execute(XHR_SCRIPT, &[json!(url), json!(method), json!(form_body), json!(token)])
            .await?;

        let outcome: XhrOutcome = serde_json::from_value(result).map_err(|e| AmplimedError::Script {
            message: format!("XHR result: {}", e),
        })?;

        if !(200..300).contains(&outcome.status) {
            return Err(AmplimedError::Api {
                status: outcome.status,
                body: outcome.body,
            });
        }

        Ok(outcome.body)
    }

    pub async fn close(&mut self) -> Result<(), AmplimedError> {
        if !self.opened {
            return Ok(());
        }
        self.opened = false;
        self.driver.close().await
    }
}

#[async_trait]
impl<D, C> AmplimedApi for AmplimedSession<D, C>
where
    D: BrowserDriver,
    C: CaptchaSolver,
{
    async fn post_form(&mut self, path: &str, form_body: &str) -> Result<String, AmplimedError> {
        self.call_api(path, "POST", form_body).await
    }
}
