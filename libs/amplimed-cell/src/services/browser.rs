use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{AmplimedError, AUTHORIZATION_HEADER};

const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The slice of browser automation the Amplimed session needs.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn launch(&mut self) -> Result<(), AmplimedError>;

    async fn goto(&mut self, url: &str) -> Result<(), AmplimedError>;

    /// Clicks the element and types `text` into it.
    async fn fill(&mut self, xpath: &str, text: &str) -> Result<(), AmplimedError>;

    async fn click(&mut self, xpath: &str) -> Result<(), AmplimedError>;

    /// Clicks the element once it appears, failing after `timeout`.
    async fn wait_and_click(&mut self, xpath: &str, timeout: Duration) -> Result<(), AmplimedError>;

    /// Runs `function_body` as the body of a function called with `args`
    /// and returns its (awaited) result.
    async fn execute(&mut self, function_body: &str, args: &[Value]) -> Result<Value, AmplimedError>;

    /// The `authorization` header of the first page request that carried one.
    async fn captured_authorization(&mut self) -> Option<String>;

    async fn close(&mut self) -> Result<(), AmplimedError>;
}

struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    listener_task: JoinHandle<()>,
}

/// Chrome driven over the DevTools protocol.
pub struct ChromeBrowser {
    executable: Option<String>,
    headless: bool,
    session: Option<ChromeSession>,
    authorization: Arc<Mutex<Option<String>>>,
}

impl ChromeBrowser {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            executable: config.chrome_executable.clone(),
            headless: config.browser_headless,
            session: None,
            authorization: Arc::new(Mutex::new(None)),
        }
    }

    fn page(&self) -> Result<&Page, AmplimedError> {
        self.session.as_ref().map(|s| &s.page).ok_or_else(|| AmplimedError::Browser {
            message: "Browser not launched".to_string(),
        })
    }
}

#[async_trait]
impl BrowserDriver for ChromeBrowser {
    async fn launch(&mut self) -> Result<(), AmplimedError> {
        if self.session.is_some() {
            return Ok(());
        }

        let mut builder = BrowserConfig::builder().window_size(2000, 1000);
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(|message| AmplimedError::Browser { message })?;
        *self.authorization.lock().await = None;

        info!("Launching Chrome (headless: {})", self.headless);
        let (browser, mut handler) = Browser::launch(config).await?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;

        let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let authorization = Arc::clone(&self.authorization);
        let listener_task = tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                let Some(headers) = event.request.headers.inner().as_object() else {
                    continue;
                };

                let header = headers
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION_HEADER))
                    .and_then(|(_, value)| value.as_str());

                if let Some(value) = header {
                    let mut slot = authorization.lock().await;
                    if slot.is_none() {
                        debug!("Captured authorization header from {}", event.request.url);
                        *slot = Some(value.to_string());
                    }
                }
            }
        });

        self.session = Some(ChromeSession {
            browser,
            page,
            handler_task,
            listener_task,
        });
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<(), AmplimedError> {
        debug!("Navigating to {}", url);
        self.page()?.goto(url).await?;
        Ok(())
    }

    async fn fill(&mut self, xpath: &str, text: &str) -> Result<(), AmplimedError> {
        let element = self.page()?.find_xpath(xpath).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn click(&mut self, xpath: &str) -> Result<(), AmplimedError> {
        self.page()?.find_xpath(xpath).await?.click().await?;
        Ok(())
    }

    async fn wait_and_click(&mut self, xpath: &str, timeout: Duration) -> Result<(), AmplimedError> {
        let deadline = Instant::now() + timeout;
        let page = self.page()?;

        loop {
            if let Ok(element) = page.find_xpath(xpath).await {
                if element.click().await.is_ok() {
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                return Err(AmplimedError::ElementTimeout {
                    xpath: xpath.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
            sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }

    async fn execute(&mut self, function_body: &str, args: &[Value]) -> Result<Value, AmplimedError> {
        let args = serde_json::to_string(args).map_err(|e| AmplimedError::Script { message: e.to_string() })?;
        let expression = format!("(function() {{\n{}\n}}).apply(null, {})", function_body, args);

        let result = self.page()?.evaluate(expression).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn captured_authorization(&mut self) -> Option<String> {
        self.authorization.lock().await.clone()
    }

    async fn close(&mut self) -> Result<(), AmplimedError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        info!("Closing Chrome");
        if let Err(e) = session.browser.close().await {
            warn!("Chrome did not close cleanly: {}", e);
        }
        if let Err(e) = session.browser.wait().await {
            warn!("Waiting for Chrome to exit failed: {}", e);
        }

        session.listener_task.abort();
        session.handler_task.abort();
        Ok(())
    }
}
