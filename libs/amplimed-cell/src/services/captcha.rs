use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{
    CaptchaError, CreateTaskRequest, CreateTaskResponse, RecaptchaTask, TaskResultRequest, TaskResultResponse,
    RECAPTCHA_V2_TASK,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_MAX_POLLS: u32 = 60;

#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Returns the `g-recaptcha-response` token for the given page.
    async fn solve_recaptcha_v2(&self, website_url: &str, website_key: &str) -> Result<String, CaptchaError>;
}

/// anti-captcha.com JSON API client.
pub struct AntiCaptchaClient {
    client: Client,
    base_url: String,
    client_key: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl AntiCaptchaClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.anticaptcha_base_url, &config.anticaptcha_key)
    }

    pub fn with_base_url(base_url: &str, client_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_key: client_key.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    async fn post<B, R>(&self, method: &str, body: &B) -> Result<R, CaptchaError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        debug!("Calling anti-captcha {}", method);

        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Anti-captcha HTTP error ({}): {}", status, error_text);
            return Err(CaptchaError::InvalidResponse {
                message: format!("HTTP {}: {}", status, error_text),
            });
        }

        Ok(response.json::<R>().await?)
    }

    async fn create_task(&self, website_url: &str, website_key: &str) -> Result<u64, CaptchaError> {
        let request = CreateTaskRequest {
            client_key: &self.client_key,
            task: RecaptchaTask {
                task_type: RECAPTCHA_V2_TASK,
                website_url,
                website_key,
            },
        };

        let response: CreateTaskResponse = self.post("createTask", &request).await?;
        if response.error_id != 0 {
            return Err(service_error(response.error_code, response.error_description));
        }

        response.task_id.ok_or_else(|| CaptchaError::InvalidResponse {
            message: "createTask returned no taskId".to_string(),
        })
    }
}

#[async_trait]
impl CaptchaSolver for AntiCaptchaClient {
    async fn solve_recaptcha_v2(&self, website_url: &str, website_key: &str) -> Result<String, CaptchaError> {
        let task_id = self.create_task(website_url, website_key).await?;
        info!("Anti-captcha task {} created", task_id);

        let request = TaskResultRequest {
            client_key: &self.client_key,
            task_id,
        };

        for poll in 1..=self.max_polls {
            sleep(self.poll_interval).await;

            let response: TaskResultResponse = self.post("getTaskResult", &request).await?;
            if response.error_id != 0 {
                return Err(service_error(response.error_code, response.error_description));
            }

            match response.status.as_deref() {
                Some("ready") => {
                    let solution = response.solution.ok_or_else(|| CaptchaError::InvalidResponse {
                        message: "Task ready without a solution".to_string(),
                    })?;
                    info!("Captcha solved after {} polls", poll);
                    return Ok(solution.g_recaptcha_response);
                }
                status => debug!("Task {} status: {:?}", task_id, status),
            }
        }

        Err(CaptchaError::Timeout { polls: self.max_polls })
    }
}

fn service_error(code: Option<String>, description: Option<String>) -> CaptchaError {
    let error = CaptchaError::Service {
        code: code.unwrap_or_else(|| "UNKNOWN".to_string()),
        description: description.unwrap_or_default(),
    };
    error!("{}", error);
    error
}
