use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Staging,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidValue {
                key: "ENVIRONMENT",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required settings: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid schedule hours: MIN_SCHEDULE_HOUR={min}, MAX_SCHEDULE_HOUR={max}")]
    InvalidScheduleHours { min: u32, max: u32 },
}

/// Latest start hour; a 22:30 visit still ends on the same day.
pub const LATEST_SCHEDULE_HOUR: u32 = 22;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,

    pub spreadsheet_management_staging: String,
    pub spreadsheet_management_production: String,
    pub spreadsheet_hospitals: String,
    pub range_patients: String,
    pub range_visits: String,
    pub range_professionals: String,
    pub range_hospitals: String,
    pub range_professionals_hospitals: String,
    pub visits_sheet_name: String,

    pub google_sheets_base_url: String,
    pub google_application_credentials: Option<String>,
    pub google_access_token: Option<String>,

    pub amplimed_base_url: String,
    pub amplimed_login_url: String,
    pub amplimed_login_email: String,
    pub amplimed_login_password: String,
    pub amplimed_procedure_visit_id: String,
    pub amplimed_insurer_id: String,
    pub amplimed_authorization_key: Option<String>,

    pub anticaptcha_key: String,
    pub anticaptcha_website_key: String,
    pub anticaptcha_base_url: String,

    pub chrome_executable: Option<String>,
    pub browser_headless: bool,

    pub staging_amplimed_doctor_id: String,
    pub staging_amplimed_hospital_id: String,
    pub staging_amplimed_patient_id: String,

    pub wait_time_seconds: u64,
    pub min_schedule_hour: u32,
    pub max_schedule_hour: u32,
    pub max_google_api_tries: u32,
    pub always_confirm_before_proceed: bool,
    pub always_manually_solve_captcha: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &'static str| -> String {
            lookup(key).unwrap_or_else(|| {
                warn!("{} not set, using empty value", key);
                String::new()
            })
        };
        let text_or = |key: &'static str, default: &str| -> String {
            lookup(key).filter(|v| !v.is_empty()).unwrap_or_else(|| {
                warn!("{} not set, using default", key);
                default.to_string()
            })
        };
        let optional = |key: &'static str| -> Option<String> {
            lookup(key).filter(|v| !v.trim().is_empty())
        };
        let flag = |key: &'static str| -> bool {
            lookup(key).map(|v| parse_flag(&v)).unwrap_or(false)
        };

        let environment = match lookup("ENVIRONMENT") {
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}, falling back to staging", e);
                Environment::Staging
            }),
            None => {
                warn!("ENVIRONMENT not set, using default");
                Environment::Staging
            }
        };

        let config = Self {
            environment,
            spreadsheet_management_staging: text("SPREADSHEET_MANAGEMENT_STAGING"),
            spreadsheet_management_production: text("SPREADSHEET_MANAGEMENT_PRODUCTION"),
            spreadsheet_hospitals: text("SPREADSHEET_HOSPITALS"),
            range_patients: text("RANGE_PATIENTS"),
            range_visits: text("RANGE_VISITS"),
            range_professionals: text("RANGE_PROFESSIONALS"),
            range_hospitals: text("RANGE_HOSPITALS"),
            range_professionals_hospitals: text("RANGE_PROFESSIONALS_HOSPITALS"),
            visits_sheet_name: text_or("VISITS_SHEET_NAME", "Visitas"),
            google_sheets_base_url: text_or("GOOGLE_SHEETS_BASE_URL", "https://sheets.googleapis.com"),
            google_application_credentials: optional("GOOGLE_APPLICATION_CREDENTIALS"),
            google_access_token: optional("GOOGLE_ACCESS_TOKEN"),
            amplimed_base_url: text_or("AMPLIMED_BASE_URL", "https://app.amplimed.com.br"),
            amplimed_login_url: text("AMPLIMED_LOGIN_URL"),
            amplimed_login_email: text("AMPLIMED_LOGIN_EMAIL"),
            amplimed_login_password: text("AMPLIMED_LOGIN_PASSWORD"),
            amplimed_procedure_visit_id: text("AMPLIMED_PROCEDIMENTO_VISITA_ID"),
            amplimed_insurer_id: text("AMPLIMED_CONVENIO_ID"),
            amplimed_authorization_key: optional("AMPLIMED_AUTHORIZATION_KEY"),
            anticaptcha_key: text("ANTICAPTCHA_KEY"),
            anticaptcha_website_key: text("ANTICAPTCHA_WEBSITE_KEY"),
            anticaptcha_base_url: text_or("ANTICAPTCHA_BASE_URL", "https://api.anti-captcha.com"),
            chrome_executable: optional("CHROME_EXECUTABLE"),
            browser_headless: flag("BROWSER_HEADLESS"),
            staging_amplimed_doctor_id: text("STAGING_AMPLIMED_DOCTOR_ID"),
            staging_amplimed_hospital_id: text("STAGING_AMPLIMED_HOSPITAL_ID"),
            staging_amplimed_patient_id: text("STAGING_AMPLIMED_PATIENT_ID"),
            wait_time_seconds: number(&lookup, "WAIT_TIME_SECONDS", 10),
            min_schedule_hour: number(&lookup, "MIN_SCHEDULE_HOUR", 8),
            max_schedule_hour: number(&lookup, "MAX_SCHEDULE_HOUR", 17),
            max_google_api_tries: number(&lookup, "MAX_GOOGLE_API_TRIES", 3),
            always_confirm_before_proceed: flag("ALWAYS_CONFIRM_BEFORE_PROCEED"),
            always_manually_solve_captcha: flag("ALWAYS_MANUALLY_SOLVE_CAPTCHA"),
        };

        if !config.is_sheets_configured() {
            warn!("Spreadsheet access not fully configured - missing environment variables");
        }

        config
    }

    /// Spreadsheet holding patients, visits and professionals for the
    /// active environment.
    pub fn management_spreadsheet_id(&self) -> &str {
        match self.environment {
            Environment::Staging => &self.spreadsheet_management_staging,
            Environment::Production => &self.spreadsheet_management_production,
        }
    }

    pub fn is_staging(&self) -> bool {
        self.environment == Environment::Staging
    }

    pub fn is_sheets_configured(&self) -> bool {
        !self.management_spreadsheet_id().is_empty()
            && !self.spreadsheet_hospitals.is_empty()
            && (self.google_access_token.is_some() || self.google_application_credentials.is_some())
    }

    /// Checks every setting a run needs. Amplimed and captcha settings are
    /// only required when bookings are actually submitted.
    pub fn validate(&self, submit_bookings: bool) -> Result<(), ConfigError> {
        if self.min_schedule_hour > self.max_schedule_hour || self.max_schedule_hour > LATEST_SCHEDULE_HOUR {
            return Err(ConfigError::InvalidScheduleHours {
                min: self.min_schedule_hour,
                max: self.max_schedule_hour,
            });
        }

        let mut missing = Vec::new();
        fn require(missing: &mut Vec<&'static str>, key: &'static str, value: &str) {
            if value.trim().is_empty() {
                missing.push(key);
            }
        }

        match self.environment {
            Environment::Staging => require(&mut missing, "SPREADSHEET_MANAGEMENT_STAGING", &self.spreadsheet_management_staging),
            Environment::Production => require(&mut missing, "SPREADSHEET_MANAGEMENT_PRODUCTION", &self.spreadsheet_management_production),
        }
        require(&mut missing, "SPREADSHEET_HOSPITALS", &self.spreadsheet_hospitals);
        require(&mut missing, "RANGE_PATIENTS", &self.range_patients);
        require(&mut missing, "RANGE_VISITS", &self.range_visits);
        require(&mut missing, "RANGE_PROFESSIONALS", &self.range_professionals);
        require(&mut missing, "RANGE_HOSPITALS", &self.range_hospitals);
        require(&mut missing, "RANGE_PROFESSIONALS_HOSPITALS", &self.range_professionals_hospitals);

        if self.google_access_token.is_none() && self.google_application_credentials.is_none() {
            missing.push("GOOGLE_APPLICATION_CREDENTIALS");
        }

        if submit_bookings {
            require(&mut missing, "AMPLIMED_LOGIN_URL", &self.amplimed_login_url);
            require(&mut missing, "AMPLIMED_PROCEDIMENTO_VISITA_ID", &self.amplimed_procedure_visit_id);
            require(&mut missing, "AMPLIMED_CONVENIO_ID", &self.amplimed_insurer_id);

            if self.amplimed_authorization_key.is_none() {
                require(&mut missing, "AMPLIMED_LOGIN_EMAIL", &self.amplimed_login_email);
                require(&mut missing, "AMPLIMED_LOGIN_PASSWORD", &self.amplimed_login_password);

                if !self.always_manually_solve_captcha {
                    require(&mut missing, "ANTICAPTCHA_KEY", &self.anticaptcha_key);
                    require(&mut missing, "ANTICAPTCHA_WEBSITE_KEY", &self.anticaptcha_website_key);
                }
            }

            if self.is_staging() {
                require(&mut missing, "STAGING_AMPLIMED_DOCTOR_ID", &self.staging_amplimed_doctor_id);
                require(&mut missing, "STAGING_AMPLIMED_HOSPITAL_ID", &self.staging_amplimed_hospital_id);
                require(&mut missing, "STAGING_AMPLIMED_PATIENT_ID", &self.staging_amplimed_patient_id);
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}

/// Operator flags are written `SIM` in the `.env` files; the usual English
/// spellings are accepted too.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "sim" | "s" | "true" | "1" | "yes" | "y"
    )
}

fn number<F, T>(lookup: &F, key: &'static str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        None => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}
