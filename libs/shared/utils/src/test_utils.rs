use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::{AppError, SheetTable};

use crate::prompt::OperatorPrompt;

pub const MANAGEMENT_SHEET_ID: &str = "management-staging";
pub const HOSPITALS_SHEET_ID: &str = "hospitals-network";

pub const RANGE_PATIENTS: &str = "Pacientes!A:H";
pub const RANGE_VISITS: &str = "Visitas!A:H";
pub const RANGE_PROFESSIONALS: &str = "Profissionais!A:D";
pub const RANGE_HOSPITALS: &str = "Hospitais!A:D";
pub const RANGE_PROFESSIONALS_HOSPITALS: &str = "Cruzamento!A:E";

pub struct TestConfig {
    pub sheets_url: String,
    pub anticaptcha_url: String,
    pub environment: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            sheets_url: "http://localhost:8085".to_string(),
            anticaptcha_url: "http://localhost:8086".to_string(),
            environment: "staging".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_sheets_url(sheets_url: &str) -> Self {
        Self {
            sheets_url: sheets_url.to_string(),
            ..Self::default()
        }
    }

    pub fn production(mut self) -> Self {
        self.environment = "production".to_string();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        let sheets_url = self.sheets_url.clone();
        let anticaptcha_url = self.anticaptcha_url.clone();
        let environment = self.environment.clone();

        AppConfig::from_lookup(move |key| {
            let value = match key {
                "ENVIRONMENT" => environment.as_str(),
                "SPREADSHEET_MANAGEMENT_STAGING" => MANAGEMENT_SHEET_ID,
                "SPREADSHEET_MANAGEMENT_PRODUCTION" => "management-production",
                "SPREADSHEET_HOSPITALS" => HOSPITALS_SHEET_ID,
                "RANGE_PATIENTS" => RANGE_PATIENTS,
                "RANGE_VISITS" => RANGE_VISITS,
                "RANGE_PROFESSIONALS" => RANGE_PROFESSIONALS,
                "RANGE_HOSPITALS" => RANGE_HOSPITALS,
                "RANGE_PROFESSIONALS_HOSPITALS" => RANGE_PROFESSIONALS_HOSPITALS,
                "GOOGLE_SHEETS_BASE_URL" => sheets_url.as_str(),
                "GOOGLE_ACCESS_TOKEN" => "test-google-token",
                "AMPLIMED_LOGIN_URL" => "https://app.amplimed.test/login",
                "AMPLIMED_LOGIN_EMAIL" => "operador@example.com",
                "AMPLIMED_LOGIN_PASSWORD" => "test-password",
                "AMPLIMED_PROCEDIMENTO_VISITA_ID" => "5",
                "AMPLIMED_CONVENIO_ID" => "6",
                "ANTICAPTCHA_KEY" => "test-anticaptcha-key",
                "ANTICAPTCHA_WEBSITE_KEY" => "test-site-key",
                "ANTICAPTCHA_BASE_URL" => anticaptcha_url.as_str(),
                "STAGING_AMPLIMED_DOCTOR_ID" => "STG-DOCTOR",
                "STAGING_AMPLIMED_HOSPITAL_ID" => "STG-HOSPITAL",
                "STAGING_AMPLIMED_PATIENT_ID" => "STG-PATIENT",
                "WAIT_TIME_SECONDS" => "0",
                "MIN_SCHEDULE_HOUR" => "8",
                "MAX_SCHEDULE_HOUR" => "17",
                "MAX_GOOGLE_API_TRIES" => "2",
                _ => return None,
            };
            Some(value.to_string())
        })
    }
}

/// Prompt that replays canned answers and records every question asked.
/// Runs out of answers as "no".
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: RefCell<VecDeque<bool>>,
    questions: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            questions: RefCell::new(Vec::new()),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.questions.borrow().len()
    }
}

impl OperatorPrompt for ScriptedPrompt {
    fn confirm(&self, question: &str) -> Result<bool, AppError> {
        self.questions.borrow_mut().push(question.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or(false))
    }
}

/// Spreadsheet contents shared by the cell tests.
///
/// Hospital 123 has exactly one eligible doctor (Ana); Carlos is inactive
/// and Bruno does not attend there, so first-visit assignment is
/// deterministic for it.
pub struct SheetFixtures;

impl SheetFixtures {
    pub fn patients() -> Vec<Vec<String>> {
        rows(&[
            &[
                "Carteirinha",
                "Senha",
                "Código interno operadora",
                "ID Amplimed",
                "Status",
                "possui_alguma_visita_agendada",
                "Status de cadastro na Amplimed",
                "data_limite_primeira_visita",
            ],
            &["1001", "SEN-1", "123", "AMP-P1", "Novo", "0", "Cadastrado", "15/11/2026"],
            &["1002", "SEN-2", "123", "AMP-P2", "Novo", "1", "Cadastrado", "16/11/2026"],
            &["1003", "SEN-3", "456", "AMP-P3", "Ativo", "0", "Cadastrado", "17/11/2026"],
            &["1004", "SEN-4", "789", "AMP-P4", "Novo", "0", "Pendente", "18/11/2026"],
            &["1005", "SEN-5", "0000000456", "AMP-P5", "Novo", "0", "Cadastrado", "2026-11-19"],
        ])
    }

    pub fn visits() -> Vec<Vec<String>> {
        rows(&[
            &[
                "ID",
                "Carteirinha",
                "Senha",
                "cod_hospital_operadora",
                "ID Amplimed",
                "Profissional",
                "Data da proxima visita",
                "Data sugerida",
            ],
            &["1", "1002", "SEN-2", "123", "AMP-P2", "Dra. Ana Souza", "Agendar próxima visita", "20/11/2026"],
            &["2", "1006", "SEN-6", "456", "AMP-P6", "Dr. Bruno Lima", "10/11/2026", "03/11/2026"],
            &["3", "1007", "SEN-7", "456", "AMP-P7", "Dr. Carlos Dias", "Agendar próxima visita", "21/11/2026"],
        ])
    }

    pub fn hospitals() -> Vec<Vec<String>> {
        rows(&[
            &["cod_referenciado", "Nome", "cod_amplimed", "hospital_com_atuação"],
            &["0000000123", "Hospital Central", "H-AMP-123", "Sim"],
            &["0000000456", "Hospital Norte", "H-AMP-456", "Sim"],
            &["0000000789", "Hospital Sul", "H-AMP-789", "Não"],
        ])
    }

    pub fn professionals() -> Vec<Vec<String>> {
        rows(&[
            &["CPF", "Nome do profissional", "profissional_cod_amplimed", "Status"],
            &["111.111.111-11", "Dra. Ana Souza", "D-AMP-1", "Ativo"],
            &["222.222.222-22", "Dr. Bruno Lima", "D-AMP-2", "Ativo"],
            &["333.333.333-33", "Dr. Carlos Dias", "D-AMP-3", "Inativo"],
        ])
    }

    pub fn professionals_hospitals() -> Vec<Vec<String>> {
        rows(&[
            &[
                "CPF",
                "Nome do profissional",
                "Código interno operadora",
                "Status Profissional",
                "Status Hospital atendimento",
            ],
            &["111.111.111-11", "Dra. Ana Souza", "0000000123", "Ativo", "Sim"],
            &["222.222.222-22", "Dr. Bruno Lima", "0000000456", "Ativo", "Sim"],
            &["333.333.333-33", "Dr. Carlos Dias", "0000000123", "Inativo", "Sim"],
            &["222.222.222-22", "Dr. Bruno Lima", "0000000123", "Ativo", "Não"],
        ])
    }

    pub fn table(values: Vec<Vec<String>>) -> SheetTable {
        SheetTable::from_values(values).expect("fixture has a header row")
    }

    /// Body of a Sheets `values.get` response.
    pub fn response(range: &str, values: Vec<Vec<String>>) -> Value {
        json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        })
    }
}

fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
    values
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}
