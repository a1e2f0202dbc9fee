use dialoguer::Confirm;
use tracing::info;

use shared_models::AppError;

/// Gate between batch iterations where the operator watching the run can
/// stop it.
pub trait OperatorPrompt {
    fn confirm(&self, question: &str) -> Result<bool, AppError>;

    /// Asks whether to continue; a "no" becomes `AppError::Aborted`.
    fn proceed_or_abort(&self) -> Result<(), AppError> {
        if self.confirm("Proceed?")? {
            Ok(())
        } else {
            info!("Operator chose to stop the run");
            Err(AppError::Aborted)
        }
    }
}

#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl OperatorPrompt for ConsolePrompt {
    fn confirm(&self, question: &str) -> Result<bool, AppError> {
        Confirm::new()
            .with_prompt(question)
            .default(true)
            .interact()
            .map_err(|dialoguer::Error::IO(e)| AppError::Io(e))
    }
}
