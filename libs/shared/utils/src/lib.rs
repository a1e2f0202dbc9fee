pub mod prompt;
pub mod test_utils;

pub use prompt::{ConsolePrompt, OperatorPrompt};
