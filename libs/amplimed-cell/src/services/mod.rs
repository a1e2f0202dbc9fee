// libs/amplimed-cell/src/services/mod.rs

pub mod browser;
pub mod captcha;
pub mod session;

pub use browser::{BrowserDriver, ChromeBrowser};
pub use captcha::{AntiCaptchaClient, CaptchaSolver};
pub use session::{AmplimedApi, AmplimedSession};
