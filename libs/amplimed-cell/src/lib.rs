// libs/amplimed-cell/src/lib.rs
//! # Amplimed Cell
//!
//! Drives the Amplimed web application, which has no public API. A real
//! Chrome session logs in (solving the login reCAPTCHA through
//! anti-captcha.com or waiting for the operator), the `authorization`
//! header of the application's own requests is captured, and internal
//! endpoints are then called with synchronous XHRs run inside the page.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                  Amplimed Cell                      |
//! +-----------------------------------------------------+
//! |  models.rs      |  Errors, settings, wire types     |
//! |  services/      |                                   |
//! |    browser.rs   |  BrowserDriver + Chrome (CDP)     |
//! |    captcha.rs   |  anti-captcha.com client          |
//! |    session.rs   |  Login, token capture, XHR calls  |
//! +-----------------------------------------------------+
//! ```

pub mod models;
pub mod services;

pub use models::*;
pub use services::*;
