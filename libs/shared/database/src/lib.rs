pub mod error;
pub mod sheets;
pub mod token;

pub use error::SheetsError;
pub use sheets::GoogleSheetsClient;
pub use token::{provider_from_config, AccessTokenProvider, ServiceAccountTokenProvider, StaticTokenProvider};
