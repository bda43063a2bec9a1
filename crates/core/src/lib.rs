pub mod config;
pub mod error;
pub mod fixture;
pub mod types;
pub mod wait;

pub use config::AppConfig;
pub use error::FlowError;
pub use fixture::EmailFixture;
pub use types::*;
