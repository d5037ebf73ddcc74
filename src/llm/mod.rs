pub mod client;
pub mod prompt;
pub mod response;
pub mod secrets;

pub use client::{GeminiClient, ensure_client, test_configured_api_key};
pub use prompt::recommendation_prompt;
pub use secrets::{clear_api_key, store_api_key};
