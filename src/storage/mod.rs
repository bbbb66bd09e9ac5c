mod store;
mod types;

pub use store::ConfigStore;
pub use types::{Config, ProviderConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};
