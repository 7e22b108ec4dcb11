// Public modules
pub mod config;
pub mod error;
pub mod generator;
pub mod headlines;
pub mod oauth;
pub mod pipeline;
pub mod publisher;
pub mod state;
pub mod variety;

// Re-export commonly used types
pub use config::{Config, TwitterCredentials};
pub use error::{BotError, BotResult};
pub use generator::TextGenerator;
pub use headlines::HeadlineSource;
pub use pipeline::{Bot, RunReport};
pub use publisher::Publisher;
pub use state::{BotState, PostRecord, StateStore};
