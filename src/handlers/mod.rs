mod agent;
mod health;
mod messages;
mod metrics;
mod public;

pub use agent::capabilities;
pub use health::health_handler;
pub use messages::{create_message, get_message, list_messages};
pub use metrics::metrics_handler;
pub use public::public_messages;
