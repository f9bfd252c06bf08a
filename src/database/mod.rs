//! SQLite persistence for follower subscriptions and alert history

mod connection;
pub mod models;
pub mod queries;
mod schema;

pub use connection::Database;
pub use models::{AlertHistoryRecord, SubscriptionRecord};
