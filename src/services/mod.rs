// Service exports
pub mod memory;
pub mod postgres;
pub mod report;
pub mod store;
pub mod webhook;

pub use memory::{InMemoryStore, StoreFixture};
pub use postgres::PostgresClient;
pub use report::ReportBuilder;
pub use store::{CoffeeStore, HistoryStore, LocationProvider, MembershipProvider, StoreError, StoreResult};
pub use webhook::{WebhookClient, WebhookError};
