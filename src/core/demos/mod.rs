pub mod cosmos_db;
pub mod object_storage;
pub mod service_bus;
pub mod sql_server;

pub use cosmos_db::CosmosDbDemo;
pub use object_storage::ObjectStorageDemo;
pub use service_bus::{LoggingMessageHandler, ServiceBusDemo};
pub use sql_server::SqlServerDemo;
