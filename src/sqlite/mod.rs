// SQLite driver - a blocking-only driver served entirely by the fallback path
//
// - config: connection options and builder
// - connection: the `DriverConnection` implementation over rusqlite
// - transaction: blocking transactions sharing the driver's connection
// - error: driver error type surfaced inside `AdapterError::Connection`

pub mod config;
pub mod connection;
pub mod error;
pub mod transaction;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteDriver;
pub use error::SqliteDriverError;
pub use transaction::SqliteTransaction;
