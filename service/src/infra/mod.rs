//! Infrastructure layer.

pub mod database;
pub mod gateway;
pub mod storage;

pub use self::{database::Database, gateway::Gateway, storage::Storage};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
