// Todocore Infrastructure - SQLite Adapter
// Implements: WorkQueue + QueueBackend (embedded deferred executor)

mod connection;
mod error;
mod migration;
mod work_queue;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use work_queue::SqliteWorkQueue;

// sqlx::Error conversion lives in `error` helpers: orphan rules forbid
// implementing From<sqlx::Error> for AppError here
