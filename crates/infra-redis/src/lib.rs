// Todocore Infrastructure - Redis Adapter
// Implements: JobStore (GET/SET/DEL index), BrokerClient (Redis Streams)

mod connection;
mod job_store;
mod stream_broker;

pub use connection::{LazyConnection, RoundTripError, DEFAULT_ROUND_TRIP_TIMEOUT};
pub use job_store::RedisJobStore;
pub use stream_broker::RedisStreamBroker;
