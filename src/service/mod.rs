pub mod coordinator;

pub use coordinator::{CacheStatus, PoolResponse, PoolResponseBody, PoolService, ServiceError};
