pub mod resilient_client;
pub mod types;

pub use resilient_client::{EndpointError, EndpointFailure, FetchError, ResilientRpcClient};
pub use types::{AccountData, AccountInfoResult, AccountValue, RpcContext};
