//! Ethereum module - address validation and the JSON-RPC balance source

pub mod address;
pub mod messages;
pub mod rpc;

pub use address::is_valid_address;
pub use rpc::EthRpcBalanceSource;
