//! gRPC surface for the registry, built only with the `rpc` feature
//!
//! Every RPC delegates to [`crate::server::RegistryServer`]; this layer only
//! converts messages and maps errors to status codes.

#![cfg(feature = "rpc")]

pub mod conversions;
pub mod errors;
pub mod generated;
pub mod server;
pub mod services;

pub use server::RpcServer;
