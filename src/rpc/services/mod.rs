//! gRPC service implementations

pub mod registry;

pub use registry::RegistryServiceImpl;
