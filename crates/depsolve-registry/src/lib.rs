//! Package registry protocol: the [`RegistryClient`] seam the resolver
//! depends on, an npm-compatible HTTP implementation, and an offline
//! snapshot implementation.

pub mod client;
pub mod error;
pub mod http;
pub mod repository;
pub mod snapshot;

pub use client::RegistryClient;
pub use error::FetchError;
