//! Iglu schema resolution: reference parsing, a hardcoded registry of
//! well-known Snowplow and system schemas, and HTTP-backed remote registries
//! with LRU+TTL caching.

mod error;
mod hardcoded;
mod reference;
mod registry;
mod remote;
mod schema;

pub use error::IgluError;
pub use reference::IgluReference;
pub use registry::SchemaRegistry;
pub use schema::SchemaEntry;
