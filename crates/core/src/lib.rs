//! Document engine behind the REST façade: storage shape, reference
//! population, flattening, the write path, permissions and live updates.

pub mod auth;
pub mod clean;
pub mod document;
pub mod events;
pub mod mutation;
pub mod permission;
pub mod pipeline;
pub mod reference;
pub mod store;

pub use document::{ContentDefinition, ContentItem, UserRecord};
pub use store::{DocumentStore, MemoryStore, PgStore, Store, StoreError, UserStore};
