pub mod definition;
pub mod id;
pub mod model;
pub mod shape;
pub mod validate;

pub use definition::{ContentDefinition, FieldDefinition, FieldKind};
pub use id::{looks_like_content_item_id, new_content_item_id};
pub use model::{ContentItem, UserRecord};
pub use validate::{ValidFields, ValidationError};
