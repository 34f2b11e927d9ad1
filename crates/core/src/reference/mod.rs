pub mod collect;
pub mod populate;

pub use collect::{collect_content_item_ids, collect_user_ids, is_reference_key};
pub use populate::{populate, splice, CleanIndex, IdIndex};
