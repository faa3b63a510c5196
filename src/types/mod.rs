mod content_item;
mod report;

pub use content_item::ContentItem;
pub use report::*;
