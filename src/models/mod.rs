pub mod annotation;
pub mod conversation;
pub mod schema;
pub mod todo;

pub use annotation::AnnotationResult;
pub use conversation::{BatchRange, ConversationMessage, TokenUsage};
pub use schema::AnnotationItem;
pub use todo::TodoRow;
