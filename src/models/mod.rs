pub mod chat;
pub mod story;

pub use chat::*;
pub use story::*;
