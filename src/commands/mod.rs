pub mod list;
pub mod mark;
pub mod post;
