pub mod collecting;
pub mod json_lines;

pub use collecting::CollectingSink;
pub use json_lines::JsonLinesSink;
