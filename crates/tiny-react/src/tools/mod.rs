//! A set of built-in tools that models can use.

mod text_length;

pub use text_length::TextLengthTool;
