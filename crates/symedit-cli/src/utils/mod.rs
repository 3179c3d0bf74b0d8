pub mod format;
pub mod parser;
