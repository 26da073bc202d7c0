//! Parser modules

pub mod elm_parser;

pub use elm_parser::{ModuleParser, ParseError, TreeSitterElmParser};
