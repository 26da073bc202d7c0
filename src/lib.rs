pub mod ir;
pub mod logging;
pub mod lsp;
pub mod parsers;
pub mod project;
