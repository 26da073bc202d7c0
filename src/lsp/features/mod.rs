//! LSP features built on top of the project resolver and module cache.

pub mod completion;

pub use completion::{CandidateKind, CompletionCandidate, CompletionContext, CompletionEngine, ItemDocumentation};
