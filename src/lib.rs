//! Question answering over Go codebases.
//!
//! Functions are extracted with tree-sitter, embedded, stored in LanceDB and
//! retrieved by cosine similarity to ground a generated answer.

pub mod assistant;
pub mod cli;
pub mod config;
pub mod docs;
pub mod error;
pub mod http;
pub mod index;
pub mod search;
pub mod storage;
pub mod types;

pub use assistant::Assistant;
pub use error::{Error, Result};
