//! CLI commands for Thicket.
//!
//! Each command wraps a `SearchEngine` over a blob store and produces a
//! serializable `*Output`:
//! - **index**: upsert documents from a JSON file
//! - **delete**: remove a document by id
//! - **search**: query with highlighted snippets

pub mod delete;
pub mod index_cmd;
pub mod search;

pub use delete::DeleteCommand;
pub use index_cmd::IndexCommand;
pub use search::SearchCommand;
