// Public fallible APIs in this crate share one concrete error contract (`VaultError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod analyze;
pub mod autolink;
pub mod candidates;
pub mod config;
pub mod conflicts;
pub mod deadlinks;
pub mod error;
pub mod models;
pub mod note;
pub mod rewrite;
pub mod vault;
pub mod zones;

pub use autolink::{AutoLinkOutcome, AutoLinkRequest, auto_link_vault, detect_vault_dead_links};
pub use config::{ProcessingConfig, WordBoundaryMode};
pub use deadlinks::{DeadLink, DeadLinkReport};
pub use error::{Result, VaultError};
pub use models::Note;
pub use vault::VaultRepository;
