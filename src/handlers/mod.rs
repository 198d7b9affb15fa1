//! Business logic handlers
//!
//! These handlers own every store interaction; the HTTP layer only
//! authorizes, validates and serializes.

pub mod accounts;
pub mod memos;

// Re-export commonly used types
pub use accounts::{AccountHandler, Capability, Customer, Manager, ProvisionedManager, Role};
pub use memos::{Memo, MemoHandler, MemoPage, Paging};
