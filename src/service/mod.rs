//! Application operations.
//!
//! Every function receives the store, the object storage backend and, where it
//! acts on someone's data, the authenticated [`User`](crate::types::User)
//! explicitly. Ownership is enforced here and in the store's queries.

pub mod accounts;
pub mod categories;
pub mod dashboard;
pub mod documents;
pub mod format;
