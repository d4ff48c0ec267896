//! Domains module containing business logic organized by bounded contexts.
//!
//! The server exposes a single domain, `tools`; path and credential checks
//! live in `core::security` because every transport depends on them.

pub mod tools;
