//! Request-side data models for the file gateway.
//!
//! Nothing here is persisted locally; objects live only in the bucket.

pub mod upload;
