//! Functional core of the mango survey service.
//!
//! Entity types, cache keys, query normalization and rating aggregation.
//! Nothing in this crate performs I/O; the `mango` crate supplies the
//! collections and caches behind the traits defined here.

pub mod cache;
pub mod document;
pub mod question;
pub mod rating;
pub mod storage;
pub mod survey;
