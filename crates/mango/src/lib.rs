//! Imperative shell of the mango survey service: cache and collection
//! backends, the cached stores, the service facade and its HTTP transport.

pub mod app;
pub mod cache;
pub mod config;
pub mod handlers;
pub mod reservation;
pub mod service;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
