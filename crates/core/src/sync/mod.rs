//! Incremental synchronisation of ERP entities into the local cache.

pub mod ports;
pub mod service;
