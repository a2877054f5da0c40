//! Shared outbound HTTP client

pub mod client;

pub use client::{BufferedResponse, HttpClient, HttpClientBuilder};
