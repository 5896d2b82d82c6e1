//! Outbound HTTP adapters.

mod reqwest_client;

pub use reqwest_client::ReqwestHttpClient;
