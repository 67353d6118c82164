//! HAICOR backend: story catalog and inference job endpoints.

pub mod server;
pub mod store;
