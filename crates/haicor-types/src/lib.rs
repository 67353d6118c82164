//! Core types and traits for the HAICOR narrative reasoning API.
//!
//! Request/response DTOs match the JSON the reasoning backend speaks on `/api/*`.

mod dto;
mod phase;
mod traits;

pub use dto::*;
pub use phase::*;
pub use traits::*;
