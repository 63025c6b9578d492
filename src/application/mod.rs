//! Application Layer
//!
//! Contains business logic services and data transfer objects (DTOs).
//! This layer validates requests, composes queries and coordinates
//! multi-step writes over the infrastructure layer.

pub mod services;
pub mod dto;
