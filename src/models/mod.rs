//! Request and Response models for the cache server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ImportEntry, ImportRequest, MgetRequest, MsetRequest, SetRequest};
pub use responses::{
    BulkWriteResponse, ClearResponse, DeleteResponse, ExistsResponse, ExportResponse,
    GetResponse, HealthResponse, MgetResponse, SetResponse, StatsResponse,
};
