//! WeCom application API client.
//!
//! This module provides:
//! - Access token retrieval and caching
//! - Text, markdown, text card and image messages
//! - Temporary media upload and download
//! - Typed response envelopes

pub mod client;
pub mod media;
pub mod models;
pub mod text;

pub use client::{WecomClient, validate_textcard};
pub use media::validate_upload;
pub use models::{
    ApiResponse, MediaType, MessageBody, Recipient, SendResponse, TextCard, TokenResponse,
    UploadResponse,
};
pub use text::{DEFAULT_MAX_CONTENT_BYTES, split_text};
