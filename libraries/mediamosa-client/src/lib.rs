//! MediaMosa Client
//!
//! Async client library for the MediaMosa media management REST API.
//!
//! # Features
//!
//! - **Authentication**: DBUS_COOKIE_SHA1 challenge-response login, session cookie
//! - **Transparent re-login**: calls answered with "authentication required"
//!   (`1601`) trigger one login and one retry
//! - **Generic calls**: `get`/`post` returning the parsed XML envelope
//! - **Assets and mediafiles**: create assets, mediafiles and upload tickets,
//!   look up play URLs and transcode profiles
//!
//! # Example
//!
//! ```ignore
//! use mediamosa_client::{MediaMosaClient, MediaMosaConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MediaMosaConfig::new("mediamosa.example.com", "connector", "secret");
//!     let client = MediaMosaClient::new(config)?;
//!
//!     // Logs in on first use
//!     let asset_id = client.create_asset().await?;
//!     let mediafile_id = client.create_mediafile(&asset_id).await?;
//!     let upload_url = client.create_upload_ticket(&mediafile_id).await?;
//!     println!("Upload to {}", upload_url);
//!
//!     // Any other endpoint
//!     let result = client.get(&format!("/asset/{}", asset_id)).await?;
//!     println!("{:?}", result.first_item());
//!
//!     Ok(())
//! }
//! ```

mod auth;
mod client;
mod config;
mod error;
mod media;
mod response;
mod session;
mod transport;

// Re-export main types
pub use client::MediaMosaClient;
pub use config::MediaMosaConfig;
pub use error::{MediaMosaError, Result};
pub use response::{Item, RequestResult, ResultCode, MM_AUTH_REQUIRED, MM_OK};
pub use session::Session;
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, FORM_CONTENT_TYPE,
};

// Handshake building blocks, exposed for custom login flows and testing
pub use auth::{challenge_response, extract_challenge, generate_nonce, Authenticator};
