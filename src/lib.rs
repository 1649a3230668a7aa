//! upyun-relay Library
//!
//! Authenticated upload relay: accepts a file over HTTP, stores it in an UpYun
//! bucket and answers with the file's public URL.
//!
//! # Features
//!
//! - **Shared-secret auth**: `Authorization: Bearer <base64(AUTH_CODE)>`
//! - **Dated folders**: default object keys look like `2024/01/05/1704445687000.png`
//! - **Uniform responses**: every API answer is `{code, msg, data}`
//!
//! # Example
//!
//! ```no_run
//! use upyun_relay::{config::Config, server::RelayServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = RelayServer::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod date;
pub mod encoding;
pub mod envelope;
pub mod metrics;
pub mod router;
pub mod server;
pub mod upload;
pub mod upyun;

// Re-export commonly used types
pub use config::Config;
pub use envelope::ApiResult;
pub use server::RelayServer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
