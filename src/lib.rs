//! Client-side core for resource-manager style cloud APIs
//!
//! - [`ids`]: typed, hierarchical resource identifiers
//! - [`operation`]: submitting mutating calls and polling long-running operations
//! - [`cache`]: resolving identifiers to data-plane endpoints
//! - [`lifecycle`]: parse, submit, poll and resolve in one call
//! - [`soft_delete`]: finding and purging soft-deleted key vaults
//!
//! # Example
//!
//! ```no_run
//! use arm_core::ids::KeyVaultId;
//! use arm_core::lifecycle::{Driver, Mutation};
//! use arm_core::transport::HttpTransport;
//! use arm_core::Config;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config {
//!     api_version: Some("2023-07-01".to_string()),
//!     bearer_token: Some("token".to_string()),
//!     ..Default::default()
//! };
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let driver: Driver<KeyVaultId> = Driver::new(transport, &config);
//!
//! let outcome = driver
//!     .execute(
//!         "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/kv1",
//!         Mutation::Delete,
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! println!("{}", outcome.result.status);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod operation;
pub mod payload;
pub mod soft_delete;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, LifecycleError, Result, Stage};
