//! Client for a central limiting service: distributed rate limits and
//! percentage-rollout feature flags.
//!
//! Rate limits live on the service, so every process that checks a group
//! spends from the same budget. The client adds the pieces that make that
//! cheap and safe to call on hot paths: an in-process cache for flag
//! evaluations, an optional fleet-wide shared cache, short-circuiting of
//! known-exhausted windows, and an [`ErrorPolicy`] deciding whether a dead
//! service fails open, fails closed, or surfaces errors.
//!
//! # Example
//!
//! ```no_run
//! use ratelim_client::{RatePolicy, RatelimClient};
//!
//! # async fn example() -> Result<(), ratelim_client::RatelimError> {
//! let client = RatelimClient::builder()
//!     .api_key("account-id|api-secret")
//!     .build()?;
//!
//! // Define a limit once; creating it again is a no-op.
//! client
//!     .create_limit("job:import", 100, RatePolicy::HourlyRolling, None)
//!     .await?;
//!
//! // Spend from it anywhere in the fleet.
//! if client.pass("job:import").await? {
//!     // do the work
//! }
//!
//! // Roll a feature out to 25% of users, stably per user.
//! if client.feature_is_on_for("new-dashboard", Some("user:42"), &[]).await? {
//!     // render the new dashboard
//! }
//! # Ok(())
//! # }
//! ```

mod bucketing;
mod cache;
mod client;
mod error;
mod types;

pub use bucketing::bucket;
pub use cache::{CacheBackend, MemoryCache, NoopCache};
pub use client::{DEFAULT_BASE_URL, RatelimClient, RatelimClientBuilder};
pub use error::{ErrorPolicy, RatelimError};
pub use types::{
    AcquireResult, FeatureFlag, GLOBAL_ROLLOUT_THRESHOLD, LimitDefinition, RatePolicy, SafetyLevel,
};
