//! Wire types for the limiting service API.
//!
//! Field names follow the service's camelCase JSON; enum values use the
//! service's SCREAMING_SNAKE_CASE names so definitions round-trip unchanged
//! across client implementations.

use serde::{Deserialize, Serialize};

use crate::bucketing::bucket;
use crate::error::RatelimError;

/// Percentage above which a rollout applies even to callers without a
/// lookup key.
pub const GLOBAL_ROLLOUT_THRESHOLD: f64 = 0.999;

// =============================================================================
// Limit definitions
// =============================================================================

/// Refill schedule for a limit, named as the limiting service names them.
///
/// The `*_ROLLING` variants refill continuously over the window; the plain
/// variants reset at the window boundary. `INFINITE` never denies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RatePolicy {
    Secondly,
    Minutely,
    MinutelyRolling,
    Hourly,
    HourlyRolling,
    Daily,
    DailyRolling,
    Monthly,
    MonthlyRolling,
    Yearly,
    YearlyRolling,
    Infinite,
}

impl RatePolicy {
    /// Parses a policy from its wire name, e.g. `"HOURLY_ROLLING"`.
    pub fn from_name(name: &str) -> Result<Self, RatelimError> {
        name.parse()
            .map_err(|_| RatelimError::InvalidPolicy(name.to_string()))
    }
}

/// How much the service may degrade enforcement to shed its own load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyLevel {
    /// Enforcement may be approximate when the service is under pressure.
    #[serde(rename = "L4_BEST_EFFORT")]
    L4BestEffort,
    /// Enforcement is always exact.
    #[serde(rename = "L5_BOMBPROOF")]
    L5Bombproof,
}

/// A limit as the owning client wants the service to enforce it.
///
/// `burst` is the instantaneous capacity and defaults to `limit`. Token
/// buckets derived by
/// [`create_returnable_limit`](crate::RatelimClient::create_returnable_limit)
/// routinely set `burst` below the daily recharge rate, so no ordering
/// between the two is enforced here.
#[derive(Clone, Debug, PartialEq)]
pub struct LimitDefinition {
    group: String,
    limit: u64,
    burst: u64,
    policy: RatePolicy,
    returnable: bool,
    safety_level: Option<SafetyLevel>,
}

impl LimitDefinition {
    pub fn new(
        group: impl Into<String>,
        limit: u64,
        policy: RatePolicy,
        returnable: bool,
        burst: Option<u64>,
    ) -> Result<Self, RatelimError> {
        let group = group.into();
        if limit == 0 {
            return Err(RatelimError::InvalidLimit {
                message: format!("limit for `{group}` must be at least 1"),
            });
        }
        let burst = burst.unwrap_or(limit);
        if burst == 0 {
            return Err(RatelimError::InvalidLimit {
                message: format!("burst for `{group}` must be at least 1"),
            });
        }
        Ok(Self {
            group,
            limit,
            burst,
            policy,
            returnable,
            safety_level: None,
        })
    }

    /// Requests a specific enforcement guarantee for this limit.
    pub fn with_safety_level(mut self, safety_level: SafetyLevel) -> Self {
        self.safety_level = Some(safety_level);
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn burst(&self) -> u64 {
        self.burst
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    pub fn returnable(&self) -> bool {
        self.returnable
    }

    pub fn safety_level(&self) -> Option<SafetyLevel> {
        self.safety_level
    }
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LimitCheckRequest<'a> {
    pub acquire_amount: u64,
    pub groups: Vec<&'a str>,
    pub allow_partial_response: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpsertLimitRequest<'a> {
    pub limit: u64,
    pub group: &'a str,
    pub burst: u64,
    pub policy_name: RatePolicy,
    pub safety_level: Option<SafetyLevel>,
    pub returnable: bool,
}

impl<'a> From<&'a LimitDefinition> for UpsertLimitRequest<'a> {
    fn from(definition: &'a LimitDefinition) -> Self {
        Self {
            limit: definition.limit(),
            group: definition.group(),
            burst: definition.burst(),
            policy_name: definition.policy(),
            safety_level: definition.safety_level(),
            returnable: definition.returnable(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LimitReturnRequest<'a> {
    pub enforced_group: Option<&'a str>,
    pub expires_at: Option<i64>,
    pub amount: u64,
}

// =============================================================================
// Responses
// =============================================================================

/// Outcome of a limit check.
///
/// `passed` is the only field the caller must look at; the rest echo what
/// the service enforced and are needed verbatim when handing tokens back via
/// [`return_tokens`](crate::RatelimClient::return_tokens).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireResult {
    pub passed: bool,
    /// Tokens actually granted. Equal to the request for all-or-nothing
    /// checks; may be lower for partial checks.
    #[serde(default)]
    pub amount: u64,
    /// Group pattern the service matched, e.g. `"product:*"`.
    #[serde(default)]
    pub policy_group: Option<String>,
    /// Exact group the service charged.
    #[serde(default)]
    pub enforced_group: Option<String>,
    /// Epoch millis at which granted tokens expire, for returnable limits.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Epoch millis at which the exhausted window resets.
    #[serde(default)]
    pub reset_at_millis: Option<i64>,
}

impl AcquireResult {
    /// A result fabricated without consulting the service, used when a
    /// failure or a cached exhaustion stands in for a real check.
    pub(crate) fn synthetic(passed: bool) -> Self {
        Self {
            passed,
            amount: 0,
            policy_group: None,
            enforced_group: None,
            expires_at: None,
            reset_at_millis: None,
        }
    }
}

/// One feature flag as served by the bulk flag endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    pub feature: String,
    /// Fraction of the keyspace the flag is on for, in `[0, 1]`.
    #[serde(default)]
    pub pct: f64,
    /// Lookup keys and attributes for which the flag is always on.
    #[serde(default)]
    pub whitelisted: Vec<String>,
}

impl FeatureFlag {
    /// Evaluates the flag for one caller.
    ///
    /// A caller whose lookup key or any attribute is whitelisted is always
    /// on. Otherwise the caller's stable bucket is compared against `pct`;
    /// with no lookup key there is no bucket, so the flag is only on when
    /// `pct` exceeds [`GLOBAL_ROLLOUT_THRESHOLD`].
    pub fn evaluate(
        &self,
        account_id: &str,
        lookup_key: Option<&str>,
        attributes: &[&str],
    ) -> bool {
        let whitelisted = attributes
            .iter()
            .copied()
            .chain(lookup_key)
            .any(|candidate| self.whitelisted.iter().any(|entry| entry == candidate));
        if whitelisted {
            return true;
        }
        match lookup_key {
            Some(key) => bucket(account_id, &self.feature, key) < self.pct,
            None => self.pct > GLOBAL_ROLLOUT_THRESHOLD,
        }
    }
}
