//! Client for the limiting service's rate limit and feature flag APIs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::counter;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::cache::{
    ALL_FEATURES_CACHE_KEY, CacheBackend, MemoryCache, NoopCache, expiry_cache_key,
    fetch_or_compute, flag_cache_key,
};
use crate::error::{ErrorPolicy, RatelimError};
use crate::types::{
    AcquireResult, FeatureFlag, LimitCheckRequest, LimitDefinition, LimitReturnRequest, RatePolicy,
    UpsertLimitRequest,
};

/// Default base URL for the limiting service.
pub const DEFAULT_BASE_URL: &str = "http://www.ratelim.it";

/// Returns the default base URL as a parsed [`Url`].
///
/// This function is infallible because [`DEFAULT_BASE_URL`] is a valid URL.
fn default_base_url() -> Url {
    // SAFETY: DEFAULT_BASE_URL is a compile-time constant that is a valid URL.
    // This is tested in unit tests.
    #[expect(clippy::expect_used)]
    Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL")
}

const LIMIT_CHECK_PATH: &str = "/api/v1/limitcheck";
const LIMIT_RETURN_PATH: &str = "/api/v1/limitreturn";
const LIMITS_PATH: &str = "/api/v1/limits";
const FEATURE_FLAGS_PATH: &str = "/api/v1/featureflags";

/// Response header carrying the epoch millis at which an exhausted window
/// resets.
const RESET_HEADER: &str = "X-Rate-Limit-Reset";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How long flag evaluations and bulk flag fetches are cached.
const FLAG_CACHE_TTL: Duration = Duration::from_secs(60);

/// Upper bound of the uniform jitter added to the backoff after each denied
/// check in [`RatelimClient::acquire_or_wait`].
const WAIT_INCREMENT_MAX: Duration = Duration::from_millis(500);

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

// =============================================================================
// Client Builder
// =============================================================================

/// Builder for creating a [`RatelimClient`].
pub struct RatelimClientBuilder {
    api_key: Option<SecretString>,
    base_url: Option<Url>,
    on_error: ErrorPolicy,
    shared_cache: Option<Arc<dyn CacheBackend>>,
    in_process_cache: Option<Arc<dyn CacheBackend>>,
    use_expiry_cache: bool,
    http_client: Option<reqwest::Client>,
    connect_timeout: Duration,
    timeout: Duration,
    jitter_seed: Option<u64>,
}

impl Default for RatelimClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            on_error: ErrorPolicy::default(),
            shared_cache: None,
            in_process_cache: None,
            use_expiry_cache: true,
            http_client: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            jitter_seed: None,
        }
    }
}

impl RatelimClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key, as issued by the service: `"<account_id>|<secret>"`.
    ///
    /// This is the only required setting.
    pub fn api_key(mut self, key: impl Into<SecretString>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL of the limiting service.
    ///
    /// Defaults to [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets what happens when a call to the service fails.
    ///
    /// Defaults to [`ErrorPolicy::PassThrough`].
    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    /// Sets the cache shared across processes, e.g. one backed by memcached.
    ///
    /// With a shared cache in place, flag checks are evaluated locally
    /// against a bulk flag fetch pooled across the fleet, and exhausted
    /// windows short-circuit without a network call. Without one, every
    /// uncached flag check is its own request.
    pub fn shared_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.shared_cache = Some(cache);
        self
    }

    /// Sets the in-process cache holding individual flag evaluations.
    ///
    /// Defaults to a [`MemoryCache`].
    pub fn in_process_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.in_process_cache = Some(cache);
        self
    }

    /// Enables or disables short-circuiting limit checks against cached
    /// window resets. On by default; only effective with a shared cache.
    pub fn use_expiry_cache(mut self, enabled: bool) -> Self {
        self.use_expiry_cache = enabled;
        self
    }

    /// Sets a custom HTTP client, replacing the default timeouts.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the connection timeout for the default HTTP client.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Sets the request timeout for the default HTTP client.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Seeds the backoff jitter of
    /// [`acquire_or_wait`](RatelimClient::acquire_or_wait), for reproducible
    /// waits in tests.
    pub fn jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }

    /// Builds the [`RatelimClient`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not set or the HTTP client cannot
    /// be built.
    pub fn build(self) -> Result<RatelimClient, RatelimError> {
        let api_key = self.api_key.ok_or(RatelimError::MissingConfig("api_key"))?;
        // Keys are issued as "<account_id>|<secret>"; a key without the
        // separator is treated as a bare account id.
        let (account_id, api_secret) = match api_key.expose_secret().split_once('|') {
            Some((account, secret)) => (
                account.to_string(),
                Some(SecretString::from(secret.to_string())),
            ),
            None => (api_key.expose_secret().to_string(), None),
        };

        let base_url = match self.base_url {
            Some(url) => url,
            None => default_base_url(),
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let mut headers = HeaderMap::new();
                headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
                reqwest::Client::builder()
                    .default_headers(headers)
                    .connect_timeout(self.connect_timeout)
                    .timeout(self.timeout)
                    .build()?
            }
        };

        let has_shared_cache = self.shared_cache.is_some();
        let shared_cache = self.shared_cache.unwrap_or_else(|| Arc::new(NoopCache));
        let in_process_cache = self
            .in_process_cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()));

        Ok(RatelimClient {
            http_client,
            base_url,
            account_id,
            api_secret,
            on_error: self.on_error,
            shared_cache,
            has_shared_cache,
            in_process_cache,
            use_expiry_cache: self.use_expiry_cache,
            jitter_seed: self.jitter_seed,
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Client for the limiting service.
///
/// One instance per process is the intended shape: the client is cheap to
/// clone through [`Arc`], holds its own connection pool, and its caches only
/// pay off when shared.
pub struct RatelimClient {
    http_client: reqwest::Client,
    base_url: Url,
    account_id: String,
    api_secret: Option<SecretString>,
    on_error: ErrorPolicy,
    shared_cache: Arc<dyn CacheBackend>,
    has_shared_cache: bool,
    in_process_cache: Arc<dyn CacheBackend>,
    use_expiry_cache: bool,
    jitter_seed: Option<u64>,
}

impl fmt::Debug for RatelimClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatelimClient")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .field("on_error", &self.on_error)
            .finish_non_exhaustive()
    }
}

impl RatelimClient {
    /// Creates a new builder for constructing a [`RatelimClient`].
    pub fn builder() -> RatelimClientBuilder {
        RatelimClientBuilder::new()
    }

    /// Returns the base URL of the limiting service.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the account id parsed from the API key.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    // -------------------------------------------------------------------------
    // Limit checks
    // -------------------------------------------------------------------------

    /// Checks whether one token is available for `group`, consuming it if so.
    pub async fn pass(&self, group: &str) -> Result<bool, RatelimError> {
        let result = self.acquire(group, 1).await?;
        Ok(result.passed)
    }

    /// Acquires `amount` tokens for `group`, all or nothing.
    ///
    /// The service resolves `group` against its limit definitions, most
    /// specific pattern first, and charges the matching limit. Per
    /// [`ErrorPolicy`], a failure to reach the service is absorbed into a
    /// synthetic passed or denied result, or returned.
    pub async fn acquire(&self, group: &str, amount: u64) -> Result<AcquireResult, RatelimError> {
        self.limit_check(group, amount, false).await
    }

    /// Acquires up to `amount` tokens for `group`, taking whatever is left.
    ///
    /// The granted [`amount`](AcquireResult::amount) may be any value up to
    /// the request, and the check passes whenever it is nonzero.
    pub async fn acquire_allowing_partial(
        &self,
        group: &str,
        amount: u64,
    ) -> Result<AcquireResult, RatelimError> {
        self.limit_check(group, amount, true).await
    }

    async fn limit_check(
        &self,
        group: &str,
        amount: u64,
        allow_partial: bool,
    ) -> Result<AcquireResult, RatelimError> {
        let expiry_key = expiry_cache_key(group);
        if self.use_expiry_cache
            && let Some(cached) = self.shared_cache.read(&expiry_key).await
            && let Some(reset_at) = as_epoch_millis(&cached)
            && reset_at > Utc::now().timestamp_millis()
        {
            // The window is known exhausted; skip the network round trip.
            counter!("ratelim_limitcheck_expirycache_hits_total").increment(1);
            return Ok(AcquireResult::synthetic(false));
        }

        let url = self.base_url.join(LIMIT_CHECK_PATH)?;
        let body = LimitCheckRequest {
            acquire_amount: amount,
            groups: vec![group],
            allow_partial_response: allow_partial,
        };
        let sent = self
            .with_auth(self.http_client.post(url))
            .json(&body)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(error) => return self.failed_check(RatelimError::Request(error)),
        };
        if !response.status().is_success() {
            let error = Self::http_error(response).await;
            return self.failed_check(error);
        }

        let reset_header = Self::reset_hint(&response);
        let result = match response.json::<AcquireResult>().await {
            Ok(result) => result,
            Err(error) => return self.failed_check(RatelimError::Request(error)),
        };
        counter!(
            "ratelim_limitcheck_total",
            "pass" => result.passed.to_string(),
            "policy_group" => result.policy_group.clone().unwrap_or_default()
        )
        .increment(1);

        if self.use_expiry_cache {
            // The header is authoritative whenever the service sends it; a
            // denial's body field stands in when it does not.
            let reset_at = match (reset_header, result.passed) {
                (Some(reset_at), _) => Some(reset_at),
                (None, false) => result.reset_at_millis,
                (None, true) => None,
            };
            if let Some(reset_at) = reset_at {
                self.shared_cache
                    .write(&expiry_key, Value::from(reset_at), None)
                    .await;
            }
        }
        Ok(result)
    }

    /// Acquires `amount` tokens for `group`, sleeping between denied checks
    /// until tokens are granted or `max_wait` elapses.
    ///
    /// The sleep starts at `init_backoff` and grows by a uniform random
    /// increment below half a second after every denial, so a thundering
    /// herd of waiters spreads out instead of polling in lockstep. The
    /// deadline is re-checked before each sleep; `max_wait` of zero fails
    /// without ever calling the service, while a `max_wait` too large for
    /// the clock to represent (such as [`Duration::MAX`]) waits with no
    /// deadline at all.
    ///
    /// Note that under [`ErrorPolicy::PassThrough`] an unreachable service
    /// makes the inner check look passed, which ends the wait immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RatelimError::WaitExceeded`] if no tokens were granted in
    /// time.
    pub async fn acquire_or_wait(
        &self,
        group: &str,
        amount: u64,
        max_wait: Duration,
        init_backoff: Duration,
    ) -> Result<AcquireResult, RatelimError> {
        let deadline = Instant::now().checked_add(max_wait);
        let mut backoff = init_backoff;
        let mut jitter = match self.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                let mut thread_rng = rand::rng();
                StdRng::from_rng(&mut thread_rng)
            }
        };
        while deadline.is_none_or(|deadline| Instant::now() < deadline) {
            tokio::time::sleep(backoff).await;
            let result = self.acquire(group, amount).await?;
            if result.passed {
                return Ok(result);
            }
            backoff += WAIT_INCREMENT_MAX.mul_f64(jitter.random_range(0.0..1.0));
        }
        Err(RatelimError::WaitExceeded {
            group: group.to_string(),
            max_wait,
        })
    }

    /// Hands tokens back to a returnable limit.
    ///
    /// Pass the [`AcquireResult`] that granted the tokens; the service needs
    /// its enforced group, expiry, and amount verbatim. Returning a result
    /// that never passed is harmless.
    pub async fn return_tokens(&self, result: &AcquireResult) -> Result<(), RatelimError> {
        let url = self.base_url.join(LIMIT_RETURN_PATH)?;
        let body = LimitReturnRequest {
            enforced_group: result.enforced_group.as_deref(),
            expires_at: result.expires_at,
            amount: result.amount,
        };
        let sent = self
            .with_auth(self.http_client.post(url))
            .json(&body)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(error) => return self.on_error.resolve(RatelimError::Request(error), (), ()),
        };
        if response.status().is_success() {
            return Ok(());
        }
        let error = Self::http_error(response).await;
        self.on_error.resolve(error, (), ())
    }

    // -------------------------------------------------------------------------
    // Limit definitions
    // -------------------------------------------------------------------------

    /// Creates a limit, leaving any existing definition for `group` in
    /// place.
    pub async fn create_limit(
        &self,
        group: &str,
        limit: u64,
        policy: RatePolicy,
        burst: Option<u64>,
    ) -> Result<(), RatelimError> {
        let definition = LimitDefinition::new(group, limit, policy, false, burst)?;
        self.upsert(&definition, Method::POST).await
    }

    /// Creates or overwrites the limit for `group`.
    pub async fn upsert_limit(
        &self,
        group: &str,
        limit: u64,
        policy: RatePolicy,
        burst: Option<u64>,
    ) -> Result<(), RatelimError> {
        let definition = LimitDefinition::new(group, limit, policy, false, burst)?;
        self.upsert(&definition, Method::PUT).await
    }

    /// Creates a token bucket of `total_tokens` where a consumed token
    /// recharges after `seconds_to_refill_one_token`, leaving any existing
    /// definition in place.
    ///
    /// Tokens acquired from the bucket can be handed back early with
    /// [`return_tokens`](Self::return_tokens).
    pub async fn create_returnable_limit(
        &self,
        group: &str,
        total_tokens: u64,
        seconds_to_refill_one_token: u64,
    ) -> Result<(), RatelimError> {
        let definition = returnable_definition(group, total_tokens, seconds_to_refill_one_token)?;
        self.upsert(&definition, Method::POST).await
    }

    /// Creates or overwrites a token bucket; see
    /// [`create_returnable_limit`](Self::create_returnable_limit).
    pub async fn upsert_returnable_limit(
        &self,
        group: &str,
        total_tokens: u64,
        seconds_to_refill_one_token: u64,
    ) -> Result<(), RatelimError> {
        let definition = returnable_definition(group, total_tokens, seconds_to_refill_one_token)?;
        self.upsert(&definition, Method::PUT).await
    }

    /// Creates a distributed semaphore of `concurrent_slots`, leaving any
    /// existing definition in place.
    ///
    /// A slot is held until returned via [`return_tokens`](Self::return_tokens)
    /// or until the service reclaims it after `seconds_to_release_one_slot`,
    /// which bounds how long a crashed holder can pin a slot.
    pub async fn create_concurrency_limit(
        &self,
        group: &str,
        concurrent_slots: u64,
        seconds_to_release_one_slot: u64,
    ) -> Result<(), RatelimError> {
        let definition =
            returnable_definition(group, concurrent_slots, seconds_to_release_one_slot)?;
        self.upsert(&definition, Method::POST).await
    }

    /// Creates or overwrites a distributed semaphore; see
    /// [`create_concurrency_limit`](Self::create_concurrency_limit).
    pub async fn upsert_concurrency_limit(
        &self,
        group: &str,
        concurrent_slots: u64,
        seconds_to_release_one_slot: u64,
    ) -> Result<(), RatelimError> {
        let definition =
            returnable_definition(group, concurrent_slots, seconds_to_release_one_slot)?;
        self.upsert(&definition, Method::PUT).await
    }

    async fn upsert(
        &self,
        definition: &LimitDefinition,
        method: Method,
    ) -> Result<(), RatelimError> {
        let is_create = method == Method::POST;
        let url = self.base_url.join(LIMITS_PATH)?;
        let body = UpsertLimitRequest::from(definition);
        let sent = self
            .with_auth(self.http_client.request(method, url))
            .json(&body)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(error) => return self.on_error.resolve(RatelimError::Request(error), (), ()),
        };
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        // Conflicts are routinely expected on create.
        if is_create && status == StatusCode::CONFLICT {
            tracing::debug!(group = definition.group(), "limit already exists");
            return Ok(());
        }
        let error = Self::http_error(response).await;
        self.on_error.resolve(error, (), ())
    }

    // -------------------------------------------------------------------------
    // Feature flags
    // -------------------------------------------------------------------------

    /// Checks a flag with no caller identity; see
    /// [`feature_is_on_for`](Self::feature_is_on_for).
    pub async fn feature_is_on(&self, feature: &str) -> Result<bool, RatelimError> {
        self.feature_is_on_for(feature, None, &[]).await
    }

    /// Checks whether `feature` is on for the caller identified by
    /// `lookup_key` and `attributes`.
    ///
    /// A caller whose lookup key or attributes are whitelisted is always on;
    /// otherwise the lookup key's stable bucket decides, so a caller stays
    /// in a percentage rollout as it grows. Evaluations are cached in
    /// process for a minute.
    ///
    /// With a shared cache configured, flags are evaluated locally against a
    /// bulk flag fetch pooled across the fleet, and a flag the service does
    /// not know is off. Without one, the service evaluates each check
    /// itself.
    pub async fn feature_is_on_for(
        &self,
        feature: &str,
        lookup_key: Option<&str>,
        attributes: &[&str],
    ) -> Result<bool, RatelimError> {
        counter!("ratelim_featureflag_checks_total", "feature" => feature.to_string()).increment(1);
        let cache_key = flag_cache_key(feature, lookup_key, attributes);
        fetch_or_compute(
            self.in_process_cache.as_ref(),
            &cache_key,
            FLAG_CACHE_TTL,
            || async move {
                if !self.has_shared_cache {
                    return self.remote_feature_is_on(feature, lookup_key, attributes).await;
                }
                let features = self.all_features().await?;
                Ok(features
                    .get(feature)
                    .is_some_and(|flag| flag.evaluate(&self.account_id, lookup_key, attributes)))
            },
        )
        .await
    }

    /// Fetches every flag for the account, served from the shared cache
    /// when the last fetch is under a minute old.
    ///
    /// Unless the policy is [`ErrorPolicy::Propagate`], a failed fetch is
    /// logged and an empty set is cached, so flags read as off rather than
    /// erroring for a minute of checks.
    async fn all_features(&self) -> Result<HashMap<String, FeatureFlag>, RatelimError> {
        fetch_or_compute(
            self.shared_cache.as_ref(),
            ALL_FEATURES_CACHE_KEY,
            FLAG_CACHE_TTL,
            || async move {
                match self.fetch_all_features().await {
                    Ok(features) => Ok(features),
                    Err(error) if self.on_error == ErrorPolicy::Propagate => Err(error),
                    Err(error) => {
                        tracing::warn!(error = %error, "failed to fetch feature flags");
                        Ok(HashMap::new())
                    }
                }
            },
        )
        .await
    }

    async fn fetch_all_features(&self) -> Result<HashMap<String, FeatureFlag>, RatelimError> {
        let url = self.base_url.join(FEATURE_FLAGS_PATH)?;
        let sent = self.with_auth(self.http_client.get(url)).send().await;
        let response = match sent {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                counter!("ratelim_featureflag_fetchall_requests_total", "success" => "false")
                    .increment(1);
                return Err(Self::http_error(response).await);
            }
            Err(error) => {
                counter!("ratelim_featureflag_fetchall_requests_total", "success" => "false")
                    .increment(1);
                return Err(RatelimError::Request(error));
            }
        };
        counter!("ratelim_featureflag_fetchall_requests_total", "success" => "true").increment(1);
        let flags: Vec<FeatureFlag> = response.json().await?;
        Ok(flags
            .into_iter()
            .map(|flag| (flag.feature.clone(), flag))
            .collect())
    }

    /// Has the service evaluate one flag check, for processes without a
    /// shared cache.
    async fn remote_feature_is_on(
        &self,
        feature: &str,
        lookup_key: Option<&str>,
        attributes: &[&str],
    ) -> Result<bool, RatelimError> {
        let url = self
            .base_url
            .join(&format!("{FEATURE_FLAGS_PATH}/{feature}/on"))?;
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(key) = lookup_key {
            query.push(("lookupKey", key));
        }
        for &attribute in attributes {
            query.push(("attributes", attribute));
        }
        let sent = self
            .with_auth(self.http_client.get(url))
            .query(&query)
            .send()
            .await;
        let response = match sent {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                counter!("ratelim_featureflag_requests_total", "success" => "false").increment(1);
                let error = Self::http_error(response).await;
                return self.on_error.resolve(error, true, false);
            }
            Err(error) => {
                counter!("ratelim_featureflag_requests_total", "success" => "false").increment(1);
                return self.on_error.resolve(RatelimError::Request(error), true, false);
            }
        };
        counter!("ratelim_featureflag_requests_total", "success" => "true").increment(1);
        match response.text().await {
            Ok(body) => Ok(body.trim() == "true"),
            Err(error) => self.on_error.resolve(RatelimError::Request(error), true, false),
        }
    }

    // -------------------------------------------------------------------------
    // Helper Methods
    // -------------------------------------------------------------------------

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(
            &self.account_id,
            self.api_secret.as_ref().map(ExposeSecret::expose_secret),
        )
    }

    /// Resolves a failed limit check per the error policy.
    fn failed_check(&self, error: RatelimError) -> Result<AcquireResult, RatelimError> {
        self.on_error.resolve(
            error,
            AcquireResult::synthetic(true),
            AcquireResult::synthetic(false),
        )
    }

    /// Extracts error details from a non-success response.
    async fn http_error(response: reqwest::Response) -> RatelimError {
        let status = response.status();
        let message = match response.text().await {
            Ok(body) if !body.trim().is_empty() => body,
            _ => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };
        RatelimError::Http {
            status_code: status.as_u16(),
            message,
        }
    }

    fn reset_hint(response: &reqwest::Response) -> Option<i64> {
        response
            .headers()
            .get(RESET_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
    }
}

/// Other client libraries store the raw reset header, so a shared entry may
/// be a number or a numeric string.
fn as_epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Derives the definition shared by token buckets and semaphores: a
/// returnable daily-rolling limit recharging one token per
/// `seconds_to_refill_one_token`, bursting to the full bucket.
fn returnable_definition(
    group: &str,
    total_tokens: u64,
    seconds_to_refill_one_token: u64,
) -> Result<LimitDefinition, RatelimError> {
    if seconds_to_refill_one_token == 0 {
        return Err(RatelimError::InvalidLimit {
            message: format!("refill interval for `{group}` must be at least 1 second"),
        });
    }
    let recharge_rate = SECONDS_PER_DAY / seconds_to_refill_one_token;
    if recharge_rate == 0 {
        return Err(RatelimError::InvalidLimit {
            message: format!("refill interval for `{group}` must be at most one day"),
        });
    }
    LimitDefinition::new(
        group,
        recharge_rate,
        RatePolicy::DailyRolling,
        true,
        Some(total_tokens),
    )
}
