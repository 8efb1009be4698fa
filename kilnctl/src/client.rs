//! HTTP client for communicating with the kiln server.

use anyhow::{Context, Result};
use kiln_core::{api, ProfileCandidate, ProfileValidator, TempLimits};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

/// Normalize a server URL by removing trailing slashes.
fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Reject blank profile names before building a URL from them.
fn encode_name(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(anyhow::anyhow!("Profile name cannot be empty"));
    }
    Ok(urlencoding::encode(name).into_owned())
}

/// HTTP client for the kiln daemon's REST API.
///
/// # Retry Logic
///
/// Requests that fail before a response arrives (connection refused,
/// timeout) are retried with a linearly growing delay. Any HTTP response,
/// including 4xx and 5xx, is final.
///
/// # Examples
///
/// ```no_run
/// use kilnctl::client::KilnClient;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = KilnClient::with_config(
///     "http://localhost:3000".to_string(),
///     10,  // timeout in seconds
///     3,   // max retries
///     Duration::from_millis(500),  // initial retry delay
/// ).await?;
///
/// let status = client.get_status().await?;
/// println!("Controller is {}", status.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KilnClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
    limits: TempLimits,
}

impl KilnClient {
    /// Temperature limits reported by the server at connect time.
    pub fn limits(&self) -> TempLimits {
        self.limits
    }

    /// Create a new client with custom configuration.
    ///
    /// Fetches the server's temperature limits during initialization so
    /// profiles can be checked locally before they are sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created or the server
    /// info cannot be fetched.
    pub async fn with_config(
        server_url: String,
        timeout_secs: u64,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("kilnctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let mut this = Self {
            client,
            base_url: normalize_url(&server_url),
            max_retries,
            retry_delay,
            limits: TempLimits::new(f64::NEG_INFINITY, f64::INFINITY),
        };

        let info = this
            .get_info()
            .await
            .context("Failed to fetch server information")?;
        this.limits = TempLimits::new(info.min_temp_c, info.max_temp_c);

        Ok(this)
    }

    /// Process an HTTP response and extract the API data.
    ///
    /// Error envelopes are surfaced with their machine-readable code, e.g.
    /// `profile/x/get: Profile 'x' not found [PROFILE_NOT_FOUND]`.
    async fn handle_response<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", endpoint))?;

        if !status.is_success() {
            if let Ok(api::ApiResponse::<serde_json::Value>::Error { error, code }) =
                serde_json::from_str(&text)
            {
                return Err(match code {
                    Some(code) => anyhow::anyhow!("{}: {} [{}]", endpoint, error, code),
                    None => anyhow::anyhow!("{}: {}", endpoint, error),
                });
            }

            let error_msg = match status {
                StatusCode::NOT_FOUND => format!("Endpoint {} not found", endpoint),
                StatusCode::BAD_REQUEST => format!("Bad request to {}: {}", endpoint, text),
                StatusCode::INTERNAL_SERVER_ERROR => {
                    format!("Server error at {}: {}", endpoint, text)
                }
                StatusCode::SERVICE_UNAVAILABLE => format!("Service unavailable at {}", endpoint),
                _ => format!("HTTP {} error at {}: {}", status, endpoint, text),
            };
            return Err(anyhow::anyhow!(error_msg));
        }

        let api_response: api::ApiResponse<T> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response from {}", endpoint))?;

        match api_response {
            api::ApiResponse::Success { data } => Ok(data),
            api::ApiResponse::Error { error, .. } => {
                Err(anyhow::anyhow!("Server error at {}: {}", endpoint, error))
            }
        }
    }

    /// Execute an HTTP request with automatic retry logic.
    ///
    /// Only connection-level failures are retried; the delay grows as
    /// `retry_delay * (attempt + 1)`.
    async fn execute_with_retry<F, Fut, T>(&self, endpoint: &str, request_fn: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
        T: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match request_fn().await {
                Ok(response) => {
                    return Self::handle_response(response, endpoint).await;
                }
                Err(e) => {
                    let should_retry = e.is_connect() || e.is_timeout() || e.is_request();
                    last_error = Some(e);

                    if attempt < self.max_retries && should_retry {
                        tokio::time::sleep(self.retry_delay * (attempt + 1)).await;
                        continue;
                    } else {
                        break;
                    }
                }
            }
        }

        Err(anyhow::anyhow!(
            "Failed to reach {} after {} attempts: {}",
            endpoint,
            self.max_retries + 1,
            last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string())
        ))
    }

    /// Retrieve system information from the server.
    pub async fn get_info(&self) -> Result<api::InfoResponse> {
        let url = format!("{}/api/v0/info", self.base_url);

        self.execute_with_retry("info", || self.client.get(&url).send())
            .await
    }

    /// Retrieve the latest run state snapshot.
    pub async fn get_status(&self) -> Result<api::StatusResponse> {
        let url = format!("{}/api/v0/status", self.base_url);

        self.execute_with_retry("status", || self.client.get(&url).send())
            .await
    }

    /// List stored profiles as summaries.
    pub async fn list_profiles(&self) -> Result<api::ProfileListResponse> {
        let url = format!("{}/api/v0/profiles/list", self.base_url);

        self.execute_with_retry("profiles/list", || self.client.get(&url).send())
            .await
    }

    /// Fetch one profile with all its points.
    pub async fn get_profile(&self, name: &str) -> Result<api::SingleProfileResponse> {
        let encoded = encode_name(name)?;
        let url = format!("{}/api/v0/profile/{}/get", self.base_url, encoded);
        let endpoint = &format!("profile/{}/get", name);

        self.execute_with_retry(endpoint, || self.client.get(&url).send())
            .await
    }

    /// Validate a profile locally against the server limits, then save it.
    ///
    /// Returns the canonical profile stored by the server.
    ///
    /// # Errors
    ///
    /// Returns the first validation error without contacting the server, or
    /// the server's error when it rejects the profile.
    pub async fn save_profile(
        &self,
        candidate: &ProfileCandidate,
    ) -> Result<api::SingleProfileResponse> {
        ProfileValidator::with_limits(self.limits).validate(candidate)?;

        let url = format!("{}/api/v0/profiles/save", self.base_url);
        let endpoint = "profiles/save";

        let response = self
            .client
            .post(&url)
            .json(candidate)
            .send()
            .await
            .with_context(|| format!("Failed to send save profile request to {}", endpoint))?;

        Self::handle_response(response, endpoint).await
    }

    /// Delete a stored profile.
    pub async fn delete_profile(&self, name: &str) -> Result<()> {
        let encoded = encode_name(name)?;
        let url = format!("{}/api/v0/profile/{}", self.base_url, encoded);
        let endpoint = &format!("profile/{}", name);

        self.execute_with_retry(endpoint, || self.client.delete(&url).send())
            .await
            .map(|_: ()| ())
    }

    /// Preview the target temperature of a stored profile at `elapsed` seconds.
    pub async fn preview_target(&self, name: &str, elapsed: f64) -> Result<api::TargetResponse> {
        if !elapsed.is_finite() {
            return Err(anyhow::anyhow!(
                "Elapsed time must be a finite number of seconds"
            ));
        }

        let encoded = encode_name(name)?;
        let url = format!(
            "{}/api/v0/profile/{}/target?elapsed={}",
            self.base_url, encoded, elapsed
        );
        let endpoint = &format!("profile/{}/target", name);

        self.execute_with_retry(endpoint, || self.client.get(&url).send())
            .await
    }

    /// Start a run. Without a name the server reuses the last selected profile.
    ///
    /// Not retried: a lost response must not start a second run.
    pub async fn run(&self, profile: Option<&str>) -> Result<api::RunResponse> {
        let url = format!("{}/api/v0/run", self.base_url);
        let endpoint = "run";
        let body = api::RunRequest {
            profile_id: profile.map(str::to_string),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send run request to {}", endpoint))?;

        Self::handle_response(response, endpoint).await
    }

    /// Stop the current run.
    pub async fn stop(&self) -> Result<api::StatusResponse> {
        let url = format!("{}/api/v0/stop", self.base_url);

        self.execute_with_retry("stop", || self.client.post(&url).send())
            .await
    }

    /// Acknowledge a latched fault.
    pub async fn acknowledge(&self) -> Result<api::StatusResponse> {
        let url = format!("{}/api/v0/fault/ack", self.base_url);

        self.execute_with_retry("fault/ack", || self.client.post(&url).send())
            .await
    }

    /// Test basic connectivity to the server.
    ///
    /// Returns `false` rather than an error when the server is unreachable.
    pub async fn ping(&self) -> Result<bool> {
        let url = format!("{}/", self.base_url);

        // Use a shorter timeout for ping
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .context("Failed to create ping client")?;

        match client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Connectivity and API check.
    ///
    /// Keys: `connected`, `ping_ms`, then `api_working` with either
    /// `server_version` and `controller_status`, or `api_error`.
    pub async fn health_check(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let mut health = BTreeMap::new();

        let ping_start = std::time::Instant::now();
        let ping_success = self.ping().await?;
        let ping_duration = ping_start.elapsed();

        health.insert("connected".to_string(), serde_json::json!(ping_success));
        health.insert(
            "ping_ms".to_string(),
            serde_json::json!(ping_duration.as_millis() as u64),
        );

        if ping_success {
            match self.get_info().await {
                Ok(info) => {
                    health.insert("api_working".to_string(), serde_json::json!(true));
                    health.insert("server_version".to_string(), serde_json::json!(info.version));
                }
                Err(e) => {
                    health.insert("api_working".to_string(), serde_json::json!(false));
                    health.insert("api_error".to_string(), serde_json::json!(e.to_string()));
                }
            }
            if let Ok(status) = self.get_status().await {
                health.insert(
                    "controller_status".to_string(),
                    serde_json::json!(status.status.as_str()),
                );
            }
        }

        Ok(health)
    }
}
