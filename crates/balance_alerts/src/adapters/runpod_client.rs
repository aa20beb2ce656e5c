// Rust guideline compliant 2026-10-19

//! RunPod GraphQL adapter for the `BalanceSource` port.
//!
//! Posts a single `myself { clientBalance currentSpendPerHr }` query with
//! bearer authentication. Each fetch makes up to [`ATTEMPTS`] requests with
//! exponential back-off between them; only the final failure is returned.

use std::time::Duration;

use domain::{BalanceSnapshot, BalanceSource, FetchError};
use serde::Deserialize;

/// Production GraphQL endpoint.
pub const RUNPOD_GRAPHQL_URL: &str = "https://api.runpod.io/graphql";

const MYSELF_QUERY: &str = "query MyselfBalance { myself { clientBalance currentSpendPerHr } }";

/// Requests per fetch, including the first.
const ATTEMPTS: u32 = 3;

/// Total bound on one request, connection included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// First back-off pause; later pauses double it.
const RETRY_BASE: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<MyselfData>,
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MyselfData {
    myself: Option<Myself>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Myself {
    client_balance: Option<f64>,
    current_spend_per_hr: Option<f64>,
}

/// `BalanceSource` adapter backed by the RunPod GraphQL API.
#[derive(Debug, Clone)]
pub struct RunpodClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    retry_base: Duration,
}

impl RunpodClient {
    /// Create a client for the production endpoint.
    ///
    /// Requests time out after 5 s; retries wait 1 s, then 2 s.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` when the HTTP client cannot be built
    /// (for example, no TLS backend).
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: RUNPOD_GRAPHQL_URL.to_owned(),
            retry_base: RETRY_BASE,
        })
    }

    /// Longest a failing [`fetch`](BalanceSource::fetch) can take: every
    /// attempt timing out plus every back-off pause.
    #[must_use]
    pub fn fetch_budget(&self) -> Duration {
        let pauses: Duration = (1..ATTEMPTS).map(|attempt| backoff(self.retry_base, attempt)).sum();
        REQUEST_TIMEOUT * ATTEMPTS + pauses
    }

    /// Point the client at another GraphQL endpoint.
    #[cfg_attr(not(test), expect(dead_code, reason = "only tests target a local endpoint"))]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the first back-off pause; later pauses double it.
    #[cfg_attr(not(test), expect(dead_code, reason = "only tests shorten the back-off"))]
    #[must_use]
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    async fn fetch_once(&self) -> Result<BalanceSnapshot, FetchError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "query": MYSELF_QUERY }))
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        let body = response.text().await.map_err(transport)?;
        parse_balance_response(&body)
    }
}

impl BalanceSource for RunpodClient {
    async fn fetch(&self) -> Result<BalanceSnapshot, FetchError> {
        with_backoff(ATTEMPTS, self.retry_base, || self.fetch_once()).await
    }
}

/// Pause after failed attempt number `attempt` (1-based).
fn backoff(base: Duration, attempt: u32) -> Duration {
    base * 2u32.pow(attempt - 1)
}

/// Run `op` up to `attempts` times, pausing [`backoff`] between failures.
/// Returns the first success or the last error.
async fn with_backoff<T, F, Fut>(attempts: u32, base: Duration, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                tracing::warn!(attempt, error = %e, "runpod.fetch.attempt_failed");
                if attempt >= attempts {
                    return Err(e);
                }
                tokio::time::sleep(backoff(base, attempt)).await;
            }
        }
    }
}

/// Decode a GraphQL response body into a snapshot.
///
/// An `errors` member fails the request even when `data` is present. Null
/// numeric fields read as zero.
///
/// # Errors
///
/// Returns `FetchError::Api` for a GraphQL error payload and
/// `FetchError::Malformed` when the body is not the expected shape.
pub fn parse_balance_response(body: &str) -> Result<BalanceSnapshot, FetchError> {
    let response: GraphQlResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed { reason: e.to_string() })?;
    if let Some(errors) = response.errors {
        return Err(FetchError::Api { reason: errors.to_string() });
    }
    let myself = response
        .data
        .and_then(|data| data.myself)
        .ok_or_else(|| FetchError::Malformed { reason: "missing data.myself".to_owned() })?;
    Ok(BalanceSnapshot {
        balance: myself.client_balance.unwrap_or(0.0),
        spend_per_hr: myself.current_spend_per_hr.unwrap_or(0.0),
    })
}

fn transport(e: reqwest::Error) -> FetchError {
    FetchError::Transport { reason: e.to_string() }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[expect(clippy::float_cmp, reason = "values are exact decimal literals")]
mod tests {
    use super::{RunpodClient, parse_balance_response, with_backoff};
    use domain::{BalanceSnapshot, BalanceSource as _, FetchError};
    use std::cell::{Cell, RefCell};
    use std::time::Duration;
    use tokio::time::Instant;

    fn outage() -> FetchError {
        FetchError::Transport { reason: "connection refused".to_owned() }
    }

    #[test]
    fn parses_balance_and_spend() {
        let snap = parse_balance_response(
            r#"{"data":{"myself":{"clientBalance":1234.5,"currentSpendPerHr":2.25}}}"#,
        )
        .unwrap();
        assert_eq!(snap.balance, 1234.5);
        assert_eq!(snap.spend_per_hr, 2.25);
    }

    #[test]
    fn negative_balance_is_kept() {
        let snap = parse_balance_response(
            r#"{"data":{"myself":{"clientBalance":-1800,"currentSpendPerHr":5}}}"#,
        )
        .unwrap();
        assert_eq!(snap.balance, -1800.0);
    }

    #[test]
    fn null_fields_read_as_zero() {
        let snap = parse_balance_response(
            r#"{"data":{"myself":{"clientBalance":null,"currentSpendPerHr":null}}}"#,
        )
        .unwrap();
        assert_eq!(snap.balance, 0.0);
        assert_eq!(snap.spend_per_hr, 0.0);
        assert!(!snap.is_spending());
    }

    #[test]
    fn errors_member_is_api_error() {
        let result = parse_balance_response(
            r#"{"errors":[{"message":"Unauthorized"}],"data":null}"#,
        );
        match result {
            Err(FetchError::Api { reason }) => assert!(reason.contains("Unauthorized")),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn missing_myself_is_malformed() {
        assert!(matches!(
            parse_balance_response(r#"{"data":{"myself":null}}"#),
            Err(FetchError::Malformed { .. })
        ));
        assert!(matches!(
            parse_balance_response("<html>bad gateway</html>"),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_after_retries() {
        // Port 9 (discard) on loopback refuses connections on a normal host.
        let client = RunpodClient::new("key")
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/graphql")
            .with_retry_base(Duration::ZERO);
        let result = client.fetch().await;
        assert!(matches!(result, Err(FetchError::Transport { .. })), "{result:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn retries_three_times_with_doubling_pauses() {
        let start = Instant::now();
        let calls = RefCell::new(vec![]);

        let result: Result<BalanceSnapshot, _> = with_backoff(3, Duration::from_secs(1), || {
            calls.borrow_mut().push(start.elapsed());
            async { Err(outage()) }
        })
        .await;

        assert!(matches!(result, Err(FetchError::Transport { .. })));
        // Attempts at 0 s, 1 s, 3 s; no pause after the last one.
        assert_eq!(
            *calls.borrow(),
            [Duration::ZERO, Duration::from_secs(1), Duration::from_secs(3)]
        );
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn success_stops_retrying() {
        let calls = Cell::new(0u32);

        let result = with_backoff(3, Duration::from_secs(1), || {
            calls.set(calls.get() + 1);
            let attempt = calls.get();
            async move {
                if attempt < 2 {
                    Err(outage())
                } else {
                    Ok(BalanceSnapshot { balance: 42.0, spend_per_hr: 1.0 })
                }
            }
        })
        .await;

        assert_eq!(result, Ok(BalanceSnapshot { balance: 42.0, spend_per_hr: 1.0 }));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn fetch_budget_covers_all_attempts_and_pauses() {
        let client = RunpodClient::new("key").unwrap();
        // 3 x 5 s requests plus 1 s and 2 s pauses.
        assert_eq!(client.fetch_budget(), Duration::from_secs(18));
        let fast = client.with_retry_base(Duration::ZERO);
        assert_eq!(fast.fetch_budget(), Duration::from_secs(15));
    }
}
