use std::time::Duration;

use reqwest::header::USER_AGENT;

/// Blocking GET seam so the remote provider can be exercised without a network.
pub trait HttpClientPort: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug, Default)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub rate_limit_remaining: Option<u64>,
    /// Unix seconds at which the rate limit window resets.
    pub rate_limit_reset: Option<i64>,
}

impl HttpGetResult {
    pub fn ok(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            bytes: bytes.into(),
            ..Default::default()
        }
    }
}

pub struct ReqwestHttp {
    client: reqwest::blocking::Client,
    user_agent: String,
}

impl ReqwestHttp {
    /// `timeout` bounds each request from connect until the body is fully read.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

impl HttpClientPort for ReqwestHttp {
    fn get(&self, url: &str) -> Result<HttpGetResult, String> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    format!("request timed out: {}", e)
                } else {
                    e.to_string()
                }
            })?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().map_err(|e| e.to_string())?.to_vec();

        let header_num = |name: &str| -> Option<i64> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
        };

        Ok(HttpGetResult {
            status,
            bytes,
            rate_limit_remaining: header_num("x-ratelimit-remaining").map(|n| n.max(0) as u64),
            rate_limit_reset: header_num("x-ratelimit-reset"),
        })
    }
}
