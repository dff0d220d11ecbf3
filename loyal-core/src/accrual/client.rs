use super::{AccrualError, AccrualReport, AccrualSource, DEFAULT_RETRY_AFTER};
use crate::config::AccrualConfig;
use async_trait::async_trait;
use loyal_sdk::objects::AccrualOrderResponse;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use std::time::Duration;
use tracing::debug;

/// HTTP client for `GET {base_url}/api/orders/{number}`.
#[derive(Debug, Clone)]
pub struct AccrualClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AccrualClient {
    pub fn new(config: &AccrualConfig) -> Result<Self, AccrualError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http_client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn order_url(&self, number: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, number)
    }
}

#[async_trait]
impl AccrualSource for AccrualClient {
    async fn order_status(&self, number: &str) -> Result<AccrualReport, AccrualError> {
        let response = self.http_client.get(self.order_url(number)).send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;
        debug!(order_number = number, status = status.as_u16(), "Accrual response");
        classify(status, retry_after.as_deref(), &body)
    }
}

/// Map an accrual HTTP response onto a report or a typed error.
fn classify(
    status: StatusCode,
    retry_after: Option<&str>,
    body: &[u8],
) -> Result<AccrualReport, AccrualError> {
    match status {
        StatusCode::OK => {
            let response: AccrualOrderResponse = serde_json::from_slice(body)?;
            Ok(AccrualReport {
                number: response.order,
                status: response.status.into(),
                accrual: response.accrual,
            })
        }
        StatusCode::NO_CONTENT => Err(AccrualError::OrderNotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(AccrualError::Throttled {
            retry_after: parse_retry_after(retry_after),
        }),
        StatusCode::INTERNAL_SERVER_ERROR => Err(AccrualError::Internal),
        other => Err(AccrualError::UnexpectedStatus(other.as_u16())),
    }
}

/// `Retry-After` in delta-seconds form.
fn parse_retry_after(value: Option<&str>) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
