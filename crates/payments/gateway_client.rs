use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::domain::{
    repositories::payment_gateway::PaymentGateway,
    value_objects::enums::payment_statuses::PaymentStatus,
};

/// Minimal payment gateway client built on reqwest. Only the status endpoint is used;
/// payment links are issued by the chat flows.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GatewayPayment {
    id: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorEnvelope {
    error: GatewayErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetails {
    code: Option<String>,
    message: Option<String>,
}

impl GatewayClient {
    pub fn new(base_url: Url, api_key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build payment gateway http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn payment_url(&self, gateway_ref: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("payment gateway base url cannot be a base"))?
            .pop_if_empty()
            .extend(["v1", "payments", gateway_ref]);
        Ok(url)
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (gateway_error_code, gateway_error_message) =
            match serde_json::from_str::<GatewayErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error.code, envelope.error.message),
                Err(_) => (None, None),
            };

        error!(
            status = %status,
            gateway_error_code = ?gateway_error_code,
            gateway_error_message = ?gateway_error_message,
            response_body = %body,
            context = %context,
            "payment gateway request failed"
        );

        anyhow::bail!(
            "payment gateway request failed: {} (status {})",
            context,
            status
        );
    }

    pub async fn retrieve_status(&self, gateway_ref: &str) -> Result<PaymentStatus> {
        let resp = self
            .http
            .get(self.payment_url(gateway_ref)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve payment").await?;

        let payment: GatewayPayment = resp.json().await?;
        debug!(
            gateway_ref = %gateway_ref,
            gateway_payment_id = ?payment.id,
            raw_status = %payment.status,
            "payment gateway status received"
        );

        // Unrecognised values surface as an error instead of being read as "pending".
        Ok(payment.status.parse::<PaymentStatus>()?)
    }
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn check_status(&self, gateway_ref: String) -> Result<PaymentStatus> {
        self.retrieve_status(&gateway_ref).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GatewayClient {
        GatewayClient::new(
            Url::parse(base).unwrap(),
            "key".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn payment_url_appends_escaped_reference() {
        let url = client("https://pay.example.com/api/").payment_url("ab/c").unwrap();
        assert_eq!(url.as_str(), "https://pay.example.com/api/v1/payments/ab%2Fc");
    }

    #[test]
    fn payment_url_without_trailing_slash() {
        let url = client("https://pay.example.com").payment_url("p-1").unwrap();
        assert_eq!(url.as_str(), "https://pay.example.com/v1/payments/p-1");
    }
}
