use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

use crate::domain::{
    repositories::provisioning::ProvisioningService,
    value_objects::provisioning::{ProvisionedCredential, SubscriptionIntent},
};

/// Client for the VPN panel that owns credentials and server assignment.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

#[derive(Debug, Serialize)]
struct ExtendRequest {
    days: i32,
}

impl PanelClient {
    pub fn new(base_url: Url, token: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build provisioning http client")?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("provisioning base url cannot be a base"))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
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

        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "provisioning api request failed"
        );

        anyhow::bail!(
            "provisioning api request failed: {} (status {})",
            context,
            status
        );
    }

    async fn post_intent(
        &self,
        url: Url,
        intent: &SubscriptionIntent,
        context: &str,
    ) -> Result<ProvisionedCredential> {
        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(intent)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, context).await?;

        let credential: ProvisionedCredential = resp.json().await?;
        info!(
            order_id = %intent.order_id,
            generated_user_id = %credential.generated_user_id,
            context = %context,
            "provisioning: credential issued"
        );
        Ok(credential)
    }
}

#[async_trait]
impl ProvisioningService for PanelClient {
    async fn create_subscription(
        &self,
        intent: SubscriptionIntent,
    ) -> Result<ProvisionedCredential> {
        let url = self.endpoint(&["subscriptions"])?;
        self.post_intent(url, &intent, "create subscription").await
    }

    async fn migrate_subscription(
        &self,
        intent: SubscriptionIntent,
    ) -> Result<ProvisionedCredential> {
        let url = self.endpoint(&["subscriptions", "migrate"])?;
        self.post_intent(url, &intent, "migrate subscription").await
    }

    async fn extend_subscription(&self, subscription_id: Uuid, days: i32) -> Result<()> {
        let id = subscription_id.to_string();
        let resp = self
            .http
            .post(self.endpoint(&["subscriptions", id.as_str(), "extend"])?)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&ExtendRequest { days })
            .send()
            .await?;
        Self::ensure_success(resp, "extend subscription").await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_live_under_api_v1() {
        let client = PanelClient::new(
            Url::parse("https://panel.example.com/").unwrap(),
            "t".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let id = Uuid::nil().to_string();
        assert_eq!(
            client
                .endpoint(&["subscriptions", id.as_str(), "extend"])
                .unwrap()
                .as_str(),
            format!("https://panel.example.com/api/v1/subscriptions/{id}/extend")
        );
    }
}
