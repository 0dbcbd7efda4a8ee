//! HTTP gateway talking to a magboard server.

use magboard_core::presence::PresenceRecord;
use magboard_core::shapes::Element;
use magboard_core::storage::{BoxFuture, Gateway, GatewayError, GatewayResult};
use magboard_core::sync::{ElementsEnvelope, PresenceEnvelope, SaveAck};
use magboard_core::wire::encode_elements;
use reqwest::StatusCode;
use serde_json::json;

const WHITEBOARD_PATH: &str = "/api/whiteboard-data";
const PRESENCE_PATH: &str = "/api/presence";

fn transport(e: reqwest::Error) -> GatewayError {
    if e.is_decode() {
        GatewayError::Serialization(e.to_string())
    } else {
        GatewayError::Transport(e.to_string())
    }
}

/// [`Gateway`] over the server's JSON endpoints.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    /// * `base_url` - Server root, e.g. `http://localhost:3030`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_elements(&self, campaign: &str) -> GatewayResult<Vec<Element>> {
        let response = self
            .client
            .get(self.url(WHITEBOARD_PATH))
            .query(&[("campaign", campaign)])
            .send()
            .await
            .map_err(transport)?;

        // Nothing saved yet.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let envelope: ElementsEnvelope = Self::parse_response(response).await?;
        Ok(envelope.elements)
    }

    async fn post_elements(&self, campaign: &str, elements: &[Element]) -> GatewayResult<i64> {
        let body = json!({ "elements": encode_elements(elements) });
        let response = self
            .client
            .post(self.url(WHITEBOARD_PATH))
            .query(&[("campaign", campaign)])
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let ack: SaveAck = Self::parse_response(response).await?;
        Ok(ack.timestamp)
    }

    async fn get_presence(&self, campaign: &str) -> GatewayResult<Vec<PresenceRecord>> {
        let response = self
            .client
            .get(self.url(PRESENCE_PATH))
            .query(&[("campaign", campaign)])
            .send()
            .await
            .map_err(transport)?;

        let envelope: PresenceEnvelope = Self::parse_response(response).await?;
        Ok(envelope.users)
    }

    async fn post_presence(&self, campaign: &str, record: &PresenceRecord) -> GatewayResult<()> {
        let response = self
            .client
            .post(self.url(PRESENCE_PATH))
            .query(&[("campaign", campaign)])
            .json(record)
            .send()
            .await
            .map_err(transport)?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Turn a non-2xx response into [`GatewayError::Http`] with the body text.
    async fn ensure_success(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> GatewayResult<T> {
        let response = Self::ensure_success(response).await?;
        response.json::<T>().await.map_err(transport)
    }
}

impl Gateway for HttpGateway {
    fn fetch_elements<'a>(&'a self, campaign: &'a str) -> BoxFuture<'a, GatewayResult<Vec<Element>>> {
        Box::pin(self.get_elements(campaign))
    }

    fn save_elements<'a>(
        &'a self,
        campaign: &'a str,
        elements: &'a [Element],
    ) -> BoxFuture<'a, GatewayResult<i64>> {
        Box::pin(self.post_elements(campaign, elements))
    }

    fn fetch_presence<'a>(
        &'a self,
        campaign: &'a str,
    ) -> BoxFuture<'a, GatewayResult<Vec<PresenceRecord>>> {
        Box::pin(self.get_presence(campaign))
    }

    fn publish_presence<'a>(
        &'a self,
        campaign: &'a str,
        record: &'a PresenceRecord,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(self.post_presence(campaign, record))
    }
}
