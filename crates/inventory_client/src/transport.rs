//! Remote product service seam and its HTTP implementation.

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::ProductId,
    error::ServerErrorBody,
    protocol::{PageResult, Product, ProductPayload},
};
use thiserror::Error;
use tracing::debug;

use crate::{query::QueryState, session::SessionContext};

/// Raw failure of a remote call, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    #[error("no response from product service: {0}")]
    Network(String),
    #[error("product service answered with status {status}")]
    Status {
        status: u16,
        body: Option<ServerErrorBody>,
    },
    #[error("unreadable response from product service: {0}")]
    Decode(String),
}

impl ApiFailure {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiFailure::Status {
            status,
            body: Some(ServerErrorBody {
                status: Some(status),
                message: Some(message.into()),
                ..ServerErrorBody::default()
            }),
        }
    }
}

#[async_trait]
pub trait ProductApi: Send + Sync {
    async fn list(&self, query: &QueryState) -> Result<PageResult, ApiFailure>;
    async fn get(&self, id: ProductId) -> Result<Product, ApiFailure>;
    async fn create(&self, payload: &ProductPayload) -> Result<Product, ApiFailure>;
    async fn update(&self, id: ProductId, payload: &ProductPayload)
        -> Result<Product, ApiFailure>;
    async fn delete(&self, id: ProductId) -> Result<(), ApiFailure>;
    async fn check_stock(&self, id: ProductId, quantity: u32) -> Result<bool, ApiFailure>;
}

/// `ProductApi` over the service's REST endpoints.
pub struct HttpProductApi {
    http: Client,
    server_url: String,
    session: Arc<dyn SessionContext>,
}

impl HttpProductApi {
    pub fn new(
        server_url: &str,
        request_timeout: Duration,
        session: Arc<dyn SessionContext>,
    ) -> anyhow::Result<Self> {
        let server_url = server_url.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&server_url)
            .with_context(|| format!("invalid product service url: {server_url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!("server_url must start with http:// or https://"));
        }

        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            server_url,
            session,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn products_url(&self) -> String {
        format!("{}/products", self.server_url)
    }

    fn product_url(&self, id: ProductId) -> String {
        format!("{}/products/{}", self.server_url, id.0)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiFailure> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(transport_failure)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(raw) => serde_json::from_str::<ServerErrorBody>(&raw).ok(),
            Err(err) => {
                debug!(status = status.as_u16(), "http: failed to read error body: {err}");
                None
            }
        };
        Err(ApiFailure::Status {
            status: status.as_u16(),
            body,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiFailure> {
    let bytes = response.bytes().await.map_err(transport_failure)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiFailure::Decode(err.to_string()))
}

fn transport_failure(err: reqwest::Error) -> ApiFailure {
    if err.is_decode() {
        ApiFailure::Decode(err.to_string())
    } else {
        ApiFailure::Network(err.to_string())
    }
}

#[async_trait]
impl ProductApi for HttpProductApi {
    async fn list(&self, query: &QueryState) -> Result<PageResult, ApiFailure> {
        let request = self.http.get(self.products_url()).query(&query.to_params());
        decode(self.send(request).await?).await
    }

    async fn get(&self, id: ProductId) -> Result<Product, ApiFailure> {
        decode(self.send(self.http.get(self.product_url(id))).await?).await
    }

    async fn create(&self, payload: &ProductPayload) -> Result<Product, ApiFailure> {
        let request = self.http.post(self.products_url()).json(payload);
        decode(self.send(request).await?).await
    }

    async fn update(
        &self,
        id: ProductId,
        payload: &ProductPayload,
    ) -> Result<Product, ApiFailure> {
        let request = self.http.put(self.product_url(id)).json(payload);
        decode(self.send(request).await?).await
    }

    async fn delete(&self, id: ProductId) -> Result<(), ApiFailure> {
        self.send(self.http.delete(self.product_url(id))).await?;
        Ok(())
    }

    async fn check_stock(&self, id: ProductId, quantity: u32) -> Result<bool, ApiFailure> {
        let request = self
            .http
            .get(format!("{}/stock", self.product_url(id)))
            .query(&[("quantity", quantity)]);
        decode(self.send(request).await?).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
