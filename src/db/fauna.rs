use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as Json;

use super::error::DbError;
use super::query::Expr;
use super::value::Value;
use super::DocumentStore;
use crate::config::Secret;

/// Client for Fauna's FQL v4 HTTP endpoint.
pub struct FaunaClient {
    client: Client,
    endpoint: String,
    secret: Secret,
}

impl FaunaClient {
    pub fn new(endpoint: &str, secret: Secret, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            secret,
        })
    }
}

#[async_trait]
impl DocumentStore for FaunaClient {
    async fn query(&self, expr: &Expr) -> Result<Value, DbError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.secret.expose())
            .header("X-FaunaDB-API-Version", "4")
            .json(&expr.to_wire())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: Json = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => Json::Null,
            Err(e) => return Err(DbError::decode(format!("response is not JSON: {e}"))),
        };

        if !status.is_success() {
            let err = DbError::from_response(status.as_u16(), &body);
            tracing::debug!("Fauna error {}: {}", status, err);
            return Err(err);
        }

        let resource = match body {
            Json::Object(mut fields) => fields.remove("resource"),
            _ => None,
        }
        .ok_or_else(|| DbError::decode("response has no `resource` field"))?;

        Value::from_wire(resource)
    }

    fn backend(&self) -> &'static str {
        "fauna"
    }
}
