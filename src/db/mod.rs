pub mod error;
pub mod fauna;
pub mod memory;
pub mod query;
pub mod schema;
pub mod value;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use error::{DbError, DbErrorKind};
pub use query::Expr;
pub use value::{Ref, Value};

use crate::config::{Backend, Config};
use fauna::FaunaClient;
use memory::MemoryStore;

/// Anything that can run a query expression.
///
/// Handlers only ever see this trait, so tests swap the network client for
/// [`MemoryStore`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, expr: &Expr) -> Result<Value, DbError>;

    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}

pub fn create_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.backend {
        Backend::Fauna => {
            let secret = config
                .fauna_secret
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Missing required env var: FAUNA_SECRET"))?;
            let client = FaunaClient::new(
                &config.fauna_endpoint,
                secret,
                Duration::from_secs(config.fauna_timeout_secs),
            )?;
            Ok(Arc::new(client))
        }
        Backend::Memory => {
            let store = MemoryStore::provisioned()?;
            tracing::warn!("Using the in-memory store, data is lost on restart");
            Ok(Arc::new(store))
        }
    }
}
