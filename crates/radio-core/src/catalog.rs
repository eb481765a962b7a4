//! Station catalog: the wire envelope served by the station directory, the
//! immutable snapshot the rest of the program reads, and the fetcher that
//! turns one into the other.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

/// One radio channel as listed by the directory. Only the stream url is
/// required; a missing or null name/title shows as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    #[serde(rename = "server_name", default, deserialize_with = "null_as_empty")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(rename = "http_server_url")]
    pub stream_url: String,
}

impl Station {
    pub fn new(
        display_name: impl Into<String>,
        title: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            title: title.into(),
            stream_url: stream_url.into(),
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Ordered, immutable station list. Cloning shares the underlying slice, so
/// a refresh replaces the whole snapshot instead of editing it in place.
pub type Catalog = Arc<[Station]>;

pub fn empty_catalog() -> Catalog {
    Arc::from(Vec::new())
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<Station>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("could not connect to station directory: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("station directory answered {0}")]
    Status(reqwest::StatusCode),
    #[error("station directory request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("malformed station directory response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn is_connect(&self) -> bool {
        matches!(self, CatalogError::Connect(_))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            CatalogError::Connect(e)
        } else {
            CatalogError::Transport(e)
        }
    }
}

/// Decode the directory's `{ "data": [...] }` envelope.
pub fn parse_catalog(body: &str) -> Result<Catalog, CatalogError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    Ok(Arc::from(envelope.data))
}

/// Anything that can produce a fresh catalog. The refresh task only needs
/// this much, which keeps it testable without a network.
pub trait CatalogSource: Send + Sync + 'static {
    fn fetch(&self) -> impl std::future::Future<Output = Catalog> + Send;
}

/// HTTP client for the station directory.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    client: reqwest::Client,
    url: String,
}

impl CatalogFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("craft-radio/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One GET against the directory, surfacing every failure.
    pub async fn try_fetch(&self) -> Result<Catalog, CatalogError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }
        let body = resp.text().await?;
        let catalog = parse_catalog(&body)?;
        debug!("catalog: fetched {} stations from {}", catalog.len(), self.url);
        Ok(catalog)
    }

    /// Like [`try_fetch`](Self::try_fetch), but any failure degrades to an
    /// empty catalog after being logged.
    pub async fn fetch(&self) -> Catalog {
        match self.try_fetch().await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("catalog: error loading stations: {}", e);
                empty_catalog()
            }
        }
    }
}

impl CatalogSource for CatalogFetcher {
    fn fetch(&self) -> impl std::future::Future<Output = Catalog> + Send {
        CatalogFetcher::fetch(self)
    }
}
