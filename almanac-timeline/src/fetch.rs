//! Page fetching port and its HTTP implementation.

use almanac_types::DiaryPage;
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Page {page} returned status {status}")]
    Status { page: u32, status: u16 },

    #[error("Page {page} is not a valid diary page: {source}")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of diary pages for the timeline
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<DiaryPage, FetchError>;
}

/// Fetches `GET {base}/api/diary/{page}.json`
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    base_url: String,
}

impl HttpPageFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}/api/diary/{}.json", self.base_url, page)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, page: u32) -> Result<DiaryPage, FetchError> {
        let url = self.page_url(page);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { page, source })
    }
}
