use crate::catalog::{CatalogItem, ItemKind};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to download file: {0}")]
    Status(u16),
    #[error("Failed to download file: {0}")]
    Transport(String),
}

/// Source of audio bytes for re-upload.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AudioFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A message ready to be posted: caption text plus an optional file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub url: String,
    pub kind: ItemKind,
    pub content: String,
    pub attachment: Option<DeliveredFile>,
}

impl Delivery {
    pub fn link(item: &CatalogItem) -> Self {
        Self {
            url: item.url.clone(),
            kind: ItemKind::Link,
            content: format!("{} отправил ссылку: {}", item.author_name, item.url),
            attachment: None,
        }
    }

    pub fn audio(item: &CatalogItem, bytes: Vec<u8>) -> Self {
        Self {
            url: item.url.clone(),
            kind: ItemKind::AudioFile,
            content: format!("{} отправил файл:", item.author_name),
            attachment: Some(DeliveredFile {
                filename: filename_from_url(&item.url),
                bytes,
            }),
        }
    }

    /// Builds the message for `item`, downloading the file for audio items.
    pub async fn prepare(
        item: &CatalogItem,
        fetcher: &dyn AudioFetcher,
    ) -> Result<Self, FetchError> {
        match item.kind {
            ItemKind::Link => Ok(Self::link(item)),
            ItemKind::AudioFile => {
                let bytes = fetcher.fetch(&item.url).await?;
                Ok(Self::audio(item, bytes))
            }
        }
    }

    fn create_attachment(&self) -> Option<serenity::CreateAttachment> {
        self.attachment
            .as_ref()
            .map(|file| serenity::CreateAttachment::bytes(file.bytes.clone(), file.filename.clone()))
    }

    /// Reply to the requester in the command's channel.
    pub fn to_reply(&self) -> poise::CreateReply {
        let reply = poise::CreateReply::default().content(self.content.clone());
        match self.create_attachment() {
            Some(file) => reply.attachment(file),
            None => reply,
        }
    }

    pub fn to_message(&self) -> serenity::CreateMessage {
        let message = serenity::CreateMessage::new().content(self.content.clone());
        match self.create_attachment() {
            Some(file) => message.add_file(file),
            None => message,
        }
    }
}

/// Last path segment of `url` with any query string removed.
pub fn filename_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("track")
        .to_string()
}

/// The most recent successful delivery, kept for forwarding.
#[derive(Default)]
pub struct LastDelivery {
    slot: Mutex<Option<Delivery>>,
}

impl LastDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, delivery: Delivery) {
        match self.slot.lock() {
            Ok(mut guard) => *guard = Some(delivery),
            Err(poisoned) => *poisoned.into_inner() = Some(delivery),
        }
    }

    pub fn get(&self) -> Option<Delivery> {
        match self.slot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
