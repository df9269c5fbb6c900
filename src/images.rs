//! Profile pictures.
//!
//! Images are opaque: the store keeps the bytes and the media type the
//! client declared, and never decodes or checks them.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    pub content_type: String,
    pub data: Bytes,
}

impl Image {
    /// The image inlined as a `data:` URL.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.data))
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores `image` as `user_id`'s picture, replacing any previous one.
    async fn put(&self, user_id: u64, image: Image) -> Result<(), ImageError>;

    async fn get(&self, user_id: u64) -> Result<Option<Image>, ImageError>;

    async fn remove(&self, user_id: u64) -> Result<(), ImageError>;
}

#[derive(Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<u64, Image>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn put(&self, user_id: u64, image: Image) -> Result<(), ImageError> {
        self.images.write().insert(user_id, image);
        Ok(())
    }

    async fn get(&self, user_id: u64) -> Result<Option<Image>, ImageError> {
        Ok(self.images.read().get(&user_id).cloned())
    }

    async fn remove(&self, user_id: u64) -> Result<(), ImageError> {
        self.images.write().remove(&user_id);
        Ok(())
    }
}
