//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{CampaignRecord, ImageRecord, ProductListingRow, VariantRow};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCampaignParams {
    pub product_id: i64,
    pub story: String,
    pub picture_path: String,
}

/// Campaign records and the base rows for the mobile listing.
#[async_trait]
pub trait CampaignsRepo: Send + Sync {
    /// Full campaign listing, each record joined with its product reference.
    async fn list_campaigns(&self) -> Result<Vec<CampaignRecord>, RepoError>;

    /// Persist a new campaign and return its identifier.
    async fn create_campaign(&self, params: CreateCampaignParams) -> Result<i64, RepoError>;

    /// Base product rows backing the mobile listing variant.
    async fn list_for_mobile(&self) -> Result<Vec<ProductListingRow>, RepoError>;
}

/// Existence checks against the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn exists(&self, product_id: i64) -> Result<bool, RepoError>;
}

/// Per-product image metadata for a batch of product ids.
#[async_trait]
pub trait ImageIndex: Send + Sync {
    async fn fetch(&self, product_ids: &[i64]) -> Result<Vec<ImageRecord>, RepoError>;
}

/// Per-product variant metadata for a batch of product ids.
#[async_trait]
pub trait VariantIndex: Send + Sync {
    async fn fetch(&self, product_ids: &[i64]) -> Result<Vec<VariantRow>, RepoError>;
}
