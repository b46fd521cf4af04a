use async_trait::async_trait;

use crate::{
    application::repos::{CampaignsRepo, CreateCampaignParams, RepoError},
    domain::entities::{CampaignRecord, ProductListingRow},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CampaignRow {
    id: i64,
    product_id: i64,
    story: String,
    picture: String,
}

impl From<CampaignRow> for CampaignRecord {
    fn from(row: CampaignRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            story: row.story,
            picture: row.picture,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MobileRow {
    id: i64,
    category: String,
    title: String,
    description: String,
    price: i64,
    story: String,
}

impl From<MobileRow> for ProductListingRow {
    fn from(row: MobileRow) -> Self {
        Self {
            id: row.id,
            category: row.category,
            title: row.title,
            description: row.description,
            price: row.price,
            story: row.story,
        }
    }
}

#[async_trait]
impl CampaignsRepo for PostgresRepositories {
    async fn list_campaigns(&self) -> Result<Vec<CampaignRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CampaignRow>(
            "SELECT id, product_id, story, picture FROM campaigns ORDER BY id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_campaign(&self, params: CreateCampaignParams) -> Result<i64, RepoError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO campaigns (product_id, story, picture) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(params.product_id)
        .bind(&params.story)
        .bind(&params.picture_path)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(id)
    }

    async fn list_for_mobile(&self) -> Result<Vec<ProductListingRow>, RepoError> {
        let rows = sqlx::query_as::<_, MobileRow>(
            "SELECT p.id, p.category, p.title, p.description, p.price, c.story \
             FROM campaigns c \
             JOIN products p ON p.id = c.product_id \
             ORDER BY c.id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
