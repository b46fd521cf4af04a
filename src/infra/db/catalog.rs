use async_trait::async_trait;

use crate::{
    application::repos::{ImageIndex, ProductCatalog, RepoError, VariantIndex},
    domain::entities::{ImageRecord, VariantRow},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ImageRow {
    product_id: i64,
    url: String,
    is_main: bool,
}

#[derive(sqlx::FromRow)]
struct VariantDbRow {
    product_id: i64,
    color_code: String,
    color_name: String,
    size: String,
    stock: i64,
}

#[async_trait]
impl ProductCatalog for PostgresRepositories {
    async fn exists(&self, product_id: i64) -> Result<bool, RepoError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(exists)
    }
}

#[async_trait]
impl ImageIndex for PostgresRepositories {
    async fn fetch(&self, product_ids: &[i64]) -> Result<Vec<ImageRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ImageRow>(
            "SELECT product_id, url, is_main \
             FROM product_images \
             WHERE product_id = ANY($1) \
             ORDER BY id",
        )
        .bind(product_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ImageRecord {
                product_id: row.product_id,
                url: row.url,
                is_main: row.is_main,
            })
            .collect())
    }
}

#[async_trait]
impl VariantIndex for PostgresRepositories {
    async fn fetch(&self, product_ids: &[i64]) -> Result<Vec<VariantRow>, RepoError> {
        let rows = sqlx::query_as::<_, VariantDbRow>(
            "SELECT v.product_id, v.color_code, col.name AS color_name, v.size, v.stock \
             FROM product_variants v \
             JOIN colors col ON col.code = v.color_code \
             WHERE v.product_id = ANY($1) \
             ORDER BY v.id",
        )
        .bind(product_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| VariantRow {
                product_id: row.product_id,
                color_code: row.color_code,
                color_name: row.color_name,
                size: row.size,
                stock: row.stock,
            })
            .collect())
    }
}
