//! Campaign aggregation service.
//!
//! Owns the three listing operations: the cache-aside campaign listing read,
//! campaign creation with write-triggered invalidation, and the fan-out merge
//! for the mobile listing. The service holds no locks; the only shared
//! mutable state is the external cache store, and two concurrent misses may
//! both recompute and both write the same idempotent payload.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tokio::try_join;
use tracing::{debug, warn};

use crate::application::error::AppError;
use crate::application::repos::{
    CampaignsRepo, CreateCampaignParams, ImageIndex, ProductCatalog, VariantIndex,
};
use crate::cache::{CacheStore, ListingKey};
use crate::domain::entities::{
    CampaignRecord, Color, EnrichedProduct, ImageRecord, ProductListingRow, VariantRecord,
    VariantRow,
};

const SOURCE: &str = "application::campaigns::CampaignService";

/// Fixed display title carried on the mobile listing envelope.
pub const MOBILE_LISTING_TITLE: &str = "熱門商品";

/// How the variant merge treats a product with no variant rows.
///
/// The image merge always defaults missing entries to empty values; variants
/// historically performed an unguarded lookup. `Lax` mirrors the image
/// behavior (empty bundle plus a warning), `Strict` fails that product's
/// listing with a partial-data error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    #[default]
    Lax,
    Strict,
}

/// Input for a campaign creation.
#[derive(Debug, Clone)]
pub struct CreateCampaign {
    pub product_id: i64,
    pub story: String,
    /// Stored path of the uploaded picture; `None` when no file arrived.
    pub picture_path: Option<String>,
}

/// Envelope returned by the mobile listing operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobileListing {
    pub title: &'static str,
    pub products: Vec<EnrichedProduct>,
}

/// Per-product image metadata produced by [`group_images`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageGroup {
    pub main_image: String,
    pub images: Vec<String>,
}

/// Per-product variant metadata produced by [`group_variants`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantGroup {
    pub variants: Vec<VariantRecord>,
    pub sizes: BTreeSet<String>,
    pub colors: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct CampaignService {
    campaigns: Arc<dyn CampaignsRepo>,
    catalog: Arc<dyn ProductCatalog>,
    images: Arc<dyn ImageIndex>,
    variants: Arc<dyn VariantIndex>,
    cache: Arc<dyn CacheStore>,
    listing_key: ListingKey,
    merge_mode: MergeMode,
}

impl CampaignService {
    pub fn new(
        campaigns: Arc<dyn CampaignsRepo>,
        catalog: Arc<dyn ProductCatalog>,
        images: Arc<dyn ImageIndex>,
        variants: Arc<dyn VariantIndex>,
        cache: Arc<dyn CacheStore>,
        listing_key: ListingKey,
        merge_mode: MergeMode,
    ) -> Self {
        Self {
            campaigns,
            catalog,
            images,
            variants,
            cache,
            listing_key,
            merge_mode,
        }
    }

    /// Cache-aside campaign listing read.
    ///
    /// A present cache entry must deserialize as a full listing; a corrupt
    /// entry surfaces as an error rather than silently recomputing. A miss
    /// fetches from the repository, writes the serialized result back with no
    /// expiry, and returns it.
    pub async fn list_campaigns(&self) -> Result<Vec<CampaignRecord>, AppError> {
        let cached = self
            .cache
            .get(self.listing_key.as_str())
            .await
            .map_err(AppError::cache)?;

        if let Some(raw) = cached {
            counter!("vetrina_listing_cache_hit_total").increment(1);
            let campaigns: Vec<CampaignRecord> =
                serde_json::from_str(&raw).map_err(|err| AppError::cached_listing(err.to_string()))?;
            debug!(
                target: "vetrina::campaigns",
                count = campaigns.len(),
                "campaign listing served from cache"
            );
            return Ok(campaigns);
        }

        counter!("vetrina_listing_cache_miss_total").increment(1);
        let campaigns = self
            .campaigns
            .list_campaigns()
            .await
            .map_err(AppError::repo("campaign repository"))?;

        let payload = serde_json::to_string(&campaigns)
            .map_err(|err| AppError::unexpected(format!("listing serialization failed: {err}")))?;
        self.cache
            .set(self.listing_key.as_str(), payload)
            .await
            .map_err(AppError::cache)?;

        debug!(
            target: "vetrina::campaigns",
            count = campaigns.len(),
            "campaign listing recomputed and cached"
        );
        Ok(campaigns)
    }

    /// Existence gate: the caller must check this before `create_campaign`
    /// and reject the request when the product is absent.
    pub async fn product_exists(&self, product_id: i64) -> Result<bool, AppError> {
        self.catalog
            .exists(product_id)
            .await
            .map_err(AppError::repo("product catalog"))
    }

    /// Create a campaign and evict the cached listing.
    ///
    /// The picture requirement is validated before anything else so a doomed
    /// write never evicts a valid cache entry. Eviction is issued only after
    /// the repository acknowledges the write; a reader that recomputed from
    /// pre-write state can still race its `set` past this `del`, which is an
    /// accepted residual window.
    pub async fn create_campaign(&self, input: CreateCampaign) -> Result<i64, AppError> {
        let picture_path = input
            .picture_path
            .ok_or_else(|| AppError::validation("no picture"))?;

        let campaign_id = self
            .campaigns
            .create_campaign(CreateCampaignParams {
                product_id: input.product_id,
                story: input.story,
                picture_path,
            })
            .await
            .map_err(AppError::repo("campaign repository"))?;

        self.cache
            .del(self.listing_key.as_str())
            .await
            .map_err(AppError::cache)?;
        counter!("vetrina_listing_cache_evict_total").increment(1);

        debug!(
            target: "vetrina::campaigns",
            campaign_id,
            "campaign created, listing cache evicted"
        );
        Ok(campaign_id)
    }

    /// Mobile listing: base rows joined with image and variant metadata.
    ///
    /// This path never touches the cache. The two index fetches are issued
    /// together and awaited together; neither depends on the other's result.
    pub async fn list_for_mobile(&self) -> Result<MobileListing, AppError> {
        let rows = self
            .campaigns
            .list_for_mobile()
            .await
            .map_err(AppError::repo("campaign repository"))?;

        let product_ids = distinct_product_ids(&rows);

        let (image_rows, variant_rows) = try_join!(
            async {
                self.images
                    .fetch(&product_ids)
                    .await
                    .map_err(AppError::repo("image index"))
            },
            async {
                self.variants
                    .fetch(&product_ids)
                    .await
                    .map_err(AppError::repo("variant index"))
            },
        )?;

        let image_groups = group_images(image_rows);
        let variant_groups = group_variants(variant_rows);

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let product = attach_images(row, &image_groups);
            let product = attach_variants(product, &variant_groups, self.merge_mode)?;
            products.push(product);
        }

        Ok(MobileListing {
            title: MOBILE_LISTING_TITLE,
            products,
        })
    }
}

/// Distinct product ids in first-appearance order.
fn distinct_product_ids(rows: &[ProductListingRow]) -> Vec<i64> {
    let mut seen = BTreeSet::new();
    rows.iter()
        .map(|row| row.id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Group image rows by product id.
///
/// The last row flagged as main wins the `main_image` slot; every url joins
/// the `images` sequence in arrival order.
pub fn group_images(rows: Vec<ImageRecord>) -> HashMap<i64, ImageGroup> {
    let mut groups: HashMap<i64, ImageGroup> = HashMap::new();
    for row in rows {
        let group = groups.entry(row.product_id).or_default();
        if row.is_main {
            group.main_image = row.url.clone();
        }
        group.images.push(row.url);
    }
    groups
}

/// Group variant rows by product id, deriving the size set and the
/// color-code to name mapping. BTree containers keep the derived sequences
/// deterministic.
pub fn group_variants(rows: Vec<VariantRow>) -> HashMap<i64, VariantGroup> {
    let mut groups: HashMap<i64, VariantGroup> = HashMap::new();
    for row in rows {
        let group = groups.entry(row.product_id).or_default();
        group.variants.push(VariantRecord {
            product_id: row.product_id,
            color_code: row.color_code.clone(),
            size: row.size.clone(),
            stock: row.stock,
        });
        group.sizes.insert(row.size);
        group.colors.insert(row.color_code, row.color_name);
    }
    groups
}

/// Merge step A: attach image metadata, defaulting to an empty main image
/// and an empty sequence when the product has no image rows.
fn attach_images(row: ProductListingRow, groups: &HashMap<i64, ImageGroup>) -> EnrichedProduct {
    let group = groups.get(&row.id).cloned().unwrap_or_default();
    EnrichedProduct {
        id: row.id,
        category: row.category,
        title: row.title,
        description: row.description,
        price: row.price,
        story: row.story,
        main_image: group.main_image,
        images: group.images,
        variants: Vec::new(),
        sizes: Vec::new(),
        colors: Vec::new(),
    }
}

/// Merge step B: attach the variant bundle, materializing the size set as a
/// sequence and the color map as `{code, name}` pairs.
fn attach_variants(
    mut product: EnrichedProduct,
    groups: &HashMap<i64, VariantGroup>,
    mode: MergeMode,
) -> Result<EnrichedProduct, AppError> {
    let group = match groups.get(&product.id) {
        Some(group) => group.clone(),
        None => match mode {
            MergeMode::Lax => {
                warn!(
                    target: "vetrina::campaigns",
                    source = SOURCE,
                    product_id = product.id,
                    "product has no variant rows, defaulting to empty bundle"
                );
                VariantGroup::default()
            }
            MergeMode::Strict => {
                return Err(AppError::PartialData {
                    product_id: product.id,
                });
            }
        },
    };

    product.variants = group.variants;
    product.sizes = group.sizes.into_iter().collect();
    product.colors = group
        .colors
        .into_iter()
        .map(|(code, name)| Color { code, name })
        .collect();
    Ok(product)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::RepoError;
    use crate::cache::CacheError;
    use crate::domain::error::DomainError;

    #[derive(Default)]
    struct FakeCampaignsRepo {
        campaigns: Mutex<Vec<CampaignRecord>>,
        mobile_rows: Vec<ProductListingRow>,
        list_calls: AtomicUsize,
        create_calls: AtomicUsize,
    }

    #[async_trait]
    impl CampaignsRepo for FakeCampaignsRepo {
        async fn list_campaigns(&self) -> Result<Vec<CampaignRecord>, RepoError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.campaigns.lock().unwrap().clone())
        }

        async fn create_campaign(&self, params: CreateCampaignParams) -> Result<i64, RepoError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let mut campaigns = self.campaigns.lock().unwrap();
            let id = campaigns.len() as i64 + 1;
            campaigns.push(CampaignRecord {
                id,
                product_id: params.product_id,
                story: params.story,
                picture: params.picture_path,
            });
            Ok(id)
        }

        async fn list_for_mobile(&self) -> Result<Vec<ProductListingRow>, RepoError> {
            Ok(self.mobile_rows.clone())
        }
    }

    struct FakeCatalog {
        known: Vec<i64>,
    }

    #[async_trait]
    impl ProductCatalog for FakeCatalog {
        async fn exists(&self, product_id: i64) -> Result<bool, RepoError> {
            Ok(self.known.contains(&product_id))
        }
    }

    #[derive(Default)]
    struct FakeImageIndex {
        rows: Vec<ImageRecord>,
    }

    #[async_trait]
    impl ImageIndex for FakeImageIndex {
        async fn fetch(&self, product_ids: &[i64]) -> Result<Vec<ImageRecord>, RepoError> {
            Ok(self
                .rows
                .iter()
                .filter(|row| product_ids.contains(&row.product_id))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeVariantIndex {
        rows: Vec<VariantRow>,
    }

    #[async_trait]
    impl VariantIndex for FakeVariantIndex {
        async fn fetch(&self, product_ids: &[i64]) -> Result<Vec<VariantRow>, RepoError> {
            Ok(self
                .rows
                .iter()
                .filter(|row| product_ids.contains(&row.product_id))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeCacheStore {
        entries: Mutex<HashMap<String, String>>,
        del_calls: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for FakeCacheStore {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, payload: String) -> Result<(), CacheError> {
            self.entries.lock().unwrap().insert(key.to_string(), payload);
            Ok(())
        }

        async fn del(&self, key: &str) -> Result<(), CacheError> {
            self.del_calls.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    struct Fixture {
        campaigns: Arc<FakeCampaignsRepo>,
        cache: Arc<FakeCacheStore>,
        service: CampaignService,
    }

    fn fixture(mode: MergeMode) -> Fixture {
        fixture_with(FakeCampaignsRepo::default(), FakeImageIndex::default(), FakeVariantIndex::default(), mode)
    }

    fn fixture_with(
        repo: FakeCampaignsRepo,
        images: FakeImageIndex,
        variants: FakeVariantIndex,
        mode: MergeMode,
    ) -> Fixture {
        let campaigns = Arc::new(repo);
        let cache = Arc::new(FakeCacheStore::default());
        let service = CampaignService::new(
            campaigns.clone(),
            Arc::new(FakeCatalog {
                known: vec![1, 2, 201807201],
            }),
            Arc::new(images),
            Arc::new(variants),
            cache.clone(),
            ListingKey::new("test"),
            mode,
        );
        Fixture {
            campaigns,
            cache,
            service,
        }
    }

    fn sample_campaign(id: i64, product_id: i64) -> CampaignRecord {
        CampaignRecord {
            id,
            product_id,
            story: format!("story {id}"),
            picture: format!("/uploads/{id}.jpg"),
        }
    }

    fn sample_row(id: i64) -> ProductListingRow {
        ProductListingRow {
            id,
            category: "women".to_string(),
            title: format!("product {id}"),
            description: "".to_string(),
            price: 799,
            story: "".to_string(),
        }
    }

    #[tokio::test]
    async fn listing_miss_populates_cache_and_hit_skips_repository() {
        let fx = fixture(MergeMode::Lax);
        fx.campaigns
            .campaigns
            .lock()
            .unwrap()
            .push(sample_campaign(1, 201807201));

        let first = fx.service.list_campaigns().await.expect("first read");
        assert_eq!(first.len(), 1);
        assert_eq!(fx.campaigns.list_calls.load(Ordering::SeqCst), 1);

        let second = fx.service.list_campaigns().await.expect("second read");
        assert_eq!(second, first);
        // Cache hit: the repository is not consulted again.
        assert_eq!(fx.campaigns.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn corrupt_cache_entry_is_an_error_not_a_recompute() {
        let fx = fixture(MergeMode::Lax);
        fx.cache
            .set("test:campaigns", r#"[{"id":1,"story":"s"}]"#.to_string())
            .await
            .unwrap();

        let err = fx.service.list_campaigns().await.expect_err("must fail");
        assert!(matches!(err, AppError::CachedListing { .. }));
        assert_eq!(fx.campaigns.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn create_requires_picture_before_any_side_effect() {
        let fx = fixture(MergeMode::Lax);
        fx.cache
            .set("test:campaigns", "[]".to_string())
            .await
            .unwrap();

        let err = fx
            .service
            .create_campaign(CreateCampaign {
                product_id: 1,
                story: "s".to_string(),
                picture_path: None,
            })
            .await
            .expect_err("picture is required");

        assert!(matches!(
            err,
            AppError::Domain(DomainError::Validation { .. })
        ));
        assert_eq!(fx.campaigns.create_calls.load(Ordering::SeqCst), 0);
        // A doomed write never evicts the cache.
        assert_eq!(fx.cache.del_calls.load(Ordering::SeqCst), 0);
        assert!(fx.cache.get("test:campaigns").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_evicts_listing_after_write() {
        let fx = fixture(MergeMode::Lax);
        fx.service.list_campaigns().await.expect("warm the cache");
        assert!(fx.cache.get("test:campaigns").await.unwrap().is_some());

        let id = fx
            .service
            .create_campaign(CreateCampaign {
                product_id: 201807201,
                story: "new".to_string(),
                picture_path: Some("/uploads/new.jpg".to_string()),
            })
            .await
            .expect("create");
        assert_eq!(id, 1);
        assert!(fx.cache.get("test:campaigns").await.unwrap().is_none());

        // The next read reflects the new campaign.
        let listing = fx.service.list_campaigns().await.expect("fresh read");
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].story, "new");
    }

    #[tokio::test]
    async fn gate_reports_unknown_products() {
        let fx = fixture(MergeMode::Lax);
        assert!(fx.service.product_exists(201807201).await.unwrap());
        assert!(!fx.service.product_exists(999).await.unwrap());
    }

    #[tokio::test]
    async fn mobile_listing_merges_images_and_variants() {
        let repo = FakeCampaignsRepo {
            mobile_rows: vec![sample_row(1)],
            ..Default::default()
        };
        let images = FakeImageIndex {
            rows: vec![
                ImageRecord {
                    product_id: 1,
                    url: "a.jpg".to_string(),
                    is_main: true,
                },
                ImageRecord {
                    product_id: 1,
                    url: "a2.jpg".to_string(),
                    is_main: false,
                },
            ],
        };
        let variants = FakeVariantIndex {
            rows: vec![VariantRow {
                product_id: 1,
                color_code: "FFFFFF".to_string(),
                color_name: "白色".to_string(),
                size: "M".to_string(),
                stock: 5,
            }],
        };
        let fx = fixture_with(repo, images, variants, MergeMode::Lax);

        let listing = fx.service.list_for_mobile().await.expect("mobile listing");
        assert_eq!(listing.title, MOBILE_LISTING_TITLE);
        assert_eq!(listing.products.len(), 1);

        let product = &listing.products[0];
        assert_eq!(product.main_image, "a.jpg");
        assert_eq!(product.images, vec!["a.jpg", "a2.jpg"]);
        assert_eq!(product.sizes, vec!["M"]);
        assert_eq!(product.colors.len(), 1);
        assert_eq!(product.colors[0].code, "FFFFFF");
        assert_eq!(product.colors[0].name, "白色");
        assert_eq!(product.variants.len(), 1);
        assert_eq!(product.variants[0].stock, 5);
    }

    #[tokio::test]
    async fn mobile_listing_defaults_missing_groups_in_lax_mode() {
        let repo = FakeCampaignsRepo {
            mobile_rows: vec![sample_row(1), sample_row(2)],
            ..Default::default()
        };
        let images = FakeImageIndex {
            rows: vec![ImageRecord {
                product_id: 1,
                url: "a.jpg".to_string(),
                is_main: true,
            }],
        };
        let variants = FakeVariantIndex {
            rows: vec![VariantRow {
                product_id: 1,
                color_code: "DDF0FF".to_string(),
                color_name: "淺藍".to_string(),
                size: "S".to_string(),
                stock: 2,
            }],
        };
        let fx = fixture_with(repo, images, variants, MergeMode::Lax);

        let listing = fx.service.list_for_mobile().await.expect("mobile listing");
        let bare = &listing.products[1];
        assert_eq!(bare.id, 2);
        assert_eq!(bare.main_image, "");
        assert!(bare.images.is_empty());
        assert!(bare.sizes.is_empty());
        assert!(bare.colors.is_empty());
        assert!(bare.variants.is_empty());
    }

    #[tokio::test]
    async fn mobile_listing_fails_on_missing_variants_in_strict_mode() {
        let repo = FakeCampaignsRepo {
            mobile_rows: vec![sample_row(2)],
            ..Default::default()
        };
        let fx = fixture_with(
            repo,
            FakeImageIndex::default(),
            FakeVariantIndex::default(),
            MergeMode::Strict,
        );

        let err = fx.service.list_for_mobile().await.expect_err("strict merge");
        assert!(matches!(err, AppError::PartialData { product_id: 2 }));
    }

    #[test]
    fn grouping_derives_sizes_and_colors_deterministically() {
        let rows = vec![
            VariantRow {
                product_id: 1,
                color_code: "FFFFFF".to_string(),
                color_name: "白色".to_string(),
                size: "M".to_string(),
                stock: 1,
            },
            VariantRow {
                product_id: 1,
                color_code: "DDF0FF".to_string(),
                color_name: "淺藍".to_string(),
                size: "S".to_string(),
                stock: 0,
            },
            VariantRow {
                product_id: 1,
                color_code: "FFFFFF".to_string(),
                color_name: "白色".to_string(),
                size: "S".to_string(),
                stock: 3,
            },
        ];

        let groups = group_variants(rows);
        let group = groups.get(&1).expect("group for product 1");
        assert_eq!(group.variants.len(), 3);
        assert_eq!(
            group.sizes.iter().cloned().collect::<Vec<_>>(),
            vec!["M", "S"]
        );
        // Colors are unique by code.
        assert_eq!(group.colors.len(), 2);
        assert_eq!(group.colors.get("FFFFFF").map(String::as_str), Some("白色"));
    }

    #[test]
    fn distinct_ids_preserve_first_appearance_order() {
        let rows = vec![sample_row(3), sample_row(1), sample_row(3), sample_row(2)];
        assert_eq!(distinct_product_ids(&rows), vec![3, 1, 2]);
    }
}
