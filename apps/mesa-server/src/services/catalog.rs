//! # Catalog
//!
//! Product lookup used when an order is added. Prices are snapshotted onto
//! the item at that moment; later catalog changes never touch open
//! accounts.

use async_trait::async_trait;

use mesa_core::CatalogProduct;
use mesa_db::CatalogRepository;

use super::ServiceResult;

#[async_trait]
pub trait Catalog: Send + Sync {
    /// An active product of the tenant, or `None` if unknown or withdrawn.
    async fn find(&self, tenant_id: &str, product_id: &str) -> ServiceResult<Option<CatalogProduct>>;
}

/// Catalog backed by the `catalog_products` read model.
#[derive(Debug, Clone)]
pub struct DbCatalog {
    repo: CatalogRepository,
}

impl DbCatalog {
    pub fn new(repo: CatalogRepository) -> Self {
        DbCatalog { repo }
    }
}

#[async_trait]
impl Catalog for DbCatalog {
    async fn find(&self, tenant_id: &str, product_id: &str) -> ServiceResult<Option<CatalogProduct>> {
        Ok(self.repo.find(tenant_id, product_id).await?)
    }
}
