//! # Catalog Repository
//!
//! Read model of the external product catalog. The catalog is owned by
//! another system; this table is what the server resolves product ids
//! against when an order is added. `upsert` exists for the sync job and the
//! seed binary.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use mesa_core::{CatalogProduct, Money};

/// Repository for catalog products.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Looks up an active product of the tenant.
    pub async fn find(&self, tenant_id: &str, product_id: &str) -> DbResult<Option<CatalogProduct>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, category, price_cents
            FROM catalog_products
            WHERE tenant_id = ?1 AND id = ?2 AND is_active = 1
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| map_product(&row)).transpose()
    }

    /// Active products of the tenant, by name.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<CatalogProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, category, price_cents
            FROM catalog_products
            WHERE tenant_id = ?1 AND is_active = 1
            ORDER BY name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_product).collect()
    }

    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_products WHERE tenant_id = ?1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Inserts or replaces a product.
    pub async fn upsert(&self, tenant_id: &str, product: &CatalogProduct) -> DbResult<()> {
        debug!(id = %product.id, price = %product.price, "Upserting catalog product");

        sqlx::query(
            r#"
            INSERT INTO catalog_products (id, tenant_id, name, category, price_cents, is_active, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                price_cents = excluded.price_cents,
                is_active = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(tenant_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price.cents())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Hides a product from new orders. Existing items keep their snapshot.
    pub async fn deactivate(&self, tenant_id: &str, product_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE catalog_products SET is_active = 0, updated_at = ?3 WHERE tenant_id = ?1 AND id = ?2",
        )
        .bind(tenant_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_product(row: &sqlx::sqlite::SqliteRow) -> DbResult<CatalogProduct> {
    Ok(CatalogProduct {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        price: Money::from_cents(row.try_get("price_cents")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn product(id: &str, cents: i64) -> CatalogProduct {
        CatalogProduct {
            id: id.to_string(),
            name: format!("Dish {}", id),
            category: Some("mains".to_string()),
            price: Money::from_cents(cents),
        }
    }

    #[tokio::test]
    async fn test_upsert_find_and_deactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        catalog.upsert("t1", &product("tacos", 1250)).await.unwrap();
        catalog.upsert("t1", &product("tacos", 1400)).await.unwrap();

        let found = catalog.find("t1", "tacos").await.unwrap().unwrap();
        assert_eq!(found.price.cents(), 1400);
        assert_eq!(catalog.count("t1").await.unwrap(), 1);

        // Other tenants do not see it.
        assert!(catalog.find("t2", "tacos").await.unwrap().is_none());

        assert!(catalog.deactivate("t1", "tacos").await.unwrap());
        assert!(catalog.find("t1", "tacos").await.unwrap().is_none());
        assert!(catalog.list("t1").await.unwrap().is_empty());
    }
}
