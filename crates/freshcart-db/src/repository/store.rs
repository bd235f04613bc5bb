//! # Store Directory Repository
//!
//! CRUD over the fulfillment-store directory. Stores have an independent
//! lifecycle: deleting one never touches orders that reference it.

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::live::{self, ChangeHub, LiveQuery, Watched};
use freshcart_core::{GeoPoint, Store};

// =============================================================================
// Row Type
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: String,
    name: String,
    address: String,
    location: String,
    postal_code: Option<String>,
    is_active: bool,
    service_radius_km: f64,
    service_area_enabled: bool,
    is_default_fallback: bool,
    contact_phone: Option<String>,
    contact_email: Option<String>,
}

impl TryFrom<StoreRow> for Store {
    type Error = StoreError;

    fn try_from(row: StoreRow) -> StoreResult<Store> {
        // A store without a usable location cannot serve radius checks;
        // unlike the optional order pins this one does not degrade.
        let location = GeoPoint::decode(&row.location).ok_or_else(|| StoreError::Query(format!(
            "store {} has malformed location '{}'",
            row.id, row.location
        )))?;
        Ok(Store {
            location,
            id: row.id,
            name: row.name,
            address: row.address,
            postal_code: row.postal_code,
            is_active: row.is_active,
            service_radius_km: row.service_radius_km,
            service_area_enabled: row.service_area_enabled,
            is_default_fallback: row.is_default_fallback,
            contact_phone: row.contact_phone,
            contact_email: row.contact_email,
        })
    }
}

const STORE_COLUMNS: &str = "\
    id, name, address, location, postal_code, is_active, \
    service_radius_km, service_area_enabled, is_default_fallback, \
    contact_phone, contact_email";

// =============================================================================
// Store Repository
// =============================================================================

/// Repository for the fulfillment-store directory.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
    hub: Arc<ChangeHub>,
}

impl StoreRepository {
    pub(crate) fn new(pool: SqlitePool, hub: Arc<ChangeHub>) -> Self {
        StoreRepository { pool, hub }
    }

    /// Gets a store by id. Absence is `Ok(None)`.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Store>> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = ?1");
        let row: Option<StoreRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Store::try_from).transpose()
    }

    /// Every store, name-sorted.
    pub async fn all(&self) -> StoreResult<Vec<Store>> {
        fetch_stores(&self.pool, false).await
    }

    /// Stores currently accepting orders, name-sorted.
    pub async fn active(&self) -> StoreResult<Vec<Store>> {
        fetch_stores(&self.pool, true).await
    }

    /// The fallback store used when no store's service area covers the
    /// customer's address. First by name if several are flagged.
    pub async fn default_fallback(&self) -> StoreResult<Option<Store>> {
        let sql = format!(
            "SELECT {STORE_COLUMNS} FROM stores \
             WHERE is_default_fallback = 1 AND is_active = 1 \
             ORDER BY name LIMIT 1"
        );
        let row: Option<StoreRow> = sqlx::query_as(&sql).fetch_optional(&self.pool).await?;
        row.map(Store::try_from).transpose()
    }

    /// Live view of the active stores.
    pub async fn watch_active(&self) -> StoreResult<LiveQuery<Store>> {
        let version = self.hub.subscribe(Watched::Stores);
        let pool = self.pool.clone();
        live::watch_query(version, move || {
            let pool = pool.clone();
            async move { fetch_stores(&pool, true).await }
        })
        .await
    }

    /// Insert-or-replace by primary key (idempotent sync-style write).
    pub async fn upsert(&self, store: &Store) -> StoreResult<()> {
        let sql = format!(
            "INSERT OR REPLACE INTO stores ({STORE_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        );
        sqlx::query(&sql)
            .bind(&store.id)
            .bind(&store.name)
            .bind(&store.address)
            .bind(store.location.encode())
            .bind(&store.postal_code)
            .bind(store.is_active)
            .bind(store.service_radius_km)
            .bind(store.service_area_enabled)
            .bind(store.is_default_fallback)
            .bind(&store.contact_phone)
            .bind(&store.contact_email)
            .execute(&self.pool)
            .await?;
        self.hub.mark(Watched::Stores);
        Ok(())
    }

    /// Deletes a store. Orders keep their `store_id`; the reference just
    /// dangles, matching the independent-lifecycle rule.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM stores WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            self.hub.mark(Watched::Stores);
        }
        Ok(())
    }
}

async fn fetch_stores(pool: &SqlitePool, active_only: bool) -> StoreResult<Vec<Store>> {
    let filter = if active_only { "WHERE is_active = 1" } else { "" };
    let sql = format!("SELECT {STORE_COLUMNS} FROM stores {filter} ORDER BY name");
    let rows: Vec<StoreRow> = sqlx::query_as(&sql).fetch_all(pool).await?;
    rows.into_iter().map(Store::try_from).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use std::time::Duration;
    use tokio::time::timeout;

    fn sample_store(id: &str, name: &str) -> Store {
        Store {
            id: id.to_string(),
            name: name.to_string(),
            address: "4 Brigade Road".to_string(),
            location: GeoPoint::new(12.97, 77.6),
            postal_code: Some("560001".to_string()),
            is_active: true,
            service_radius_km: 5.0,
            service_area_enabled: true,
            is_default_fallback: false,
            contact_phone: None,
            contact_email: None,
        }
    }

    #[tokio::test]
    async fn upsert_get_roundtrip_and_idempotence() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = sample_store("s-1", "Indiranagar");
        db.stores().upsert(&store).await.unwrap();
        db.stores().upsert(&store).await.unwrap();

        assert_eq!(db.stores().get("s-1").await.unwrap(), Some(store));
        assert_eq!(db.stores().all().await.unwrap().len(), 1);
        assert!(db.stores().get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn active_filter_and_name_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.stores().upsert(&sample_store("s-b", "Whitefield")).await.unwrap();
        db.stores().upsert(&sample_store("s-a", "Jayanagar")).await.unwrap();
        let mut closed = sample_store("s-c", "Closed Branch");
        closed.is_active = false;
        db.stores().upsert(&closed).await.unwrap();

        let names: Vec<String> = db
            .stores()
            .active()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Jayanagar", "Whitefield"]);
        assert_eq!(db.stores().all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn default_fallback_requires_active_flag() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.stores().default_fallback().await.unwrap().is_none());

        let mut fallback = sample_store("s-1", "Central");
        fallback.is_default_fallback = true;
        db.stores().upsert(&fallback).await.unwrap();
        assert_eq!(
            db.stores().default_fallback().await.unwrap().map(|s| s.id),
            Some("s-1".to_string())
        );

        fallback.is_active = false;
        db.stores().upsert(&fallback).await.unwrap();
        assert!(db.stores().default_fallback().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_noop_when_absent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.stores().delete("missing").await.unwrap();

        db.stores().upsert(&sample_store("s-1", "Indiranagar")).await.unwrap();
        db.stores().delete("s-1").await.unwrap();
        assert!(db.stores().all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watch_active_refreshes_on_upsert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut live = db.stores().watch_active().await.unwrap();
        assert!(live.snapshot().is_empty());

        db.stores().upsert(&sample_store("s-1", "Indiranagar")).await.unwrap();
        let stores = timeout(Duration::from_secs(5), live.changed())
            .await
            .expect("refresh after upsert")
            .expect("store still open");
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].id, "s-1");
    }
}
