//! # Return Repository
//!
//! Database operations for the post-delivery return/refund workflow.
//!
//! ## Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  REQUESTED ──► APPROVED ──► PICKUP_SCHEDULED ──► PICKED_UP          │
//! │      │                                              │              │
//! │      └──► REJECTED (terminal)                       ▼              │
//! │                                    VERIFIED ──► REFUNDED (terminal) │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One request per order by business rule; SQLite cannot express that
//! cleanly (rejected requests may be re-filed in a future schema), so
//! [`ReturnRepository::create`] enforces it.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::live::{self, ChangeHub, LiveQuery, Watched};
use freshcart_core::{
    DecodeError, Money, RefundStatus, ReturnItem, ReturnReason, ReturnRequest, ReturnStatus,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ReturnRow {
    id: String,
    order_id: String,
    user_id: String,
    reason: String,
    description: Option<String>,
    status: String,
    requested_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    pickup_scheduled_at: Option<DateTime<Utc>>,
    picked_up_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    admin_comment: Option<String>,
    refund_status: Option<String>,
    refund_amount: Option<i64>,
}

impl TryFrom<ReturnRow> for ReturnRequest {
    type Error = DecodeError;

    fn try_from(row: ReturnRow) -> Result<ReturnRequest, DecodeError> {
        Ok(ReturnRequest {
            reason: ReturnReason::parse(&row.reason)?,
            status: ReturnStatus::parse(&row.status)?,
            refund_status: row
                .refund_status
                .as_deref()
                .map(RefundStatus::parse)
                .transpose()?,
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            description: row.description,
            requested_at: row.requested_at,
            reviewed_at: row.reviewed_at,
            pickup_scheduled_at: row.pickup_scheduled_at,
            picked_up_at: row.picked_up_at,
            verified_at: row.verified_at,
            reviewed_by: row.reviewed_by,
            admin_comment: row.admin_comment,
            refund_amount: row.refund_amount.map(Money::from_minor),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReturnItemRow {
    id: String,
    return_id: String,
    product_id: String,
    name: String,
    quantity: f64,
    reason: Option<String>,
}

impl TryFrom<ReturnItemRow> for ReturnItem {
    type Error = DecodeError;

    fn try_from(row: ReturnItemRow) -> Result<ReturnItem, DecodeError> {
        Ok(ReturnItem {
            reason: row.reason.as_deref().map(ReturnReason::parse).transpose()?,
            id: row.id,
            return_id: row.return_id,
            product_id: row.product_id,
            name: row.name,
            quantity: row.quantity,
        })
    }
}

const RETURN_COLUMNS: &str = "\
    id, order_id, user_id, reason, description, status, \
    requested_at, reviewed_at, pickup_scheduled_at, picked_up_at, verified_at, \
    reviewed_by, admin_comment, refund_status, refund_amount";

// =============================================================================
// Return Repository
// =============================================================================

/// Repository for return requests and their line items.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
    hub: Arc<ChangeHub>,
}

impl ReturnRepository {
    pub(crate) fn new(pool: SqlitePool, hub: Arc<ChangeHub>) -> Self {
        ReturnRepository { pool, hub }
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    /// Files a return request with its items, atomically.
    ///
    /// ## Errors
    /// - [`StoreError::ConstraintViolation`] if the order already has a
    ///   request, or an item references a different request
    pub async fn create(&self, request: &ReturnRequest, items: &[ReturnItem]) -> StoreResult<()> {
        for item in items {
            if item.return_id != request.id {
                return Err(StoreError::ConstraintViolation {
                    message: format!(
                        "return item {} belongs to request {}, not {}",
                        item.id, item.return_id, request.id
                    ),
                });
            }
        }

        let mut tx = self.pool.begin().await?;

        // One request per order: the check and the insert share the
        // transaction, so a concurrent create serializes behind us.
        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM return_requests WHERE order_id = ?1")
                .bind(&request.order_id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(existing) = existing {
            return Err(StoreError::ConstraintViolation {
                message: format!(
                    "order {} already has return request {existing}",
                    request.order_id
                ),
            });
        }

        let sql = format!(
            "INSERT INTO return_requests ({RETURN_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        );
        sqlx::query(&sql)
            .bind(&request.id)
            .bind(&request.order_id)
            .bind(&request.user_id)
            .bind(request.reason.as_str())
            .bind(&request.description)
            .bind(request.status.as_str())
            .bind(request.requested_at)
            .bind(request.reviewed_at)
            .bind(request.pickup_scheduled_at)
            .bind(request.picked_up_at)
            .bind(request.verified_at)
            .bind(&request.reviewed_by)
            .bind(&request.admin_comment)
            .bind(request.refund_status.map(|s| s.as_str()))
            .bind(request.refund_amount.map(|m| m.minor()))
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO return_items (id, return_id, product_id, name, quantity, reason) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&item.id)
            .bind(&item.return_id)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.reason.map(|r| r.as_str()))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(id = %request.id, order = %request.order_id, "return request filed");
        self.hub.mark(Watched::Returns);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a request by id. Absence is `Ok(None)`.
    pub async fn get(&self, id: &str) -> StoreResult<Option<ReturnRequest>> {
        let sql = format!("SELECT {RETURN_COLUMNS} FROM return_requests WHERE id = ?1");
        let row: Option<ReturnRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ReturnRequest::try_from)
            .transpose()
            .map_err(StoreError::from)
    }

    /// Line items of one request, in insertion order.
    pub async fn items(&self, return_id: &str) -> StoreResult<Vec<ReturnItem>> {
        let rows: Vec<ReturnItemRow> = sqlx::query_as(
            "SELECT id, return_id, product_id, name, quantity, reason \
             FROM return_items WHERE return_id = ?1 ORDER BY rowid",
        )
        .bind(return_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| ReturnItem::try_from(row).map_err(StoreError::from))
            .collect()
    }

    /// One user's requests, newest first.
    pub async fn for_user(&self, user_id: &str) -> StoreResult<Vec<ReturnRequest>> {
        fetch_returns_for_user(&self.pool, user_id).await
    }

    /// The request filed against an order, if any.
    pub async fn for_order(&self, order_id: &str) -> StoreResult<Option<ReturnRequest>> {
        let sql = format!("SELECT {RETURN_COLUMNS} FROM return_requests WHERE order_id = ?1");
        let row: Option<ReturnRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ReturnRequest::try_from)
            .transpose()
            .map_err(StoreError::from)
    }

    /// Live view of one user's requests, newest first.
    pub async fn watch_for_user(&self, user_id: &str) -> StoreResult<LiveQuery<ReturnRequest>> {
        let version = self.hub.subscribe(Watched::Returns);
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        live::watch_query(version, move || {
            let pool = pool.clone();
            let user_id = user_id.clone();
            async move { fetch_returns_for_user(&pool, &user_id).await }
        })
        .await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Advances the workflow, stamping the phase timestamp and recording
    /// the reviewer on approval/rejection.
    ///
    /// The final UPDATE re-asserts the status it read, so a racing
    /// transition loses instead of silently double-applying.
    pub async fn transition(
        &self,
        id: &str,
        next: ReturnStatus,
        now: DateTime<Utc>,
        reviewer: Option<&str>,
        comment: Option<&str>,
    ) -> StoreResult<ReturnRequest> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {RETURN_COLUMNS} FROM return_requests WHERE id = ?1");
        let row: Option<ReturnRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut request =
            ReturnRequest::try_from(row.ok_or_else(|| StoreError::not_found("ReturnRequest", id))?)?;

        let loaded_status = request.status;
        request.transition(next, now)?;
        if matches!(next, ReturnStatus::Approved | ReturnStatus::Rejected) {
            request.reviewed_by = reviewer.map(str::to_string);
            request.admin_comment = comment.map(str::to_string);
        }

        let result = sqlx::query(
            "UPDATE return_requests SET \
                status = ?2, reviewed_at = ?3, pickup_scheduled_at = ?4, \
                picked_up_at = ?5, verified_at = ?6, reviewed_by = ?7, admin_comment = ?8 \
             WHERE id = ?1 AND status = ?9",
        )
        .bind(id)
        .bind(request.status.as_str())
        .bind(request.reviewed_at)
        .bind(request.pickup_scheduled_at)
        .bind(request.picked_up_at)
        .bind(request.verified_at)
        .bind(&request.reviewed_by)
        .bind(&request.admin_comment)
        .bind(loaded_status.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ConstraintViolation {
                message: format!("return request {id} was modified concurrently"),
            });
        }
        tx.commit().await?;

        debug!(id = %id, status = next.as_str(), "return request advanced");
        self.hub.mark(Watched::Returns);
        Ok(request)
    }

    /// Records the gateway refund state against a request.
    pub async fn update_refund(
        &self,
        id: &str,
        status: RefundStatus,
        amount: Money,
    ) -> StoreResult<()> {
        if amount.is_negative() {
            return Err(StoreError::ConstraintViolation {
                message: format!("negative refund amount for return request {id}"),
            });
        }
        let result = sqlx::query(
            "UPDATE return_requests SET refund_status = ?2, refund_amount = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(amount.minor())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("ReturnRequest", id));
        }
        self.hub.mark(Watched::Returns);
        Ok(())
    }

    /// Deletes a request; line items cascade. No-op when already gone.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM return_requests WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            self.hub.mark(Watched::Returns);
        }
        Ok(())
    }
}

async fn fetch_returns_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> StoreResult<Vec<ReturnRequest>> {
    let sql = format!(
        "SELECT {RETURN_COLUMNS} FROM return_requests \
         WHERE user_id = ?1 ORDER BY requested_at DESC"
    );
    let rows: Vec<ReturnRow> = sqlx::query_as(&sql).bind(user_id).fetch_all(pool).await?;
    rows.into_iter()
        .map(|row| ReturnRequest::try_from(row).map_err(StoreError::from))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{new_id, Database, DbConfig};
    use chrono::Duration;
    use freshcart_core::CoreError;
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    fn sample_request(id: &str, order_id: &str, user_id: &str, at: DateTime<Utc>) -> ReturnRequest {
        ReturnRequest::new(
            id.to_string(),
            order_id.to_string(),
            user_id.to_string(),
            ReturnReason::Damaged,
            Some("crushed box".to_string()),
            at,
        )
    }

    fn sample_items(return_id: &str) -> Vec<ReturnItem> {
        vec![
            ReturnItem {
                id: new_id(),
                return_id: return_id.to_string(),
                product_id: "prod-1".to_string(),
                name: "Milk 1L".to_string(),
                quantity: 2.0,
                reason: None,
            },
            ReturnItem {
                id: new_id(),
                return_id: return_id.to_string(),
                product_id: "prod-2".to_string(),
                name: "Eggs".to_string(),
                quantity: 1.0,
                reason: Some(ReturnReason::Expired),
            },
        ]
    }

    #[tokio::test]
    async fn create_persists_request_and_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let request = sample_request("ret-1", "o-1", "u-1", Utc::now());
        db.returns()
            .create(&request, &sample_items("ret-1"))
            .await
            .unwrap();

        let fetched = db.returns().get("ret-1").await.unwrap().unwrap();
        assert_eq!(fetched, request);
        assert_eq!(fetched.status, ReturnStatus::Requested);

        let items = db.returns().items("ret-1").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].reason, Some(ReturnReason::Expired));

        assert_eq!(
            db.returns().for_order("o-1").await.unwrap().map(|r| r.id),
            Some("ret-1".to_string())
        );
    }

    #[tokio::test]
    async fn one_request_per_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.returns()
            .create(&sample_request("ret-1", "o-1", "u-1", Utc::now()), &[])
            .await
            .unwrap();

        let err = db
            .returns()
            .create(&sample_request("ret-2", "o-1", "u-1", Utc::now()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { .. }));
        assert!(db.returns().get("ret-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_lifecycle_with_reviewer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let t0 = Utc::now();
        db.returns()
            .create(&sample_request("ret-1", "o-1", "u-1", t0), &[])
            .await
            .unwrap();

        let approved = db
            .returns()
            .transition(
                "ret-1",
                ReturnStatus::Approved,
                t0 + Duration::minutes(10),
                Some("admin-7"),
                Some("photos check out"),
            )
            .await
            .unwrap();
        assert_eq!(approved.reviewed_by.as_deref(), Some("admin-7"));
        assert_eq!(approved.reviewed_at, Some(t0 + Duration::minutes(10)));

        for (next, offset) in [
            (ReturnStatus::PickupScheduled, 60),
            (ReturnStatus::PickedUp, 240),
            (ReturnStatus::Verified, 300),
            (ReturnStatus::Refunded, 360),
        ] {
            db.returns()
                .transition("ret-1", next, t0 + Duration::minutes(offset), None, None)
                .await
                .unwrap();
        }

        let done = db.returns().get("ret-1").await.unwrap().unwrap();
        assert_eq!(done.status, ReturnStatus::Refunded);
        assert!(done.verified_at.unwrap() >= done.picked_up_at.unwrap());
        // Refund keeps the verified timestamp
        assert_eq!(done.verified_at, Some(t0 + Duration::minutes(300)));
    }

    #[tokio::test]
    async fn transition_guards_hold_at_the_store_level() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let t0 = Utc::now();
        db.returns()
            .create(&sample_request("ret-1", "o-1", "u-1", t0), &[])
            .await
            .unwrap();

        // Cannot skip approval
        let err = db
            .returns()
            .transition("ret-1", ReturnStatus::PickedUp, t0, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::InvalidReturnTransition { .. })
        ));

        // Cannot backdate past the previous phase
        let err = db
            .returns()
            .transition(
                "ret-1",
                ReturnStatus::Approved,
                t0 - Duration::minutes(1),
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::PhaseTimestampRegression { .. })
        ));

        // Nothing persisted by either failure
        let req = db.returns().get("ret-1").await.unwrap().unwrap();
        assert_eq!(req.status, ReturnStatus::Requested);
        assert!(req.reviewed_at.is_none());
    }

    #[tokio::test]
    async fn rejected_is_terminal_in_the_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let t0 = Utc::now();
        db.returns()
            .create(&sample_request("ret-1", "o-1", "u-1", t0), &[])
            .await
            .unwrap();
        db.returns()
            .transition("ret-1", ReturnStatus::Rejected, t0, Some("admin-7"), None)
            .await
            .unwrap();

        let err = db
            .returns()
            .transition("ret-1", ReturnStatus::Approved, t0, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(_)));
    }

    #[tokio::test]
    async fn refund_update_and_missing_request() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.returns()
            .create(&sample_request("ret-1", "o-1", "u-1", Utc::now()), &[])
            .await
            .unwrap();

        db.returns()
            .update_refund("ret-1", RefundStatus::Completed, Money::from_rupees(120))
            .await
            .unwrap();
        let req = db.returns().get("ret-1").await.unwrap().unwrap();
        assert_eq!(req.refund_status, Some(RefundStatus::Completed));
        assert_eq!(req.refund_amount, Some(Money::from_rupees(120)));

        let err = db
            .returns()
            .update_refund("missing", RefundStatus::Completed, Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_cascades_to_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.returns()
            .create(
                &sample_request("ret-1", "o-1", "u-1", Utc::now()),
                &sample_items("ret-1"),
            )
            .await
            .unwrap();

        db.returns().delete("ret-1").await.unwrap();
        assert!(db.returns().get("ret-1").await.unwrap().is_none());
        assert!(db.returns().items("ret-1").await.unwrap().is_empty());

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM return_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn for_user_sorts_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let t0 = Utc::now();
        db.returns()
            .create(&sample_request("ret-old", "o-1", "u-1", t0), &[])
            .await
            .unwrap();
        db.returns()
            .create(
                &sample_request("ret-new", "o-2", "u-1", t0 + Duration::hours(1)),
                &[],
            )
            .await
            .unwrap();

        let ids: Vec<String> = db
            .returns()
            .for_user("u-1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["ret-new", "ret-old"]);
    }

    #[tokio::test]
    async fn watch_for_user_refreshes_on_transition() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let t0 = Utc::now();
        db.returns()
            .create(&sample_request("ret-1", "o-1", "u-1", t0), &[])
            .await
            .unwrap();

        let mut live = db.returns().watch_for_user("u-1").await.unwrap();
        assert_eq!(live.snapshot()[0].status, ReturnStatus::Requested);

        db.returns()
            .transition("ret-1", ReturnStatus::Approved, t0, Some("admin-7"), None)
            .await
            .unwrap();
        let requests = timeout(StdDuration::from_secs(5), live.changed())
            .await
            .expect("refresh after transition")
            .expect("store still open");
        assert_eq!(requests[0].status, ReturnStatus::Approved);
    }
}
