//! # Order Repository
//!
//! Database operations for orders and their owned rows: cart items,
//! tracking history, and the assigned delivery person.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  1. CHECKOUT (one transaction)                                      │
//! │     └── checkout() → order + cart items + first tracking entry      │
//! │                                                                     │
//! │  2. PROGRESS                                                        │
//! │     └── update_status() → guarded transition + tracking entry       │
//! │     └── upsert_delivery_person() / update_delivery_location()       │
//! │                                                                     │
//! │  3. SETTLE                                                          │
//! │     └── update_refund() → refund state from the gateway             │
//! │                                                                     │
//! │  4. (EXPLICIT ONLY) DELETE                                          │
//! │     └── delete() → cascades to items, tracking, delivery person     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checkout is atomic by design: a crash between writes must never leave
//! an order with no line items, so the order, its items, and the initial
//! tracking entry commit together.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::live::{self, ChangeHub, LiveQuery, Watched};
use crate::pool::new_id;
use freshcart_core::{
    CartItem, CoreError, DecodeError, DeliveryPerson, GeoPoint, Money, Order, OrderStatus,
    OrderTrackingEntry, PaymentMethod, RefundStatus, VehicleType,
};

// =============================================================================
// Row Types
// =============================================================================

/// Flat `orders` row; converted to [`Order`] surfacing decode failures.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    store_id: Option<String>,
    subtotal: i64,
    handling_fee: i64,
    delivery_fee: i64,
    tax_amount: i64,
    rain_fee: i64,
    discount_amount: i64,
    final_total: i64,
    payment_method: String,
    delivery_address: String,
    delivery_location: Option<String>,
    status: String,
    refund_status: Option<String>,
    refund_amount: Option<i64>,
    scheduled_date: Option<NaiveDate>,
    scheduled_slot: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DecodeError;

    fn try_from(row: OrderRow) -> Result<Order, DecodeError> {
        Ok(Order {
            payment_method: PaymentMethod::parse(&row.payment_method)?,
            status: OrderStatus::parse(&row.status)?,
            refund_status: row
                .refund_status
                .as_deref()
                .map(RefundStatus::parse)
                .transpose()?,
            // Malformed pairs degrade to "no location" by contract
            delivery_location: GeoPoint::decode_opt(row.delivery_location.as_deref()),
            id: row.id,
            user_id: row.user_id,
            store_id: row.store_id,
            subtotal: Money::from_minor(row.subtotal),
            handling_fee: Money::from_minor(row.handling_fee),
            delivery_fee: Money::from_minor(row.delivery_fee),
            tax_amount: Money::from_minor(row.tax_amount),
            rain_fee: Money::from_minor(row.rain_fee),
            discount_amount: Money::from_minor(row.discount_amount),
            final_total: Money::from_minor(row.final_total),
            delivery_address: row.delivery_address,
            refund_amount: row.refund_amount.map(Money::from_minor),
            scheduled_date: row.scheduled_date,
            scheduled_slot: row.scheduled_slot,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: String,
    order_id: String,
    product_id: String,
    name: String,
    image_url: Option<String>,
    category: Option<String>,
    quantity: f64,
    unit_price: i64,
    original_price: Option<i64>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> CartItem {
        CartItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            name: row.name,
            image_url: row.image_url,
            category: row.category,
            quantity: row.quantity,
            unit_price: Money::from_minor(row.unit_price),
            original_price: row.original_price.map(Money::from_minor),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TrackingRow {
    id: String,
    order_id: String,
    status: String,
    message: String,
    eta_minutes: Option<i64>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<TrackingRow> for OrderTrackingEntry {
    type Error = DecodeError;

    fn try_from(row: TrackingRow) -> Result<OrderTrackingEntry, DecodeError> {
        Ok(OrderTrackingEntry {
            status: OrderStatus::parse(&row.status)?,
            id: row.id,
            order_id: row.order_id,
            message: row.message,
            eta_minutes: row.eta_minutes,
            recorded_at: row.recorded_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveryPersonRow {
    order_id: String,
    name: String,
    phone: String,
    vehicle: String,
    location: Option<String>,
    sharing_location: bool,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DeliveryPersonRow> for DeliveryPerson {
    type Error = DecodeError;

    fn try_from(row: DeliveryPersonRow) -> Result<DeliveryPerson, DecodeError> {
        Ok(DeliveryPerson {
            vehicle: VehicleType::parse(&row.vehicle)?,
            location: GeoPoint::decode_opt(row.location.as_deref()),
            order_id: row.order_id,
            name: row.name,
            phone: row.phone,
            sharing_location: row.sharing_location,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// SQL
// =============================================================================

const ORDER_COLUMNS: &str = "\
    id, user_id, store_id, \
    subtotal, handling_fee, delivery_fee, tax_amount, rain_fee, \
    discount_amount, final_total, \
    payment_method, delivery_address, delivery_location, \
    status, refund_status, refund_amount, \
    scheduled_date, scheduled_slot, created_at, updated_at";

// =============================================================================
// Order Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    hub: Arc<ChangeHub>,
}

impl OrderRepository {
    pub(crate) fn new(pool: SqlitePool, hub: Arc<ChangeHub>) -> Self {
        OrderRepository { pool, hub }
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Persists a completed checkout atomically: the order, every cart
    /// item, and the initial tracking entry in one transaction.
    ///
    /// ## Errors
    /// - [`StoreError::Domain`] if the order's totals are inconsistent
    /// - [`StoreError::ConstraintViolation`] if an item or the entry
    ///   references a different order
    pub async fn checkout(
        &self,
        order: &Order,
        items: &[CartItem],
        first_entry: &OrderTrackingEntry,
    ) -> StoreResult<()> {
        order.verify_totals()?;
        for item in items {
            if item.order_id != order.id {
                return Err(StoreError::ConstraintViolation {
                    message: format!(
                        "cart item {} belongs to order {}, not {}",
                        item.id, item.order_id, order.id
                    ),
                });
            }
        }
        if first_entry.order_id != order.id {
            return Err(StoreError::ConstraintViolation {
                message: format!(
                    "tracking entry {} belongs to order {}, not {}",
                    first_entry.id, first_entry.order_id, order.id
                ),
            });
        }

        debug!(id = %order.id, items = items.len(), "persisting checkout");

        let mut tx = self.pool.begin().await?;
        insert_order(&mut *tx, order, false).await?;
        for item in items {
            insert_cart_item(&mut *tx, item).await?;
        }
        insert_tracking(&mut *tx, first_entry).await?;
        tx.commit().await?;

        self.hub.mark(Watched::Orders);
        self.hub.mark(Watched::Tracking);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets an order by id. Absence is `Ok(None)`.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose().map_err(StoreError::from)
    }

    /// All orders, newest first.
    pub async fn all(&self) -> StoreResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
        let rows: Vec<OrderRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| Order::try_from(row).map_err(StoreError::from))
            .collect()
    }

    /// One user's orders, newest first.
    pub async fn for_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        fetch_orders_for_user(&self.pool, user_id).await
    }

    /// Live view of one user's orders, newest first.
    ///
    /// The first snapshot is available immediately (possibly empty);
    /// every committed write to the orders table refreshes it.
    pub async fn watch_for_user(&self, user_id: &str) -> StoreResult<LiveQuery<Order>> {
        let version = self.hub.subscribe(Watched::Orders);
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        live::watch_query(version, move || {
            let pool = pool.clone();
            let user_id = user_id.clone();
            async move { fetch_orders_for_user(&pool, &user_id).await }
        })
        .await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Insert-or-update by primary key. Idempotent; last writer wins,
    /// with no optimistic concurrency check (cloud sync reconciles on
    /// the same rule). Owned rows — cart items, tracking history, the
    /// rider — are left untouched; only an explicit delete removes them.
    pub async fn upsert(&self, order: &Order) -> StoreResult<()> {
        order.verify_totals()?;
        insert_order(&self.pool, order, true).await?;
        self.hub.mark(Watched::Orders);
        Ok(())
    }

    /// Moves an order to `next`, guarded by the lifecycle state machine,
    /// and appends the matching tracking entry in the same transaction.
    ///
    /// Only `status` and `updated_at` are touched, so concurrently
    /// written fields (refunds, delivery location) are never clobbered.
    pub async fn update_status(
        &self,
        order_id: &str,
        next: OrderStatus,
        message: &str,
        eta_minutes: Option<i64>,
    ) -> StoreResult<OrderTrackingEntry> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        let current =
            OrderStatus::parse(&current.ok_or_else(|| StoreError::not_found("Order", order_id))?)?;

        if !current.can_transition_to(next) {
            return Err(CoreError::InvalidOrderTransition {
                order_id: order_id.to_string(),
                from: current,
                to: next,
            }
            .into());
        }

        let now = Utc::now();
        // Re-assert the status we read, so a racing transition loses
        // instead of double-applying
        let result =
            sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4")
                .bind(order_id)
                .bind(next.as_str())
                .bind(now)
                .bind(current.as_str())
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ConstraintViolation {
                message: format!("order {order_id} was modified concurrently"),
            });
        }

        let entry = OrderTrackingEntry {
            id: new_id(),
            order_id: order_id.to_string(),
            status: next,
            message: message.to_string(),
            eta_minutes,
            recorded_at: now,
        };
        insert_tracking(&mut *tx, &entry).await?;
        tx.commit().await?;

        debug!(id = %order_id, status = next.as_str(), "order status updated");
        self.hub.mark(Watched::Orders);
        self.hub.mark(Watched::Tracking);
        Ok(entry)
    }

    /// Records the gateway refund state. Bounds-checked against the
    /// order total; targeted update of the refund fields only.
    pub async fn update_refund(
        &self,
        order_id: &str,
        status: RefundStatus,
        amount: Money,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut order =
            Order::try_from(row.ok_or_else(|| StoreError::not_found("Order", order_id))?)?;

        let now = Utc::now();
        order.set_refund(status, amount, now)?;

        sqlx::query(
            "UPDATE orders SET refund_status = ?2, refund_amount = ?3, updated_at = ?4 \
             WHERE id = ?1",
        )
        .bind(order_id)
        .bind(status.as_str())
        .bind(amount.minor())
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.hub.mark(Watched::Orders);
        Ok(())
    }

    /// Deletes an order; cart items, tracking history, and the delivery
    /// person cascade. No-op when the order is already gone.
    pub async fn delete(&self, order_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            self.hub.mark(Watched::Orders);
            self.hub.mark(Watched::Tracking);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Cart items
    // -------------------------------------------------------------------------

    /// Line items of one order, in insertion order.
    pub async fn items(&self, order_id: &str) -> StoreResult<Vec<CartItem>> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            "SELECT id, order_id, product_id, name, image_url, category, \
                    quantity, unit_price, original_price \
             FROM cart_items WHERE order_id = ?1 ORDER BY rowid",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    /// Deletes every cart item of one order (items also cascade with the
    /// order itself; this is for explicit cart maintenance).
    pub async fn delete_items(&self, order_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE order_id = ?1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        self.hub.mark(Watched::Orders);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tracking history
    // -------------------------------------------------------------------------

    /// Status history of one order, oldest first.
    pub async fn tracking(&self, order_id: &str) -> StoreResult<Vec<OrderTrackingEntry>> {
        fetch_tracking(&self.pool, order_id).await
    }

    /// Appends a tracking event. History rows are never updated.
    pub async fn append_tracking(&self, entry: &OrderTrackingEntry) -> StoreResult<()> {
        insert_tracking(&self.pool, entry).await?;
        self.hub.mark(Watched::Tracking);
        Ok(())
    }

    /// Live view of one order's tracking history, oldest first.
    pub async fn watch_tracking(
        &self,
        order_id: &str,
    ) -> StoreResult<LiveQuery<OrderTrackingEntry>> {
        let version = self.hub.subscribe(Watched::Tracking);
        let pool = self.pool.clone();
        let order_id = order_id.to_string();
        live::watch_query(version, move || {
            let pool = pool.clone();
            let order_id = order_id.clone();
            async move { fetch_tracking(&pool, &order_id).await }
        })
        .await
    }

    // -------------------------------------------------------------------------
    // Delivery person
    // -------------------------------------------------------------------------

    /// The rider assigned to an order, if any.
    pub async fn delivery_person(&self, order_id: &str) -> StoreResult<Option<DeliveryPerson>> {
        let row: Option<DeliveryPersonRow> = sqlx::query_as(
            "SELECT order_id, name, phone, vehicle, location, sharing_location, updated_at \
             FROM delivery_people WHERE order_id = ?1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DeliveryPerson::try_from)
            .transpose()
            .map_err(StoreError::from)
    }

    /// Assigns or replaces the rider for an order (keyed by order id).
    pub async fn upsert_delivery_person(&self, person: &DeliveryPerson) -> StoreResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO delivery_people \
                (order_id, name, phone, vehicle, location, sharing_location, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&person.order_id)
        .bind(&person.name)
        .bind(&person.phone)
        .bind(person.vehicle.as_str())
        .bind(person.location.map(|p| p.encode()))
        .bind(person.sharing_location)
        .bind(person.updated_at)
        .execute(&self.pool)
        .await?;
        self.hub.mark(Watched::Orders);
        Ok(())
    }

    /// Applies a location ping. Targeted update: name/phone/vehicle stay
    /// untouched.
    pub async fn update_delivery_location(
        &self,
        order_id: &str,
        location: Option<GeoPoint>,
        sharing: bool,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE delivery_people SET location = ?2, sharing_location = ?3, updated_at = ?4 \
             WHERE order_id = ?1",
        )
        .bind(order_id)
        .bind(location.map(|p| p.encode()))
        .bind(sharing)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("DeliveryPerson", order_id));
        }
        self.hub.mark(Watched::Orders);
        Ok(())
    }
}

// =============================================================================
// Shared query helpers
// =============================================================================

async fn fetch_orders_for_user(pool: &SqlitePool, user_id: &str) -> StoreResult<Vec<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC"
    );
    let rows: Vec<OrderRow> = sqlx::query_as(&sql).bind(user_id).fetch_all(pool).await?;
    rows.into_iter()
        .map(|row| Order::try_from(row).map_err(StoreError::from))
        .collect()
}

async fn fetch_tracking(pool: &SqlitePool, order_id: &str) -> StoreResult<Vec<OrderTrackingEntry>> {
    let rows: Vec<TrackingRow> = sqlx::query_as(
        "SELECT id, order_id, status, message, eta_minutes, recorded_at \
         FROM order_tracking WHERE order_id = ?1 ORDER BY recorded_at ASC",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| OrderTrackingEntry::try_from(row).map_err(StoreError::from))
        .collect()
}

async fn insert_order<'e, E>(executor: E, order: &Order, upsert: bool) -> StoreResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    // INSERT OR REPLACE resolves the key conflict by deleting the old
    // row, which would fire the cascades on cart_items / order_tracking /
    // delivery_people. The conflict clause updates in place instead.
    let on_conflict = if upsert {
        " ON CONFLICT(id) DO UPDATE SET \
            user_id = excluded.user_id, store_id = excluded.store_id, \
            subtotal = excluded.subtotal, handling_fee = excluded.handling_fee, \
            delivery_fee = excluded.delivery_fee, tax_amount = excluded.tax_amount, \
            rain_fee = excluded.rain_fee, discount_amount = excluded.discount_amount, \
            final_total = excluded.final_total, payment_method = excluded.payment_method, \
            delivery_address = excluded.delivery_address, \
            delivery_location = excluded.delivery_location, status = excluded.status, \
            refund_status = excluded.refund_status, refund_amount = excluded.refund_amount, \
            scheduled_date = excluded.scheduled_date, scheduled_slot = excluded.scheduled_slot, \
            created_at = excluded.created_at, updated_at = excluded.updated_at"
    } else {
        ""
    };
    let sql = format!(
        "INSERT INTO orders ({ORDER_COLUMNS}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20){on_conflict}"
    );
    sqlx::query(&sql)
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(&order.store_id)
        .bind(order.subtotal.minor())
        .bind(order.handling_fee.minor())
        .bind(order.delivery_fee.minor())
        .bind(order.tax_amount.minor())
        .bind(order.rain_fee.minor())
        .bind(order.discount_amount.minor())
        .bind(order.final_total.minor())
        .bind(order.payment_method.as_str())
        .bind(&order.delivery_address)
        .bind(order.delivery_location.map(|p| p.encode()))
        .bind(order.status.as_str())
        .bind(order.refund_status.map(|s| s.as_str()))
        .bind(order.refund_amount.map(|m| m.minor()))
        .bind(order.scheduled_date)
        .bind(&order.scheduled_slot)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(executor)
        .await?;
    Ok(())
}

async fn insert_cart_item<'e, E>(executor: E, item: &CartItem) -> StoreResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO cart_items \
            (id, order_id, product_id, name, image_url, category, \
             quantity, unit_price, original_price) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.name)
    .bind(&item.image_url)
    .bind(&item.category)
    .bind(item.quantity)
    .bind(item.unit_price.minor())
    .bind(item.original_price.map(|m| m.minor()))
    .execute(executor)
    .await?;
    Ok(())
}

async fn insert_tracking<'e, E>(executor: E, entry: &OrderTrackingEntry) -> StoreResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO order_tracking (id, order_id, status, message, eta_minutes, recorded_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&entry.id)
    .bind(&entry.order_id)
    .bind(entry.status.as_str())
    .bind(&entry.message)
    .bind(entry.eta_minutes)
    .bind(entry.recorded_at)
    .execute(executor)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use freshcart_core::{Checkout, FeeConfiguration};
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_order(id: &str, user_id: &str, subtotal: i64, at: DateTime<Utc>) -> Order {
        let checkout = Checkout {
            user_id: user_id.to_string(),
            store_id: None,
            subtotal: Money::from_rupees(subtotal),
            discount_amount: Money::zero(),
            payment_method: PaymentMethod::Upi,
            delivery_address: "12 MG Road".to_string(),
            delivery_location: Some(GeoPoint::new(12.9716, 77.5946)),
            scheduled_date: None,
            scheduled_slot: None,
        };
        checkout.into_order(&FeeConfiguration::default(), id.to_string(), at)
    }

    fn sample_item(id: &str, order_id: &str) -> CartItem {
        CartItem {
            id: id.to_string(),
            order_id: order_id.to_string(),
            product_id: "prod-1".to_string(),
            name: "Tomatoes".to_string(),
            image_url: None,
            category: Some("Vegetables".to_string()),
            quantity: 0.5,
            unit_price: Money::from_rupees(40),
            original_price: None,
        }
    }

    fn placed_entry(order_id: &str, at: DateTime<Utc>) -> OrderTrackingEntry {
        OrderTrackingEntry {
            id: new_id(),
            order_id: order_id.to_string(),
            status: OrderStatus::Placed,
            message: "Order placed".to_string(),
            eta_minutes: Some(35),
            recorded_at: at,
        }
    }

    async fn checkout_order(db: &Database, id: &str, user: &str, at: DateTime<Utc>) -> Order {
        let order = sample_order(id, user, 400, at);
        let items = vec![sample_item(&format!("{id}-item"), id)];
        db.orders()
            .checkout(&order, &items, &placed_entry(id, at))
            .await
            .unwrap();
        order
    }

    #[tokio::test]
    async fn checkout_persists_order_items_and_first_entry() {
        let db = test_db().await;
        let order = checkout_order(&db, "o-1", "u-1", Utc::now()).await;

        let fetched = db.orders().get("o-1").await.unwrap().unwrap();
        assert_eq!(fetched, order);
        assert_eq!(fetched.final_total, Money::from_rupees(460));
        assert_eq!(
            fetched.delivery_location,
            Some(GeoPoint::new(12.9716, 77.5946))
        );

        let items = db.orders().items("o-1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 0.5);

        let history = db.orders().tracking("o-1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OrderStatus::Placed);
    }

    #[tokio::test]
    async fn get_absent_is_none() {
        let db = test_db().await;
        assert!(db.orders().get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn checkout_rejects_inconsistent_totals() {
        let db = test_db().await;
        let mut order = sample_order("o-1", "u-1", 400, Utc::now());
        order.final_total = Money::from_rupees(1);

        let err = db
            .orders()
            .checkout(&order, &[], &placed_entry("o-1", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(_)));
        // Nothing committed
        assert!(db.orders().get("o-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn checkout_is_atomic_under_item_conflict() {
        let db = test_db().await;
        let order = sample_order("o-1", "u-1", 400, Utc::now());
        // Second item reuses the first one's primary key
        let items = vec![sample_item("dup", "o-1"), sample_item("dup", "o-1")];

        let err = db
            .orders()
            .checkout(&order, &items, &placed_entry("o-1", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { .. }));

        // The order row must not survive the failed transaction
        assert!(db.orders().get("o-1").await.unwrap().is_none());
        assert!(db.orders().items("o-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn orders_sort_newest_first() {
        let db = test_db().await;
        let t0 = Utc::now();
        checkout_order(&db, "o-old", "u-1", t0).await;
        checkout_order(&db, "o-mid", "u-1", t0 + Duration::minutes(3)).await;
        checkout_order(&db, "o-new", "u-1", t0 + Duration::minutes(7)).await;

        let all: Vec<String> = db.orders().all().await.unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(all, vec!["o-new", "o-mid", "o-old"]);

        let mine = db.orders().for_user("u-1").await.unwrap();
        assert_eq!(mine.len(), 3);
        assert_eq!(mine[0].id, "o-new");
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let db = test_db().await;
        let order = sample_order("o-1", "u-1", 400, Utc::now());
        db.orders().upsert(&order).await.unwrap();
        db.orders().upsert(&order).await.unwrap();

        let all = db.orders().all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], order);
    }

    #[tokio::test]
    async fn upsert_existing_order_keeps_owned_rows() {
        let db = test_db().await;
        let mut order = checkout_order(&db, "o-1", "u-1", Utc::now()).await;
        db.orders()
            .upsert_delivery_person(&DeliveryPerson {
                order_id: "o-1".to_string(),
                name: "Ravi".to_string(),
                phone: "+91 90000 00000".to_string(),
                vehicle: VehicleType::Bike,
                location: None,
                sharing_location: false,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        // Re-upserting the identical payload must not disturb owned rows
        db.orders().upsert(&order).await.unwrap();
        assert_eq!(db.orders().items("o-1").await.unwrap().len(), 1);
        assert_eq!(db.orders().tracking("o-1").await.unwrap().len(), 1);

        // Neither must a field change
        order.delivery_address = "7 Residency Road".to_string();
        db.orders().upsert(&order).await.unwrap();

        let fetched = db.orders().get("o-1").await.unwrap().unwrap();
        assert_eq!(fetched.delivery_address, "7 Residency Road");
        assert_eq!(db.orders().items("o-1").await.unwrap().len(), 1);
        assert_eq!(db.orders().tracking("o-1").await.unwrap().len(), 1);
        assert!(db.orders().delivery_person("o-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn status_update_appends_tracking_in_order() {
        let db = test_db().await;
        checkout_order(&db, "o-1", "u-1", Utc::now()).await;

        db.orders()
            .update_status("o-1", OrderStatus::Confirmed, "Store confirmed", Some(30))
            .await
            .unwrap();
        db.orders()
            .update_status("o-1", OrderStatus::Packed, "Packed", Some(20))
            .await
            .unwrap();

        let order = db.orders().get("o-1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Packed);

        let history = db.orders().tracking("o-1").await.unwrap();
        let statuses: Vec<OrderStatus> = history.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![OrderStatus::Placed, OrderStatus::Confirmed, OrderStatus::Packed]
        );
        assert!(history.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
    }

    #[tokio::test]
    async fn status_update_rejects_illegal_transition() {
        let db = test_db().await;
        checkout_order(&db, "o-1", "u-1", Utc::now()).await;

        let err = db
            .orders()
            .update_status("o-1", OrderStatus::Delivered, "jumped", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::InvalidOrderTransition { .. })
        ));

        // State untouched, no tracking entry appended
        let order = db.orders().get("o-1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(db.orders().tracking("o-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_update_missing_order_is_not_found() {
        let db = test_db().await;
        let err = db
            .orders()
            .update_status("missing", OrderStatus::Confirmed, "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unknown_status_tag_surfaces_decode_error() {
        let db = test_db().await;
        checkout_order(&db, "o-1", "u-1", Utc::now()).await;

        // Simulate a row written by a newer schema version
        sqlx::query("UPDATE orders SET status = 'SHIPPED' WHERE id = 'o-1'")
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.orders().get("o-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn malformed_location_degrades_to_none() {
        let db = test_db().await;
        checkout_order(&db, "o-1", "u-1", Utc::now()).await;

        sqlx::query("UPDATE orders SET delivery_location = 'not,a,pair,of,numbers' WHERE id = 'o-1'")
            .execute(db.pool())
            .await
            .unwrap();

        let order = db.orders().get("o-1").await.unwrap().unwrap();
        assert_eq!(order.delivery_location, None);
    }

    #[tokio::test]
    async fn refund_update_is_bounds_checked() {
        let db = test_db().await;
        checkout_order(&db, "o-1", "u-1", Utc::now()).await;

        db.orders()
            .update_refund("o-1", RefundStatus::Initiated, Money::from_rupees(100))
            .await
            .unwrap();
        let order = db.orders().get("o-1").await.unwrap().unwrap();
        assert_eq!(order.refund_status, Some(RefundStatus::Initiated));
        assert_eq!(order.refund_amount, Some(Money::from_rupees(100)));

        // Exceeds the order total
        let err = db
            .orders()
            .update_refund("o-1", RefundStatus::Initiated, Money::from_rupees(10_000))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(_)));
    }

    #[tokio::test]
    async fn delete_cascades_to_owned_rows() {
        let db = test_db().await;
        checkout_order(&db, "o-1", "u-1", Utc::now()).await;
        db.orders()
            .upsert_delivery_person(&DeliveryPerson {
                order_id: "o-1".to_string(),
                name: "Ravi".to_string(),
                phone: "+91 90000 00000".to_string(),
                vehicle: VehicleType::Bike,
                location: None,
                sharing_location: false,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        db.orders().delete("o-1").await.unwrap();

        assert!(db.orders().get("o-1").await.unwrap().is_none());
        assert!(db.orders().items("o-1").await.unwrap().is_empty());
        assert!(db.orders().tracking("o-1").await.unwrap().is_empty());
        assert!(db.orders().delivery_person("o-1").await.unwrap().is_none());

        // No orphans left behind in the raw tables either
        let orphans: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM cart_items) + \
                    (SELECT COUNT(*) FROM order_tracking) + \
                    (SELECT COUNT(*) FROM delivery_people)",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn tracking_append_requires_existing_order() {
        let db = test_db().await;
        let err = db
            .orders()
            .append_tracking(&placed_entry("missing", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { .. }));
    }

    #[tokio::test]
    async fn delivery_location_ping_updates_in_place() {
        let db = test_db().await;
        checkout_order(&db, "o-1", "u-1", Utc::now()).await;
        db.orders()
            .upsert_delivery_person(&DeliveryPerson {
                order_id: "o-1".to_string(),
                name: "Ravi".to_string(),
                phone: "+91 90000 00000".to_string(),
                vehicle: VehicleType::Scooter,
                location: None,
                sharing_location: false,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        db.orders()
            .update_delivery_location("o-1", Some(GeoPoint::new(13.0, 77.6)), true)
            .await
            .unwrap();

        let person = db.orders().delivery_person("o-1").await.unwrap().unwrap();
        assert_eq!(person.location, Some(GeoPoint::new(13.0, 77.6)));
        assert!(person.sharing_location);
        assert_eq!(person.name, "Ravi");

        let err = db
            .orders()
            .update_delivery_location("missing", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn live_query_sees_initial_empty_then_insert() {
        let db = test_db().await;
        let mut live = db.orders().watch_for_user("u-1").await.unwrap();

        // Immediate empty snapshot without any write
        assert!(live.snapshot().is_empty());

        checkout_order(&db, "o-1", "u-1", Utc::now()).await;

        let orders = timeout(StdDuration::from_secs(5), live.changed())
            .await
            .expect("live query should emit after the write")
            .expect("store still open");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, "o-1");
    }

    #[tokio::test]
    async fn live_query_filters_by_user() {
        let db = test_db().await;
        checkout_order(&db, "o-mine", "u-1", Utc::now()).await;
        let mut live = db.orders().watch_for_user("u-1").await.unwrap();
        assert_eq!(live.snapshot().len(), 1);

        // A write for another user refreshes the view but the filter holds
        checkout_order(&db, "o-theirs", "u-2", Utc::now()).await;
        let orders = timeout(StdDuration::from_secs(5), live.changed())
            .await
            .expect("refresh after write")
            .expect("store still open");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, "o-mine");
    }
}
