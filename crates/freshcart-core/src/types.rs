//! # Domain Types
//!
//! Entity records persisted by the FreshCart local store.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Order ──┬── CartItem           (many, cascade-delete)              │
//! │          ├── OrderTrackingEntry (many, append-only, cascade)        │
//! │          └── DeliveryPerson     (at most one, cascade)              │
//! │                                                                     │
//! │  ReturnRequest ── ReturnItem    (many, cascade-delete)              │
//! │                                                                     │
//! │  Store, FeeConfiguration, InvoiceSettings, ThemeSettings            │
//! │                                 (independent lifecycles)            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity has a UUID v4 `String` id and `DateTime<Utc>` timestamps.
//! Orders are built only through [`Checkout::into_order`], which is where
//! the total-consistency invariant is established.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::fees::FeeConfiguration;
use crate::geo::GeoPoint;
use crate::money::Money;
use crate::status::{
    OrderStatus, PaymentMethod, RefundStatus, ReturnReason, ReturnStatus, ThemeKind, VehicleType,
};

// =============================================================================
// Order
// =============================================================================

/// A purchase transaction.
///
/// Totals satisfy
/// `final_total = subtotal + handling + delivery + tax + rain - discount`,
/// established at checkout and re-checked by [`Order::verify_totals`]
/// before any write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// Fulfilling store, if one was resolved at checkout.
    pub store_id: Option<String>,

    pub subtotal: Money,
    pub handling_fee: Money,
    pub delivery_fee: Money,
    pub tax_amount: Money,
    pub rain_fee: Money,
    pub discount_amount: Money,
    pub final_total: Money,

    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub delivery_location: Option<GeoPoint>,

    pub status: OrderStatus,
    pub refund_status: Option<RefundStatus>,
    pub refund_amount: Option<Money>,

    /// Scheduled-delivery date and time slot, when the customer picked one.
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_slot: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Checks the total-consistency invariant.
    pub fn verify_totals(&self) -> CoreResult<()> {
        let expected = self.subtotal
            + self.handling_fee
            + self.delivery_fee
            + self.tax_amount
            + self.rain_fee
            - self.discount_amount;
        if self.final_total == expected {
            Ok(())
        } else {
            Err(CoreError::InconsistentTotals {
                order_id: self.id.clone(),
            })
        }
    }

    /// Records the gateway refund state against this order.
    pub fn set_refund(&mut self, status: RefundStatus, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        if amount.is_negative() || amount > self.final_total {
            return Err(CoreError::InvalidRefundAmount {
                order_id: self.id.clone(),
            });
        }
        self.refund_status = Some(status);
        self.refund_amount = Some(amount);
        self.updated_at = now;
        Ok(())
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Everything the customer decided before paying. Turned into an [`Order`]
/// by applying the current [`FeeConfiguration`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    pub user_id: String,
    pub store_id: Option<String>,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub delivery_location: Option<GeoPoint>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_slot: Option<String>,
}

impl Checkout {
    /// Builds the order record. The only place totals are computed.
    pub fn into_order(self, fees: &FeeConfiguration, id: String, now: DateTime<Utc>) -> Order {
        let quote = fees.quote(self.subtotal);
        let final_total = quote.final_total(self.subtotal, self.discount_amount);

        Order {
            id,
            user_id: self.user_id,
            store_id: self.store_id,
            subtotal: self.subtotal,
            handling_fee: quote.handling_fee,
            delivery_fee: quote.delivery_fee,
            tax_amount: quote.tax_amount,
            rain_fee: quote.rain_fee,
            discount_amount: self.discount_amount,
            final_total,
            payment_method: self.payment_method,
            delivery_address: self.delivery_address,
            delivery_location: self.delivery_location,
            status: OrderStatus::Placed,
            refund_status: None,
            refund_amount: None,
            scheduled_date: self.scheduled_date,
            scheduled_slot: self.scheduled_slot,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A line item belonging to exactly one order.
///
/// Product details are snapshots frozen at checkout; later catalog edits
/// must not rewrite order history. Quantity is fractional for weight-based
/// produce (0.5 kg tomatoes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub quantity: f64,
    pub unit_price: Money,
    /// Pre-discount price, when the item was on offer.
    pub original_price: Option<Money>,
}

// =============================================================================
// Order Tracking Entry
// =============================================================================

/// An immutable, append-only event in an order's status history.
///
/// Entries are only ever inserted, read back in timestamp-ascending order,
/// and cascade-deleted with the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTrackingEntry {
    pub id: String,
    pub order_id: String,
    pub status: OrderStatus,
    /// Human-readable message shown on the tracking screen.
    pub message: String,
    pub eta_minutes: Option<i64>,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Delivery Person
// =============================================================================

/// The rider assigned to an order. At most one per order (keyed by
/// `order_id`); mutated repeatedly as location pings arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPerson {
    pub order_id: String,
    pub name: String,
    pub phone: String,
    pub vehicle: VehicleType,
    pub location: Option<GeoPoint>,
    /// Whether the rider is currently sharing live location.
    pub sharing_location: bool,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Store
// =============================================================================

/// A fulfillment location. Independent lifecycle; never owned by an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    pub postal_code: Option<String>,
    pub is_active: bool,
    pub service_radius_km: f64,
    /// When false, the store serves any address regardless of radius.
    pub service_area_enabled: bool,
    /// Fallback store used when no store covers the address.
    pub is_default_fallback: bool,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

// =============================================================================
// Return Request
// =============================================================================

/// A post-delivery return/refund workflow instance. One per order by
/// business rule (enforced in the repository, not the schema).
///
/// Phase timestamps are set exactly once, by the transition that completes
/// the phase, and are monotonically non-decreasing along the lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub id: String,
    pub order_id: String,
    pub user_id: String,
    pub reason: ReturnReason,
    pub description: Option<String>,
    pub status: ReturnStatus,

    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub pickup_scheduled_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,

    /// Admin who reviewed the request.
    pub reviewed_by: Option<String>,
    pub admin_comment: Option<String>,

    pub refund_status: Option<RefundStatus>,
    pub refund_amount: Option<Money>,
}

impl ReturnRequest {
    /// Creates a freshly-filed request in REQUESTED state.
    pub fn new(
        id: String,
        order_id: String,
        user_id: String,
        reason: ReturnReason,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        ReturnRequest {
            id,
            order_id,
            user_id,
            reason,
            description,
            status: ReturnStatus::Requested,
            requested_at: now,
            reviewed_at: None,
            pickup_scheduled_at: None,
            picked_up_at: None,
            verified_at: None,
            reviewed_by: None,
            admin_comment: None,
            refund_status: None,
            refund_amount: None,
        }
    }

    /// Timestamp of the most recently completed phase.
    fn last_phase(&self) -> (&'static str, DateTime<Utc>) {
        if let Some(at) = self.verified_at {
            ("verified", at)
        } else if let Some(at) = self.picked_up_at {
            ("picked-up", at)
        } else if let Some(at) = self.pickup_scheduled_at {
            ("pickup-scheduled", at)
        } else if let Some(at) = self.reviewed_at {
            ("reviewed", at)
        } else {
            ("requested", self.requested_at)
        }
    }

    /// Advances the workflow, guarding the transition and stamping the
    /// phase timestamp.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidReturnTransition`] if the state machine
    ///   forbids `self.status → next`
    /// - [`CoreError::PhaseTimestampRegression`] if `now` precedes the
    ///   previous phase's timestamp
    pub fn transition(&mut self, next: ReturnStatus, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidReturnTransition {
                return_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        let (previous_phase, at) = self.last_phase();
        if now < at {
            return Err(CoreError::PhaseTimestampRegression {
                return_id: self.id.clone(),
                previous_phase,
            });
        }

        match next {
            ReturnStatus::Approved | ReturnStatus::Rejected => self.reviewed_at = Some(now),
            ReturnStatus::PickupScheduled => self.pickup_scheduled_at = Some(now),
            ReturnStatus::PickedUp => self.picked_up_at = Some(now),
            ReturnStatus::Verified => self.verified_at = Some(now),
            // Refund keeps the verified timestamp; the refund fields carry
            // the gateway state.
            ReturnStatus::Refunded => {}
            ReturnStatus::Requested => unreachable!("no transition re-enters REQUESTED"),
        }
        self.status = next;
        Ok(())
    }
}

// =============================================================================
// Return Item
// =============================================================================

/// A line item of a return request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub id: String,
    pub return_id: String,
    pub product_id: String,
    pub name: String,
    pub quantity: f64,
    /// Per-item override of the request-level reason.
    pub reason: Option<ReturnReason>,
}

// =============================================================================
// Invoice Settings
// =============================================================================

/// Invoicing metadata singleton. Read at render time; no coupling to the
/// order lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSettings {
    pub business_name: String,
    pub business_address: String,
    pub gst_number: Option<String>,
    pub support_phone: Option<String>,
    pub support_email: Option<String>,
    pub footer_note: Option<String>,
    pub show_tax_breakdown: bool,
    pub updated_at: DateTime<Utc>,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        InvoiceSettings {
            business_name: "FreshCart".to_string(),
            business_address: String::new(),
            gst_number: None,
            support_phone: None,
            support_email: None,
            footer_note: None,
            show_tax_breakdown: true,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

// =============================================================================
// Theme Settings
// =============================================================================

/// Presentation settings for a seasonal theme, keyed by [`ThemeKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSettings {
    pub kind: ThemeKind,
    pub enabled: bool,
    pub banner_text: Option<String>,
    /// Hex color, e.g. `"#e63946"`.
    pub accent_color: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ThemeSettings {
    /// Disabled defaults for a theme that has never been configured.
    pub fn disabled(kind: ThemeKind) -> Self {
        ThemeSettings {
            kind,
            enabled: false,
            banner_text: None,
            accent_color: None,
            starts_at: None,
            ends_at: None,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
