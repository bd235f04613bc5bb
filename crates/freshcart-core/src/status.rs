//! # Enumerated Status Types
//!
//! Closed sets of values for order status, payment method, refund status,
//! return status, return reason, vehicle type, and theme kind.
//!
//! ## Wire Format
//! Every enum persists as an explicit UPPER_SNAKE tag returned by
//! `as_str()`. Tags are part of the on-disk contract: external tools
//! reading the raw store file match on these strings, so they are written
//! out variant by variant and NEVER derived from the Rust identifier.
//! Renaming a variant must not change its tag without a migration.
//!
//! Parsing an unknown tag fails with [`DecodeError`] — old rows written by
//! a different schema version are surfaced, not silently defaulted.
//!
//! ## Lifecycles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Order                                                              │
//! │  PLACED → CONFIRMED → PACKED → OUT_FOR_DELIVERY → DELIVERED         │
//! │     │         │          │                                          │
//! │     └─────────┴──────────┴──► CANCELLED                             │
//! │                                                                     │
//! │  Return                                                             │
//! │  REQUESTED ──► APPROVED → PICKUP_SCHEDULED → PICKED_UP              │
//! │      │                                           │                  │
//! │      └──► REJECTED (terminal)                    ▼                  │
//! │                               REFUNDED ◄── VERIFIED                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Checkout completed, awaiting store confirmation.
    Placed,
    /// Store accepted the order.
    Confirmed,
    /// Items picked and packed.
    Packed,
    /// Handed to a delivery person.
    OutForDelivery,
    /// Delivered to the customer (terminal).
    Delivered,
    /// Cancelled before dispatch completed (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Canonical persisted tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Packed => "PACKED",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parses a persisted tag.
    pub fn parse(tag: &str) -> Result<Self, DecodeError> {
        match tag {
            "PLACED" => Ok(OrderStatus::Placed),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "PACKED" => Ok(OrderStatus::Packed),
            "OUT_FOR_DELIVERY" => Ok(OrderStatus::OutForDelivery),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DecodeError::new("OrderStatus", other)),
        }
    }

    /// Whether `next` is a legal forward transition from `self`.
    ///
    /// Cancellation is allowed up to (not including) OUT_FOR_DELIVERY.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Placed, Confirmed)
                | (Placed, Cancelled)
                | (Confirmed, Packed)
                | (Confirmed, Cancelled)
                | (Packed, OutForDelivery)
                | (Packed, Cancelled)
                | (OutForDelivery, Delivered)
        )
    }

    /// Terminal states admit no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// All variants, in lifecycle order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Placed,
        OrderStatus::Confirmed,
        OrderStatus::Packed,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Placed
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid (or will pay) for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Pay the delivery person in cash.
    CashOnDelivery,
    /// Card via the payment gateway.
    Card,
    /// UPI via the payment gateway.
    Upi,
    /// FreshCart wallet balance.
    Wallet,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "CASH_ON_DELIVERY",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Wallet => "WALLET",
        }
    }

    pub fn parse(tag: &str) -> Result<Self, DecodeError> {
        match tag {
            "CASH_ON_DELIVERY" => Ok(PaymentMethod::CashOnDelivery),
            "CARD" => Ok(PaymentMethod::Card),
            "UPI" => Ok(PaymentMethod::Upi),
            "WALLET" => Ok(PaymentMethod::Wallet),
            other => Err(DecodeError::new("PaymentMethod", other)),
        }
    }

    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::CashOnDelivery,
        PaymentMethod::Card,
        PaymentMethod::Upi,
        PaymentMethod::Wallet,
    ];
}

// =============================================================================
// Refund Status
// =============================================================================

/// Progress of a refund against an order or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Initiated,
    Completed,
    Failed,
}

impl RefundStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "PENDING",
            RefundStatus::Initiated => "INITIATED",
            RefundStatus::Completed => "COMPLETED",
            RefundStatus::Failed => "FAILED",
        }
    }

    pub fn parse(tag: &str) -> Result<Self, DecodeError> {
        match tag {
            "PENDING" => Ok(RefundStatus::Pending),
            "INITIATED" => Ok(RefundStatus::Initiated),
            "COMPLETED" => Ok(RefundStatus::Completed),
            "FAILED" => Ok(RefundStatus::Failed),
            other => Err(DecodeError::new("RefundStatus", other)),
        }
    }

    pub const ALL: [RefundStatus; 4] = [
        RefundStatus::Pending,
        RefundStatus::Initiated,
        RefundStatus::Completed,
        RefundStatus::Failed,
    ];
}

// =============================================================================
// Return Status
// =============================================================================

/// The lifecycle status of a post-delivery return request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnStatus {
    /// Customer filed the request; awaiting admin review.
    Requested,
    /// Admin approved; pickup to be scheduled.
    Approved,
    /// Admin rejected (terminal).
    Rejected,
    /// Pickup slot assigned.
    PickupScheduled,
    /// Items collected from the customer.
    PickedUp,
    /// Warehouse verified the returned items.
    Verified,
    /// Refund issued (terminal).
    Refunded,
}

impl ReturnStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Requested => "REQUESTED",
            ReturnStatus::Approved => "APPROVED",
            ReturnStatus::Rejected => "REJECTED",
            ReturnStatus::PickupScheduled => "PICKUP_SCHEDULED",
            ReturnStatus::PickedUp => "PICKED_UP",
            ReturnStatus::Verified => "VERIFIED",
            ReturnStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(tag: &str) -> Result<Self, DecodeError> {
        match tag {
            "REQUESTED" => Ok(ReturnStatus::Requested),
            "APPROVED" => Ok(ReturnStatus::Approved),
            "REJECTED" => Ok(ReturnStatus::Rejected),
            "PICKUP_SCHEDULED" => Ok(ReturnStatus::PickupScheduled),
            "PICKED_UP" => Ok(ReturnStatus::PickedUp),
            "VERIFIED" => Ok(ReturnStatus::Verified),
            "REFUNDED" => Ok(ReturnStatus::Refunded),
            other => Err(DecodeError::new("ReturnStatus", other)),
        }
    }

    /// Whether `next` is a legal forward transition from `self`.
    ///
    /// Every phase must be walked in order; there are no shortcuts from
    /// REQUESTED to the pickup phases.
    pub fn can_transition_to(self, next: ReturnStatus) -> bool {
        use ReturnStatus::*;
        matches!(
            (self, next),
            (Requested, Approved)
                | (Requested, Rejected)
                | (Approved, PickupScheduled)
                | (PickupScheduled, PickedUp)
                | (PickedUp, Verified)
                | (Verified, Refunded)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ReturnStatus::Rejected | ReturnStatus::Refunded)
    }

    pub const ALL: [ReturnStatus; 7] = [
        ReturnStatus::Requested,
        ReturnStatus::Approved,
        ReturnStatus::Rejected,
        ReturnStatus::PickupScheduled,
        ReturnStatus::PickedUp,
        ReturnStatus::Verified,
        ReturnStatus::Refunded,
    ];
}

impl Default for ReturnStatus {
    fn default() -> Self {
        ReturnStatus::Requested
    }
}

// =============================================================================
// Return Reason
// =============================================================================

/// Why the customer is returning items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnReason {
    Damaged,
    WrongItem,
    Expired,
    QualityIssue,
    MissingItem,
    Other,
}

impl ReturnReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReturnReason::Damaged => "DAMAGED",
            ReturnReason::WrongItem => "WRONG_ITEM",
            ReturnReason::Expired => "EXPIRED",
            ReturnReason::QualityIssue => "QUALITY_ISSUE",
            ReturnReason::MissingItem => "MISSING_ITEM",
            ReturnReason::Other => "OTHER",
        }
    }

    pub fn parse(tag: &str) -> Result<Self, DecodeError> {
        match tag {
            "DAMAGED" => Ok(ReturnReason::Damaged),
            "WRONG_ITEM" => Ok(ReturnReason::WrongItem),
            "EXPIRED" => Ok(ReturnReason::Expired),
            "QUALITY_ISSUE" => Ok(ReturnReason::QualityIssue),
            "MISSING_ITEM" => Ok(ReturnReason::MissingItem),
            "OTHER" => Ok(ReturnReason::Other),
            other => Err(DecodeError::new("ReturnReason", other)),
        }
    }

    pub const ALL: [ReturnReason; 6] = [
        ReturnReason::Damaged,
        ReturnReason::WrongItem,
        ReturnReason::Expired,
        ReturnReason::QualityIssue,
        ReturnReason::MissingItem,
        ReturnReason::Other,
    ];
}

// =============================================================================
// Vehicle Type
// =============================================================================

/// Delivery person's vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Bike,
    Scooter,
    Bicycle,
    Van,
}

impl VehicleType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Bike => "BIKE",
            VehicleType::Scooter => "SCOOTER",
            VehicleType::Bicycle => "BICYCLE",
            VehicleType::Van => "VAN",
        }
    }

    pub fn parse(tag: &str) -> Result<Self, DecodeError> {
        match tag {
            "BIKE" => Ok(VehicleType::Bike),
            "SCOOTER" => Ok(VehicleType::Scooter),
            "BICYCLE" => Ok(VehicleType::Bicycle),
            "VAN" => Ok(VehicleType::Van),
            other => Err(DecodeError::new("VehicleType", other)),
        }
    }

    pub const ALL: [VehicleType; 4] = [
        VehicleType::Bike,
        VehicleType::Scooter,
        VehicleType::Bicycle,
        VehicleType::Van,
    ];
}

// =============================================================================
// Theme Kind
// =============================================================================

/// Key for the keyed-by-theme presentation settings rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThemeKind {
    Festival,
    BlackFriday,
}

impl ThemeKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ThemeKind::Festival => "FESTIVAL",
            ThemeKind::BlackFriday => "BLACK_FRIDAY",
        }
    }

    pub fn parse(tag: &str) -> Result<Self, DecodeError> {
        match tag {
            "FESTIVAL" => Ok(ThemeKind::Festival),
            "BLACK_FRIDAY" => Ok(ThemeKind::BlackFriday),
            other => Err(DecodeError::new("ThemeKind", other)),
        }
    }

    pub const ALL: [ThemeKind; 2] = [ThemeKind::Festival, ThemeKind::BlackFriday];
}

// =============================================================================
// Unit Tests
// =============================================================================
