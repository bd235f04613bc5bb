//! # freshcart-core: Pure Business Logic for FreshCart
//!
//! This crate is the **heart** of the FreshCart client's order and returns
//! handling. It contains all business logic as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    FreshCart Client Architecture                    │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │              UI / view models (out of scope)                  │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │             ★ freshcart-core (THIS CRATE) ★                   │  │
//! │  │                                                               │  │
//! │  │  ┌─────────┐ ┌────────┐ ┌───────┐ ┌───────┐ ┌─────────────┐  │  │
//! │  │  │ status  │ │ types  │ │ money │ │ fees  │ │ geo/payment │  │  │
//! │  │  │ enums + │ │ Order  │ │ Money │ │ fee   │ │ GeoPoint    │  │  │
//! │  │  │ guards  │ │ Return │ │Percent│ │ math  │ │ HMAC verify │  │  │
//! │  │  └─────────┘ └────────┘ └───────┘ └───────┘ └─────────────┘  │  │
//! │  │                                                               │  │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │                freshcart-db (storage layer)                   │  │
//! │  │        SQLite queries, migrations, repositories               │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`status`] - Enumerated statuses, wire tags, transition guards
//! - [`types`] - Entity records (Order, CartItem, ReturnRequest, ...)
//! - [`money`] - Integer-minor-unit Money and basis-point Percent
//! - [`fees`] - Fee configuration and checkout total computation
//! - [`geo`] - Geolocation pair and its `"lat,lng"` codec
//! - [`payment`] - Gateway confirmation + signature verification
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output; time is always a parameter
//! 2. **No I/O**: database, network, filesystem access is FORBIDDEN here
//! 3. **Integer money**: all monetary values in minor units (i64), no floats
//! 4. **Explicit tags**: persisted enum strings are written per-variant,
//!    never derived from identifiers
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use freshcart_core::fees::FeeConfiguration;
//! use freshcart_core::money::Money;
//! use freshcart_core::status::PaymentMethod;
//! use freshcart_core::types::Checkout;
//!
//! let checkout = Checkout {
//!     user_id: "user-1".into(),
//!     store_id: None,
//!     subtotal: Money::from_rupees(400),
//!     discount_amount: Money::zero(),
//!     payment_method: PaymentMethod::Upi,
//!     delivery_address: "12 MG Road".into(),
//!     delivery_location: None,
//!     scheduled_date: None,
//!     scheduled_slot: None,
//! };
//!
//! let order = checkout.into_order(&FeeConfiguration::default(), "order-1".into(), Utc::now());
//! assert_eq!(order.final_total, Money::from_rupees(460));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fees;
pub mod geo;
pub mod money;
pub mod payment;
pub mod status;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, DecodeError};
pub use fees::{FeeBreakdown, FeeConfiguration, FEE_CONFIGURATION_ID};
pub use geo::GeoPoint;
pub use money::{Money, Percent};
pub use payment::{payment_signature, verify_payment, PaymentConfirmation};
pub use status::{
    OrderStatus, PaymentMethod, RefundStatus, ReturnReason, ReturnStatus, ThemeKind, VehicleType,
};
pub use types::{
    CartItem, Checkout, DeliveryPerson, InvoiceSettings, Order, OrderTrackingEntry, ReturnItem,
    ReturnRequest, Store, ThemeSettings,
};
