//! # Error Types
//!
//! Domain-specific error types for freshcart-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  freshcart-core errors (this file)                                  │
//! │  ├── DecodeError  - Persisted tag cannot be parsed back             │
//! │  └── CoreError    - Business rule violations (transition guards,    │
//! │                     total consistency, signature mismatch)          │
//! │                                                                     │
//! │  freshcart-db errors (separate crate)                               │
//! │  └── StoreError   - Storage operation failures, wraps CoreError     │
//! │                                                                     │
//! │  Flow: DecodeError → CoreError → StoreError → caller                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (entity, id, offending value)
//! 3. Errors are enum variants, never String
//! 4. Absence is `Option`, never an error: "row not found" is `Ok(None)`

use thiserror::Error;

use crate::status::{OrderStatus, ReturnStatus};

// =============================================================================
// Decode Error
// =============================================================================

/// A persisted value could not be converted back to its domain type.
///
/// ## When This Occurs
/// - A status column holds a tag no current enum variant claims
///   (schema drift: a variant was renamed/removed without a migration)
/// - Raised at read time so corrupt rows are surfaced, never silently
///   defaulted
///
/// Geolocation pairs are the one deliberate exception: a malformed
/// `"lat,lng"` string degrades to "no location" (see [`crate::geo`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {what} tag: '{value}'")]
pub struct DecodeError {
    /// The type being decoded, e.g. `"OrderStatus"`.
    pub what: &'static str,
    /// The offending persisted value.
    pub value: String,
}

impl DecodeError {
    pub fn new(what: &'static str, value: impl Into<String>) -> Self {
        DecodeError {
            what,
            value: value.into(),
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. They should be caught by the
/// calling layer and translated to user-facing behavior (retry/fallback
/// affordances live in the UI, outside this crate).
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested order status change is not a legal transition.
    ///
    /// ## When This Occurs
    /// - Marking a CANCELLED order DELIVERED
    /// - Jumping PLACED → OUT_FOR_DELIVERY without confirmation/packing
    #[error("order {order_id}: cannot move from {from:?} to {to:?}")]
    InvalidOrderTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The requested return status change is not a legal transition.
    ///
    /// ## When This Occurs
    /// - Marking a REQUESTED return PICKED_UP (skipping approval)
    /// - Any change out of the terminal REJECTED / REFUNDED states
    #[error("return {return_id}: cannot move from {from:?} to {to:?}")]
    InvalidReturnTransition {
        return_id: String,
        from: ReturnStatus,
        to: ReturnStatus,
    },

    /// A lifecycle phase timestamp would precede the previous phase.
    ///
    /// Each forward transition must carry a timestamp at or after the one
    /// it follows; clock skew between callers is rejected rather than
    /// written into the history.
    #[error("return {return_id}: transition timestamp precedes the {previous_phase} phase")]
    PhaseTimestampRegression {
        return_id: String,
        previous_phase: &'static str,
    },

    /// An order's stored totals do not satisfy
    /// `final_total = subtotal + handling + delivery + tax + rain - discount`.
    ///
    /// Totals are computed once at checkout; any order failing this check
    /// was built by hand and must not reach the store.
    #[error("order {order_id}: stored totals are inconsistent")]
    InconsistentTotals { order_id: String },

    /// A refund amount was negative or exceeded the order total.
    #[error("order {order_id}: invalid refund amount")]
    InvalidRefundAmount { order_id: String },

    /// Decode failure (wraps [`DecodeError`]).
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_message() {
        let err = DecodeError::new("OrderStatus", "SHIPPED");
        assert_eq!(err.to_string(), "unrecognized OrderStatus tag: 'SHIPPED'");
    }

    #[test]
    fn decode_converts_to_core_error() {
        let err: CoreError = DecodeError::new("ReturnReason", "BROKEN").into();
        assert!(matches!(err, CoreError::Decode(_)));
    }

    #[test]
    fn transition_error_message() {
        let err = CoreError::InvalidReturnTransition {
            return_id: "r-1".to_string(),
            from: ReturnStatus::Requested,
            to: ReturnStatus::PickedUp,
        };
        assert_eq!(
            err.to_string(),
            "return r-1: cannot move from Requested to PickedUp"
        );
    }
}
