//! # Fee Configuration & Checkout Math
//!
//! The fee policy singleton and the one place order totals are computed.
//!
//! ## Checkout Computation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  subtotal (from cart)                                               │
//! │     + handling_fee   (if enabled and not waived)                    │
//! │     + delivery_fee   (0 if subtotal >= free-delivery threshold)     │
//! │     + tax            (tax_rate × subtotal)                          │
//! │     + rain_fee       (if enabled AND currently active)              │
//! │     - discount                                                      │
//! │  ─────────────────────                                              │
//! │     = final_total                                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The schema does not enforce this sum;
//! [`crate::types::Checkout::into_order`] is the only constructor that
//! writes totals, and [`crate::types::Order::verify_totals`] re-checks
//! rows on their way into the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, Percent};

/// Fixed primary key of the fee-configuration singleton row.
pub const FEE_CONFIGURATION_ID: &str = "default";

// =============================================================================
// Fee Configuration
// =============================================================================

/// Current fee policy. Singleton row (id `"default"`), read at checkout,
/// mutated only by administrative action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeConfiguration {
    /// Flat handling/packaging fee.
    pub handling_fee: Money,
    pub handling_fee_enabled: bool,
    /// Waived overrides enabled without losing the configured amount.
    pub handling_fee_waived: bool,

    /// Flat delivery fee.
    pub delivery_fee: Money,
    pub delivery_fee_enabled: bool,
    pub delivery_fee_waived: bool,
    /// Carts at or above this subtotal ship free.
    pub free_delivery_threshold: Money,

    /// Tax applied to the cart subtotal.
    pub tax_rate: Percent,

    /// Weather surcharge, applied only while ops marks it active.
    pub rain_fee: Money,
    pub rain_fee_enabled: bool,
    pub rain_fee_active: bool,

    pub updated_at: DateTime<Utc>,
}

impl Default for FeeConfiguration {
    /// Built-in policy used until an admin writes the singleton row.
    fn default() -> Self {
        FeeConfiguration {
            handling_fee: Money::from_rupees(10),
            handling_fee_enabled: true,
            handling_fee_waived: false,
            delivery_fee: Money::from_rupees(30),
            delivery_fee_enabled: true,
            delivery_fee_waived: false,
            free_delivery_threshold: Money::from_rupees(500),
            tax_rate: Percent::from_bps(500),
            rain_fee: Money::from_rupees(20),
            rain_fee_enabled: false,
            rain_fee_active: false,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl FeeConfiguration {
    /// Computes the fee breakdown for a cart subtotal.
    pub fn quote(&self, subtotal: Money) -> FeeBreakdown {
        let handling_fee = if self.handling_fee_enabled && !self.handling_fee_waived {
            self.handling_fee
        } else {
            Money::zero()
        };

        let delivery_fee = if subtotal >= self.free_delivery_threshold {
            Money::zero()
        } else if self.delivery_fee_enabled && !self.delivery_fee_waived {
            self.delivery_fee
        } else {
            Money::zero()
        };

        let rain_fee = if self.rain_fee_enabled && self.rain_fee_active {
            self.rain_fee
        } else {
            Money::zero()
        };

        FeeBreakdown {
            handling_fee,
            delivery_fee,
            tax_amount: self.tax_rate.of(subtotal),
            rain_fee,
        }
    }
}

// =============================================================================
// Fee Breakdown
// =============================================================================

/// The fee components of one checkout, computed from a [`FeeConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub handling_fee: Money,
    pub delivery_fee: Money,
    pub tax_amount: Money,
    pub rain_fee: Money,
}

impl FeeBreakdown {
    /// Grand total given the cart subtotal and any discount.
    pub fn final_total(&self, subtotal: Money, discount: Money) -> Money {
        subtotal + self.handling_fee + self.delivery_fee + self.tax_amount + self.rain_fee
            - discount
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FeeConfiguration {
        FeeConfiguration {
            handling_fee: Money::from_rupees(10),
            delivery_fee: Money::from_rupees(30),
            free_delivery_threshold: Money::from_rupees(500),
            tax_rate: Percent::from_percentage(5.0),
            ..FeeConfiguration::default()
        }
    }

    #[test]
    fn standard_checkout_quote() {
        // ₹400 cart: delivery 30, handling 10, tax 20 (5% of 400)
        let quote = policy().quote(Money::from_rupees(400));
        assert_eq!(quote.delivery_fee, Money::from_rupees(30));
        assert_eq!(quote.handling_fee, Money::from_rupees(10));
        assert_eq!(quote.tax_amount, Money::from_rupees(20));
        assert_eq!(quote.rain_fee, Money::zero());
        assert_eq!(
            quote.final_total(Money::from_rupees(400), Money::zero()),
            Money::from_rupees(460)
        );
    }

    #[test]
    fn free_delivery_over_threshold() {
        let quote = policy().quote(Money::from_rupees(600));
        assert_eq!(quote.delivery_fee, Money::zero());

        // Exactly at the threshold also ships free
        let quote = policy().quote(Money::from_rupees(500));
        assert_eq!(quote.delivery_fee, Money::zero());
    }

    #[test]
    fn waived_fees_drop_to_zero() {
        let mut config = policy();
        config.handling_fee_waived = true;
        config.delivery_fee_waived = true;
        let quote = config.quote(Money::from_rupees(100));
        assert_eq!(quote.handling_fee, Money::zero());
        assert_eq!(quote.delivery_fee, Money::zero());
    }

    #[test]
    fn rain_fee_requires_enabled_and_active() {
        let mut config = policy();
        config.rain_fee = Money::from_rupees(20);
        config.rain_fee_enabled = true;

        assert_eq!(config.quote(Money::from_rupees(100)).rain_fee, Money::zero());

        config.rain_fee_active = true;
        assert_eq!(
            config.quote(Money::from_rupees(100)).rain_fee,
            Money::from_rupees(20)
        );
    }

    #[test]
    fn discount_reduces_final_total() {
        let quote = policy().quote(Money::from_rupees(400));
        assert_eq!(
            quote.final_total(Money::from_rupees(400), Money::from_rupees(50)),
            Money::from_rupees(410)
        );
    }
}
