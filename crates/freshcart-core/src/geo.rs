//! # Geolocation Pair
//!
//! A latitude/longitude pair and its flat persisted representation.
//!
//! ## Wire Format
//! `"<lat>,<lng>"` — two comma-separated decimal tokens, e.g.
//! `"12.9716,77.5946"`. This is the contract for the raw store file.
//!
//! Decoding is deliberately lenient in one specific way: a malformed
//! string degrades to "no location" (`None`) instead of erroring. Legacy
//! rows written by interrupted location updates must not poison an
//! otherwise readable order. This is the one converter that does NOT
//! surface a `DecodeError`.

use serde::{Deserialize, Serialize};

// =============================================================================
// GeoPoint
// =============================================================================

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }

    /// Encodes as the persisted `"<lat>,<lng>"` string.
    pub fn encode(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }

    /// Decodes a persisted string; malformed input yields `None`.
    ///
    /// Exactly two comma-separated numeric tokens are required. Anything
    /// else (empty string, one token, three tokens, non-numeric tokens,
    /// NaN/inf) is treated as "location absent".
    pub fn decode(raw: &str) -> Option<GeoPoint> {
        let mut parts = raw.split(',');
        let lat: f64 = parts.next()?.trim().parse().ok()?;
        let lng: f64 = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        Some(GeoPoint { lat, lng })
    }

    /// Decodes an optional column, collapsing NULL and malformed to `None`.
    pub fn decode_opt(raw: Option<&str>) -> Option<GeoPoint> {
        raw.and_then(GeoPoint::decode)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
