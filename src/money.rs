//! Monetary rounding and ratio sanitation helpers shared by all three phases

use crate::product::Envelope;

/// Round a monetary amount to 2 decimal places.
///
/// Every amount stored in an output row goes through this at the point of
/// production so floating-point drift cannot propagate across years.
pub fn round2(amount: f64) -> f64 {
    if !amount.is_finite() {
        return 0.0;
    }
    (amount * 100.0).round() / 100.0
}

/// Clamp a rate to [0, 1]; non-finite inputs collapse to 0.
pub fn clamp_rate(rate: f64) -> f64 {
    if !rate.is_finite() {
        return 0.0;
    }
    rate.clamp(0.0, 1.0)
}

/// Coerce a possibly-missing amount to a non-negative finite number.
pub fn coerce_amount(amount: f64) -> f64 {
    if !amount.is_finite() || amount < 0.0 {
        0.0
    } else {
        amount
    }
}

/// Capitalization / distribution split of a payment.
///
/// Always sums to 1 after [`SplitRatio::sanitized`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatio {
    pub capitalization: f64,
    pub distribution: f64,
}

impl SplitRatio {
    pub fn new(capitalization: f64, distribution: f64) -> Self {
        Self { capitalization, distribution }
    }

    /// Sanitize the split for a given envelope: clamp both shares to [0, 1],
    /// renormalize so they sum to 1, fall back to full capitalization when
    /// both are 0, and force 0/100 for the real-estate fund (its capital is
    /// distribution share only).
    pub fn sanitized(self, envelope: Envelope) -> Self {
        if envelope.forces_full_distribution() {
            return Self { capitalization: 0.0, distribution: 1.0 };
        }

        let cap = clamp_rate(self.capitalization);
        let dist = clamp_rate(self.distribution);
        let total = cap + dist;
        if total <= 0.0 {
            Self { capitalization: 1.0, distribution: 0.0 }
        } else {
            Self { capitalization: cap / total, distribution: dist / total }
        }
    }
}
