//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing a subscription id with a connect
//! attempt number at compile time.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SubscriptionId
// ============================================================================

/// Identifies one subscriber callback registered with a manager.
///
/// Ids are issued from a monotonic counter owned by the registry, so two
/// subscriptions on the same manager never share an id. The numeric value
/// is opaque to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates an id from a raw counter value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// AttemptId
// ============================================================================

/// Numbers one connect attempt.
///
/// Transport events carry the attempt they belong to so that events from a
/// superseded transport are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AttemptId(u64);

impl AttemptId {
    /// Returns the id of the attempt following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw attempt number.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_id_display() {
        assert_eq!(SubscriptionId::new(7).to_string(), "sub-7");
        assert_eq!(SubscriptionId::new(7).as_u64(), 7);
    }

    #[test]
    fn test_attempt_id_next() {
        let first = AttemptId::default().next();
        assert_eq!(first.as_u64(), 1);
        assert!(first.next() > first);
    }
}
