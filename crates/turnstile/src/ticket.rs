//! Ticket value and worker identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of inventory.
///
/// Created only by the pool when a vendor batch is admitted. Sequence
/// numbers start at 1 and are assigned in strictly increasing order;
/// within one pool lifetime a number is never reused, even after the
/// ticket is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    sequence: u64,
}

impl Ticket {
    pub(crate) fn new(sequence: u64) -> Self {
        debug_assert!(sequence >= 1);
        Self { sequence }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ticket-{}", self.sequence)
    }
}

/// Producer identifier, ordinal within the configured vendor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorId(pub u32);

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vendor-{}", self.0)
    }
}

/// Consumer identifier, ordinal within the configured customer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub u32);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Customer-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_display_uses_sequence() {
        assert_eq!(Ticket::new(7).to_string(), "Ticket-7");
        assert_eq!(Ticket::new(7).sequence(), 7);
    }

    #[test]
    fn id_display() {
        assert_eq!(VendorId(3).to_string(), "Vendor-3");
        assert_eq!(CustomerId(12).to_string(), "Customer-12");
    }

    #[test]
    fn ticket_serializes_sequence() {
        let value = serde_json::to_value(Ticket::new(42)).unwrap();
        assert_eq!(value, serde_json::json!({ "sequence": 42 }));
    }
}
