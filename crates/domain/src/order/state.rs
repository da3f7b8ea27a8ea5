//! Order, line and payment state machines.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Confirmed ──► Processing ──► Shipped ──► Delivered
///    │            │             │             │
///    ├────────────┴─────────────┴──► Cancelled│
///    └────────────┴─────────────┴─────────────┴──► Returned ──► Refunded
/// ```
///
/// `Refunded` is also reachable directly from every non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order is built but stock is not yet held for every line.
    #[default]
    Pending,

    /// Every line holds a reservation.
    Confirmed,

    /// Order is being picked and packed.
    Processing,

    /// Order has left the warehouse; reservations are consumed.
    Shipped,

    /// Order reached the customer (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,

    /// Goods came back from the customer.
    Returned,

    /// Payment was returned to the customer (terminal state).
    Refunded,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
        OrderStatus::Refunded,
    ];

    /// Returns true if the order may move from this status to `to`.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Confirmed, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending | Confirmed | Processing, Cancelled)
                | (Pending | Confirmed | Processing | Shipped, Returned)
                | (Pending | Confirmed | Processing | Shipped | Returned, Refunded)
        )
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    /// Returns true once goods have left the warehouse.
    pub fn is_shipped_or_later(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    /// Returns true while the order's lines still hold stock reservations.
    pub fn holds_reservations(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Returned => "RETURNED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Status of a single order line.
///
/// Lines follow the parent order through [`LineStatus::following`], but
/// keep their own value so a line can lag or diverge from the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    #[default]
    Pending,
    Reserved,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl LineStatus {
    /// Returns the line status implied by the parent order entering `status`,
    /// or `None` when the order's move leaves lines as they are.
    pub fn following(status: OrderStatus) -> Option<LineStatus> {
        match status {
            OrderStatus::Pending => Some(LineStatus::Pending),
            OrderStatus::Confirmed | OrderStatus::Processing => Some(LineStatus::Reserved),
            OrderStatus::Shipped => Some(LineStatus::Shipped),
            OrderStatus::Delivered => Some(LineStatus::Delivered),
            OrderStatus::Cancelled => Some(LineStatus::Cancelled),
            OrderStatus::Returned => Some(LineStatus::Returned),
            OrderStatus::Refunded => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Pending => "PENDING",
            LineStatus::Reserved => "RESERVED",
            LineStatus::Shipped => "SHIPPED",
            LineStatus::Delivered => "DELIVERED",
            LineStatus::Cancelled => "CANCELLED",
            LineStatus::Returned => "RETURNED",
        }
    }
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LineStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(LineStatus::Pending),
            "RESERVED" => Ok(LineStatus::Reserved),
            "SHIPPED" => Ok(LineStatus::Shipped),
            "DELIVERED" => Ok(LineStatus::Delivered),
            "CANCELLED" => Ok(LineStatus::Cancelled),
            "RETURNED" => Ok(LineStatus::Returned),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_happy_path_edges() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_skipping_ahead_is_rejected() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_can_cancel_before_shipping_only() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Confirmed.can_cancel());
        assert!(OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
        assert!(!OrderStatus::Returned.can_cancel());
        assert!(!OrderStatus::Refunded.can_cancel());
    }

    #[test]
    fn test_returned_and_refunded_from_non_terminal() {
        for status in OrderStatus::ALL {
            if status.is_terminal() {
                assert!(!status.can_transition_to(OrderStatus::Refunded));
                assert!(!status.can_transition_to(OrderStatus::Returned));
            } else if status != OrderStatus::Refunded {
                assert!(status.can_transition_to(OrderStatus::Refunded), "{status}");
            }
        }
        assert!(!OrderStatus::Returned.can_transition_to(OrderStatus::Returned));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Confirmed.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Returned.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
    }

    #[test]
    fn test_holds_reservations() {
        assert!(OrderStatus::Pending.holds_reservations());
        assert!(OrderStatus::Processing.holds_reservations());
        assert!(!OrderStatus::Shipped.holds_reservations());
        assert!(!OrderStatus::Cancelled.holds_reservations());
    }

    #[test]
    fn test_display_and_parse() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!(
            "shipped".parse::<OrderStatus>().unwrap(),
            OrderStatus::Shipped
        );
        assert!("LOST".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::Processing);
    }

    #[test]
    fn test_line_status_follows_order() {
        assert_eq!(
            LineStatus::following(OrderStatus::Confirmed),
            Some(LineStatus::Reserved)
        );
        assert_eq!(
            LineStatus::following(OrderStatus::Cancelled),
            Some(LineStatus::Cancelled)
        );
        assert_eq!(LineStatus::following(OrderStatus::Refunded), None);
    }

    #[test]
    fn test_payment_status_parse() {
        assert_eq!("PAID".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert_eq!(
            "Refunded".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Refunded
        );
        assert!("VOID".parse::<PaymentStatus>().is_err());
    }
}
