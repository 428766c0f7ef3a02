use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Customer-visible order statuses. `Collected` is transient: it is rewritten
/// to `Completed` before anything is persisted, so no row ever stores the
/// literal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Collected,
    Completed,
}

pub const COMPLETED: &str = "completed";

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Collected => "collected",
            OrderStatus::Completed => COMPLETED,
        }
    }

    /// Collapses `Collected` into the terminal `Completed` state.
    pub fn normalize(self) -> OrderStatus {
        match self {
            OrderStatus::Collected => OrderStatus::Completed,
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.normalize(), OrderStatus::Completed)
    }

    fn rank(&self) -> u8 {
        match self.normalize() {
            OrderStatus::Pending => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Ready => 2,
            OrderStatus::Completed => 3,
            OrderStatus::Collected => unreachable!(),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "collected" => Ok(OrderStatus::Collected),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(format!("Unknown order status '{other}'")),
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Forward-only transition check. A backward move would resurrect completed
/// orders on the dashboard, so the state machine rejects it outright.
/// Same-state writes are rejected too.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    if from.is_terminal() {
        return false;
    }
    to.normalize().rank() > from.rank()
}

/// Validates a requested transition and returns the status that must actually
/// be persisted (`collected` → `completed`).
pub fn apply_transition(current: OrderStatus, requested: OrderStatus) -> Result<OrderStatus, String> {
    if !can_transition(current, requested) {
        return Err(format!(
            "Illegal status transition from '{current}' to '{requested}'"
        ));
    }
    Ok(requested.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collected_normalizes_to_completed() {
        assert_eq!(OrderStatus::Collected.normalize(), OrderStatus::Completed);
        assert_eq!(apply_transition(OrderStatus::Ready, OrderStatus::Collected).unwrap(), OrderStatus::Completed);
    }

    #[test]
    fn forward_transitions_allowed() {
        assert!(can_transition(OrderStatus::Pending, OrderStatus::Preparing));
        assert!(can_transition(OrderStatus::Preparing, OrderStatus::Ready));
        assert!(can_transition(OrderStatus::Ready, OrderStatus::Collected));
        assert!(can_transition(OrderStatus::Pending, OrderStatus::Completed));
    }

    #[test]
    fn backward_and_same_state_rejected() {
        assert!(!can_transition(OrderStatus::Ready, OrderStatus::Preparing));
        assert!(!can_transition(OrderStatus::Preparing, OrderStatus::Preparing));
        assert!(!can_transition(OrderStatus::Completed, OrderStatus::Pending));
        assert!(!can_transition(OrderStatus::Collected, OrderStatus::Ready));
    }

    #[test]
    fn terminal_state_is_final() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Collected.is_terminal());
        assert!(apply_transition(OrderStatus::Completed, OrderStatus::Ready).is_err());
    }

    #[test]
    fn unknown_status_string_is_an_error() {
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert_eq!("ready".parse::<OrderStatus>().unwrap(), OrderStatus::Ready);
    }
}
