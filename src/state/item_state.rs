/// Frontier item state definitions
///
/// Every discovered URL goes through exactly one transition out of `Pending`.
use crate::CartographerError;
use std::fmt;

/// Represents the processing state of one frontier item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    // ===== Active State =====
    /// Item has been taken from the frontier and not yet decided
    Pending,

    // ===== Terminal States =====
    /// Item failed the scope policy and was dropped without side effects
    Skipped,

    /// A document already existed for the URL; only a reference was added
    Merged,

    /// A new document was fetched and inserted into the graph
    Fetched,
}

impl ItemState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if the transition `self -> next` is allowed
    pub fn can_transition_to(&self, next: ItemState) -> bool {
        !self.is_terminal() && next.is_terminal()
    }

    /// Performs a validated transition
    ///
    /// # Errors
    ///
    /// Returns `CartographerError::InvalidTransition` when leaving a terminal
    /// state or staying in `Pending`.
    pub fn transition(self, next: ItemState) -> Result<ItemState, CartographerError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CartographerError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Short lowercase label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Merged => "merged",
            Self::Fetched => "fetched",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
