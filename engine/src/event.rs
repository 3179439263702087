//! Wake-up events delivered by the host event loop.

use std::fmt;

use crate::storage::PageId;

/// A notification that something a suspended operation may be waiting on has
/// happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A page fetch finished, successfully or not; the page's next `acquire`
    /// reports the outcome.
    PageReady(PageId),
    /// Network activity on a connection.
    Network,
    /// A timer fired.
    Timer,
}

impl Event {
    /// Short name of the event kind, for logs and errors.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::PageReady(_) => EventKind::Disk,
            Self::Network => EventKind::Network,
            Self::Timer => EventKind::Timer,
        }
    }
}

/// Event kinds without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Disk,
    Network,
    Timer,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disk => write!(f, "disk"),
            Self::Network => write!(f, "network"),
            Self::Timer => write!(f, "timer"),
        }
    }
}
