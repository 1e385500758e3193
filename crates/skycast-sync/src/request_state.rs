//! Forecast request lifecycle.
//!
//! Each issued request carries a sequence number. Only the most recently
//! issued one may touch displayed state; completions for anything older are
//! superseded.

/// State of the latest issued forecast request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Pending { seq: u64 },
    Resolved { seq: u64 },
    Failed { seq: u64 },
}

/// What a completion with a given sequence number means for shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// It answers the pending request and must be applied.
    Current,
    /// A newer request was issued, or this one was already applied.
    Superseded,
}

impl RequestState {
    /// True while the latest request is outstanding.
    pub fn is_pending(self) -> bool {
        matches!(self, RequestState::Pending { .. })
    }

    /// Sequence number of the latest issued request, if any.
    pub fn latest_seq(self) -> Option<u64> {
        match self {
            RequestState::Idle => None,
            RequestState::Pending { seq }
            | RequestState::Resolved { seq }
            | RequestState::Failed { seq } => Some(seq),
        }
    }

    /// State after issuing request `seq`. Any previous pending request is
    /// superseded from here on.
    pub fn on_issued(self, seq: u64) -> Self {
        RequestState::Pending { seq }
    }

    pub fn classify(self, seq: u64) -> Completion {
        match self {
            RequestState::Pending { seq: pending } if pending == seq => Completion::Current,
            _ => Completion::Superseded,
        }
    }

    /// State after the pending request resolved. No-op unless pending.
    pub fn on_resolved(self) -> Self {
        match self {
            RequestState::Pending { seq } => RequestState::Resolved { seq },
            other => other,
        }
    }

    /// State after the pending request failed. No-op unless pending.
    pub fn on_failed(self) -> Self {
        match self {
            RequestState::Pending { seq } => RequestState::Failed { seq },
            other => other,
        }
    }
}
