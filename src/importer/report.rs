//! Run-level result reporting: one outcome per input node plus the explicit
//! list of codes a cycle (or cancellation) left without a terminal state.

/// Terminal outcome for one node in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    pub code: String,
    pub remote_id: Option<i64>,
    pub error: Option<String>,
    /// True when the ledger already held a completed record and no remote
    /// call was made.
    pub cached: bool,
}

impl NodeOutcome {
    pub fn success(code: impl Into<String>, remote_id: i64) -> Self {
        Self {
            code: code.into(),
            remote_id: Some(remote_id),
            error: None,
            cached: false,
        }
    }

    pub fn cached(code: impl Into<String>, remote_id: i64) -> Self {
        Self {
            cached: true,
            ..Self::success(code, remote_id)
        }
    }

    pub fn failure(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            remote_id: None,
            error: Some(error.into()),
            cached: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// Aggregate result of one import run. Partial failure is data here, not an
/// error; the engine only errors on structural problems.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<NodeOutcome>,
    /// Codes left without a terminal ledger record because wave computation
    /// stalled (cycle) or the run was cancelled.
    pub unresolved_codes: Vec<String>,
}

impl RunReport {
    pub fn new(outcomes: Vec<NodeOutcome>, unresolved_codes: Vec<String>) -> Self {
        Self {
            outcomes,
            unresolved_codes,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn cache_hits(&self) -> usize {
        self.outcomes.iter().filter(|o| o.cached).count()
    }

    pub fn outcome(&self, code: &str) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|o| o.code == code)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|outcome| {
            outcome
                .error
                .as_deref()
                .map(|error| (outcome.code.as_str(), error))
        })
    }

    /// True when every input node reached a terminal state this run.
    pub fn is_complete(&self) -> bool {
        self.unresolved_codes.is_empty()
    }
}
