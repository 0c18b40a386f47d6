//! Per-run token budget with pre-flight admission checks.
//!
//! One `Budget` per run, owned by the run and passed by `&mut` to every call
//! site. The first admission failure sets `stopped_reason`; it is never
//! cleared or overwritten afterwards.

use tracing::{debug, warn};

use crate::pipeline::models::BudgetInfo;
use crate::pipeline::PipelineError;

#[derive(Debug, Clone)]
pub struct Budget {
    total: u64,
    used: u64,
    stopped_reason: Option<String>,
}

impl Budget {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            used: 0,
            stopped_reason: None,
        }
    }

    pub fn consume(&mut self, tokens: u64) {
        self.used = self.used.saturating_add(tokens);
        debug!("Budget consumed {tokens} tokens ({}/{})", self.used, self.total);
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.total
    }

    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn stopped_reason(&self) -> Option<&str> {
        self.stopped_reason.as_deref()
    }

    /// Fails if admitting `estimated_cost` would push usage past the total.
    pub fn assert_available(&mut self, estimated_cost: u64, label: &str) -> Result<(), PipelineError> {
        if self.used.saturating_add(estimated_cost) <= self.total {
            return Ok(());
        }

        let reason = format!(
            "Token budget exhausted before {label}: needed ~{estimated_cost}, {} of {} remaining",
            self.remaining(),
            self.total
        );
        warn!("{reason}");
        self.mark_stopped(reason);

        Err(PipelineError::BudgetExceeded {
            reason: self
                .stopped_reason
                .clone()
                .unwrap_or_default(),
        })
    }

    /// Records why work stopped, unless an earlier reason already stands.
    pub fn mark_stopped(&mut self, reason: impl Into<String>) {
        if self.stopped_reason.is_none() {
            self.stopped_reason = Some(reason.into());
        }
    }

    pub fn to_info(&self) -> BudgetInfo {
        BudgetInfo {
            total: self.total,
            used: self.used,
            stopped_reason: self.stopped_reason.clone(),
        }
    }
}

/// Deterministic fallback when the completion service reports no usage.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}
