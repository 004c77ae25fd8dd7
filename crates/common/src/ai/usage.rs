//! Per-model AI usage accounting
//!
//! One collector is constructed at startup and handed to the generator, so
//! tests can run with isolated counters.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Counters for a single model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelUsage {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub models: BTreeMap<String, ModelUsage>,
}

/// Collector for AI request and token counts
#[derive(Debug, Default)]
pub struct UsageMetrics {
    models: Mutex<BTreeMap<String, ModelUsage>>,
}

impl UsageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, ModelUsage>> {
        // Counters stay usable even if a holder panicked mid-update
        self.models.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count one completed request against `model`
    pub fn log_request(&self, model: &str) {
        self.lock().entry(model.to_string()).or_default().requests += 1;
    }

    /// Add provider-reported token usage for `model`
    pub fn log_token_usage(&self, model: &str, prompt_tokens: u64, completion_tokens: u64) {
        {
            let mut models = self.lock();
            let usage = models.entry(model.to_string()).or_default();
            usage.prompt_tokens += prompt_tokens;
            usage.completion_tokens += completion_tokens;
            usage.total_tokens += prompt_tokens + completion_tokens;
        }

        crate::metrics::record_tokens(model, prompt_tokens, completion_tokens);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let models = self.lock().clone();
        UsageSnapshot {
            total_requests: models.values().map(|m| m.requests).sum(),
            total_tokens: models.values().map(|m| m.total_tokens).sum(),
            models,
        }
    }

    pub fn reset(&self) {
        self.lock().clear();
    }
}
