// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle of the adapters a command wires together.
//!
//! Registration logs each adapter's identity. Health is the worst status of
//! the set; shutdown runs in reverse registration order so storage, which
//! is registered first, is checkpointed last.

use std::sync::Arc;

use recall_core::{HealthStatus, PluginAdapter, RecallError};
use tracing::{info, warn};

#[derive(Default)]
pub struct AdapterSet {
    adapters: Vec<Arc<dyn PluginAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn PluginAdapter>) {
        info!(
            adapter = adapter.name(),
            version = %adapter.version(),
            kind = %adapter.adapter_type(),
            "adapter registered"
        );
        self.adapters.push(adapter);
    }

    /// One line per adapter: name, version, and kind.
    pub fn describe(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|a| format!("{} {} ({})", a.name(), a.version(), a.adapter_type()))
            .collect()
    }

    /// Combined health. Any unhealthy adapter makes the set unhealthy; any
    /// degraded one makes it degraded. A failing check counts as unhealthy.
    pub async fn health_check(&self) -> HealthStatus {
        let mut unhealthy = Vec::new();
        let mut degraded = Vec::new();
        for adapter in &self.adapters {
            match adapter.health_check().await {
                Ok(HealthStatus::Healthy) => {}
                Ok(HealthStatus::Degraded(reason)) => {
                    degraded.push(format!("{}: {reason}", adapter.name()));
                }
                Ok(HealthStatus::Unhealthy(reason)) => {
                    unhealthy.push(format!("{}: {reason}", adapter.name()));
                }
                Err(e) => unhealthy.push(format!("{}: {e}", adapter.name())),
            }
        }
        if !unhealthy.is_empty() {
            unhealthy.extend(degraded);
            HealthStatus::Unhealthy(unhealthy.join("; "))
        } else if !degraded.is_empty() {
            HealthStatus::Degraded(degraded.join("; "))
        } else {
            HealthStatus::Healthy
        }
    }

    /// Shut every adapter down. Failures are logged and do not stop the
    /// remaining adapters; the first one is returned.
    pub async fn shutdown(&self) -> Result<(), RecallError> {
        let mut first = None;
        for adapter in self.adapters.iter().rev() {
            if let Err(e) = adapter.shutdown().await {
                warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
                first.get_or_insert(e);
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
