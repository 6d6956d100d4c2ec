//! Event types for the Brieflow pipeline event bus
//!
//! Events are progress notifications for in-process subscribers (logging
//! bridges, the HTTP layer's diagnostics). Emission never blocks the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// The four sequential pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    QueryAnalysis,
    AssetAnalysis,
    Synthesis,
    OutputAssembly,
}

impl PipelineStage {
    /// All stages in execution order
    pub const ALL: [PipelineStage; 4] = [
        PipelineStage::QueryAnalysis,
        PipelineStage::AssetAnalysis,
        PipelineStage::Synthesis,
        PipelineStage::OutputAssembly,
    ];

    /// Stable snake_case identifier
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueryAnalysis => "query_analysis",
            Self::AssetAnalysis => "asset_analysis",
            Self::Synthesis => "synthesis",
            Self::OutputAssembly => "output_assembly",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline progress events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Stage started
    StageStarted {
        analysis_id: Uuid,
        stage: PipelineStage,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Stage finished successfully
    StageCompleted {
        analysis_id: Uuid,
        stage: PipelineStage,
        duration_ms: u64,
        provider: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One asset's analysis settled (success, partial or failed)
    AssetAnalyzed {
        analysis_id: Uuid,
        asset_id: String,
        outcome: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Final document produced
    PipelineCompleted {
        analysis_id: Uuid,
        completion_status: String,
        overall_confidence: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Pipeline aborted by a fatal stage failure
    PipelineFailed {
        analysis_id: Uuid,
        stage: PipelineStage,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast event bus
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PipelineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No subscribers for pipeline event");
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
