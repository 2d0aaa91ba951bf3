// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod config;
pub mod error;
pub mod llm;
pub mod market;
pub mod service;
pub mod vision;

// Re-export the types most callers need
pub use config::{LlmConfig, MarketConfig, ScoutConfig, VisionConfig};
pub use error::{FaultClass, ScoutError};
pub use service::{ProductMatch, ScoutService};

pub use llm::{IntentClassifier, QueryIntent, SecondOpinionExtractor};
pub use market::{Listing, MarketError, MarketplaceAggregator};
pub use vision::{AnalysisError, AnalysisReport, SignalBundle, SignalFusionEngine};
