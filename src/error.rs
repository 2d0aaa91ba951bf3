// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Top-level error taxonomy
//!
//! Subsystem errors stay in their modules; this wrapper exists for
//! callers that drive the whole pipeline and need one error type with a
//! stable caller-fault / policy / upstream classification.

use thiserror::Error;

use crate::market::MarketError;
use crate::vision::AnalysisError;

/// Coarse classification of a pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// The input itself is unusable
    CallerFault,
    /// The input is valid but refused by policy
    PolicyRejection,
    /// An upstream dependency failed
    UpstreamFault,
}

/// Error returned by the end-to-end pipeline
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Market(#[from] MarketError),
}

impl ScoutError {
    pub fn fault_class(&self) -> FaultClass {
        match self {
            ScoutError::Analysis(AnalysisError::FacesDetected { .. }) => {
                FaultClass::PolicyRejection
            }
            ScoutError::Analysis(AnalysisError::InvalidInput { .. })
            | ScoutError::Analysis(AnalysisError::Image(_))
            | ScoutError::Market(MarketError::InvalidQuery { .. }) => FaultClass::CallerFault,
            ScoutError::Analysis(AnalysisError::Extraction(_))
            | ScoutError::Market(_) => FaultClass::UpstreamFault,
        }
    }
}
