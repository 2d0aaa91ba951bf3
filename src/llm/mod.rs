// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model-based extraction: second opinions and intent classification
//!
//! Everything here treats the model as unreliable: replies are parsed
//! defensively and failures degrade rather than propagate.

pub mod client;
pub mod intent;
pub mod json;
pub mod second_opinion;

pub use client::ChatClient;
pub use intent::{IntentClassifier, QueryIntent};
pub use second_opinion::SecondOpinionExtractor;
