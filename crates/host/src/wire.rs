// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The JSON wire protocol: one object per frame, typed by a `type` tag.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorBody, HostError};

/// `{"type": string, "room"?: string, "data"?: object}`.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// `{"type": string, "data": object, "error": null|{code,message}}`.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
    pub error: Option<ErrorBody>,
}

impl OutboundFrame {
    pub fn success(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self { kind: kind.into(), data, error: None }
    }

    pub fn error(kind: impl Into<String>, err: HostError, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), data: serde_json::json!({}), error: Some(err.to_error_body(message)) }
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
