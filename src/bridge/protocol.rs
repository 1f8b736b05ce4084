// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Wire envelopes and capability structures for the client-helper protocol.
//!
//! Frames are UTF-8 JSON. Requests carry a fresh correlation id, a message
//! type from a closed set, an optional shared token, and a type-specific
//! payload; responses echo the id with `ok` plus `result` or `error`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of message types understood by the game-client helper.
pub const MESSAGE_TYPES: [&str; 12] = [
    "hello",
    "server.info",
    "command.execute",
    "screenshot.capture",
    "region.scan",
    "region.heightmap",
    "player.context",
    "player.entities",
    "palette.analyze",
    "palette.region",
    "light.analyze",
    "symmetry.check",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub id: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// WorldEdit availability as reported by the peer. Older helpers send a bare
/// boolean; newer ones send the structured form with a reason tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorldEditCapability {
    Flag(bool),
    Detail {
        available: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
}

impl WorldEditCapability {
    pub fn available(&self) -> bool {
        match self {
            Self::Flag(available) => *available,
            Self::Detail { available, .. } => *available,
        }
    }
}

/// Capability map returned by the peer at handshake time. Cached by the
/// bridge for the lifetime of the connection and re-fetched after reconnect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities(pub BTreeMap<String, Value>);

impl Capabilities {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn worldedit(&self) -> Option<WorldEditCapability> {
        let value = self.0.get("worldedit")?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Whether the peer reported WorldEdit as available. `None` when the
    /// capability map is empty or silent on the subject.
    pub fn worldedit_available(&self) -> Option<bool> {
        self.worldedit().map(|capability| capability.available())
    }

    /// Feature-level flag lookup (e.g. `vision`, `region_snapshot`).
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.0.get(name), Some(Value::Bool(true)))
    }
}

/// Parsed `hello` result: client identity plus the capability map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelloResult {
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub minecraft: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_omits_absent_token() {
        let envelope = RequestEnvelope {
            id: "r1".to_owned(),
            message_type: "hello".to_owned(),
            token: None,
            payload: json!({}),
        };
        let encoded = serde_json::to_value(&envelope).expect("encode");
        assert_eq!(encoded, json!({ "id": "r1", "type": "hello", "payload": {} }));
    }

    #[test]
    fn response_envelope_accepts_minimal_frame() {
        let envelope: ResponseEnvelope =
            serde_json::from_value(json!({ "id": "r1", "ok": true })).expect("decode");
        assert_eq!(envelope.id.as_deref(), Some("r1"));
        assert!(envelope.ok);
        assert!(envelope.result.is_none());
        assert!(envelope.error.is_none());
    }

    #[test]
    fn worldedit_capability_accepts_both_shapes() {
        let caps: Capabilities = serde_json::from_value(json!({
            "worldedit": { "available": true, "reason": "mod detected" },
            "vision": true,
        }))
        .expect("decode");
        assert_eq!(caps.worldedit_available(), Some(true));
        assert!(caps.flag("vision"));
        assert!(!caps.flag("region_snapshot"));

        let flag_caps: Capabilities =
            serde_json::from_value(json!({ "worldedit": false })).expect("decode");
        assert_eq!(flag_caps.worldedit_available(), Some(false));
    }

    #[test]
    fn empty_capabilities_are_silent_on_worldedit() {
        assert_eq!(Capabilities::default().worldedit_available(), None);
    }

    #[test]
    fn hello_result_decodes_with_nested_capabilities() {
        let hello: HelloResult = serde_json::from_value(json!({
            "client": "fabric",
            "version": "0.4.1",
            "minecraft": "1.21.4",
            "enabled": true,
            "capabilities": { "worldedit": { "available": false, "reason": "not installed" } },
        }))
        .expect("decode");
        assert_eq!(hello.client, "fabric");
        assert_eq!(hello.capabilities.worldedit_available(), Some(false));
    }
}
