//! Admin state document shared across sessions

use serde::{Deserialize, Deserializer, Serialize};

/// The admin state document as stored remotely
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminState {
    #[serde(default)]
    pub is_go_live_enabled: bool,
    #[serde(default)]
    pub active_slot_id: Option<String>,
}

/// Partial write to the admin state document
///
/// Absent fields are left untouched. `active_slot_id: Some(None)` clears the
/// selection (serialized as `null`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_go_live_enabled: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub active_slot_id: Option<Option<String>>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl From<AdminState> for AdminStatePatch {
    fn from(state: AdminState) -> Self {
        Self {
            is_go_live_enabled: Some(state.is_go_live_enabled),
            active_slot_id: Some(state.active_slot_id),
        }
    }
}

impl AdminStatePatch {
    pub fn go_live(enabled: bool) -> Self {
        Self {
            is_go_live_enabled: Some(enabled),
            active_slot_id: None,
        }
    }

    pub fn active_slot(slot_id: Option<String>) -> Self {
        Self {
            is_go_live_enabled: None,
            active_slot_id: Some(slot_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_go_live_enabled.is_none() && self.active_slot_id.is_none()
    }

    /// Apply to a document
    pub fn merge_into(&self, state: &mut AdminState) {
        if let Some(enabled) = self.is_go_live_enabled {
            state.is_go_live_enabled = enabled;
        }
        if let Some(slot) = &self.active_slot_id {
            state.active_slot_id = slot.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_distinguishes_absent_and_null() {
        let absent: AdminStatePatch = serde_json::from_str(r#"{"isGoLiveEnabled":true}"#).unwrap();
        assert_eq!(absent.active_slot_id, None);

        let cleared: AdminStatePatch = serde_json::from_str(r#"{"activeSlotId":null}"#).unwrap();
        assert_eq!(cleared.active_slot_id, Some(None));

        let json = serde_json::to_string(&AdminStatePatch::active_slot(None)).unwrap();
        assert_eq!(json, r#"{"activeSlotId":null}"#);
    }

    #[test]
    fn test_merge_into() {
        let mut state = AdminState {
            is_go_live_enabled: false,
            active_slot_id: Some("a".to_string()),
        };

        AdminStatePatch::go_live(true).merge_into(&mut state);
        assert!(state.is_go_live_enabled);
        assert_eq!(state.active_slot_id.as_deref(), Some("a"));

        AdminStatePatch::active_slot(None).merge_into(&mut state);
        assert!(state.active_slot_id.is_none());
    }
}
