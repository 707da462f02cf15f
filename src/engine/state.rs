use serde::{Deserialize, Serialize};

/// Where a click should land: a 1-based grid cell (the dominant addressing
/// mode) or a raw frame-relative pixel (legacy alternative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickTarget {
    Cell { index: u32 },
    Pixel { x: u32, y: u32 },
}

/// A validated instruction to click somewhere, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickIntent {
    pub target: ClickTarget,
    pub reason: String,
}

impl ClickIntent {
    pub fn cell(index: u32, reason: impl Into<String>) -> Self {
        Self {
            target: ClickTarget::Cell { index },
            reason: reason.into(),
        }
    }

    pub fn pixel(x: u32, y: u32, reason: impl Into<String>) -> Self {
        Self {
            target: ClickTarget::Pixel { x, y },
            reason: reason.into(),
        }
    }
}

/// The model's per-iteration output: scene description, stated intention and
/// an ordered list of clicks to perform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    pub description: String,
    pub action_plan: String,
    pub clicks: Vec<ClickIntent>,
}

/// Who produced a batch of clicks. Recorded in the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSource {
    Model,
    Chat,
}
