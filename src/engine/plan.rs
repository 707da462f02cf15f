/// Parsing and validation of the model's action-plan JSON.
///
/// Expected wire shape:
/// ```json
/// { "description": "...", "action_plan": "...",
///   "clicks": [ { "coordinates": 42, "reason": "..." } ] }
/// ```
/// `coordinates` is a 1-based cell index; a legacy `[x, y]` pixel pair is
/// also accepted. One malformed click entry is skipped on its own and never
/// invalidates the rest of the batch; only unparsable JSON fails the whole
/// plan.
use crate::engine::state::{ActionPlan, ClickIntent};
use crate::errors::GridPilotResult;
use crate::perception::grid;

pub fn parse_action_plan(
    raw: &str,
    frame_w: u32,
    frame_h: u32,
    cell_size: u32,
) -> GridPilotResult<ActionPlan> {
    let json: serde_json::Value = serde_json::from_str(strip_code_fences(raw))?;

    let description = json["description"].as_str().unwrap_or("").to_string();
    let action_plan = json["action_plan"].as_str().unwrap_or("").to_string();

    let (columns, rows) = grid::grid_dimensions(frame_w, frame_h, cell_size);
    let grid_size = columns * rows;

    let mut clicks = Vec::new();
    if let Some(entries) = json["clicks"].as_array() {
        for entry in entries {
            match parse_click_entry(entry, grid_size, frame_w, frame_h) {
                Some(intent) => clicks.push(intent),
                None => {
                    tracing::warn!(entry = %entry, "skipping invalid click object from model");
                }
            }
        }
    }

    Ok(ActionPlan {
        description,
        action_plan,
        clicks,
    })
}

fn parse_click_entry(
    entry: &serde_json::Value,
    grid_size: u32,
    frame_w: u32,
    frame_h: u32,
) -> Option<ClickIntent> {
    let reason = entry["reason"].as_str()?.to_string();
    let coordinates = entry.get("coordinates")?;

    if let Some(cell) = coordinates.as_u64() {
        let cell = u32::try_from(cell).ok()?;
        if cell >= 1 && cell <= grid_size {
            return Some(ClickIntent::cell(cell, reason));
        }
        return None;
    }

    // Legacy pixel-pair mode: "coordinates": [x, y]
    if let Some(pair) = coordinates.as_array() {
        if pair.len() != 2 {
            return None;
        }
        let x = u32::try_from(pair[0].as_u64()?).ok()?;
        let y = u32::try_from(pair[1].as_u64()?).ok()?;
        if x < frame_w && y < frame_h {
            return Some(ClickIntent::pixel(x, y, reason));
        }
        return None;
    }

    None
}

/// Models frequently wrap the JSON in a markdown fence; unwrap it.
fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::ClickTarget;

    const W: u32 = 640;
    const H: u32 = 480;
    const S: u32 = 40;

    #[test]
    fn well_formed_plan_parses() {
        let raw = r#"{
            "description": "A dark hallway",
            "action_plan": "Open the door",
            "clicks": [
                { "coordinates": 129, "reason": "Click Open" },
                { "coordinates": 156, "reason": "Click the door" }
            ]
        }"#;
        let plan = parse_action_plan(raw, W, H, S).unwrap();
        assert_eq!(plan.description, "A dark hallway");
        assert_eq!(plan.clicks.len(), 2);
        assert_eq!(plan.clicks[0].target, ClickTarget::Cell { index: 129 });
        assert_eq!(plan.clicks[1].target, ClickTarget::Cell { index: 156 });
    }

    #[test]
    fn markdown_fences_are_unwrapped() {
        let raw = "```json\n{\"description\":\"d\",\"action_plan\":\"p\",\"clicks\":[]}\n```";
        let plan = parse_action_plan(raw, W, H, S).unwrap();
        assert_eq!(plan.description, "d");
        assert!(plan.clicks.is_empty());
    }

    #[test]
    fn malformed_entry_is_skipped_not_fatal() {
        // Batch of three: one entry lacks a reason, the other two survive.
        let raw = r#"{
            "description": "", "action_plan": "",
            "clicks": [
                { "coordinates": 10, "reason": "first" },
                { "coordinates": 20 },
                { "coordinates": 30, "reason": "third" }
            ]
        }"#;
        let plan = parse_action_plan(raw, W, H, S).unwrap();
        assert_eq!(plan.clicks.len(), 2);
        assert_eq!(plan.clicks[0].reason, "first");
        assert_eq!(plan.clicks[1].reason, "third");
    }

    #[test]
    fn out_of_grid_cell_is_dropped() {
        let raw = r#"{"description":"","action_plan":"","clicks":[
            { "coordinates": 193, "reason": "beyond the 16x12 grid" },
            { "coordinates": 0, "reason": "cells are 1-based" }
        ]}"#;
        let plan = parse_action_plan(raw, W, H, S).unwrap();
        assert!(plan.clicks.is_empty());
    }

    #[test]
    fn legacy_pixel_pair_mode() {
        let raw = r#"{"description":"","action_plan":"","clicks":[
            { "coordinates": [120, 200], "reason": "pixel mode" },
            { "coordinates": [700, 200], "reason": "outside the frame" }
        ]}"#;
        let plan = parse_action_plan(raw, W, H, S).unwrap();
        assert_eq!(plan.clicks.len(), 1);
        assert_eq!(plan.clicks[0].target, ClickTarget::Pixel { x: 120, y: 200 });
    }

    #[test]
    fn non_json_text_is_an_error() {
        assert!(parse_action_plan("I will click the door now.", W, H, S).is_err());
    }

    #[test]
    fn missing_clicks_array_is_an_empty_plan() {
        let plan = parse_action_plan(r#"{"description":"d","action_plan":"p"}"#, W, H, S).unwrap();
        assert!(plan.clicks.is_empty());
    }
}
