/// Prompt construction for the frame-analysis call.
///
/// The grid overlay is described to the model together with the JSON shape
/// it must answer with; recent executed plans are spliced in so the model
/// avoids repeating itself.

const GAME_CONTEXT: &str = "I'm playing a point-and-click adventure game. I have to explore \
how the story unfolds through what I see on the screen.";

pub fn build_analysis_prompt(columns: u32, rows: u32, recent_actions: &[String]) -> String {
    let total_cells = columns * rows;
    let recent = if recent_actions.is_empty() {
        "None yet.".to_string()
    } else {
        recent_actions
            .iter()
            .map(|a| format!("- {a}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are an AI assistant playing an adventure game. Analyze the screenshot and provide a JSON response with the following structure:

{{
    "description": "Brief description of what you see in the scene",
    "action_plan": "Your plan for what to do next",
    "clicks": [
        {{ "coordinates": 42, "reason": "Click the door to enter the room" }}
    ]
}}

IMPORTANT - COORDINATE SYSTEM FOR CLICKING:
The image has a grid overlay with numbered cells (ignore the grid and numbers to describe the scene as you see it).
- The grid is {columns} columns by {rows} rows; cells are numbered 1 to {total_cells}, left to right, top to bottom.
- When you want to click somewhere:
  1. Look at the grid overlay and find the cell number closest to where you want to click
  2. Use that cell number as the "coordinates" value
  3. If the exact location is between cells, choose the closest cell number

Game Context:
{GAME_CONTEXT}

Recent Actions (avoid repeating these):
{recent}

Respond with ONLY the JSON object."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_grid_extent() {
        let prompt = build_analysis_prompt(16, 12, &[]);
        assert!(prompt.contains("16 columns by 12 rows"));
        assert!(prompt.contains("1 to 192"));
        assert!(prompt.contains("None yet."));
    }

    #[test]
    fn recent_actions_are_listed() {
        let actions = vec!["Opened the door".to_string()];
        let prompt = build_analysis_prompt(16, 12, &actions);
        assert!(prompt.contains("- Opened the door"));
    }
}
