use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use tokio::sync::watch;

use crate::chat::buffer::ChatBuffer;
use crate::config::AppConfig;
use crate::engine::history::{IterationRecord, SessionHistory};
use crate::engine::state::{ActionPlan, BatchSource, ClickIntent, ClickTarget};
use crate::errors::GridPilotResult;
use crate::executor::input::InputDriver;
use crate::llm::prompt::build_analysis_prompt;
use crate::llm::registry::ProviderRegistry;
use crate::perception::grid;
use crate::perception::window::{capture_game_window, encode_png, Frame};

const MAX_RECENT_ACTIONS: usize = 10;

/// A click fully resolved to absolute screen coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClick {
    pub screen_x: i32,
    pub screen_y: i32,
    pub reason: String,
}

/// The per-iteration controller: capture → annotate → infer → resolve →
/// click, with viewer suggestions taking over on a fixed cadence. Nothing in
/// here is fatal; every failure is logged and retried on the next cycle.
pub struct PlayerEngine {
    config: AppConfig,
    registry: ProviderRegistry,
    buffer: Arc<ChatBuffer>,
    history: SessionHistory,
    input: InputDriver,
    stop_rx: watch::Receiver<bool>,
    recent_actions: VecDeque<String>,
    iteration: u64,
}

impl PlayerEngine {
    pub fn new(
        config: AppConfig,
        registry: ProviderRegistry,
        buffer: Arc<ChatBuffer>,
        stop_rx: watch::Receiver<bool>,
    ) -> GridPilotResult<Self> {
        Ok(Self {
            config,
            registry,
            buffer,
            history: SessionHistory::new()?,
            input: InputDriver::new()?,
            stop_rx,
            recent_actions: VecDeque::new(),
            iteration: 0,
        })
    }

    pub async fn run_loop(&mut self) {
        tracing::info!(
            window = %self.config.game.window_title,
            cell_size = self.config.game.cell_size,
            "player loop starting"
        );

        loop {
            if self.stop_requested() {
                break;
            }
            self.iteration += 1;
            let iteration = self.iteration;
            let interval = self.config.game.screenshot_interval_secs;

            let frame = match capture_game_window(&self.config.game.window_title) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(iteration, error = %e, "no usable frame, retrying next cycle");
                    if self.wait_secs(interval).await {
                        break;
                    }
                    continue;
                }
            };

            // Viewer suggestions take over the whole iteration on a fixed
            // cadence; the model is not consulted for that cycle.
            if self.chat_turn(iteration) && self.run_chat_iteration(iteration, &frame).await {
                if self.wait_secs(interval).await {
                    break;
                }
                continue;
            }

            self.run_model_iteration(iteration, &frame).await;
            if self.wait_secs(interval).await {
                break;
            }
        }

        tracing::info!(session = %self.history.session_id, "player loop ended");
    }

    fn chat_turn(&self, iteration: u64) -> bool {
        let cadence = self.config.chat.check_interval_iterations;
        self.config.chat.enabled && cadence > 0 && iteration % cadence == 0
    }

    /// Returns true when a chat batch was executed this iteration.
    async fn run_chat_iteration(&mut self, iteration: u64, frame: &Frame) -> bool {
        let stats = self.buffer.stats(self.config.chat.max_age_minutes);
        tracing::debug!(
            iteration,
            total = stats.total_messages,
            users = stats.unique_users,
            recent = stats.recent_activity,
            last_commander = stats.last_user_with_intents.as_deref().unwrap_or("none"),
            "checking chat for suggestions"
        );

        let batch = match self.buffer.consume_next(self.config.chat.max_age_minutes) {
            Some(batch) => batch,
            None => {
                tracing::debug!(iteration, "no recent viewer clicks found");
                return false;
            }
        };

        let cell_size = self.config.game.cell_size;
        let intents =
            chat_intents_to_cells(&batch.intents, frame.width, frame.height, cell_size);
        if intents.is_empty() {
            tracing::warn!(
                iteration,
                user = %batch.user,
                "no valid clicks could be processed from chat commands"
            );
            return false;
        }

        tracing::info!(
            iteration,
            user = %batch.user,
            suggested_at = %batch.first_intent_at,
            clicks = intents.len(),
            "executing viewer suggestions instead of model plan"
        );

        self.execute_batch(&intents, frame).await;

        self.history.push(IterationRecord {
            iteration,
            ts: chrono::Utc::now().timestamp_millis(),
            source: BatchSource::Chat,
            description: format!("viewer {} suggested clicks", batch.user),
            action_plan: String::new(),
            clicks: intents,
        });
        if let Err(e) = self.history.flush() {
            tracing::warn!(error = %e, "failed to flush history entry");
        }
        true
    }

    async fn run_model_iteration(&mut self, iteration: u64, frame: &Frame) {
        let cell_size = self.config.game.cell_size;
        let (columns, rows) = grid::grid_dimensions(frame.width, frame.height, cell_size);

        let annotated = grid::draw_numbered_grid(&frame.image, cell_size);
        let png = match encode_png(&annotated) {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!(iteration, error = %e, "failed to encode annotated frame");
                return;
            }
        };
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&png);

        let recent: Vec<String> = self.recent_actions.iter().cloned().collect();
        let prompt = build_analysis_prompt(columns, rows, &recent);

        let (provider, call_cfg) = match self.registry.call_config() {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(iteration, error = %e, "no usable vision provider configured");
                return;
            }
        };

        let raw = match provider.analyze_frame(&image_b64, &prompt, &call_cfg).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(iteration, error = %e, "model call failed, retrying next cycle");
                return;
            }
        };

        let plan = match crate::engine::plan::parse_action_plan(
            &raw,
            frame.width,
            frame.height,
            cell_size,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(
                    iteration,
                    error = %e,
                    raw = %raw.chars().take(200).collect::<String>(),
                    "model response was not a valid action plan"
                );
                return;
            }
        };

        tracing::info!(
            iteration,
            description = %plan.description,
            plan = %plan.action_plan,
            clicks = plan.clicks.len(),
            "action plan received"
        );

        if let Err(e) = self.history.save_frame(iteration, &png) {
            tracing::warn!(error = %e, "failed to save annotated frame");
        }
        self.history.push(IterationRecord {
            iteration,
            ts: chrono::Utc::now().timestamp_millis(),
            source: BatchSource::Model,
            description: plan.description.clone(),
            action_plan: plan.action_plan.clone(),
            clicks: plan.clicks.clone(),
        });
        if let Err(e) = self.history.flush() {
            tracing::warn!(error = %e, "failed to flush history entry");
        }

        self.push_recent_action(&plan);
        self.execute_batch(&plan.clicks, frame).await;
    }

    /// Replay a batch in parse order, pacing between clicks. A click that
    /// fails to resolve or inject is skipped; the batch carries on.
    async fn execute_batch(&mut self, intents: &[ClickIntent], frame: &Frame) {
        let resolved = resolve_batch(
            intents,
            frame.width,
            frame.height,
            self.config.game.cell_size,
            frame.origin_x,
            frame.origin_y,
        );
        let pacing = self.config.game.click_interval_secs;

        for (idx, click) in resolved.iter().enumerate() {
            tracing::info!(
                x = click.screen_x,
                y = click.screen_y,
                reason = %click.reason,
                "clicking"
            );
            if let Err(e) = self.input.click(click.screen_x, click.screen_y) {
                tracing::warn!(error = %e, "click injection failed, continuing batch");
            }
            if idx + 1 < resolved.len() && self.wait_secs(pacing).await {
                return;
            }
        }
    }

    fn push_recent_action(&mut self, plan: &ActionPlan) {
        if plan.action_plan.is_empty() {
            return;
        }
        self.recent_actions
            .push_back(format!("{} ({} clicks)", plan.action_plan, plan.clicks.len()));
        while self.recent_actions.len() > MAX_RECENT_ACTIONS {
            self.recent_actions.pop_front();
        }
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Sleep in short slices so a stop request is observed promptly.
    /// Returns true when stop was requested.
    async fn wait_secs(&self, secs: u64) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(secs);
        while tokio::time::Instant::now() < deadline {
            if self.stop_requested() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        self.stop_requested()
    }
}

/// Translate viewer pixel suggestions to cell addressing; suggestions that
/// fall outside the tiled region are dropped.
pub fn chat_intents_to_cells(
    intents: &[ClickIntent],
    frame_w: u32,
    frame_h: u32,
    cell_size: u32,
) -> Vec<ClickIntent> {
    intents
        .iter()
        .filter_map(|intent| match intent.target {
            ClickTarget::Cell { .. } => Some(intent.clone()),
            ClickTarget::Pixel { x, y } => {
                match grid::pixel_to_cell(x, y, frame_w, frame_h, cell_size) {
                    Some(index) => Some(ClickIntent::cell(index, intent.reason.clone())),
                    None => {
                        tracing::debug!(x, y, "pixel suggestion outside grid, dropped");
                        None
                    }
                }
            }
        })
        .collect()
}

/// Resolve a batch to absolute screen coordinates, preserving order and
/// skipping unresolvable entries.
pub fn resolve_batch(
    intents: &[ClickIntent],
    frame_w: u32,
    frame_h: u32,
    cell_size: u32,
    origin_x: i32,
    origin_y: i32,
) -> Vec<ResolvedClick> {
    let mut resolved = Vec::new();
    for intent in intents {
        let center = match intent.target {
            ClickTarget::Cell { index } => {
                match grid::cell_to_pixel_center(index, frame_w, frame_h, cell_size) {
                    Some(center) => center,
                    None => {
                        tracing::warn!(cell = index, "invalid cell number, skipping click");
                        continue;
                    }
                }
            }
            ClickTarget::Pixel { x, y } => {
                if x < frame_w && y < frame_h {
                    (x, y)
                } else {
                    tracing::warn!(x, y, "pixel click outside frame, skipping");
                    continue;
                }
            }
        };
        resolved.push(ResolvedClick {
            screen_x: origin_x + center.0 as i32,
            screen_y: origin_y + center.1 as i32,
            reason: intent.reason.clone(),
        });
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: u32 = 640;
    const H: u32 = 480;
    const S: u32 = 40;

    #[test]
    fn resolution_skips_bad_entries_without_aborting() {
        let intents = vec![
            ClickIntent::cell(1, "ok"),
            ClickIntent::cell(999, "beyond the grid"),
            ClickIntent::cell(192, "ok too"),
        ];
        let resolved = resolve_batch(&intents, W, H, S, 100, 50);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].screen_x, 120);
        assert_eq!(resolved[0].screen_y, 70);
        assert_eq!(resolved[1].reason, "ok too");
    }

    #[test]
    fn resolution_preserves_parse_order() {
        let intents = vec![
            ClickIntent::cell(2, "a"),
            ClickIntent::pixel(5, 5, "b"),
            ClickIntent::cell(17, "c"),
        ];
        let resolved = resolve_batch(&intents, W, H, S, 0, 0);
        let reasons: Vec<_> = resolved.iter().map(|r| r.reason.as_str()).collect();
        assert_eq!(reasons, vec!["a", "b", "c"]);
    }

    #[test]
    fn pixel_suggestions_become_cells() {
        let intents = vec![
            ClickIntent::pixel(0, 0, "top left"),
            ClickIntent::pixel(639, 479, "bottom right"),
            ClickIntent::cell(7, "already a cell"),
        ];
        let cells = chat_intents_to_cells(&intents, W, H, S);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].target, ClickTarget::Cell { index: 1 });
        assert_eq!(cells[1].target, ClickTarget::Cell { index: 192 });
        assert_eq!(cells[2].target, ClickTarget::Cell { index: 7 });
    }

    #[test]
    fn unconvertible_pixel_suggestion_is_dropped() {
        // 650 px wide frame has a truncated 17th column; x=645 has no cell.
        let intents = vec![ClickIntent::pixel(645, 10, "in the dead margin")];
        assert!(chat_intents_to_cells(&intents, 650, H, S).is_empty());
    }
}
