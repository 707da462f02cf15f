/// Physical mouse input via enigo.
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

use crate::errors::{GridPilotError, GridPilotResult};

pub struct InputDriver {
    enigo: Enigo,
}

impl InputDriver {
    pub fn new() -> GridPilotResult<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| GridPilotError::Executor(format!("input init: {e}")))?;
        Ok(Self { enigo })
    }

    /// Move to the absolute screen coordinate and left-click.
    pub fn click(&mut self, x: i32, y: i32) -> GridPilotResult<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| GridPilotError::Executor(format!("move to ({x},{y}): {e}")))?;
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| GridPilotError::Executor(format!("click at ({x},{y}): {e}")))?;
        Ok(())
    }
}
