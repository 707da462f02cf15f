/// Extraction of click commands from free-form chat text.
///
/// Two surface forms are recognized, case-insensitive:
///   - pixel pair: `click (123, 456)` or `click 123,456`
///   - cell index: `click 42` or `click(42)`
///
/// Pixel matches are collected first; a cell match starting at the same text
/// offset as a pixel match is the pixel form's first integer and is not
/// reported again as a cell. Out-of-range numbers are dropped silently —
/// malformed viewer input is never an error.
use regex::Regex;

use crate::engine::state::ClickIntent;

/// Validation bounds for parsed commands. Runtime configuration, not
/// compile-time constants; changing them affects only future parses.
#[derive(Debug, Clone, Copy)]
pub struct ParserBounds {
    /// Pixel commands must satisfy `x < width`.
    pub width: u32,
    /// Pixel commands must satisfy `y < height`.
    pub height: u32,
    /// Cell commands must lie in `1..=grid_size`.
    pub grid_size: u32,
}

pub struct ClickParser {
    pixel_re: Regex,
    cell_re: Regex,
    bounds: ParserBounds,
}

impl ClickParser {
    pub fn new(bounds: ParserBounds) -> Self {
        Self {
            pixel_re: Regex::new(r"(?i)click\s*\(?\s*(\d+)\s*,\s*(\d+)\s*\)?")
                .expect("pixel pattern is valid"),
            cell_re: Regex::new(r"(?i)click\s*\(?(\d+)\)?").expect("cell pattern is valid"),
            bounds,
        }
    }

    pub fn bounds(&self) -> ParserBounds {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: ParserBounds) {
        self.bounds = bounds;
    }

    /// Scan `text` for click commands. A single message may yield several
    /// intents; pixel-form intents come first, each group in text order.
    pub fn parse(&self, text: &str) -> Vec<ClickIntent> {
        let mut intents = Vec::new();
        let mut pixel_starts = Vec::new();

        for caps in self.pixel_re.captures_iter(text) {
            let whole = caps.get(0).expect("match always has group 0");
            pixel_starts.push(whole.start());
            let (Ok(x), Ok(y)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
                continue;
            };
            if x < self.bounds.width && y < self.bounds.height {
                intents.push(ClickIntent::pixel(
                    x,
                    y,
                    format!("viewer suggested click at pixel ({x}, {y})"),
                ));
            } else {
                tracing::debug!(x, y, "pixel command outside frame bounds, dropped");
            }
        }

        for caps in self.cell_re.captures_iter(text) {
            let whole = caps.get(0).expect("match always has group 0");
            if pixel_starts.contains(&whole.start()) {
                continue;
            }
            let Ok(cell) = caps[1].parse::<u32>() else {
                continue;
            };
            if (1..=self.bounds.grid_size).contains(&cell) {
                intents.push(ClickIntent::cell(
                    cell,
                    format!("viewer suggested click on cell {cell}"),
                ));
            } else {
                tracing::debug!(cell, "cell command outside grid, dropped");
            }
        }

        intents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::ClickTarget;

    fn parser() -> ClickParser {
        ClickParser::new(ParserBounds {
            width: 1920,
            height: 1080,
            grid_size: 100,
        })
    }

    #[test]
    fn bare_cell_command() {
        let intents = parser().parse("click 42");
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].target, ClickTarget::Cell { index: 42 });
    }

    #[test]
    fn out_of_range_cell_is_dropped() {
        assert!(parser().parse("click 999").is_empty());
        assert!(parser().parse("click 0").is_empty());
    }

    #[test]
    fn pixel_pair_with_and_without_parens() {
        for text in ["click (123, 456)", "click 123,456", "CLICK(123 , 456)"] {
            let intents = parser().parse(text);
            assert_eq!(intents.len(), 1, "{text}");
            assert_eq!(intents[0].target, ClickTarget::Pixel { x: 123, y: 456 });
        }
    }

    #[test]
    fn pixel_pair_respects_frame_bounds() {
        let mut p = parser();
        p.set_bounds(ParserBounds {
            width: 100,
            height: 100,
            grid_size: 100,
        });
        assert!(p.parse("click (123, 456)").is_empty());
        assert_eq!(p.parse("click (99, 0)").len(), 1);
        assert!(p.parse("click (100, 0)").is_empty());
    }

    #[test]
    fn pixel_form_is_not_also_read_as_cell() {
        let intents = parser().parse("click (12,34)");
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].target, ClickTarget::Pixel { x: 12, y: 34 });
    }

    #[test]
    fn mixed_message_orders_pixel_before_cell() {
        let intents = parser().parse("click 12 click (5,5)");
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].target, ClickTarget::Pixel { x: 5, y: 5 });
        assert_eq!(intents[1].target, ClickTarget::Cell { index: 12 });
    }

    #[test]
    fn multiple_cell_commands_in_text_order() {
        let intents = parser().parse("first click 3 then click 7");
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].target, ClickTarget::Cell { index: 3 });
        assert_eq!(intents[1].target, ClickTarget::Cell { index: 7 });
    }

    #[test]
    fn unrelated_text_yields_nothing() {
        assert!(parser().parse("lol nice move").is_empty());
        assert!(parser().parse("clicked it already").is_empty());
    }

    #[test]
    fn absurdly_long_number_is_dropped_not_panicked() {
        assert!(parser().parse("click 99999999999999999999").is_empty());
    }
}
