/// Game-window discovery and frame capture via `xcap`.
///
/// Thin glue: the interesting coordinate work lives in `perception::grid`.
/// The window is re-located on every capture so the loop survives the game
/// being moved or resized between iterations.
use image::RgbaImage;
use xcap::Window;

use crate::errors::{GridPilotError, GridPilotResult};

/// One captured frame plus the on-screen origin needed to turn image-relative
/// click coordinates into screen coordinates.
pub struct Frame {
    pub image: RgbaImage,
    pub width: u32,
    pub height: u32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub title: String,
}

/// Locate the first visible window whose title contains `title_substr`
/// (case-insensitive) and capture its contents.
pub fn capture_game_window(title_substr: &str) -> GridPilotResult<Frame> {
    let needle = title_substr.to_lowercase();
    let windows = Window::all()
        .map_err(|e| GridPilotError::Perception(format!("window enumeration: {e}")))?;

    let target = windows
        .into_iter()
        .find(|w| !w.is_minimized() && w.title().to_lowercase().contains(&needle))
        .ok_or_else(|| {
            GridPilotError::Perception(format!("no visible window matching '{title_substr}'"))
        })?;

    let image = target
        .capture_image()
        .map_err(|e| GridPilotError::Perception(format!("capture '{}': {e}", target.title())))?;

    let (width, height) = image.dimensions();
    tracing::debug!(
        title = %target.title(),
        width,
        height,
        x = target.x(),
        y = target.y(),
        "frame captured"
    );

    Ok(Frame {
        width,
        height,
        origin_x: target.x(),
        origin_y: target.y(),
        title: target.title().to_string(),
        image,
    })
}

/// PNG-encode an image for the vision model and session storage.
pub fn encode_png(image: &RgbaImage) -> GridPilotResult<Vec<u8>> {
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| GridPilotError::Perception(format!("PNG encode: {e}")))?;
    Ok(out)
}
