//! Optional annotated-frame dump for tuning camera placement and threshold.

use facegate_core::{decode_image, FaceLocation};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

const KNOWN_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const UNKNOWN_COLOR: Rgb<u8> = Rgb([220, 0, 0]);
const LINE_WIDTH: u32 = 2;

/// Render in the background. The recognition response never waits on it.
pub fn spawn_render(image: Vec<u8>, faces: Vec<(FaceLocation, bool)>, dir: PathBuf) {
    tokio::task::spawn_blocking(move || match render_to_dir(&image, &faces, &dir) {
        Ok(path) => tracing::debug!(path = %path.display(), "debug frame written"),
        Err(e) => tracing::warn!(error = %e, "debug frame not written"),
    });
}

fn render_to_dir(
    image: &[u8],
    faces: &[(FaceLocation, bool)],
    dir: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
    let mut frame = decode_image(image)?;
    for (location, known) in faces {
        draw_box(&mut frame, location, if *known { KNOWN_COLOR } else { UNKNOWN_COLOR });
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "frame-{}.png",
        chrono::Local::now().format("%Y%m%d-%H%M%S%.3f")
    ));
    frame.save(&path)?;
    Ok(path)
}

/// Outline `location` in place, clipped to the frame.
fn draw_box(frame: &mut RgbImage, location: &FaceLocation, color: Rgb<u8>) {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let left = location.left.min(w - 1);
    let right = location.right.min(w - 1);
    let top = location.top.min(h - 1);
    let bottom = location.bottom.min(h - 1);

    for t in 0..LINE_WIDTH {
        for x in left..=right {
            frame.put_pixel(x, (top + t).min(h - 1), color);
            frame.put_pixel(x, bottom.saturating_sub(t), color);
        }
        for y in top..=bottom {
            frame.put_pixel((left + t).min(w - 1), y, color);
            frame.put_pixel(right.saturating_sub(t), y, color);
        }
    }
}
