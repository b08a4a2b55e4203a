//! Generated application and tray icons

use crate::core::GuardState;

/// RGBA pixels of a filled disc, tinted by guard state
pub fn disc_rgba(size: usize, state: GuardState) -> Vec<u8> {
    let (r, g, b) = match state {
        GuardState::Free => (14.0, 165.0, 233.0),
        GuardState::Busy => (245.0, 158.0, 11.0),
    };

    let mut rgba = vec![0u8; size * size * 4];
    let radius = size as f32 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let cx = x as f32 + 0.5 - radius;
            let cy = y as f32 + 0.5 - radius;
            let dist = (cx * cx + cy * cy).sqrt();

            if dist < radius - 1.0 {
                // Darken towards the rim
                let t = 1.0 - 0.35 * (dist / radius);
                rgba[idx] = (r * t) as u8;
                rgba[idx + 1] = (g * t) as u8;
                rgba[idx + 2] = (b * t) as u8;
                rgba[idx + 3] = 255;
            }
        }
    }
    rgba
}

/// Window icon
pub fn app_icon() -> egui::IconData {
    let size = 64;
    egui::IconData {
        rgba: disc_rgba(size, GuardState::Free),
        width: size as u32,
        height: size as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_transparent_center_opaque() {
        let size = 32;
        let rgba = disc_rgba(size, GuardState::Busy);
        assert_eq!(rgba.len(), size * size * 4);
        assert_eq!(rgba[3], 0);
        let center = ((size / 2) * size + size / 2) * 4;
        assert_eq!(rgba[center + 3], 255);
    }
}
