//! Tray icons for each microphone state, drawn at startup.
//!
//! Colors are the macOS system colors (dark variants).

use std::sync::LazyLock;

use image::{Rgba, RgbaImage};

use crate::MicState;

const ICON_SIZE: u32 = 64;

const COLOR_IDLE: (u8, u8, u8) = (152, 152, 157);
const COLOR_ACTIVATING: (u8, u8, u8) = (255, 214, 10);
const COLOR_ACTIVE: (u8, u8, u8) = (255, 69, 58);
const COLOR_PROCESSING: (u8, u8, u8) = (10, 132, 255);

static ICON_IDLE: LazyLock<Option<tray_icon::Icon>> = LazyLock::new(|| load_icon(COLOR_IDLE));
static ICON_ACTIVATING: LazyLock<Option<tray_icon::Icon>> =
    LazyLock::new(|| load_icon(COLOR_ACTIVATING));
static ICON_ACTIVE: LazyLock<Option<tray_icon::Icon>> = LazyLock::new(|| load_icon(COLOR_ACTIVE));
static ICON_PROCESSING: LazyLock<Option<tray_icon::Icon>> =
    LazyLock::new(|| load_icon(COLOR_PROCESSING));

pub trait MicIcon {
    fn color(&self) -> (u8, u8, u8);
    fn icon(&self) -> Option<tray_icon::Icon>;
}

impl MicIcon for MicState {
    fn color(&self) -> (u8, u8, u8) {
        match self {
            MicState::Idle => COLOR_IDLE,
            MicState::Activating => COLOR_ACTIVATING,
            MicState::Active => COLOR_ACTIVE,
            MicState::Processing => COLOR_PROCESSING,
        }
    }

    fn icon(&self) -> Option<tray_icon::Icon> {
        match self {
            MicState::Idle => ICON_IDLE.clone(),
            MicState::Activating => ICON_ACTIVATING.clone(),
            MicState::Active => ICON_ACTIVE.clone(),
            MicState::Processing => ICON_PROCESSING.clone(),
        }
    }
}

/// A microphone glyph: a rounded capsule on a stand.
pub fn draw_mic((r, g, b): (u8, u8, u8), size: u32) -> RgbaImage {
    let color = Rgba([r, g, b, 255]);
    let s = size as f32;
    let center = s / 2.0;

    let capsule_half_width = s * 0.16;
    let capsule_top = s * 0.12 + capsule_half_width;
    let capsule_bottom = s * 0.55;
    let arc_radius = s * 0.26;
    let stroke = (s * 0.055).max(1.0);

    RgbaImage::from_fn(size, size, |x, y| {
        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
        let dx = px - center;

        // Capsule: a vertical segment with rounded ends.
        let nearest_y = py.clamp(capsule_top, capsule_bottom);
        let in_capsule = dx.hypot(py - nearest_y) <= capsule_half_width;

        // Cradle: lower half of a ring around the capsule bottom.
        let ring = dx.hypot(py - capsule_bottom);
        let in_cradle = py >= capsule_bottom && (ring - arc_radius).abs() <= stroke;

        // Stand and base.
        let stand_top = capsule_bottom + arc_radius;
        let in_stand = dx.abs() <= stroke && py >= stand_top && py <= s * 0.92;
        let in_base = dx.abs() <= s * 0.2 && (py - s * 0.92).abs() <= stroke;

        if in_capsule || in_cradle || in_stand || in_base {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn load_icon(color: (u8, u8, u8)) -> Option<tray_icon::Icon> {
    let image = draw_mic(color, ICON_SIZE);
    let (width, height) = image.dimensions();
    match tray_icon::Icon::from_rgba(image.into_raw(), width, height) {
        Ok(icon) => Some(icon),
        Err(e) => {
            tracing::error!("Failed to build tray icon: {}", e);
            None
        }
    }
}
