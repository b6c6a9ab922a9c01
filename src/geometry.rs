//! DPI-aware window width calculation
//!
//! Timer cards are laid out in a single row. Layout constants are logical
//! units; the window API takes physical pixels, so everything is scaled by the
//! display's scale factor and rounded.

use serde::{Deserialize, Serialize};

pub const CARD_WIDTH: f64 = 200.0;
pub const CARD_GAP: f64 = 11.0;
pub const ROW_PADDING_LEFT: f64 = 10.0;
pub const ROW_PADDING_RIGHT: f64 = 10.0;
pub const MIN_LOGICAL_WIDTH: f64 = 291.0;
pub const MAX_LOGICAL_WIDTH: f64 = 1920.0;

/// Toolbar width assumed until the UI reports a measurement.
pub const DEFAULT_TOOLBAR_WIDTH: u32 = 80;

/// Window size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

impl PhysicalSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Inputs that determine the window width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub timer_count: usize,
    pub toolbar_collapsed: bool,
    /// Already in physical pixels
    pub toolbar_width: u32,
    pub scale_factor: f64,
}

fn to_physical(logical: f64, scale: f64) -> u32 {
    (logical * scale).round().max(0.0) as u32
}

/// Logical width of the timer row for `n` cards.
pub fn content_width(timer_count: usize) -> f64 {
    let n = timer_count as f64;
    let gaps = timer_count.saturating_sub(1) as f64;
    ROW_PADDING_LEFT + n * CARD_WIDTH + gaps * CARD_GAP + ROW_PADDING_RIGHT
}

/// Physical width bounds for a given scale factor.
pub fn width_bounds(scale_factor: f64) -> (u32, u32) {
    (
        to_physical(MIN_LOGICAL_WIDTH, scale_factor),
        to_physical(MAX_LOGICAL_WIDTH, scale_factor),
    )
}

/// Target window width in physical pixels, clamped to the scaled bounds.
pub fn compute_width(layout: &Layout) -> u32 {
    let content = to_physical(content_width(layout.timer_count), layout.scale_factor);
    let toolbar = if layout.toolbar_collapsed {
        0
    } else {
        layout.toolbar_width
    };
    let (min, max) = width_bounds(layout.scale_factor);
    content.saturating_add(toolbar).clamp(min, max)
}

/// Target window size: computed width, height carried over unchanged.
pub fn target_size(layout: &Layout, current: PhysicalSize) -> PhysicalSize {
    PhysicalSize::new(compute_width(layout), current.height)
}

/// Convert a measured toolbar CSS width into physical pixels.
///
/// Standard-DPI displays render one pixel narrower than the rounded width.
pub fn toolbar_physical_width(css_width: f64, scale_factor: f64) -> u32 {
    let base = to_physical(css_width, scale_factor);
    if scale_factor > 1.0 {
        base
    } else {
        base.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(n: usize, collapsed: bool, toolbar: u32, scale: f64) -> Layout {
        Layout {
            timer_count: n,
            toolbar_collapsed: collapsed,
            toolbar_width: toolbar,
            scale_factor: scale,
        }
    }

    #[test]
    fn single_timer_is_clamped_to_minimum() {
        assert_eq!(content_width(1), 220.0);
        assert_eq!(compute_width(&layout(1, true, 0, 1.0)), 291);
    }

    #[test]
    fn three_timers_at_double_scale_with_toolbar() {
        assert_eq!(content_width(3), 642.0);
        assert_eq!(compute_width(&layout(3, false, 90, 2.0)), 90 + 1284);
    }

    #[test]
    fn collapsed_toolbar_contributes_nothing() {
        let open = compute_width(&layout(4, false, 80, 1.0));
        let closed = compute_width(&layout(4, true, 80, 1.0));
        assert_eq!(open - closed, 80);
    }

    #[test]
    fn fractional_scale_rounds() {
        // 220 * 1.25 = 275 -> below min 363.75 -> 364
        assert_eq!(compute_width(&layout(1, true, 0, 1.25)), 364);
        // 431 * 1.5 = 646.5 -> 647
        assert_eq!(compute_width(&layout(2, true, 0, 1.5)), 647);
    }

    #[test]
    fn many_timers_clamped_to_maximum() {
        assert_eq!(compute_width(&layout(40, false, 80, 1.0)), 1920);
        assert_eq!(compute_width(&layout(40, false, 80, 2.0)), 3840);
    }

    #[test]
    fn height_is_preserved() {
        let size = target_size(&layout(2, true, 0, 1.0), PhysicalSize::new(10, 190));
        assert_eq!(size, PhysicalSize::new(431, 190));
    }

    #[test]
    fn toolbar_measurement() {
        assert_eq!(toolbar_physical_width(60.0, 1.0), 59);
        assert_eq!(toolbar_physical_width(60.0, 1.5), 90);
    }

    #[test]
    fn oversized_toolbar_clamps_to_maximum() {
        let toolbar = toolbar_physical_width(1e12, 1.0);
        assert_eq!(toolbar, u32::MAX - 1);
        assert_eq!(compute_width(&layout(2, false, toolbar, 1.0)), 1920);
        assert_eq!(compute_width(&layout(2, false, u32::MAX, 2.0)), 3840);
    }
}
