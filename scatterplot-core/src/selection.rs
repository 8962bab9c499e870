use datasets::Point2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Visible part of the world, `x`/`y` being the minimum corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionModifier {
    #[default]
    Replace,
    Add,
    Subtract,
}

impl SelectionModifier {
    /// An aborted lasso removes what it covered.
    pub fn effective(self, aborted: bool) -> Self {
        if aborted {
            SelectionModifier::Subtract
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PixelSelection {
    /// Global indices of the hit points.
    pub indices: Vec<u32>,
    /// World bounding box of the hit points.
    pub bounds: Option<ViewRect>,
}

/// Pixel under `point`, with screen y growing downwards.
pub fn project_to_screen(point: Point2, view: &ViewRect, screen: ScreenSize) -> Option<(i32, i32)> {
    if view.width <= 0.0 || view.height <= 0.0 {
        return None;
    }
    let nx = (point.x - view.x) / view.width;
    let ny = (point.y - view.y) / view.height;
    let sx = (nx * screen.width as f32) as i32;
    let sy = (screen.height as f32 - ny * screen.height as f32) as i32;
    let inside = (0..screen.width as i32).contains(&sx) && (0..screen.height as i32).contains(&sy);
    inside.then_some((sx, sy))
}

/// Collects the points whose pixel is set in `mask`.
pub fn select_points<F>(
    positions: &[Point2],
    global_indices: &[u32],
    view: &ViewRect,
    screen: ScreenSize,
    mask: F,
) -> PixelSelection
where
    F: Fn(i32, i32) -> bool,
{
    let mut indices = Vec::new();
    let (mut min_x, mut max_x) = (f32::MAX, f32::MIN);
    let (mut min_y, mut max_y) = (f32::MAX, f32::MIN);

    for (local, point) in positions.iter().enumerate() {
        let Some((sx, sy)) = project_to_screen(*point, view, screen) else {
            continue;
        };
        if !mask(sx, sy) {
            continue;
        }
        indices.push(global_indices.get(local).copied().unwrap_or(local as u32));
        min_x = min_x.min(point.x);
        max_x = max_x.max(point.x);
        min_y = min_y.min(point.y);
        max_y = max_y.max(point.y);
    }

    let bounds = (!indices.is_empty())
        .then(|| ViewRect::new(min_x, min_y, max_x - min_x, max_y - min_y));
    PixelSelection { indices, bounds }
}

pub fn combine_selection(current: &[u32], target: Vec<u32>, modifier: SelectionModifier) -> Vec<u32> {
    match modifier {
        SelectionModifier::Replace => target,
        SelectionModifier::Add => {
            let mut set: BTreeSet<u32> = current.iter().copied().collect();
            set.extend(target);
            set.into_iter().collect()
        }
        SelectionModifier::Subtract => {
            let remove: HashSet<u32> = target.into_iter().collect();
            let set: BTreeSet<u32> = current
                .iter()
                .copied()
                .filter(|index| !remove.contains(index))
                .collect();
            set.into_iter().collect()
        }
    }
}

/// Flips the selection state of the plotted points. Selected points outside
/// `plotted` stay selected.
pub fn invert_selection(current: &[u32], plotted: &[u32]) -> Vec<u32> {
    let current: BTreeSet<u32> = current.iter().copied().collect();
    let plotted: BTreeSet<u32> = plotted.iter().copied().collect();
    current.symmetric_difference(&plotted).copied().collect()
}

/// One flag per local point, set when its global index is selected.
pub fn highlights(selection: &[u32], global_indices: &[u32]) -> Vec<u8> {
    let selected: HashSet<u32> = selection.iter().copied().collect();
    global_indices
        .iter()
        .map(|global| u8::from(selected.contains(global)))
        .collect()
}
