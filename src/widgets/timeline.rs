//! Key-frame timeline grid state.
//!
//! The grid lays key frames out in rows of `items_per_row`. Per-frame
//! controls are shown or hidden through [`TimelineToggles`].

use serde::{Deserialize, Serialize};

pub const MIN_ITEMS_PER_ROW: usize = 1;
pub const MAX_ITEMS_PER_ROW: usize = 10;

/// Which per-frame controls the grid shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineToggles {
    pub time_setter: bool,
    pub delete: bool,
    pub duration_setter: bool,
    pub copy: bool,
    pub move_frames: bool,
    pub replace_image: bool,
    pub change_position: bool,
}

impl Default for TimelineToggles {
    fn default() -> Self {
        Self {
            time_setter: true,
            delete: true,
            duration_setter: false,
            copy: false,
            move_frames: true,
            replace_image: false,
            change_position: false,
        }
    }
}

impl TimelineToggles {
    pub fn all() -> Self {
        Self {
            time_setter: true,
            delete: true,
            duration_setter: true,
            copy: true,
            move_frames: true,
            replace_image: true,
            change_position: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineState {
    items_per_row: usize,
    pub expand_all: bool,
    pub toggles: TimelineToggles,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self {
            items_per_row: 5,
            expand_all: false,
            toggles: TimelineToggles::default(),
        }
    }
}

impl TimelineState {
    pub fn items_per_row(&self) -> usize {
        self.items_per_row.clamp(MIN_ITEMS_PER_ROW, MAX_ITEMS_PER_ROW)
    }

    pub fn set_items_per_row(&mut self, n: usize) {
        self.items_per_row = n.clamp(MIN_ITEMS_PER_ROW, MAX_ITEMS_PER_ROW);
    }

    /// Toggles in effect: everything on while `expand_all` is set.
    pub fn effective_toggles(&self) -> TimelineToggles {
        if self.expand_all {
            TimelineToggles::all()
        } else {
            self.toggles
        }
    }

    /// Split `items` into consecutive grid rows.
    pub fn rows<'a, T>(&self, items: &'a [T]) -> Vec<&'a [T]> {
        items.chunks(self.items_per_row()).collect()
    }

    /// (row, column) of the item at `index`.
    pub fn cell_of(&self, index: usize) -> (usize, usize) {
        let per_row = self.items_per_row();
        (index / per_row, index % per_row)
    }
}

/// Selector position of a backend interpolation curve name.
pub fn interpolation_style_index(style: &str) -> Option<usize> {
    match style {
        "ease-in-out" => Some(0),
        "ease-in" => Some(1),
        "ease-out" => Some(2),
        "linear" => Some(3),
        _ => None,
    }
}
