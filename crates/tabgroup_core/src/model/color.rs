//! Group color palette and allocator.
//!
//! # Invariants
//! - Allocation depends only on the colors currently held by live groups.
//! - Ties resolve to the earliest palette entry.

use serde::{Deserialize, Serialize};

/// Fixed group color palette, in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorId {
    #[serde(rename = "charts.foreground")]
    Foreground,
    #[serde(rename = "charts.lines")]
    Lines,
    #[serde(rename = "charts.red")]
    Red,
    #[serde(rename = "charts.blue")]
    Blue,
    #[serde(rename = "charts.yellow")]
    Yellow,
    #[serde(rename = "charts.orange")]
    Orange,
    #[serde(rename = "charts.green")]
    Green,
    #[serde(rename = "charts.purple")]
    Purple,
}

pub const PALETTE: [ColorId; 8] = [
    ColorId::Foreground,
    ColorId::Lines,
    ColorId::Red,
    ColorId::Blue,
    ColorId::Yellow,
    ColorId::Orange,
    ColorId::Green,
    ColorId::Purple,
];

impl ColorId {
    /// Host theme color key.
    pub fn theme_key(self) -> &'static str {
        match self {
            Self::Foreground => "charts.foreground",
            Self::Lines => "charts.lines",
            Self::Red => "charts.red",
            Self::Blue => "charts.blue",
            Self::Yellow => "charts.yellow",
            Self::Orange => "charts.orange",
            Self::Green => "charts.green",
            Self::Purple => "charts.purple",
        }
    }

    fn palette_index(self) -> usize {
        PALETTE
            .iter()
            .position(|color| *color == self)
            .unwrap_or_default()
    }
}

/// Returns the least-used palette color among `in_use`.
pub fn next_color_id(in_use: impl IntoIterator<Item = ColorId>) -> ColorId {
    let mut counts = [0usize; PALETTE.len()];
    for color in in_use {
        counts[color.palette_index()] += 1;
    }

    let mut best = 0;
    for (index, count) in counts.iter().enumerate() {
        if *count < counts[best] {
            best = index;
        }
    }
    PALETTE[best]
}
