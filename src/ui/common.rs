//! # UI Common Components and Utilities
//!
//! Shared styling and small helpers for the viewer window: the dark color
//! palette, the framed log area and tab label formatting.

use eframe::egui::{self, Color32, Frame, Stroke};

use crate::mqtt::mqtt_handler::ConnectionState;

/// Tab label for a topic: the configured prefix is cut off, anything else is
/// shown verbatim. A topic equal to the prefix keeps its full name so no tab
/// ends up blank.
pub fn tab_label(topic: &str, strip_prefix: &str) -> String {
    match topic.strip_prefix(strip_prefix) {
        Some(rest) if !strip_prefix.is_empty() && !rest.is_empty() => rest.to_string(),
        _ => topic.to_string(),
    }
}

/// Creates a styled frame with consistent visual parameters.
pub fn create_frame(bg_color: Color32, border_color: Color32) -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, border_color))
        .fill(bg_color)
        .inner_margin(4)
        .outer_margin(2)
}

/// Colored status dot plus text for the bottom panel.
pub fn connection_indicator(ui: &mut egui::Ui, state: ConnectionState) {
    let (color, text) = match state {
        ConnectionState::Connected => (UiColors::ACTIVE, "Connected"),
        ConnectionState::Connecting => (UiColors::PENDING, "Connecting"),
        ConnectionState::Reconnecting => (UiColors::PENDING, "Reconnecting"),
        ConnectionState::Failed => (UiColors::INACTIVE, "Failed"),
        ConnectionState::Disconnected => (UiColors::INACTIVE, "Disconnected"),
    };
    ui.colored_label(color, "●");
    ui.label(text);
}

/// Dark theme palette.
pub struct UiColors;

impl UiColors {
    /// Primary background color for main content areas (RGB: 30, 30, 30)
    pub const MAIN_BG: Color32 = Color32::from_rgb(30, 30, 30);

    /// Deepest background color, used behind the message logs (RGB: 20, 20, 20)
    pub const EXTREME_BG: Color32 = Color32::from_rgb(20, 20, 20);

    /// Border color for component separation (RGB: 60, 60, 60)
    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);

    /// Connected (RGB: 50, 200, 20)
    pub const ACTIVE: Color32 = Color32::from_rgb(50, 200, 20);

    /// Connection in progress (RGB: 220, 180, 20)
    pub const PENDING: Color32 = Color32::from_rgb(220, 180, 20);

    /// Failed or disconnected (RGB: 200, 50, 20)
    pub const INACTIVE: Color32 = Color32::from_rgb(200, 50, 20);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_label() {
        assert_eq!(tab_label("bms/data/PT_A", "bms/data/"), "PT_A");
        assert_eq!(tab_label("rj1", "bms/data/"), "rj1");
        assert_eq!(tab_label("bms/data/", "bms/data/"), "bms/data/");
        assert_eq!(tab_label("bms/data/PT_A", ""), "bms/data/PT_A");
    }
}
