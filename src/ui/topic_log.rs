use chrono::{DateTime, Local};
use egui::{Label, RichText, ScrollArea, Ui};

use super::common::{create_frame, UiColors};
use crate::relay::{SinkError, TopicSink};

/// Append-only text log for one topic, shown as a tab.
///
/// Read-only for the user. The scroll area sticks to the bottom so new lines
/// stay visible until the user scrolls up.
#[derive(Debug, Clone)]
pub struct TopicLog {
    topic: String,
    label: String,
    text: String,
    entries: usize,
    last_received: Option<DateTime<Local>>,
}

impl TopicLog {
    pub fn new(topic: &str, label: String) -> Self {
        TopicLog {
            topic: topic.to_string(),
            label,
            text: String::new(),
            entries: 0,
            last_received: None,
        }
    }

    #[cfg(test)]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[cfg(test)]
    pub fn entries(&self) -> usize {
        self.entries
    }

    #[cfg(test)]
    pub fn last_received(&self) -> Option<DateTime<Local>> {
        self.last_received
    }

    /// Tab title with message count.
    pub fn tab_title(&self) -> String {
        if self.entries == 0 {
            self.label.clone()
        } else {
            format!("{} ({})", self.label, self.entries)
        }
    }

    pub fn show(&self, ui: &mut Ui) {
        if let Some(at) = self.last_received {
            ui.weak(format!("Last message {}", at.format("%H:%M:%S")));
        }
        create_frame(UiColors::EXTREME_BG, UiColors::BORDER).show(ui, |ui| {
            ScrollArea::vertical()
                .id_salt(&self.topic)
                .stick_to_bottom(true)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    if self.text.is_empty() {
                        ui.weak(format!("Waiting for messages on {}", self.topic));
                    } else {
                        ui.add(
                            Label::new(RichText::new(&self.text).monospace())
                                .selectable(true)
                                .wrap(),
                        );
                    }
                });
        });
    }
}

impl TopicSink for TopicLog {
    fn append(&mut self, text: &str, received_at: DateTime<Local>) -> Result<(), SinkError> {
        self.text.push_str(text);
        if !text.ends_with('\n') {
            self.text.push('\n');
        }
        self.entries += 1;
        self.last_received = Some(received_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order() {
        let mut log = TopicLog::new("bms/data/PT_A", "PT_A".to_string());
        assert_eq!(log.tab_title(), "PT_A");

        let now = Local::now();
        log.append("[2024-05-17 12:00:01] Payload: 1\n", now).unwrap();
        log.append("[2024-05-17 12:00:02] Payload: 2", now).unwrap();

        assert_eq!(
            log.text(),
            "[2024-05-17 12:00:01] Payload: 1\n[2024-05-17 12:00:02] Payload: 2\n"
        );
        assert_eq!(log.entries(), 2);
        assert_eq!(log.last_received(), Some(now));
        assert_eq!(log.tab_title(), "PT_A (2)");
    }
}
