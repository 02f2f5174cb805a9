//! # Viewer Window
//!
//! eframe application with one tab per configured topic and a status bar.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ [rj1 (12)] [PT_A (3)] [PT_B]             │  top panel: tabs
//! ├──────────────────────────────────────────┤
//! │ [2024-05-17 14:03:09] Payload: 23.5,...  │  central panel: log of the
//! │ [2024-05-17 14:03:10] Payload: 24.1,...  │  selected topic
//! ├──────────────────────────────────────────┤
//! │ ● Connected  broker.emqx.io:1883  ...    │  bottom panel: status
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Dispatch
//!
//! The window owns the [`Dispatcher`]. Every frame polls the
//! [`DispatchSchedule`]; when a pass is due the relay queue is drained into the
//! topic logs. A repaint is requested for the next due time, so the logs keep
//! filling even when the user does not touch the window. Passes never overlap
//! because egui calls `update` from this one thread only.

pub mod common;
pub mod topic_log;

use eframe::egui;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::mqtt::mqtt_handler::BrokerStatus;
use crate::relay::{DispatchSchedule, Dispatcher};
use common::{connection_indicator, UiColors};
use topic_log::TopicLog;

pub struct ViewerUI {
    dispatcher: Dispatcher<TopicLog>,
    schedule: DispatchSchedule,
    active_tab: usize,
    broker_url: String,
    status_rx: watch::Receiver<BrokerStatus>,
    shutdown: CancellationToken,
}

impl ViewerUI {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        dispatcher: Dispatcher<TopicLog>,
        dispatch_period: Duration,
        broker_url: String,
        status_rx: watch::Receiver<BrokerStatus>,
        shutdown: CancellationToken,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);
        Self::from_parts(dispatcher, dispatch_period, broker_url, status_rx, shutdown)
    }

    fn from_parts(
        dispatcher: Dispatcher<TopicLog>,
        dispatch_period: Duration,
        broker_url: String,
        status_rx: watch::Receiver<BrokerStatus>,
        shutdown: CancellationToken,
    ) -> Self {
        ViewerUI {
            dispatcher,
            schedule: DispatchSchedule::new(dispatch_period),
            active_tab: 0,
            broker_url,
            status_rx,
            shutdown,
        }
    }

    /// Runs a dispatch pass if one is due and books the repaint for the next.
    fn pump(&mut self, ctx: &egui::Context) {
        if self.shutdown.is_cancelled() {
            if !self.schedule.is_cancelled() {
                info!("Shutdown requested, closing window");
                self.schedule.cancel();
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            return;
        }

        if self.schedule.poll_due(Instant::now()) {
            let report = self.dispatcher.dispatch();
            if report.delivered > 0 {
                debug!("Delivered {} messages to topic logs", report.delivered);
            }
        }

        if let Some(wait) = self.schedule.until_next(Instant::now()) {
            ctx.request_repaint_after(wait);
        }
    }

    fn tab_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for (idx, (_, log)) in self.dispatcher.registry().iter().enumerate() {
                ui.selectable_value(&mut self.active_tab, idx, log.tab_title());
            }
        });
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        let status = self.status_rx.borrow().clone();
        let totals = self.dispatcher.totals();
        let queue = self.dispatcher.queue();

        ui.horizontal_centered(|ui| {
            connection_indicator(ui, status.connection_state);
            ui.separator();
            ui.label(self.broker_url.as_str());
            ui.separator();
            ui.label(format!("Received: {}", status.messages_received));
            ui.label(format!("Shown: {}", totals.delivered));
            if totals.unknown > 0 {
                ui.label(format!("Unknown topic: {}", totals.unknown));
            }
            if queue.dropped() > 0 {
                ui.colored_label(
                    UiColors::INACTIVE,
                    format!("Dropped (queue full): {}", queue.dropped()),
                );
            }
            if let Some(last) = status.last_activity {
                ui.separator();
                ui.label(format!("Last message: {}", last.format("%H:%M:%S")));
            }
            if let Some(error) = &status.last_error {
                ui.separator();
                ui.colored_label(UiColors::INACTIVE, error.as_str());
            }
        });
    }
}

impl eframe::App for ViewerUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump(ctx);

        egui::TopBottomPanel::top("topic_tabs").show(ctx, |ui| self.tab_bar(ui));

        egui::TopBottomPanel::bottom("status_bar")
            .show_separator_line(false)
            .show(ctx, |ui| self.status_bar(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).fill(UiColors::MAIN_BG))
            .show(ctx, |ui| {
                match self.dispatcher.registry().entry_at(self.active_tab) {
                    Some((_, log)) => log.show(ui),
                    None => {
                        ui.label("No topics configured");
                    }
                }
            });
    }
}
