//! Main application window
//!
//! Port selector, Start/Stop controls and the live feed. The capture loop is
//! stepped from `update` whenever its timer is due, and egui is asked to
//! repaint when the next step comes up.

use std::time::Instant;

use eframe::egui::{self, Color32, ColorImage, RichText, TextureHandle, TextureOptions};

use crate::camera::Frame;
use crate::capture::{FrameLoop, FrameSink, StepTimer};
use crate::ports;
use crate::session::Session;

/// Live feed panel; holds the latest frame until it is uploaded
pub struct VideoPanel {
    pending: Option<ColorImage>,
    texture: Option<TextureHandle>,
    width: f32,
    height: f32,
}

impl VideoPanel {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pending: None,
            texture: None,
            width: width as f32,
            height: height as f32,
        }
    }

    fn show(&mut self, ui: &mut egui::Ui) {
        if let Some(image) = self.pending.take() {
            match &mut self.texture {
                Some(texture) => texture.set(image, TextureOptions::LINEAR),
                None => {
                    let texture = ui.ctx().load_texture("live-feed", image, TextureOptions::LINEAR);
                    self.texture = Some(texture);
                }
            }
        }

        let size = egui::vec2(self.width, self.height);
        match &self.texture {
            Some(texture) => {
                ui.image(egui::load::SizedTexture::new(texture.id(), size));
            }
            None => {
                let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
                ui.painter().rect_filled(rect, 0.0, Color32::from_gray(20));
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No video",
                    egui::FontId::proportional(16.0),
                    Color32::from_gray(120),
                );
            }
        }
    }
}

impl FrameSink for VideoPanel {
    fn present(&mut self, frame: &Frame) {
        let size = [frame.width() as usize, frame.height() as usize];
        self.pending = Some(ColorImage::from_rgba_unmultiplied(size, frame.as_raw()));
    }
}

/// Hand control window
pub struct HandControlApp {
    ports: Vec<String>,
    selected_port: String,
    session: Session,
    frame_loop: FrameLoop,
    timer: StepTimer,
    video: VideoPanel,
    status: Option<String>,
}

impl HandControlApp {
    pub fn new(session: Session, frame_loop: FrameLoop, video: VideoPanel) -> Self {
        let ports = ports::list_ports();
        let selected_port = ports::default_port(&ports);
        log::info!("Found {} serial port(s)", ports.len());

        Self {
            ports,
            selected_port,
            session,
            frame_loop,
            timer: StepTimer::default(),
            video,
            status: None,
        }
    }

    fn refresh_ports(&mut self) {
        self.ports = ports::list_ports();
        self.selected_port = ports::reselect(&self.ports, &self.selected_port);
    }

    fn start(&mut self) {
        match self.session.start(&self.selected_port) {
            Ok(()) => {
                self.status = None;
                self.frame_loop.reset_stats();
                self.timer.arm(Instant::now());
            }
            Err(e) => {
                log::error!("Failed to start: {}", e);
                self.status = Some(e.to_string());
            }
        }
    }

    fn stop(&mut self) {
        self.session.stop();
        self.timer.cancel();
    }

    /// Run the loop step if due and schedule the next repaint
    fn drive_loop(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        if self.timer.is_due(now) {
            let tick = self.frame_loop.step(&mut self.session, &mut self.video);
            self.timer.schedule(tick, now);
        }
        if let Some(remaining) = self.timer.remaining(Instant::now()) {
            ctx.request_repaint_after(remaining);
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let running = self.session.is_running();

        ui.label("Select COM Port:");
        ui.horizontal(|ui| {
            ui.add_enabled_ui(!running, |ui| {
                egui::ComboBox::from_id_source("com_port")
                    .selected_text(self.selected_port.as_str())
                    .width(200.0)
                    .show_ui(ui, |ui| {
                        for port in &self.ports {
                            let label = port.as_str();
                            ui.selectable_value(&mut self.selected_port, port.clone(), label);
                        }
                    });
            });
            if ui.add_enabled(!running, egui::Button::new("Refresh")).clicked() {
                self.refresh_ports();
            }
        });

        if ui.add_enabled(!running, egui::Button::new("Start")).clicked() {
            self.start();
        }
        if ui.add_enabled(running, egui::Button::new("Stop")).clicked() {
            self.stop();
        }
    }

    fn status_line(&self, ui: &mut egui::Ui) {
        if let Some(status) = &self.status {
            ui.label(RichText::new(status).color(Color32::from_rgb(220, 80, 60)));
        } else if self.session.is_running() {
            let stats = self.frame_loop.stats();
            ui.label(
                RichText::new(format!(
                    "{} frames, {} with hand, {} skipped",
                    stats.frames, stats.hands, stats.skipped
                ))
                .size(11.0)
                .color(Color32::from_gray(150)),
            );
        }
    }
}

impl eframe::App for HandControlApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drive_loop(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                self.controls(ui);
                self.status_line(ui);

                ui.add_space(10.0);
                ui.group(|ui| {
                    ui.label("Live Feed");
                    self.video.show(ui);
                });
            });
        });
    }
}

impl Drop for HandControlApp {
    fn drop(&mut self) {
        self.session.stop();
    }
}
