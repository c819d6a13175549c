use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use eframe::egui::{self, Align, Align2, Color32, Layout, RichText, TextEdit, Ui};

use crate::config::{ButtonColors, ChannelConfig, ChannelId, FontSpec, PanelConfig, Rgb};
use crate::led::controller::{Begin, FormController, FormView};
use crate::led::dispatch::{DispatchOutcome, Dispatcher};
use crate::led::output::SelectedOutput;
use crate::led::worker::DispatchWorker;

const ERROR_TITLE: &str = "Ошибка";
const HELP_TITLE: &str = "Справка";
const PENDING_REPAINT: Duration = Duration::from_millis(50);

pub fn run_gui(config: PanelConfig, selected: SelectedOutput) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(config.title.clone())
            .with_inner_size(config.window_size)
            .with_resizable(false),
        ..Default::default()
    };

    let title = config.title.clone();
    let app = LedPanelApp::new(config, selected)?;

    eframe::run_native(
        &title,
        native_options,
        Box::new(move |cc| {
            configure_theme(&cc.egui_ctx, &app.config);
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed to launch LED panel GUI: {err}"))?;

    Ok(())
}

fn configure_theme(ctx: &egui::Context, config: &PanelConfig) {
    let mut visuals = egui::Visuals::dark();
    visuals.override_text_color = Some(color(config.foreground));
    visuals.panel_fill = color(config.background);
    visuals.window_fill = color(config.background);
    visuals.extreme_bg_color = color(config.entry_fill);
    visuals.widgets.inactive.bg_fill = color(config.trough);
    ctx.set_visuals(visuals);
}

fn color(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

/// Point sizes in the config are converted to logical pixels.
fn font_px(font: FontSpec) -> f32 {
    font.size * 4.0 / 3.0
}

fn styled_text(text: &str, font: FontSpec) -> RichText {
    let rich = RichText::new(text).size(font_px(font));
    if font.bold { rich.strong() } else { rich }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum NotificationKind {
    Error,
    Info,
}

#[derive(Debug, Clone)]
struct Notification {
    kind: NotificationKind,
    message: String,
}

/// Widget state the controller reads from and writes to.
struct FormState {
    duration_text: String,
    brightness: u8,
    disabled: HashSet<ChannelId>,
    notification: Option<Notification>,
}

impl FormState {
    fn is_enabled(&self, channel: ChannelId) -> bool {
        !self.disabled.contains(&channel)
    }
}

impl FormView for FormState {
    fn duration_text(&self) -> String {
        self.duration_text.clone()
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn set_button_enabled(&mut self, channel: ChannelId, enabled: bool) {
        if enabled {
            self.disabled.remove(&channel);
        } else {
            self.disabled.insert(channel);
        }
    }

    fn show_error(&mut self, message: &str) {
        self.notification = Some(Notification {
            kind: NotificationKind::Error,
            message: message.to_string(),
        });
    }
}

struct LedPanelApp {
    config: PanelConfig,
    form: FormState,
    controller: FormController,
    worker: DispatchWorker,
    output_label: &'static str,
    output_is_hardware: bool,
    fallback_reason: Option<String>,
}

impl LedPanelApp {
    fn new(config: PanelConfig, selected: SelectedOutput) -> Result<Self> {
        let output_is_hardware = selected.output.is_hardware_backed();
        let worker = DispatchWorker::start(Dispatcher::new(selected.output))?;
        Ok(Self {
            form: FormState {
                duration_text: config.default_duration.clone(),
                brightness: config.default_brightness,
                disabled: HashSet::new(),
                notification: None,
            },
            controller: FormController::new(&config),
            worker,
            output_label: selected.label,
            output_is_hardware,
            fallback_reason: selected.fallback_reason,
            config,
        })
    }

    fn has_pending(&self) -> bool {
        ChannelId::ALL
            .iter()
            .any(|channel| self.controller.is_busy(*channel))
    }

    fn activate(&mut self, channel: ChannelId) {
        if let Begin::Ready(request) = self.controller.begin(channel, &mut self.form)
            && let Err(err) = self.worker.submit(request)
        {
            let outcome = DispatchOutcome::Failed(format!("{err:#}"));
            self.controller.finish(channel, &outcome, &mut self.form);
        }
    }

    fn collect_completions(&mut self) {
        while let Some((channel, outcome)) = self.worker.poll() {
            self.controller.finish(channel, &outcome, &mut self.form);
        }
    }

    fn show_help(&mut self) {
        self.form.notification = Some(Notification {
            kind: NotificationKind::Info,
            message: self.config.help_text.clone(),
        });
    }

    fn show_form(&mut self, ui: &mut Ui) {
        if self.form.notification.is_some() {
            ui.disable();
        }
        let config = &self.config;

        ui.vertical_centered(|ui| {
            ui.add_space(15.0);
            ui.label(styled_text(&config.header, config.header_font).color(Color32::WHITE));
            ui.add_space(15.0);
        });

        let entry_width = config.entry_width_chars as f32 * font_px(config.label_font) * 0.6;
        labeled_row(ui, &config.duration_label, config.label_font, |ui| {
            ui.add(
                TextEdit::singleline(&mut self.form.duration_text)
                    .font(egui::FontId::proportional(font_px(config.label_font)))
                    .desired_width(entry_width),
            );
        });
        ui.add_space(5.0);
        labeled_row(ui, &config.brightness_label, config.label_font, |ui| {
            ui.spacing_mut().slider_width = config.slider_length;
            ui.add(egui::Slider::new(&mut self.form.brightness, 0..=100));
        });
        ui.add_space(20.0);

        let mut activated = None;
        ui.horizontal(|ui| {
            ui.spacing_mut().button_padding = egui::vec2(
                config.button_padding[0],
                config.button_padding[1],
            );
            for channel in config.channels() {
                let busy = self.controller.is_busy(channel.id);
                if channel_button(ui, config, channel, self.form.is_enabled(channel.id), busy)
                    .clicked()
                {
                    activated = Some(channel.id);
                }
            }
        });
        ui.add_space(10.0);

        let mut help_clicked = false;
        ui.horizontal(|ui| {
            ui.spacing_mut().button_padding = egui::vec2(
                config.button_padding[0],
                config.button_padding[1],
            );
            help_clicked = styled_button(
                ui,
                &config.help_label,
                config.help_colors,
                config.button_font,
                true,
            )
            .clicked();
            if styled_button(
                ui,
                &config.exit_label,
                config.exit_colors,
                config.button_font,
                true,
            )
            .clicked()
            {
                request_exit(ui.ctx());
            }
        });

        ui.with_layout(Layout::bottom_up(Align::Min), |ui| {
            let source = if self.output_is_hardware {
                format!("Output: {} (hardware)", self.output_label)
            } else {
                format!("Output: {}", self.output_label)
            };
            ui.label(RichText::new(source).small().weak());
            if let Some(reason) = self.fallback_reason.as_deref() {
                ui.label(RichText::new(reason).small().weak());
            }
        });

        if let Some(channel) = activated {
            self.activate(channel);
        }
        if help_clicked {
            self.show_help();
        }
    }

    fn show_notification(&mut self, ctx: &egui::Context) {
        let Some(notification) = &self.form.notification else {
            return;
        };
        let title = match notification.kind {
            NotificationKind::Error => ERROR_TITLE,
            NotificationKind::Info => HELP_TITLE,
        };

        let mut dismissed = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                let text = RichText::new(&notification.message);
                match notification.kind {
                    NotificationKind::Error => {
                        ui.label(text.color(Color32::from_rgb(255, 124, 124)).strong())
                    }
                    NotificationKind::Info => ui.label(text),
                };
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        if dismissed {
            self.form.notification = None;
        }
    }
}

/// Closes the window. Pending dispatches are cancelled when the app, and
/// with it the dispatch worker, is dropped.
fn request_exit(ctx: &egui::Context) {
    tracing::info!("exit requested");
    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
}

fn labeled_row(ui: &mut Ui, label: &str, font: FontSpec, add_control: impl FnOnce(&mut Ui)) {
    ui.horizontal(|ui| {
        ui.label(styled_text(label, font));
        ui.with_layout(Layout::right_to_left(Align::Center), add_control);
    });
}

fn styled_button(
    ui: &mut Ui,
    label: &str,
    colors: ButtonColors,
    font: FontSpec,
    enabled: bool,
) -> egui::Response {
    ui.add_enabled(
        enabled,
        egui::Button::new(styled_text(label, font).color(color(colors.text)))
            .fill(color(colors.fill)),
    )
}

fn channel_button(
    ui: &mut Ui,
    config: &PanelConfig,
    channel: &ChannelConfig,
    enabled: bool,
    busy: bool,
) -> egui::Response {
    let label = if busy {
        format!("{} …", channel.label)
    } else {
        channel.label.clone()
    };
    styled_button(ui, &label, channel.colors, config.button_font, enabled)
}

impl eframe::App for LedPanelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.collect_completions();

        egui::CentralPanel::default().show(ctx, |ui| self.show_form(ui));
        self.show_notification(ctx);

        if self.has_pending() {
            ctx.request_repaint_after(PENDING_REPAINT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::output::{OutputKind, select_output};

    fn app() -> LedPanelApp {
        let selected = select_output(OutputKind::Simulated).expect("simulated output");
        LedPanelApp::new(PanelConfig::default(), selected).expect("app")
    }

    fn wait_until_idle(app: &mut LedPanelApp) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while app.has_pending() {
            assert!(std::time::Instant::now() < deadline, "dispatch never finished");
            std::thread::sleep(Duration::from_millis(5));
            app.collect_completions();
        }
    }

    #[test]
    fn form_starts_with_reference_defaults() {
        let app = app();
        assert_eq!(app.form.duration_text, "1.0");
        assert_eq!(app.form.brightness, 50);
        assert!(app.form.is_enabled(ChannelId::Blue));
        assert!(app.form.is_enabled(ChannelId::Red));
    }

    #[test]
    fn button_stays_disabled_until_worker_reports_back() {
        let mut app = app();
        app.form.duration_text = "0.05".to_string();
        app.activate(ChannelId::Blue);
        assert!(!app.form.is_enabled(ChannelId::Blue));
        assert!(app.form.is_enabled(ChannelId::Red));
        assert!(app.has_pending());

        wait_until_idle(&mut app);
        assert!(app.form.is_enabled(ChannelId::Blue));
        assert!(app.form.notification.is_none());
    }

    #[test]
    fn invalid_duration_opens_error_notification() {
        let mut app = app();
        app.form.duration_text = "abc".to_string();
        app.activate(ChannelId::Red);
        assert!(app.form.is_enabled(ChannelId::Red));
        assert!(!app.has_pending());
        let notification = app.form.notification.as_ref().expect("error shown");
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.message, "Введите корректное число для времени");
    }

    #[test]
    fn exit_closes_viewport_and_cancels_pending_dispatch() {
        let mut app = app();
        app.form.duration_text = "3600".to_string();
        app.activate(ChannelId::Blue);
        assert!(app.has_pending());

        let ctx = egui::Context::default();
        let output = ctx.run(egui::RawInput::default(), request_exit);
        let root = output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .expect("root viewport output");
        assert!(
            root.commands
                .iter()
                .any(|command| matches!(command, egui::ViewportCommand::Close))
        );

        std::thread::sleep(Duration::from_millis(50));
        let started = std::time::Instant::now();
        drop(app);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn help_shows_configured_text() {
        let mut app = app();
        app.show_help();
        let notification = app.form.notification.as_ref().expect("help shown");
        assert_eq!(notification.kind, NotificationKind::Info);
        assert!(notification.message.starts_with("Программа управления светодиодами"));
    }
}
