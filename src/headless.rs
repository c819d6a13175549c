use anyhow::{Result, bail};

use crate::config::{ChannelId, PanelConfig};
use crate::led::controller::{ActivationOutcome, FormController, FormView};
use crate::led::dispatch::{DispatchOutcome, Dispatcher};
use crate::led::output::SelectedOutput;

/// Form view backed by command line values instead of widgets.
struct ConsoleView {
    duration_text: String,
    brightness: u8,
    errors: Vec<String>,
}

impl FormView for ConsoleView {
    fn duration_text(&self) -> String {
        self.duration_text.clone()
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn set_button_enabled(&mut self, channel: ChannelId, enabled: bool) {
        tracing::debug!(%channel, enabled, "console button state");
    }

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

/// Activates one channel on the calling thread, the same way a button click
/// does, and fails if the form would have shown an error.
pub fn fire_once(
    config: &PanelConfig,
    selected: SelectedOutput,
    channel: ChannelId,
    duration_text: &str,
    brightness: u8,
) -> Result<()> {
    tracing::debug!(
        %channel,
        address = config.channel(channel).address,
        "headless activation"
    );
    let mut view = ConsoleView {
        duration_text: duration_text.to_string(),
        brightness,
        errors: Vec::new(),
    };
    let mut dispatcher = Dispatcher::new(selected.output);
    let mut controller = FormController::new(config);

    match controller.activate(channel, &mut view, &mut dispatcher) {
        ActivationOutcome::Dispatched(DispatchOutcome::Completed(_)) => Ok(()),
        ActivationOutcome::Dispatched(DispatchOutcome::Failed(_))
        | ActivationOutcome::Rejected(_) => bail!("{}", view.errors.join("; ")),
        ActivationOutcome::Ignored => bail!("channel '{channel}' is busy"),
    }
}
