use crate::config::{ChannelConfig, ChannelId, PanelConfig};
use crate::led::dispatch::{ActionRequest, Brightness, DispatchOutcome, Dispatcher};
use crate::led::validate::{ValidationError, parse_duration};

/// What the controller needs from whatever renders the form.
pub trait FormView {
    fn duration_text(&self) -> String;
    fn brightness(&self) -> u8;
    fn set_button_enabled(&mut self, channel: ChannelId, enabled: bool);
    fn show_error(&mut self, message: &str);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonState {
    Idle,
    Busy,
}

/// Result of the first half of an activation.
#[derive(Debug, Clone, PartialEq)]
pub enum Begin {
    /// Button is disabled and the request must be dispatched, then handed to
    /// [`FormController::finish`].
    Ready(ActionRequest),
    /// Duration was invalid; the button is already enabled again.
    Rejected(ValidationError),
    /// The channel already has a request in flight.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActivationOutcome {
    Dispatched(DispatchOutcome),
    Rejected(ValidationError),
    Ignored,
}

pub struct FormController {
    channels: Vec<ChannelConfig>,
    states: Vec<(ChannelId, ButtonState)>,
}

impl FormController {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            channels: config.channels().to_vec(),
            states: config
                .channels()
                .iter()
                .map(|channel| (channel.id, ButtonState::Idle))
                .collect(),
        }
    }

    pub fn state(&self, channel: ChannelId) -> ButtonState {
        self.states
            .iter()
            .find(|(id, _)| *id == channel)
            .map(|(_, state)| *state)
            .unwrap_or(ButtonState::Idle)
    }

    pub fn is_busy(&self, channel: ChannelId) -> bool {
        self.state(channel) == ButtonState::Busy
    }

    fn set_state(&mut self, channel: ChannelId, state: ButtonState) {
        if let Some(entry) = self.states.iter_mut().find(|(id, _)| *id == channel) {
            entry.1 = state;
        }
    }

    fn channel_config(&self, channel: ChannelId) -> Option<&ChannelConfig> {
        self.channels.iter().find(|config| config.id == channel)
    }

    /// Disables the button, reads the form and validates the duration.
    pub fn begin(&mut self, channel: ChannelId, view: &mut dyn FormView) -> Begin {
        let Some(channel_config) = self.channel_config(channel).cloned() else {
            return Begin::Ignored;
        };
        if self.is_busy(channel) {
            tracing::debug!(%channel, "activation ignored, request already in flight");
            return Begin::Ignored;
        }

        self.set_state(channel, ButtonState::Busy);
        view.set_button_enabled(channel, false);
        tracing::debug!(%channel, "button disabled");

        let duration_text = view.duration_text();
        let raw_brightness = view.brightness();
        let brightness = Brightness::new(raw_brightness).unwrap_or_else(|| {
            tracing::warn!(%channel, raw_brightness, "brightness out of range, clamping");
            Brightness::saturating(raw_brightness)
        });
        match parse_duration(&duration_text) {
            Ok(duration) => Begin::Ready(ActionRequest::new(&channel_config, duration, brightness)),
            Err(err) => {
                tracing::warn!(%channel, "rejected duration input: {err}");
                self.release(channel, view);
                view.show_error(err.user_message());
                Begin::Rejected(err)
            }
        }
    }

    /// Re-enables the button after a dispatch, whatever its outcome.
    pub fn finish(
        &mut self,
        channel: ChannelId,
        outcome: &DispatchOutcome,
        view: &mut dyn FormView,
    ) {
        self.release(channel, view);
        if let DispatchOutcome::Failed(reason) = outcome {
            view.show_error(&format!("Не удалось управлять светодиодом: {reason}"));
        }
    }

    /// Runs the whole activation on the calling thread.
    pub fn activate(
        &mut self,
        channel: ChannelId,
        view: &mut dyn FormView,
        dispatcher: &mut Dispatcher,
    ) -> ActivationOutcome {
        match self.begin(channel, view) {
            Begin::Ready(request) => {
                let outcome = dispatcher.dispatch(&request);
                self.finish(channel, &outcome, view);
                ActivationOutcome::Dispatched(outcome)
            }
            Begin::Rejected(err) => ActivationOutcome::Rejected(err),
            Begin::Ignored => ActivationOutcome::Ignored,
        }
    }

    fn release(&mut self, channel: ChannelId, view: &mut dyn FormView) {
        self.set_state(channel, ButtonState::Idle);
        view.set_button_enabled(channel, true);
        tracing::debug!(%channel, "button enabled");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use anyhow::Result;

    use super::*;
    use crate::led::output::{LedOutput, SimulatedOutput};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Enabled(ChannelId, bool),
        Error(String),
        Write(u8, f64),
    }

    type EventLog = Arc<Mutex<Vec<Event>>>;

    struct FakeView {
        duration: String,
        brightness: u8,
        events: EventLog,
    }

    impl FakeView {
        fn new(duration: &str, brightness: u8, events: &EventLog) -> Self {
            Self {
                duration: duration.to_string(),
                brightness,
                events: Arc::clone(events),
            }
        }
    }

    impl FormView for FakeView {
        fn duration_text(&self) -> String {
            self.duration.clone()
        }

        fn brightness(&self) -> u8 {
            self.brightness
        }

        fn set_button_enabled(&mut self, channel: ChannelId, enabled: bool) {
            self.events
                .lock()
                .expect("lock")
                .push(Event::Enabled(channel, enabled));
        }

        fn show_error(&mut self, message: &str) {
            self.events
                .lock()
                .expect("lock")
                .push(Event::Error(message.to_string()));
        }
    }

    struct LoggingOutput {
        events: EventLog,
    }

    impl LedOutput for LoggingOutput {
        fn set_level(&mut self, address: u8, duty: f64) -> Result<()> {
            self.events
                .lock()
                .expect("lock")
                .push(Event::Write(address, duty));
            Ok(())
        }

        fn is_hardware_backed(&self) -> bool {
            false
        }
    }

    fn logging_dispatcher(events: &EventLog) -> Dispatcher {
        Dispatcher::new(Box::new(LoggingOutput {
            events: Arc::clone(events),
        }))
    }

    #[test]
    fn default_form_lights_blue_channel_for_about_a_second() {
        let events = EventLog::default();
        let mut view = FakeView::new("1.0", 50, &events);
        let mut dispatcher = logging_dispatcher(&events);
        let mut controller = FormController::new(&PanelConfig::default());

        let started = Instant::now();
        let outcome = controller.activate(ChannelId::Blue, &mut view, &mut dispatcher);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1_000));
        assert!(elapsed < Duration::from_secs(3));

        let ActivationOutcome::Dispatched(DispatchOutcome::Completed(record)) = outcome else {
            panic!("expected a completed dispatch, got {outcome:?}");
        };
        assert_eq!(record.address, 3);
        assert_eq!(record.duration.get(), 1.0);
        assert_eq!(record.brightness.percent(), 50);
        assert_eq!(
            *events.lock().expect("lock"),
            vec![
                Event::Enabled(ChannelId::Blue, false),
                Event::Write(3, 0.5),
                Event::Write(3, 0.0),
                Event::Enabled(ChannelId::Blue, true),
            ]
        );
        assert_eq!(controller.state(ChannelId::Blue), ButtonState::Idle);
    }

    #[test]
    fn zero_duration_shows_error_and_never_dispatches() {
        let events = EventLog::default();
        let mut view = FakeView::new("0", 50, &events);
        let mut dispatcher = logging_dispatcher(&events);
        let mut controller = FormController::new(&PanelConfig::default());

        let started = Instant::now();
        let outcome = controller.activate(ChannelId::Red, &mut view, &mut dispatcher);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(matches!(
            outcome,
            ActivationOutcome::Rejected(ValidationError::NotPositive { .. })
        ));
        assert_eq!(
            *events.lock().expect("lock"),
            vec![
                Event::Enabled(ChannelId::Red, false),
                Event::Enabled(ChannelId::Red, true),
                Event::Error("Введите корректное число для времени".to_string()),
            ]
        );
        assert!(!controller.is_busy(ChannelId::Red));
    }

    #[test]
    fn busy_channel_ignores_second_activation() {
        let events = EventLog::default();
        let mut view = FakeView::new("0.5", 10, &events);
        let mut controller = FormController::new(&PanelConfig::default());

        let Begin::Ready(request) = controller.begin(ChannelId::Blue, &mut view) else {
            panic!("first activation should be accepted");
        };
        assert!(controller.is_busy(ChannelId::Blue));
        assert_eq!(controller.begin(ChannelId::Blue, &mut view), Begin::Ignored);
        assert!(matches!(
            controller.begin(ChannelId::Red, &mut view),
            Begin::Ready(_)
        ));

        let mut dispatcher = Dispatcher::new(Box::new(SimulatedOutput::new()));
        let outcome = dispatcher.dispatch(&ActionRequest {
            duration: crate::led::validate::parse_duration("0.01").expect("duration"),
            ..request
        });
        controller.finish(ChannelId::Blue, &outcome, &mut view);
        assert!(!controller.is_busy(ChannelId::Blue));
        assert!(controller.is_busy(ChannelId::Red));
    }

    #[test]
    fn out_of_range_brightness_is_clamped() {
        let events = EventLog::default();
        let mut view = FakeView::new("2", 180, &events);
        let mut controller = FormController::new(&PanelConfig::default());
        let Begin::Ready(request) = controller.begin(ChannelId::Red, &mut view) else {
            panic!("valid duration");
        };
        assert_eq!(request.address, 5);
        assert_eq!(request.brightness.percent(), 100);
    }

    #[test]
    fn failed_dispatch_still_reenables_and_reports() {
        let events = EventLog::default();
        let mut view = FakeView::new("1", 50, &events);
        let mut controller = FormController::new(&PanelConfig::default());
        let Begin::Ready(_) = controller.begin(ChannelId::Blue, &mut view) else {
            panic!("valid duration");
        };
        controller.finish(
            ChannelId::Blue,
            &DispatchOutcome::Failed("bus error".to_string()),
            &mut view,
        );

        let log = events.lock().expect("lock");
        assert_eq!(log[1], Event::Enabled(ChannelId::Blue, true));
        assert!(matches!(&log[2], Event::Error(message) if message.contains("bus error")));
        assert!(!controller.is_busy(ChannelId::Blue));
    }
}
