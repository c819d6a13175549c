use anyhow::{Result, anyhow, bail};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputKind {
    Auto,
    Simulated,
    Hardware,
}

/// Something that can drive an LED pin to a duty level.
pub trait LedOutput: Send {
    /// `duty` is in `0.0..=1.0`; `0.0` switches the LED off.
    fn set_level(&mut self, address: u8, duty: f64) -> Result<()>;
    fn is_hardware_backed(&self) -> bool;
}

/// Stand-in for a real controller. Accepts every write.
#[derive(Debug, Default)]
pub struct SimulatedOutput {
    writes: u64,
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedOutput for SimulatedOutput {
    fn set_level(&mut self, address: u8, duty: f64) -> Result<()> {
        self.writes += 1;
        tracing::trace!(address, duty, writes = self.writes, "simulated LED write");
        Ok(())
    }

    fn is_hardware_backed(&self) -> bool {
        false
    }
}

pub struct HardwareOutput;

impl HardwareOutput {
    pub fn try_new() -> Result<Self> {
        bail!("no supported LED controller detected")
    }
}

impl LedOutput for HardwareOutput {
    fn set_level(&mut self, _address: u8, _duty: f64) -> Result<()> {
        bail!("LED hardware output is unavailable")
    }

    fn is_hardware_backed(&self) -> bool {
        true
    }
}

pub struct SelectedOutput {
    pub output: Box<dyn LedOutput>,
    pub label: &'static str,
    pub fallback_reason: Option<String>,
}

pub fn select_output(kind: OutputKind) -> Result<SelectedOutput> {
    match kind {
        OutputKind::Simulated => Ok(SelectedOutput {
            output: Box::new(SimulatedOutput::new()),
            label: "SIMULATED",
            fallback_reason: None,
        }),
        OutputKind::Hardware => {
            let hardware = HardwareOutput::try_new()
                .map_err(|err| anyhow!("LED hardware output unavailable: {err}"))?;
            Ok(SelectedOutput {
                output: Box::new(hardware),
                label: "HARDWARE",
                fallback_reason: None,
            })
        }
        OutputKind::Auto => match HardwareOutput::try_new() {
            Ok(hardware) => Ok(SelectedOutput {
                output: Box::new(hardware),
                label: "HARDWARE",
                fallback_reason: None,
            }),
            Err(err) => {
                tracing::info!("falling back to simulated LED output: {err}");
                Ok(SelectedOutput {
                    output: Box::new(SimulatedOutput::new()),
                    label: "SIMULATED",
                    fallback_reason: Some(format!(
                        "LED controller not detected, using simulated output: {err}"
                    )),
                })
            }
        },
    }
}
