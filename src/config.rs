use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::Deserialize;

pub const DEFAULT_HELP_TEXT: &str = "Программа управления светодиодами v1.0\n\n\
Функциональные возможности:\n\
• Управление синим и красным светодиодами\n\
• Регулировка длительности свечения\n\
• Плавная регулировка яркости\n\n\
Разработка: 2026 год";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum)]
pub enum ChannelId {
    Blue,
    Red,
}

impl ChannelId {
    pub const ALL: [ChannelId; 2] = [ChannelId::Blue, ChannelId::Red];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelId::Blue => "blue",
            ChannelId::Red => "red",
        }
    }

    fn index(self) -> usize {
        match self {
            ChannelId::Blue => 0,
            ChannelId::Red => 1,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn parse_hex(text: &str) -> Result<Self> {
        let Some(digits) = text.strip_prefix('#') else {
            bail!("color '{text}' must start with '#'");
        };
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("color '{text}' must be written as #rrggbb");
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .with_context(|| format!("invalid color component in '{text}'"))
        };
        Ok(Self(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Background and text color of one button.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ButtonColors {
    pub fill: Rgb,
    pub text: Rgb,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FontSpec {
    pub size: f32,
    pub bold: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChannelConfig {
    pub id: ChannelId,
    pub address: u8,
    pub label: String,
    pub colors: ButtonColors,
}

/// Everything the form needs at startup. Built once, then only read.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelConfig {
    pub title: String,
    pub header: String,
    pub window_size: [f32; 2],
    pub background: Rgb,
    pub foreground: Rgb,
    pub entry_fill: Rgb,
    pub trough: Rgb,
    pub header_font: FontSpec,
    pub label_font: FontSpec,
    pub button_font: FontSpec,
    pub button_padding: [f32; 2],
    pub entry_width_chars: usize,
    pub slider_length: f32,
    pub duration_label: String,
    pub brightness_label: String,
    pub default_duration: String,
    pub default_brightness: u8,
    pub help_label: String,
    pub help_colors: ButtonColors,
    pub help_text: String,
    pub exit_label: String,
    pub exit_colors: ButtonColors,
    channels: [ChannelConfig; 2],
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            title: "Управление светодиодами".to_string(),
            header: "УПРАВЛЕНИЕ СВЕТОДИОДАМИ".to_string(),
            window_size: [350.0, 280.0],
            background: Rgb(0x1a, 0x1b, 0x2e),
            foreground: Rgb(0xe5, 0xe7, 0xeb),
            entry_fill: Rgb(0x2d, 0x37, 0x48),
            trough: Rgb(0x37, 0x41, 0x51),
            header_font: FontSpec {
                size: 22.0,
                bold: true,
            },
            label_font: FontSpec {
                size: 11.0,
                bold: false,
            },
            button_font: FontSpec {
                size: 10.0,
                bold: true,
            },
            button_padding: [15.0, 8.0],
            entry_width_chars: 15,
            slider_length: 180.0,
            duration_label: "Длительность (сек):".to_string(),
            brightness_label: "Уровень яркости:".to_string(),
            default_duration: "1.0".to_string(),
            default_brightness: 50,
            help_label: "СПРАВКА".to_string(),
            help_colors: ButtonColors {
                fill: Rgb(0x16, 0xa3, 0x4a),
                text: Rgb(0xdc, 0xfc, 0xe7),
            },
            help_text: DEFAULT_HELP_TEXT.to_string(),
            exit_label: "ВЫХОД".to_string(),
            exit_colors: ButtonColors {
                fill: Rgb(0x4b, 0x55, 0x63),
                text: Rgb(0xf3, 0xf4, 0xf6),
            },
            channels: [
                ChannelConfig {
                    id: ChannelId::Blue,
                    address: 3,
                    label: "СИНИЙ СВЕТОДИОД".to_string(),
                    colors: ButtonColors {
                        fill: Rgb(0x25, 0x63, 0xeb),
                        text: Rgb(0xdb, 0xea, 0xfe),
                    },
                },
                ChannelConfig {
                    id: ChannelId::Red,
                    address: 5,
                    label: "КРАСНЫЙ СВЕТОДИОД".to_string(),
                    colors: ButtonColors {
                        fill: Rgb(0xdc, 0x26, 0x26),
                        text: Rgb(0xfe, 0xe2, 0xe2),
                    },
                },
            ],
        }
    }
}

impl PanelConfig {
    pub fn channel(&self, id: ChannelId) -> &ChannelConfig {
        &self.channels[id.index()]
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }
}

pub fn load_panel_config(path: &Path) -> Result<PanelConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    parse_panel_config_text(&content)
}

pub fn parse_panel_config_text(content: &str) -> Result<PanelConfig> {
    let raw = serde_json::from_str::<PanelConfigFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != 1 {
        bail!(
            "unsupported config version {}; expected version 1",
            raw.version
        );
    }

    let mut config = PanelConfig::default();
    if let Some(title) = raw.title {
        config.title = title;
    }
    if let Some(header) = raw.header {
        config.header = header;
    }
    if let Some([width, height]) = raw.window_size {
        if width <= 0.0 || height <= 0.0 {
            bail!("window_size must be positive, got {width}x{height}");
        }
        config.window_size = [width, height];
    }
    if let Some(background) = raw.background.as_deref() {
        config.background = Rgb::parse_hex(background).context("background")?;
    }
    if let Some(help_text) = raw.help_text {
        config.help_text = help_text;
    }
    if let Some(default_duration) = raw.default_duration {
        config.default_duration = default_duration;
    }
    if let Some(default_brightness) = raw.default_brightness {
        if default_brightness > 100 {
            bail!("default_brightness must be within 0..=100, got {default_brightness}");
        }
        config.default_brightness = default_brightness;
    }

    let mut seen_ids = HashSet::new();
    for channel in raw.channels {
        let id = match channel.id.as_str() {
            "blue" => ChannelId::Blue,
            "red" => ChannelId::Red,
            other => bail!("unknown channel '{other}'; expected 'blue' or 'red'"),
        };
        if !seen_ids.insert(id) {
            bail!("channel '{id}' is configured more than once");
        }

        let target = &mut config.channels[id.index()];
        if let Some(address) = channel.address {
            target.address = address;
        }
        if let Some(label) = channel.label {
            target.label = label;
        }
        if let Some(fill) = channel.fill.as_deref() {
            target.colors.fill =
                Rgb::parse_hex(fill).with_context(|| format!("channel '{id}' fill"))?;
        }
        if let Some(text) = channel.text.as_deref() {
            target.colors.text =
                Rgb::parse_hex(text).with_context(|| format!("channel '{id}' text"))?;
        }
    }

    let [blue, red] = &config.channels;
    if blue.address == red.address {
        bail!(
            "channels 'blue' and 'red' share address {}; addresses must be distinct",
            blue.address
        );
    }

    Ok(config)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PanelConfigFile {
    version: u32,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    header: Option<String>,
    #[serde(default)]
    window_size: Option<[f32; 2]>,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    help_text: Option<String>,
    #[serde(default)]
    default_duration: Option<String>,
    #[serde(default)]
    default_brightness: Option<u8>,
    #[serde(default)]
    channels: Vec<ChannelFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChannelFile {
    id: String,
    #[serde(default)]
    address: Option<u8>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    fill: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_channels_map_to_fixed_addresses() {
        let config = PanelConfig::default();
        assert_eq!(config.channel(ChannelId::Blue).address, 3);
        assert_eq!(config.channel(ChannelId::Red).address, 5);
        assert_eq!(config.channels().len(), 2);
        assert_eq!(config.default_duration, "1.0");
        assert_eq!(config.default_brightness, 50);
    }

    #[test]
    fn minimal_file_keeps_defaults() {
        let config = parse_panel_config_text(r#"{ "version": 1 }"#).expect("minimal config");
        assert_eq!(config, PanelConfig::default());
    }

    #[test]
    fn file_overrides_channel_fields() {
        let config = parse_panel_config_text(
            r##"{
                "version": 1,
                "title": "LEDs",
                "channels": [
                    { "id": "red", "address": 9, "label": "RED", "fill": "#ff0000" }
                ]
            }"##,
        )
        .expect("config with overrides");
        assert_eq!(config.title, "LEDs");
        let red = config.channel(ChannelId::Red);
        assert_eq!(red.address, 9);
        assert_eq!(red.label, "RED");
        assert_eq!(red.colors.fill, Rgb(255, 0, 0));
        assert_eq!(config.channel(ChannelId::Blue).address, 3);
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let err = parse_panel_config_text(r#"{ "version": 1, "channels": [{ "id": "green" }] }"#)
            .expect_err("green is not a channel");
        assert!(err.to_string().contains("unknown channel 'green'"));
    }

    #[test]
    fn duplicate_addresses_are_rejected() {
        let err = parse_panel_config_text(
            r#"{ "version": 1, "channels": [{ "id": "blue", "address": 5 }] }"#,
        )
        .expect_err("blue collides with red");
        assert!(err.to_string().contains("share address 5"));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = parse_panel_config_text(r#"{ "version": 2 }"#).expect_err("version 2");
        assert!(err.to_string().contains("unsupported config version 2"));
    }

    #[test]
    fn malformed_json_reports_position() {
        let err = parse_panel_config_text("{ nope").expect_err("broken json");
        assert!(err.to_string().contains("invalid JSON at line 1"));
    }

    #[test]
    fn hex_colors_parse_and_reject_garbage() {
        assert_eq!(Rgb::parse_hex("#2563eb").expect("hex"), Rgb(0x25, 0x63, 0xeb));
        assert!(Rgb::parse_hex("2563eb").is_err());
        assert!(Rgb::parse_hex("#25g3eb").is_err());
        assert!(Rgb::parse_hex("#fff").is_err());
    }
}
