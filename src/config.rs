use crate::game::approach::{DEFAULT_NOTE_SPEED, MAX_NOTE_SPEED, MIN_NOTE_SPEED};
use crate::ui::connector::{DEFAULT_QUALITY, MAX_QUALITY};
use log::{LevelFilter, info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

const CONFIG_PATH: &str = "lanefield.ini";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse_str(&content);
        Ok(())
    }

    pub fn parse_str(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let section = line[1..line.len() - 1].trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            // Key/value pair: key=value
            if let Some((key_raw, value_raw)) = line.split_once('=') {
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value_raw.trim().to_string());
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Approach speed setting, 1 (slowest) ..= 12 (fastest).
    pub note_speed: f32,
    /// 0 = off. Fraction of the approach after which notes fade out.
    pub hidden: f32,
    /// Upper bound on quads per connector segment.
    pub connector_quality: u32,
    /// Pulse held slide connectors between their normal and active sprites.
    pub connector_animation: bool,
    pub guide_alpha: f32,
    // Subdivision multiplier for the flat preview; play/watch use their own.
    pub preview_quality_scale: f32,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            note_speed: DEFAULT_NOTE_SPEED,
            hidden: 0.0,
            connector_quality: DEFAULT_QUALITY,
            connector_animation: true,
            guide_alpha: 0.5,
            preview_quality_scale: 1.0,
            log_level: LogLevel::Warn,
        }
    }
}

impl Config {
    /// Reads `[Options]`, keeping defaults for anything missing or malformed.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Self::default();
        let float = |key: &str| {
            conf.get("Options", key).and_then(|v| {
                let parsed = v.parse::<f32>().ok().filter(|f| f.is_finite());
                if parsed.is_none() {
                    warn!("Ignoring invalid value '{v}' for {key}");
                }
                parsed
            })
        };

        Self {
            note_speed: float("NoteSpeed")
                .map_or(default.note_speed, |v| v.clamp(MIN_NOTE_SPEED, MAX_NOTE_SPEED)),
            hidden: float("Hidden").map_or(default.hidden, |v| v.clamp(0.0, 1.0)),
            connector_quality: conf
                .get("Options", "ConnectorQuality")
                .and_then(|v| v.parse::<u32>().ok())
                .map_or(default.connector_quality, |v| v.clamp(1, MAX_QUALITY)),
            connector_animation: conf
                .get("Options", "ConnectorAnimation")
                .and_then(|v| v.parse::<u8>().ok())
                .map_or(default.connector_animation, |v| v != 0),
            guide_alpha: float("GuideAlpha").map_or(default.guide_alpha, |v| v.clamp(0.0, 1.0)),
            preview_quality_scale: float("PreviewQualityScale")
                .filter(|v| *v > 0.0)
                .unwrap_or(default.preview_quality_scale),
            log_level: conf
                .get("Options", "LogLevel")
                .and_then(|v| LogLevel::from_str(&v).ok())
                .unwrap_or(default.log_level),
        }
    }

    fn to_ini_string(&self) -> String {
        let mut content = String::new();
        // [Options] section - keys in alphabetical order
        content.push_str("[Options]\n");
        content.push_str(&format!(
            "ConnectorAnimation={}\n",
            if self.connector_animation { "1" } else { "0" }
        ));
        content.push_str(&format!("ConnectorQuality={}\n", self.connector_quality));
        content.push_str(&format!("GuideAlpha={}\n", self.guide_alpha));
        content.push_str(&format!("Hidden={}\n", self.hidden));
        content.push_str(&format!("LogLevel={}\n", self.log_level.as_str()));
        content.push_str(&format!("NoteSpeed={}\n", self.note_speed));
        content.push_str(&format!("PreviewQualityScale={}\n", self.preview_quality_scale));
        content.push('\n');
        content
    }
}

// Global, mutable configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- File I/O ---

fn create_default_config_file() -> Result<(), std::io::Error> {
    info!("'{CONFIG_PATH}' not found, creating with default values.");
    std::fs::write(CONFIG_PATH, Config::default().to_ini_string())
}

pub fn load() {
    if !Path::new(CONFIG_PATH).exists()
        && let Err(e) = create_default_config_file()
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(CONFIG_PATH) {
        Ok(()) => {
            let loaded = Config::from_ini(&conf);
            *CONFIG.lock().unwrap() = loaded;
            info!("Configuration loaded from '{CONFIG_PATH}'.");
        }
        Err(e) => {
            warn!("Failed to load '{CONFIG_PATH}': {e}. Using default values.");
        }
    }
}

fn save() {
    let content = get().to_ini_string();
    if let Err(e) = std::fs::write(CONFIG_PATH, content) {
        warn!("Failed to save config file: {e}");
    }
}

pub fn get() -> Config {
    *CONFIG.lock().unwrap()
}

pub fn update_note_speed(speed: f32) {
    let clamped = speed.clamp(MIN_NOTE_SPEED, MAX_NOTE_SPEED);
    {
        let mut cfg = CONFIG.lock().unwrap();
        if (cfg.note_speed - clamped).abs() < f32::EPSILON {
            return;
        }
        cfg.note_speed = clamped;
    }
    save();
}

pub fn update_hidden(hidden: f32) {
    let clamped = hidden.clamp(0.0, 1.0);
    {
        let mut cfg = CONFIG.lock().unwrap();
        if (cfg.hidden - clamped).abs() < f32::EPSILON {
            return;
        }
        cfg.hidden = clamped;
    }
    save();
}

pub fn update_connector_quality(quality: u32) {
    let clamped = quality.clamp(1, MAX_QUALITY);
    {
        let mut cfg = CONFIG.lock().unwrap();
        if cfg.connector_quality == clamped {
            return;
        }
        cfg.connector_quality = clamped;
    }
    save();
}

pub fn update_connector_animation(enabled: bool) {
    {
        let mut cfg = CONFIG.lock().unwrap();
        if cfg.connector_animation == enabled {
            return;
        }
        cfg.connector_animation = enabled;
    }
    save();
}
