use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::{mask_key, AppConfig};

static STORY_LOGGER: Lazy<StoryLogger> = Lazy::new(StoryLogger::new);

pub fn init() -> Result<(), String> {
    init_with_config(LoggerConfig::default())
}

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let max_level = config.min_level.to_level_filter();

    // A rejected second install leaves the running logger untouched.
    log::set_logger(&*STORY_LOGGER).map_err(|e| format!("Failed to set logger: {:?}", e))?;
    STORY_LOGGER.update_config(config);
    log::set_max_level(max_level);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Trace => "🔍",
            LogLevel::Debug => "🐛",
            LogLevel::Info => "📖",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn to_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    pub fn to_level_filter(&self) -> LevelFilter {
        self.to_level().to_level_filter()
    }

    pub fn from_level(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

/// One emitted log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub module: String,
    pub file: String,
    pub line: u32,
    pub thread: String,
}

impl LogEntry {
    fn from_record(record: &Record) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level: LogLevel::from_level(record.level()),
            message: record.args().to_string(),
            module: record.module_path().unwrap_or("unknown").to_string(),
            file: record.file().unwrap_or("unknown").to_string(),
            line: record.line().unwrap_or(0),
            thread: format!("{:?}", std::thread::current().id()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_thread_id: bool,
    pub show_file_location: bool,
    pub show_module: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_file_path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_emojis: true,
            show_thread_id: false,
            show_file_location: false,
            show_module: true,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_file_path: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_file_path = Some(path.to_string());
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn production() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: false,
            show_emojis: false,
            output_json: true,
            log_file_path: Some("storygen.log".to_string()),
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            show_file_location: true,
            ..Default::default()
        }
    }
}

pub struct StoryLogger {
    config: Mutex<LoggerConfig>,
    log_file: Mutex<Option<File>>,
}

impl StoryLogger {
    fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
            log_file: Mutex::new(None),
        }
    }

    fn update_config(&self, new_config: LoggerConfig) {
        let file = new_config.log_file_path.as_ref().and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

        if let Ok(mut log_file) = self.log_file.lock() {
            *log_file = file;
        }
        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
    }

    fn format_line(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        let paint = |text: String, style: fn(ColoredString) -> ColoredString| {
            if config.show_colors {
                style(text.normal()).to_string()
            } else {
                text
            }
        };

        let mut output = paint(
            entry.timestamp.format(&config.timestamp_format).to_string(),
            |s| s.bright_black(),
        );

        let level = if config.show_emojis {
            format!("{} {}", entry.level.emoji(), entry.level.as_str())
        } else {
            entry.level.as_str().to_string()
        };
        if config.show_colors {
            output.push_str(&format!(" [{}] ", level.color(entry.level.color()).bold()));
        } else {
            output.push_str(&format!(" [{}] ", level));
        }

        if config.show_module && !entry.module.is_empty() {
            output.push_str(&paint(format!("{}: ", entry.module), |s| s.bright_blue()));
        }

        output.push_str(&entry.message);

        if config.show_thread_id {
            output.push_str(&paint(format!(" [thread:{}]", entry.thread), |s| {
                s.bright_black()
            }));
        }

        if config.show_file_location {
            output.push_str(&paint(format!(" ({}:{})", entry.file, entry.line), |s| {
                s.bright_black()
            }));
        }

        output
    }

    fn render(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        if config.output_json {
            serde_json::to_string(entry).unwrap_or_default()
        } else {
            self.format_line(entry, config)
        }
    }

    fn write_to_file(&self, line: &str) {
        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = writeln!(file, "{}", line);
            }
        }
    }
}

impl log::Log for StoryLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => metadata.level() <= config.min_level.to_level(),
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = LogEntry::from_record(record);
        let Ok(config) = self.config.lock() else {
            return;
        };

        let line = self.render(&entry, &config);
        if entry.level >= LogLevel::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }

        if config.log_file_path.is_some() {
            let file_line = if config.show_colors && !config.output_json {
                self.format_line(&entry, &LoggerConfig {
                    show_colors: false,
                    ..config.clone()
                })
            } else {
                line
            };
            self.write_to_file(&file_line);
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Measures a named operation and logs how long it took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        log::debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!(
            "⏱️  {} finished in {}ms",
            self.name,
            self.elapsed().as_millis()
        );
    }
}

pub fn timer(name: impl Into<String>) -> Timer {
    Timer::new(name)
}

pub fn log_startup_info(app_name: &str, version: &str, port: u16) {
    log::info!("🚀 Starting {} v{}", app_name, version);
    log::info!("🌐 Listening on http://127.0.0.1:{}", port);
}

pub fn log_config_info(config: &AppConfig) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   Backend: {}", config.api_base);
    log::info!(
        "   Operator key: {}",
        config
            .api_key
            .as_deref()
            .map(mask_key)
            .unwrap_or_else(|| "not set (BYOK only)".to_string())
    );
    log::info!("   Settings file: {}", config.settings_path.display());
    log::info!(
        "   Worker slots: {}, timeout: {}s, max tokens: {}",
        config.max_concurrent,
        config.request_timeout.as_secs(),
        config.max_tokens
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        assert_eq!(LogLevel::Info.as_str(), "INFO");
        assert_eq!(LogLevel::Error.emoji(), "❌");
        assert_eq!(LogLevel::Debug.color(), Color::Blue);
        assert_eq!(LogLevel::from_level(Level::Warn), LogLevel::Warn);
        assert!(LogLevel::Error > LogLevel::Warn);
    }

    #[test]
    fn test_logger_config_presets() {
        let config = LoggerConfig::development();
        assert_eq!(config.min_level, LogLevel::Debug);
        assert!(config.show_colors);

        let prod_config = LoggerConfig::production();
        assert!(!prod_config.show_colors);
        assert!(prod_config.output_json);
        assert!(prod_config.log_file_path.is_some());
    }

    #[test]
    fn test_plain_line_format() {
        let logger = StoryLogger::new();
        let config = LoggerConfig {
            show_emojis: false,
            ..LoggerConfig::new().with_colors(false)
        };
        let entry = LogEntry {
            id: "id".into(),
            timestamp: Utc::now(),
            level: LogLevel::Warn,
            message: "Failed to parse settings".into(),
            module: "storygen::settings".into(),
            file: "src/settings.rs".into(),
            line: 7,
            thread: "main".into(),
        };

        let line = logger.render(&entry, &config);
        assert!(line.contains("[WARN] storygen::settings: Failed to parse settings"));

        let json = logger.render(&entry, &config.with_json_output(true));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["level"], "Warn");
        assert_eq!(value["line"], 7);
    }

    #[test]
    fn test_logger_initialization() {
        assert!(init_with_config(LoggerConfig::development()).is_ok());
        assert!(init().is_err());
        assert!(init_with_config(LoggerConfig::production().with_json_output(true)).is_err());

        let config = STORY_LOGGER.config.lock().unwrap();
        assert_eq!(config.min_level, LogLevel::Debug);
        assert!(config.show_colors);
        assert!(!config.output_json);
    }
}
