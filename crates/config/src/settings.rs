//! Layered interview settings
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults (see [`crate::constants`])
//! 2. Optional config file (TOML, YAML or JSON, by extension)
//! 3. Environment overrides: `INTERVIEW__<SECTION>__<KEY>`

use config::{Config, Environment, File};
use mock_interview_core::AudioFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::constants;
use crate::ConfigError;

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewConfig {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub protocol: ProtocolSettings,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    #[serde(default)]
    pub endpoints: EndpointSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Per-session behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Speak interviewer replies sentence by sentence
    #[serde(default = "default_true")]
    pub speech_enabled: bool,
    /// Voice identifier for speech requests
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Allow the candidate to cut interviewer speech short
    #[serde(default = "default_true")]
    pub barge_in_enabled: bool,
    /// Session event channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            speech_enabled: true,
            voice: default_voice(),
            barge_in_enabled: true,
            event_capacity: default_event_capacity(),
        }
    }
}

/// Exhibit block delimiters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolSettings {
    #[serde(default = "default_open_marker")]
    pub open_marker: String,
    #[serde(default = "default_close_marker")]
    pub close_marker: String,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            open_marker: default_open_marker(),
            close_marker: default_close_marker(),
        }
    }
}

/// Collaborator call timeouts; expiry is treated as a failed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_reply_ms")]
    pub reply_ms: u64,
    #[serde(default = "default_speech_ms")]
    pub speech_ms: u64,
    #[serde(default = "default_transcription_ms")]
    pub transcription_ms: u64,
}

impl TimeoutSettings {
    pub fn reply(&self) -> Duration {
        Duration::from_millis(self.reply_ms)
    }

    pub fn speech(&self) -> Duration {
        Duration::from_millis(self.speech_ms)
    }

    pub fn transcription(&self) -> Duration {
        Duration::from_millis(self.transcription_ms)
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            reply_ms: default_reply_ms(),
            speech_ms: default_speech_ms(),
            transcription_ms: default_transcription_ms(),
        }
    }
}

/// External service endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// Reply backend URL; when unset the console runs a scripted offline interview
    #[serde(default)]
    pub reply_url: Option<String>,
    #[serde(default = "default_speech_base_url")]
    pub speech_base_url: String,
    #[serde(default = "default_transcription_base_url")]
    pub transcription_base_url: String,
    /// Bearer key shared by all endpoints
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_speech_model")]
    pub speech_model: String,
    #[serde(default)]
    pub speech_format: AudioFormat,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            reply_url: None,
            speech_base_url: default_speech_base_url(),
            transcription_base_url: default_transcription_base_url(),
            api_key: None,
            speech_model: default_speech_model(),
            speech_format: AudioFormat::default(),
            transcription_model: default_transcription_model(),
        }
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_voice() -> String {
    constants::session::VOICE.to_string()
}

fn default_event_capacity() -> usize {
    constants::session::EVENT_CAPACITY
}

fn default_open_marker() -> String {
    constants::protocol::OPEN_MARKER.to_string()
}

fn default_close_marker() -> String {
    constants::protocol::CLOSE_MARKER.to_string()
}

fn default_reply_ms() -> u64 {
    constants::timeouts::REPLY_MS
}

fn default_speech_ms() -> u64 {
    constants::timeouts::SPEECH_MS
}

fn default_transcription_ms() -> u64 {
    constants::timeouts::TRANSCRIPTION_MS
}

fn default_speech_base_url() -> String {
    constants::endpoints::SPEECH_DEFAULT.to_string()
}

fn default_transcription_base_url() -> String {
    constants::endpoints::TRANSCRIPTION_DEFAULT.to_string()
}

fn default_speech_model() -> String {
    constants::endpoints::SPEECH_MODEL.to_string()
}

fn default_transcription_model() -> String {
    constants::endpoints::TRANSCRIPTION_MODEL.to_string()
}

fn default_log_level() -> String {
    constants::logging::LEVEL.to_string()
}

impl InterviewConfig {
    /// Load from an optional file plus process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(path, None)
    }

    /// Load with an explicit environment map instead of the process environment
    pub fn load_with_env(
        path: Option<&Path>,
        env: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        Self::build(path, Some(env))
    }

    fn build(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "Loading interview config file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(constants::env::PREFIX)
                .prefix_separator(constants::env::SEPARATOR)
                .separator(constants::env::SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let config: InterviewConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let protocol = &self.protocol;
        if protocol.open_marker.trim().is_empty() || protocol.close_marker.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "protocol markers must not be empty".to_string(),
            ));
        }
        if protocol.open_marker == protocol.close_marker {
            return Err(ConfigError::Invalid(format!(
                "open and close markers must differ (both are {:?})",
                protocol.open_marker
            )));
        }

        let timeouts = &self.timeouts;
        for (name, value) in [
            ("reply_ms", timeouts.reply_ms),
            ("speech_ms", timeouts.speech_ms),
            ("transcription_ms", timeouts.transcription_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!(
                    "timeouts.{} must be positive",
                    name
                )));
            }
        }

        if self.session.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "session.event_capacity must be positive".to_string(),
            ));
        }
        if self.session.voice.trim().is_empty() {
            return Err(ConfigError::Invalid("session.voice must not be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = InterviewConfig::load_with_env(None, HashMap::new()).unwrap();

        assert_eq!(config, InterviewConfig::default());
        assert!(config.session.speech_enabled);
        assert_eq!(config.protocol.open_marker, "<EXHIBIT>");
        assert_eq!(config.timeouts.reply(), Duration::from_secs(60));
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let file = write_config(
            ".toml",
            r#"
[session]
speech_enabled = false
voice = "nova"

[timeouts]
speech_ms = 5000

[endpoints]
reply_url = "http://localhost:8080/reply"
speech_format = "wav"
"#,
        );

        let config = InterviewConfig::load_with_env(Some(file.path()), HashMap::new()).unwrap();

        assert!(!config.session.speech_enabled);
        assert_eq!(config.session.voice, "nova");
        assert_eq!(config.timeouts.speech_ms, 5000);
        assert_eq!(config.timeouts.reply_ms, constants::timeouts::REPLY_MS);
        assert_eq!(config.endpoints.reply_url.as_deref(), Some("http://localhost:8080/reply"));
        assert_eq!(config.endpoints.speech_format, AudioFormat::Wav);
    }

    #[test]
    fn test_yaml_file_is_supported() {
        let file = write_config(
            ".yaml",
            "protocol:\n  open_marker: \"[[EXHIBIT]]\"\n  close_marker: \"[[/EXHIBIT]]\"\n",
        );

        let config = InterviewConfig::load_with_env(Some(file.path()), HashMap::new()).unwrap();
        assert_eq!(config.protocol.open_marker, "[[EXHIBIT]]");
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(".toml", "[session]\nspeech_enabled = true\n");
        let env = HashMap::from([
            ("INTERVIEW__SESSION__SPEECH_ENABLED".to_string(), "false".to_string()),
            ("INTERVIEW__TIMEOUTS__REPLY_MS".to_string(), "1500".to_string()),
        ]);

        let config = InterviewConfig::load_with_env(Some(file.path()), env).unwrap();

        assert!(!config.session.speech_enabled);
        assert_eq!(config.timeouts.reply_ms, 1500);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = InterviewConfig::load_with_env(
            Some(Path::new("/definitely/not/here.toml")),
            HashMap::new(),
        );
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_identical_markers_rejected() {
        let mut config = InterviewConfig::default();
        config.protocol.close_marker = config.protocol.open_marker.clone();

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let env = HashMap::from([(
            "INTERVIEW__TIMEOUTS__SPEECH_MS".to_string(),
            "0".to_string(),
        )]);

        let result = InterviewConfig::load_with_env(None, env);
        assert!(matches!(result, Err(ConfigError::Invalid(msg)) if msg.contains("speech_ms")));
    }
}
