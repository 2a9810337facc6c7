//! Centralized constants for the interview engine
//!
//! Single source of truth for defaults used by the settings layer and by
//! crates that need a value before any configuration is loaded.

/// Reply protocol markers
pub mod protocol {
    /// Opens an exhibit block inside an interviewer reply
    pub const OPEN_MARKER: &str = "<EXHIBIT>";

    /// Closes an exhibit block
    pub const CLOSE_MARKER: &str = "</EXHIBIT>";
}

/// Timeouts (in milliseconds)
pub mod timeouts {
    /// Interviewer reply fetch
    pub const REPLY_MS: u64 = 60_000;

    /// Speech synthesis for one sentence
    pub const SPEECH_MS: u64 = 15_000;

    /// Transcription of one candidate recording
    pub const TRANSCRIPTION_MS: u64 = 10_000;
}

/// Service endpoints (defaults for OpenAI-compatible speech APIs)
pub mod endpoints {
    /// Speech synthesis base URL
    pub const SPEECH_DEFAULT: &str = "https://api.openai.com/v1";

    /// Transcription base URL
    pub const TRANSCRIPTION_DEFAULT: &str = "https://api.openai.com/v1";

    /// Speech model
    pub const SPEECH_MODEL: &str = "tts-1";

    /// Transcription model
    pub const TRANSCRIPTION_MODEL: &str = "whisper-1";
}

/// Session defaults
pub mod session {
    /// Voice identifier sent with every speech request
    pub const VOICE: &str = "alloy";

    /// Capacity of the per-session event broadcast channel
    pub const EVENT_CAPACITY: usize = 256;
}

/// Logging defaults
pub mod logging {
    /// Default `EnvFilter` directive
    pub const LEVEL: &str = "info";
}

/// Environment variable layering
pub mod env {
    /// Prefix for overrides, e.g. `INTERVIEW__SESSION__SPEECH_ENABLED=false`
    pub const PREFIX: &str = "INTERVIEW";

    /// Separator between prefix and nested keys
    pub const SEPARATOR: &str = "__";
}
