//! Voter identity heuristics: a per-session random identifier and a device
//! signature built from environment attributes. Neither is a security
//! boundary; both are trivially reset or spoofed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// The environment attributes folded into a device signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentProfile {
    pub user_agent: String,
    pub language: String,
    pub color_depth: u32,
    pub screen_width: u32,
    pub screen_height: u32,
    /// Minutes to add to local time to get UTC
    pub timezone_offset_minutes: i32,
    pub hardware_concurrency: Option<u32>,
    pub device_memory_gb: Option<u32>,
}

impl EnvironmentProfile {
    /// Best-effort profile of the current process' host.
    pub fn detect() -> Self {
        let language = std::env::var("LANG")
            .ok()
            .and_then(|lang| lang.split('.').next().map(|l| l.replace('_', "-")))
            .filter(|lang| !lang.is_empty() && lang != "C" && lang != "POSIX")
            .unwrap_or_else(|| "en-US".to_string());

        let utc_offset_secs = chrono::Local::now().offset().local_minus_utc();

        Self {
            user_agent: format!(
                "PollStream/{} ({}; {})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            language,
            color_depth: 24,
            screen_width: 0,
            screen_height: 0,
            timezone_offset_minutes: -(utc_offset_secs / 60),
            hardware_concurrency: std::thread::available_parallelism()
                .ok()
                .map(|n| n.get() as u32),
            device_memory_gb: None,
        }
    }

    /// Base64 of the `::`-joined attributes. Unknown hints encode as `0`.
    pub fn device_signature(&self) -> String {
        let features = [
            self.user_agent.clone(),
            self.language.clone(),
            self.color_depth.to_string(),
            format!("{}x{}", self.screen_width, self.screen_height),
            self.timezone_offset_minutes.to_string(),
            self.hardware_concurrency.unwrap_or(0).to_string(),
            self.device_memory_gb.unwrap_or(0).to_string(),
        ];
        STANDARD.encode(features.join("::"))
    }
}
