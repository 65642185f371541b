use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chatter_messaging::replies::TimingPolicy;
use uuid::Uuid;

/// Runtime configuration for the chat engine.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the sled database.
    pub data_dir: PathBuf,
    /// Keep everything in memory; nothing survives the process.
    pub ephemeral: bool,
    pub timing: TimingPolicy,
    pub build_id: String,
}

fn env_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = env::var("CHATTER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/chatter"));
        let defaults = TimingPolicy::default();
        let timing = TimingPolicy {
            send_latency: env_millis("CHATTER_SEND_LATENCY_MS", defaults.send_latency),
            send_jitter: env_millis("CHATTER_SEND_JITTER_MS", defaults.send_jitter),
            typing_base: env_millis("CHATTER_TYPING_BASE_MS", defaults.typing_base),
            typing_per_word: env_millis("CHATTER_TYPING_PER_WORD_MS", defaults.typing_per_word),
            typing_max: env_millis("CHATTER_TYPING_MAX_MS", defaults.typing_max),
        };
        let build_id = env::var("CHATTER_BUILD_ID").unwrap_or_else(|_| Uuid::new_v4().to_string());
        Ok(Self {
            data_dir,
            ephemeral: env_flag("CHATTER_EPHEMERAL"),
            timing,
            build_id,
        })
    }

    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    pub fn with_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/chatter"),
            ephemeral: false,
            timing: TimingPolicy::default(),
            build_id: Uuid::new_v4().to_string(),
        }
    }
}
