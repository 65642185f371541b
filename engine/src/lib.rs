pub mod config;
pub mod console;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;

pub use config::AppConfig;
pub use session::{ChatSession, SessionEvent, SessionView};
pub use state::AppState;
pub use store::ConversationStore;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
