//! # docshare-client
//!
//! Client-facing surface of the docshare catalog: configuration, the
//! repositories screens call into, the home feed and the state that wires
//! them to the store and sync crates.

pub mod admin;
pub mod auth;
pub mod config;
pub mod home;
pub mod repository;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use admin::AdminRepository;
pub use auth::{Actor, ActorContext, StaticActor};
pub use config::ClientConfig;
pub use home::{home_feed, HomeSnapshot};
pub use repository::DocumentRepository;
pub use state::AppState;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("docshare_client=debug,docshare_sync=debug,docshare_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
