pub mod agent_engine;
pub mod config;
pub mod device;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod locator;
pub mod perception;
pub mod script;
pub mod timing;

#[cfg(test)]
mod test_support;

pub use agent_engine::{Action, ExecutionReport, InstructionExecutor};
pub use config::{AppConfig, Strategy};
pub use errors::{SeeDroidError, SeeDroidResult};
pub use locator::{ElementResolver, ScreenInspector};
pub use script::ScriptCompiler;

/// Install the global `tracing` subscriber. `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
