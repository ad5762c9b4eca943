//! kodegen_semantic_release - automated version management and release publishing.
//!
//! This binary decides the next version from the commit history, tags it, and
//! runs the configured release plugins.

use kodegen_semantic_release::cli;
use kodegen_semantic_release::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if std::env::args().any(|arg| arg == "--debug") {
        logger.filter_module("kodegen_semantic_release", log::LevelFilter::Debug);
    }
    logger.init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Never quiet for fatal errors
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\nRecovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
