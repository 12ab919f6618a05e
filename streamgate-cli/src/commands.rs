//! CLI command handling.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use streamgate_core::backend::FsBackend;
use streamgate_core::config::StreamgateConfig;
use streamgate_core::tracing_setup::{CliLogLevel, init_tracing};
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the files of a local media directory over /stream
    Serve {
        /// Address to bind the listening socket to
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,

        /// Listening port
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Directory of media files, served as container 1
        #[arg(long)]
        media_dir: PathBuf,

        /// Console log level
        #[arg(long, default_value = "info")]
        log_level: CliLogLevel,
    },
}

pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            bind,
            port,
            media_dir,
            log_level,
        } => {
            init_tracing(log_level.as_tracing_level(), None)
                .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

            let mut config = StreamgateConfig::from_env();
            config.server.bind_address = bind;
            config.server.port = port;

            let backend =
                FsBackend::scan_with_chunk_size(&media_dir, config.backend.chunk_size)
                    .await
                    .with_context(|| format!("failed to scan {}", media_dir.display()))?;

            for object in backend.objects() {
                info!(
                    object_id = object.object_id,
                    size = object.total_size,
                    mime = %object.mime_type,
                    "serving {}",
                    object.file_name
                );
            }

            streamgate_web::run_server(config, Arc::new(backend))
                .await
                .map_err(|e| anyhow::anyhow!("server failed: {e}"))?;
            Ok(())
        }
    }
}
