use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use lingo_config::{load_config, PartialFailureSetting, ServerConfig};
use lingo_core::convention::IndexConvention;
use lingo_protocol::request::{RequestPacket, ResponsePacket};
use lingo_server::{
    register_host_handlers, EndpointDispatcher, HandlerRegistry, LanguageSelector,
    PartialFailurePolicy,
};
use lingo_workspace::buffer::BufferManager;
use lingo_workspace::events::{EventEmitter, ServerEvent, TracingEmitter};
use lingo_workspace::process::CommandRunner;
use lingo_workspace::project_system::{DirectoryProjectSystem, ProjectSystemHost};
use lingo_workspace::restore::{default_concurrency, RestoreService};
use lingo_workspace::workspace::Workspace;

/// Languages served out of the box: one directory-scanning project
/// system per entry. Backends with real compilers replace these at
/// composition time.
const BUILTIN_SYSTEMS: &[(&str, &str, &[&str])] = &[
    ("csharp-directory", "csharp", &[".cs", ".csx"]),
    ("fsharp-directory", "fsharp", &[".fs", ".fsx"]),
];

async fn run_server(workspace_root: PathBuf) -> Result<()> {
    let config_dir = env::var_os("LINGO_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| workspace_root.join(".lingo"));
    let config = load_config(&config_dir, Some(&workspace_root)).unwrap_or_else(|e| {
        eprintln!("lingo: config load failed, using defaults: {e}");
        ServerConfig::default()
    });

    // Honor RUST_LOG when set; the config level is the fallback.
    let writer = log_writer(config.log.file.as_deref())
        .context("failed to open the configured log file")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log.level.as_filter())),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let convention = if config.one_based_indices {
        IndexConvention::OneBased
    } else {
        IndexConvention::ZeroBased
    };

    let workspace = Arc::new(Workspace::new());
    let buffers = {
        let manager = BufferManager::new(workspace.clone());
        Arc::new(if config.enable_misc_files {
            manager
        } else {
            manager.without_misc_fallback()
        })
    };
    let emitter: Arc<dyn EventEmitter> = Arc::new(TracingEmitter);

    let mut systems = ProjectSystemHost::new(emitter.clone());
    for (key, language, extensions) in BUILTIN_SYSTEMS {
        systems.register(Arc::new(DirectoryProjectSystem::new(
            *key,
            *language,
            extensions.iter().map(|e| e.to_string()).collect(),
            workspace_root.clone(),
            workspace.clone(),
        )));
    }
    systems.initialize_all().await;
    let systems = Arc::new(systems);

    let concurrency = if config.restore.concurrency == 0 {
        default_concurrency()
    } else {
        config.restore.concurrency
    };
    let restore = Arc::new(RestoreService::new(
        Arc::new(CommandRunner),
        emitter.clone(),
        config.restore.program.clone(),
        config.restore.args.clone(),
        concurrency,
    ));
    if systems.systems().iter().any(|s| s.initialized()) {
        let root = workspace_root.clone();
        let failure_emitter = emitter.clone();
        let failure_root = workspace_root.clone();
        tokio::spawn(async move {
            restore
                .restore(
                    &root,
                    Some(Box::new(move || {
                        failure_emitter.emit(ServerEvent::UnresolvedDependencies {
                            file_name: failure_root,
                            packages: Vec::new(),
                        });
                    })),
                )
                .await;
        });
    }

    let mut registry = HandlerRegistry::with_default_endpoints();
    register_host_handlers(&mut registry, buffers.clone(), systems.clone())
        .context("failed to register host handlers")?;

    let selector = LanguageSelector::new(workspace.clone(), systems.clone());
    let dispatcher = EndpointDispatcher::new(registry, buffers, selector)
        .with_convention(convention)
        .with_partial_failure(match config.partial_failure {
            PartialFailureSetting::FailFast => PartialFailurePolicy::FailFast,
            PartialFailureSetting::ReturnPartial => PartialFailurePolicy::ReturnPartial,
        })
        .with_timeout(Duration::from_secs(config.timeout_secs));

    info!(
        root = %workspace_root.display(),
        "lingo server ready, reading requests from stdin"
    );
    serve_stdio(&dispatcher).await
}

/// Where log lines go: the configured log file when set, appended to
/// across restarts, otherwise stderr. Stdout stays reserved for
/// response packets either way.
fn log_writer(file: Option<&Path>) -> std::io::Result<BoxMakeWriter> {
    match file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Ok(BoxMakeWriter::new(Arc::new(file)))
        }
        None => Ok(BoxMakeWriter::new(std::io::stderr)),
    }
}

/// Line-delimited JSON over stdio: one request packet per line in,
/// one response packet per line out.
async fn serve_stdio(dispatcher: &EndpointDispatcher) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let packet: RequestPacket = match serde_json::from_str(&line) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("discarding malformed request line: {}", e);
                continue;
            }
        };

        let response = match dispatcher.dispatch(&packet).await {
            Ok(body) => ResponsePacket::success(&packet, body),
            Err(e) => {
                warn!(command = %packet.command, "request failed: {}", e);
                ResponsePacket::failure(&packet, e.to_string())
            }
        };

        let mut encoded =
            serde_json::to_vec(&response).context("failed to serialize response packet")?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}

#[tokio::main]
async fn main() {
    let root = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    if let Err(e) = run_server(root).await {
        eprintln!("lingo: {:#}", e);
        std::process::exit(1);
    }
}
