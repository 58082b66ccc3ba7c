//! `pipeline` - compile and inspect pipeline graph documents
//!
//! A document file is the JSON form of a `DocumentState`. Built-in node
//! kinds come from the `pipeline-nodes` crate.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use graph_compiler::{
    CompilerConfig, DocumentState, HttpSchemaLibrary, NodeCategory, PassOutcome, PipelineSession,
    SchemaLibrary, SchemaRegistry, StaticSchemaLibrary,
};

/// Errors surfaced by the command-line host
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid document {path:?}: {source}")]
    Document {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] graph_compiler::ConfigError),
    #[error(transparent)]
    Library(#[from] graph_compiler::LibraryError),
    #[error(transparent)]
    Compiler(#[from] graph_compiler::CompilerError),
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("No schema library given; pass --library or --library-url, or set library_url in the config")]
    NoLibrary,
}

/// Compiles node-graph data pipelines into Python source
#[derive(Parser, Debug)]
#[command(name = "pipeline", version, about, long_about = None)]
struct Cli {
    /// Directory holding the compiler configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the full source listing of a document
    Compile {
        document: PathBuf,
        /// Dataset root that `filepath` parameters resolve against
        #[arg(long)]
        root: Option<String>,
        /// Skip the `.head()` preview after structured calls
        #[arg(long)]
        no_preview: bool,
        /// Write the listing here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the readiness status of every node
    Status { document: PathBuf },
    /// Propagate column schemas through a document
    Propagate {
        document: PathBuf,
        /// JSON file with schemas and known columns
        #[arg(long, conflicts_with = "library_url")]
        library: Option<PathBuf>,
        /// Base URL of a schema library server
        #[arg(long)]
        library_url: Option<String>,
        /// Save the updated document here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List built-in algorithms, or show one schema
    Describe { algorithm: Option<String> },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(dir) => CompilerConfig::load(dir).await?,
        None => CompilerConfig::default(),
    };
    let registry = Arc::new(pipeline_nodes::builtin_registry());

    match cli.command {
        Command::Compile {
            document,
            root,
            no_preview,
            output,
        } => {
            if root.is_some() {
                config.root_dir = root;
            }
            if no_preview {
                config.emit_preview = false;
            }
            let session = open(&document, registry, config).await?;
            let code = session.generate_code().await;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &code)
                        .await
                        .map_err(|source| CliError::Write {
                            path: path.clone(),
                            source,
                        })?;
                    log::info!("Wrote {} byte(s) to {:?}", code.len(), path);
                }
                None => print!("{}", code),
            }
            Ok(())
        }
        Command::Status { document } => {
            let session = open(&document, registry, config).await?;
            let snapshot = session.snapshot().await;
            for (node_id, status) in session.statuses().await {
                let label = snapshot
                    .find_node(&node_id)
                    .map(|n| n.schema.label.as_str())
                    .unwrap_or_default();
                println!("{:<38} {:<18} {:?}", node_id, label, status);
            }
            Ok(())
        }
        Command::Propagate {
            document,
            library,
            library_url,
            output,
        } => {
            let library = schema_library(&config, library, library_url).await?;
            let session = open(&document, registry, config).await?;
            match session.propagator(library).trigger().await {
                PassOutcome::CycleDetected(cycle) => return Err(CliError::Compiler(cycle.into())),
                PassOutcome::Completed(report) => log::info!(
                    "Propagation updated {} node(s), {} error(s)",
                    report.updated.len(),
                    report.errors.len()
                ),
                other => log::info!("Propagation did not run: {:?}", other),
            }

            let snapshot = session.snapshot().await;
            for node in &snapshot.nodes {
                println!("{} ({})", node.id, node.schema.id);
                for (port, columns) in &node.metadata.output_columns {
                    let names: Vec<String> = columns
                        .iter()
                        .map(|c| format!("{}:{}", c.name, c.type_label))
                        .collect();
                    println!("  {} -> [{}]", port, names.join(", "));
                }
            }
            if let Some(path) = output {
                save(&path, &snapshot).await?;
            }
            Ok(())
        }
        Command::Describe { algorithm } => describe(&registry, algorithm.as_deref()),
    }
}

/// Read a document file and start a session on it
async fn open(
    path: &Path,
    registry: Arc<SchemaRegistry>,
    config: CompilerConfig,
) -> Result<PipelineSession, CliError> {
    let document = read_document(path).await?;
    log::debug!("Opened {:?} ({} node(s))", path, document.nodes.len());
    Ok(PipelineSession::new(document, registry, config)?)
}

async fn read_document(path: &Path) -> Result<DocumentState, CliError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| CliError::Document {
        path: path.to_path_buf(),
        source,
    })
}

async fn save(path: &Path, document: &DocumentState) -> Result<(), CliError> {
    let content = serde_json::to_string_pretty(document).map_err(|source| CliError::Document {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, content)
        .await
        .map_err(|source| CliError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    log::info!("Saved document to {:?}", path);
    Ok(())
}

async fn schema_library(
    config: &CompilerConfig,
    file: Option<PathBuf>,
    url: Option<String>,
) -> Result<Arc<dyn SchemaLibrary>, CliError> {
    if let Some(path) = file {
        return Ok(Arc::new(StaticSchemaLibrary::load(&path).await?));
    }
    match url.or_else(|| config.library_url.clone()) {
        Some(url) => Ok(Arc::new(HttpSchemaLibrary::new(url, config.request_timeout())?)),
        None => Err(CliError::NoLibrary),
    }
}

fn category_name(category: NodeCategory) -> &'static str {
    match category {
        NodeCategory::Source => "source",
        NodeCategory::Transform => "transform",
        NodeCategory::Sink => "sink",
        NodeCategory::Free => "free",
    }
}

fn describe(registry: &SchemaRegistry, algorithm: Option<&str>) -> Result<(), CliError> {
    let Some(algorithm) = algorithm else {
        for schema in registry.schemas() {
            println!(
                "{:<10} {:<16} {}",
                category_name(schema.category),
                schema.id,
                schema.label
            );
        }
        return Ok(());
    };

    let schema = registry
        .get_schema(algorithm)
        .ok_or_else(|| CliError::UnknownAlgorithm(algorithm.to_string()))?;
    let json = serde_json::to_string_pretty(schema).map_err(graph_compiler::CompilerError::from)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_compiler::NodeStatus;

    #[test]
    fn test_cli_parses_compile() {
        let cli = Cli::parse_from(["pipeline", "compile", "doc.json", "--root", "/srv", "-o", "out.py"]);
        match cli.command {
            Command::Compile { document, root, output, no_preview } => {
                assert_eq!(document, PathBuf::from("doc.json"));
                assert_eq!(root.as_deref(), Some("/srv"));
                assert_eq!(output, Some(PathBuf::from("out.py")));
                assert!(!no_preview);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_library_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "pipeline",
            "propagate",
            "doc.json",
            "--library",
            "lib.json",
            "--library-url",
            "http://localhost:8000",
        ]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_document_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let registry = Arc::new(pipeline_nodes::builtin_registry());

        let mut session = PipelineSession::new(
            DocumentState::new("Sales"),
            registry.clone(),
            CompilerConfig::default(),
        )
        .unwrap();
        let read = session.add_node("csv-input").await.unwrap();
        let write = session.add_node("csv-output").await.unwrap();
        session.connect(&read, "data", &write, "frame").await.unwrap();
        save(&path, &session.snapshot().await).await.unwrap();

        let reopened = open(&path, registry, CompilerConfig::default()).await.unwrap();
        assert_eq!(reopened.snapshot().await, session.snapshot().await);
        assert_eq!(reopened.status(&write).await, Some(NodeStatus::Configured));
        assert!(reopened
            .generate_code()
            .await
            .contains("n01_data.to_csv('dataset/output.csv', index=False)"));
    }

    #[tokio::test]
    async fn test_missing_document_is_read_error() {
        let registry = Arc::new(SchemaRegistry::new());
        let result = open(Path::new("/nonexistent/doc.json"), registry, CompilerConfig::default()).await;
        assert!(matches!(result, Err(CliError::Read { .. })));
    }

    #[tokio::test]
    async fn test_propagate_requires_library() {
        let result = schema_library(&CompilerConfig::default(), None, None).await;
        assert!(matches!(result, Err(CliError::NoLibrary)));
    }
}
