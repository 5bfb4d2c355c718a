use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use stagever::config::{Settings, log_path};
use stagever::logging;
use stagever::output::deliver;
use stagever::resolve::{ResolveRequest, Resolver};
use stagever::stage::SelectionRequest;
use stagever::version::{SourceOptions, VersionRequest, VersioningMode};

#[derive(Parser)]
#[command(name = "stagever")]
#[command(version, about = "Stage selection and version computation for package publishing")]
struct Cli {
    /// Settings file (defaults to settings.json in the data directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write JSON logs to the data directory
    #[arg(long, global = true, conflicts_with = "log_file")]
    log_to_data_dir: bool,

    /// Log debug output unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Select the stage for a trigger and compute the package version
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct ResolveArgs {
    /// Package id to version
    #[arg(long)]
    package_id: String,

    /// Base version, e.g. 1.2.0
    #[arg(long)]
    base_version: String,

    /// Trigger matched against stage patterns, e.g. a branch ref
    #[arg(long)]
    trigger: String,

    /// Production stage spec
    #[arg(long)]
    production: Option<String>,

    /// Integration stage spec
    #[arg(long)]
    integration: Option<String>,

    /// Development stage spec
    #[arg(long)]
    development: Option<String>,

    /// Fallback spec: [#name|]key=value|...
    #[arg(long)]
    fallback: Option<String>,

    /// Input matched against the promotion pattern
    #[arg(long)]
    promotion_input: Option<String>,

    /// Pattern that promotes a build to production
    #[arg(long)]
    promotion_pattern: Option<String>,

    /// Location local and fallback stages publish to
    #[arg(long, default_value = ".")]
    local_source: String,

    /// Enable publishing for the local fallback stage
    #[arg(long)]
    allow_local_publish: bool,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    postfix: Option<String>,

    /// API key used when a stage spec has none
    #[arg(long, env = "STAGEVER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Symbols API key used when a stage spec has none
    #[arg(long, env = "STAGEVER_SYMBOLS_API_KEY", hide_env_values = true)]
    symbols_api_key: Option<String>,

    /// Prerelease format used when a stage spec has none
    #[arg(long)]
    prerelease_format: Option<String>,

    /// Version template returned as-is when it renders a valid version
    #[arg(long)]
    force_version: Option<String>,

    /// Version template replacing the base version
    #[arg(long)]
    version_format: Option<String>,

    #[arg(long, default_value_t = VersioningMode::default())]
    mode: VersioningMode,

    #[arg(long)]
    metadata: Option<String>,

    #[arg(long)]
    metadata_format: Option<String>,

    /// Free-form value available as {Parameter}
    #[arg(long)]
    parameter: Option<String>,

    /// Build time (RFC 3339), defaults to now
    #[arg(long)]
    timestamp: Option<DateTime<Utc>>,

    /// Also query the public registry
    #[arg(long)]
    include_public: bool,

    /// Also query every configured registry
    #[arg(long)]
    include_all: bool,

    /// Extra registries to query, names or URIs separated by '|'
    #[arg(long)]
    sources: Option<String>,

    /// Output templates; may be repeated
    #[arg(short, long = "output")]
    outputs: Vec<String>,

    /// Print the publish info as JSON instead of output lines
    #[arg(long)]
    json: bool,
}

impl ResolveArgs {
    fn into_request(self) -> ResolveRequest {
        let timestamp = self.timestamp.unwrap_or_else(Utc::now);
        ResolveRequest {
            selection: SelectionRequest {
                trigger: self.trigger,
                production: self.production,
                integration: self.integration,
                development: self.development,
                fallback: self.fallback,
                promotion_input: self.promotion_input,
                promotion_pattern: self.promotion_pattern,
                local_source: self.local_source,
                allow_local_publish: self.allow_local_publish,
                prefix: self.prefix,
                postfix: self.postfix,
                api_key: self.api_key,
                symbols_api_key: self.symbols_api_key,
                prerelease_format: self.prerelease_format,
            },
            version: VersionRequest {
                force_version: self.force_version,
                version_format: self.version_format,
                mode: self.mode,
                metadata: self.metadata,
                metadata_format: self.metadata_format,
                parameter: self.parameter,
                ..VersionRequest::new(&self.package_id, &self.base_version, timestamp)
            },
            sources: SourceOptions {
                include_public_registry: self.include_public,
                include_all_registries: self.include_all,
                overrides: self.sources,
            },
            outputs: self.outputs,
        }
    }
}

async fn resolve(settings: Settings, args: ResolveArgs) -> anyhow::Result<()> {
    let json = args.json;
    let request = args.into_request();
    let resolver = Resolver::with_default_registry(settings)?;

    let resolution = resolver
        .resolve(&request)
        .await
        .with_context(|| format!("Failed to resolve {}", request.version.package_id))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &resolution.info)?;
        writeln!(out)?;
    } else if resolution.outputs.is_empty() {
        writeln!(out, "{}", resolution.info.full_version)?;
    } else {
        deliver(&resolution.outputs, &mut out)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = match (cli.log_file, cli.log_to_data_dir) {
        (Some(path), _) => Some(path),
        (None, true) => Some(log_path()),
        (None, false) => None,
    };
    let _guard = logging::init(cli.verbose, log_file.as_deref())?;

    let settings = Settings::load(cli.settings.as_deref())?;
    debug!("Settings: {:?}", settings);

    match cli.command {
        Command::Resolve(args) => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(resolve(settings, args)),
    }
}
