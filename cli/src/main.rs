use std::path::{Path, PathBuf};
use std::sync::Once;

static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "embedprep_core=info,embedprep=info";

use clap::{Parser, Subcommand};
use embedprep_core::{
    config::PrepareConfig,
    embed::{EmbeddingPlanner, ResolvedResource},
    platform::{
        BuildTarget, DEFAULT_ARCH, DEFAULT_OS, PlatformProbe, detect_platform, host_platform, is_windows_family,
        resource_keys_for,
    },
    prepare::{PrepareReport, packer_command, prepare},
    shell::{ShellResolution, ShellSearch},
    shim::{DEFAULT_PLACEHOLDER_NAME, ExecutableLocation, Invocation, LocationSource},
};

use anyhow::Context;

#[cfg(test)]
mod main_test;

#[derive(Debug, Parser)]
#[command(
    name = "embedprep",
    author,
    version,
    about = "Prepare a bundled JS CLI for single-executable packing",
    long_about = None
)]
struct CliArgs {
    /// TOML file with defaults for `prepare` (flags still win)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rewrite the bundled entry point and stage resources for the packer.
    Prepare(PrepareArgs),
    /// Print the Embedding Code that would be inserted for a resource root.
    Plan {
        #[arg(long, value_parser = parse_target)]
        target: Option<BuildTarget>,
        /// Resource root to probe
        #[arg(long = "resources", value_name = "DIR")]
        resource_root: Option<PathBuf>,
    },
    /// Show the resource keys one platform resolves to.
    Keys {
        /// Node-style OS name (`darwin`, `linux`, `win32`); defaults to the host
        #[arg(long)]
        os: Option<String>,
        /// Node-style architecture (`x64`, `arm64`); defaults to the host
        #[arg(long)]
        arch: Option<String>,
        #[arg(long)]
        json: bool,
        /// Also report whether each key would be served embedded or from disk
        #[arg(long = "resources", value_name = "DIR")]
        resource_root: Option<PathBuf>,
    },
    /// Run the interpreter search the rewritten program performs at startup.
    Shell {
        /// Node-style OS name picking the default interpreter; defaults to the host
        #[arg(long)]
        os: Option<String>,
        /// Candidate interpreter paths, in search order
        #[arg(value_name = "CANDIDATE")]
        candidates: Vec<String>,
    },
    /// Preview the executable location the injected header would compute.
    Locate {
        /// Working directory of the simulated process (defaults to the current one)
        #[arg(long)]
        cwd: Option<String>,
        /// Value of a pre-existing self-location variable
        #[arg(long = "self-location")]
        self_location: Option<String>,
        #[arg(long, default_value = DEFAULT_PLACEHOLDER_NAME)]
        placeholder: String,
        /// Simulated argument list, interpreter first
        #[arg(value_name = "ARGV", trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
}

#[derive(Debug, clap::Args)]
struct PrepareArgs {
    #[arg(long, value_parser = parse_target)]
    target: Option<BuildTarget>,
    /// Bundled entry point to rewrite
    #[arg(long, value_name = "FILE")]
    source: Option<PathBuf>,
    /// Directory holding yoga.wasm, vendor/ and the manifest files
    #[arg(long = "resources", value_name = "DIR")]
    resource_root: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
    #[arg(long = "stage-dir", value_name = "DIR")]
    stage_dir: Option<PathBuf>,
    /// Auxiliary ES module to give the self-location pass
    #[arg(long, value_name = "FILE")]
    sdk: Option<PathBuf>,
    #[arg(long = "env-prefix")]
    env_prefix: Option<String>,
    #[arg(long)]
    placeholder: Option<String>,
    /// Write a JSON report of the run
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn parse_target(raw: &str) -> Result<BuildTarget, String> {
    raw.parse::<BuildTarget>().map_err(|e| e.to_string())
}

fn env_toggle_enabled(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.eq_ignore_ascii_case("0") || trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("off"))
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Logs go to stderr so `plan`/`keys` output stays pipeable.
/// `EMBEDPREP_LOG=0` silences everything; any other non-toggle value is a filter.
fn init_tracing() {
    let raw = std::env::var("EMBEDPREP_LOG").ok();
    if raw.as_deref().is_some_and(|value| !env_toggle_enabled(value)) {
        return;
    }

    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = raw
            .as_deref()
            .and_then(filter_expr_from)
            .or_else(|| std::env::var("RUST_LOG").ok());

        let builder = fmt().with_writer(std::io::stderr).with_target(false);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_TRACE_FILTER),
        };

        let _ = builder.try_init();
    });
}

fn base_config(path: Option<&Path>, target: Option<BuildTarget>) -> anyhow::Result<PrepareConfig> {
    match (path, target) {
        (Some(path), target) => {
            let mut config = PrepareConfig::load(path)?;
            if let Some(target) = target {
                config.target = target;
            }
            Ok(config)
        }
        (None, target) => Ok(PrepareConfig::for_target(target.unwrap_or_default())),
    }
}

pub(crate) fn resolve_prepare_config(config_path: Option<&Path>, args: PrepareArgs) -> anyhow::Result<PrepareConfig> {
    let mut config = base_config(config_path, args.target)?;
    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(root) = args.resource_root {
        config.resource_root = root;
    }
    if args.output.is_some() {
        config.output = args.output;
    }
    if args.stage_dir.is_some() {
        config.stage_dir = args.stage_dir;
    }
    if args.sdk.is_some() {
        config.sdk = args.sdk;
    }
    if let Some(prefix) = args.env_prefix {
        config.env_prefix = prefix;
    }
    if let Some(placeholder) = args.placeholder {
        config.placeholder_name = placeholder;
    }
    config.validate()?;
    Ok(config)
}

fn print_summary(report: &PrepareReport) {
    eprintln!(
        "Prepared {} ({} build) -> {}",
        report.source.display(),
        report.target.label(),
        report.output.display()
    );
    if report.embedded.is_empty() {
        eprintln!("  embedded: none");
    } else {
        eprintln!("  embedded: {}", report.embedded.join(", "));
    }
    if !report.missing.is_empty() {
        eprintln!("  not embedded ({}): resolved from disk at runtime", report.missing.len());
    }
    let rewritten: Vec<String> = report
        .rewrite
        .hits
        .iter()
        .map(|hit| format!("{} x{}", hit.rule, hit.count))
        .collect();
    eprintln!("  rules applied: {}", if rewritten.is_empty() { "none".to_string() } else { rewritten.join(", ") });
    if let Some(sdk) = &report.sdk_output {
        eprintln!("  sdk module: {}", sdk.display());
    }
    if let Some(staged) = &report.staged {
        eprintln!(
            "  staged {} file(s) and {} vendor file(s) in {}",
            staged.copied.len(),
            staged.vendor_files,
            staged.stage_dir.display()
        );
    }
}

fn write_report(path: &Path, report: &PrepareReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report '{}'", path.display()))
}

fn run_keys(os: Option<String>, arch: Option<String>, json: bool, resource_root: Option<PathBuf>) -> anyhow::Result<()> {
    let (host_os, host_arch) = host_platform();
    let os = os.unwrap_or(host_os);
    let arch = arch.unwrap_or(host_arch);
    let (os, keys) = match detect_platform(Some(os.as_str()), Some(arch.as_str())) {
        PlatformProbe::Detected(_) => (os.trim().to_string(), resource_keys_for(os.trim(), arch.trim())),
        PlatformProbe::Defaulted(key) => {
            eprintln!("platform unknown; using {}", key);
            (DEFAULT_OS.to_string(), resource_keys_for(DEFAULT_OS, DEFAULT_ARCH))
        }
    };

    let mut sources = Vec::new();
    if let Some(root) = resource_root {
        let target = if is_windows_family(&os) { BuildTarget::Windows } else { BuildTarget::General };
        let plan = EmbeddingPlanner::for_root(&root, target).plan();
        for key in [&keys.executable, &keys.bridge_library, &keys.layout_engine] {
            let on_disk = root.join(key).display().to_string();
            let source = match plan.resolve(key, &on_disk) {
                ResolvedResource::Embedded(binding) => format!("embedded as {}", binding),
                ResolvedResource::Filesystem(path) => format!("filesystem {}", path),
            };
            sources.push((key.clone(), source));
        }
    }

    if json {
        let mut value = serde_json::to_value(&keys)?;
        if !sources.is_empty() {
            let by_key = sources
                .iter()
                .map(|(key, source)| (key.clone(), serde_json::Value::from(source.as_str())))
                .collect();
            value["sources"] = serde_json::Value::Object(by_key);
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("platform: {}", keys.platform);
        println!("executable: {}", keys.executable);
        println!("bridge library: {}", keys.bridge_library);
        println!("layout engine: {}", keys.layout_engine);
        for (key, source) in &sources {
            println!("{}: {}", key, source);
        }
    }
    Ok(())
}

fn run_shell(os: Option<String>, candidates: Vec<String>) {
    let os = os.unwrap_or_else(|| host_platform().0);
    let resolution = ShellSearch::new(candidates).resolve(&os, |candidate| Path::new(candidate).is_file());
    let source = match &resolution {
        ShellResolution::Found(_) => "found",
        ShellResolution::Defaulted(_) => "default",
    };
    println!("shell: {}", resolution.path());
    println!("source: {}", source);
}

fn run_locate(
    cwd: Option<String>,
    self_location: Option<String>,
    placeholder: &str,
    argv: Vec<String>,
) -> anyhow::Result<()> {
    let cwd = match cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir()
            .context("Failed to read the current working directory")?
            .to_string_lossy()
            .into_owned(),
    };
    let mut invocation = Invocation::new(argv, cwd);
    if let Some(location) = self_location {
        invocation = invocation.with_self_location(location);
    }

    let location = ExecutableLocation::resolve(&invocation, placeholder);
    let source = match location.source {
        LocationSource::Argument => "argument",
        LocationSource::SelfLocation => "self-location",
        LocationSource::Placeholder => "placeholder",
    };
    println!("path: {}", location.path);
    println!("dir: {}", location.dir);
    println!("url: {}", location.file_url()?);
    println!("source: {}", source);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let CliArgs { config, command } = CliArgs::parse();

    match command {
        Commands::Prepare(args) => {
            let report_path = args.report.clone();
            let config = resolve_prepare_config(config.as_deref(), args)?;
            let report = prepare(&config)?;
            print_summary(&report);
            if let Some(path) = report_path {
                write_report(&path, &report)?;
                eprintln!("Emitted {}", path.display());
            }
            eprintln!("Next: {}", packer_command(report.target, &report.output));
        }
        Commands::Plan { target, resource_root } => {
            let mut base = base_config(config.as_deref(), target)?;
            if let Some(root) = resource_root {
                base.resource_root = root;
            }
            let plan = EmbeddingPlanner::for_root(&base.resource_root, base.target).plan();
            print!("{}", plan.render());
            for missing in &plan.missing {
                eprintln!("not embedded: {}", missing.key());
            }
        }
        Commands::Keys {
            os,
            arch,
            json,
            resource_root,
        } => run_keys(os, arch, json, resource_root)?,
        Commands::Shell { os, candidates } => run_shell(os, candidates),
        Commands::Locate {
            cwd,
            self_location,
            placeholder,
            argv,
        } => run_locate(cwd, self_location, &placeholder, argv)?,
    }

    Ok(())
}
