//! End-to-end preparation run: read, plan, rewrite, write, stage.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::PrepareConfig;
use crate::embed::{EmbeddingPlan, EmbeddingPlanner, import_base};
use crate::platform::BuildTarget;
use crate::rewrite::{RewriteResult, Rewriter, rules};
use crate::shim::ShimOptions;
use crate::stage::{StageReport, stage_build_dir};

#[derive(Debug, Clone, Serialize)]
pub struct PrepareReport {
    pub target: BuildTarget,
    pub source: PathBuf,
    pub output: PathBuf,
    pub embedded: Vec<String>,
    pub missing: Vec<String>,
    pub rewrite: RewriteResult,
    pub sdk_output: Option<PathBuf>,
    pub sdk_rewrite: Option<RewriteResult>,
    pub staged: Option<StageReport>,
}

/// Shim header followed by the Embedding Code.
pub fn compose_prelude(shim: &ShimOptions, plan: &EmbeddingPlan) -> String {
    let mut out = String::from("\n");
    out.push_str(&shim.render());
    out.push_str(&plan.render());
    out
}

/// Rewrite the main entry point in memory.
pub fn prepare_source(source: &str, shim: &ShimOptions, plan: &EmbeddingPlan) -> RewriteResult {
    let prelude = compose_prelude(shim, plan);
    Rewriter::new(shim.target).rewrite(source, &prelude)
}

/// Rewrite an auxiliary ES module: shim header and self-location pass only.
pub fn prepare_sdk_source(source: &str, shim: &ShimOptions) -> RewriteResult {
    let mut prelude = String::from("// Windows executable compatibility wrapper\n");
    prelude.push_str(&shim.render());
    prelude.push('\n');
    Rewriter::with_rules(BuildTarget::Windows, rules::self_location_rules()).rewrite(source, &prelude)
}

pub fn prepare(config: &PrepareConfig) -> Result<PrepareReport> {
    config.validate()?;
    let shim = config.shim_options();

    let source = read_source(&config.source)?;
    info!(
        "preparing {} for {} embedding",
        config.source.display(),
        config.target.label()
    );

    // Staging runs first so the probe sees the files the packer will import.
    let staged = match config.stage_path() {
        Some(stage_dir) => Some(stage_build_dir(&config.resource_root, &stage_dir, &config.manifest)?),
        None => None,
    };

    let output = config.output_path();
    let embed_root = config.embed_root();
    let output_dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let plan = EmbeddingPlanner::for_root(&embed_root, config.target)
        .plan()
        .with_import_base(import_base(output_dir, &embed_root));
    for missing in &plan.missing {
        info!("resource {} not found; it will resolve from the filesystem at runtime", missing.key());
    }

    let rewrite = prepare_source(&source, &shim, &plan);
    write_output(&output, &rewrite.source)?;
    info!("wrote {}", output.display());

    let (sdk_output, sdk_rewrite) = match config.sdk_path() {
        Some(sdk_path) => {
            let sdk_source = read_source(&sdk_path)?;
            let rewritten = prepare_sdk_source(&sdk_source, &shim);
            let dest = sdk_destination(config, &sdk_path, &output);
            write_output(&dest, &rewritten.source)?;
            info!("wrote {}", dest.display());
            (Some(dest), Some(rewritten))
        }
        None => (None, None),
    };

    Ok(PrepareReport {
        target: config.target,
        source: config.source.clone(),
        embedded: plan.keys().into_iter().map(str::to_string).collect(),
        missing: plan.missing.iter().map(|d| d.key().to_string()).collect(),
        output,
        rewrite,
        sdk_output,
        sdk_rewrite,
        staged,
    })
}

/// Follow-up command for the external packer.
pub fn packer_command(target: BuildTarget, output: &Path) -> String {
    let entry = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| output.display().to_string());
    match target {
        BuildTarget::General => format!("bun build --compile --minify ./{} --outfile dist/claude-code", entry),
        BuildTarget::Windows => format!(
            "bun build --compile --minify --target=bun-windows-x64 ./{} --outfile ../claude-code-windows.exe",
            entry
        ),
    }
}

fn sdk_destination(config: &PrepareConfig, sdk_path: &Path, output: &Path) -> PathBuf {
    let file_name = sdk_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(crate::config::DEFAULT_SDK_MODULE));
    let dir = config
        .stage_path()
        .or_else(|| output.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let dest = dir.join(&file_name);
    if dest == sdk_path {
        dir.join(format!("prepared-{}", file_name.display()))
    } else {
        dest
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read source '{}'", path.display()))
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory for {}", path.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write output '{}'", path.display()))
}
