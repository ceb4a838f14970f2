//! Resource embedding planner.
//!
//! Probes the resource root for every descriptor the build target may embed
//! and renders the Embedding Code fragment: `with { type: "file" }` imports the
//! packer resolves at compile time, the `__embeddedFiles` map and the
//! platform key helper. Importing a file that does not exist is fatal for the
//! packer, so only files seen by the probe are ever referenced.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::platform::{
    BRIDGE_LIBRARY_NAME, BuildTarget, DEFAULT_ARCH, DEFAULT_OS, EXECUTABLE_NAME, LAYOUT_ENGINE_KEY,
    RESOURCE_FAMILY, ResourceDescriptor, VENDOR_DIR, WINDOWS_SEGMENT, descriptors_for,
};

pub const EMBEDDED_FILES_VAR: &str = "__embeddedFiles";
pub const KEY_HELPER_FN: &str = "__embeddedResourceKeys";
const CURRENT_DIR: &str = ".";

/// Existence check for a path relative to the resource root.
pub trait ResourceProbe {
    fn exists(&self, relative_path: &str) -> bool;
}

impl<F> ResourceProbe for F
where
    F: Fn(&str) -> bool,
{
    fn exists(&self, relative_path: &str) -> bool {
        self(relative_path)
    }
}

/// Read-only filesystem probe.
#[derive(Debug, Clone)]
pub struct FsProbe {
    root: PathBuf,
}

impl FsProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceProbe for FsProbe {
    fn exists(&self, relative_path: &str) -> bool {
        let path = self.root.join(relative_path);
        let found = path.is_file();
        debug!("probe {} -> {}", path.display(), if found { "found" } else { "absent" });
        found
    }
}

pub struct EmbeddingPlanner<P> {
    probe: P,
    target: BuildTarget,
}

impl EmbeddingPlanner<FsProbe> {
    pub fn for_root(root: impl Into<PathBuf>, target: BuildTarget) -> Self {
        Self::new(FsProbe::new(root), target)
    }
}

impl<P: ResourceProbe> EmbeddingPlanner<P> {
    pub fn new(probe: P, target: BuildTarget) -> Self {
        Self { probe, target }
    }

    pub fn plan(&self) -> EmbeddingPlan {
        self.plan_descriptors(&descriptors_for(self.target))
    }

    pub fn plan_descriptors(&self, descriptors: &[ResourceDescriptor]) -> EmbeddingPlan {
        let (embedded, missing): (Vec<_>, Vec<_>) = descriptors
            .iter()
            .cloned()
            .partition(|descriptor| self.probe.exists(&descriptor.relative_path));
        EmbeddingPlan {
            target: self.target,
            embedded,
            missing,
            import_base: CURRENT_DIR.to_string(),
        }
    }
}

/// How a resource key resolves inside the rewritten program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedResource<'a> {
    /// Served from the embedded buffer bound to this identifier.
    Embedded(&'a str),
    /// Not embedded; the original filesystem path is used unchanged.
    Filesystem(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddingPlan {
    pub target: BuildTarget,
    pub embedded: Vec<ResourceDescriptor>,
    pub missing: Vec<ResourceDescriptor>,
    /// Directory prefix of every import specifier, relative to the file the
    /// Embedding Code is written into.
    pub import_base: String,
}

impl EmbeddingPlan {
    /// Point the imports at the probed root from a file living elsewhere.
    pub fn with_import_base(mut self, base: impl Into<String>) -> Self {
        self.import_base = base.into();
        self
    }

    pub fn keys(&self) -> Vec<&str> {
        self.embedded.iter().map(ResourceDescriptor::key).collect()
    }

    pub fn len(&self) -> usize {
        self.embedded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embedded.is_empty()
    }

    pub fn lookup(&self, key: &str) -> Option<&ResourceDescriptor> {
        self.embedded.iter().find(|descriptor| descriptor.key() == key)
    }

    /// Runtime lookup semantics of the emitted map: absent keys fall back.
    pub fn resolve<'a>(&'a self, key: &str, fallback: &'a str) -> ResolvedResource<'a> {
        match self.lookup(key) {
            Some(descriptor) => ResolvedResource::Embedded(&descriptor.binding_name),
            None => ResolvedResource::Filesystem(fallback),
        }
    }

    pub fn import_lines(&self) -> Vec<String> {
        self.embedded
            .iter()
            .map(|d| {
                format!(
                    "import {} from \"{}\" with {{ type: \"file\" }};",
                    d.binding_name,
                    d.specifier(&self.import_base)
                )
            })
            .collect()
    }

    pub fn mapping_literal(&self) -> String {
        let mut out = format!("const {} = {{\n", EMBEDDED_FILES_VAR);
        for d in &self.embedded {
            out.push_str(&format!("  '{}': {},\n", d.key(), d.binding_name));
        }
        out.push_str("};\n");
        out
    }

    /// The Embedding Code fragment inserted after the shebang.
    pub fn render(&self) -> String {
        let mut out = String::from("\n// Embedded files using Bun's native embedding\n");
        for line in self.import_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.mapping_literal());
        out.push('\n');
        out.push_str(&key_helper());
        out.push('\n');
        out
    }
}

/// Import prefix leading from `output_dir` to `root`, with forward slashes.
///
/// The packer resolves specifiers relative to the importing file, so files
/// probed under `root` must be addressed from wherever the output lands.
pub fn import_base(output_dir: &Path, root: &Path) -> String {
    let absolute = |path: &Path| std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let (from, to) = (absolute(output_dir), absolute(root));
    match pathdiff::diff_paths(&to, &from) {
        Some(relative) if relative.as_os_str().is_empty() => CURRENT_DIR.to_string(),
        Some(relative) => {
            let relative = relative.to_string_lossy().replace('\\', "/");
            if relative == ".." || relative.starts_with("../") {
                relative
            } else {
                format!("./{}", relative)
            }
        }
        None => to.to_string_lossy().replace('\\', "/"),
    }
}

/// JS twin of [`crate::platform::resource_keys_for`], defaulting to
/// `x64`/`win32` when process information is unavailable.
pub fn key_helper() -> String {
    format!(
        r#"function {helper}() {{
  let os = "{default_os}";
  let arch = "{default_arch}";
  try {{
    if (process.platform && process.arch) {{
      os = process.platform;
      arch = process.arch;
    }}
  }} catch (e) {{}}
  const platform = os === "win32" ? "{windows}" : `${{arch}}-${{os}}`;
  const suffix = os === "win32" ? ".exe" : "";
  const base = `{vendor}/{family}/${{platform}}`;
  return {{
    platform,
    executable: `${{base}}/{exe}${{suffix}}`,
    bridge: `${{base}}/{bridge}`,
    layoutEngine: "{layout}",
  }};
}}
"#,
        helper = KEY_HELPER_FN,
        default_os = DEFAULT_OS,
        default_arch = DEFAULT_ARCH,
        windows = WINDOWS_SEGMENT,
        vendor = VENDOR_DIR,
        family = RESOURCE_FAMILY,
        exe = EXECUTABLE_NAME,
        bridge = BRIDGE_LIBRARY_NAME,
        layout = LAYOUT_ENGINE_KEY,
    )
}
