//! Platform resource registry.
//!
//! Maps `(os, arch)` pairs (Node naming: `darwin`, `linux`, `win32`; `x64`,
//! `arm64`) to the embedded resource keys the rewritten program looks up at
//! runtime. Key derivation here and in the emitted JS helper share the same
//! constants so both sides always agree.

use serde::{Deserialize, Serialize};

/// Directory under the resource root holding per-platform helper binaries.
pub const VENDOR_DIR: &str = "vendor";
/// Resource family for the search helper.
pub const RESOURCE_FAMILY: &str = "ripgrep";
/// Executable name (without the Windows suffix).
pub const EXECUTABLE_NAME: &str = "rg";
/// Native bridging library name.
pub const BRIDGE_LIBRARY_NAME: &str = "ripgrep.node";
/// OS-independent UI-layout engine resource.
pub const LAYOUT_ENGINE_KEY: &str = "yoga.wasm";
/// Binding identifier for the layout engine import.
pub const LAYOUT_ENGINE_BINDING: &str = "__embeddedYogaWasm";

/// Windows collapses every architecture onto this segment.
pub const WINDOWS_SEGMENT: &str = "x64-win32";
pub const DEFAULT_OS: &str = "win32";
pub const DEFAULT_ARCH: &str = "x64";

/// Every platform segment shipped in the vendor tree, in emission order.
pub const SUPPORTED_SEGMENTS: &[PlatformSegment] = &[
    PlatformSegment::new("arm64", "darwin"),
    PlatformSegment::new("arm64", "linux"),
    PlatformSegment::new("x64", "darwin"),
    PlatformSegment::new("x64", "linux"),
    PlatformSegment::new("x64", "win32"),
];

/// Which executable flavour the rewritten source is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    /// Cross-platform bundle embedding every supported segment.
    #[default]
    General,
    /// Windows-only executable; embeds `x64-win32` and rewrites self-location.
    Windows,
}

impl BuildTarget {
    pub fn is_windows(self) -> bool {
        matches!(self, BuildTarget::Windows)
    }

    pub fn label(self) -> &'static str {
        match self {
            BuildTarget::General => "general",
            BuildTarget::Windows => "windows",
        }
    }

    /// Segments whose resources are candidates for embedding on this target.
    pub fn segments(self) -> impl Iterator<Item = &'static PlatformSegment> {
        SUPPORTED_SEGMENTS
            .iter()
            .filter(move |segment| self == BuildTarget::General || segment.is_windows())
    }
}

impl std::str::FromStr for BuildTarget {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "general" | "native" | "all" => Ok(BuildTarget::General),
            "windows" | "win32" | "win" => Ok(BuildTarget::Windows),
            other => anyhow::bail!("Unknown build target '{}' (expected 'general' or 'windows')", other),
        }
    }
}

/// An architecture/OS pair as it appears in the vendor directory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformSegment {
    pub arch: &'static str,
    pub os: &'static str,
}

impl PlatformSegment {
    pub const fn new(arch: &'static str, os: &'static str) -> Self {
        Self { arch, os }
    }

    pub fn is_windows(&self) -> bool {
        is_windows_family(self.os)
    }

    pub fn key(&self) -> String {
        platform_key(self.os, self.arch)
    }

    /// `Darwin` / `Linux` / `Win32` style suffix used in binding identifiers.
    fn binding_suffix(&self) -> String {
        if self.is_windows() {
            return "Win32".to_string();
        }
        format!("{}{}", capitalize(self.os), capitalize(self.arch))
    }

    /// Descriptors for the executable and the bridge library of this segment.
    pub fn descriptors(&self) -> [ResourceDescriptor; 2] {
        let keys = resource_keys_for(self.os, self.arch);
        let suffix = self.binding_suffix();
        [
            ResourceDescriptor::new(keys.executable, format!("__embeddedRg{}", suffix)),
            ResourceDescriptor::new(keys.bridge_library, format!("__embeddedRgNode{}", suffix)),
        ]
    }
}

/// One candidate embeddable file and the identifier its embedded reference is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceDescriptor {
    /// Path relative to the resource root, without a leading `./`.
    pub relative_path: String,
    pub binding_name: String,
}

impl ResourceDescriptor {
    pub fn new(relative_path: impl Into<String>, binding_name: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let relative_path = relative_path
            .strip_prefix("./")
            .map(str::to_string)
            .unwrap_or(relative_path);
        Self {
            relative_path,
            binding_name: binding_name.into(),
        }
    }

    /// Import specifier as written in the emitted source, under `base`
    /// (`.` when the importing file sits in the resource root).
    pub fn specifier(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.relative_path)
    }

    /// Key in the embedded resource map.
    pub fn key(&self) -> &str {
        &self.relative_path
    }
}

/// Resource keys resolved for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceKeys {
    pub platform: String,
    pub executable: String,
    pub bridge_library: String,
    pub layout_engine: String,
}

pub fn is_windows_family(os: &str) -> bool {
    os == "win32" || os == "windows"
}

/// Platform segment for `(os, arch)`. Architectures are not validated.
pub fn platform_key(os: &str, arch: &str) -> String {
    if is_windows_family(os) {
        WINDOWS_SEGMENT.to_string()
    } else {
        format!("{}-{}", arch, os)
    }
}

pub fn resource_keys_for(os: &str, arch: &str) -> ResourceKeys {
    let platform = platform_key(os, arch);
    let suffix = if is_windows_family(os) { ".exe" } else { "" };
    let base = format!("{}/{}/{}", VENDOR_DIR, RESOURCE_FAMILY, platform);
    ResourceKeys {
        executable: format!("{}/{}{}", base, EXECUTABLE_NAME, suffix),
        bridge_library: format!("{}/{}", base, BRIDGE_LIBRARY_NAME),
        layout_engine: LAYOUT_ENGINE_KEY.to_string(),
        platform,
    }
}

/// Every descriptor that may be embedded for `target`, layout engine first.
pub fn descriptors_for(target: BuildTarget) -> Vec<ResourceDescriptor> {
    let mut out = vec![ResourceDescriptor::new(LAYOUT_ENGINE_KEY, LAYOUT_ENGINE_BINDING)];
    for segment in target.segments() {
        out.extend(segment.descriptors());
    }
    out
}

/// Result of best-effort platform detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformProbe {
    Detected(String),
    /// Detection information was missing; holds the `x64-win32` default.
    Defaulted(String),
}

impl PlatformProbe {
    pub fn key(&self) -> &str {
        match self {
            PlatformProbe::Detected(key) | PlatformProbe::Defaulted(key) => key,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, PlatformProbe::Defaulted(_))
    }
}

/// Never fails: missing or empty components fall back to `x64`/`win32`.
pub fn detect_platform(os: Option<&str>, arch: Option<&str>) -> PlatformProbe {
    match (non_empty(os), non_empty(arch)) {
        (Some(os), Some(arch)) => PlatformProbe::Detected(platform_key(os, arch)),
        _ => PlatformProbe::Defaulted(platform_key(DEFAULT_OS, DEFAULT_ARCH)),
    }
}

/// The machine running this tool, in Node naming.
pub fn host_platform() -> (String, String) {
    (
        node_os_name(std::env::consts::OS).to_string(),
        node_arch_name(std::env::consts::ARCH).to_string(),
    )
}

pub fn node_os_name(rust_os: &str) -> &str {
    match rust_os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

pub fn node_arch_name(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
