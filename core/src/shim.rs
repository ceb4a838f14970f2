//! Runtime path/URL resolution shim.
//!
//! The rewritten program can no longer ask where its own source file lives, so
//! a header establishing `__executablePath`, `__executableDir` and
//! `__executableUrl` is injected once at startup. [`ExecutableLocation`] models
//! the same precedence rules in Rust so the behaviour can be checked (and
//! previewed through `embedprep locate`) without running the bundle.

use anyhow::{Context, Result, anyhow, bail};
use url::Url;

use crate::platform::BuildTarget;

pub const EXECUTABLE_PATH_VAR: &str = "__executablePath";
pub const EXECUTABLE_DIR_VAR: &str = "__executableDir";
pub const EXECUTABLE_URL_VAR: &str = "__executableUrl";
pub const DEFAULT_PLACEHOLDER_NAME: &str = "claude-code.exe";
pub const DEFAULT_ENV_PREFIX: &str = "CLAUDE_CODE";

/// Parameters of the injected header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimOptions {
    pub target: BuildTarget,
    /// Prefix of the `{PREFIX}_BUNDLED` / `{PREFIX}_WINDOWS_EXECUTABLE` indicators.
    pub env_prefix: String,
    /// File name joined onto the working directory when nothing better is known.
    pub placeholder_name: String,
}

impl ShimOptions {
    pub fn new(target: BuildTarget) -> Self {
        Self {
            target,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            placeholder_name: DEFAULT_PLACEHOLDER_NAME.to_string(),
        }
    }

    /// Environment indicators set unconditionally by the header.
    pub fn indicators(&self) -> Vec<String> {
        let mut out = vec![format!("{}_BUNDLED", self.env_prefix)];
        if self.target.is_windows() {
            out.push(format!("{}_WINDOWS_EXECUTABLE", self.env_prefix));
        }
        out
    }

    pub fn render(&self) -> String {
        let placeholder = js_string(&self.placeholder_name);
        let mut out = String::with_capacity(1024);
        out.push_str("// Self-contained executable runtime context\n");
        out.push_str(&format!(
            "const __isWindowsExecutable = {};\n",
            self.target.is_windows()
        ));
        out.push_str(&format!("const {} = (() => {{\n", EXECUTABLE_PATH_VAR));
        out.push_str("  const path = require('path');\n");
        out.push_str("  const argv1 = typeof process !== 'undefined' && process.argv ? process.argv[1] : undefined;\n");
        out.push_str("  if (argv1) return path.isAbsolute(argv1) ? argv1 : path.resolve(argv1);\n");
        out.push_str("  if (typeof __filename !== 'undefined' && __filename) return path.resolve(__filename);\n");
        out.push_str(&format!("  return path.join(process.cwd(), {});\n", placeholder));
        out.push_str("})();\n");
        out.push_str(&format!(
            "const {} = require('path').dirname({});\n",
            EXECUTABLE_DIR_VAR, EXECUTABLE_PATH_VAR
        ));
        out.push_str("function __toFileURL(p) {\n");
        out.push_str("  return require('url').pathToFileURL(require('path').resolve(p)).href;\n");
        out.push_str("}\n");
        out.push_str(&format!(
            "const {} = __toFileURL({});\n",
            EXECUTABLE_URL_VAR, EXECUTABLE_PATH_VAR
        ));
        out.push_str("if (typeof globalThis.__filename === 'undefined') {\n");
        out.push_str(&format!("  globalThis.__filename = {};\n", EXECUTABLE_PATH_VAR));
        out.push_str(&format!("  globalThis.__dirname = {};\n", EXECUTABLE_DIR_VAR));
        out.push_str("}\n");
        for indicator in self.indicators() {
            out.push_str(&format!("process.env.{}=\"1\";\n", indicator));
        }
        out
    }
}

/// Path syntax a location is interpreted with, independent of the host running this tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFlavor {
    Posix,
    Windows,
}

impl PathFlavor {
    /// Flavour implied by an absolute path's root, `None` for relative paths.
    pub fn infer(path: &str) -> Option<Self> {
        if windows_root_len(path).is_some() {
            Some(PathFlavor::Windows)
        } else if path.starts_with('/') {
            Some(PathFlavor::Posix)
        } else {
            None
        }
    }

    pub fn separator(self) -> char {
        match self {
            PathFlavor::Posix => '/',
            PathFlavor::Windows => '\\',
        }
    }

    fn is_separator(self, c: char) -> bool {
        match self {
            PathFlavor::Posix => c == '/',
            PathFlavor::Windows => c == '/' || c == '\\',
        }
    }

    fn root_len(self, path: &str) -> Option<usize> {
        match self {
            PathFlavor::Posix => path.starts_with('/').then_some(1),
            PathFlavor::Windows => windows_root_len(path).or_else(|| {
                path.starts_with(['\\', '/']).then_some(1)
            }),
        }
    }

    pub fn is_absolute(self, path: &str) -> bool {
        self.root_len(path).is_some()
    }

    pub fn join(self, base: &str, name: &str) -> String {
        if base.is_empty() {
            return name.to_string();
        }
        let mut out = base.to_string();
        if !out.ends_with(|c: char| self.is_separator(c)) {
            out.push(self.separator());
        }
        out.push_str(name.trim_start_matches(|c: char| self.is_separator(c)));
        out
    }

    pub fn dirname(self, path: &str) -> String {
        let root = self.root_len(path).unwrap_or(0);
        let trimmed = path.trim_end_matches(|c: char| self.is_separator(c));
        if trimmed.len() <= root {
            return path[..root.min(path.len())].to_string();
        }
        match trimmed.rfind(|c: char| self.is_separator(c)) {
            Some(idx) if idx >= root => trimmed[..idx].to_string(),
            Some(_) => path[..root].to_string(),
            None if root > 0 => path[..root].to_string(),
            None => ".".to_string(),
        }
    }

    /// Resolve `path` against `cwd` and normalise `.`/`..` segments.
    pub fn resolve(self, cwd: &str, path: &str) -> String {
        let joined = if self.is_absolute(path) {
            path.to_string()
        } else {
            self.join(cwd, path)
        };
        let root_len = self.root_len(&joined).unwrap_or(0);
        let (root, rest) = joined.split_at(root_len);
        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split(|c: char| self.is_separator(c)) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.last().is_some_and(|last| *last != "..") {
                        segments.pop();
                    } else if root.is_empty() {
                        segments.push("..");
                    }
                }
                other => segments.push(other),
            }
        }
        let mut out = match self {
            PathFlavor::Windows => root.replace('/', "\\"),
            PathFlavor::Posix => root.to_string(),
        };
        let separator = self.separator().to_string();
        out.push_str(&segments.join(separator.as_str()));
        if out.is_empty() { ".".to_string() } else { out }
    }
}

/// Length of a Windows root (`C:\`, `\\server\share\`), if present.
fn windows_root_len(path: &str) -> Option<usize> {
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && matches!(bytes[2], b'\\' | b'/') {
        return Some(3);
    }
    if let Some(rest) = path.strip_prefix("\\\\") {
        let mut parts = rest.splitn(3, '\\');
        let server = parts.next().unwrap_or_default();
        let share = parts.next().unwrap_or_default();
        if !server.is_empty() && !share.is_empty() {
            let root = 2 + server.len() + 1 + share.len();
            return Some((root + 1).min(path.len()));
        }
    }
    None
}

/// What the rewritten program sees at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    /// Full argument list, interpreter first (`process.argv`).
    pub args: Vec<String>,
    /// A self-location variable the runtime already defines (`__filename`).
    pub self_location: Option<String>,
    pub cwd: String,
}

impl Invocation {
    pub fn new<I, S>(args: I, cwd: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            self_location: None,
            cwd: cwd.into(),
        }
    }

    pub fn with_self_location(mut self, location: impl Into<String>) -> Self {
        self.self_location = Some(location.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    Argument,
    SelfLocation,
    Placeholder,
}

/// Process-wide executable location, built once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableLocation {
    pub path: String,
    pub dir: String,
    pub flavor: PathFlavor,
    pub source: LocationSource,
}

impl ExecutableLocation {
    pub fn resolve(invocation: &Invocation, placeholder_name: &str) -> Self {
        let cwd_flavor = PathFlavor::infer(&invocation.cwd).unwrap_or(PathFlavor::Posix);
        let candidate = invocation
            .args
            .get(1)
            .filter(|arg| !arg.is_empty())
            .map(|arg| (arg.as_str(), LocationSource::Argument))
            .or_else(|| {
                invocation
                    .self_location
                    .as_deref()
                    .filter(|loc| !loc.is_empty())
                    .map(|loc| (loc, LocationSource::SelfLocation))
            });

        let (path, flavor, source) = match candidate {
            Some((raw, source)) => match PathFlavor::infer(raw) {
                Some(flavor) => (raw.to_string(), flavor, source),
                None => (cwd_flavor.resolve(&invocation.cwd, raw), cwd_flavor, source),
            },
            None => (
                cwd_flavor.join(&invocation.cwd, placeholder_name),
                cwd_flavor,
                LocationSource::Placeholder,
            ),
        };

        let dir = flavor.dirname(&path);
        Self {
            path,
            dir,
            flavor,
            source,
        }
    }

    pub fn file_url(&self) -> Result<Url> {
        file_url_from_path(&self.path)
    }
}

/// Build a `file:` URL from an absolute path. Relative input is rejected
/// before any URL is assembled; resolve it against a directory first.
///
/// Every path segment is pushed through the URL serializer, so `#`, `?`, `%`
/// and spaces come out percent-encoded instead of starting a fragment or query.
pub fn file_url_from_path(path: &str) -> Result<Url> {
    let Some(flavor) = PathFlavor::infer(path) else {
        bail!("Cannot build a file URL from non-absolute path '{}'", path);
    };
    let mut url = Url::parse("file:///").context("Failed to create base file URL")?;
    let forward = match flavor {
        PathFlavor::Posix => path.to_string(),
        PathFlavor::Windows => path.replace('\\', "/"),
    };

    let rest = match forward.strip_prefix("//").filter(|_| flavor == PathFlavor::Windows) {
        Some(unc) => {
            let (server, rest) = unc.split_once('/').unwrap_or((unc, ""));
            url.set_host(Some(server))
                .with_context(|| format!("Invalid UNC server name '{}' in '{}'", server, path))?;
            rest
        }
        None => forward.as_str(),
    };

    url.path_segments_mut()
        .map_err(|_| anyhow!("file URL cannot carry path segments"))?
        .clear()
        .extend(rest.split('/').filter(|segment| !segment.is_empty()));
    Ok(url)
}

fn js_string(raw: &str) -> String {
    serde_json::to_string(raw).unwrap_or_else(|_| format!("\"{}\"", raw))
}
