//! The ordered rule set applied to the bundled CLI.
//!
//! Order matters: resource sites are rewritten while they still contain
//! `import.meta.url`, the self-location pass runs afterwards and also cleans up
//! the fallback chains the resource rules keep reachable.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::rule::{RewriteRule, RuleKind, RuleScope};
use crate::platform::{BuildTarget, LAYOUT_ENGINE_BINDING};
use crate::shell;
use crate::shim::{EXECUTABLE_DIR_VAR, EXECUTABLE_PATH_VAR, EXECUTABLE_URL_VAR};

pub const SITE_LAYOUT_ENGINE: &str = "yoga";
pub const SITE_RIPGREP_DIR: &str = "ripgrep";
pub const SITE_RIPGREP_NODE: &str = "ripgrep-node";
pub const SITE_SHELL: &str = "shell";

/// Identifier pattern for minified JS (`$` is legal and common).
const IDENT: &str = r"[\w$]+";

const YOGA_EXACT: &str = r#"var k81=await nUA(await VP9(CP9(import.meta.url).resolve("./yoga.wasm")));"#;
const RIPGREP_DIR_EXACT: &str = r#"let B=Db.resolve(et9,"vendor","ripgrep");"#;
const RIPGREP_NODE_EXACT: &str = r#"B="./ripgrep.node""#;

fn compile(pattern: &str) -> Regex {
    Regex::new(&pattern.replace("{ID}", IDENT)).expect("rewrite rule pattern must compile")
}

static YOGA_EXACT_RE: Lazy<Regex> = Lazy::new(|| compile(&regex::escape(YOGA_EXACT)));
static YOGA_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r#"var\s+({ID})\s*=\s*await\s+({ID})\s*\(\s*await\s+({ID})\s*\(\s*({ID})\s*\(\s*import\.meta\.url\s*\)\s*\.resolve\s*\(\s*["']\./yoga\.wasm["']\s*\)\s*\)\s*\)"#,
    )
});
static YOGA_EXPR_RE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r#"await\s+({ID})\s*\(\s*await\s+({ID})\s*\(\s*({ID})\s*\(\s*import\.meta\.url\s*\)\s*\.resolve\s*\(\s*["']\./yoga\.wasm["']\s*\)\s*\)\s*\)"#,
    )
});
static RIPGREP_DIR_EXACT_RE: Lazy<Regex> = Lazy::new(|| compile(&regex::escape(RIPGREP_DIR_EXACT)));
static RIPGREP_DIR_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r#"let\s+({ID})\s*=\s*({ID})\.resolve\s*\(\s*({ID})\s*,\s*["']vendor["']\s*,\s*["']ripgrep["']\s*\)"#)
});
static RIPGREP_NODE_EXACT_RE: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"\b{}", regex::escape(RIPGREP_NODE_EXACT))));
static RIPGREP_NODE_RE: Lazy<Regex> = Lazy::new(|| compile(r#"\b({ID})\s*=\s*["']\./ripgrep\.node["']"#));
static SELF_DIRNAME_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"{ID}\s*\(\s*{ID}\s*\(\s*import\.meta\.url\s*\)\s*\)"));
static SELF_ASSIGN_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(var|let|const)\s+({ID})\s*=\s*({ID})\s*\(\s*import\.meta\.url\s*\)"));
static SELF_CALL_RE: Lazy<Regex> = Lazy::new(|| compile(r"\bfileURLToPath\s*\(\s*import\.meta\.url\s*\)"));
static SELF_META_DIRNAME_RE: Lazy<Regex> = Lazy::new(|| compile(r"\bimport\.meta\.dirname\b"));
static SELF_META_FILENAME_RE: Lazy<Regex> = Lazy::new(|| compile(r"\bimport\.meta\.filename\b"));
static SELF_RESOLVE_RE: Lazy<Regex> = Lazy::new(|| compile(r"\bimport\.meta\.resolve\b"));
static SELF_URL_RE: Lazy<Regex> = Lazy::new(|| compile(r"\bimport\.meta\.url\b"));
static SHELL_GUARD_RE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(let\s+({ID})\s*=\s*[\w$.]+\.find\s*\([^;]*?\))\s*;\s*if\s*\(\s*!\s*({ID})\s*\)\s*\{(?:[^{}]|\$\{[^}]*\})*?\bthrow\b(?:[^{}]|\$\{[^}]*\})*\}",
    )
});

/// Every rule, in application order.
pub fn default_rules() -> Vec<RewriteRule> {
    let mut rules = resource_rules();
    rules.extend(self_location_rules());
    rules.push(shell_fallback_rule());
    rules
}

/// Layout engine, helper executable and bridge library consumption sites.
pub fn resource_rules() -> Vec<RewriteRule> {
    vec![
        RewriteRule::new("yoga-wasm-exact", RuleKind::Exact, YOGA_EXACT_RE.clone(), expand_yoga_exact)
            .at_site(SITE_LAYOUT_ENGINE),
        RewriteRule::new(
            "yoga-wasm-assignment",
            RuleKind::Generalized,
            YOGA_ASSIGN_RE.clone(),
            expand_yoga_assignment,
        )
        .at_site(SITE_LAYOUT_ENGINE),
        RewriteRule::new(
            "yoga-wasm-expression",
            RuleKind::Generalized,
            YOGA_EXPR_RE.clone(),
            expand_yoga_expression,
        )
        .at_site(SITE_LAYOUT_ENGINE),
        RewriteRule::new(
            "ripgrep-dir-exact",
            RuleKind::Injection,
            RIPGREP_DIR_EXACT_RE.clone(),
            expand_ripgrep_dir,
        )
        .at_site(SITE_RIPGREP_DIR),
        RewriteRule::new(
            "ripgrep-dir-assignment",
            RuleKind::Injection,
            RIPGREP_DIR_RE.clone(),
            expand_ripgrep_dir,
        )
        .at_site(SITE_RIPGREP_DIR),
        RewriteRule::new(
            "ripgrep-node-exact",
            RuleKind::Injection,
            RIPGREP_NODE_EXACT_RE.clone(),
            expand_ripgrep_node_exact,
        )
        .at_site(SITE_RIPGREP_NODE),
        RewriteRule::new(
            "ripgrep-node-binding",
            RuleKind::Injection,
            RIPGREP_NODE_RE.clone(),
            expand_ripgrep_node,
        )
        .at_site(SITE_RIPGREP_NODE),
    ]
}

/// Windows-only pass replacing self-location queries, most specific shape first.
pub fn self_location_rules() -> Vec<RewriteRule> {
    vec![
        RewriteRule::new(
            "dirname-of-self-location",
            RuleKind::Generalized,
            SELF_DIRNAME_RE.clone(),
            |_, _| Some(EXECUTABLE_DIR_VAR.to_string()),
        ),
        RewriteRule::new(
            "self-path-assignment",
            RuleKind::Generalized,
            SELF_ASSIGN_RE.clone(),
            expand_self_assignment,
        ),
        RewriteRule::new("self-path-call", RuleKind::Exact, SELF_CALL_RE.clone(), |_, _| {
            Some(EXECUTABLE_PATH_VAR.to_string())
        }),
        RewriteRule::new(
            "self-dirname",
            RuleKind::Exact,
            SELF_META_DIRNAME_RE.clone(),
            |_, _| Some(EXECUTABLE_DIR_VAR.to_string()),
        ),
        RewriteRule::new(
            "self-filename",
            RuleKind::Exact,
            SELF_META_FILENAME_RE.clone(),
            |_, _| Some(EXECUTABLE_PATH_VAR.to_string()),
        ),
        // Specifiers resolve against the executable instead of the module.
        RewriteRule::new("self-resolve", RuleKind::Generalized, SELF_RESOLVE_RE.clone(), |_, _| {
            Some(format!("((__s)=>new URL(__s,{EXECUTABLE_URL_VAR}).href)"))
        }),
        RewriteRule::new("self-url", RuleKind::Exact, SELF_URL_RE.clone(), |_, _| {
            Some(EXECUTABLE_URL_VAR.to_string())
        }),
    ]
    .into_iter()
    .map(|rule| rule.scoped(RuleScope::WindowsOnly))
    .collect()
}

pub fn shell_fallback_rule() -> RewriteRule {
    RewriteRule::new(
        "shell-fallback",
        RuleKind::Injection,
        SHELL_GUARD_RE.clone(),
        expand_shell_fallback,
    )
    .at_site(SITE_SHELL)
}

/// Embedded read of the layout engine, short-circuiting `original`.
fn embedded_yoga_or(original: &str) -> String {
    format!(
        "typeof {b}!=='undefined'?Buffer.from(await Bun.file({b}).arrayBuffer()):{original}",
        b = LAYOUT_ENGINE_BINDING
    )
}

fn expand_yoga_exact(_: &Captures<'_>, _: BuildTarget) -> Option<String> {
    let original = r#"await VP9(CP9(import.meta.url).resolve("./yoga.wasm"))"#;
    Some(format!("var k81=await nUA({});", embedded_yoga_or(original)))
}

/// Renamed bundles read the module from beside the executable.
fn yoga_fallback(read: &str) -> String {
    format!(r#"await {read}(require("path").join({EXECUTABLE_DIR_VAR},"yoga.wasm"))"#)
}

fn expand_yoga_assignment(caps: &Captures<'_>, _: BuildTarget) -> Option<String> {
    let fallback = yoga_fallback(&caps[3]);
    Some(format!(
        "var {}=await {}({})",
        &caps[1],
        &caps[2],
        embedded_yoga_or(&fallback)
    ))
}

fn expand_yoga_expression(caps: &Captures<'_>, _: BuildTarget) -> Option<String> {
    let fallback = yoga_fallback(&caps[2]);
    Some(format!("await {}({})", &caps[1], embedded_yoga_or(&fallback)))
}

/// Returns early with the embedded helper executable when one matches this platform.
fn expand_ripgrep_dir(caps: &Captures<'_>, _: BuildTarget) -> Option<String> {
    Some(format!(
        "{{const __embeddedRg=(()=>{{const __rgKey=__embeddedResourceKeys().executable;\
return typeof __embeddedFiles!=='undefined'&&__embeddedFiles[__rgKey]||null;}})();\
if(__embeddedRg)return __embeddedRg;}}{}",
        &caps[0]
    ))
}

fn embedded_bridge_resolver() -> &'static str {
    "(()=>{const __nodeKey=__embeddedResourceKeys().bridge;\
return typeof __embeddedFiles!=='undefined'&&__embeddedFiles[__nodeKey]||\"./ripgrep.node\";})()"
}

fn expand_ripgrep_node_exact(_: &Captures<'_>, _: BuildTarget) -> Option<String> {
    Some(format!("B={}", embedded_bridge_resolver()))
}

fn expand_ripgrep_node(caps: &Captures<'_>, _: BuildTarget) -> Option<String> {
    Some(format!("{}={}", &caps[1], embedded_bridge_resolver()))
}

fn expand_self_assignment(caps: &Captures<'_>, _: BuildTarget) -> Option<String> {
    let (keyword, name, callee) = (&caps[1], &caps[2], &caps[3]);
    if callee == "fileURLToPath" {
        Some(format!("{} {}={}", keyword, name, EXECUTABLE_PATH_VAR))
    } else {
        Some(format!("{} {}={}({})", keyword, name, callee, EXECUTABLE_URL_VAR))
    }
}

fn expand_shell_fallback(caps: &Captures<'_>, target: BuildTarget) -> Option<String> {
    let (declaration, assigned, guarded) = (&caps[1], &caps[2], &caps[3]);
    if assigned != guarded {
        return None;
    }
    Some(format!(
        "{};if(!{}){{{}={}}}",
        declaration,
        assigned,
        assigned,
        shell::fallback_expression(target)
    ))
}
