#[cfg(test)]
mod tests {
    use std::fs;

    use crate::embed::*;
    use crate::platform::{BuildTarget, resource_keys_for};

    fn probe_for(present: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |path: &str| present.iter().any(|p| *p == path)
    }

    #[test]
    fn only_present_files_are_planned() {
        let planner = EmbeddingPlanner::new(
            probe_for(&[
                "yoga.wasm",
                "vendor/ripgrep/x64-darwin/rg",
                "vendor/ripgrep/x64-darwin/ripgrep.node",
            ]),
            BuildTarget::General,
        );
        let plan = planner.plan();
        assert_eq!(
            plan.keys(),
            vec![
                "yoga.wasm",
                "vendor/ripgrep/x64-darwin/rg",
                "vendor/ripgrep/x64-darwin/ripgrep.node"
            ]
        );
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.missing.len(), 8);

        let rendered = plan.render();
        assert_eq!(rendered.matches(" with { type: \"file\" };").count(), 3);
        assert!(rendered.contains("import __embeddedRgDarwinX64 from \"./vendor/ripgrep/x64-darwin/rg\""));
        assert!(!rendered.contains("arm64-darwin"));
    }

    #[test]
    fn absent_keys_fall_back_to_filesystem() {
        let plan = EmbeddingPlanner::new(
            probe_for(&["yoga.wasm", "vendor/ripgrep/x64-darwin/rg"]),
            BuildTarget::General,
        )
        .plan();

        let arm = resource_keys_for("darwin", "arm64");
        assert_eq!(
            plan.resolve(&arm.executable, "/opt/app/vendor/ripgrep/arm64-darwin/rg"),
            ResolvedResource::Filesystem("/opt/app/vendor/ripgrep/arm64-darwin/rg")
        );
        let x64 = resource_keys_for("darwin", "x64");
        assert_eq!(
            plan.resolve(&x64.executable, "unused"),
            ResolvedResource::Embedded("__embeddedRgDarwinX64")
        );
    }

    #[test]
    fn empty_plan_still_renders_map_and_helper() {
        let plan = EmbeddingPlanner::new(|_: &str| false, BuildTarget::Windows).plan();
        assert!(plan.is_empty());
        assert_eq!(plan.missing.len(), 3);
        let rendered = plan.render();
        assert!(!rendered.contains("import "));
        assert!(rendered.contains("const __embeddedFiles = {\n};"));
        assert!(rendered.contains("function __embeddedResourceKeys()"));
    }

    #[test]
    fn windows_plan_uses_win32_bindings() {
        let plan = EmbeddingPlanner::new(|_: &str| true, BuildTarget::Windows).plan();
        assert_eq!(
            plan.mapping_literal(),
            "const __embeddedFiles = {\n  'yoga.wasm': __embeddedYogaWasm,\n  'vendor/ripgrep/x64-win32/rg.exe': __embeddedRgWin32,\n  'vendor/ripgrep/x64-win32/ripgrep.node': __embeddedRgNodeWin32,\n};\n"
        );
    }

    #[test]
    fn render_is_deterministic() {
        let planner = EmbeddingPlanner::new(|_: &str| true, BuildTarget::General);
        assert_eq!(planner.plan().render(), planner.plan().render());
    }

    #[test]
    fn key_helper_defaults_to_windows_x64() {
        let helper = key_helper();
        assert!(helper.contains("let os = \"win32\";"));
        assert!(helper.contains("let arch = \"x64\";"));
        assert!(helper.contains("os === \"win32\" ? \"x64-win32\" : `${arch}-${os}`"));
        assert!(helper.contains("executable: `${base}/rg${suffix}`"));
        assert!(helper.contains("layoutEngine: \"yoga.wasm\""));
        assert!(helper.contains("try {"));
    }

    #[test]
    fn fs_probe_checks_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("yoga.wasm"), b"\0asm").unwrap();
        fs::create_dir_all(dir.path().join("vendor/ripgrep/x64-linux/rg")).unwrap();

        let plan = EmbeddingPlanner::for_root(dir.path(), BuildTarget::General).plan();
        assert_eq!(plan.keys(), vec!["yoga.wasm"]);
        assert!(plan.lookup("vendor/ripgrep/x64-linux/rg").is_none());
    }

    #[test]
    fn import_base_walks_from_output_dir_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        assert_eq!(import_base(root, root), ".");
        assert_eq!(import_base(root, &root.join("res")), "./res");
        assert_eq!(import_base(&root.join("dist"), &root.join("res")), "../res");
        assert_eq!(import_base(&root.join("a/b"), root), "../..");
    }

    #[test]
    fn import_lines_use_the_plan_base() {
        let plan = EmbeddingPlanner::new(probe_for(&["yoga.wasm"]), BuildTarget::General)
            .plan()
            .with_import_base("../res");
        assert!(
            plan.render()
                .contains("import __embeddedYogaWasm from \"../res/yoga.wasm\" with { type: \"file\" };")
        );
        // Map keys stay root-relative.
        assert!(plan.lookup("yoga.wasm").is_some());
    }
}
