#[cfg(test)]
mod tests {
    use std::fs;

    use crate::stage::*;

    fn manifest() -> Vec<String> {
        DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn copies_present_manifest_files_and_vendor_tree() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("package.json"), "{}").unwrap();
        fs::write(root.path().join("yoga.wasm"), b"\0asm").unwrap();
        let win = root.path().join("vendor/ripgrep/x64-win32");
        fs::create_dir_all(&win).unwrap();
        fs::write(win.join("rg.exe"), b"MZ").unwrap();
        fs::write(win.join("ripgrep.node"), b"MZ").unwrap();
        fs::create_dir_all(root.path().join("vendor/empty")).unwrap();

        let stage = root.path().join(".windows-build-temp");
        let report = stage_build_dir(root.path(), &stage, &manifest()).unwrap();

        assert_eq!(report.copied, vec!["package.json", "yoga.wasm"]);
        assert_eq!(report.skipped, vec!["sdk.d.ts"]);
        assert_eq!(report.vendor_files, 2);
        assert!(stage.join("vendor/ripgrep/x64-win32/rg.exe").is_file());
        assert!(stage.join("vendor/empty").is_dir());
        assert_eq!(fs::read_to_string(stage.join("package.json")).unwrap(), "{}");
    }

    #[test]
    fn missing_vendor_dir_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        let stage = root.path().join("stage");
        let report = stage_build_dir(root.path(), &stage, &[]).unwrap();
        assert!(stage.is_dir());
        assert_eq!(report.vendor_files, 0);
        assert!(report.copied.is_empty());
    }

    #[test]
    fn copy_tree_counts_nested_files() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("a/one"), "1").unwrap();
        fs::write(src.path().join("a/b/two"), "2").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let copied = copy_tree(src.path(), &dest.path().join("out")).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dest.path().join("out/a/b/two")).unwrap(), "2");
    }
}
