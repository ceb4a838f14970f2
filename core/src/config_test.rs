#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::*;
    use crate::platform::BuildTarget;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = PrepareConfig::from_toml_str("").unwrap();
        assert_eq!(config, PrepareConfig::default());
        assert_eq!(config.source, PathBuf::from("cli.js"));
        assert_eq!(config.env_prefix, "CLAUDE_CODE");
        assert_eq!(config.manifest, vec!["package.json", "sdk.d.ts", "yoga.wasm"]);
    }

    #[test]
    fn toml_overrides_fields() {
        let raw = r#"
target = "windows"
source = "dist/cli.js"
resource_root = "dist"
env_prefix = "MY_TOOL"
placeholder_name = "my-tool.exe"
manifest = ["package.json"]
"#;
        let config = PrepareConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.target, BuildTarget::Windows);
        assert_eq!(config.source, PathBuf::from("dist/cli.js"));
        assert_eq!(config.manifest, vec!["package.json"]);
        assert_eq!(config.shim_options().indicators(), vec![
            "MY_TOOL_BUNDLED".to_string(),
            "MY_TOOL_WINDOWS_EXECUTABLE".to_string()
        ]);
    }

    #[test]
    fn unknown_target_is_rejected() {
        assert!(PrepareConfig::from_toml_str("target = \"haiku\"").is_err());
    }

    #[test]
    fn invalid_env_prefix_is_rejected() {
        let err = PrepareConfig::from_toml_str("env_prefix = \"1BAD-NAME\"").unwrap_err();
        assert!(err.to_string().contains("env_prefix"));
    }

    #[test]
    fn placeholder_must_be_bare_name() {
        let mut config = PrepareConfig::default();
        config.placeholder_name = "bin/tool.exe".into();
        assert!(config.validate().is_err());
        config.placeholder_name = "  ".into();
        assert!(config.validate().is_err());
        config.placeholder_name = "tool.exe".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn general_target_writes_next_to_resources() {
        let mut config = PrepareConfig::for_target(BuildTarget::General);
        config.resource_root = PathBuf::from("pkg");
        assert_eq!(config.stage_path(), None);
        assert_eq!(config.output_path(), PathBuf::from("pkg").join("cli-native-bundled.js"));
        assert_eq!(config.sdk_path(), None);

        config.output = Some(PathBuf::from("out/bundle.js"));
        assert_eq!(config.output_path(), PathBuf::from("out/bundle.js"));
    }

    #[test]
    fn general_target_with_stage_dir_writes_into_the_stage() {
        let mut config = PrepareConfig::for_target(BuildTarget::General);
        config.resource_root = PathBuf::from("pkg");
        config.stage_dir = Some(PathBuf::from("build"));
        assert_eq!(config.stage_path(), Some(PathBuf::from("build")));
        assert_eq!(config.embed_root(), PathBuf::from("build"));
        assert_eq!(config.output_path(), PathBuf::from("build").join("cli-native-bundled.js"));
    }

    #[test]
    fn windows_target_always_stages() {
        let mut config = PrepareConfig::for_target(BuildTarget::Windows);
        config.resource_root = PathBuf::from("pkg");
        let stage = PathBuf::from("pkg").join(".windows-build-temp");
        assert_eq!(config.stage_path(), Some(stage.clone()));
        assert_eq!(config.output_path(), stage.join("cli-windows.js"));

        config.stage_dir = Some(PathBuf::from("tmp-stage"));
        assert_eq!(config.output_path(), PathBuf::from("tmp-stage").join("cli-windows.js"));
    }

    #[test]
    fn windows_sdk_is_discovered_under_resource_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PrepareConfig::for_target(BuildTarget::Windows);
        config.resource_root = dir.path().to_path_buf();
        assert_eq!(config.sdk_path(), None);

        std::fs::write(dir.path().join("sdk.mjs"), "export {}").unwrap();
        assert_eq!(config.sdk_path(), Some(dir.path().join("sdk.mjs")));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = PrepareConfig::load(std::path::Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
