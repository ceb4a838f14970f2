mod tests {
    use crate::*;

    fn prepare_args(argv: &[&str]) -> PrepareArgs {
        let mut full = vec!["embedprep", "prepare"];
        full.extend_from_slice(argv);
        match CliArgs::try_parse_from(full).expect("should parse").command {
            Commands::Prepare(args) => args,
            other => panic!("expected prepare command, got {:?}", other),
        }
    }

    #[test]
    fn test_env_toggle_values() {
        assert!(!env_toggle_enabled(""));
        assert!(!env_toggle_enabled(" off "));
        assert!(!env_toggle_enabled("FALSE"));
        assert!(env_toggle_enabled("1"));
        assert!(env_toggle_enabled("embedprep_core=debug"));
    }

    #[test]
    fn test_filter_expr_only_for_real_filters() {
        assert_eq!(filter_expr_from("true"), None);
        assert_eq!(filter_expr_from(" on"), None);
        assert_eq!(
            filter_expr_from("embedprep_core=trace"),
            Some("embedprep_core=trace".to_string())
        );
    }

    #[test]
    fn test_target_aliases_parse() {
        let args = prepare_args(&["--target", "win32"]);
        assert_eq!(args.target, Some(BuildTarget::Windows));
        let args = prepare_args(&["--target", "native"]);
        assert_eq!(args.target, Some(BuildTarget::General));
    }

    #[test]
    fn test_unknown_target_is_a_usage_error() {
        let err = CliArgs::try_parse_from(["embedprep", "prepare", "--target", "beos"]).unwrap_err();
        assert!(err.to_string().contains("Unknown build target"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = prepare_args(&[
            "--target",
            "windows",
            "--source",
            "dist/cli.js",
            "--resources",
            "dist",
            "--env-prefix",
            "MY_TOOL",
        ]);
        let config = resolve_prepare_config(None, args).expect("valid config");
        assert_eq!(config.target, BuildTarget::Windows);
        assert_eq!(config.source, PathBuf::from("dist/cli.js"));
        assert_eq!(config.stage_path(), Some(PathBuf::from("dist").join(".windows-build-temp")));
        assert_eq!(config.env_prefix, "MY_TOOL");
    }

    #[test]
    fn test_invalid_env_prefix_rejected() {
        let args = prepare_args(&["--env-prefix", "has space"]);
        assert!(resolve_prepare_config(None, args).is_err());
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embedprep.toml");
        std::fs::write(&path, "target = \"windows\"\nsource = \"a.js\"\nplaceholder_name = \"app.exe\"\n").unwrap();

        let config = resolve_prepare_config(Some(&path), prepare_args(&["--source", "b.js"])).unwrap();
        assert_eq!(config.target, BuildTarget::Windows);
        assert_eq!(config.source, PathBuf::from("b.js"));
        assert_eq!(config.placeholder_name, "app.exe");

        let config = resolve_prepare_config(Some(&path), prepare_args(&["--target", "general"])).unwrap();
        assert_eq!(config.target, BuildTarget::General);
    }

    #[test]
    fn test_locate_collects_trailing_argv() {
        let args = CliArgs::try_parse_from([
            "embedprep",
            "locate",
            "--cwd",
            r"C:\work",
            "--",
            "bun",
            r"C:\Users\A\app.exe",
            "--flag",
        ])
        .expect("should parse");
        match args.command {
            Commands::Locate { cwd, argv, placeholder, .. } => {
                assert_eq!(cwd.as_deref(), Some(r"C:\work"));
                assert_eq!(argv, vec!["bun", r"C:\Users\A\app.exe", "--flag"]);
                assert_eq!(placeholder, "claude-code.exe");
            }
            other => panic!("expected locate command, got {:?}", other),
        }
    }

    #[test]
    fn test_shell_takes_candidates_in_order() {
        let args = CliArgs::try_parse_from(["embedprep", "shell", "--os", "linux", "/bin/zsh", "/bin/bash"])
            .expect("should parse");
        match args.command {
            Commands::Shell { os, candidates } => {
                assert_eq!(os.as_deref(), Some("linux"));
                assert_eq!(candidates, vec!["/bin/zsh", "/bin/bash"]);
            }
            other => panic!("expected shell command, got {:?}", other),
        }
    }

    #[test]
    fn test_keys_accepts_resource_root() {
        let args = CliArgs::try_parse_from(["embedprep", "keys", "--resources", "pkg"]).expect("should parse");
        match args.command {
            Commands::Keys { resource_root, json, .. } => {
                assert_eq!(resource_root, Some(PathBuf::from("pkg")));
                assert!(!json);
            }
            other => panic!("expected keys command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let args = CliArgs::try_parse_from(["embedprep", "plan", "--config", "x.toml"]).expect("should parse");
        assert_eq!(args.config.as_deref(), Some(Path::new("x.toml")));
    }
}
