#[cfg(test)]
mod tests {
    use crate::platform::BuildTarget;
    use crate::shell::*;

    #[test]
    fn exhausted_search_defaults_per_os() {
        let search = ShellSearch::new(["/usr/bin/zsh", "/bin/bash"]);
        assert_eq!(
            search.clone().resolve("win32", |_| false),
            ShellResolution::Defaulted("cmd.exe".into())
        );
        assert_eq!(
            search.resolve("linux", |_| false),
            ShellResolution::Defaulted("/bin/sh".into())
        );
    }

    #[test]
    fn first_usable_candidate_wins() {
        let resolution = ShellSearch::new(["/usr/bin/zsh", "/bin/bash", "/bin/dash"])
            .resolve("linux", |candidate| candidate.ends_with("sh") && candidate != "/usr/bin/zsh");
        assert_eq!(resolution, ShellResolution::Found("/bin/bash".into()));
        assert_eq!(resolution.path(), "/bin/bash");
    }

    #[test]
    fn step_walks_through_states() {
        let mut search = ShellSearch::new(["a", "b"]);
        let mut never = |_: &str| false;
        assert_eq!(search.state(), &ShellState::Searching { next: 0 });
        assert_eq!(search.step(&mut never), &ShellState::Searching { next: 1 });
        assert_eq!(search.step(&mut never), &ShellState::Searching { next: 2 });
        assert_eq!(search.step(&mut never), &ShellState::Unresolved);
        assert_eq!(search.step(&mut never), &ShellState::Unresolved);
    }

    #[test]
    fn resolved_search_ignores_later_steps() {
        let mut search = ShellSearch::new(["a"]);
        let mut always = |_: &str| true;
        search.step(&mut always);
        let resolved = ShellState::Resolved(ShellResolution::Found("a".into()));
        assert_eq!(search.state(), &resolved);
        assert_eq!(search.step(&mut |_: &str| false), &resolved);
    }

    #[test]
    fn empty_candidate_list_is_unresolved_immediately() {
        let mut search = ShellSearch::new(Vec::<String>::new());
        assert_eq!(search.step(&mut |_: &str| true), &ShellState::Unresolved);
    }

    #[test]
    fn fallback_expression_matches_target() {
        assert_eq!(fallback_expression(BuildTarget::Windows), "\"cmd.exe\"");
        assert_eq!(
            fallback_expression(BuildTarget::General),
            "process.platform===\"win32\"?\"cmd.exe\":\"/bin/sh\""
        );
        assert_eq!(default_interpreter("windows"), "cmd.exe");
        assert_eq!(default_interpreter("darwin"), "/bin/sh");
    }
}
