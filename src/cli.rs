//! Minimal CLI parsing for run mode overrides.

use std::env;
use std::path::PathBuf;

/// Which library kinds a scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTarget {
    Movies,
    Shows,
    Both,
}

impl ScanTarget {
    pub fn includes_movies(&self) -> bool {
        matches!(self, ScanTarget::Movies | ScanTarget::Both)
    }

    pub fn includes_shows(&self) -> bool {
        matches!(self, ScanTarget::Shows | ScanTarget::Both)
    }
}

/// How the process runs after startup checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Interactive menu: choose movies, shows, or both.
    Menu,
    /// One scan, then exit.
    Once(ScanTarget),
    /// Hourly daemon with an overlap guard.
    Scheduled,
}

impl RunMode {
    /// Map the config file's LAUNCH_METHOD value.
    pub fn from_launch_method(value: &str) -> Self {
        match value.trim() {
            "1" => RunMode::Once(ScanTarget::Movies),
            "2" => RunMode::Once(ScanTarget::Shows),
            "3" => RunMode::Once(ScanTarget::Both),
            "schedule" => RunMode::Scheduled,
            _ => RunMode::Menu,
        }
    }

    pub fn from_arg(value: &str) -> Option<Self> {
        match value {
            "menu" => Some(RunMode::Menu),
            "movies" => Some(RunMode::Once(ScanTarget::Movies)),
            "shows" | "tv" => Some(RunMode::Once(ScanTarget::Shows)),
            "once" | "both" => Some(RunMode::Once(ScanTarget::Both)),
            "schedule" => Some(RunMode::Scheduled),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub run_mode_override: Option<RunMode>,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    fn parse(args: impl Iterator<Item = String>) -> Self {
        let mut options = CliOptions::default();
        let mut args = args;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--movies" => options.run_mode_override = Some(RunMode::Once(ScanTarget::Movies)),
                "--shows" | "--tv" => {
                    options.run_mode_override = Some(RunMode::Once(ScanTarget::Shows))
                }
                "--once" => options.run_mode_override = Some(RunMode::Once(ScanTarget::Both)),
                "--schedule" => options.run_mode_override = Some(RunMode::Scheduled),
                "--run-mode" => {
                    if let Some(value) = args.next() {
                        options.run_mode_override = RunMode::from_arg(&value);
                    }
                }
                "--config" => {
                    if let Some(value) = args.next() {
                        options.config_path = Some(PathBuf::from(value));
                    }
                }
                _ if arg.starts_with("--run-mode=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.run_mode_override = RunMode::from_arg(value);
                    }
                }
                _ if arg.starts_with("--config=") => {
                    options.config_path = arg
                        .split_once('=')
                        .map(|(_, v)| PathBuf::from(v));
                }
                _ => {}
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_run_mode_flags() {
        assert_eq!(
            parse(&["--movies"]).run_mode_override,
            Some(RunMode::Once(ScanTarget::Movies))
        );
        assert_eq!(
            parse(&["--schedule"]).run_mode_override,
            Some(RunMode::Scheduled)
        );
        assert_eq!(
            parse(&["--run-mode=tv"]).run_mode_override,
            Some(RunMode::Once(ScanTarget::Shows))
        );
        assert_eq!(
            parse(&["--run-mode", "both"]).run_mode_override,
            Some(RunMode::Once(ScanTarget::Both))
        );
        assert_eq!(parse(&[]).run_mode_override, None);
    }

    #[test]
    fn test_config_path() {
        assert_eq!(
            parse(&["--config", "/etc/trailarian.yml"]).config_path,
            Some(PathBuf::from("/etc/trailarian.yml"))
        );
        assert_eq!(
            parse(&["--config=./config.yml"]).config_path,
            Some(PathBuf::from("./config.yml"))
        );
    }

    #[test]
    fn test_launch_method_mapping() {
        assert_eq!(RunMode::from_launch_method("0"), RunMode::Menu);
        assert_eq!(
            RunMode::from_launch_method("1"),
            RunMode::Once(ScanTarget::Movies)
        );
        assert_eq!(
            RunMode::from_launch_method("3"),
            RunMode::Once(ScanTarget::Both)
        );
        assert_eq!(RunMode::from_launch_method("schedule"), RunMode::Scheduled);
        assert_eq!(RunMode::from_launch_method("bogus"), RunMode::Menu);
    }

    #[test]
    fn test_scan_target_membership() {
        assert!(ScanTarget::Both.includes_movies());
        assert!(ScanTarget::Both.includes_shows());
        assert!(ScanTarget::Movies.includes_movies());
        assert!(!ScanTarget::Movies.includes_shows());
    }
}
