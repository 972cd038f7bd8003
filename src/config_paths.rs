//! Purpose: Resolve the per-user configuration directory and error log path.
//! Exports: `default_config_dir`, `error_log_path`.
//! Role: Keep error-log placement in one place for the CLI and its tests.
//! Invariants: `$XDG_CONFIG_HOME/tractorbeam` wins, else `~/.config/tractorbeam`.
//! Invariants: No directory is resolved when neither variable is set; never a relative path.
//! Invariants: Resolution never touches the filesystem.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

const TOOL_DIR: &str = "tractorbeam";
const ERROR_LOG: &str = "error.log";

pub(crate) fn default_config_dir() -> Option<PathBuf> {
    config_dir_from(
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    )
}

fn config_dir_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    let usable = |dir: &OsString| Path::new(dir).is_absolute();
    if let Some(dir) = xdg_config_home.filter(usable) {
        return Some(PathBuf::from(dir).join(TOOL_DIR));
    }
    home.filter(usable)
        .map(|dir| PathBuf::from(dir).join(".config").join(TOOL_DIR))
}

pub(crate) fn error_log_path(config_dir: &Path) -> PathBuf {
    config_dir.join(ERROR_LOG)
}

#[cfg(test)]
mod tests {
    use super::{config_dir_from, error_log_path};
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    #[test]
    fn xdg_config_home_takes_precedence() {
        let dir = config_dir_from(
            Some(OsString::from("/xdg")),
            Some(OsString::from("/home/me")),
        );
        assert_eq!(dir, Some(PathBuf::from("/xdg/tractorbeam")));
    }

    #[test]
    fn falls_back_to_home_dot_config() {
        let expected = Some(PathBuf::from("/home/me/.config/tractorbeam"));
        let dir = config_dir_from(Some(OsString::new()), Some(OsString::from("/home/me")));
        assert_eq!(dir, expected);
        let dir = config_dir_from(None, Some(OsString::from("/home/me")));
        assert_eq!(dir, expected);
        let dir = config_dir_from(Some(OsString::from("relative")), Some(OsString::from("/home/me")));
        assert_eq!(dir, expected);
    }

    #[test]
    fn unset_home_resolves_nothing() {
        assert_eq!(config_dir_from(None, None), None);
        assert_eq!(config_dir_from(None, Some(OsString::new())), None);
        assert_eq!(config_dir_from(Some(OsString::from("cfg")), Some(OsString::from("home"))), None);
    }

    #[test]
    fn error_log_lives_in_config_dir() {
        assert_eq!(
            error_log_path(Path::new("/cfg")),
            PathBuf::from("/cfg/error.log")
        );
    }
}
