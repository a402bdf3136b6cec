// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use lesewerk_core::error::Result;

const APP_DIR: &str = "lesewerk";

/// Settings file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";
/// History database inside the data directory.
pub const HISTORY_FILE: &str = "history.db";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> Result<PathBuf> {
    let dir = base_dir(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
    .join(APP_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

pub fn history_path(data_dir: &Path) -> PathBuf {
    data_dir.join(HISTORY_FILE)
}

/// XDG data dir, then `~/.local/share`, then the temp dir.
fn base_dir(xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(xdg) = xdg_data_home.filter(|p| p.is_absolute()) {
        return xdg;
    }
    if let Some(home) = home {
        return home.join(".local").join("share");
    }
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let base = base_dir(Some("/xdg".into()), Some("/home/ada".into()));
        assert_eq!(base, PathBuf::from("/xdg"));
    }

    #[test]
    fn relative_xdg_is_ignored() {
        let base = base_dir(Some("relative".into()), Some("/home/ada".into()));
        assert_eq!(base, PathBuf::from("/home/ada/.local/share"));
    }

    #[test]
    fn falls_back_to_temp_dir() {
        assert_eq!(base_dir(None, None), std::env::temp_dir());
    }
}
