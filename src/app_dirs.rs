//! Centralized application directory paths for autopress.
//!
//! Provides a single source of truth for all filesystem paths used by the
//! daemon. Uses the [`dirs`] crate for platform-appropriate directory
//! resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | State stores | `~/Library/Application Support/autopress/` | `~/.local/share/autopress/` |
//! | Config | `~/Library/Application Support/autopress/` | `~/.config/autopress/` |
//!
//! # Environment Overrides
//!
//! All paths can be overridden for testing or custom deployments:
//! - `AUTOPRESS_DATA_DIR` overrides [`data_dir`]
//! - `AUTOPRESS_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Used for the persisted stores (queue, counter, schedule, session), the
/// markdown backup output, and daemon logs.
///
/// Resolves to `dirs::data_dir()/autopress/` by default. Override with the
/// `AUTOPRESS_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("AUTOPRESS_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("autopress"))
        .unwrap_or_else(|| PathBuf::from("/tmp/autopress-data"))
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/autopress/` by default. Override with the
/// `AUTOPRESS_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("AUTOPRESS_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("autopress"))
        .unwrap_or_else(|| PathBuf::from("/tmp/autopress-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Work queue store path (`data_dir()/queue.json`).
#[must_use]
pub fn queue_file() -> PathBuf {
    data_dir().join("queue.json")
}

/// Post counter store path (`data_dir()/counter.json`).
#[must_use]
pub fn counter_file() -> PathBuf {
    data_dir().join("counter.json")
}

/// Schedule store path (`data_dir()/schedule.json`).
#[must_use]
pub fn schedule_file() -> PathBuf {
    data_dir().join("schedule.json")
}

/// Session credential store path (`data_dir()/session.json`).
#[must_use]
pub fn session_file() -> PathBuf {
    data_dir().join("session.json")
}

/// Markdown backup directory (`data_dir()/output/`).
#[must_use]
pub fn output_dir() -> PathBuf {
    data_dir().join("output")
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_nonempty() {
        let dir = data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn config_file_ends_with_config_toml() {
        let path = config_file();
        let s = path.to_string_lossy();
        assert!(s.ends_with("config.toml"), "config_file: {s}");
    }

    #[test]
    fn store_files_are_subpaths_of_data_dir() {
        let data = data_dir();
        for path in [queue_file(), counter_file(), schedule_file(), session_file()] {
            assert!(
                path.starts_with(&data),
                "{} should start with data_dir ({})",
                path.display(),
                data.display()
            );
        }
    }

    #[test]
    fn data_dir_override_via_env() {
        let key = "AUTOPRESS_DATA_DIR";
        let original = std::env::var_os(key);

        // SAFETY: Tests run single-threaded per module.
        unsafe { std::env::set_var(key, "/custom/data") };
        let result = data_dir();
        assert_eq!(result, PathBuf::from("/custom/data"));

        // Restore.
        match original {
            Some(val) => unsafe { std::env::set_var(key, val) },
            None => unsafe { std::env::remove_var(key) },
        }
    }

    #[test]
    fn config_dir_override_via_env() {
        let key = "AUTOPRESS_CONFIG_DIR";
        let original = std::env::var_os(key);

        unsafe { std::env::set_var(key, "/custom/config") };
        let result = config_dir();
        assert_eq!(result, PathBuf::from("/custom/config"));

        match original {
            Some(val) => unsafe { std::env::set_var(key, val) },
            None => unsafe { std::env::remove_var(key) },
        }
    }
}
