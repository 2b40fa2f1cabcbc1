use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "vitals_ledger";
const DATA_FILE: &str = "readings.json";
const CONFIG_FILE: &str = "config.toml";
const LOG_FILE: &str = "vitals-ledger.log";

pub fn resolve_data_path(cli_path: Option<PathBuf>) -> PathBuf {
	resolve_file(cli_path, "VITALS_DATA", DATA_FILE)
}

pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
	resolve_file(cli_path, "VITALS_CONFIG", CONFIG_FILE)
}

pub fn default_log_path() -> PathBuf {
	state_dir(env_path).join(LOG_FILE)
}

/// Flag, then environment variable, then `file_name` inside the state directory.
fn resolve_file(cli_path: Option<PathBuf>, env_name: &str, file_name: &str) -> PathBuf {
	match cli_path.or_else(|| env_path(env_name)) {
		Some(path) => absolutize(&path),
		None => state_dir(env_path).join(file_name),
	}
}

fn env_path(name: &str) -> Option<PathBuf> {
	env::var_os(name)
		.filter(|value| !value.is_empty())
		.map(PathBuf::from)
}

/// First match wins. `VITALS_STATE_DIR` is used as-is; platform bases get `APP_DIR` appended.
fn state_dir(lookup: impl Fn(&str) -> Option<PathBuf>) -> PathBuf {
	if let Some(path) = lookup("VITALS_STATE_DIR") {
		return path;
	}

	let platform_base = if cfg!(target_os = "windows") {
		lookup("LOCALAPPDATA")
	} else {
		None
	};
	platform_base
		.or_else(|| lookup("XDG_STATE_HOME"))
		.or_else(|| lookup("HOME").map(|home| home.join(".local").join("state")))
		.map(|base| base.join(APP_DIR))
		.unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR}")))
}

fn absolutize(path: &Path) -> PathBuf {
	let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
	fs::canonicalize(&absolute).unwrap_or(absolute)
}
