//! Config files and the clone location under `~/.backport/`.

use super::ConfigFile;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name for backport state within the home directory.
const BACKPORT_DIR: &str = ".backport";

/// Filename for the global config.
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Filename for a project config, looked up from the working directory upwards.
pub const PROJECT_CONFIG_FILE: &str = ".backportrc.toml";

/// Directory holding one clone per repository.
const REPOSITORIES_DIR: &str = "repositories";

fn backport_dir(home: &Path) -> PathBuf {
    home.join(BACKPORT_DIR)
}

/// Get path to the global config file.
pub fn global_config_path(home: &Path) -> PathBuf {
    backport_dir(home).join(GLOBAL_CONFIG_FILE)
}

/// Get path of the local clone for a repository.
pub fn repo_path(home: &Path, owner: &str, repo: &str) -> PathBuf {
    backport_dir(home)
        .join(REPOSITORIES_DIR)
        .join(owner)
        .join(repo)
}

/// Find the nearest project config, starting at `start` and walking up.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Load a config file from disk.
///
/// Returns an empty `ConfigFile` if the file doesn't exist.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}

const GLOBAL_CONFIG_TEMPLATE: &str = r#"# backport global configuration
# Values here apply to every repository and are overridden by
# .backportrc.toml and command-line flags.

# access_token = "ghp_..."
# username = "your-github-login"
# fork = true
"#;

/// Write a commented template for the global config if none exists.
///
/// Creates `~/.backport/` if needed. Returns the config path.
pub fn ensure_global_config(home: &Path) -> Result<PathBuf> {
    let dir = backport_dir(home);
    let path = dir.join(GLOBAL_CONFIG_FILE);
    if path.exists() {
        return Ok(path);
    }

    if !dir.exists() {
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Config(format!("failed to create {}: {e}", dir.display())))?;
    }

    fs::write(&path, GLOBAL_CONFIG_TEMPLATE)
        .map_err(|e| Error::Config(format!("failed to write {}: {e}", path.display())))?;

    Ok(path)
}
