//! Per-application configuration
//!
//! An optional YAML file at `$XDG_CONFIG_HOME/<app>/config.yaml` (or
//! `~/.config/...`, or the `.yml` spelling) supplies `base_url` and
//! `headers`. `<APP>_BASE_URL` in the environment always wins over the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Loaded configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct Config {
    pub base_url: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Resolve one value: environment variable, then a config header key, then `default`.
    pub fn resolve(&self, env_var: Option<&str>, config_key: Option<&str>, default: Option<&str>) -> Option<String> {
        self.resolve_with(env_var, config_key, default, env_lookup)
    }

    /// [`Config::resolve`] with an injected environment lookup.
    pub fn resolve_with(
        &self,
        env_var: Option<&str>,
        config_key: Option<&str>,
        default: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        if let Some(value) = env_var.filter(|v| !v.is_empty()).and_then(&env) {
            return Some(value);
        }
        if let Some(value) = config_key
            .filter(|k| !k.is_empty())
            .and_then(|k| self.headers.get(k))
        {
            return Some(value.clone());
        }
        default.map(str::to_string)
    }
}

/// Load the configuration for `app` from the standard location and environment.
pub fn load_config(app: &str) -> Config {
    let config_home = env_lookup("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")));
    load_config_with(config_home.as_deref(), app, env_lookup)
}

/// [`load_config`] with an explicit config directory and environment lookup.
pub fn load_config_with(config_home: Option<&Path>, app: &str, env: impl Fn(&str) -> Option<String>) -> Config {
    let mut config = config_home
        .and_then(|home| config_path(home, app))
        .and_then(|path| read_config_file(&path))
        .unwrap_or_default();

    let var = format!("{}BASE_URL", env_prefix(app));
    if let Some(base_url) = env(&var) {
        tracing::debug!(var = %var, "base URL taken from environment");
        config.base_url = Some(base_url);
    }

    config
}

/// `config.yaml` or `config.yml` under `<config_home>/<app>`, whichever exists first.
pub fn config_path(config_home: &Path, app: &str) -> Option<PathBuf> {
    let dir = config_home.join(app);
    ["config.yaml", "config.yml"]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Environment prefix for an app name: `my-api` → `MY_API_`.
pub fn env_prefix(app: &str) -> String {
    format!("{}_", app.to_uppercase().replace('-', "_"))
}

fn read_config_file(path: &Path) -> Option<Config> {
    if has_insecure_permissions(path) {
        tracing::warn!(
            path = %path.display(),
            "config file is readable by group or others; consider running: chmod 600 {}",
            path.display()
        );
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "config file unreadable, ignoring");
            return None;
        }
    };

    match serde_yaml::from_str::<Option<Config>>(&content) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Some(config.unwrap_or_default())
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            None
        }
    }
}

#[cfg(unix)]
fn has_insecure_permissions(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o044 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn has_insecure_permissions(_path: &Path) -> bool {
    false
}

/// Environment lookup where an empty value counts as unset.
fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(home: &Path, app: &str, file: &str, content: &str) -> PathBuf {
        let dir = home.join(app);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        std::fs::write(&path, content).unwrap();
        path
    }

    // -- load_config_with --

    #[test]
    fn load_config_missing_file_is_empty() {
        let home = tempfile::tempdir().unwrap();
        let config = load_config_with(Some(home.path()), "petstore", no_env);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_config_without_home_is_empty() {
        assert_eq!(load_config_with(None, "petstore", no_env), Config::default());
    }

    #[test]
    fn load_config_reads_yaml_file() {
        let home = tempfile::tempdir().unwrap();
        write_config(
            home.path(),
            "petstore",
            "config.yaml",
            "base_url: https://api.example.com\nheaders:\n  Authorization: Bearer token\n",
        );

        let config = load_config_with(Some(home.path()), "petstore", no_env);
        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.headers["Authorization"], "Bearer token");
    }

    #[test]
    fn load_config_falls_back_to_yml() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "petstore", "config.yml", "base_url: http://yml\n");

        let config = load_config_with(Some(home.path()), "petstore", no_env);
        assert_eq!(config.base_url.as_deref(), Some("http://yml"));
    }

    #[test]
    fn load_config_prefers_yaml_over_yml() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "petstore", "config.yaml", "base_url: http://yaml\n");
        write_config(home.path(), "petstore", "config.yml", "base_url: http://yml\n");

        let config = load_config_with(Some(home.path()), "petstore", no_env);
        assert_eq!(config.base_url.as_deref(), Some("http://yaml"));
    }

    #[test]
    fn load_config_env_overrides_file() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "my-api", "config.yaml", "base_url: http://file\n");

        let env = |name: &str| (name == "MY_API_BASE_URL").then(|| "http://env".to_string());
        let config = load_config_with(Some(home.path()), "my-api", env);
        assert_eq!(config.base_url.as_deref(), Some("http://env"));
    }

    #[test]
    fn load_config_invalid_yaml_is_swallowed() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "petstore", "config.yaml", "base_url: [unclosed\n");

        let config = load_config_with(Some(home.path()), "petstore", no_env);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_config_empty_file_is_default() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "petstore", "config.yaml", "");

        let config = load_config_with(Some(home.path()), "petstore", no_env);
        assert_eq!(config, Config::default());
    }

    #[cfg(unix)]
    #[test]
    fn load_config_insecure_permissions_still_loads() {
        use std::os::unix::fs::PermissionsExt;

        let home = tempfile::tempdir().unwrap();
        let path = write_config(home.path(), "petstore", "config.yaml", "base_url: http://open\n");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(has_insecure_permissions(&path));

        let config = load_config_with(Some(home.path()), "petstore", no_env);
        assert_eq!(config.base_url.as_deref(), Some("http://open"));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert!(!has_insecure_permissions(&path));
    }

    // -- env_prefix --

    #[test]
    fn env_prefix_uppercases_and_replaces_hyphens() {
        assert_eq!(env_prefix("petstore"), "PETSTORE_");
        assert_eq!(env_prefix("my-api"), "MY_API_");
    }

    // -- resolve --

    #[test]
    fn resolve_prefers_env_then_config_then_default() {
        let config = Config::new().with_header("org_id", "from-config");
        let env = |name: &str| (name == "ORG_ID").then(|| "from-env".to_string());

        assert_eq!(
            config.resolve_with(Some("ORG_ID"), Some("org_id"), Some("dflt"), env).as_deref(),
            Some("from-env")
        );
        assert_eq!(
            config.resolve_with(Some("OTHER"), Some("org_id"), Some("dflt"), env).as_deref(),
            Some("from-config")
        );
        assert_eq!(
            config.resolve_with(Some("OTHER"), Some("missing"), Some("dflt"), env).as_deref(),
            Some("dflt")
        );
        assert_eq!(config.resolve_with(None, None, None, env), None);
    }

    #[test]
    fn resolve_ignores_empty_names() {
        let config = Config::new().with_header("", "x");
        let env = |_: &str| Some("any".to_string());
        assert_eq!(config.resolve_with(Some(""), Some(""), None, env), None);
    }
}
