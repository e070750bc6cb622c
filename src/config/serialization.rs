//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Render the configuration as a commented TOML file
    pub fn to_toml(&self) -> String {
        format!(
            r#"# inertia-demo configuration
# Precedence: environment variables > this file > defaults

# Address to listen on (env: INERTIA_BIND)
bind_addr = {bind_addr}

# HTML layout with {{{{ inertia_head }}}} and {{{{ inertia_body }}}} placeholders
# (env: INERTIA_TEMPLATE). The built-in layout is used when unset.
{template_path}

# Asset version (env: INERTIA_VERSION). When unset, the version is derived
# from manifest_path, or left empty.
{version}
{manifest_path}

# id of the root container element
root_view_id = {root_view_id}

# Server-side rendering (env: INERTIA_SSR_URL enables it)
[ssr]
enabled = {ssr_enabled}
url = {ssr_url}
timeout_secs = {ssr_timeout_secs}

[logging]
level = {log_level}
# JSON file logging in addition to stdout
file_enabled = {log_file_enabled}
file_dir = {log_file_dir}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix}
"#,
            bind_addr = toml_string(&self.bind_addr.to_string()),
            template_path = optional_path("template_path", self.template_path.as_deref()),
            version = optional_value("version", self.version.as_deref()),
            manifest_path = optional_path("manifest_path", self.manifest_path.as_deref()),
            root_view_id = toml_string(&self.root_view_id),
            ssr_enabled = self.ssr.enabled,
            ssr_url = toml_string(&self.ssr.url),
            ssr_timeout_secs = self.ssr.timeout_secs,
            log_level = toml_string(&self.logging.level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = toml_string(&self.logging.file_dir.to_string_lossy()),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = toml_string(&self.logging.file_prefix),
        )
    }
}

/// `key = "value"`, or a commented-out example when unset
fn optional_value(key: &str, value: Option<&str>) -> String {
    match value {
        Some(v) => format!("{} = {}", key, toml_string(v)),
        None => format!("# {} = \"\"", key),
    }
}

/// A TOML string literal, escaped so any value reads back unchanged
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn optional_path(key: &str, path: Option<&std::path::Path>) -> String {
    optional_value(key, path.map(|p| p.to_string_lossy()).as_deref())
}
