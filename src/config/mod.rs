use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    /// Defaults, then `.codeboxrc`, then `./.env`, then the process environment.
    pub fn load() -> Self {
        Self::load_from(&default_config_path(), Path::new(".env"), env::vars())
    }

    pub fn load_from(
        rc_path: &Path,
        dotenv_path: &Path,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut map = default_map();

        for file in [rc_path, dotenv_path] {
            if file.exists() {
                read_pairs_into(file, &mut map);
            }
        }

        // Environment takes precedence
        for (k, v) in vars {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path: rc_path.to_path_buf() }
    }

    /// Defaults only; nothing read from disk or the environment.
    pub fn with_defaults() -> Self {
        Self { inner: default_map(), config_path: default_config_path() }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    /// A value that must be present and non-blank.
    pub fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar { name: key })
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.trim().parse::<u64>().map(Some).map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: v.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Whole seconds; zero is rejected because every wait must be bounded.
    pub fn get_duration_secs(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        match self.get_u64(key)? {
            Some(0) => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: "0".into(),
                reason: "must be at least 1 second".into(),
            }),
            other => Ok(other.map(Duration::from_secs)),
        }
    }
}

fn read_pairs_into(path: &Path, map: &mut HashMap<String, String>) {
    let Ok(file) = fs::File::open(path) else {
        return;
    };
    let reader = BufReader::new(file);
    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().trim_matches('"').trim_matches('\'');
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "EXECUTOR_COMMAND",
        "RESPONSE_TIMEOUT",
        "MAX_OPERATIONS",
        "MAX_CALL_LEVELS",
        "MAX_STRING_SIZE",
        "MAX_ARRAY_SIZE",
        "MAX_MAP_SIZE",
        "SUPABASE_URL",
        "SUPABASE_SERVICE_ROLE_KEY",
        "SUPABASE_TABLE",
        "ANTHROPIC_API_KEY",
        "ANTHROPIC_BASE_URL",
        "DEFAULT_MODEL",
        "MAX_TOKENS",
        "REQUEST_TIMEOUT",
        "PRETTIFY_MARKDOWN",
    ];

    KEYS.contains(&k) || k.starts_with("CODEBOX_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("codebox").join(".codeboxrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Numbers
    m.insert("RESPONSE_TIMEOUT".into(), "60".into());
    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("MAX_OPERATIONS".into(), "0".into());
    m.insert("MAX_CALL_LEVELS".into(), "64".into());
    m.insert("MAX_STRING_SIZE".into(), "0".into());
    m.insert("MAX_ARRAY_SIZE".into(), "0".into());
    m.insert("MAX_MAP_SIZE".into(), "0".into());
    m.insert("MAX_TOKENS".into(), "1024".into());

    // Strings
    m.insert("SUPABASE_TABLE".into(), "sites".into());
    m.insert("ANTHROPIC_BASE_URL".into(), "https://api.anthropic.com".into());
    m.insert("DEFAULT_MODEL".into(), "claude-3-haiku-20240307".into());

    // Bools as strings
    m.insert("PRETTIFY_MARKDOWN".into(), "true".into());

    m
}
