use anyhow::Context as _;
use clap::Parser;
use serde_yaml::Value;

use super::Config;
use crate::logging;

/// Prefix of every environment override, `SEGMENTS_<SECTION>__<KEY>`.
pub const ENV_PREFIX: &str = "SEGMENTS_";

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TlsConfig {
	/// The path to the TLS certificate
	pub cert: String,

	/// The path to the TLS private key
	pub key: String,

	/// The path to the TLS CA certificate
	pub ca_cert: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
	/// The log level to use, this is a tracing env filter
	pub level: String,

	/// What logging mode we should use
	pub mode: logging::Mode,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			mode: logging::Mode::Default,
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
	/// The database URL to use
	pub uri: String,

	/// Upper bound on pooled connections
	pub max_connections: usize,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			uri: "postgres://localhost:5432/segments".to_string(),
			max_connections: 16,
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NatsConfig {
	/// The URI to use for connecting to Nats
	pub servers: Vec<String>,

	/// The username to use for authentication (user-pass auth)
	pub username: Option<String>,

	/// The password to use for authentication (user-pass auth)
	pub password: Option<String>,

	/// The token to use for authentication (token auth)
	pub token: Option<String>,

	/// The TLS configuration (can be used for mTLS)
	pub tls: Option<TlsConfig>,
}

impl Default for NatsConfig {
	fn default() -> Self {
		Self {
			servers: vec!["localhost:4222".into()],
			token: None,
			password: None,
			tls: None,
			username: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, bound(deserialize = ""))]
pub struct AppConfig<T: ConfigExtention> {
	/// The name of the application
	pub name: String,

	/// The config file that was loaded, if any
	pub config_file: Option<String>,

	/// The logging configuration
	pub logging: LoggingConfig,

	/// The database configuration
	pub database: DatabaseConfig,

	/// The NATS configuration
	pub nats: NatsConfig,

	#[serde(flatten)]
	pub extra: T,
}

pub trait ConfigExtention: serde::Serialize + serde::de::DeserializeOwned + Default {
	const APP_NAME: &'static str;

	fn config_default() -> AppConfig<Self> {
		AppConfig {
			name: Self::APP_NAME.to_owned(),
			config_file: None,
			logging: Default::default(),
			database: Default::default(),
			nats: Default::default(),
			extra: Self::default(),
		}
	}

	fn pre_hook(_config: &mut AppConfig<Self>) -> anyhow::Result<()> {
		Ok(())
	}
}

impl<T: ConfigExtention> Default for AppConfig<T> {
	fn default() -> Self {
		T::config_default()
	}
}

#[derive(Debug, Parser)]
struct ConfigArgs {
	/// The configuration file to use
	#[arg(long, short, env = "SEGMENTS_CONFIG", value_name = "FILE")]
	config: Option<String>,
}

impl<T: ConfigExtention> Config for AppConfig<T> {
	fn logging(&self) -> &LoggingConfig {
		&self.logging
	}

	fn parse() -> anyhow::Result<Self>
	where
		Self: Sized,
	{
		let args = ConfigArgs::parse();
		load_app_config(args.config.as_deref(), std::env::vars())
	}

	fn name(&self) -> &str {
		&self.name
	}

	fn pre_hook(&mut self) -> anyhow::Result<()> {
		T::pre_hook(self)
	}
}

/// Builds an [`AppConfig`] from its defaults, an optional config file and the
/// given environment. An explicitly named file must exist; otherwise
/// `config.yaml` is used when present.
pub fn load_app_config<T: ConfigExtention>(
	file: Option<&str>,
	vars: impl IntoIterator<Item = (String, String)>,
) -> anyhow::Result<AppConfig<T>> {
	let (path, required) = match file {
		Some(file) => (file, true),
		None => (DEFAULT_CONFIG_FILE, false),
	};

	let mut root = serde_yaml::to_value(AppConfig::<T>::default()).context("failed to serialize default config")?;

	let loaded = merge_file(&mut root, path, required)?;
	apply_env(&mut root, vars);

	let mut config: AppConfig<T> = serde_yaml::from_value(root).context("failed to parse config")?;
	if loaded {
		config.config_file = Some(path.to_owned());
	}

	Ok(config)
}

fn merge_file(root: &mut Value, path: &str, required: bool) -> anyhow::Result<bool> {
	let contents = match std::fs::read_to_string(path) {
		Ok(contents) => contents,
		Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {
			tracing::debug!(path, "no config file found, using defaults");
			return Ok(false);
		}
		Err(err) => return Err(err).with_context(|| format!("failed to read config file: {path}")),
	};

	let incoming: Value =
		serde_yaml::from_str(&contents).with_context(|| format!("failed to parse config file: {path}"))?;

	let current = std::mem::take(root);
	*root = merge(current, incoming);

	Ok(true)
}

/// Deep merges `incoming` into `root`. Mappings merge key by key, anything
/// else is replaced. A null in the file keeps the default.
pub fn merge(root: Value, incoming: Value) -> Value {
	match (root, incoming) {
		(Value::Mapping(mut root), Value::Mapping(incoming)) => {
			for (key, value) in incoming {
				let combined = match root.remove(&key) {
					Some(existing) => merge(existing, value),
					None => value,
				};
				root.insert(key, combined);
			}

			Value::Mapping(root)
		}
		(root, Value::Null) => root,
		(_, incoming) => incoming,
	}
}

/// Applies `SEGMENTS_<SECTION>__<KEY>=value` overrides. Values are read as
/// YAML when the key currently holds a number, bool, list or mapping, and
/// kept verbatim otherwise. Unset optional keys are always strings here.
pub fn apply_env(root: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
	for (key, raw) in vars {
		let Some(key) = key.strip_prefix(ENV_PREFIX) else {
			continue;
		};

		let path = key.split("__").map(str::to_lowercase).collect::<Vec<_>>();
		if path.iter().any(String::is_empty) || path == ["config"] {
			continue;
		}

		let Some(slot) = lookup_mut(root, &path) else {
			tracing::debug!(key, "ignoring environment override for unknown key");
			continue;
		};

		*slot = match slot {
			Value::String(_) | Value::Null => Value::String(raw),
			_ => serde_yaml::from_str(&raw).unwrap_or(Value::String(raw)),
		};
	}
}

fn lookup_mut<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
	let mut current = root;
	for key in path {
		if current.is_null() {
			let mut map = serde_yaml::Mapping::new();
			map.insert(Value::String(key.clone()), Value::Null);
			*current = Value::Mapping(map);
		}

		current = current.as_mapping_mut()?.get_mut(key.as_str())?;
	}

	Some(current)
}
