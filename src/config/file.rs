//! INI/CFG configuration files with `DEFAULT` section inheritance.

// std
use std::{
	ffi::OsStr,
	path::{Path, PathBuf},
};
// crates.io
use ini::{Ini, ParseOption};
// self
use crate::{_prelude::*, error::ConfigError};

/// Name of the section every other section inherits from.
pub const DEFAULT_SECTION: &str = "DEFAULT";

const SUPPORTED_EXTENSIONS: [&str; 2] = ["ini", "cfg"];

type Section = HashMap<String, String>;

/// Parsed configuration file. Keys are lower-cased; section names keep their case.
#[derive(Clone, Debug)]
pub struct ConfigFile {
	path: PathBuf,
	defaults: Section,
	sections: HashMap<String, Section>,
}
impl ConfigFile {
	/// Loads `path`.
	///
	/// The extension is validated before any IO. A missing file and an unparsable file are
	/// reported as distinct errors.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref().to_path_buf();

		ensure_supported_extension(&path)?;

		if !path.exists() {
			return Err(ConfigError::FileNotFound { path });
		}

		let content = std::fs::read_to_string(&path)
			.map_err(|source| ConfigError::Read { path: path.clone(), source })?;

		Self::parse(path, &content)
	}

	/// Parses INI `content` as if it had been read from `path`.
	pub fn parse(path: PathBuf, content: &str) -> Result<Self, ConfigError> {
		let options =
			ParseOption { enabled_quote: false, enabled_escape: false, ..Default::default() };
		let ini = Ini::load_from_str_opt(content, options)
			.map_err(|err| ConfigError::Parse { path: path.clone(), message: err.to_string() })?;
		let mut defaults = Section::new();
		let mut sections = HashMap::<String, Section>::new();

		for (name, properties) in ini.iter() {
			let target = match name {
				// Keys above the first header behave like DEFAULT keys.
				None => &mut defaults,
				Some(DEFAULT_SECTION) => &mut defaults,
				Some(name) => sections.entry(name.to_owned()).or_default(),
			};

			for (key, value) in properties.iter() {
				target.insert(key.to_ascii_lowercase(), value.to_owned());
			}
		}

		Ok(Self { path, defaults, sections })
	}

	/// Path the file was loaded from.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Value defined directly in `section` (inheritance not applied).
	pub fn section_value(&self, section: &str, key: &str) -> Option<&str> {
		self.sections.get(section)?.get(key).map(String::as_str)
	}

	/// Value defined in the `DEFAULT` section.
	pub fn default_value(&self, key: &str) -> Option<&str> {
		self.defaults.get(key).map(String::as_str)
	}

	/// Value visible from `section`: its own definition, else the `DEFAULT` one.
	pub fn get(&self, section: Option<&str>, key: &str) -> Option<&str> {
		section
			.filter(|name| *name != DEFAULT_SECTION)
			.and_then(|name| self.section_value(name, key))
			.or_else(|| self.default_value(key))
	}

	/// Returns `true` when the file defines `section`. `DEFAULT` always exists.
	pub fn has_section(&self, section: &str) -> bool {
		section == DEFAULT_SECTION || self.sections.contains_key(section)
	}

	/// Names of the non-default sections.
	pub fn section_names(&self) -> impl Iterator<Item = &str> {
		self.sections.keys().map(String::as_str)
	}
}

fn ensure_supported_extension(path: &Path) -> Result<(), ConfigError> {
	let extension = path.extension().and_then(OsStr::to_str).unwrap_or_default();

	if SUPPORTED_EXTENSIONS.iter().any(|supported| supported.eq_ignore_ascii_case(extension)) {
		return Ok(());
	}

	let extension = if extension.is_empty() { String::new() } else { format!(".{extension}") };

	Err(ConfigError::UnsupportedExtension { path: path.to_path_buf(), extension })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const SAMPLE: &str = "\
[DEFAULT]
tenant_id = tenant-default
Client_ID = client-default

[DEV]
workspace_id = dev-workspace
tenant_id = tenant-dev
";

	fn sample() -> ConfigFile {
		ConfigFile::parse(PathBuf::from("sample.ini"), SAMPLE).expect("Sample should parse.")
	}

	#[test]
	fn sections_inherit_defaults() {
		let file = sample();

		assert_eq!(file.get(Some("DEV"), "workspace_id"), Some("dev-workspace"));
		assert_eq!(file.get(Some("DEV"), "tenant_id"), Some("tenant-dev"));
		assert_eq!(file.get(Some("DEV"), "client_id"), Some("client-default"));
		assert_eq!(file.get(None, "tenant_id"), Some("tenant-default"));
		assert_eq!(file.get(None, "workspace_id"), None);
	}

	#[test]
	fn unknown_section_falls_back_to_defaults() {
		let file = sample();

		assert!(!file.has_section("PROD"));
		assert!(file.has_section(DEFAULT_SECTION));
		assert_eq!(file.get(Some("PROD"), "tenant_id"), Some("tenant-default"));
	}

	#[test]
	fn values_are_kept_verbatim() {
		let file = ConfigFile::parse(
			PathBuf::from("secret.cfg"),
			"[DEFAULT]\nclient_secret = K1i8Q~a\\b\"c\n",
		)
		.expect("Secret should parse.");

		assert_eq!(file.default_value("client_secret"), Some("K1i8Q~a\\b\"c"));
	}

	#[test]
	fn unsupported_extension_rejected_before_io() {
		let err = ConfigFile::load("/definitely/missing/config.yaml")
			.expect_err("YAML files are not supported.");

		assert!(matches!(
			err,
			ConfigError::UnsupportedExtension { ref extension, .. } if extension == ".yaml"
		));
		assert!(matches!(
			ConfigFile::load("/definitely/missing/config"),
			Err(ConfigError::UnsupportedExtension { .. })
		));
	}

	#[test]
	fn missing_file_is_distinct_from_parse_failure() {
		assert!(matches!(
			ConfigFile::load("/definitely/missing/config.INI"),
			Err(ConfigError::FileNotFound { .. })
		));
	}
}
