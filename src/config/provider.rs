//! Typed per-field providers evaluated in precedence order by the resolver.

// self
use crate::{
	_prelude::*,
	config::{ConfigField, ConfigFile, EnvironmentProvider, ExplicitFields, file::DEFAULT_SECTION},
};

/// Which provider satisfied a field. Diagnostics only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
	/// Passed programmatically.
	Explicit,
	/// Named section of a configuration file.
	FileSection(String),
	/// `DEFAULT` section of a configuration file.
	FileDefault,
	/// Environment variable.
	Environment(String),
	/// Built-in default.
	Default,
	/// Caller-supplied provider.
	Custom(String),
}
impl Display for Provenance {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Provenance::Explicit => f.write_str("explicit"),
			Provenance::FileSection(section) => write!(f, "file section [{section}]"),
			Provenance::FileDefault => write!(f, "file section [{DEFAULT_SECTION}]"),
			Provenance::Environment(var) => write!(f, "environment variable {var}"),
			Provenance::Default => f.write_str("built-in default"),
			Provenance::Custom(name) => write!(f, "provider {name}"),
		}
	}
}

/// One layer of the resolution chain.
pub trait FieldProvider
where
	Self: Send + Sync,
{
	/// Returns the raw value this layer holds for `field`, with its provenance.
	fn lookup(&self, field: ConfigField) -> Option<(String, Provenance)>;
}

impl FieldProvider for ExplicitFields {
	fn lookup(&self, field: ConfigField) -> Option<(String, Provenance)> {
		self.get(field).map(|value| (value.to_owned(), Provenance::Explicit))
	}
}

impl FieldProvider for EnvironmentProvider {
	fn lookup(&self, field: ConfigField) -> Option<(String, Provenance)> {
		let var = field.env_var()?;

		self.get(var).map(|value| (value, Provenance::Environment(var.to_owned())))
	}
}

/// Values defined directly in one named file section.
#[derive(Clone, Debug)]
pub struct FileSectionProvider {
	file: Arc<ConfigFile>,
	section: String,
}
impl FileSectionProvider {
	/// Reads `section` of `file`.
	pub fn new(file: Arc<ConfigFile>, section: impl Into<String>) -> Self {
		Self { file, section: section.into() }
	}
}
impl FieldProvider for FileSectionProvider {
	fn lookup(&self, field: ConfigField) -> Option<(String, Provenance)> {
		self.file
			.section_value(&self.section, field.key())
			.map(|value| (value.to_owned(), Provenance::FileSection(self.section.clone())))
	}
}

/// Values defined in the file's `DEFAULT` section.
#[derive(Clone, Debug)]
pub struct FileDefaultProvider(pub Arc<ConfigFile>);
impl FieldProvider for FileDefaultProvider {
	fn lookup(&self, field: ConfigField) -> Option<(String, Provenance)> {
		self.0.default_value(field.key()).map(|value| (value.to_owned(), Provenance::FileDefault))
	}
}

/// Built-in defaults; always consulted last.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinDefaults;
impl FieldProvider for BuiltinDefaults {
	fn lookup(&self, field: ConfigField) -> Option<(String, Provenance)> {
		field.default_value().map(|value| (value.to_owned(), Provenance::Default))
	}
}
