//! Environment variable lookup, injectable so resolution never has to mutate process state.

// self
use crate::_prelude::*;

/// Source of environment variables.
#[derive(Clone, Debug, Default)]
pub enum EnvironmentProvider {
	/// Reads the current process environment on every lookup.
	#[default]
	Process,
	/// Fixed set of variables.
	Fixed(Arc<HashMap<String, String>>),
}
impl EnvironmentProvider {
	/// Reads the process environment.
	pub fn process() -> Self {
		Self::Process
	}

	/// Uses the provided variables instead of the process environment.
	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self::Fixed(Arc::new(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()))
	}

	/// Environment with no variables set.
	pub fn empty() -> Self {
		Self::Fixed(Default::default())
	}

	/// Returns the variable's value. Unset and non-UTF-8 variables yield `None`.
	pub fn get(&self, name: &str) -> Option<String> {
		match self {
			Self::Process => std::env::var(name).ok(),
			Self::Fixed(vars) => vars.get(name).cloned(),
		}
	}
}
