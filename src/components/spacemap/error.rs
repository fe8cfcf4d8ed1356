//! Error taxonomy for layout rebuilds and collaborators.

/// Raised by an accessor when a datum does not have the shape a constraint needs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccessorError {
	/// A path segment did not resolve.
	#[error("missing field `{0}`")]
	MissingField(String),
	/// The value exists but has the wrong JSON type.
	#[error("expected {expected}, found {found}")]
	Expected {
		/// What the constraint needs, e.g. `"a number"`.
		expected: &'static str,
		/// Short description of the offending value.
		found: String,
	},
	/// Reported by a closure accessor.
	#[error("{0}")]
	Custom(String),
}

/// Everything that can reject a configuration or degrade a collaborator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// `type` is not one of the known constraint kinds.
	#[error("unknown constraint type `{0}`")]
	UnknownConstraintType(String),
	/// A declaration without an accessor.
	#[error("constraint {index} has no accessor")]
	MissingAccessor {
		/// Position of the declaration.
		index: usize,
	},
	/// Two declarations share a `name`.
	#[error("constraint name `{0}` is declared more than once")]
	DuplicateConstraint(String),
	/// A map layer name was registered twice.
	#[error("a layer named `{0}` already exists")]
	DuplicateLayer(String),
	/// Strength outside [0, 1], or NaN.
	#[error("constraint {constraint} has strength {strength}, expected a value in [0, 1]")]
	InvalidStrength {
		/// Position of the declaration.
		constraint: usize,
		/// The rejected value.
		strength: f64,
	},
	/// An accessor failed or returned the wrong shape.
	#[error("accessor of constraint {constraint} failed on datum {datum}: {source}")]
	Accessor {
		/// Position of the declaration.
		constraint: usize,
		/// Index of the datum in `data`.
		datum: usize,
		/// Underlying failure.
		#[source]
		source: AccessorError,
	},
	/// The label accessor failed.
	#[error("label accessor failed on datum {datum}: {source}")]
	Label {
		/// Index of the datum in `data`.
		datum: usize,
		/// Underlying failure.
		#[source]
		source: AccessorError,
	},
	/// A rendering, physics or projection collaborator is missing.
	#[error("{0} is unavailable")]
	EngineUnavailable(&'static str),
	/// Malformed JSON configuration.
	#[error("invalid configuration: {0}")]
	Parse(#[from] serde_json::Error),
}

/// Result alias for spacemap operations.
pub type Result<T> = std::result::Result<T, Error>;
