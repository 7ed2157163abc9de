//! Registry trait for self-registering implementations.
//!
//! Each leg implementation exposes a name and a factory through this trait so
//! services can be assembled from configuration without hard-coding concrete
//! types at the call sites.

/// Trait implemented by every pluggable implementation's registry entry.
pub trait ImplementationRegistry {
	/// The name under which this implementation is selected in configuration.
	const NAME: &'static str;

	/// The factory function type produced by this registry.
	type Factory;

	/// Returns the factory for constructing this implementation.
	fn factory() -> Self::Factory;
}
