//! Generation settings.
//!
//! [`GenerateOptions`] can be built in code or deserialized from any
//! serde format; missing fields take their defaults.

use serde::{Deserialize, Serialize};

/// Where the unused-provider check applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnusedScope {
    /// Every injector must use every catalog provider.
    #[default]
    Injector,
    /// A provider must be used by at least one injector of the run.
    Run,
    /// Unused providers are not reported.
    Off,
}

/// Settings for one generation run.
///
/// # Examples
/// ```
/// use wiregen_core::options::{GenerateOptions, UnusedScope};
///
/// let options = GenerateOptions::default()
///     .allow_override(true)
///     .unused_scope(UnusedScope::Run);
/// assert!(options.allow_override);
/// assert!(options.parallel);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Let later providers replace earlier providers of the same type
    pub allow_override: bool,
    pub unused_scope: UnusedScope,
    /// Names the plan emitter must never hand out (keywords, imports, ...)
    pub reserved_names: Vec<String>,
    /// Resolve independent injectors on the rayon pool
    pub parallel: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            allow_override: false,
            unused_scope: UnusedScope::Injector,
            reserved_names: Vec::new(),
            parallel: true,
        }
    }
}

impl GenerateOptions {
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    pub fn unused_scope(mut self, scope: UnusedScope) -> Self {
        self.unused_scope = scope;
        self
    }

    pub fn reserve(mut self, name: impl Into<String>) -> Self {
        self.reserved_names.push(name.into());
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
