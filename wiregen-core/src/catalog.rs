//! Provider catalog — maps every provided type to its provider.
//!
//! The catalog is populated through a [`CatalogBuilder`] and becomes
//! immutable once [`CatalogBuilder::build`] returns. A frozen catalog can
//! be shared between threads and resolved against by many injectors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, trace};
use wiregen_support::rendering::suggest_similar;

use crate::error::{Diagnostic, DuplicateProviderError, Result};
use crate::key::TypeKey;
use crate::options::GenerateOptions;
use crate::provider::{Provider, ProviderSet};

/// Position of a provider in its catalog's registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderIndex(usize);

impl ProviderIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Entry {
    provider: Arc<Provider>,
    /// Every output was taken over by a later override.
    shadowed: bool,
}

/// Builds a [`Catalog`].
///
/// # Examples
/// ```
/// use wiregen_core::catalog::Catalog;
/// use wiregen_core::provider::Provider;
///
/// let mut builder = Catalog::builder();
/// builder.register(Provider::function("app::new_message", Vec::<&str>::new(), "app::Message")).unwrap();
/// builder.register(Provider::function("app::new_greeter", ["app::Message"], "app::Greeter")).unwrap();
/// let catalog = builder.build();
///
/// assert_eq!(catalog.len(), 2);
/// assert!(catalog.lookup(&"app::Greeter".into()).is_some());
/// ```
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: Vec<Entry>,
    by_type: HashMap<TypeKey, usize>,
    allow_override: bool,
}

impl CatalogBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Let every registration replace earlier providers of its types.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    /// Registers a provider for each of its output types.
    ///
    /// Registering a provider identical to an earlier one is a no-op while
    /// that earlier registration still provides all of its types. If an
    /// override has taken some of them since, an overriding registration
    /// reclaims them.
    ///
    /// # Errors
    /// Returns [`Diagnostic::DuplicateProvider`] if an output type already
    /// has a provider and neither the provider nor the builder allows
    /// overriding it.
    pub fn register(&mut self, provider: impl Into<Arc<Provider>>) -> Result<()> {
        let provider = provider.into();

        let overriding = provider.is_override() || self.allow_override;
        let existing = self.entries.iter().position(|e| e.provider == provider);
        if let Some(existing) = existing {
            if !overriding || self.claims_all(existing) {
                trace!(provider = provider.id(), "Skipping identical provider");
                return Ok(());
            }
        }

        if !overriding {
            for ty in provider.outputs() {
                if let Some(&existing) = self.by_type.get(ty) {
                    return Err(Diagnostic::DuplicateProvider(DuplicateProviderError {
                        ty: ty.clone(),
                        existing: self.entries[existing].provider.id().to_string(),
                        duplicate: provider.id().to_string(),
                    }));
                }
            }
        }

        let index = existing.unwrap_or(self.entries.len());
        let mut replaced = Vec::new();
        for ty in provider.outputs() {
            match self.by_type.insert(ty.clone(), index) {
                Some(previous) if previous != index => {
                    debug!(
                        ty = %ty,
                        previous = self.entries[previous].provider.id(),
                        provider = provider.id(),
                        "Provider overridden"
                    );
                    replaced.push(previous);
                }
                _ => {}
            }
        }

        for previous in replaced {
            let still_claims = self.entries[previous]
                .provider
                .outputs()
                .iter()
                .any(|ty| self.by_type.get(ty) == Some(&previous));
            if !still_claims {
                self.entries[previous].shadowed = true;
            }
        }

        debug!(provider = provider.id(), outputs = provider.outputs().len(), "Registered provider");
        match existing {
            Some(existing) => self.entries[existing].shadowed = false,
            None => self.entries.push(Entry {
                provider,
                shadowed: false,
            }),
        }
        Ok(())
    }

    /// Whether the entry at `index` is still the provider of every type it outputs.
    fn claims_all(&self, index: usize) -> bool {
        self.entries[index]
            .provider
            .outputs()
            .iter()
            .all(|ty| self.by_type.get(ty) == Some(&index))
    }

    /// Flattens `set` and registers every provider in it.
    ///
    /// # Errors
    /// Any error of [`ProviderSet::flatten`] or [`CatalogBuilder::register`].
    pub fn add_set(&mut self, set: &ProviderSet) -> Result<()> {
        for provider in set.flatten_with(self.allow_override)? {
            self.register(provider)?;
        }
        Ok(())
    }

    /// Freezes the catalog.
    pub fn build(self) -> Catalog {
        info!(
            providers = self.entries.len(),
            types = self.by_type.len(),
            "Catalog frozen"
        );
        Catalog {
            entries: self.entries,
            by_type: self.by_type,
            type_names: OnceCell::new(),
        }
    }
}

/// Immutable registry of providers for one generation run.
pub struct Catalog {
    entries: Vec<Entry>,
    by_type: HashMap<TypeKey, usize>,
    type_names: OnceCell<Vec<String>>,
}

impl Catalog {
    /// Create a new builder.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Create a builder configured from run options.
    pub fn configured(options: &GenerateOptions) -> CatalogBuilder {
        CatalogBuilder::new().allow_override(options.allow_override)
    }

    /// Builds a catalog holding exactly the providers of `set`.
    ///
    /// # Errors
    /// See [`CatalogBuilder::add_set`].
    pub fn from_set(set: &ProviderSet) -> Result<Self> {
        let mut builder = Self::builder();
        builder.add_set(set)?;
        Ok(builder.build())
    }

    /// Looks up the provider of `ty`.
    pub fn lookup(&self, ty: &TypeKey) -> Option<(ProviderIndex, &Provider)> {
        self.by_type
            .get(ty)
            .map(|&index| (ProviderIndex(index), self.entries[index].provider.as_ref()))
    }

    /// Returns the provider at `index`.
    ///
    /// Indices come from [`Catalog::lookup`] or [`Catalog::providers`] of
    /// this same catalog; they cannot be built any other way.
    ///
    /// # Panics
    /// If `index` belongs to a larger catalog. Use [`Catalog::get`] when
    /// the index may come from elsewhere.
    pub fn provider(&self, index: ProviderIndex) -> &Provider {
        &self.entries[index.0].provider
    }

    /// Returns the provider at `index`, or `None` if `index` is out of range.
    pub fn get(&self, index: ProviderIndex) -> Option<&Provider> {
        self.entries.get(index.0).map(|entry| entry.provider.as_ref())
    }

    /// Active providers in registration order. Providers fully replaced
    /// by overrides are left out.
    pub fn providers(&self) -> impl Iterator<Item = (ProviderIndex, &Provider)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.shadowed)
            .map(|(index, entry)| (ProviderIndex(index), entry.provider.as_ref()))
    }

    /// Returns the number of active providers.
    pub fn len(&self) -> usize {
        self.providers().count()
    }

    /// Returns true if no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted names of every provided type, computed on first use.
    pub fn type_names(&self) -> &[String] {
        self.type_names.get_or_init(|| {
            let mut names: Vec<String> = self.by_type.keys().map(|k| k.name().to_string()).collect();
            names.sort();
            names
        })
    }

    /// Provided types with names close to `ty` (for "did you mean?").
    pub fn suggestions_for(&self, ty: &TypeKey, max: usize) -> Vec<String> {
        let names: Vec<&str> = self.type_names().iter().map(String::as_str).collect();
        suggest_similar(ty.name(), &names, max)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("providers", &self.len())
            .field("types", &self.by_type.len())
            .finish()
    }
}
