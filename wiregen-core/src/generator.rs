//! # The Generator — drives resolution for a whole run
//!
//! Runs every injector of a generation run through the pipeline and
//! collects one outcome per injector.
//!
//! # Architecture
//! ```text
//! InjectorSpec ──GraphBuilder──> DependencyGraph
//!                                     │
//!                                 Resolver
//!                                     │
//!                                     ▼
//!                               ResolvedGraph ──PlanEmitter──> ConstructionPlan
//! ```
//!
//! Injectors share one frozen [`Catalog`] and nothing else, so they are
//! resolved independently (in parallel by default). The first diagnostic
//! stage that fails stops its injector only.
//!
//! # Examples
//! ```rust
//! use wiregen_core::prelude::*;
//!
//! let set = ProviderSet::new("GreeterSet")
//!     .provider(Provider::function("app::new_message", ["String"], "app::Message"))
//!     .provider(Provider::function("app::new_greeter", ["app::Message"], "app::Greeter"))
//!     .provider(Provider::function("app::new_event", ["app::Greeter"], "app::Event").fallible());
//!
//! let generator = Generator::new(Catalog::from_set(&set).expect("valid set"));
//! let spec = InjectorSpec::new("initialize_event")
//!     .input("phrase", "String")
//!     .output("app::Event")
//!     .error_capable(true);
//!
//! let plan = generator.generate(&spec).expect("resolvable injector");
//! assert_eq!(plan.steps.len(), 3);
//! assert_eq!(plan.steps[0].args[0].var, "phrase");
//! ```

use std::sync::Arc;

use indexmap::IndexSet;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{Catalog, ProviderIndex};
use crate::emit::PlanEmitter;
use crate::error::{Diagnostic, Diagnostics, UnusedProviderError};
use crate::graph::GraphBuilder;
use crate::injector::InjectorSpec;
use crate::options::{GenerateOptions, UnusedScope};
use crate::plan::ConstructionPlan;
use crate::resolver::Resolver;

/// Pseudo-injector name for diagnostics that belong to the run.
pub const RUN_SCOPE: &str = "<run>";

/// Result of one injector.
#[derive(Debug, Clone, Serialize)]
pub struct InjectorOutcome {
    pub injector: String,
    pub result: Result<ConstructionPlan, Diagnostics>,
}

/// Everything a generation run produced.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// One outcome per injector, in input order
    pub outcomes: Vec<InjectorOutcome>,
    /// Diagnostics not tied to one injector (run-scoped unused check)
    pub run_diagnostics: Vec<Diagnostic>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.run_diagnostics.is_empty() && self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Process exit code for the run: non-zero when anything failed.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Plans of the injectors that resolved.
    pub fn plans(&self) -> impl Iterator<Item = &ConstructionPlan> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Every diagnostic, paired with the injector it belongs to.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        let per_injector = self.outcomes.iter().flat_map(|o| {
            o.result
                .as_ref()
                .err()
                .into_iter()
                .flat_map(move |d| d.iter().map(move |diag| (o.injector.as_str(), diag)))
        });
        let per_run = self.run_diagnostics.iter().map(|d| (RUN_SCOPE, d));
        per_injector.chain(per_run)
    }
}

/// Internal result of one injector: its outcome and, if the graph was
/// built, the providers it used.
type Resolution = (Result<ConstructionPlan, Diagnostics>, Option<IndexSet<ProviderIndex>>);

/// Resolves injectors against a shared, frozen catalog.
#[derive(Debug, Clone)]
pub struct Generator {
    catalog: Arc<Catalog>,
    options: GenerateOptions,
}

impl Generator {
    pub fn new(catalog: impl Into<Arc<Catalog>>) -> Self {
        Self {
            catalog: catalog.into(),
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Resolves a single injector.
    ///
    /// A single injector is its own run, so the unused-provider check
    /// applies unless it is switched off.
    ///
    /// # Errors
    /// The diagnostics of the first failing stage.
    pub fn generate(&self, spec: &InjectorSpec) -> Result<ConstructionPlan, Diagnostics> {
        let check_unused = self.options.unused_scope != UnusedScope::Off;
        self.resolve_one(spec, check_unused).0
    }

    /// Resolves every injector of a run and reports all outcomes.
    #[instrument(skip_all, name = "generate_all", fields(injectors = specs.len()))]
    pub fn generate_all(&self, specs: &[InjectorSpec]) -> GenerationReport {
        info!(
            injectors = specs.len(),
            providers = self.catalog.len(),
            parallel = self.options.parallel,
            "Generation run started"
        );

        let check_unused = self.options.unused_scope == UnusedScope::Injector;
        let resolutions: Vec<Resolution> = if self.options.parallel {
            specs
                .par_iter()
                .map(|spec| self.resolve_one(spec, check_unused))
                .collect()
        } else {
            specs
                .iter()
                .map(|spec| self.resolve_one(spec, check_unused))
                .collect()
        };

        let run_diagnostics = match self.options.unused_scope {
            UnusedScope::Run => self.unused_across_run(&resolutions),
            UnusedScope::Injector | UnusedScope::Off => Vec::new(),
        };

        let outcomes: Vec<InjectorOutcome> = specs
            .iter()
            .zip(resolutions)
            .map(|(spec, (result, _))| InjectorOutcome {
                injector: spec.name().to_string(),
                result,
            })
            .collect();

        let report = GenerationReport {
            outcomes,
            run_diagnostics,
        };
        info!(
            plans = report.plans().count(),
            diagnostics = report.diagnostics().count(),
            "Generation run finished"
        );
        report
    }

    #[instrument(skip_all, name = "injector", fields(injector = spec.name()))]
    fn resolve_one(&self, spec: &InjectorSpec, check_unused: bool) -> Resolution {
        let graph = match GraphBuilder::new(&self.catalog, spec).build() {
            Ok(graph) => graph,
            Err(diagnostic) => return (Err(diagnostic.into()), None),
        };
        let used = graph.used_providers().clone();

        let resolved = match Resolver::new(&self.catalog, spec)
            .check_unused(check_unused)
            .resolve(graph)
        {
            Ok(resolved) => resolved,
            Err(diagnostics) => return (Err(diagnostics), Some(used)),
        };

        let plan = PlanEmitter::new(&self.catalog)
            .reserved_names(&self.options.reserved_names)
            .emit(spec, &resolved)
            .map_err(Diagnostics::from);

        if plan.is_ok() {
            debug!("Injector resolved");
        }
        (plan, Some(used))
    }

    /// Providers no injector of the run reached.
    fn unused_across_run(&self, resolutions: &[Resolution]) -> Vec<Diagnostic> {
        let mut used: IndexSet<ProviderIndex> = IndexSet::new();
        for (_, providers) in resolutions {
            match providers {
                Some(providers) => used.extend(providers.iter().copied()),
                None => {
                    debug!("Skipping run-wide unused check: an injector graph failed to build");
                    return Vec::new();
                }
            }
        }

        self.catalog
            .providers()
            .filter(|(index, _)| !used.contains(index))
            .map(|(_, provider)| {
                warn!(provider = provider.id(), "Provider unused by every injector");
                Diagnostic::UnusedProvider(UnusedProviderError {
                    provider: provider.id().to_string(),
                })
            })
            .collect()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{GenerationReport, Generator, InjectorOutcome};
    pub use crate::catalog::{Catalog, CatalogBuilder};
    pub use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
    pub use crate::injector::InjectorSpec;
    pub use crate::key::TypeKey;
    pub use crate::options::{GenerateOptions, UnusedScope};
    pub use crate::plan::{ConstructionPlan, Step, StepAction};
    pub use crate::provider::{Provider, ProviderSet};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
