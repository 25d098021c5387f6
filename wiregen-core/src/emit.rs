//! Plan emission.
//!
//! Turns a resolved graph into a [`ConstructionPlan`]: binds injector
//! arguments as parameters, lays out one step per construction site in
//! graph order, names every variable and attaches the error checks and
//! cleanup registrations planned by [`propagation`](crate::propagation).

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, trace, warn};
use wiregen_support::naming::Namer;

use crate::catalog::{Catalog, ProviderIndex};
use crate::error::Result;
use crate::graph::NodeSource;
use crate::injector::InjectorSpec;
use crate::key::TypeKey;
use crate::plan::{Binding, ConstructionPlan, ErrorCheck, Output, Param, Step, StepAction};
use crate::propagation::plan_propagation;
use crate::provider::{Provider, ProviderKind};
use crate::resolver::ResolvedGraph;

/// Base name for release-action variables.
const CLEANUP_VAR: &str = "cleanup";

/// One place where a provider is invoked.
#[derive(Debug)]
struct Site<'c> {
    index: ProviderIndex,
    provider: &'c Provider,
    /// For field accessors, the single output this site reads.
    field: Option<(String, TypeKey)>,
}

/// Emits construction plans against one catalog.
pub struct PlanEmitter<'a> {
    catalog: &'a Catalog,
    reserved: &'a [String],
}

impl<'a> PlanEmitter<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog, reserved: &[] }
    }

    /// Names the emitter must not hand out.
    pub fn reserved_names(mut self, reserved: &'a [String]) -> Self {
        self.reserved = reserved;
        self
    }

    /// Builds the plan for `spec` from its resolved graph.
    ///
    /// # Errors
    /// [`Diagnostic::InjectorCannotFail`](crate::error::Diagnostic::InjectorCannotFail)
    /// when a reachable provider can fail and `spec` cannot.
    #[instrument(skip_all, name = "emit", fields(injector = spec.name()))]
    pub fn emit(&self, spec: &InjectorSpec, resolved: &ResolvedGraph) -> Result<ConstructionPlan> {
        let sites = self.collect_sites(resolved);
        let providers: Vec<&Provider> = sites.iter().map(|s| s.provider).collect();
        let propagation = plan_propagation(spec, &providers)?;

        let mut namer = Namer::new();
        for name in self.reserved {
            namer.reserve(name.clone());
        }

        let mut vars: HashMap<TypeKey, String> = HashMap::new();
        let params: Vec<Param> = spec
            .inputs()
            .iter()
            .map(|input| {
                namer.reserve(input.name.clone());
                vars.insert(input.ty.clone(), input.name.clone());
                Param {
                    name: input.name.clone(),
                    ty: input.ty.clone(),
                }
            })
            .collect();

        let mut steps = Vec::with_capacity(sites.len());
        let mut cleanup_vars: Vec<Option<String>> = Vec::with_capacity(sites.len());

        for (site, effects) in sites.iter().zip(&propagation.sites) {
            let args: Vec<Binding> = site
                .provider
                .inputs()
                .iter()
                .map(|ty| Binding {
                    ty: ty.clone(),
                    var: bound_var(&vars, ty),
                })
                .collect();

            let produced: Vec<&TypeKey> = match &site.field {
                Some((_, ty)) => vec![ty],
                None => site.provider.outputs().iter().collect(),
            };
            let outputs: Vec<Output> = produced
                .into_iter()
                .map(|ty| {
                    // outputs another source supplies (argument, override) stay unbound
                    let var = binds(resolved, ty, site.index).then(|| {
                        let name = namer.fresh_for(ty.name());
                        vars.insert(ty.clone(), name.clone());
                        name
                    });
                    Output { ty: ty.clone(), var }
                })
                .collect();

            let cleanup = effects
                .registers_cleanup
                .then(|| namer.fresh(CLEANUP_VAR));
            let error_check = effects.error_check.as_ref().map(|earlier| ErrorCheck {
                unwind: earlier
                    .iter()
                    .filter_map(|&position| cleanup_vars.get(position).cloned().flatten())
                    .collect(),
            });
            cleanup_vars.push(cleanup.clone());

            trace!(provider = site.provider.id(), "Step emitted");
            steps.push(Step {
                provider: site.provider.id().to_string(),
                action: action_for(site),
                args,
                outputs,
                error_check,
                cleanup,
            });
        }

        let outputs = spec
            .outputs()
            .iter()
            .map(|ty| Binding {
                ty: ty.clone(),
                var: bound_var(&vars, ty),
            })
            .collect();

        let cleanups = propagation
            .cleanup_order
            .iter()
            .filter_map(|&position| cleanup_vars.get(position).cloned().flatten())
            .collect();

        debug!(steps = steps.len(), "Construction plan emitted");
        Ok(ConstructionPlan {
            injector: spec.name().to_string(),
            params,
            steps,
            outputs,
            cleanups,
            error_capable: spec.is_error_capable(),
        })
    }

    /// One site per provider invocation, in construction order. A
    /// multi-output function is invoked once; field accessors once per
    /// field read.
    fn collect_sites(&self, resolved: &ResolvedGraph) -> Vec<Site<'a>> {
        let catalog = self.catalog;
        let mut invoked: HashSet<ProviderIndex> = HashSet::new();
        let mut sites = Vec::new();

        for node in resolved.ordered_nodes() {
            let NodeSource::Provider(index) = node.source else {
                continue;
            };
            let provider = catalog.provider(index);

            if let ProviderKind::FieldsOf { fields } = provider.kind() {
                let name = provider
                    .outputs()
                    .iter()
                    .position(|ty| ty == &node.key)
                    .and_then(|i| fields.get(i))
                    .cloned()
                    .unwrap_or_default();
                sites.push(Site {
                    index,
                    provider,
                    field: Some((name, node.key.clone())),
                });
                continue;
            }

            if invoked.insert(index) {
                sites.push(Site {
                    index,
                    provider,
                    field: None,
                });
            }
        }

        sites
    }
}

fn action_for(site: &Site<'_>) -> StepAction {
    match (site.provider.kind(), &site.field) {
        (ProviderKind::Function, _) => StepAction::Call,
        (ProviderKind::Value { expr }, _) => StepAction::Value { expr: expr.clone() },
        (ProviderKind::Bind, _) => StepAction::Bind,
        (ProviderKind::Struct { fields }, _) => StepAction::Struct {
            fields: fields.clone(),
        },
        (ProviderKind::FieldsOf { .. }, field) => StepAction::Field {
            name: field.as_ref().map(|(name, _)| name.clone()).unwrap_or_default(),
        },
    }
}

/// Whether the graph takes `ty` from the provider at `index`.
fn binds(resolved: &ResolvedGraph, ty: &TypeKey, index: ProviderIndex) -> bool {
    resolved
        .graph()
        .node(ty)
        .is_some_and(|node| node.source == NodeSource::Provider(index))
}

/// Variable already bound to `ty`. Construction order guarantees inputs
/// are bound before use.
///
/// # Panics
/// In debug builds, if nothing is bound to `ty`.
fn bound_var(vars: &HashMap<TypeKey, String>, ty: &TypeKey) -> String {
    debug_assert!(vars.contains_key(ty), "no variable bound to {ty}");
    match vars.get(ty) {
        Some(var) => var.clone(),
        None => {
            warn!(ty = %ty, "No variable bound; plan references an undefined name");
            format!("<unbound {ty}>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::graph::GraphBuilder;
    use crate::provider::{Provider, ProviderSet};
    use crate::resolver::Resolver;

    fn plan(set: ProviderSet, spec: &InjectorSpec) -> Result<ConstructionPlan> {
        let catalog = Catalog::from_set(&set).unwrap();
        let graph = GraphBuilder::new(&catalog, spec).build()?;
        let resolved = Resolver::new(&catalog, spec)
            .resolve(graph)
            .map_err(|d| d.first().clone())?;
        PlanEmitter::new(&catalog).emit(spec, &resolved)
    }

    fn vars(plan: &ConstructionPlan) -> Vec<&str> {
        plan.steps.iter().flat_map(Step::bound_vars).collect()
    }

    #[test]
    fn struct_and_field_steps() {
        // baz::Service { foo, bar } from a config argument
        let set = ProviderSet::new("Baz")
            .provider(Provider::fields_of(
                "baz::Config",
                [("foo", "foo::Config"), ("bar", "bar::Config")],
            ))
            .provider(Provider::function("foo::new", ["foo::Config"], "foo::Service"))
            .provider(Provider::function(
                "bar::new",
                ["bar::Config", "foo::Service"],
                "bar::Service",
            ))
            .provider(Provider::structure(
                "baz::Service",
                [("foo", "foo::Service"), ("bar", "bar::Service")],
            ));
        let spec = InjectorSpec::new("new_baz_service")
            .input("config", "baz::Config")
            .output("baz::Service");

        let plan = plan(set, &spec).unwrap();

        assert_eq!(plan.params[0].name, "config");
        assert_eq!(vars(&plan), vec!["fooConfig", "service", "barConfig", "barService", "bazService"]);
        assert_eq!(plan.steps[0].action, StepAction::Field { name: "foo".into() });
        assert_eq!(plan.steps[0].args[0].var, "config");
        assert_eq!(plan.steps[3].args.iter().map(|a| a.var.as_str()).collect::<Vec<_>>(), vec!["barConfig", "service"]);
        assert_eq!(
            plan.steps[4].action,
            StepAction::Struct {
                fields: vec!["foo".into(), "bar".into()]
            }
        );
        assert_eq!(plan.outputs[0].var, "bazService");
    }

    #[test]
    fn value_and_bind_steps() {
        let set = ProviderSet::new("Store")
            .provider(Provider::value("u16", "8080"))
            .provider(Provider::function("app::MemoryStore::new", ["u16"], "app::MemoryStore"))
            .provider(Provider::bind("dyn app::Store", "app::MemoryStore"))
            .provider(Provider::function("app::Api::new", ["dyn app::Store"], "app::Api"));
        let spec = InjectorSpec::new("init").output("app::Api");

        let plan = plan(set, &spec).unwrap();
        let actions: Vec<&StepAction> = plan.steps.iter().map(|s| &s.action).collect();
        assert_eq!(
            actions,
            vec![
                &StepAction::Value { expr: "8080".into() },
                &StepAction::Call,
                &StepAction::Bind,
                &StepAction::Call,
            ]
        );
        assert_eq!(vars(&plan), vec!["u16", "memoryStore", "store", "api"]);
        assert_eq!(plan.steps[2].args[0].var, "memoryStore");
    }

    #[test]
    fn multi_output_function_called_once() {
        let set = ProviderSet::new("Pair")
            .provider(
                Provider::function("app::split", Vec::<&str>::new(), "app::Reader")
                    .also_produces("app::Writer"),
            )
            .provider(Provider::function("app::Copier::new", ["app::Reader", "app::Writer"], "app::Copier"));
        let spec = InjectorSpec::new("init").output("app::Copier");

        let plan = plan(set, &spec).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(vars(&plan), vec!["reader", "writer", "copier"]);
    }

    #[test]
    fn unreached_extra_output_is_discarded() {
        let set = ProviderSet::new("Pair")
            .provider(
                Provider::function("app::split", Vec::<&str>::new(), "app::Reader")
                    .also_produces("app::Writer"),
            );
        let spec = InjectorSpec::new("init").output("app::Reader");

        let plan = plan(set, &spec).unwrap();
        assert_eq!(plan.steps[0].outputs[1].var, None);
    }

    #[test]
    fn argument_keeps_priority_over_extra_output() {
        let set = ProviderSet::new("Pair")
            .provider(
                Provider::function("app::split", Vec::<&str>::new(), "app::Reader")
                    .also_produces("app::Writer"),
            )
            .provider(Provider::function("app::Copier::new", ["app::Reader", "app::Writer"], "app::Copier"));
        let spec = InjectorSpec::new("init")
            .input("writer", "app::Writer")
            .output("app::Copier");

        let plan = plan(set, &spec).unwrap();
        assert_eq!(plan.steps[0].outputs[1].var, None);
        assert_eq!(plan.steps[1].args[1].var, "writer");
    }

    #[test]
    fn cleanups_unwind_and_aggregate() {
        let set = ProviderSet::new("Res")
            .provider(Provider::function("app::open_file", Vec::<&str>::new(), "app::File").fallible().with_cleanup())
            .provider(Provider::function("app::connect", ["app::File"], "app::Conn").with_cleanup())
            .provider(Provider::function("app::Server::new", ["app::Conn"], "app::Server").fallible());
        let spec = InjectorSpec::new("init").output("app::Server").error_capable(true);

        let plan = plan(set, &spec).unwrap();
        assert_eq!(plan.steps[0].cleanup.as_deref(), Some("cleanup"));
        assert_eq!(plan.steps[0].error_check, Some(ErrorCheck::default()));
        assert_eq!(plan.steps[1].cleanup.as_deref(), Some("cleanup2"));
        assert_eq!(
            plan.steps[2].error_check,
            Some(ErrorCheck {
                unwind: vec!["cleanup2".into(), "cleanup".into()]
            })
        );
        assert_eq!(plan.cleanups, vec!["cleanup2", "cleanup"]);
    }

    #[test]
    fn reserved_names_are_avoided() {
        let set = ProviderSet::new("Set").provider(Provider::function("app::new_type", Vec::<&str>::new(), "app::Type"));
        let spec = InjectorSpec::new("init").output("app::Type");
        let catalog = Catalog::from_set(&set).unwrap();
        let graph = GraphBuilder::new(&catalog, &spec).build().unwrap();
        let resolved = Resolver::new(&catalog, &spec).resolve(graph).unwrap();

        let reserved = vec!["type".to_string()];
        let plan = PlanEmitter::new(&catalog)
            .reserved_names(&reserved)
            .emit(&spec, &resolved)
            .unwrap();
        assert_eq!(plan.outputs[0].var, "appType");
    }

    #[test]
    fn numbered_when_qualified_name_is_taken() {
        let set = ProviderSet::new("Set")
            .provider(Provider::function("app::new_config", Vec::<&str>::new(), "app::Config"))
            .provider(Provider::function("app::Service::new", ["app::Config"], "app::Service"));
        let spec = InjectorSpec::new("init")
            .input("config", "app::Settings")
            .input("appConfig", "app::Flags")
            .output("app::Service")
            .output("app::Settings")
            .output("app::Flags");

        let plan = plan(set, &spec).unwrap();
        assert_eq!(vars(&plan), vec!["appConfig2", "service"]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "no variable bound")]
    fn unbound_argument_is_a_bug() {
        bound_var(&HashMap::new(), &TypeKey::new("app::Config"));
    }

    #[test]
    fn infallible_injector_with_fallible_provider() {
        let set = ProviderSet::new("Set")
            .provider(Provider::function("app::connect", Vec::<&str>::new(), "app::Conn").fallible());
        let spec = InjectorSpec::new("init").output("app::Conn");

        let err = plan(set, &spec).unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::InjectorCannotFail);
    }
}
