//! Graph validation and construction ordering.
//!
//! Takes the raw graph produced by [`GraphBuilder`](crate::graph::GraphBuilder)
//! and checks it, in order:
//! 1. **Ambiguity**: guaranteed by the catalog, which rejects duplicate
//!    providers at registration and resolves overrides there
//! 2. **Acyclicity**: re-verified while ordering
//! 3. **Unused providers**: every supplied provider must be reached
//! 4. **Unused arguments**: every injector argument must be consumed
//!
//! The construction order is an iterative post-order walk from the
//! targets, so every node comes after all of its inputs and independent
//! subtrees keep their first-discovery order.

use std::collections::HashMap;

use tracing::{debug, instrument, trace, warn};

use crate::catalog::Catalog;
use crate::error::{
    ArgumentTypeMismatchError, CycleDetectedError, Diagnostic, Diagnostics, Result,
    UnusedProviderError,
};
use crate::graph::{DependencyGraph, Node};
use crate::injector::InjectorSpec;
use crate::key::TypeKey;

/// A validated graph together with its construction order.
#[derive(Debug)]
pub struct ResolvedGraph {
    graph: DependencyGraph,
    order: Vec<TypeKey>,
}

impl ResolvedGraph {
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Node keys, dependencies first.
    pub fn order(&self) -> &[TypeKey] {
        &self.order
    }

    /// Nodes in construction order.
    pub fn ordered_nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|key| self.graph.node(key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Validates and orders one injector's graph.
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    spec: &'a InjectorSpec,
    check_unused: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog, spec: &'a InjectorSpec) -> Self {
        Self {
            catalog,
            spec,
            check_unused: true,
        }
    }

    /// Turn the per-injector unused-provider check on or off.
    pub fn check_unused(mut self, check: bool) -> Self {
        self.check_unused = check;
        self
    }

    /// Validates `graph` and computes its construction order.
    ///
    /// The first failing check wins; checks that report several problems
    /// (unused providers, unused arguments) report all of them at once.
    #[instrument(skip_all, name = "resolve", fields(injector = self.spec.name()))]
    pub fn resolve(&self, graph: DependencyGraph) -> std::result::Result<ResolvedGraph, Diagnostics> {
        let order = topological_order(&graph)?;

        if self.check_unused {
            if let Some(unused) = Diagnostics::new(self.unused_providers(&graph)) {
                return Err(unused);
            }
        }

        if let Some(unused) = Diagnostics::new(self.unused_arguments(&graph)) {
            return Err(unused);
        }

        debug!(steps = order.len(), "Construction order computed");
        Ok(ResolvedGraph { graph, order })
    }

    fn unused_providers(&self, graph: &DependencyGraph) -> Vec<Diagnostic> {
        self.catalog
            .providers()
            .filter(|(index, _)| !graph.used_providers().contains(index))
            .map(|(_, provider)| {
                warn!(provider = provider.id(), "Unused provider");
                Diagnostic::UnusedProvider(UnusedProviderError {
                    provider: provider.id().to_string(),
                })
            })
            .collect()
    }

    fn unused_arguments(&self, graph: &DependencyGraph) -> Vec<Diagnostic> {
        let used = graph.used_arguments();
        self.spec
            .inputs()
            .iter()
            .enumerate()
            .filter(|(position, _)| !used.contains(position))
            .map(|(_, input)| {
                warn!(argument = %input.name, ty = %input.ty, "Unused injector argument");
                Diagnostic::ArgumentTypeMismatch(ArgumentTypeMismatchError {
                    injector: self.spec.name().to_string(),
                    argument: input.name.clone(),
                    ty: input.ty.clone(),
                })
            })
            .collect()
    }
}

/// Orders the graph so every node follows its inputs.
///
/// # Errors
/// [`Diagnostic::CycleDetected`] if the graph is not acyclic.
pub fn topological_order(graph: &DependencyGraph) -> Result<Vec<TypeKey>> {
    let mut marks: HashMap<&TypeKey, Mark> = HashMap::with_capacity(graph.len());
    let mut order = Vec::with_capacity(graph.len());

    for target in graph.targets() {
        if marks.contains_key(target) {
            continue;
        }

        marks.insert(target, Mark::InProgress);
        let mut stack: Vec<(&TypeKey, usize)> = vec![(target, 0)];

        while let Some(&(key, position)) = stack.last() {
            let inputs = graph.node(key).map(|n| n.inputs.as_slice()).unwrap_or(&[]);

            if position == inputs.len() {
                stack.pop();
                marks.insert(key, Mark::Done);
                trace!(ty = %key, "Ordered");
                order.push(key.clone());
                continue;
            }

            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let child = &inputs[position];
            match marks.get(child) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let start = stack.iter().position(|(k, _)| *k == child).unwrap_or(0);
                    let mut path: Vec<TypeKey> = stack[start..].iter().map(|(k, _)| (*k).clone()).collect();
                    path.push(child.clone());
                    warn!(cycle = ?path, "Dependency cycle detected while ordering");
                    return Err(Diagnostic::CycleDetected(CycleDetectedError { path }));
                }
                None => {
                    marks.insert(child, Mark::InProgress);
                    stack.push((child, 0));
                }
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::graph::GraphBuilder;
    use crate::provider::{Provider, ProviderSet};

    fn func(id: &str, inputs: &[&str], output: &str) -> Provider {
        Provider::function(id, inputs.iter().copied(), output)
    }

    fn catalog(providers: Vec<Provider>) -> Catalog {
        let set = providers
            .into_iter()
            .fold(ProviderSet::new("Test"), |set, p| set.provider(p));
        Catalog::from_set(&set).unwrap()
    }

    fn resolve(catalog: &Catalog, spec: &InjectorSpec) -> std::result::Result<ResolvedGraph, Diagnostics> {
        let graph = GraphBuilder::new(catalog, spec).build().map_err(Diagnostics::from)?;
        Resolver::new(catalog, spec).resolve(graph)
    }

    fn order(resolved: &ResolvedGraph) -> Vec<&str> {
        resolved.order().iter().map(TypeKey::name).collect()
    }

    #[test]
    fn dependencies_come_first() {
        let catalog = catalog(vec![
            func("new_message", &[], "Message"),
            func("new_greeter", &["Message"], "Greeter"),
            func("new_event", &["Greeter"], "Event"),
        ]);
        let spec = InjectorSpec::new("init").output("Event");

        let resolved = resolve(&catalog, &spec).unwrap();
        assert_eq!(order(&resolved), vec!["Message", "Greeter", "Event"]);
    }

    #[test]
    fn independent_subtrees_keep_discovery_order() {
        let catalog = catalog(vec![
            func("new_config", &[], "Config"),
            func("new_logger", &["Config"], "Logger"),
            func("new_db", &["Config"], "Db"),
            func("new_app", &["Logger", "Db"], "App"),
        ]);
        let spec = InjectorSpec::new("init").output("App");

        let resolved = resolve(&catalog, &spec).unwrap();
        assert_eq!(order(&resolved), vec!["Config", "Logger", "Db", "App"]);
    }

    #[test]
    fn every_node_after_its_inputs() {
        let catalog = catalog(vec![
            func("a", &[], "A"),
            func("b", &["A"], "B"),
            func("c", &["A", "B"], "C"),
            func("d", &["C", "B"], "D"),
            func("e", &["D", "A"], "E"),
        ]);
        let spec = InjectorSpec::new("init").output("E").output("C");

        let resolved = resolve(&catalog, &spec).unwrap();
        let position: HashMap<&str, usize> = order(&resolved)
            .into_iter()
            .enumerate()
            .map(|(i, k)| (k, i))
            .collect();
        for node in resolved.graph().nodes() {
            for input in &node.inputs {
                assert!(position[input.name()] < position[node.key.name()]);
            }
        }
        assert_eq!(resolved.order().len(), 5);
    }

    #[test]
    fn unused_provider_reported() {
        let catalog = catalog(vec![
            func("new_message", &[], "Message"),
            func("new_port", &[], "u16"),
            func("new_host", &[], "Host"),
        ]);
        let spec = InjectorSpec::new("init").output("Message");

        let err = resolve(&catalog, &spec).unwrap_err();
        assert_eq!(err.len(), 2);
        match err.first() {
            Diagnostic::UnusedProvider(e) => assert_eq!(e.provider, "new_port"),
            other => panic!("Expected UnusedProvider, got: {other:?}"),
        }
    }

    #[test]
    fn unused_check_can_be_disabled() {
        let catalog = catalog(vec![func("new_message", &[], "Message"), func("new_port", &[], "u16")]);
        let spec = InjectorSpec::new("init").output("Message");

        let graph = GraphBuilder::new(&catalog, &spec).build().unwrap();
        assert!(Resolver::new(&catalog, &spec).check_unused(false).resolve(graph).is_ok());
    }

    #[test]
    fn unused_argument_reported() {
        let catalog = catalog(vec![func("new_message", &[], "Message")]);
        let spec = InjectorSpec::new("init").input("port", "u16").output("Message");

        let err = resolve(&catalog, &spec).unwrap_err();
        assert_eq!(err.kinds(), vec![DiagnosticKind::ArgumentTypeMismatch]);
    }

    #[test]
    fn argument_as_target_is_used() {
        let catalog = catalog(vec![]);
        let spec = InjectorSpec::new("identity").input("port", "u16").output("u16");

        let resolved = resolve(&catalog, &spec).unwrap();
        assert_eq!(order(&resolved), vec!["u16"]);
    }

    #[test]
    fn ordering_rejects_cycles_on_its_own() {
        use crate::graph::NodeSource;

        let node = |key: &str, input: &str| Node {
            key: TypeKey::new(key),
            source: NodeSource::Argument(0),
            inputs: vec![TypeKey::new(input)],
            required_by: None,
        };
        let graph = DependencyGraph::from_nodes(vec![node("A", "B"), node("B", "A")], vec![TypeKey::new("A")]);

        match topological_order(&graph).unwrap_err() {
            Diagnostic::CycleDetected(err) => {
                let path: Vec<&str> = err.path.iter().map(TypeKey::name).collect();
                assert_eq!(path, vec!["A", "B", "A"]);
            }
            other => panic!("Expected CycleDetected, got: {other:?}"),
        }
    }

    #[test]
    fn shared_target_ordered_once() {
        let catalog = catalog(vec![func("a", &[], "A"), func("b", &["A"], "B")]);
        let spec = InjectorSpec::new("init").output("A").output("B");

        let resolved = resolve(&catalog, &spec).unwrap();
        assert_eq!(order(&resolved), vec!["A", "B"]);
    }
}
