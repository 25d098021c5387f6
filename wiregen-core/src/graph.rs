//! Dependency graph construction.
//!
//! Builds the graph of everything an injector needs, starting from its
//! requested outputs:
//! - Injector arguments become leaves and win over catalog providers
//! - Every other type is looked up in the catalog
//! - Missing types and cycles abort the build
//!
//! # Algorithm
//! Depth-first search with an explicit frame stack instead of recursion,
//! so deep graphs cannot overflow the call stack. Each type is marked
//! "in progress" while its inputs are being resolved and "done" after;
//! meeting an in-progress type again means a cycle.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, instrument, trace, warn};

use crate::catalog::{Catalog, ProviderIndex};
use crate::error::{CycleDetectedError, Diagnostic, DuplicateProviderError, NoProviderFoundError, Result};
use crate::injector::InjectorSpec;
use crate::key::TypeKey;

const MAX_SUGGESTIONS: usize = 3;

/// Where a node's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSource {
    /// The injector argument at this position.
    Argument(usize),
    /// A catalog provider.
    Provider(ProviderIndex),
}

/// A type reachable from the injector's targets.
#[derive(Debug, Clone)]
pub struct Node {
    pub key: TypeKey,
    pub source: NodeSource,
    /// Types this node is built from, in provider argument order
    pub inputs: Vec<TypeKey>,
    /// The node that first needed this one; `None` for targets
    pub required_by: Option<TypeKey>,
}

/// Everything reachable from one injector's targets.
///
/// Nodes are kept in first-discovery order.
#[derive(Debug)]
pub struct DependencyGraph {
    nodes: IndexMap<TypeKey, Node>,
    targets: Vec<TypeKey>,
    used_providers: IndexSet<ProviderIndex>,
}

impl DependencyGraph {
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node(&self, key: &TypeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn targets(&self) -> &[TypeKey] {
        &self.targets
    }

    /// Catalog providers the walk went through, in first-use order.
    pub fn used_providers(&self) -> &IndexSet<ProviderIndex> {
        &self.used_providers
    }

    /// Positions of the injector arguments that ended up in the graph.
    pub fn used_arguments(&self) -> IndexSet<usize> {
        self.nodes
            .values()
            .filter_map(|node| match node.source {
                NodeSource::Argument(position) => Some(position),
                NodeSource::Provider(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_nodes(nodes: Vec<Node>, targets: Vec<TypeKey>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.key.clone(), n)).collect(),
            targets,
            used_providers: IndexSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// A type whose inputs are being resolved.
#[derive(Debug)]
struct Frame {
    key: TypeKey,
    inputs: Vec<TypeKey>,
    next: usize,
}

/// Resolves an injector's targets against a catalog.
pub struct GraphBuilder<'a> {
    catalog: &'a Catalog,
    spec: &'a InjectorSpec,
    marks: HashMap<TypeKey, Mark>,
    /// Active resolution path (for cycle reporting)
    path: Vec<Frame>,
    nodes: IndexMap<TypeKey, Node>,
    used_providers: IndexSet<ProviderIndex>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(catalog: &'a Catalog, spec: &'a InjectorSpec) -> Self {
        Self {
            catalog,
            spec,
            marks: HashMap::new(),
            path: Vec::new(),
            nodes: IndexMap::new(),
            used_providers: IndexSet::new(),
        }
    }

    /// Walks the graph from every requested output.
    ///
    /// # Errors
    /// - [`Diagnostic::DuplicateProvider`] — two injector arguments share a type
    /// - [`Diagnostic::NoProviderFound`] — a required type has no source
    /// - [`Diagnostic::CycleDetected`] — a type requires itself
    #[instrument(skip_all, name = "graph_build", fields(injector = self.spec.name()))]
    pub fn build(mut self) -> Result<DependencyGraph> {
        self.check_arguments()?;

        let spec = self.spec;
        for target in spec.outputs() {
            self.resolve_from(target.clone())?;
        }

        debug!(
            nodes = self.nodes.len(),
            providers = self.used_providers.len(),
            "Dependency graph built"
        );

        Ok(DependencyGraph {
            nodes: self.nodes,
            targets: spec.outputs().to_vec(),
            used_providers: self.used_providers,
        })
    }

    fn check_arguments(&self) -> Result<()> {
        let inputs = self.spec.inputs();
        for (position, input) in inputs.iter().enumerate() {
            if let Some(first) = inputs[..position].iter().find(|earlier| earlier.ty == input.ty) {
                warn!(ty = %input.ty, "Two injector arguments share a type");
                return Err(Diagnostic::DuplicateProvider(DuplicateProviderError {
                    ty: input.ty.clone(),
                    existing: format!("argument {}", first.name),
                    duplicate: format!("argument {}", input.name),
                }));
            }
        }
        Ok(())
    }

    fn resolve_from(&mut self, target: TypeKey) -> Result<()> {
        self.enter(target, None)?;

        loop {
            let next = match self.path.last_mut() {
                None => break,
                Some(frame) if frame.next < frame.inputs.len() => {
                    let child = frame.inputs[frame.next].clone();
                    frame.next += 1;
                    Some((child, frame.key.clone()))
                }
                Some(_) => None,
            };

            match next {
                Some((child, parent)) => self.enter(child, Some(parent))?,
                None => {
                    if let Some(frame) = self.path.pop() {
                        trace!(ty = %frame.key, "Resolved");
                        self.marks.insert(frame.key, Mark::Done);
                    }
                }
            }
        }

        Ok(())
    }

    /// Starts resolving `key`, pushing a frame if it has inputs to visit.
    fn enter(&mut self, key: TypeKey, required_by: Option<TypeKey>) -> Result<()> {
        match self.marks.get(&key) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => return Err(self.cycle_error(&key)),
            None => {}
        }

        if let Some(position) = self.spec.argument_for(&key) {
            trace!(ty = %key, position, "Using injector argument");
            self.marks.insert(key.clone(), Mark::Done);
            self.nodes.insert(
                key.clone(),
                Node {
                    key,
                    source: NodeSource::Argument(position),
                    inputs: Vec::new(),
                    required_by,
                },
            );
            return Ok(());
        }

        let catalog = self.catalog;
        let Some((index, provider)) = catalog.lookup(&key) else {
            warn!(ty = %key, required_by = ?required_by, "No provider found");
            let suggestions = catalog.suggestions_for(&key, MAX_SUGGESTIONS);
            return Err(Diagnostic::NoProviderFound(NoProviderFoundError {
                ty: key,
                required_by,
                suggestions,
            }));
        };

        trace!(ty = %key, provider = provider.id(), "Discovered");
        let inputs = provider.inputs().to_vec();
        self.used_providers.insert(index);
        self.marks.insert(key.clone(), Mark::InProgress);
        self.nodes.insert(
            key.clone(),
            Node {
                key: key.clone(),
                source: NodeSource::Provider(index),
                inputs: inputs.clone(),
                required_by,
            },
        );
        self.path.push(Frame {
            key,
            inputs,
            next: 0,
        });
        Ok(())
    }

    fn cycle_error(&self, key: &TypeKey) -> Diagnostic {
        let start = self.path.iter().position(|f| &f.key == key).unwrap_or(0);
        let mut path: Vec<TypeKey> = self.path[start..].iter().map(|f| f.key.clone()).collect();
        path.push(key.clone());

        warn!(cycle = ?path, "Dependency cycle detected");
        Diagnostic::CycleDetected(CycleDetectedError { path })
    }
}
