use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use caravan_types::Future;

use crate::GraphError;

/// A named, finite collection of futures plus user-facing result bindings.
///
/// Invariant: the dependency relation over a module's futures is acyclic.
/// Violations are construction-time errors, never runtime ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    id: String,
    futures: BTreeMap<String, Future>,
    /// User-facing result key -> future id.
    results: BTreeMap<String, String>,
}

impl Module {
    pub fn builder(id: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, future_id: &str) -> Option<&Future> {
        self.futures.get(future_id)
    }

    pub fn futures(&self) -> impl Iterator<Item = &Future> {
        self.futures.values()
    }

    pub fn future_ids(&self) -> impl Iterator<Item = &str> {
        self.futures.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.futures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }

    /// Result bindings declared by the module author.
    pub fn results(&self) -> &BTreeMap<String, String> {
        &self.results
    }
}

/// Collects future specifications and validates them into a [`Module`].
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    id: String,
    futures: Vec<Future>,
    results: BTreeMap<String, String>,
}

impl ModuleBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            futures: Vec::new(),
            results: BTreeMap::new(),
        }
    }

    pub fn add_future(mut self, future: Future) -> Self {
        self.futures.push(future);
        self
    }

    /// Expose a future's result under a user-facing key.
    pub fn add_result(mut self, key: impl Into<String>, future_id: impl Into<String>) -> Self {
        self.results.insert(key.into(), future_id.into());
        self
    }

    /// Validate and construct the module. Enforces unique ids, resolvable
    /// dependency references, resolvable result bindings, and acyclicity.
    pub fn build(self) -> Result<Module, GraphError> {
        let mut futures: BTreeMap<String, Future> = BTreeMap::new();
        for future in self.futures {
            if futures.contains_key(&future.id) {
                return Err(GraphError::DuplicateFutureId { id: future.id });
            }
            futures.insert(future.id.clone(), future);
        }

        for future in futures.values() {
            for dep in future.dependencies() {
                if !futures.contains_key(&dep) {
                    return Err(GraphError::MissingDependency {
                        future_id: future.id.clone(),
                        missing: dep,
                    });
                }
            }
        }

        for (key, target) in &self.results {
            if !futures.contains_key(target) {
                return Err(GraphError::MissingResultTarget {
                    key: key.clone(),
                    missing: target.clone(),
                });
            }
        }

        detect_cycle(&futures)?;

        Ok(Module {
            id: self.id,
            futures,
            results: self.results,
        })
    }
}

/// Depth-first cycle check. Reports the offending id chain, closed on the
/// repeated id, e.g. `a -> b -> c -> a`.
fn detect_cycle(futures: &BTreeMap<String, Future>) -> Result<(), GraphError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();

    // Iterative DFS keeping the active path in `stack`.
    fn visit<'a>(
        id: &'a str,
        futures: &'a BTreeMap<String, Future>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Result<(), GraphError> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = stack.iter().position(|f| *f == id).unwrap_or(0);
                let mut chain: Vec<String> =
                    stack[start..].iter().map(|f| f.to_string()).collect();
                chain.push(id.to_string());
                return Err(GraphError::DependencyCycle { chain });
            }
            None => {}
        }

        marks.insert(id, Mark::InProgress);
        stack.push(id);

        if let Some(future) = futures.get(id) {
            for dep in future.dependencies() {
                let dep_id = futures
                    .get_key_value(dep.as_str())
                    .map(|(k, _)| k.as_str())
                    .unwrap_or_default();
                visit(dep_id, futures, marks, stack)?;
            }
        }

        stack.pop();
        marks.insert(id, Mark::Done);
        Ok(())
    }

    for id in futures.keys() {
        visit(id, futures, &mut marks, &mut stack)?;
    }

    Ok(())
}
