//! Schema reference graph and cycle detection
//!
//! Builds a directed graph over named schema nodes and reference
//! strings, with edges along the containment chain the generator
//! follows: record fields, array items, map values and union
//! alternatives. A name is cycle-starting when it can reach itself,
//! which is exactly membership in a strongly connected component of
//! size greater than one, or a self-loop. The generator compiles such
//! names as standalone functions instead of inlining them.
//!
//! Primitive type names never become graph nodes, so they can never be
//! flagged even when a field happens to share their spelling.

use std::collections::{HashMap, HashSet};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::schema::SchemaNode;

/// Directed graph of named-schema references.
pub struct ReferenceGraph {
    graph: DiGraph<String, ()>,
    indices: HashMap<String, NodeIndex>,
}

impl ReferenceGraph {
    /// Build the graph for every registered schema.
    pub fn build(schemas: &HashMap<String, SchemaNode>) -> ReferenceGraph {
        let mut rg = ReferenceGraph {
            graph: DiGraph::new(),
            indices: HashMap::new(),
        };
        for (identifier, schema) in schemas {
            rg.node(identifier);
            let mut walked = HashSet::new();
            rg.walk(schema, identifier, schemas, &mut walked);
        }
        rg
    }

    /// Every name that starts a self-referential chain.
    pub fn cycle_starting(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        for scc in kosaraju_scc(&self.graph) {
            if scc.len() > 1 {
                for idx in scc {
                    out.insert(self.graph[idx].clone());
                }
            } else {
                let idx = scc[0];
                let self_loop = self
                    .graph
                    .edges_directed(idx, Direction::Outgoing)
                    .any(|e| e.target() == idx);
                if self_loop {
                    out.insert(self.graph[idx].clone());
                }
            }
        }
        out
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.indices.insert(name.to_string(), idx);
        idx
    }

    fn edge(&mut self, from: &str, to: &str) {
        let a = self.node(from);
        let b = self.node(to);
        self.graph.add_edge(a, b, ());
    }

    /// Walk `schema` attributing every outgoing reference to `owner`.
    /// Named nodes become graph nodes of their own; descent into a
    /// registered name stops because that entry is walked separately.
    fn walk(
        &mut self,
        schema: &SchemaNode,
        owner: &str,
        registered: &HashMap<String, SchemaNode>,
        walked: &mut HashSet<String>,
    ) {
        match schema {
            SchemaNode::Reference(name) => self.edge(owner, name),
            SchemaNode::Record(record) => {
                let fullname = schema.fullname();
                match fullname.as_deref().filter(|full| *full != owner) {
                    Some(name) => {
                        self.edge(owner, name);
                        if registered.contains_key(name) || !walked.insert(name.to_string()) {
                            return;
                        }
                        for field in &record.fields {
                            self.walk(&field.schema, name, registered, walked);
                        }
                    }
                    None => {
                        for field in &record.fields {
                            self.walk(&field.schema, owner, registered, walked);
                        }
                    }
                }
            }
            SchemaNode::Enum(_) | SchemaNode::Fixed(_) => {
                if let Some(name) = schema.fullname().filter(|full| full != owner) {
                    self.edge(owner, &name);
                }
            }
            SchemaNode::Array(items) => self.walk(items, owner, registered, walked),
            SchemaNode::Map(values) => self.walk(values, owner, registered, walked),
            SchemaNode::Union(alternatives) => {
                for alt in alternatives {
                    self.walk(alt, owner, registered, walked);
                }
            }
            SchemaNode::Primitive(_) | SchemaNode::Logical(_) => {}
        }
    }
}

/// Recompute the full cycle-starting set for a schema database.
pub fn cycle_starting_nodes(schemas: &HashMap<String, SchemaNode>) -> HashSet<String> {
    ReferenceGraph::build(schemas).cycle_starting()
}
