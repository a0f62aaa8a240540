//! Schema store
//!
//! Single source of truth for registered schema shapes and identifier
//! resolution. Registration parses and normalizes the raw JSON shape,
//! promotes nested fully-qualified named subschemas into entries of
//! their own, and recomputes the cycle-starting set from scratch.
//! Registration is rare and happens off the serialization hot path, so
//! the full recompute is deliberate.
//!
//! Resolution order: a name defined inside the requesting schema's own
//! tree shadows the global mapping. Two unrelated top-level schemas may
//! each define a local subschema with the same local name and different
//! shapes; the shadowing rule keeps them from bleeding into each other.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::graph;
use crate::schema::SchemaNode;

/// Mapping from schema identifier to parsed schema, plus the derived
/// cycle-starting set.
#[derive(Default)]
pub struct SchemaStore {
    schemas: HashMap<String, SchemaNode>,
    cycle_starting: HashSet<String>,
}

impl SchemaStore {
    pub fn new() -> SchemaStore {
        SchemaStore::default()
    }

    /// Register a schema under `identifier`, parsing it from JSON.
    ///
    /// Unresolved references inside the schema are not an error here;
    /// they only fail at generation time, which permits forward
    /// references and mutual recursion across registrations.
    pub fn register(&mut self, identifier: &str, raw: &Value) -> Result<()> {
        let schema = SchemaNode::parse(raw)?;
        self.register_parsed(identifier, schema)
    }

    /// Register an already parsed schema under `identifier`.
    pub fn register_parsed(&mut self, identifier: &str, schema: SchemaNode) -> Result<()> {
        check_local_conflicts(identifier, &schema)?;

        // Promote nested fully-qualified names so other schemas can
        // reference them directly.
        for (node, fullname) in schema.named_nodes() {
            if fullname.contains('.') && fullname != identifier {
                self.schemas.insert(fullname, node.clone());
            }
        }
        self.schemas.insert(identifier.to_string(), schema);
        self.recompute_cycles();
        Ok(())
    }

    /// Bulk registration; the whole batch lands before any caller can
    /// start generating against it.
    pub fn register_all<'a, I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        for (identifier, raw) in pairs {
            self.register(identifier, raw)?;
        }
        Ok(())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.schemas.contains_key(identifier)
    }

    pub fn is_cycle_starting(&self, identifier: &str) -> bool {
        self.cycle_starting.contains(identifier)
    }

    /// Identifiers of all registered schemas.
    pub fn identifiers(&self) -> impl Iterator<Item = &String> {
        self.schemas.keys()
    }

    /// Resolve `identifier`, preferring a local definition inside
    /// `context`'s own schema tree over the global mapping.
    pub fn resolve(&self, identifier: &str, context: Option<&str>) -> Result<&SchemaNode> {
        if let Some(context_id) = context {
            if let Some(context_schema) = self.schemas.get(context_id) {
                if let Some(local) = context_schema.find_named(identifier) {
                    return Ok(local);
                }
            }
        }
        self.schemas
            .get(identifier)
            .ok_or_else(|| SchemaError::UnknownSchema(identifier.to_string()))
    }

    fn recompute_cycles(&mut self) {
        self.cycle_starting = graph::cycle_starting_nodes(&self.schemas);
        debug!(
            schemas = self.schemas.len(),
            cycle_starting = self.cycle_starting.len(),
            "recomputed cycle-starting set"
        );
    }
}

/// Two local definitions of the same name with different shapes inside
/// one top-level schema would make resolution ambiguous; reject at
/// registration time instead of silently picking one.
fn check_local_conflicts(identifier: &str, schema: &SchemaNode) -> Result<()> {
    let mut seen: HashMap<String, &SchemaNode> = HashMap::new();
    for (node, fullname) in schema.named_nodes() {
        match seen.get(fullname.as_str()) {
            Some(existing) if *existing != node => {
                return Err(SchemaError::Generation(format!(
                    "schema {identifier} defines the local name {fullname} twice with different shapes"
                )));
            }
            _ => {
                seen.insert(fullname, node);
            }
        }
    }
    Ok(())
}
