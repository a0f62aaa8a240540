//! Codec registry
//!
//! Front door tying the pieces together: a `SchemaStore` for the
//! registered schemas, a `CompilerBackend` for turning lowered modules
//! into codecs, and a cache of compiled codecs keyed by identifier.
//! Registration never compiles; compilation happens on demand or in
//! one batch, so forward references across registrations work.

use std::collections::HashMap;

use serde_json::Value;
use tracing::info;

use crate::backend::{Codec, CompilerBackend, IrBackend};
use crate::codegen;
use crate::error::Result;
use crate::store::SchemaStore;

pub struct CodecRegistry<B: CompilerBackend = IrBackend> {
    store: SchemaStore,
    backend: B,
    codecs: HashMap<String, Codec>,
}

impl CodecRegistry<IrBackend> {
    pub fn new() -> CodecRegistry<IrBackend> {
        CodecRegistry::with_backend(IrBackend)
    }
}

impl Default for CodecRegistry<IrBackend> {
    fn default() -> Self {
        CodecRegistry::new()
    }
}

impl<B: CompilerBackend> CodecRegistry<B> {
    pub fn with_backend(backend: B) -> CodecRegistry<B> {
        CodecRegistry {
            store: SchemaStore::new(),
            backend,
            codecs: HashMap::new(),
        }
    }

    /// Register a schema without compiling it. Invalidates every
    /// cached codec: a re-registered schema may be referenced from any
    /// of them.
    pub fn register(&mut self, identifier: &str, raw: &Value) -> Result<()> {
        self.store.register(identifier, raw)?;
        self.codecs.clear();
        Ok(())
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    /// The cached codec for `identifier`, if it has been compiled.
    pub fn codec(&self, identifier: &str) -> Option<&Codec> {
        self.codecs.get(identifier)
    }

    /// Compile `identifier` if needed and hand back its codec.
    pub fn compile(&mut self, identifier: &str) -> Result<&Codec> {
        if !self.codecs.contains_key(identifier) {
            let module = codegen::generate(&self.store, identifier)?;
            let codec = self.backend.compile(&module)?;
            info!(identifier, aux = module.aux.len(), "compiled codec");
            self.codecs.insert(identifier.to_string(), codec);
        }
        Ok(&self.codecs[identifier])
    }

    /// Compile every registered schema. All-or-nothing: when any
    /// schema fails, the cache is left exactly as it was.
    pub fn compile_all(&mut self) -> Result<()> {
        let identifiers: Vec<String> = self.store.identifiers().cloned().collect();
        let mut compiled = HashMap::new();
        for identifier in identifiers {
            if self.codecs.contains_key(&identifier) {
                continue;
            }
            let module = codegen::generate(&self.store, &identifier)?;
            let codec = self.backend.compile(&module)?;
            compiled.insert(identifier, codec);
        }
        info!(count = compiled.len(), "compiled codec batch");
        self.codecs.extend(compiled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::value::Datum;
    use serde_json::json;

    fn user_schema() -> Value {
        json!({
            "type": "record", "name": "User", "namespace": "demo",
            "fields": [{"name": "id", "type": "long"}]
        })
    }

    #[test]
    fn test_register_then_compile_roundtrip() {
        let mut registry = CodecRegistry::new();
        registry.register("demo.User", &user_schema()).unwrap();
        let codec = registry.compile("demo.User").unwrap();
        let datum = Datum::record([("id", Datum::Long(7))]);
        let bytes = codec.serialize(&datum).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), datum);
    }

    #[test]
    fn test_compile_unknown_identifier() {
        let mut registry = CodecRegistry::new();
        let err = registry.compile("demo.Nope").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownSchema(_)));
    }

    #[test]
    fn test_forward_reference_across_registrations() {
        let mut registry = CodecRegistry::new();
        registry
            .register(
                "demo.Holder",
                &json!({
                    "type": "record", "name": "Holder", "namespace": "demo",
                    "fields": [{"name": "item", "type": "demo.Item"}]
                }),
            )
            .unwrap();
        // Compiling before the referenced schema arrives fails.
        assert!(registry.compile("demo.Holder").is_err());
        registry
            .register(
                "demo.Item",
                &json!({
                    "type": "record", "name": "Item", "namespace": "demo",
                    "fields": [{"name": "sku", "type": "string"}]
                }),
            )
            .unwrap();
        assert!(registry.compile("demo.Holder").is_ok());
    }

    #[test]
    fn test_compile_all_is_all_or_nothing() {
        let mut registry = CodecRegistry::new();
        registry.register("demo.User", &user_schema()).unwrap();
        registry
            .register(
                "demo.Broken",
                &json!({
                    "type": "record", "name": "Broken", "namespace": "demo",
                    "fields": [{"name": "x", "type": "demo.Missing"}]
                }),
            )
            .unwrap();
        assert!(registry.compile_all().is_err());
        // Nothing was published.
        assert!(registry.codec("demo.User").is_none());
    }

    #[test]
    fn test_registration_invalidates_cache() {
        let mut registry = CodecRegistry::new();
        registry.register("demo.User", &user_schema()).unwrap();
        registry.compile("demo.User").unwrap();
        assert!(registry.codec("demo.User").is_some());
        registry.register("demo.Other", &user_schema()).unwrap();
        assert!(registry.codec("demo.User").is_none());
    }
}
