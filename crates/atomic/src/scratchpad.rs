use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use iglu::SchemaRegistry;
use wire_codec::CollectorPayload;

use crate::error::AtomicError;
use crate::event::{AtomicEvent, SelfDescribingContext, SelfDescribingEvent, ATOMIC_FIELDS};

const ATOMIC_SCHEMA_REF: &str = "iglu:io.datenstrom/atomic/jsonschema/1-0-0";
const FORBIDDEN_FIELDS: &[&str] = &["contexts", "event"];

/// Mutable scratchpad built per raw payload candidate event. Carries both
/// short tracker-protocol keys (read by later enrichers) and resolved atomic
/// fields, plus the contexts and event being assembled. Consumed by
/// `to_atomic_event`. The raw payload is shared (never mutated) across every
/// candidate event a single raw payload expands into, so it's held by `Arc`
/// rather than borrowed — that keeps the scratchpad `'static` and lets
/// enrichers be stored as `Box<dyn Enrichment>` in an ordered chain.
pub struct TemporaryAtomicEvent {
    raw: Arc<CollectorPayload>,
    temp: HashMap<String, serde_json::Value>,
    fields: HashMap<String, serde_json::Value>,
    contexts: Vec<SelfDescribingContext>,
    context_schemas: HashSet<String>,
    event: Option<SelfDescribingEvent>,
}

impl TemporaryAtomicEvent {
    pub fn new(raw: Arc<CollectorPayload>) -> Self {
        TemporaryAtomicEvent {
            raw,
            temp: HashMap::new(),
            fields: HashMap::new(),
            contexts: Vec::new(),
            context_schemas: HashSet::new(),
            event: None,
        }
    }

    pub fn raw_event(&self) -> &CollectorPayload {
        &self.raw
    }

    /// Records a tracker-protocol scalar (short key or temp-only name like
    /// `page_url`). No validation — any enricher may read it back later.
    pub fn set_short(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.temp.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.temp.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.temp.get(key).and_then(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.temp.contains_key(key)
    }

    /// Snapshot of every temp key currently set. Taken as an owned `Vec` so
    /// callers can iterate while also mutating `self` (e.g. the transform
    /// enrichment, which both reads and writes temp-adjacent atomic fields).
    pub fn temp_keys(&self) -> Vec<String> {
        self.temp.keys().cloned().collect()
    }

    /// Records an atomic-schema field. Fails if `key` isn't a real atomic
    /// field, or is `contexts`/`event` (those have dedicated operations).
    pub fn set_value(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Result<(), AtomicError> {
        let key = key.into();
        if FORBIDDEN_FIELDS.contains(&key.as_str()) {
            return Err(AtomicError::ForbiddenField(key));
        }
        if !ATOMIC_FIELDS.contains(&key.as_str()) {
            return Err(AtomicError::UnknownField(key));
        }
        self.fields.insert(key, value.into());
        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn add_context(&mut self, ctx: SelfDescribingContext) -> Result<(), AtomicError> {
        if !self.context_schemas.insert(ctx.schema.clone()) {
            return Err(AtomicError::DuplicateContext(ctx.schema));
        }
        self.contexts.push(ctx);
        Ok(())
    }

    pub fn contexts(&self) -> &[SelfDescribingContext] {
        &self.contexts
    }

    pub fn set_event(&mut self, ev: SelfDescribingEvent) -> Result<(), AtomicError> {
        if self.event.is_some() {
            return Err(AtomicError::EventAlreadySet);
        }
        self.event = Some(ev);
        Ok(())
    }

    pub fn has_event(&self) -> bool {
        self.event.is_some()
    }

    pub fn event(&self) -> Option<&SelfDescribingEvent> {
        self.event.as_ref()
    }

    /// Composes the atomic record, validates it against the atomic schema,
    /// and deserialises into a strongly-typed `AtomicEvent`. Consumes the
    /// scratchpad: no further writes are possible after this point.
    pub async fn to_atomic_event(
        self,
        registry: &SchemaRegistry,
    ) -> Result<AtomicEvent, AtomicError> {
        let event = self.event.ok_or_else(|| AtomicError::InvalidAtomic {
            reasons: vec!["event: event was never set".to_string()],
        })?;

        let mut object = serde_json::Map::new();
        for (k, v) in self.fields {
            object.insert(k, v);
        }
        object.insert(
            "contexts".to_string(),
            serde_json::to_value(&self.contexts).expect("contexts always serialize"),
        );
        object.insert(
            "event".to_string(),
            serde_json::to_value(&event).expect("event always serializes"),
        );
        let value = serde_json::Value::Object(object);

        let entry = registry
            .get(ATOMIC_SCHEMA_REF)
            .await
            .map_err(|e| AtomicError::InvalidAtomic { reasons: vec![e.to_string()] })?;
        let errors = entry.validation_errors(&value);
        if !errors.is_empty() {
            return Err(AtomicError::InvalidAtomic { reasons: errors });
        }

        serde_json::from_value(value).map_err(|e| AtomicError::InvalidAtomic {
            reasons: vec![e.to_string()],
        })
    }
}
