//! Named-type registry.
//!
//! Each name moves through three states:
//!
//! ```text
//! (absent) ──declare──▶ Pending ──register──▶ Resolving ──compiled──▶ Resolved
//!     ▲                    ▲                      │
//!     └────────────────────┴──── failed ──────────┘
//! ```
//!
//! A reference to a `Resolving` name is a cycle, to a `Pending` one a forward reference, to an
//! absent one an unknown type. A failed registration puts the slot back where it was, so the rest
//! of the registry stays usable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::builder::{CasterBuilder, ClassBuilder, Definition};
use crate::caster::Caster;
use crate::compile::Compiler;
use crate::decoder::Decoder;
use crate::error::SetupError;
use crate::factory::{self, Factory, Target};
use crate::ir::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Declared, not registered yet.
    Pending,
    /// Currently being compiled.
    Resolving,
    Resolved,
}

#[derive(Clone)]
enum Slot {
    Pending,
    Resolving,
    Resolved { caster: Caster, synthesizes_attrs: bool },
}

impl Slot {
    fn state(&self) -> EntryState {
        match self {
            Slot::Pending => EntryState::Pending,
            Slot::Resolving => EntryState::Resolving,
            Slot::Resolved { .. } => EntryState::Resolved,
        }
    }
}

/// Setup-phase registry. Mutable while definitions are added; [`Registry::finish`] freezes it.
pub struct Registry {
    slots: IndexMap<String, Slot>,
    factories: HashMap<String, Factory>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Empty registry with the default factories (`Array`).
    pub fn new() -> Self {
        Self {
            slots: IndexMap::new(),
            factories: factory::defaults().into_iter().collect(),
        }
    }

    /// [`Registry::new`] plus the casters from [`crate::builtin`].
    pub fn with_builtins() -> Result<Self, SetupError> {
        let mut registry = Self::new();
        registry.register_all(crate::builtin::casters())?;
        Ok(registry)
    }

    // ------------------------------ Setup -------------------------------- //

    /// Mark names as about to be registered. Already-known names are left alone.
    pub fn declare_all<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.slots.entry(name.into()).or_insert(Slot::Pending);
        }
    }

    /// Register a batch: every name is declared first, then each definition is registered in
    /// order. Stops at the first error.
    pub fn register_all<I>(&mut self, definitions: I) -> Result<(), SetupError>
    where
        I: IntoIterator,
        I::Item: Into<Definition>,
    {
        let definitions: Vec<Definition> = definitions.into_iter().map(Into::into).collect();
        let names: Vec<String> = definitions.iter()
            .flat_map(Definition::declared_names)
            .map(str::to_string)
            .collect();
        self.declare_all(names);
        for definition in definitions {
            self.register(definition)?;
        }
        Ok(())
    }

    pub fn register(&mut self, definition: impl Into<Definition>) -> Result<(), SetupError> {
        let definition = definition.into();
        let result = match &definition {
            Definition::Schema(schema) => self.register_schema(schema).map(drop),
            Definition::Class(builder) => self.register_class(builder),
            Definition::Caster(builder) => self.register_caster(builder),
        };
        if let Err(error) = &result {
            tracing::warn!(name = definition.name(), %error, "registration failed");
        }
        result
    }

    pub fn register_factory<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn(Caster) -> Caster + Send + Sync + 'static,
    {
        self.factories.insert(tag.into(), Arc::new(factory));
    }

    fn register_schema(&mut self, schema: &Schema) -> Result<Caster, SetupError> {
        let was_pending = self.begin(&schema.name)?;
        tracing::debug!(name = %schema.name, deps = ?schema.references(), "compiling schema");
        match Compiler::new(self).compile_schema(schema) {
            Ok(compiled) => {
                self.complete(&schema.name, compiled.caster.clone(), compiled.synthesizes_attrs);
                Ok(compiled.caster)
            }
            Err(error) => {
                self.abort(&schema.name, was_pending);
                Err(error)
            }
        }
    }

    /// The class name is held in `Resolving` while its schema compiles, so a schema that refers
    /// back to the class is reported as a cycle.
    fn register_class(&mut self, builder: &ClassBuilder) -> Result<(), SetupError> {
        let class = builder.class_name();
        let was_pending = self.begin(class)?;
        match self.register_schema(builder.schema()) {
            Ok(inner) => {
                let attrs = self.synthesizes_attrs(&builder.schema().name);
                self.complete(class, builder.wrap(inner, attrs), attrs);
                Ok(())
            }
            Err(error) => {
                self.abort(class, was_pending);
                Err(error)
            }
        }
    }

    fn register_caster(&mut self, builder: &CasterBuilder) -> Result<(), SetupError> {
        self.begin(builder.type_name())?;
        self.complete(builder.type_name(), builder.caster().clone(), false);
        Ok(())
    }

    /// Move `name` to `Resolving`. Returns whether it was `Pending` before.
    fn begin(&mut self, name: &str) -> Result<bool, SetupError> {
        match self.slots.get(name) {
            Some(Slot::Resolving | Slot::Resolved { .. }) => {
                Err(SetupError::DuplicateName { name: name.to_string() })
            }
            Some(Slot::Pending) => {
                self.slots.insert(name.to_string(), Slot::Resolving);
                Ok(true)
            }
            None => {
                self.slots.insert(name.to_string(), Slot::Resolving);
                Ok(false)
            }
        }
    }

    fn complete(&mut self, name: &str, caster: Caster, synthesizes_attrs: bool) {
        tracing::debug!(name, caster = caster.name(), "registered");
        self.slots.insert(name.to_string(), Slot::Resolved { caster, synthesizes_attrs });
    }

    fn abort(&mut self, name: &str, was_pending: bool) {
        if was_pending {
            self.slots.insert(name.to_string(), Slot::Pending);
        } else {
            self.slots.shift_remove(name);
        }
    }

    // ----------------------------- Lookup -------------------------------- //

    pub fn resolve(&self, name: &str) -> Result<Caster, SetupError> {
        match self.slots.get(name) {
            Some(Slot::Resolved { caster, .. }) => Ok(caster.clone()),
            Some(Slot::Resolving) => Err(SetupError::CyclicDefinition { name: name.to_string() }),
            Some(Slot::Pending) => Err(SetupError::ForwardReference { name: name.to_string() }),
            None => Err(SetupError::UnknownType { name: name.to_string() }),
        }
    }

    /// Resolve a target, applying factories for generic ones (`Array<Array<User>>`).
    pub fn resolve_target(&self, target: &Target) -> Result<Caster, SetupError> {
        match target {
            Target::Named(name) => self.resolve(name),
            Target::Generic { tag, arg } => {
                let factory = self.factory(tag)?;
                Ok(factory(self.resolve_target(arg)?))
            }
        }
    }

    pub fn factory(&self, tag: &str) -> Result<&Factory, SetupError> {
        self.factories.get(tag)
            .ok_or_else(|| SetupError::UnknownFactory { tag: tag.to_string() })
    }

    pub fn state(&self, name: &str) -> Option<EntryState> {
        self.slots.get(name).map(Slot::state)
    }

    /// Whether `name` is fully registered.
    pub fn contains(&self, name: &str) -> bool {
        self.state(name) == Some(EntryState::Resolved)
    }

    /// Registered names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter()
            .filter(|(_, slot)| matches!(slot, Slot::Resolved { .. }))
            .map(|(name, _)| name.as_str())
    }

    /// Whether decoding `name` injects an empty `attrs` object.
    pub fn synthesizes_attrs(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Resolved { synthesizes_attrs: true, .. }))
    }

    /// End the setup phase.
    pub fn finish(self) -> Decoder {
        Decoder::new(self)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("slots", &self.slots.iter().map(|(k, s)| (k, s.state())).collect::<Vec<_>>())
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
