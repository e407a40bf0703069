//! Resolved injection values.

use std::fmt;
use std::sync::{Arc, OnceLock};

use shared_types::Instance;

/// Placeholder for a component whose construction is still in progress on
/// the current creation path. Resolves once that construction completes.
#[derive(Clone)]
pub struct ForwardRef {
    name: String,
    cell: Arc<OnceLock<Instance>>,
}

impl ForwardRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The target instance, once its construction has finished.
    pub fn resolve(&self) -> Option<Instance> {
        self.cell.get().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Complete the placeholder. Later calls are ignored.
    pub(crate) fn complete(&self, instance: Instance) {
        let _ = self.cell.set(instance);
    }
}

impl fmt::Debug for ForwardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardRef")
            .field("name", &self.name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// A value handed to a component factory.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Text(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Component(Instance),
    /// A component on the current creation cycle.
    Forward(ForwardRef),
}

impl Value {
    /// The referenced instance, resolving forward references when possible.
    pub fn as_instance(&self) -> Option<Instance> {
        match self {
            Self::Component(instance) => Some(instance.clone()),
            Self::Forward(forward) => forward.resolve(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short rendering used in conversion errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::Text(t) => t.clone(),
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::UInt(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::List(items) => format!("list[{}]", items.len()),
            Self::Map(entries) => format!("map[{}]", entries.len()),
            Self::Component(i) => format!("{i:?}"),
            Self::Forward(f) => format!("forward({})", f.name()),
        }
    }
}
