//! Component factories by class name.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use shared_types::Instance;

use crate::domain::value::Value;
use crate::ports::outbound::ComponentFactory;

type CreateFn = dyn Fn(Vec<Value>) -> Result<Instance, String> + Send + Sync;
type SetFn = dyn Fn(&Instance, &str, Value) -> Result<(), String> + Send + Sync;
type InvokeFn = dyn Fn(&Instance, &str) -> Result<(), String> + Send + Sync;

/// Class name → factory. Shared by every container of a runtime.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ComponentFactory>>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class_name: impl Into<String>, factory: Arc<dyn ComponentFactory>) {
        self.factories.write().insert(class_name.into(), factory);
    }

    pub fn get(&self, class_name: &str) -> Option<Arc<dyn ComponentFactory>> {
        self.factories.read().get(class_name).cloned()
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.read().contains_key(class_name)
    }
}

/// A factory assembled from closures.
pub struct FnFactory {
    create: Box<CreateFn>,
    set: Option<Box<SetFn>>,
    invoke: Option<Box<InvokeFn>>,
}

impl FnFactory {
    pub fn new(create: impl Fn(Vec<Value>) -> Result<Instance, String> + Send + Sync + 'static) -> Self {
        Self {
            create: Box::new(create),
            set: None,
            invoke: None,
        }
    }

    pub fn with_setter(
        mut self,
        set: impl Fn(&Instance, &str, Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.set = Some(Box::new(set));
        self
    }

    pub fn with_invoker(
        mut self,
        invoke: impl Fn(&Instance, &str) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.invoke = Some(Box::new(invoke));
        self
    }
}

impl ComponentFactory for FnFactory {
    fn create(&self, arguments: Vec<Value>) -> Result<Instance, String> {
        (self.create)(arguments)
    }

    fn set_property(&self, instance: &Instance, name: &str, value: Value) -> Result<(), String> {
        match &self.set {
            Some(set) => set(instance, name, value),
            None => Err(format!("unknown property '{name}'")),
        }
    }

    fn invoke(&self, instance: &Instance, method: &str) -> Result<(), String> {
        match &self.invoke {
            Some(invoke) => invoke(instance, method),
            None => Err(format!("unknown method '{method}'")),
        }
    }
}
