//! # Repository
//!
//! Owns every recipe and every materialised singleton of one container.
//!
//! Creation runs under a single re-entrant lock. A second thread asking
//! for a component under construction waits for the lock and then finds
//! the finished instance. The creating thread itself, re-entering a name
//! that is still in progress, receives a forward reference instead.
//!
//! When the outermost `create` fails, every singleton that attempt created
//! is destroyed again, so a retry starts from the same state. A panic in a
//! factory, converter or processor is reported as a failed creation.

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use bp_02_dependency_tracker::{Satisfiable, SatisfiableDependencies};
use shared_types::Instance;

use super::builder::RecipeSet;
use super::service_handle::ServiceRegistrationHandle;
use crate::adapters::converters::AggregateConverter;
use crate::adapters::factories::FactoryRegistry;
use crate::adapters::proxies::{ReferenceListProxy, ReferenceProxy};
use crate::domain::errors::RecipeError;
use crate::domain::recipe::{BeanRecipe, Recipe, RecipeKind, ValueRecipe};
use crate::domain::value::{ForwardRef, Value};
use crate::ports::outbound::BeanProcessor;

enum Slot {
    InProgress(ForwardRef),
    Ready(Instance),
}

/// One name on the creation path. Dropping it leaves the path, and drops
/// the name's in-progress slot unless the instance was finished, so an
/// unwinding creation leaves nothing behind.
struct PathFrame<'a> {
    repository: &'a Repository,
    name: String,
    pending_slot: bool,
}

impl PathFrame<'_> {
    fn finish(&mut self) {
        self.pending_slot = false;
    }
}

impl Drop for PathFrame<'_> {
    fn drop(&mut self) {
        self.repository.creation.lock().borrow_mut().stack.pop();
        if self.pending_slot {
            self.repository.slots.lock().remove(&self.name);
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}

#[derive(Default)]
struct CreationContext {
    depth: usize,
    /// Names on the current creation path, innermost last.
    stack: Vec<String>,
    /// Singletons finished during the current outermost attempt.
    created_in_attempt: Vec<String>,
}

pub struct Repository {
    recipes: RwLock<HashMap<String, Arc<Recipe>>>,
    top_level: RwLock<Vec<String>>,
    slots: Mutex<HashMap<String, Slot>>,
    creation: ReentrantMutex<RefCell<CreationContext>>,
    created: Mutex<Vec<String>>,
    converter: AggregateConverter,
    processors: RwLock<Vec<Arc<dyn BeanProcessor>>>,
    factories: Arc<FactoryRegistry>,
    destroyed: AtomicBool,
}

impl Repository {
    pub fn new(set: RecipeSet, factories: Arc<FactoryRegistry>) -> Arc<Self> {
        let recipes = set
            .recipes
            .into_iter()
            .map(|r| (r.name.clone(), Arc::new(r)))
            .collect();
        Arc::new(Self {
            recipes: RwLock::new(recipes),
            top_level: RwLock::new(set.top_level),
            slots: Mutex::new(HashMap::new()),
            creation: ReentrantMutex::new(RefCell::new(CreationContext::default())),
            created: Mutex::new(Vec::new()),
            converter: AggregateConverter::new(),
            processors: RwLock::new(Vec::new()),
            factories,
            destroyed: AtomicBool::new(false),
        })
    }

    // =========================================================================
    // Recipes
    // =========================================================================

    /// Top-level component names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.top_level.read().clone()
    }

    pub fn recipe(&self, name: &str) -> Option<Arc<Recipe>> {
        self.recipes.read().get(name).cloned()
    }

    /// Add or replace one recipe. Refused once the name is materialised.
    pub fn put_recipe(&self, recipe: Recipe) -> bool {
        if self.is_materialized(&recipe.name) {
            return false;
        }
        self.recipes.write().insert(recipe.name.clone(), Arc::new(recipe));
        true
    }

    /// Take over a rebuilt recipe set. Materialised names keep their
    /// current recipe. Returns the number of recipes taken over.
    pub fn replace_recipes(&self, set: RecipeSet) -> usize {
        let mut replaced = 0;
        for recipe in set.recipes {
            if self.put_recipe(recipe) {
                replaced += 1;
            }
        }
        *self.top_level.write() = set.top_level;
        debug!(replaced, "[Repository] Recipes rebuilt");
        replaced
    }

    pub fn converter(&self) -> &AggregateConverter {
        &self.converter
    }

    /// Install a processor for every bean created from now on.
    pub fn add_processor(&self, processor: Arc<dyn BeanProcessor>) {
        self.processors.write().push(processor);
    }

    pub fn processor_count(&self) -> usize {
        self.processors.read().len()
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// The finished singleton, without creating it.
    pub fn instance(&self, name: &str) -> Option<Instance> {
        match self.slots.lock().get(name) {
            Some(Slot::Ready(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    pub fn is_materialized(&self, name: &str) -> bool {
        self.slots.lock().contains_key(name)
    }

    /// Singleton names in creation order.
    pub fn creation_order(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    pub fn create(&self, name: &str) -> Result<Instance, RecipeError> {
        if let Some(instance) = self.instance(name) {
            return Ok(instance);
        }
        let value = self.with_creation(|| self.resolve(name))?;
        value
            .as_instance()
            .ok_or_else(|| RecipeError::UnresolvedForward(name.to_string()))
    }

    /// Create several components, stopping at the first failure.
    pub fn create_all(&self, names: &[String]) -> Result<Vec<Instance>, RecipeError> {
        names.iter().map(|name| self.create(name)).collect()
    }

    /// Evaluate a value recipe, creating whatever it references.
    pub fn evaluate(&self, recipe: &ValueRecipe) -> Result<Value, RecipeError> {
        self.with_creation(|| self.evaluate_in(recipe))
    }

    fn with_creation<T>(&self, f: impl FnOnce() -> Result<T, RecipeError>) -> Result<T, RecipeError> {
        let guard = self.creation.lock();
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(RecipeError::Destroyed);
        }
        let outermost = {
            let mut ctx = guard.borrow_mut();
            ctx.depth += 1;
            ctx.depth == 1
        };

        let result = f();

        let attempt = {
            let mut ctx = guard.borrow_mut();
            ctx.depth -= 1;
            if outermost {
                ctx.stack.clear();
                std::mem::take(&mut ctx.created_in_attempt)
            } else {
                Vec::new()
            }
        };
        if outermost && result.is_err() && !attempt.is_empty() {
            self.rollback(&attempt);
        }
        result
    }

    fn resolve(&self, name: &str) -> Result<Value, RecipeError> {
        match self.slots.lock().get(name) {
            Some(Slot::Ready(instance)) => return Ok(Value::Component(instance.clone())),
            Some(Slot::InProgress(forward)) => return Ok(Value::Forward(forward.clone())),
            None => {}
        }
        let recipe = self
            .recipe(name)
            .ok_or_else(|| RecipeError::NoSuchComponent(name.to_string()))?;

        if recipe.is_prototype() {
            if self.on_stack(name) {
                return Err(RecipeError::CircularPrototype(name.to_string()));
            }
            let _frame = self.enter(name, false);
            return self.instantiate(&recipe).map(Value::Component);
        }

        let forward = ForwardRef::new(name);
        self.slots
            .lock()
            .insert(name.to_string(), Slot::InProgress(forward.clone()));
        let mut frame = self.enter(name, true);
        debug!(component = name, "[Repository] Creating component");

        let instance = recipe
            .depends_on
            .iter()
            .try_for_each(|dependency| self.resolve(dependency).map(|_| ()))
            .and_then(|()| self.instantiate(&recipe))?;

        forward.complete(instance.clone());
        self.slots
            .lock()
            .insert(name.to_string(), Slot::Ready(instance.clone()));
        frame.finish();
        self.created.lock().push(name.to_string());
        self.creation
            .lock()
            .borrow_mut()
            .created_in_attempt
            .push(name.to_string());
        Ok(Value::Component(instance))
    }

    fn on_stack(&self, name: &str) -> bool {
        self.creation.lock().borrow().stack.iter().any(|n| n == name)
    }

    fn enter(&self, name: &str, pending_slot: bool) -> PathFrame<'_> {
        self.creation.lock().borrow_mut().stack.push(name.to_string());
        PathFrame {
            repository: self,
            name: name.to_string(),
            pending_slot,
        }
    }

    fn instantiate(&self, recipe: &Recipe) -> Result<Instance, RecipeError> {
        match &recipe.kind {
            RecipeKind::Bean(bean) => self.instantiate_bean(&recipe.name, bean),
            RecipeKind::Reference(tracker) => Ok(Instance::new(ReferenceProxy::new(Arc::clone(tracker)))),
            RecipeKind::ReferenceList(tracker) => {
                Ok(Instance::new(ReferenceListProxy::new(Arc::clone(tracker))))
            }
            RecipeKind::Service(handle) => Ok(Instance::from_arc(Arc::clone(handle))),
        }
    }

    fn instantiate_bean(&self, name: &str, bean: &BeanRecipe) -> Result<Instance, RecipeError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.build_bean(name, bean))).unwrap_or_else(|payload| {
            let reason = panic_reason(&*payload);
            warn!(component = name, reason = %reason, "[Repository] Factory panicked");
            Err(RecipeError::instantiation(name, format!("panicked: {reason}")))
        })
    }

    fn build_bean(&self, name: &str, bean: &BeanRecipe) -> Result<Instance, RecipeError> {
        let factory = self
            .factories
            .get(&bean.class_name)
            .ok_or_else(|| RecipeError::UnknownFactory(bean.class_name.clone()))?;

        let arguments = bean
            .arguments
            .iter()
            .map(|a| self.evaluate_in(a))
            .collect::<Result<Vec<_>, _>>()?;
        let mut instance = factory
            .create(arguments)
            .map_err(|e| RecipeError::instantiation(name, e))?;

        for (property, recipe) in &bean.properties {
            let value = self.evaluate_in(recipe)?;
            factory
                .set_property(&instance, property, value)
                .map_err(|e| RecipeError::instantiation(name, e))?;
        }

        let processors = self.processors.read().clone();
        for processor in &processors {
            instance = processor
                .before_init(name, instance)
                .map_err(|e| RecipeError::instantiation(name, e))?;
        }
        if let Some(method) = &bean.init_method {
            factory
                .invoke(&instance, method)
                .map_err(|e| RecipeError::instantiation(name, e))?;
        }
        for processor in &processors {
            instance = processor
                .after_init(name, instance)
                .map_err(|e| RecipeError::instantiation(name, e))?;
        }
        Ok(instance)
    }

    fn evaluate_in(&self, recipe: &ValueRecipe) -> Result<Value, RecipeError> {
        Ok(match recipe {
            ValueRecipe::Null => Value::Null,
            ValueRecipe::Value { value, type_name: None } => Value::Text(value.clone()),
            ValueRecipe::Value {
                value,
                type_name: Some(type_name),
            } => panic::catch_unwind(AssertUnwindSafe(|| {
                self.converter.convert(&Value::Text(value.clone()), type_name)
            }))
            .unwrap_or_else(|payload| Err(format!("converter panicked: {}", panic_reason(&*payload))))
            .map_err(|reason| RecipeError::Conversion {
                    value: value.clone(),
                    type_name: type_name.clone(),
                    reason,
                })?,
            ValueRecipe::Ref(name) | ValueRecipe::Inline(name) => self.resolve(name)?,
            ValueRecipe::IdRef(name) => Value::Text(name.clone()),
            ValueRecipe::List(items) => Value::List(
                items
                    .iter()
                    .map(|i| self.evaluate_in(i))
                    .collect::<Result<_, _>>()?,
            ),
            ValueRecipe::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((self.evaluate_in(k)?, self.evaluate_in(v)?)))
                    .collect::<Result<_, RecipeError>>()?,
            ),
        })
    }

    // =========================================================================
    // Dependencies and services
    // =========================================================================

    /// Satisfiable units each top-level component depends on directly:
    /// its own tracker, references it names, and anything reachable through
    /// its inline components.
    pub fn satisfiable_dependencies(&self) -> SatisfiableDependencies {
        let mut dependencies = SatisfiableDependencies::new();
        for name in self.names() {
            let mut found = Vec::new();
            if let Some(recipe) = self.recipe(&name) {
                self.collect_satisfiables(&recipe, &mut found);
            }
            dependencies.insert(name, found);
        }
        dependencies
    }

    fn collect_satisfiables(&self, recipe: &Recipe, found: &mut Vec<Arc<dyn Satisfiable>>) {
        if let Some(tracker) = recipe.tracker() {
            found.push(Arc::clone(tracker) as Arc<dyn Satisfiable>);
        }
        for dependency in &recipe.depends_on {
            self.collect_reference(dependency, found);
        }
        for value in recipe.nested_values() {
            self.collect_value(value, found);
        }
    }

    fn collect_value(&self, value: &ValueRecipe, found: &mut Vec<Arc<dyn Satisfiable>>) {
        match value {
            ValueRecipe::Ref(name) => self.collect_reference(name, found),
            ValueRecipe::Inline(name) => {
                if let Some(recipe) = self.recipe(name) {
                    self.collect_satisfiables(&recipe, found);
                }
            }
            ValueRecipe::List(items) => items.iter().for_each(|i| self.collect_value(i, found)),
            ValueRecipe::Map(entries) => entries.iter().for_each(|(k, v)| {
                self.collect_value(k, found);
                self.collect_value(v, found);
            }),
            ValueRecipe::Null | ValueRecipe::Value { .. } | ValueRecipe::IdRef(_) => {}
        }
    }

    fn collect_reference(&self, name: &str, found: &mut Vec<Arc<dyn Satisfiable>>) {
        if let Some(tracker) = self.recipe(name).as_deref().and_then(Recipe::tracker) {
            found.push(Arc::clone(tracker) as Arc<dyn Satisfiable>);
        }
    }

    /// Registration handles of top-level service components.
    pub fn service_handles(&self) -> Vec<(String, Arc<ServiceRegistrationHandle>)> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                let handle = self.recipe(&name)?.service_handle().cloned()?;
                Some((name, handle))
            })
            .collect()
    }

    // =========================================================================
    // Destruction
    // =========================================================================

    /// Destroy every singleton in reverse creation order. Later calls and
    /// later creation attempts are no-ops or errors respectively.
    pub fn destroy(&self) {
        let _guard = self.creation.lock();
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let order = std::mem::take(&mut *self.created.lock());
        debug!(count = order.len(), "[Repository] Destroying singletons");
        for name in order.iter().rev() {
            self.destroy_instance(name);
        }
        self.slots.lock().clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn rollback(&self, names: &[String]) {
        warn!(count = names.len(), "[Repository] Creation failed, rolling back");
        for name in names.iter().rev() {
            self.destroy_instance(name);
            self.created.lock().retain(|n| n != name);
        }
    }

    fn destroy_instance(&self, name: &str) {
        let instance = match self.slots.lock().remove(name) {
            Some(Slot::Ready(instance)) => instance,
            _ => return,
        };
        let Some(recipe) = self.recipe(name) else {
            return;
        };
        let RecipeKind::Bean(bean) = &recipe.kind else {
            return;
        };

        let teardown = panic::catch_unwind(AssertUnwindSafe(|| {
            let processors = self.processors.read().clone();
            for processor in &processors {
                processor.before_destroy(name, &instance);
            }
            if let Some(method) = &bean.destroy_method {
                let outcome = self
                    .factories
                    .get(&bean.class_name)
                    .ok_or_else(|| format!("no factory for '{}'", bean.class_name))
                    .and_then(|factory| factory.invoke(&instance, method));
                if let Err(e) = outcome {
                    warn!(component = name, method = %method, error = %e, "[Repository] Destroy method failed");
                }
            }
            for processor in &processors {
                processor.after_destroy(name, &instance);
            }
        }));
        if let Err(payload) = teardown {
            warn!(component = name, reason = %panic_reason(&*payload), "[Repository] Teardown panicked");
        }
    }
}
