//! Outbound Ports
//!
//! Hooks through which application code takes part in component creation.

use shared_types::Instance;

use crate::domain::value::Value;

/// Constructs beans of one class.
///
/// Properties and lifecycle methods are applied to an already shared
/// instance, so components that accept injection after construction use
/// interior mutability.
pub trait ComponentFactory: Send + Sync {
    fn create(&self, arguments: Vec<Value>) -> Result<Instance, String>;

    fn set_property(&self, _instance: &Instance, name: &str, _value: Value) -> Result<(), String> {
        Err(format!("unknown property '{name}'"))
    }

    /// Run a named init or destroy method.
    fn invoke(&self, _instance: &Instance, method: &str) -> Result<(), String> {
        Err(format!("unknown method '{method}'"))
    }
}

/// Converts literal values to named target types.
///
/// Converter components are discovered at runtime: an instance created for
/// a declared type converter must expose this trait.
pub trait Converter: Send + Sync {
    fn can_convert(&self, value: &Value, type_name: &str) -> bool;

    fn convert(&self, value: &Value, type_name: &str) -> Result<Value, String>;
}

/// Creation hooks run around every bean created after the processor was
/// installed.
pub trait BeanProcessor: Send + Sync {
    fn before_init(&self, _name: &str, instance: Instance) -> Result<Instance, String> {
        Ok(instance)
    }

    fn after_init(&self, _name: &str, instance: Instance) -> Result<Instance, String> {
        Ok(instance)
    }

    fn before_destroy(&self, _name: &str, _instance: &Instance) {}

    fn after_destroy(&self, _name: &str, _instance: &Instance) {}
}
