//! Aggregate converter: built-in scalar conversions first, then registered
//! converter components in registration order.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::domain::value::Value;
use crate::ports::outbound::Converter;

#[derive(Default)]
pub struct AggregateConverter {
    converters: RwLock<Vec<Arc<dyn Converter>>>,
}

impl AggregateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, converter: Arc<dyn Converter>) {
        self.converters.write().push(converter);
    }

    pub fn len(&self) -> usize {
        self.converters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.read().is_empty()
    }

    pub fn convert(&self, value: &Value, type_name: &str) -> Result<Value, String> {
        if let Some(result) = convert_builtin(value, type_name) {
            return result;
        }
        let converters = self.converters.read().clone();
        converters
            .iter()
            .find(|c| c.can_convert(value, type_name))
            .map(|c| c.convert(value, type_name))
            .unwrap_or_else(|| Err(format!("no converter for type '{type_name}'")))
    }
}

fn convert_builtin(value: &Value, type_name: &str) -> Option<Result<Value, String>> {
    let text = value.as_text()?;
    let result = match type_name {
        "string" | "String" => Ok(Value::Text(text.to_string())),
        "bool" | "boolean" => match text.trim() {
            "true" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "no" | "off" => Ok(Value::Bool(false)),
            other => Err(format!("'{other}' is not a boolean")),
        },
        "i64" | "int" | "long" => text.trim().parse().map(Value::Int).map_err(|e| e.to_string()),
        "u64" => text.trim().parse().map(Value::UInt).map_err(|e| e.to_string()),
        "f64" | "double" => text.trim().parse().map(Value::Float).map_err(|e| e.to_string()),
        _ => return None,
    };
    Some(result)
}
