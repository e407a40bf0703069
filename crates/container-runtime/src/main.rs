//! # Blueprint Container Runtime
//!
//! Hosts one blueprint container per module listed in a deployment
//! document.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Install the log subscriber
//! 3. Load the deployment document (`BP_DESCRIPTION`, or the built-in demo)
//! 4. Start one container per module
//! 5. Run until Ctrl+C, then destroy every container
//!
//! The demo document declares a greeter that needs a `demo.Clock` service.
//! The clock is published a second after startup, so the greeter module
//! passes through a grace period before it is created.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::info;

use bp_03_recipe_graph::{FactoryRegistry, FnFactory};
use container_runtime::{init_logging, ContainerRuntime, DeploymentDocument, JsonDescriptionParser, RuntimeConfig};
use shared_types::host::{ServiceProperties, ServiceRegistry, SingletonServiceFactory};
use shared_types::Instance;

const DEMO_DOCUMENT: &str = r#"{
    "modules": [
        {
            "id": 1,
            "symbolic_name": "demo.greeter; blueprint.timeout:=30000",
            "version": "1.0.0",
            "description": {
                "components": [
                    { "type": "reference", "id": "clock", "interface": "demo.Clock" },
                    { "type": "bean", "id": "greeter", "class_name": "demo.Record",
                      "init_method": "init", "destroy_method": "close",
                      "properties": [
                          { "name": "message", "value": { "kind": "value", "value": "hello" } },
                          { "name": "clock", "value": { "kind": "ref", "component_id": "clock" } }
                      ] },
                    { "type": "service", "id": "greeterService", "interfaces": ["demo.Greeter"],
                      "service_component": { "kind": "ref", "component_id": "greeter" } }
                ]
            }
        },
        {
            "id": 2,
            "symbolic_name": "demo.settings",
            "version": "1.0.0",
            "description": {
                "components": [
                    { "type": "bean", "id": "settings", "class_name": "demo.Record",
                      "properties": [
                          { "name": "retries", "value": { "kind": "value", "value": "3", "type_name": "i64" } }
                      ] }
                ]
            }
        }
    ]
}"#;

/// Bean class of the demo: remembers every injected property.
#[derive(Default)]
struct Record {
    values: Mutex<BTreeMap<String, String>>,
}

fn register_demo_factories(factories: &FactoryRegistry) {
    let record = FnFactory::new(|_| Ok(Instance::new(Record::default())))
        .with_setter(|instance, name, value| {
            let record = instance.downcast_ref::<Record>().ok_or("not a record")?;
            record.values.lock().insert(name.to_string(), value.describe());
            Ok(())
        })
        .with_invoker(|instance, method| {
            let record = instance.downcast_ref::<Record>().ok_or("not a record")?;
            info!(method, values = ?record.values.lock(), "[Demo] Record lifecycle method");
            Ok(())
        });
    factories.register("demo.Record", Arc::new(record));
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();
    init_logging(&config.log_level)?;

    let document = match &config.description {
        Some(path) => DeploymentDocument::from_path(path)
            .with_context(|| format!("Failed to load deployment document {}", path.display()))?,
        None => DeploymentDocument::from_json(DEMO_DOCUMENT).context("Built-in demo document is invalid")?,
    };
    let demo = config.description.is_none();

    info!("===========================================");
    info!("  Blueprint Container Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let parser = Arc::new(JsonDescriptionParser::new(document.clone()));
    let runtime = ContainerRuntime::new(config, parser);
    register_demo_factories(runtime.factories());

    for module in document.modules() {
        runtime.start_module(module)?;
    }

    if demo {
        let services = Arc::clone(runtime.services());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            info!("[Demo] Publishing demo.Clock");
            services.register(
                vec!["demo.Clock".to_string()],
                Arc::new(SingletonServiceFactory(Instance::new(std::time::SystemTime::now()))),
                ServiceProperties::new(),
                0,
            );
        });
    }

    info!("Runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    for status in runtime.statuses() {
        info!(module = %status.symbolic_name, state = %status.state, "Container state at shutdown");
    }
    runtime.shutdown().await;

    Ok(())
}
