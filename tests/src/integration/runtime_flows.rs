//! # Runtime Flows
//!
//! Containers hosted by `ContainerRuntime`, loaded from a JSON deployment
//! document, with lifecycle events fanned out through the dispatcher and
//! mirrored onto the event bus.
//!
//! ## Flow Tested
//!
//! 1. **consumer** starts first and waits for the `Api` service
//! 2. **provider** starts and exports `Api`
//! 3. **consumer** leaves its grace period and exports `Report`
//! 4. Stopping **provider** retracts `Report` without failing **consumer**

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bp_03_recipe_graph::FnFactory;
    use container_runtime::{ContainerRuntime, DeploymentDocument, JsonDescriptionParser, RuntimeConfig};
    use shared_bus::{keys, EventFilter, EventTopic, Subscription};
    use shared_types::{ContainerState, Instance};

    use crate::integration::fixtures::EventLog;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const PROVIDER: u64 = 1;
    const CONSUMER: u64 = 2;

    const DOCUMENT: &str = r#"{
        "modules": [
            { "id": 1, "symbolic_name": "com.acme.provider", "version": "1.0.0",
              "description": { "components": [
                  { "type": "bean", "id": "impl", "class_name": "Unit" },
                  { "type": "service", "id": "api", "interfaces": ["Api"],
                    "service_component": { "kind": "ref", "component_id": "impl" } }
              ] } },
            { "id": 2, "symbolic_name": "com.acme.consumer; blueprint.timeout:=30000", "version": "2.0.0",
              "description": { "components": [
                  { "type": "reference", "id": "api", "interface": "Api" },
                  { "type": "bean", "id": "reporter", "class_name": "Unit",
                    "properties": [ { "name": "api", "value": { "kind": "ref", "component_id": "api" } } ] },
                  { "type": "service", "id": "report", "interfaces": ["Report"],
                    "service_component": { "kind": "ref", "component_id": "reporter" } }
              ] } }
        ]
    }"#;

    fn runtime() -> (ContainerRuntime, DeploymentDocument) {
        let document = DeploymentDocument::from_json(DOCUMENT).unwrap();
        let parser = Arc::new(JsonDescriptionParser::new(document.clone()));
        let runtime = ContainerRuntime::new(RuntimeConfig::for_testing(), parser);
        runtime.factories().register(
            "Unit",
            Arc::new(FnFactory::new(|_| Ok(Instance::new(()))).with_setter(|_, _, _| Ok(()))),
        );
        (runtime, document)
    }

    fn count(runtime: &ContainerRuntime, interface: &str) -> usize {
        use shared_types::host::{ServiceFilter, ServiceRegistry};
        runtime.services().references(&ServiceFilter::for_interface(interface)).len()
    }

    async fn next_topic(subscription: &mut Subscription) -> EventTopic {
        tokio::time::timeout(Duration::from_secs(10), subscription.recv())
            .await
            .expect("bus event not published in time")
            .expect("bus closed")
            .topic
    }

    // =============================================================================
    // CROSS-MODULE DEPENDENCIES
    // =============================================================================

    /// A consumer waits for a service exported by another hosted module.
    #[tokio::test]
    async fn test_consumer_waits_for_provider() {
        let (runtime, document) = runtime();
        let modules = document.modules();
        let events = Arc::new(EventLog::default());
        runtime.dispatcher().add_listener(events.clone());
        let mut consumer_topics = runtime.bus().subscribe(EventFilter::for_module(CONSUMER));

        let consumer = runtime.start_module(modules[1].clone()).unwrap();
        assert_eq!(next_topic(&mut consumer_topics).await, EventTopic::Creating);
        assert_eq!(next_topic(&mut consumer_topics).await, EventTopic::GracePeriod);
        assert_eq!(count(&runtime, "Report"), 0);

        runtime.start_module(modules[0].clone()).unwrap();
        assert_eq!(next_topic(&mut consumer_topics).await, EventTopic::Created);
        assert_eq!(consumer.state(), ContainerState::Created);
        assert_eq!(count(&runtime, "Api"), 1);
        assert_eq!(count(&runtime, "Report"), 1);

        assert!(runtime.stop_module(PROVIDER).await);
        assert_eq!(count(&runtime, "Report"), 0);
        assert_eq!(consumer.state(), ContainerState::Created);

        runtime.shutdown().await;
        assert_eq!(next_topic(&mut consumer_topics).await, EventTopic::Destroying);
        assert_eq!(next_topic(&mut consumer_topics).await, EventTopic::Destroyed);
        assert_eq!(runtime.services().service_count(), 0);
        assert_eq!(events.count(shared_types::ContainerEventKind::Destroyed), 2);
    }

    // =============================================================================
    // REPORTING
    // =============================================================================

    /// Module statuses serialize for operators, and failures carry their
    /// cause onto the bus.
    #[tokio::test(start_paused = true)]
    async fn test_statuses_and_failure_reporting() {
        let (runtime, document) = runtime();
        let mut failures = runtime.bus().subscribe(EventFilter::topics(vec![EventTopic::Failure]));

        let consumer = runtime.start_module(document.modules()[1].clone()).unwrap();
        let failure = tokio::time::timeout(Duration::from_secs(60), failures.recv())
            .await
            .expect("consumer did not time out")
            .expect("bus closed");
        assert_eq!(failure.module_id, CONSUMER);
        assert!(failure.properties[keys::EXCEPTION]
            .as_str()
            .is_some_and(|e| e.contains("30000")));
        assert_eq!(consumer.state(), ContainerState::Failed);

        let statuses = serde_json::to_value(runtime.statuses()).unwrap();
        assert_eq!(statuses[0]["module_id"], CONSUMER);
        assert_eq!(statuses[0]["symbolic_name"], "com.acme.consumer");
        assert_eq!(statuses[0]["state"], "Failed");

        runtime.shutdown().await;
    }
}
