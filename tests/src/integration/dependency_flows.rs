//! # Dependency Flows
//!
//! How a container reacts to external services and namespace handlers that
//! come and go, before and after it has been created.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use shared_types::host::{namespace_filter, NamespaceHandler, ServiceFilter, ServiceRegistry};
    use shared_types::{
        ComponentMetadata, ContainerEventKind, ContainerState, CustomElement, Metadata, ReferenceMetadata,
        ServiceMetadata,
    };

    use crate::integration::fixtures::{description, node, reach, Host, RegistrationLog};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const CACHE_NAMESPACE: &str = "urn:acme:cache";

    /// Turns `<cache id=".."/>` into a `Node` bean.
    struct CacheHandler;

    impl NamespaceHandler for CacheHandler {
        fn namespace(&self) -> &str {
            CACHE_NAMESPACE
        }

        fn parse(&self, element: &CustomElement) -> Result<Vec<ComponentMetadata>, String> {
            let id = element.attributes.get("id").ok_or("cache without id")?;
            Ok(vec![ComponentMetadata::Bean(node(id))])
        }
    }

    fn cache_element(id: &str) -> CustomElement {
        CustomElement {
            namespace: CACHE_NAMESPACE.to_string(),
            name: "cache".to_string(),
            attributes: BTreeMap::from([("id".to_string(), id.to_string())]),
        }
    }

    /// `Api` exported from a bean that injects the `DataSource` reference.
    fn exported_api() -> Vec<ComponentMetadata> {
        vec![
            ComponentMetadata::Reference(ReferenceMetadata::new("db", "DataSource")),
            ComponentMetadata::Service(ServiceMetadata::new(
                "api",
                Metadata::inline(ComponentMetadata::Bean(
                    node("").with_property("db", Metadata::reference("db")),
                )),
                "Api",
            )),
        ]
    }

    // =============================================================================
    // INITIAL DEPENDENCIES
    // =============================================================================

    /// Dependencies available before start never produce a grace period.
    #[tokio::test]
    async fn test_satisfied_dependencies_skip_grace_period() {
        let host = Host::new();
        host.publish("DataSource");

        let container = host.start(1, "com.acme.app", description(exported_api()));
        reach(&container, ContainerState::Created).await;

        assert_eq!(
            host.events.kinds(),
            vec![ContainerEventKind::Creating, ContainerEventKind::Created]
        );
        assert_eq!(host.count("Api"), 1);
    }

    /// A late dependency ends the grace period and the container is created.
    #[tokio::test]
    async fn test_grace_period_ends_when_dependency_arrives() {
        let host = Host::new();
        let container = host.start(1, "com.acme.app", description(exported_api()));
        reach(&container, ContainerState::WaitingForInitialRefs).await;

        let grace = host.events.last(ContainerEventKind::GracePeriod).unwrap();
        assert_eq!(grace.dependencies, vec![ServiceFilter::for_interface("DataSource").to_string()]);
        assert_eq!(host.count("Api"), 0);

        host.publish("DataSource");
        reach(&container, ContainerState::Created).await;
        assert_eq!(host.events.count(ContainerEventKind::GracePeriod), 1);
        assert_eq!(host.events.count(ContainerEventKind::Created), 1);
        assert_eq!(host.count("Api"), 1);
    }

    /// With waiting disabled the container is created at once, and its
    /// services appear only once their references are satisfied.
    #[tokio::test]
    async fn test_not_waiting_creates_immediately() {
        let host = Host::new();
        let container = host.start(
            1,
            "com.acme.app; blueprint.wait-for-dependencies:=false",
            description(exported_api()),
        );
        reach(&container, ContainerState::Created).await;
        assert_eq!(host.events.count(ContainerEventKind::GracePeriod), 0);
        assert_eq!(host.count("Api"), 0);

        host.publish("DataSource");
        assert_eq!(host.count("Api"), 1);
    }

    // =============================================================================
    // FLAPPING DEPENDENCIES
    // =============================================================================

    /// After creation, losing a dependency retracts the export and regaining
    /// it publishes the export again, exactly once per cycle.
    #[tokio::test]
    async fn test_flapping_dependency_never_duplicates_registration() {
        let host = Host::new();
        let api = RegistrationLog::new("Api");
        host.services
            .add_listener(ServiceFilter::for_interface("Api"), api.clone());
        let mut data_source = host.publish("DataSource");

        let container = host.start(1, "com.acme.app", description(exported_api()));
        reach(&container, ContainerState::Created).await;
        assert_eq!(api.registered(), 1);

        for cycle in 1..=3 {
            // Withdrawn before the host's unregister call returns.
            host.services.unregister(data_source).unwrap();
            assert_eq!(host.count("Api"), 0);
            assert_eq!(api.unregistered(), cycle);

            data_source = host.publish("DataSource");
            assert_eq!(host.count("Api"), 1);
            assert_eq!(api.registered(), cycle + 1);
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(host.count("Api"), 1);
        assert_eq!(api.registered(), 4);
        assert_eq!(api.unregistered(), 3);
        assert_eq!(container.state(), ContainerState::Created);
        assert_eq!(host.events.count(ContainerEventKind::Created), 1);
        assert_eq!(host.events.count(ContainerEventKind::GracePeriod), 0);
    }

    /// The export is gone by the time the host's unregister call returns,
    /// whichever thread makes it.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lost_dependency_withdraws_export_synchronously() {
        let host = Arc::new(Host::new());
        let data_source = host.publish("DataSource");
        let container = host.start(1, "com.acme.app", description(exported_api()));
        reach(&container, ContainerState::Created).await;

        let api = host.services.references(&ServiceFilter::for_interface("Api")).remove(0);
        assert!(host.services.get_service(api.id).is_ok());

        let remote = Arc::clone(&host);
        let (visible, lookup) = tokio::task::spawn_blocking(move || {
            remote.services.unregister(data_source).unwrap();
            (remote.count("Api"), remote.services.get_service(api.id).is_ok())
        })
        .await
        .unwrap();
        assert_eq!(visible, 0);
        assert!(!lookup);

        host.publish("DataSource");
        assert_eq!(host.count("Api"), 1);
        assert_eq!(container.state(), ContainerState::Created);
    }

    /// Services without references stay registered while others flap.
    #[tokio::test]
    async fn test_unrelated_service_unaffected_by_flapping() {
        let host = Host::new();
        let data_source = host.publish("DataSource");
        let mut components = exported_api();
        components.push(ComponentMetadata::Service(ServiceMetadata::new(
            "status",
            Metadata::inline(ComponentMetadata::Bean(node(""))),
            "Status",
        )));

        let container = host.start(1, "com.acme.app", description(components));
        reach(&container, ContainerState::Created).await;

        host.services.unregister(data_source).unwrap();
        assert_eq!(host.count("Api"), 0);
        assert_eq!(host.count("Status"), 1);
    }

    // =============================================================================
    // NAMESPACE HANDLERS
    // =============================================================================

    /// A handler that appears 200ms after start yields one grace period,
    /// then the container is created with the handler's components.
    #[tokio::test]
    async fn test_late_namespace_handler() {
        let host = Host::new();
        let mut blueprint = description(vec![ComponentMetadata::Bean(node("plain"))]);
        blueprint.custom_elements.push(cache_element("cache"));

        let container = host.start(1, "com.acme.app", blueprint);
        reach(&container, ContainerState::WaitingForHandlers).await;
        let grace = host.events.last(ContainerEventKind::GracePeriod).unwrap();
        assert_eq!(grace.dependencies, vec![namespace_filter(CACHE_NAMESPACE)]);

        let handlers = Arc::clone(&host.handlers);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            handlers.register_handler(Arc::new(CacheHandler));
        });

        reach(&container, ContainerState::Created).await;
        assert_eq!(
            host.events.kinds(),
            vec![
                ContainerEventKind::Creating,
                ContainerEventKind::GracePeriod,
                ContainerEventKind::Created,
            ]
        );
        let mut ids = container.component_ids();
        ids.sort();
        assert_eq!(ids, vec!["cache", "plain"]);
        assert_eq!(host.created(), 2);
    }
}
