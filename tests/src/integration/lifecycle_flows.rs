//! # Lifecycle Flows
//!
//! A container from start to its terminal states:
//!
//! 1. **Creation**: eager singletons are built once, in dependency order
//! 2. **Timeout**: a container whose references never arrive fails exactly once
//! 3. **Destruction**: every registration, tracker and singleton is released

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bp_04_lifecycle::{ContainerConfig, CONTAINER_INTERFACE};
    use shared_types::{
        ComponentMetadata, ContainerError, ContainerEventKind, ContainerState, Metadata, ReferenceMetadata,
        ServiceMetadata,
    };

    use crate::integration::fixtures::{description, node, reach, Host};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// `worker` injects `db` and is exported as `Api`.
    fn worker_with_reference() -> Vec<ComponentMetadata> {
        vec![
            ComponentMetadata::Reference(ReferenceMetadata::new("db", "DataSource")),
            ComponentMetadata::Bean(
                node("worker")
                    .with_property("db", Metadata::reference("db"))
                    .with_init_method("init")
                    .with_destroy_method("close"),
            ),
            ComponentMetadata::Service(ServiceMetadata::new("api", Metadata::reference("worker"), "Api")),
        ]
    }

    // =============================================================================
    // CREATION
    // =============================================================================

    /// Eager singletons are created during activation and never again.
    #[tokio::test]
    async fn test_eager_singletons_memoized() {
        let host = Host::new();
        let container = host.start(
            1,
            "com.acme.app",
            description(vec![
                ComponentMetadata::Bean(node("a").with_init_method("init")),
                ComponentMetadata::Bean(node("b").with_property("a", Metadata::reference("a"))),
            ]),
        );
        reach(&container, ContainerState::Created).await;
        assert_eq!(host.created(), 2);
        assert_eq!(host.journal(), vec!["init"]);

        let a = container.component_instance("a").unwrap();
        assert!(a.ptr_eq(&container.component_instance("a").unwrap()));

        let b = container.component_instance("b").unwrap();
        let b = b.downcast_ref::<crate::integration::fixtures::Node>().unwrap();
        assert!(b.property("a").and_then(|v| v.as_instance()).unwrap().ptr_eq(&a));
        assert_eq!(host.created(), 2);
    }

    /// Directives in the symbolic-name header override the host defaults.
    #[tokio::test(start_paused = true)]
    async fn test_header_timeout_directive_applies() {
        let host = Host::with_config(ContainerConfig {
            timeout: Duration::from_secs(3600),
            ..ContainerConfig::for_testing()
        });
        let container = host.start(1, "com.acme.app; blueprint.timeout:=2000", description(worker_with_reference()));
        reach(&container, ContainerState::Failed).await;

        let failure = host.events.last(ContainerEventKind::Failure).unwrap();
        assert!(matches!(failure.error, Some(ContainerError::Timeout { waited_ms: 2000, .. })));
    }

    // =============================================================================
    // TIMEOUT
    // =============================================================================

    /// An unsatisfied container fails once on timeout, and stays failed.
    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_exactly_once() {
        let host = Host::new();
        let container = host.start(1, "com.acme.app", description(worker_with_reference()));
        reach(&container, ContainerState::Failed).await;

        assert_eq!(
            host.events.kinds(),
            vec![
                ContainerEventKind::Creating,
                ContainerEventKind::GracePeriod,
                ContainerEventKind::Failure,
            ]
        );
        let failure = host.events.last(ContainerEventKind::Failure).unwrap();
        assert!(failure.error.as_ref().is_some_and(ContainerError::is_timeout));
        assert!(failure.dependencies.iter().any(|f| f.contains("DataSource")));

        host.publish("DataSource");
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(host.events.count(ContainerEventKind::Failure), 1);
        assert_eq!(host.events.count(ContainerEventKind::Created), 0);
        assert_eq!(container.state(), ContainerState::Failed);
        assert_eq!(host.count("Api"), 0);
        assert_eq!(host.count(CONTAINER_INTERFACE), 0);
        assert_eq!(host.created(), 0);
    }

    // =============================================================================
    // DESTRUCTION
    // =============================================================================

    /// Destroying a created container unregisters its services, stops its
    /// trackers and destroys its singletons.
    #[tokio::test]
    async fn test_destroy_releases_everything() {
        let host = Host::new();
        host.publish("DataSource");
        let baseline = host.services.listener_count();

        let container = host.start(1, "com.acme.app", description(worker_with_reference()));
        reach(&container, ContainerState::Created).await;
        assert_eq!(host.count("Api"), 1);
        assert_eq!(host.count(CONTAINER_INTERFACE), 1);
        assert!(host.services.listener_count() > baseline);

        container.destroy().await;

        let kinds = host.events.kinds();
        assert_eq!(
            kinds[kinds.len() - 2..],
            [ContainerEventKind::Destroying, ContainerEventKind::Destroyed]
        );
        assert_eq!(host.count("Api"), 0);
        assert_eq!(host.count(CONTAINER_INTERFACE), 0);
        assert_eq!(host.count("DataSource"), 1);
        assert_eq!(host.services.listener_count(), baseline);
        assert_eq!(host.handlers.listener_count(), 0);
        assert_eq!(host.journal(), vec!["init", "close"]);
        assert!(matches!(
            container.component_instance("worker"),
            Err(ContainerError::Destroyed)
        ));
    }

    /// A second destroy neither blocks nor emits events.
    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let host = Host::new();
        let container = host.start(1, "com.acme.app", description(vec![ComponentMetadata::Bean(node("a"))]));
        reach(&container, ContainerState::Created).await;

        container.destroy().await;
        container.destroy().await;
        assert_eq!(host.events.count(ContainerEventKind::Destroyed), 1);
    }
}
