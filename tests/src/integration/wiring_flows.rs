//! # Wiring Flows
//!
//! Instance graphs built by a created container: mutual references between
//! singletons, explicit ordering, prototypes and concurrent lookups.

#[cfg(test)]
mod tests {
    use shared_types::{ComponentMetadata, ContainerState, Metadata, Scope};

    use crate::integration::fixtures::{description, node, reach, Host, Node};

    // =============================================================================
    // CYCLES
    // =============================================================================

    /// Two eager singletons that reference each other are both created, and
    /// each sees the other's final instance.
    #[tokio::test]
    async fn test_mutual_references_between_singletons() {
        let host = Host::new();
        let container = host.start(
            1,
            "com.acme.app",
            description(vec![
                ComponentMetadata::Bean(node("a").with_property("peer", Metadata::reference("b"))),
                ComponentMetadata::Bean(node("b").with_property("peer", Metadata::reference("a"))),
            ]),
        );
        reach(&container, ContainerState::Created).await;
        assert_eq!(host.created(), 2);

        let a = container.component_instance("a").unwrap();
        let b = container.component_instance("b").unwrap();
        let a_peer = a.downcast_ref::<Node>().unwrap().property("peer").unwrap();
        let b_peer = b.downcast_ref::<Node>().unwrap().property("peer").unwrap();
        assert!(a_peer.as_instance().unwrap().ptr_eq(&b));
        assert!(b_peer.as_instance().unwrap().ptr_eq(&a));
    }

    /// Prototypes on a cycle cannot be built and fail the container.
    #[tokio::test]
    async fn test_prototype_cycle_fails_container() {
        let host = Host::new();
        let container = host.start(
            1,
            "com.acme.app",
            description(vec![
                ComponentMetadata::Bean(
                    node("a")
                        .with_scope(Scope::Prototype)
                        .with_property("peer", Metadata::reference("b")),
                ),
                ComponentMetadata::Bean(
                    node("b")
                        .with_scope(Scope::Prototype)
                        .with_property("peer", Metadata::reference("a")),
                ),
                ComponentMetadata::Bean(node("root").with_property("a", Metadata::reference("a"))),
            ]),
        );
        reach(&container, ContainerState::Failed).await;
    }

    // =============================================================================
    // ORDERING AND SCOPES
    // =============================================================================

    /// `depends_on` orders initialisation regardless of declaration order.
    #[tokio::test]
    async fn test_depends_on_orders_initialisation() {
        let host = Host::new();
        let container = host.start(
            1,
            "com.acme.app",
            description(vec![
                ComponentMetadata::Bean(node("b").with_init_method("b.init").depends_on("a")),
                ComponentMetadata::Bean(node("a").with_init_method("a.init")),
            ]),
        );
        reach(&container, ContainerState::Created).await;
        assert_eq!(host.journal(), vec!["a.init", "b.init"]);
    }

    /// Each lookup of a prototype yields a fresh instance.
    #[tokio::test]
    async fn test_prototype_fresh_per_lookup() {
        let host = Host::new();
        let container = host.start(
            1,
            "com.acme.app",
            description(vec![ComponentMetadata::Bean(
                node("p").with_scope(Scope::Prototype),
            )]),
        );
        reach(&container, ContainerState::Created).await;
        assert_eq!(host.created(), 0);

        let first = container.component_instance("p").unwrap();
        let second = container.component_instance("p").unwrap();
        assert!(!first.ptr_eq(&second));
        assert_eq!(host.created(), 2);
    }

    // =============================================================================
    // CONCURRENT LOOKUPS
    // =============================================================================

    /// Concurrent first lookups of a lazy singleton build it once and all
    /// observe the same instance.
    #[tokio::test]
    async fn test_concurrent_lookups_build_once() {
        let host = Host::new();
        let container = host.start(
            1,
            "com.acme.app",
            description(vec![ComponentMetadata::Bean(
                shared_types::BeanMetadata::new("shared", "SlowNode").lazy(),
            )]),
        );
        reach(&container, ContainerState::Created).await;

        let instances: Vec<_> = std::thread::scope(|scope| {
            let lookups: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| container.component_instance("shared").unwrap()))
                .collect();
            lookups.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(host.created(), 1);
        assert!(instances.iter().all(|i| i.ptr_eq(&instances[0])));
    }
}
