//! # Recipe Graph Benchmarks
//!
//! | Stage | Input | Expectation |
//! |-------|-------|-------------|
//! | Recipe build | chain of N beans | linear in N |
//! | Eager creation | chain of N beans | linear in N |
//! | Cycle resolution | N mutually referencing pairs | linear in N |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use bp_01_definition_registry::ComponentDefinitionRegistry;
use bp_03_recipe_graph::{FactoryRegistry, FnFactory, RecipeBuilder, Repository};
use shared_types::host::InMemoryServiceRegistry;
use shared_types::{BeanMetadata, ComponentMetadata, Instance, Metadata};

const SIZES: [usize; 3] = [10, 100, 1000];

fn factories() -> Arc<FactoryRegistry> {
    let factories = Arc::new(FactoryRegistry::new());
    factories.register(
        "Node",
        Arc::new(FnFactory::new(|_| Ok(Instance::new(()))).with_setter(|_, _, _| Ok(()))),
    );
    factories
}

/// `bean-0 ← bean-1 ← ... ← bean-(n-1)`, each injecting its predecessor.
fn chain(n: usize) -> ComponentDefinitionRegistry {
    let mut definitions = ComponentDefinitionRegistry::new();
    for i in 0..n {
        let mut bean = BeanMetadata::new(format!("bean-{i}"), "Node");
        if i > 0 {
            bean = bean.with_property("previous", Metadata::reference(format!("bean-{}", i - 1)));
        }
        let _ = definitions.register(ComponentMetadata::Bean(bean));
    }
    definitions
}

/// `n` pairs of beans that reference each other.
fn pairs(n: usize) -> ComponentDefinitionRegistry {
    let mut definitions = ComponentDefinitionRegistry::new();
    for i in 0..n {
        let (left, right) = (format!("left-{i}"), format!("right-{i}"));
        let _ = definitions.register(ComponentMetadata::Bean(
            BeanMetadata::new(left.clone(), "Node").with_property("peer", Metadata::reference(right.clone())),
        ));
        let _ = definitions.register(ComponentMetadata::Bean(
            BeanMetadata::new(right, "Node").with_property("peer", Metadata::reference(left)),
        ));
    }
    definitions
}

fn bench_recipe_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("recipe-build");
    let services = Arc::new(InMemoryServiceRegistry::new());

    for size in SIZES {
        let definitions = chain(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("chain", size), &definitions, |b, definitions| {
            b.iter(|| black_box(RecipeBuilder::new(services.clone()).build(definitions).is_ok()))
        });
    }

    group.finish();
}

fn bench_eager_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("eager-creation");
    let services = Arc::new(InMemoryServiceRegistry::new());
    let factories = factories();

    for (label, definitions) in SIZES
        .iter()
        .flat_map(|&size| [(format!("chain/{size}"), chain(size)), (format!("pairs/{size}"), pairs(size / 2))])
    {
        let names = definitions.names().to_vec();
        group.throughput(Throughput::Elements(names.len() as u64));
        group.bench_function(label, |b| {
            b.iter(|| {
                let set = RecipeBuilder::new(services.clone())
                    .build(&definitions)
                    .expect("benchmark definitions are valid");
                let repository = Repository::new(set, Arc::clone(&factories));
                black_box(repository.create_all(&names).map(|instances| instances.len()))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_recipe_build, bench_eager_creation);
criterion_main!(benches);
