use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use samyama_bind::binding::{
    BindingRegistry, ContainerKind, DescriptorRegistry, Instance, PropertySpec, TypeDescriptor,
    ValueKind,
};
use samyama_bind::rdf::{NamedNode, RdfSubject};
use samyama_bind::store::MemoryRepository;
use std::sync::Arc;

const PEOPLE: &str = "http://example.org/people/";

fn setup() -> (BindingRegistry, Arc<TypeDescriptor>) {
    let descriptors = Arc::new(DescriptorRegistry::new());
    let person = descriptors
        .register(
            TypeDescriptor::builder("Person", "foaf:Person")
                .subject("id")
                .namespace(PEOPLE)
                .property(PropertySpec::scalar("name", "foaf:name", ValueKind::String))
                .property(PropertySpec::scalar("age", "foaf:age", ValueKind::Integer))
                .property(
                    PropertySpec::collection("nick", "foaf:nick", ValueKind::String)
                        .container(ContainerKind::Seq),
                )
                .property(PropertySpec::collection(
                    "knows",
                    "foaf:knows",
                    ValueKind::Object("Person".into()),
                ))
                .build()
                .unwrap(),
        )
        .unwrap();
    let registry = BindingRegistry::new(Arc::new(MemoryRepository::new()), descriptors).unwrap();
    (registry, person)
}

/// A chain p0 -> p1 -> ... of `size` people
fn chain(person: &Arc<TypeDescriptor>, size: usize) -> Instance {
    let people: Vec<Instance> = (0..size)
        .map(|i| {
            let p = Instance::with_id(Arc::clone(person), format!("p{}", i)).unwrap();
            p.set("name", format!("Person{}", i)).unwrap();
            p.set("age", (i % 100) as i64).unwrap();
            p.set("nick", vec![format!("n{}", i), format!("m{}", i)]).unwrap();
            p
        })
        .collect();
    for pair in people.windows(2) {
        pair[0].set("knows", vec![pair[1].clone()]).unwrap();
    }
    people[0].clone()
}

fn node(id: &str) -> RdfSubject {
    NamedNode::new(&format!("{}{}", PEOPLE, id)).unwrap().into()
}

/// Benchmark writing an object graph
fn bench_marshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal");

    for size in [10, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let (registry, person) = setup();
            let root = chain(&person, size);
            b.iter(|| {
                registry.update(&root).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark rebuilding an object graph
fn bench_unmarshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("unmarshal");

    for size in [10, 100, 500].iter() {
        let (registry, person) = setup();
        registry.add(&chain(&person, *size)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let object = registry.get(&node("p0")).unwrap();
                criterion::black_box(object);
            });
        });
    }
    group.finish();
}

/// Benchmark single-property proxy access
fn bench_proxy(c: &mut Criterion) {
    let mut group = c.benchmark_group("proxy");
    let (registry, _person) = setup();
    let proxy = registry.create(&node("john"), "Person").unwrap();
    proxy.set("name", "John").unwrap();

    group.bench_function("get", |b| {
        b.iter(|| criterion::black_box(proxy.get("name").unwrap()));
    });
    group.bench_function("set", |b| {
        b.iter(|| proxy.set("nick", vec!["a", "b", "c"]).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_marshal, bench_unmarshal, bench_proxy);
criterion_main!(benches);
