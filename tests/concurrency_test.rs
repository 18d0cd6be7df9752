use samyama_bind::binding::{
    BindingRegistry, ContainerKind, DescriptorRegistry, Instance, PropertySpec, TypeDescriptor,
    Value, ValueKind,
};
use samyama_bind::rdf::{NamedNode, RdfSubject};
use samyama_bind::store::MemoryRepository;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const PEOPLE: &str = "http://example.org/people/";

fn setup() -> (MemoryRepository, Arc<BindingRegistry>, Arc<TypeDescriptor>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
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
                .property(PropertySpec::scalar(
                    "parent",
                    "http://example.org/parent",
                    ValueKind::Object("Person".into()),
                ))
                .property(
                    PropertySpec::collection(
                        "children",
                        "http://example.org/parent",
                        ValueKind::Object("Person".into()),
                    )
                    .inverse(),
                )
                .build()
                .unwrap(),
        )
        .unwrap();
    let repo = MemoryRepository::new();
    let registry = BindingRegistry::new(Arc::new(repo.clone()), descriptors).unwrap();
    (repo, Arc::new(registry), person)
}

fn node(id: &str) -> RdfSubject {
    NamedNode::new(&format!("{}{}", PEOPLE, id)).unwrap().into()
}

#[test]
fn test_parallel_writers_on_distinct_nodes() {
    let (_repo, registry, person) = setup();
    let threads = 8;
    let per_thread = 25;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let person = Arc::clone(&person);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let id = format!("p{}_{}", t, i);
                    let object = Instance::with_id(Arc::clone(&person), id.as_str()).unwrap();
                    object.set("name", format!("Person {}", id)).unwrap();
                    object.set("age", i as i64).unwrap();
                    object.set("nick", vec![format!("{}a", id), format!("{}b", id)]).unwrap();
                    registry.add(&object).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let all: Vec<Instance> = registry
        .get_all("Person")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(all.len(), threads * per_thread);

    let sample = registry.get(&node("p3_7")).unwrap().unwrap();
    assert_eq!(sample.get("name").unwrap(), Value::from("Person p3_7"));
    assert_eq!(sample.get("age").unwrap(), Value::Integer(7));
    assert_eq!(sample.get("nick").unwrap(), Value::from(vec!["p3_7a", "p3_7b"]));
}

#[test]
fn test_readers_never_see_half_written_updates() {
    let (_repo, registry, person) = setup();

    let initial = Instance::with_id(Arc::clone(&person), "shared").unwrap();
    initial.set("name", "v0").unwrap();
    initial.set("age", 0).unwrap();
    initial.set("nick", vec!["v0", "v0"]).unwrap();
    registry.add(&initial).unwrap();

    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let registry = Arc::clone(&registry);
            let person = Arc::clone(&person);
            thread::spawn(move || {
                for i in 0..50 {
                    let version = w * 1000 + i;
                    let object = Instance::with_id(Arc::clone(&person), "shared").unwrap();
                    object.set("name", format!("v{}", version)).unwrap();
                    object.set("age", version as i64).unwrap();
                    let label = format!("v{}", version);
                    object.set("nick", vec![label.clone(), label]).unwrap();
                    registry.update(&object).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut reads = 0;
                while !done.load(Ordering::SeqCst) || reads == 0 {
                    let object = registry.get(&node("shared")).unwrap().unwrap();
                    let name = object.get("name").unwrap();
                    let age = object.get("age").unwrap().as_integer().unwrap();
                    assert_eq!(name, Value::from(format!("v{}", age)));
                    assert_eq!(object.get("nick").unwrap(), Value::from(vec![name.clone(), name]));
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn test_readers_never_see_rolled_back_updates() {
    let (_repo, registry, person) = setup();

    let stored = Instance::with_id(Arc::clone(&person), "stable").unwrap();
    stored.set("name", "kept").unwrap();
    stored.set("nick", vec!["a", "b"]).unwrap();
    registry.add(&stored).unwrap();

    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..2)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let person = Arc::clone(&person);
            thread::spawn(move || {
                for i in 0..50 {
                    // Clears the node, then fails on the scalar
                    let object = Instance::with_id(Arc::clone(&person), "stable").unwrap();
                    object.set("nick", vec![format!("n{}", i)]).unwrap();
                    object.set("name", vec!["two", "names"]).unwrap();
                    assert!(registry.update(&object).is_err());
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut reads = 0;
                while !done.load(Ordering::SeqCst) || reads == 0 {
                    let object = registry.get(&node("stable")).unwrap().unwrap();
                    assert_eq!(object.get("name").unwrap(), Value::from("kept"));
                    assert_eq!(object.get("nick").unwrap(), Value::from(vec!["a", "b"]));
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn test_concurrent_children_of_one_parent() {
    let (repo, registry, person) = setup();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let person = Arc::clone(&person);
            thread::spawn(move || {
                // Every thread holds its own in-memory copy of the parent
                let parent = Instance::with_id(Arc::clone(&person), "parent").unwrap();
                parent.set("name", "Parent").unwrap();
                let child = Instance::with_id(Arc::clone(&person), format!("child{}", t)).unwrap();
                child.set("parent", &parent).unwrap();
                registry.add(&child).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let parent = registry.get(&node("parent")).unwrap().unwrap();
    assert_eq!(parent.get("children").unwrap().as_list().unwrap().len(), 8);

    // The parent was written exactly once
    let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
    assert_eq!(
        repo.query(&samyama_bind::rdf::StatementPattern::forward(&node("parent"), &name), &[])
            .len(),
        1
    );
}

#[test]
fn test_proxies_shared_across_threads() {
    let (_repo, registry, _person) = setup();
    let proxy = registry.create(&node("counter"), "Person").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let proxy = registry.get_proxy(&node("counter"), None).unwrap().unwrap();
                for i in 0..20 {
                    proxy.set("nick", vec![format!("t{}", t), format!("i{}", i)]).unwrap();
                    let nick = proxy.get("nick").unwrap();
                    assert_eq!(nick.as_list().unwrap().len(), 2);
                }
                proxy
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), proxy);
    }
}

#[test]
fn test_idle_locks_pruned_on_close() {
    let (_repo, registry, person) = setup();
    for i in 0..10 {
        let object = Instance::with_id(Arc::clone(&person), format!("p{}", i)).unwrap();
        registry.add(&object).unwrap();
    }
    assert!(registry.lock_count() >= 10);

    registry.close();
    assert!(registry.is_closed());
    assert_eq!(registry.lock_count(), 0);
    assert!(registry.get(&node("p1")).is_err());
}
