//! Collection behavior through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use spark_objects::{
    Cid, Class, CollectionChange, Config, Error, KeyedCollection, ON_BEFORE_INSERT, ON_INSERT,
    Object, OrderedCollection, Value, base_class, collection_array_class, init_test_tracing,
    reset_runtime,
};

fn setup() {
    init_test_tracing();
    reset_runtime();
}

fn names(coll: &OrderedCollection<Value>) -> Vec<Value> {
    coll.get_array().into_iter().map(|item| item["name"].clone()).collect()
}

#[test]
fn front_inserts_then_remove_last() {
    setup();
    let coll: OrderedCollection<Value> = OrderedCollection::create(Config::new()).unwrap();

    coll.insert(json!({"name": "A"}), Some(0)).unwrap();
    coll.insert(json!({"name": "B"}), Some(0)).unwrap();
    assert_eq!(names(&coll), vec![json!("B"), json!("A")]);

    let removed = coll.remove(-1isize).unwrap();
    assert_eq!(removed["name"], json!("A"));
    assert_eq!(names(&coll), vec![json!("B")]);
    assert_eq!(coll.get_count(), 1);
}

#[test]
fn insert_into_empty_clamps_to_front() {
    setup();
    let coll: OrderedCollection<Value> = OrderedCollection::create(Config::new()).unwrap();
    let received = Rc::new(RefCell::new(Vec::new()));
    let received_clone = received.clone();
    coll.bind_event(
        ON_INSERT,
        move |record, _| {
            let change = record.payload::<CollectionChange<Value>>().unwrap();
            received_clone.borrow_mut().push((
                change.item.clone(),
                change.id.clone(),
                record.get("index"),
            ));
        },
        None,
    );

    let id = coll.insert(json!({"name": "X"}), Some(2)).unwrap().unwrap();

    assert_eq!(
        *received.borrow(),
        vec![(json!({"name": "X"}), id, Some(json!(0)))]
    );
    assert_eq!(coll.index_of(coll.ids()[0].clone()), Some(0));
}

#[test]
fn duplicate_key_leaves_collection_unchanged() {
    setup();
    let coll: KeyedCollection<Value> = KeyedCollection::create(Config::new()).unwrap();
    coll.insert(json!({"cid": "k", "v": 1})).unwrap();

    let err = coll.insert(json!({"cid": "k", "v": 2})).unwrap_err();

    assert!(matches!(err, Error::DuplicateKey { ref id } if id.as_str() == "k"));
    assert_eq!(coll.get_count(), 1);
    assert_eq!(coll.get("k"), Some(json!({"cid": "k", "v": 1})));
}

#[test]
fn ordered_duplicate_keeps_order() {
    setup();
    let coll: OrderedCollection<Value> = OrderedCollection::create(Config::new()).unwrap();
    coll.insert(json!({"cid": "a"}), None).unwrap();
    coll.insert(json!({"cid": "b"}), None).unwrap();

    assert!(coll.insert(json!({"cid": "a"}), Some(0)).is_err());
    assert_eq!(coll.ids(), vec![Cid::from("a"), Cid::from("b")]);
}

#[test]
fn subclass_event_map_sees_collection_events() {
    setup();
    let log = Rc::new(RefCell::new(Vec::new()));
    let log_clone = log.clone();
    let audited = Class::extend(&collection_array_class(), "AuditedArray")
        .on(ON_BEFORE_INSERT, move |_, record, _| {
            if record.get("id") == Some(json!("blocked")) {
                record.prevent_default();
            }
            log_clone.borrow_mut().push(record.get("id"));
        })
        .finish();
    let coll: OrderedCollection<Value> =
        OrderedCollection::with_class(&audited, Config::new()).unwrap();

    assert_eq!(coll.insert(json!({"cid": "blocked"}), None).unwrap(), None);
    assert!(coll.insert(json!({"cid": "ok"}), None).unwrap().is_some());

    assert_eq!(coll.get_count(), 1);
    assert_eq!(*log.borrow(), vec![Some(json!("blocked")), Some(json!("ok"))]);
    assert!(coll.object().class().is_a("CollectionHash"));
}

#[test]
fn listener_context_detaches_on_teardown() {
    setup();
    let coll: KeyedCollection<String> = KeyedCollection::create(Config::new()).unwrap();
    let view = base_class().create(Config::new()).unwrap();
    let hits = Rc::new(RefCell::new(0));
    let hits_clone = hits.clone();
    coll.bind_event(ON_INSERT, move |_, _| *hits_clone.borrow_mut() += 1, Some(&view));

    coll.insert("one".to_string()).unwrap();
    view.teardown();
    coll.insert("two".to_string()).unwrap();

    assert_eq!(*hits.borrow(), 1);
    assert_eq!(coll.get_count(), 2);
}

#[test]
fn parent_teardown_drops_owned_collection() {
    setup();
    let parent = base_class().create(Config::new()).unwrap();
    let coll: OrderedCollection<Value> = OrderedCollection::create(Config::new()).unwrap();
    coll.insert(json!(1), None).unwrap();
    parent.add_child(coll.object());

    parent.teardown();

    assert!(coll.is_empty());
    assert!(coll.ids().is_empty());
    assert!(coll.insert(json!(2), None).is_err());
}

#[test]
fn proxied_change_still_names_its_collection() {
    setup();
    let coll: KeyedCollection<String> = KeyedCollection::create(Config::new()).unwrap();
    let relay = base_class().create(Config::new()).unwrap();
    relay.proxy_events(coll.object(), &[ON_INSERT]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    relay.bind_event(
        ON_INSERT,
        move |record, _| {
            let change = record.payload::<CollectionChange<String>>().unwrap();
            let collection = change.collection.upgrade().unwrap();
            seen_clone
                .borrow_mut()
                .push((record.target().and_then(|t| t.id()), collection));
        },
        None,
    );

    coll.insert("one".to_string()).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, relay.id());
    assert!(Object::ptr_eq(&seen[0].1, coll.object()));
}
