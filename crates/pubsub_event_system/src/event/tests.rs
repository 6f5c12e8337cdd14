use crate::event::{Event, EventValues};
use serde_json::{json, Value};

#[derive(Debug, PartialEq)]
struct Order {
    id: u32,
}

fn sample_event() -> Event {
    let mut event = Event::with_subject(Order { id: 7 }).with_values([("foo", "bar")]);
    event.set_value("ding", "dong");
    event["mellow"] = json!("yellow");
    event
}

fn collect(event: &Event) -> Vec<(String, Value)> {
    event.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[test]
fn test_construct_keeps_subject_and_value_order() {
    let event = sample_event();

    assert_eq!(event.subject_as::<Order>(), Some(&Order { id: 7 }));
    assert_eq!(
        collect(&event),
        vec![
            ("foo".to_string(), json!("bar")),
            ("ding".to_string(), json!("dong")),
            ("mellow".to_string(), json!("yellow")),
        ]
    );
}

#[test]
fn test_subject_downcast_to_wrong_type() {
    let event = sample_event();
    assert!(event.subject().is_some());
    assert_eq!(event.subject_as::<String>(), None);
    assert!(Event::new().subject().is_none());
}

#[test]
fn test_get_value() {
    let event = sample_event();
    assert_eq!(event.value("foo"), Some(&json!("bar")));
    assert_eq!(event.value("undefined"), None);
    assert_eq!(event["undefined"], Value::Null);
}

#[test]
fn test_set_values_replaces_contents() {
    let mut event = sample_event();
    let mut replacement = EventValues::new();
    replacement.insert("pizza".to_string(), json!("pie"));
    event.set_values(replacement);

    assert_eq!(collect(&event), vec![("pizza".to_string(), json!("pie"))]);
    assert!(!event.has_value("foo"));
}

#[test]
fn test_has_value_and_is_set() {
    let mut event = sample_event();
    event.set_value("nothing", Value::Null);

    assert!(event.has_value("foo"));
    assert!(!event.has_value("waldo"));
    assert!(event.has_value("nothing"));
    assert!(!event.is_set("nothing"));
    assert!(event.is_set("foo"));
}

#[test]
fn test_remove_value_preserves_order() {
    let mut event = sample_event();
    assert_eq!(event.remove_value("foo"), Some(json!("bar")));
    assert_eq!(event.remove_value("undefined"), None);

    let keys: Vec<&String> = event.values().keys().collect();
    assert_eq!(keys, vec!["ding", "mellow"]);
}

#[test]
fn test_push_assigns_next_integer_key() {
    let mut event = Event::new();
    assert_eq!(event.push("a"), "0");
    assert_eq!(event.push("b"), "1");
    event.set_value("9", "nine");
    event.set_value("name", "x");
    assert_eq!(event.push("c"), "10");
    assert_eq!(event["10"], json!("c"));
}

#[test]
fn test_push_ignores_non_canonical_keys() {
    let mut event = Event::new().with_values([("007", "bond"), ("-4", "neg")]);
    assert_eq!(event.push("first"), "0");
}

#[test]
fn test_index_mut_inserts_missing_key() {
    let mut event = Event::new();
    event["counter"] = json!(1);
    if let Some(n) = event["counter"].as_i64() {
        event["counter"] = json!(n + 1);
    }
    assert_eq!(event.value("counter"), Some(&json!(2)));
}

#[test]
fn test_into_iterator_for_reference() {
    let event = sample_event();
    let mut keys = Vec::new();
    for (key, _) in &event {
        keys.push(key.as_str());
    }
    assert_eq!(keys, vec!["foo", "ding", "mellow"]);
}

#[test]
fn test_propagation_flag() {
    let mut event = sample_event();
    assert!(!event.is_propagation_stopped());
    event.stop_propagation();
    assert!(event.is_propagation_stopped());
    event.stop_propagation();
    assert!(event.is_propagation_stopped());
}

#[test]
fn test_debug_output_lists_values() {
    let rendered = format!("{:?}", sample_event());
    assert!(rendered.contains("propagation_stopped: false"));
    assert!(rendered.contains("mellow"));
}
