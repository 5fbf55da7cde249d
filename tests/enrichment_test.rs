use logstash_forwarder::domain::{ContainerIdentity, EnrichedMessage, LogRecord, UNKNOWN_LOG_ID};
use logstash_forwarder::enricher::{INJECTED_KEYS, MessageEnricher, SequenceGenerator, TagResolver};
use serde_json::{Value, json};
use std::sync::Arc;

fn container(id: &str, env: &[&str]) -> Arc<ContainerIdentity> {
    Arc::new(
        ContainerIdentity::new(id, format!("/{id}-name"))
            .with_image("registry.local/app:2.1")
            .with_hostname(format!("{id}-host"))
            .with_env(env.iter().copied()),
    )
}

fn enricher_with(sequence: Arc<SequenceGenerator>) -> MessageEnricher {
    MessageEnricher::new(Arc::new(TagResolver::new()), sequence)
}

fn enrich(enricher: &MessageEnricher, data: &str, container: &Arc<ContainerIdentity>) -> Value {
    let record = LogRecord::new(data, "stdout", container.clone());
    let bytes = enricher.enrich(&record).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn test_plain_text_keeps_message_verbatim() {
    let enricher = enricher_with(Arc::new(SequenceGenerator::new()));
    let c = container("c1", &[]);

    let doc = enrich(&enricher, "hello", &c);
    assert_eq!(doc["message"], "hello");
    assert_eq!(doc["logid"], UNKNOWN_LOG_ID);

    let doc = enrich(&enricher, "quote \" and \\ backslash\ttab", &c);
    assert_eq!(doc["message"], "quote \" and \\ backslash\ttab");
}

#[test]
fn test_structured_payload_is_merged_with_logid_and_sequence() {
    let enricher = enricher_with(Arc::new(SequenceGenerator::new()));
    let c = container("c1", &["LOGID=abc"]);

    let first = enrich(&enricher, r#"{"a":1}"#, &c);
    let second = enrich(&enricher, r#"{"a":2}"#, &c);

    assert_eq!(first["a"], 1);
    assert_eq!(first["logid"], "abc");
    let first_seq: u64 = first["sequence"].as_str().unwrap().parse().unwrap();
    let second_seq: u64 = second["sequence"].as_str().unwrap().parse().unwrap();
    assert_eq!(second_seq, first_seq + 1);
}

#[test]
fn test_sequence_is_global_across_containers() {
    let enricher = enricher_with(Arc::new(SequenceGenerator::starting_at(100)));
    let billing = container("billing", &["LOGID=billing"]);
    let quiet = container("quiet", &[]);
    let search = container("search", &["LOGID=search"]);

    let a = enrich(&enricher, "a", &billing);
    let skipped = enrich(&enricher, "b", &quiet);
    let c = enrich(&enricher, r#"{"c":true}"#, &search);
    let d = enrich(&enricher, "d", &billing);

    assert_eq!(a["sequence"], "101");
    assert!(skipped.get("sequence").is_none());
    assert_eq!(c["sequence"], "102");
    assert_eq!(d["sequence"], "103");
}

#[test]
fn test_sequence_is_shared_between_enrichers() {
    let sequence = Arc::new(SequenceGenerator::new());
    let first_route = enricher_with(sequence.clone());
    let second_route = enricher_with(sequence.clone());
    let c = container("c1", &["LOGID=x"]);

    assert_eq!(enrich(&first_route, "one", &c)["sequence"], "1");
    assert_eq!(enrich(&second_route, "two", &c)["sequence"], "2");
    assert_eq!(sequence.current(), 2);
}

#[test]
fn test_empty_line_takes_unstructured_path() {
    let enricher = enricher_with(Arc::new(SequenceGenerator::new()));
    let doc = enrich(&enricher, "", &container("c1", &[]));

    assert_eq!(doc["message"], "");
    assert_eq!(doc["stream"], "stdout");
}

#[test]
fn test_missing_env_keys_use_defaults() {
    let enricher = enricher_with(Arc::new(SequenceGenerator::new()));
    let doc = enrich(&enricher, "line", &container("c1", &["HOME=/root"]));

    assert_eq!(doc["logid"], "UNKNOWN");
    assert_eq!(doc["type"], "");
    assert_eq!(doc["taskId"], "");
    assert_eq!(doc["tags"], json!([]));
    assert!(doc.get("sequence").is_none());
}

#[test]
fn test_type_and_task_id_from_environment() {
    let enricher = enricher_with(Arc::new(SequenceGenerator::new()));
    let c = container(
        "c1",
        &["TYPE=nginx-access", "MESOS_TASK_ID=web.5f1c", "LOGSTASH_TAGS=edge,eu-west"],
    );

    for data in ["plain", r#"{"status":200}"#] {
        let doc = enrich(&enricher, data, &c);
        assert_eq!(doc["type"], "nginx-access");
        assert_eq!(doc["taskId"], "web.5f1c");
        assert_eq!(doc["tags"], json!(["edge", "eu-west"]));
    }
}

#[test]
fn test_injected_fields_overwrite_payload_fields() {
    let enricher = enricher_with(Arc::new(SequenceGenerator::new()));
    let c = container("c1", &["LOGID=real", "TYPE=real-type"]);
    let payload = json!({
        "docker": "spoofed",
        "tags": ["spoofed"],
        "stream": "spoofed",
        "docker_name": "spoofed",
        "docker_id": "spoofed",
        "docker_hostname": "spoofed",
        "docker_image": "spoofed",
        "logid": "spoofed",
        "type": "spoofed",
        "taskId": "spoofed",
        "sequence": "spoofed",
        "kept": "untouched"
    })
    .to_string();

    let doc = enrich(&enricher, &payload, &c);

    assert_eq!(doc["docker"]["id"], "c1");
    assert_eq!(doc["tags"], json!([]));
    assert_eq!(doc["stream"], "stdout");
    assert_eq!(doc["docker_name"], "/c1-name");
    assert_eq!(doc["docker_id"], "c1");
    assert_eq!(doc["docker_hostname"], "c1-host");
    assert_eq!(doc["docker_image"], "registry.local/app:2.1");
    assert_eq!(doc["logid"], "real");
    assert_eq!(doc["type"], "real-type");
    assert_eq!(doc["taskId"], "");
    assert_eq!(doc["sequence"], "1");
    assert_eq!(doc["kept"], "untouched");
    for key in INJECTED_KEYS {
        assert_ne!(doc[key], "spoofed", "{key} was not overwritten");
    }
}

#[test]
fn test_payload_sequence_kept_without_logid() {
    let enricher = enricher_with(Arc::new(SequenceGenerator::new()));
    let doc = enrich(&enricher, r#"{"sequence":"app-7"}"#, &container("c1", &[]));

    assert_eq!(doc["sequence"], "app-7");
    assert_eq!(doc["logid"], UNKNOWN_LOG_ID);
}

#[test]
fn test_documented_fields_and_types() {
    let enricher = enricher_with(Arc::new(SequenceGenerator::new()));
    let doc = enrich(
        &enricher,
        "typed",
        &container("c1", &["LOGID=id", "LOGSTASH_TAGS=a,b"]),
    );

    let object = doc.as_object().unwrap();
    for key in [
        "message",
        "stream",
        "docker_name",
        "docker_id",
        "docker_image",
        "docker_hostname",
        "logid",
        "sequence",
        "type",
        "taskId",
    ] {
        assert!(object[key].is_string(), "{key} should be a string");
    }
    for key in ["name", "id", "image", "hostname"] {
        assert!(object["docker"][key].is_string(), "docker.{key} should be a string");
    }
    assert!(
        object["tags"]
            .as_array()
            .unwrap()
            .iter()
            .all(Value::is_string)
    );

    let decoded: EnrichedMessage = serde_json::from_value(doc).unwrap();
    assert_eq!(decoded.docker.hostname, "c1-host");
    assert_eq!(decoded.tags, vec!["a", "b"]);
    assert_eq!(decoded.sequence.as_deref(), Some("1"));
}

#[test]
fn test_tag_resolution_scans_environment_once() {
    let resolver = Arc::new(TagResolver::new());
    let enricher = MessageEnricher::new(resolver.clone(), Arc::new(SequenceGenerator::new()));
    let c = container("c1", &["LOGSTASH_TAGS=a,b,c"]);

    for _ in 0..25 {
        let doc = enrich(&enricher, "line", &c);
        assert_eq!(doc["tags"], json!(["a", "b", "c"]));
    }

    assert_eq!(resolver.scan_count(), 1);
    assert_eq!(resolver.len(), 1);
}
