//! End-to-end invocations against the in-memory host
//!
//! ## Test Categories
//!
//! 1. Scenario A - Avatar with and without a `name → initials` alias
//! 2. Scenario B - Button with renamed variant and inner-text label
//! 3. NotFound - no matching tag leaves the document untouched
//! 4. Partial failures - rejected batch, missing text layers

use pretty_assertions::assert_eq;
use tagbind::host::{ComponentSpec, LayerSpec, MemoryHost, Mutation};
use tagbind::asset::AssetOutcome;
use tagbind::binding::SlotFailure;
use tagbind::{BindRequest, Config, EventKind, Host, NodeKind, Orchestrator, PropertyKind, PropertyValue};

// ============================================================================
// TEST HELPERS
// ============================================================================

fn avatar_document() -> MemoryHost {
    let host = MemoryHost::new();
    host.add_component(
        &ComponentSpec::new("Avatar")
            .variant("size", &["small", "medium", "large"])
            .property("✏️ initials#1", PropertyKind::Text)
            .layer(LayerSpec::text("Initials", "AB").bound("✏️ initials#1"))
            .layer(LayerSpec::new("Avatar image", NodeKind::Ellipse)),
    );
    host
}

fn button_document() -> MemoryHost {
    let host = MemoryHost::new();
    host.add_component(
        &ComponentSpec::new("Button")
            .variant("size", &["s", "m", "l"])
            .variant("type", &["contained", "outlined", "text"])
            .property("icon L", PropertyKind::Boolean)
            .property("icon R", PropertyKind::Boolean)
            .property("✏️ label#12:0", PropertyKind::Text)
            .layer(
                LayerSpec::new("Content", NodeKind::Frame)
                    .child(LayerSpec::text("Label", "Button").bound("✏️ label#12:0")),
            ),
    );
    host
}

fn orchestrator_with(yaml: &str) -> Orchestrator {
    Orchestrator::new(Config::from_yaml(yaml).unwrap()).unwrap()
}

fn orchestrator() -> Orchestrator {
    Orchestrator::new(Config::default()).unwrap()
}

fn text_of(host: &MemoryHost, instance: &tagbind::NodeId, layer: &str) -> String {
    let node = host.node_by_name(instance, layer).unwrap();
    host.text(&node).unwrap()
}

// ============================================================================
// SCENARIO A
// ============================================================================

#[tokio::test]
async fn scenario_a_name_is_unresolved_without_alias() {
    let host = avatar_document();
    let report = orchestrator()
        .run(&host, &BindRequest::new(r#"<Avatar name="Jo" size="large" />"#, "avatar"))
        .await;

    assert!(report.completed, "{}", report.status);
    let instance = report.instance.clone().unwrap();

    assert_eq!(report.outcome.assignments_applied, vec!["size"]);
    assert_eq!(report.outcome.unresolved_keys, vec!["name"]);
    assert_eq!(host.property_value(&instance, "size"), Some(PropertyValue::from("large")));
    assert_eq!(text_of(&host, &instance, "Initials"), "AB");
    assert!(report.status.contains("Unresolved: name"));
}

#[tokio::test]
async fn scenario_a_alias_routes_name_to_initials() {
    let host = avatar_document();
    let orchestrator = orchestrator_with(
        r#"
components:
  - name: avatar
    aliases:
      name: initials
"#,
    );
    let report = orchestrator
        .run(&host, &BindRequest::new(r#"<Avatar name="Jo" size="large" />"#, "avatar"))
        .await;

    assert!(report.completed, "{}", report.status);
    let instance = report.instance.clone().unwrap();

    assert_eq!(report.outcome.assignments_applied, vec!["size", "name"]);
    assert!(report.outcome.unresolved_keys.is_empty());
    assert_eq!(text_of(&host, &instance, "Initials"), "Jo");

    // simple batch lands before any text write
    let mutations = host.mutations();
    let batch = mutations
        .iter()
        .position(|m| matches!(m, Mutation::PropertiesSet { .. }))
        .unwrap();
    let text = mutations
        .iter()
        .position(|m| matches!(m, Mutation::TextSet { .. }))
        .unwrap();
    assert!(batch < text);
}

// ============================================================================
// SCENARIO B
// ============================================================================

#[tokio::test]
async fn scenario_b_button_variant_and_label() {
    let host = button_document();
    let report = orchestrator()
        .run(&host, &BindRequest::new(r#"<Button variant="contained">Go</Button>"#, "button"))
        .await;

    assert!(report.completed, "{}", report.status);
    let instance = report.instance.clone().unwrap();

    assert_eq!(host.property_value(&instance, "type"), Some(PropertyValue::from("contained")));
    assert_eq!(text_of(&host, &instance, "Label"), "Go");
    assert_eq!(report.outcome.assignments_applied, vec!["type", "✏️ label"]);
}

#[tokio::test]
async fn scenario_b_icons_become_boolean_properties() {
    let host = button_document();
    let code = r#"<Button
  iconL={<Plus />}
  iconR={<ArrowRight />}
  size="m"
  variant="contained"
>
  Button
</Button>"#;
    let report = orchestrator().run(&host, &BindRequest::new(code, "")).await;

    assert!(report.completed, "{}", report.status);
    let instance = report.instance.clone().unwrap();
    assert_eq!(host.property_value(&instance, "icon L"), Some(PropertyValue::Boolean(true)));
    assert_eq!(host.property_value(&instance, "icon R"), Some(PropertyValue::Boolean(true)));
    assert_eq!(host.property_value(&instance, "size"), Some(PropertyValue::from("m")));
}

// ============================================================================
// NOT FOUND
// ============================================================================

#[tokio::test]
async fn missing_tag_has_no_side_effects() {
    let host = avatar_document();
    let report = orchestrator()
        .run(&host, &BindRequest::new(r#"<Card title="x" />"#, "avatar"))
        .await;

    assert!(!report.completed);
    assert!(report.status.starts_with("No Avatar component found in the pasted code."));
    assert!(report.status.contains(r#"<Avatar name="John Doe" size="large" />"#));

    assert!(host.mutations().is_empty());
    assert!(host.selection().is_empty());
    assert_eq!(host.closed(), None);
    assert_eq!(host.notices().len(), 1);
    assert!(host.notices()[0].error);
}

#[tokio::test]
async fn unknown_component_type_is_reported() {
    let host = avatar_document();
    let report = orchestrator()
        .run(&host, &BindRequest::new("<Chip />", "chip"))
        .await;

    assert!(!report.completed);
    assert!(report.status.contains("Unknown component type 'chip'"));
    assert!(host.mutations().is_empty());
}

// ============================================================================
// PARTIAL FAILURES
// ============================================================================

#[tokio::test]
async fn rejected_batch_does_not_stop_free_text() {
    let host = button_document().rejecting_properties("variant value not allowed");
    let report = orchestrator()
        .run(&host, &BindRequest::new(r#"<Button variant="ghost">Go</Button>"#, "button"))
        .await;

    assert!(report.completed, "{}", report.status);
    let instance = report.instance.clone().unwrap();

    assert_eq!(report.properties_error.as_deref(), Some("variant value not allowed"));
    assert_eq!(report.outcome.assignments_applied, vec!["✏️ label"]);
    assert_eq!(text_of(&host, &instance, "Label"), "Go");
    assert!(report.status.contains("Properties not applied: variant value not allowed"));
    assert!(report
        .events
        .events()
        .iter()
        .any(|e| matches!(e.kind, EventKind::PropertiesRejected { .. })));
}

#[tokio::test]
async fn invalid_variant_rejects_batch_through_host_validation() {
    let host = avatar_document();
    let report = orchestrator()
        .run(&host, &BindRequest::new(r#"<Avatar size="huge" />"#, "avatar"))
        .await;

    assert!(report.completed);
    assert!(report.properties_error.as_deref().is_some_and(|e| e.contains("huge")));
    assert!(report.outcome.assignments_applied.is_empty());
}

#[tokio::test]
async fn zero_text_layers_is_reported() {
    let host = MemoryHost::new();
    host.add_component(
        &ComponentSpec::new("Button")
            .property("✏️ label#1", PropertyKind::Text)
            .layer(LayerSpec::new("Background", NodeKind::Rectangle)),
    );
    let report = orchestrator()
        .run(&host, &BindRequest::new("<Button>Save</Button>", "button"))
        .await;

    assert!(report.completed);
    assert!(report.status.contains("No text layers found; could not set: ✏️ label"));
}

#[tokio::test]
async fn first_of_three_untagged_slots_receives_text() {
    let host = MemoryHost::new();
    host.add_component(
        &ComponentSpec::new("Avatar")
            .property("✏️ initials#1", PropertyKind::Text)
            .layer(LayerSpec::text("One", "1"))
            .layer(LayerSpec::text("Two", "2"))
            .layer(LayerSpec::text("Three", "3")),
    );
    let orchestrator = orchestrator_with("components:\n  - name: avatar\n    aliases:\n      name: initials\n");
    let report = orchestrator
        .run(&host, &BindRequest::new(r#"<Avatar name="Jo" />"#, "avatar"))
        .await;

    let instance = report.instance.clone().unwrap();
    assert_eq!(text_of(&host, &instance, "One"), "Jo");
    assert_eq!(text_of(&host, &instance, "Two"), "2");
    assert_eq!(text_of(&host, &instance, "Three"), "3");
}

#[tokio::test]
async fn decoding_twice_gives_identical_reports() {
    let code = r#"<Avatar name="Jo" size='large' showStatus />"#;
    let a = orchestrator().run(&avatar_document(), &BindRequest::new(code, "avatar")).await;
    let b = orchestrator().run(&avatar_document(), &BindRequest::new(code, "avatar")).await;
    assert_eq!(a.props, b.props);
    assert_eq!(a.status, b.status);
}

#[tokio::test]
async fn unresolvable_slot_lookup_keeps_the_invocation_going() {
    let host = button_document().rejecting_lookups("layers unavailable");
    let report = orchestrator()
        .run(&host, &BindRequest::new(r#"<Button size="m">Go</Button>"#, "button"))
        .await;

    assert!(report.completed, "{}", report.status);
    let instance = report.instance.clone().unwrap();
    assert_eq!(report.outcome.assignments_applied, vec!["size"]);
    assert_eq!(host.property_value(&instance, "size"), Some(PropertyValue::from("m")));
    assert_eq!(
        report.outcome.slot_failures,
        vec![SlotFailure::Lookup {
            key: "✏️ label".into(),
            reason: "layers unavailable".into(),
        }]
    );
    assert!(report.status.contains("could not list text layers: layers unavailable"));
    assert_eq!(host.closed(), Some(Some(report.status.clone())));
}

// ============================================================================
// URL-VALUED PROPERTIES
// ============================================================================

#[tokio::test]
async fn url_matching_a_text_property_is_bound_not_fetched() {
    let host = MemoryHost::new();
    host.add_component(
        &ComponentSpec::new("Avatar")
            .property("✏️ link#1", PropertyKind::Text)
            .layer(LayerSpec::text("Link", "-").bound("✏️ link#1")),
    );
    let report = orchestrator()
        .run(&host, &BindRequest::new(r#"<Avatar link="http://127.0.0.1:9/profile" />"#, "avatar"))
        .await;

    assert!(report.completed, "{}", report.status);
    let instance = report.instance.clone().unwrap();
    assert_eq!(report.outcome.assignments_applied, vec!["link"]);
    assert!(report.outcome.unresolved_keys.is_empty());
    assert_eq!(report.asset, None);
    assert_eq!(text_of(&host, &instance, "Link"), "http://127.0.0.1:9/profile");
}

#[tokio::test]
async fn unclaimed_url_is_used_as_the_image() {
    let host = avatar_document();
    let report = orchestrator()
        .run(&host, &BindRequest::new(r#"<Avatar picture="http://127.0.0.1:9/jo.png" />"#, "avatar"))
        .await;

    assert!(report.completed, "{}", report.status);
    assert!(matches!(report.asset, Some(AssetOutcome::FetchFailed { .. })));
    assert!(report.outcome.unresolved_keys.is_empty());
}

// ============================================================================
// DETECTION
// ============================================================================

#[tokio::test]
async fn bare_tag_is_detected_without_a_selected_type() {
    let host = button_document();
    let report = orchestrator()
        .run(&host, &BindRequest::new("<Button>Go</Button>", ""))
        .await;

    assert!(report.completed, "{}", report.status);
    assert_eq!(report.component_type.as_deref(), Some("button"));
    let instance = report.instance.clone().unwrap();
    assert_eq!(text_of(&host, &instance, "Label"), "Go");
}
