//! Orchestrator - one binding invocation end to end
//!
//! ```text
//! BindRequest → validate → profile (selected or detected)
//!             → extract_tag → decode → find component → create instance
//!             → resolve → set_properties (batch) → bind free text
//!             → apply image → select + notify + close
//!             → InvocationReport
//! ```
//!
//! Nothing escapes [`Orchestrator::run`]: every error becomes a status string
//! and an error toast, and the host session stays alive.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::asset::{find_image_url, find_url_among, AssetFetcher, AssetOutcome};
use crate::binding::{bind, BindingOutcome, SlotFailure};
use crate::component::{detect, ComponentProfile};
use crate::config::Config;
use crate::error::BindError;
use crate::event_log::{EventKind, EventLog};
use crate::host::{Host, NodeId, NodeKind, Notice};
use crate::markup::{decode_tag, extract_tag, PropertyBag};
use crate::schema::{resolve, RejectedKey};

/// What the form hands over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindRequest {
    pub markup: String,
    /// Lowercase component type; empty means auto-detect
    #[serde(default)]
    pub component_type: String,
}

impl BindRequest {
    pub fn new(markup: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            component_type: component_type.into(),
        }
    }
}

/// Result of one invocation
#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    /// Human-readable status
    pub status: String,
    /// The instance was created and every stage ran
    pub completed: bool,
    pub component_type: Option<String>,
    pub instance: Option<NodeId>,
    pub props: Option<PropertyBag>,
    pub outcome: BindingOutcome,
    pub rejected: Vec<RejectedKey>,
    /// Host error for the simple-property batch
    pub properties_error: Option<String>,
    pub asset: Option<AssetOutcome>,
    /// Coded error message when the invocation stopped early
    pub error: Option<String>,
    /// Stage-by-stage trace of the invocation
    pub events: EventLog,
}

impl InvocationReport {
    fn new(events: EventLog) -> Self {
        Self {
            status: String::new(),
            completed: false,
            component_type: None,
            instance: None,
            props: None,
            outcome: BindingOutcome::default(),
            rejected: Vec::new(),
            properties_error: None,
            asset: None,
            error: None,
            events,
        }
    }
}

/// Runs invocations against a host
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Config,
    profiles: Vec<ComponentProfile>,
    fetcher: AssetFetcher,
}

impl Orchestrator {
    pub fn new(config: Config) -> Result<Self, BindError> {
        let fetcher = AssetFetcher::new(&config)?;
        Ok(Self {
            profiles: config.profiles(),
            config,
            fetcher,
        })
    }

    pub fn profiles(&self) -> &[ComponentProfile] {
        &self.profiles
    }

    /// Run one invocation; never fails
    #[instrument(skip_all, fields(component_type = %request.component_type))]
    pub async fn run(&self, host: &dyn Host, request: &BindRequest) -> InvocationReport {
        let events = EventLog::new();
        events.emit(EventKind::InvocationStarted {
            component_type: Some(request.component_type.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            markup_len: request.markup.len(),
        });

        let mut report = InvocationReport::new(events.clone());
        match self.execute(host, request, &mut report).await {
            Ok(()) => {
                report.completed = true;
                report.status = success_status(&report);
                events.emit(EventKind::InvocationCompleted {
                    applied: report.outcome.assignments_applied.clone(),
                    unresolved: report.outcome.unresolved_keys.clone(),
                    duration_ms: events.elapsed_ms(),
                });
                info!(
                    applied = report.outcome.assignments_applied.len(),
                    failures = events.failures().len(),
                    "invocation completed"
                );

                if let Some(instance) = &report.instance {
                    host.select_and_frame(std::slice::from_ref(instance));
                }
                host.notify(Notice::info(headline(&report)).with_timeout(self.config.notify_timeout_ms));
                host.close(Some(&report.status));
            }
            Err(err) => {
                if err.is_not_found() {
                    info!(error = %err, "nothing to bind");
                } else {
                    warn!(error = %err, "invocation stopped");
                }
                events.emit(EventKind::InvocationFailed { error: err.to_string() });
                report.status = failure_status(&err, report.component_type.as_deref());
                report.error = Some(err.to_string());
                host.notify(Notice::error(first_line(&report.status)));
            }
        }
        report
    }

    async fn execute(
        &self,
        host: &dyn Host,
        request: &BindRequest,
        report: &mut InvocationReport,
    ) -> Result<(), BindError> {
        let events = report.events.clone();
        let profile = self.select_profile(request, &events)?;
        report.component_type = Some(profile.name.clone());

        let tag_name = profile.tag_name();
        let tag = extract_tag(&request.markup, &tag_name).ok_or_else(|| BindError::TagNotFound {
            tag: tag_name.clone(),
            example: profile.example_snippet(),
        })?;
        events.emit(EventKind::TagExtracted {
            tag: tag_name,
            has_inner_text: tag.inner_text.is_some(),
        });

        let bag = decode_tag(&tag, &profile);
        events.emit(EventKind::PropsDecoded {
            props: serde_json::to_value(&bag).unwrap_or_default(),
        });
        report.props = Some(bag.clone());

        let component_name = profile.component_name();
        let component = host
            .find_component(&component_name)
            .ok_or_else(|| BindError::ContainerNotFound {
                name: component_name.clone(),
                available: host.component_names(),
            })?;

        let instance = host.create_instance(&component)?;
        events.emit(EventKind::InstanceCreated {
            component: component_name.clone(),
            instance: instance.to_string(),
        });
        report.instance = Some(instance.clone());

        let schema = host.property_descriptors(&instance)?;
        let known_image = find_image_url(&bag);
        let skip: Vec<&str> = known_image.iter().map(|(key, _)| key.as_str()).collect();
        let mut resolution = resolve(&bag, &schema, &profile.aliases, &skip);

        // Any other URL only counts as the image when no property claimed it
        let image = known_image.or_else(|| {
            let fallback = find_url_among(&bag, &resolution.unresolved)?;
            resolution.unresolved.retain(|key| key != &fallback.0);
            Some(fallback)
        });
        debug!(
            simple = resolution.simple.len(),
            free_text = resolution.free_text.len(),
            unresolved = resolution.unresolved.len(),
            "resolved against target schema"
        );

        // Simple properties: one batch, failure recorded and skipped
        if !resolution.simple.is_empty() {
            let keys: Vec<String> = resolution.simple.iter().map(|a| a.key.clone()).collect();
            match host.set_properties(&instance, &resolution.simple_batch()) {
                Ok(()) => {
                    events.emit(EventKind::PropertiesApplied { keys: keys.clone() });
                    report.outcome.assignments_applied.extend(keys);
                }
                Err(e) => {
                    warn!(error = %e, "property batch rejected");
                    events.emit(EventKind::PropertiesRejected {
                        keys,
                        error: e.to_string(),
                    });
                    report.properties_error = Some(e.to_string());
                }
            }
        }

        // Free text
        if !resolution.free_text.is_empty() {
            let outcome = match host.find_descendants(&instance, &[NodeKind::Text]) {
                Ok(slots) => {
                    let main_slots = host.find_descendants(&component, &[NodeKind::Text]).ok();
                    bind(host, &resolution.free_text, &slots, main_slots.as_deref()).await
                }
                Err(e) => {
                    warn!(error = %e, "text slots could not be listed");
                    BindingOutcome {
                        slot_failures: resolution
                            .free_text
                            .iter()
                            .map(|a| SlotFailure::Lookup {
                                key: a.key.clone(),
                                reason: e.to_string(),
                            })
                            .collect(),
                        ..BindingOutcome::default()
                    }
                }
            };

            for key in &outcome.assignments_applied {
                events.emit(EventKind::TextBound { key: key.clone() });
            }
            for failure in &outcome.slot_failures {
                events.emit(EventKind::TextFailed {
                    key: failure.key().to_string(),
                    reason: describe_failure(failure),
                });
            }
            report.outcome.merge(outcome);
        }

        report.outcome.unresolved_keys.extend(resolution.unresolved);
        report
            .outcome
            .unresolved_keys
            .extend(resolution.rejected.iter().map(|r| r.key.clone()));
        report.rejected = resolution.rejected;

        // Image last
        if let Some((key, url)) = image {
            let outcome = self.fetcher.apply_image(host, &url, &instance).await;
            match &outcome {
                AssetOutcome::Applied { layer } => {
                    events.emit(EventKind::ImageApplied {
                        key: key.clone(),
                        layer: layer.clone(),
                    });
                    report.outcome.assignments_applied.push(key);
                }
                other => {
                    events.emit(EventKind::ImageFailed {
                        key,
                        reason: describe_asset(other),
                    });
                }
            }
            report.asset = Some(outcome);
        }

        Ok(())
    }

    fn select_profile(&self, request: &BindRequest, events: &EventLog) -> Result<ComponentProfile, BindError> {
        if request.markup.trim().is_empty() {
            return Err(BindError::EmptyMarkup);
        }

        let selected = request.component_type.trim();
        if !selected.is_empty() {
            return self.config.profile(selected);
        }

        let detected = detect(&request.markup, &self.profiles).ok_or(BindError::MissingComponentType)?;
        events.emit(EventKind::ComponentDetected {
            component_type: detected.name.clone(),
        });
        debug!(component_type = %detected.name, "component type detected");
        Ok(detected.clone())
    }
}

fn headline(report: &InvocationReport) -> String {
    let name = report.component_type.as_deref().unwrap_or("component");
    let applied = report.outcome.assignments_applied.len();
    format!("Created {} ({} propert{} applied)", name, applied, if applied == 1 { "y" } else { "ies" })
}

fn first_line(status: &str) -> &str {
    status.lines().next().unwrap_or(status)
}

fn describe_failure(failure: &SlotFailure) -> String {
    match failure {
        SlotFailure::NoSlot { .. } => "no text layer found".to_string(),
        SlotFailure::Lookup { reason, .. } => format!("could not list text layers: {}", reason),
        SlotFailure::Apply { slot, reason, .. } => format!("could not write '{}': {}", slot, reason),
        SlotFailure::Mismatch {
            slot, expected, actual, ..
        } => format!("'{}' shows \"{}\" instead of \"{}\"", slot, actual, expected),
    }
}

fn describe_asset(outcome: &AssetOutcome) -> String {
    match outcome {
        AssetOutcome::Applied { layer } => format!("applied to '{}'", layer),
        AssetOutcome::LayerNotFound => "no image layer found".to_string(),
        AssetOutcome::FetchFailed { reason } => format!("fetch failed: {}", reason),
        AssetOutcome::DecodeFailed { reason } => format!("decode failed: {}", reason),
        AssetOutcome::ApplyFailed { reason } => format!("could not apply: {}", reason),
    }
}

fn success_status(report: &InvocationReport) -> String {
    let name = report.component_type.as_deref().unwrap_or("component");
    let props = report
        .props
        .as_ref()
        .map(PropertyBag::to_pretty_json)
        .unwrap_or_else(|| "{}".to_string());

    let mut lines = vec![format!("{} created with props:\n\n{}\n", name, props)];

    let applied = &report.outcome.assignments_applied;
    if applied.is_empty() {
        lines.push("Applied: nothing".to_string());
    } else {
        lines.push(format!("Applied: {}", applied.join(", ")));
    }

    if !report.outcome.unresolved_keys.is_empty() {
        lines.push(format!("Unresolved: {}", report.outcome.unresolved_keys.join(", ")));
    }
    for rejected in &report.rejected {
        lines.push(format!(
            "Skipped '{}' for {}: {}",
            rejected.key, rejected.target_identifier, rejected.reason
        ));
    }

    if let Some(error) = &report.properties_error {
        lines.push(format!("Properties not applied: {}", error));
    }

    let missing: Vec<&str> = report
        .outcome
        .slot_failures
        .iter()
        .filter(|f| matches!(f, SlotFailure::NoSlot { .. }))
        .map(SlotFailure::key)
        .collect();
    if !missing.is_empty() {
        lines.push(format!("No text layers found; could not set: {}", missing.join(", ")));
    }
    for failure in &report.outcome.slot_failures {
        if !matches!(failure, SlotFailure::NoSlot { .. }) {
            lines.push(format!("Text '{}': {}", failure.key(), describe_failure(failure)));
        }
    }

    if let Some(asset) = &report.asset {
        lines.push(format!("Image: {}", describe_asset(asset)));
    }

    lines.join("\n")
}

fn failure_status(err: &BindError, component_type: Option<&str>) -> String {
    match err {
        BindError::EmptyMarkup => "Please paste Storybook code first".to_string(),
        BindError::MissingComponentType => "Please select a component type".to_string(),
        BindError::TagNotFound { tag, example } => format!(
            "No {} component found in the pasted code.\n\nMake sure your code includes something like:\n{}",
            tag, example
        ),
        BindError::ContainerNotFound { name, available } => {
            let available = if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            };
            format!(
                "Component '{}' not found in this document.\n\nAvailable components: {}",
                name, available
            )
        }
        BindError::UnknownComponentType { name, known } => {
            format!("Unknown component type '{}'. Known types: {}", name, known.join(", "))
        }
        other => format!(
            "Error creating {}: {}",
            component_type.unwrap_or("component"),
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ComponentSpec, LayerSpec, MemoryHost};
    use crate::schema::PropertyKind;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(Config::default()).unwrap()
    }

    fn avatar_host() -> MemoryHost {
        let host = MemoryHost::new();
        host.add_component(
            &ComponentSpec::new("Avatar")
                .variant("size", &["small", "medium", "large"])
                .property("✏️ initials#1", PropertyKind::Text)
                .layer(LayerSpec::text("Initials", "AB").bound("✏️ initials#1")),
        );
        host
    }

    #[tokio::test]
    async fn empty_markup_is_rejected_first() {
        let host = avatar_host();
        let report = orchestrator().run(&host, &BindRequest::new("  ", "")).await;
        assert!(!report.completed);
        assert_eq!(report.status, "Please paste Storybook code first");
        assert!(host.mutations().is_empty());
    }

    #[tokio::test]
    async fn missing_type_without_detectable_tag() {
        let host = avatar_host();
        let report = orchestrator().run(&host, &BindRequest::new("<Card />", "")).await;
        assert_eq!(report.status, "Please select a component type");
        assert_eq!(host.notices()[0].message, "Please select a component type");
        assert!(host.notices()[0].error);
    }

    #[tokio::test]
    async fn type_is_detected_when_not_selected() {
        let host = avatar_host();
        let report = orchestrator()
            .run(&host, &BindRequest::new(r#"<Avatar size="large" />"#, ""))
            .await;
        assert!(report.completed, "{}", report.status);
        assert_eq!(report.component_type.as_deref(), Some("avatar"));
        assert!(report
            .events
            .events()
            .iter()
            .any(|e| matches!(e.kind, EventKind::ComponentDetected { .. })));
    }

    #[tokio::test]
    async fn container_not_found_lists_available() {
        let host = avatar_host();
        let report = orchestrator()
            .run(&host, &BindRequest::new("<Button>Go</Button>", "button"))
            .await;
        assert!(!report.completed);
        assert!(report.status.contains("Component 'Button' not found"));
        assert!(report.status.contains("Available components: Avatar"));
        assert!(report.error.as_deref().is_some_and(|e| e.starts_with("TAG-011")));
        assert!(host.instances().is_empty());
    }

    #[tokio::test]
    async fn success_selects_notifies_and_closes() {
        let host = avatar_host();
        let report = orchestrator()
            .run(&host, &BindRequest::new(r#"<Avatar size="large">JD</Avatar>"#, "avatar"))
            .await;

        assert!(report.completed);
        assert_eq!(host.selection(), vec![report.instance.clone().unwrap()]);
        assert!(!host.notices()[0].error);
        assert_eq!(host.closed(), Some(Some(report.status.clone())));
        assert!(report.status.contains("\"size\": \"large\""));
        assert!(report.status.contains("Unresolved: children"));
    }

    #[tokio::test]
    async fn report_json_carries_the_event_trace() {
        let host = avatar_host();
        let report = orchestrator()
            .run(&host, &BindRequest::new(r#"<Avatar size="large" />"#, "avatar"))
            .await;

        let json = serde_json::to_value(&report).unwrap();
        let events = json["events"].as_array().unwrap();
        assert_eq!(events[0]["kind"]["type"], "invocation_started");
        assert_eq!(events.last().unwrap()["kind"]["type"], "invocation_completed");
        assert_eq!(events.len(), report.events.len());
    }

    #[test]
    fn failure_status_for_unexpected_errors() {
        let err = BindError::Host(crate::host::HostError::Other("boom".into()));
        assert_eq!(failure_status(&err, Some("avatar")), "Error creating avatar: Host error: boom");
    }
}
