//! In-memory host
//!
//! A small document model implementing [`Host`] without a design tool.
//! Used by the CLI (documents described in YAML) and by tests, where it
//! records every mutation for assertions.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{CandidateSlot, Host, HostError, ImageHandle, NodeId, NodeKind, Notice, ScaleMode};
use crate::error::BindError;
use crate::markup::PropertyValue;
use crate::schema::{PropertyKind, TargetPropertyDescriptor};

const DEFAULT_FONT: &str = "Inter";

/// Document description (YAML)
///
/// ```yaml
/// components:
///   - name: Avatar
///     properties:
///       - { identifier: size, kind: VARIANT, options: [small, medium, large] }
///       - { identifier: "✏️ initials#262:0", kind: TEXT }
///     layers:
///       - { name: Initials, kind: text, text: AB, bound: "✏️ initials#262:0" }
///       - { name: Avatar image, kind: ellipse }
/// missing_fonts: []
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSpec {
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    /// Font families that fail to load
    #[serde(default)]
    pub missing_fonts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            layers: Vec::new(),
        }
    }

    pub fn property(mut self, identifier: impl Into<String>, kind: PropertyKind) -> Self {
        self.properties.push(PropertySpec {
            identifier: identifier.into(),
            kind,
            options: Vec::new(),
        });
        self
    }

    /// VARIANT property restricted to `options`
    pub fn variant(mut self, identifier: impl Into<String>, options: &[&str]) -> Self {
        self.properties.push(PropertySpec {
            identifier: identifier.into(),
            kind: PropertyKind::Variant,
            options: options.iter().map(|o| o.to_string()).collect(),
        });
        self
    }

    pub fn layer(mut self, layer: LayerSpec) -> Self {
        self.layers.push(layer);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub identifier: String,
    pub kind: PropertyKind,
    /// Allowed values for VARIANT properties (empty = anything)
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub text: Option<String>,
    /// Property identifier bound to the text content
    #[serde(default)]
    pub bound: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
    /// Text longer than this is truncated by the layer
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub children: Vec<LayerSpec>,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            text: None,
            bound: None,
            font: None,
            max_length: None,
            children: Vec::new(),
        }
    }

    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            text: Some(content.into()),
            ..Self::new(name, NodeKind::Text)
        }
    }

    pub fn bound(mut self, identifier: impl Into<String>) -> Self {
        self.bound = Some(identifier.into());
        self
    }

    pub fn font(mut self, family: impl Into<String>) -> Self {
        self.font = Some(family.into());
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn child(mut self, layer: LayerSpec) -> Self {
        self.children.push(layer);
        self
    }
}

/// Recorded document change
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    InstanceCreated { component: NodeId, instance: NodeId },
    PropertiesSet { instance: NodeId, assignments: Vec<(String, PropertyValue)> },
    TextSet { node: NodeId, text: String },
    FillSet { node: NodeId, image: ImageHandle, scale: ScaleMode },
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    kind: NodeKind,
    children: Vec<NodeId>,
    text: Option<String>,
    bound: Option<String>,
    font: String,
    max_length: Option<usize>,
    fills: Vec<(ImageHandle, ScaleMode)>,
    /// Main component of an instance
    main: Option<NodeId>,
    properties: Vec<(String, PropertyValue)>,
}

impl Node {
    fn from_layer(layer: &LayerSpec) -> Self {
        Self {
            name: layer.name.clone(),
            kind: layer.kind,
            children: Vec::new(),
            text: layer.text.clone().or_else(|| (layer.kind == NodeKind::Text).then(String::new)),
            bound: layer.bound.clone(),
            font: layer.font.clone().unwrap_or_else(|| DEFAULT_FONT.to_string()),
            max_length: layer.max_length,
            fills: Vec::new(),
            main: None,
            properties: Vec::new(),
        }
    }

    fn container(name: &str, kind: NodeKind) -> Self {
        Self::from_layer(&LayerSpec::new(name, kind))
    }
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<NodeId, Node>,
    components: Vec<NodeId>,
    descriptors: HashMap<NodeId, Vec<PropertySpec>>,
    next_id: u64,
    loaded_fonts: HashSet<NodeId>,
    missing_fonts: HashSet<String>,
    reject_batches: Option<String>,
    reject_lookups: Option<String>,
    mutations: Vec<Mutation>,
    notices: Vec<Notice>,
    selection: Vec<NodeId>,
    closed: Option<Option<String>>,
}

impl State {
    fn alloc(&mut self, node: Node) -> NodeId {
        self.next_id += 1;
        let id = NodeId(format!("1:{}", self.next_id));
        self.nodes.insert(id.clone(), node);
        id
    }

    fn node(&self, id: &NodeId) -> Result<&Node, HostError> {
        self.nodes.get(id).ok_or_else(|| HostError::UnknownNode(id.clone()))
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut Node, HostError> {
        self.nodes.get_mut(id).ok_or_else(|| HostError::UnknownNode(id.clone()))
    }

    fn insert_layer(&mut self, parent: &NodeId, layer: &LayerSpec) {
        let id = self.alloc(Node::from_layer(layer));
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(id.clone());
        }
        for child in &layer.children {
            self.insert_layer(&id, child);
        }
    }

    /// Deep copy of `source`'s children under `target`
    fn clone_children(&mut self, source: &NodeId, target: &NodeId) {
        let children = self.nodes.get(source).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            let Some(mut copy) = self.nodes.get(&child).cloned() else {
                continue;
            };
            copy.children.clear();
            copy.fills.clear();
            let copy_id = self.alloc(copy);
            if let Some(t) = self.nodes.get_mut(target) {
                t.children.push(copy_id.clone());
            }
            self.clone_children(&child, &copy_id);
        }
    }

    fn descendants(&self, root: &NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(root) {
            for child in &node.children {
                out.push(child.clone());
                self.descendants(child, out);
            }
        }
    }

    fn specs_for(&self, node: &NodeId) -> Result<&[PropertySpec], HostError> {
        let n = self.node(node)?;
        let component = n.main.as_ref().unwrap_or(node);
        Ok(self.descriptors.get(component).map(Vec::as_slice).unwrap_or(&[]))
    }
}

fn truncate(text: &str, max: Option<usize>) -> String {
    match max {
        Some(max) => text.chars().take(max).collect(),
        None => text.to_string(),
    }
}

/// [`Host`] over an in-memory node tree
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<State>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(document: &DocumentSpec) -> Self {
        let host = Self::new();
        for component in &document.components {
            host.add_component(component);
        }
        host.state.lock().missing_fonts = document.missing_fonts.iter().cloned().collect();
        host
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, BindError> {
        let document: DocumentSpec = serde_yaml::from_str(yaml)?;
        Ok(Self::from_document(&document))
    }

    /// Register a component; returns its node id
    pub fn add_component(&self, spec: &ComponentSpec) -> NodeId {
        let mut state = self.state.lock();
        let id = state.alloc(Node::container(&spec.name, NodeKind::Component));
        for layer in &spec.layers {
            state.insert_layer(&id, layer);
        }
        state.descriptors.insert(id.clone(), spec.properties.clone());
        state.components.push(id.clone());
        id
    }

    /// Make a font family fail to load
    pub fn with_missing_font(self, family: impl Into<String>) -> Self {
        self.state.lock().missing_fonts.insert(family.into());
        self
    }

    /// Reject every property batch with `reason`
    pub fn rejecting_properties(self, reason: impl Into<String>) -> Self {
        self.state.lock().reject_batches = Some(reason.into());
        self
    }

    /// Fail every descendant lookup with `reason`
    pub fn rejecting_lookups(self, reason: impl Into<String>) -> Self {
        self.state.lock().reject_lookups = Some(reason.into());
        self
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state.lock().mutations.clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.state.lock().notices.clone()
    }

    pub fn selection(&self) -> Vec<NodeId> {
        self.state.lock().selection.clone()
    }

    /// `Some(message)` once `close` was called
    pub fn closed(&self) -> Option<Option<String>> {
        self.state.lock().closed.clone()
    }

    pub fn instances(&self) -> Vec<NodeId> {
        self.state
            .lock()
            .mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::InstanceCreated { instance, .. } => Some(instance.clone()),
                _ => None,
            })
            .collect()
    }

    /// Current value of an instance property
    pub fn property_value(&self, instance: &NodeId, identifier: &str) -> Option<PropertyValue> {
        let state = self.state.lock();
        state
            .nodes
            .get(instance)?
            .properties
            .iter()
            .find(|(k, _)| k == identifier)
            .map(|(_, v)| v.clone())
    }

    pub fn fills(&self, node: &NodeId) -> Vec<(ImageHandle, ScaleMode)> {
        let state = self.state.lock();
        state.nodes.get(node).map(|n| n.fills.clone()).unwrap_or_default()
    }

    /// First descendant of `root` named `name`
    pub fn node_by_name(&self, root: &NodeId, name: &str) -> Option<NodeId> {
        let state = self.state.lock();
        let mut all = Vec::new();
        state.descendants(root, &mut all);
        all.into_iter()
            .find(|id| state.nodes.get(id).is_some_and(|n| n.name == name))
    }

    fn validate(spec: &PropertySpec, value: &PropertyValue) -> Result<(), HostError> {
        let invalid = |reason: String| HostError::InvalidProperty {
            property: spec.identifier.clone(),
            reason,
        };
        match (spec.kind, value) {
            (PropertyKind::Boolean, PropertyValue::Boolean(_)) => Ok(()),
            (PropertyKind::Boolean, other) => Err(invalid(format!("expected boolean, got {}", other.kind_name()))),
            (PropertyKind::Variant, PropertyValue::String(v)) => {
                if spec.options.is_empty() || spec.options.iter().any(|o| o == v) {
                    Ok(())
                } else {
                    Err(invalid(format!(
                        "'{}' is not one of: {}",
                        v,
                        spec.options.join(", ")
                    )))
                }
            }
            (PropertyKind::Variant, other) => Err(invalid(format!("expected variant name, got {}", other.kind_name()))),
            (PropertyKind::Text, _) | (PropertyKind::InstanceSwap, _) => Ok(()),
        }
    }
}

#[async_trait]
impl Host for MemoryHost {
    fn component_names(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .components
            .iter()
            .filter_map(|id| state.nodes.get(id).map(|n| n.name.clone()))
            .collect()
    }

    fn find_component(&self, name: &str) -> Option<NodeId> {
        let state = self.state.lock();
        state
            .components
            .iter()
            .find(|id| state.nodes.get(id).is_some_and(|n| n.name.eq_ignore_ascii_case(name)))
            .cloned()
    }

    fn create_instance(&self, component: &NodeId) -> Result<NodeId, HostError> {
        let mut state = self.state.lock();
        if !state.components.contains(component) {
            return Err(HostError::Other(format!("'{}' is not a component", component)));
        }
        let name = state.node(component)?.name.clone();

        let mut instance = Node::container(&name, NodeKind::Instance);
        instance.main = Some(component.clone());
        let instance_id = state.alloc(instance);
        state.clone_children(component, &instance_id);

        state.mutations.push(Mutation::InstanceCreated {
            component: component.clone(),
            instance: instance_id.clone(),
        });
        Ok(instance_id)
    }

    fn property_descriptors(&self, instance: &NodeId) -> Result<Vec<TargetPropertyDescriptor>, HostError> {
        let state = self.state.lock();
        Ok(state
            .specs_for(instance)?
            .iter()
            .map(|s| TargetPropertyDescriptor::new(s.identifier.clone(), s.kind))
            .collect())
    }

    fn set_properties(&self, instance: &NodeId, assignments: &[(String, PropertyValue)]) -> Result<(), HostError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.reject_batches {
            return Err(HostError::Other(reason.clone()));
        }

        let specs = state.specs_for(instance)?.to_vec();
        for (identifier, value) in assignments {
            let spec = specs.iter().find(|s| &s.identifier == identifier).ok_or_else(|| {
                HostError::InvalidProperty {
                    property: identifier.clone(),
                    reason: "property does not exist".to_string(),
                }
            })?;
            Self::validate(spec, value)?;
        }

        let mut bound_layers = Vec::new();
        state.descendants(instance, &mut bound_layers);

        for (identifier, value) in assignments {
            let node = state.node_mut(instance)?;
            match node.properties.iter_mut().find(|(k, _)| k == identifier) {
                Some((_, slot)) => *slot = value.clone(),
                None => node.properties.push((identifier.clone(), value.clone())),
            }

            let is_text = specs
                .iter()
                .any(|s| &s.identifier == identifier && s.kind == PropertyKind::Text);
            if is_text {
                for layer in &bound_layers {
                    if let Some(n) = state.nodes.get_mut(layer) {
                        if n.bound.as_deref() == Some(identifier.as_str()) {
                            n.text = Some(truncate(&value.to_string(), n.max_length));
                        }
                    }
                }
            }
        }

        state.mutations.push(Mutation::PropertiesSet {
            instance: instance.clone(),
            assignments: assignments.to_vec(),
        });
        Ok(())
    }

    fn find_descendants(&self, root: &NodeId, kinds: &[NodeKind]) -> Result<Vec<CandidateSlot>, HostError> {
        let state = self.state.lock();
        state.node(root)?;
        if let Some(reason) = &state.reject_lookups {
            return Err(HostError::Other(reason.clone()));
        }

        let mut all = Vec::new();
        state.descendants(root, &mut all);
        Ok(all
            .into_iter()
            .filter_map(|id| {
                let node = state.nodes.get(&id)?;
                kinds.contains(&node.kind).then(|| CandidateSlot {
                    id: id.clone(),
                    name: node.name.clone(),
                    kind: node.kind,
                    bound_reference: node.bound.clone(),
                })
            })
            .collect())
    }

    fn text(&self, node: &NodeId) -> Result<String, HostError> {
        let state = self.state.lock();
        state
            .node(node)?
            .text
            .clone()
            .ok_or_else(|| HostError::NotText(node.clone()))
    }

    async fn load_font(&self, node: &NodeId) -> Result<(), HostError> {
        let family = {
            let state = self.state.lock();
            let n = state.node(node)?;
            if n.kind != NodeKind::Text {
                return Err(HostError::NotText(node.clone()));
            }
            n.font.clone()
        };

        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        if state.missing_fonts.contains(&family) {
            return Err(HostError::FontUnavailable { family });
        }
        state.loaded_fonts.insert(node.clone());
        Ok(())
    }

    fn set_text(&self, node: &NodeId, text: &str) -> Result<(), HostError> {
        let mut state = self.state.lock();
        if state.node(node)?.kind != NodeKind::Text {
            return Err(HostError::NotText(node.clone()));
        }
        if !state.loaded_fonts.contains(node) {
            return Err(HostError::FontNotLoaded(node.clone()));
        }

        let n = state.node_mut(node)?;
        n.text = Some(truncate(text, n.max_length));
        state.mutations.push(Mutation::TextSet {
            node: node.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn create_image(&self, bytes: &[u8]) -> Result<ImageHandle, HostError> {
        image::guess_format(bytes).map_err(|e| HostError::ImageDecode(e.to_string()))?;

        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Ok(ImageHandle {
            hash: format!("{:016x}", hasher.finish()),
        })
    }

    fn set_image_fill(&self, node: &NodeId, image: &ImageHandle, scale: ScaleMode) -> Result<(), HostError> {
        let mut state = self.state.lock();
        let n = state.node_mut(node)?;
        if !n.kind.is_image_capable() {
            return Err(HostError::Other(format!("'{}' cannot hold an image fill", n.name)));
        }
        n.fills = vec![(image.clone(), scale)];
        state.mutations.push(Mutation::FillSet {
            node: node.clone(),
            image: image.clone(),
            scale,
        });
        Ok(())
    }

    fn select_and_frame(&self, nodes: &[NodeId]) {
        self.state.lock().selection = nodes.to_vec();
    }

    fn notify(&self, notice: Notice) {
        self.state.lock().notices.push(notice);
    }

    fn close(&self, message: Option<&str>) {
        self.state.lock().closed = Some(message.map(str::to_string));
    }
}
