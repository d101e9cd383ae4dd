//! # Host Abstraction Layer
//!
//! The design tool that owns the document is an external collaborator. Every
//! stage of an invocation reaches it through the [`Host`] trait, injected as
//! `&dyn Host`, so the pipeline can run against the real canvas or against
//! [`MemoryHost`] in tests and in the CLI.
//!
//! ## Operations
//!
//! | Concern | Methods |
//! |---------|---------|
//! | Components | `component_names`, `find_component`, `create_instance` |
//! | Properties | `property_descriptors`, `set_properties` |
//! | Layers | `find_descendants`, `text`, `load_font`, `set_text` |
//! | Images | `create_image`, `set_image_fill` |
//! | Session | `select_and_frame`, `notify`, `close` |
//!
//! `load_font` is async: text cannot be mutated until the layer's font has
//! been loaded.

mod memory;

pub use memory::{DocumentSpec, LayerSpec, MemoryHost, Mutation, PropertySpec, ComponentSpec};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::markup::PropertyValue;
use crate::schema::TargetPropertyDescriptor;

/// Host-assigned node identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node kinds the pipeline cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Component,
    Instance,
    Frame,
    Group,
    Text,
    Rectangle,
    Ellipse,
    Polygon,
    Star,
    Vector,
}

impl NodeKind {
    /// Kinds that can carry an image fill
    pub const IMAGE_CAPABLE: [NodeKind; 6] = [
        NodeKind::Rectangle,
        NodeKind::Ellipse,
        NodeKind::Polygon,
        NodeKind::Star,
        NodeKind::Vector,
        NodeKind::Frame,
    ];

    pub fn is_image_capable(self) -> bool {
        Self::IMAGE_CAPABLE.contains(&self)
    }
}

/// A live sub-element that can receive text or an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Property identifier bound to this layer's text content, if any
    #[serde(default)]
    pub bound_reference: Option<String>,
}

/// Reusable handle for an image created from raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle {
    pub hash: String,
}

/// Image fill scale modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleMode {
    Fill,
    Fit,
    Crop,
    Tile,
}

/// Toast notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub error: bool,
    /// Auto-dismiss delay; `None` keeps the host default
    pub timeout_ms: Option<u64>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: false,
            timeout_ms: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: true,
            timeout_ms: None,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Failures reported by the host
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("node '{0}' does not exist")]
    UnknownNode(NodeId),

    #[error("node '{0}' is not a text layer")]
    NotText(NodeId),

    #[error("invalid value for property '{property}': {reason}")]
    InvalidProperty { property: String, reason: String },

    #[error("font '{family}' could not be loaded")]
    FontUnavailable { family: String },

    #[error("font for '{0}' must be loaded before editing text")]
    FontNotLoaded(NodeId),

    #[error("image could not be decoded: {0}")]
    ImageDecode(String),

    #[error("{0}")]
    Other(String),
}

/// The design tool as seen by the binding pipeline
#[async_trait]
pub trait Host: Send + Sync {
    /// Names of every component that can be instantiated
    fn component_names(&self) -> Vec<String>;

    /// Find a component by name (case-insensitive)
    fn find_component(&self, name: &str) -> Option<NodeId>;

    /// Instantiate a component and place it on the page
    fn create_instance(&self, component: &NodeId) -> Result<NodeId, HostError>;

    /// Declared properties of an instance, in host enumeration order
    fn property_descriptors(&self, instance: &NodeId) -> Result<Vec<TargetPropertyDescriptor>, HostError>;

    /// Set several properties in one call; the host may reject the whole batch
    fn set_properties(&self, instance: &NodeId, assignments: &[(String, PropertyValue)]) -> Result<(), HostError>;

    /// Descendants of `root` whose kind is in `kinds`, in document order
    fn find_descendants(&self, root: &NodeId, kinds: &[NodeKind]) -> Result<Vec<CandidateSlot>, HostError>;

    /// Current text content of a text layer
    fn text(&self, node: &NodeId) -> Result<String, HostError>;

    /// Load the font used by a text layer
    async fn load_font(&self, node: &NodeId) -> Result<(), HostError>;

    /// Replace a text layer's content (font must be loaded)
    fn set_text(&self, node: &NodeId, text: &str) -> Result<(), HostError>;

    /// Decode raw bytes into an image handle
    fn create_image(&self, bytes: &[u8]) -> Result<ImageHandle, HostError>;

    /// Replace a node's fills with a single image fill
    fn set_image_fill(&self, node: &NodeId, image: &ImageHandle, scale: ScaleMode) -> Result<(), HostError>;

    /// Select nodes and frame them in the viewport
    fn select_and_frame(&self, nodes: &[NodeId]);

    /// Show a toast
    fn notify(&self, notice: Notice);

    /// End the session, optionally with a final message
    fn close(&self, message: Option<&str>);
}
