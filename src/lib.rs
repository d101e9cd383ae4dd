//! tagbind - bind pseudo-JSX component snippets onto design components

pub mod asset;
pub mod binding;
pub mod component;
pub mod config;
pub mod error;
pub mod event_log;
pub mod host;
pub mod markup;
pub mod orchestrator;
pub mod schema;

pub use asset::{AssetFetcher, AssetOutcome};
pub use binding::{bind, BindingOutcome, SlotFailure};
pub use component::{detect, ComponentProfile};
pub use config::Config;
pub use error::{BindError, FixSuggestion};
pub use event_log::{Event, EventKind, EventLog};
pub use host::{CandidateSlot, Host, HostError, MemoryHost, NodeId, NodeKind};
pub use markup::{decode, extract_tag, parse_component, PropertyBag, PropertyValue, TagMatch};
pub use orchestrator::{BindRequest, InvocationReport, Orchestrator};
pub use schema::{resolve, PropertyKind, Resolution, ResolvedAssignment, TargetPropertyDescriptor};
