//! Model serving: endpoints, endpoint configs and the control plane that
//! manages them.
//!
//! The promotion workflow only talks to the [`ServingControlPlane`] trait.
//! [`LocalControlPlane`] implements it over a JSON file for local workspaces
//! and tests.

pub mod control_plane;
pub mod endpoint;
pub mod local;

pub use control_plane::{
    CreateEndpointRequest, CreateModelRequest, EndpointAck, ServingControlPlane,
    UpdateEndpointRequest,
};
pub use endpoint::{
    CaptureContentTypeHeader, CaptureMode, CaptureOption, DataCaptureConfig, Endpoint,
    EndpointConfig, ServingModel, DEFAULT_CSV_CONTENT_TYPE,
    DEFAULT_SAMPLING_PERCENTAGE,
};
pub use local::{LocalControlPlane, ServingState};
