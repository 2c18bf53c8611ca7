//! Capabilities: the side-effecting actions the reasoner may request.

pub mod arguments;
pub mod handler;
pub mod registry;
pub mod schema;
pub mod validation;

pub use arguments::CapabilityArguments;
pub use handler::{CapabilityHandler, FnCapability, HandlerError};
pub use registry::{encode_error, CapabilityDescriptor, CapabilityRegistry};
pub use schema::{InputSchema, SchemaBuilder};
pub use validation::validate_arguments;
