pub mod builtin;
pub mod descriptor;
pub mod entity;
pub mod operation;

pub use builtin::builtin_descriptors;
pub use descriptor::EntityDescriptor;
pub use entity::{EntityHandler, HandlerLimits};
pub use operation::Operation;
