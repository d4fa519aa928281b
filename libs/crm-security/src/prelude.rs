pub use crate::{
    Action, OwnershipDescriptor, PermissionChecker, Policy, PolicyRef, RecordAccessChecker, Role,
    Scope, SecurityContext,
};
