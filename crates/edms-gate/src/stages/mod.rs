//! Built-in access stages, listed in default pipeline order.

pub mod frozen;
pub mod lock;
pub mod permission;
pub mod visibility;

pub use frozen::FrozenIterationStage;
pub use lock::LockStage;
pub use permission::PermissionStage;
pub use visibility::VisibilityStage;
