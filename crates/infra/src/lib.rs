//! Infrastructure layer: storage backends, identity service and startup seeding.

pub mod bootstrap;
pub mod identity;
pub mod store;

pub use bootstrap::AdminSeed;
pub use identity::{IdentityService, LoginOutcome};
pub use store::{
    Grant, InMemoryStore, PermissionRecord, PermissionStore, PostgresStore, Record, RecordStore,
    Store, StoreError, UserChanges, UserRecord, UserStore,
};
