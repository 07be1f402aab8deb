pub mod field;
pub mod filter;
pub mod permissions;

pub use field::{FieldType, PayloadField, SelectOption};
pub use filter::{FieldCondition, Operator, Where};
pub use permissions::{
    Capability, CollectionPermission, FieldNode, FieldPermission, FieldPermissionTree,
    GlobalPermission, SchemaGraph,
};
