//! `hms-gate`: the method authorization and audit gate.
//!
//! Operations are declared as data ([`OperationDef`]), validated once at
//! startup by the [`OperationRegistry`], and executed through the [`Gate`],
//! which authorizes before running domain logic and audits after it succeeds.

pub mod gate;
pub mod operation;
pub mod registry;

pub use gate::{Gate, GateError, GateStage};
pub use operation::{OperationDef, OperationKind};
pub use registry::{OperationRegistry, RegisteredOperation, RegistryError};
