pub mod action;
pub mod container;
pub mod run;

pub use action::{ActionDescriptor, ExecKind};
pub use container::{ContainerData, ContainerStateTag, WorkerId};
pub use run::{ActivationMessage, Run};
