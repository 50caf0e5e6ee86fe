// Engine module - Pure check logic (time windows, path templates, result aggregation)
// This layer sits between configuration types and the runtime that talks to storage

pub mod aggregate;
pub mod error;
pub mod template;
pub mod window;

pub use aggregate::{CompositeState, RunContext, RunFault, aggregate, fault_record, target_details};
pub use error::{Error, Result};
pub use template::{expand, expand_grouped, placeholders};
pub use window::{Offset, TimeWindow, default_deadline, resolve, resolve_span};
