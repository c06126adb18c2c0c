/// Compute device module - all device-related types and traits

// Module declarations
pub mod compute_device;
pub mod buffer;
pub mod kernel;
pub mod command_list;
pub mod binding_group;

// Backend implementations
pub mod software_device;

// Re-export everything from compute_device.rs
pub use compute_device::*;

// Re-export from other modules
pub use buffer::*;
pub use kernel::*;
pub use command_list::*;
pub use binding_group::*;
pub use software_device::*;
