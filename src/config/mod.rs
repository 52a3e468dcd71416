pub mod identity;
pub mod proc_loader;
pub mod proc_validator;
pub mod settings;
pub mod sinks;
pub mod types;
