pub mod refresher;

pub use refresher::{RefreshAgent, RefreshSettings};
