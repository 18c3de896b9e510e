// Re-export types from the protocol crate so they are accessible via paretoforge_core::*
pub use paretoforge_protocol::config;
pub use paretoforge_protocol::job;
pub use paretoforge_protocol::objective;
pub use paretoforge_protocol::protocol;
pub use paretoforge_protocol::schema;

// Internal Modules
pub mod codec;
pub mod consts;
pub mod core_types;
pub mod error;
pub mod export;
pub mod fitness;
pub mod history;
pub mod optimizer;
pub mod pareto;
pub mod seeds;
pub mod util;
