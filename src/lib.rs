pub mod span;
pub mod diagnostics;
pub mod config;
pub mod generator;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod shrink;
pub mod oracle;
pub mod property;
pub mod registry;
pub mod harness;
pub mod store;
pub mod report;
pub mod targets;

pub use config::HarnessConfig;
pub use generator::{Generator, Trace};
pub use harness::Harness;
pub use oracle::{Oracle, TargetError, Verdict};
pub use property::{Checkable, Property};
pub use registry::Registry;
pub use report::RunReport;
