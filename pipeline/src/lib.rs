//! Validated extraction of relational database schemas through LLM agents.
//!
//! Each database entity is extracted by a producer stage and re-checked by a
//! validator stage; rejected output is retried with the validator's feedback
//! until it passes or attempts run out. Validated entity files are finally
//! merged into one consolidated schema document.
//!
//! The crate follows a hexagonal layout: [`domain`] holds the services and
//! ports, [`outbound`] the adapters, and [`inbound`] the command line.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
