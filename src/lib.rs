//! # costflow
//!
//! costflow compiles a compact, line-oriented shorthand for bookkeeping into
//! beancount ledger entries.
//!
//! ```
//! use costflow::{Config, Costflow};
//!
//! let costflow = Costflow::new(Config::default().with_default_currency("USD"));
//! let entry = costflow.interpret("2021-09-24 @Verizon 59.61 Checking > Phone");
//! assert_eq!(
//!     entry.render(),
//!     "2021-09-24 * \"Verizon\" \"\"\n\tChecking\t59.61 USD\n\tPhone\t-59.61 USD"
//! );
//! ```
#![doc(html_root_url = "https://docs.rs/costflow/0.1.0")]

mod balancer;
mod config;
mod costflow;
mod entry;
pub mod parse;
pub mod template;
pub mod utils;

pub use crate::costflow::Costflow;
pub use config::Config;
pub use entry::*;
