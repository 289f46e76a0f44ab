#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod corpus;
pub mod deadline;
pub mod error;
pub mod eval;
pub mod jsonx;
pub mod retry;
pub mod store;
pub mod traits;
pub mod types;
