//! Windows NT security and path rules, as plain data transformations.
//!
//! Nothing in here calls into Windows: the `sys` layer decodes native structures into these types
//! and back. Keeping the rules separate lets them be used (and tested) from any host.

pub mod acl;
pub mod long_path;
mod sid;

pub use sid::*;
