//! On-disk state

pub mod acl;
pub mod layout;
pub mod settings;
