//! Built-in migrations.
//!
//! Add new migration modules here and register them in
//! `crate::migration::create_catalog`.

pub mod add_patient_identifier;
pub mod initial;
