//! Server-side validation of client-reported movement.

pub mod movement;
