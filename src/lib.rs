//! noirai: investigation planning engine.
//!
//! Turns a target (domain, URL, IP) into an ordered plan of evidence-gathering
//! steps, adapts that plan as evidence arrives, and tracks each investigation
//! through its lifecycle.

pub mod cli;
pub mod core;
pub mod logging;
pub mod planning;
