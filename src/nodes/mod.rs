//! Node bodies for the triage graph.
//!
//! Each node is a function over the mutable [`crate::ticket::TicketState`];
//! fallible nodes return an explicit error the engine's dispatcher consumes
//! according to that node's failure policy.

pub mod analyser;
pub mod interrupts;
pub mod l2;
pub mod l3;
pub mod l4;
pub mod mail;
pub mod rca_pm;
pub mod tier;
