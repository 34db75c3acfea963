//! RTK: Reliability ToolKit FMEA engine
//!
//! Builds Failure Mode and Effects Analysis trees (mode → mechanism → cause →
//! control/action) for a function or hardware item, persists them in a SQLite
//! program database, and calculates RPN and MIL-STD-1629A criticality.

pub mod cli;
pub mod core;
pub mod entities;
pub mod fmea;
