//! # audix-core
//!
//! Core types and pure logic for audix, a versioned audit-template store with
//! dependency-aware checklists.
//!
//! This crate provides the foundational types shared across all audix crates:
//! - Entity structs for templates, snapshots, comments, attachments, reports
//!   and checklists
//! - Status and kind enums
//! - ID prefix constants
//! - The error taxonomy every operation reports through
//! - The typed activity log
//! - The checklist dependency graph and progress calculator
//! - The clock and report-renderer seams

pub mod activity;
pub mod clock;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod graph;
pub mod ids;
pub mod progress;
pub mod render;
pub mod responses;
