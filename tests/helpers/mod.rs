//! Shared fixtures and helpers for the integration suite.

pub mod fixture_tree;
