//! Slice reducers, one per concern. Each returns `NotHandled` for actions it
//! does not own.

pub mod comparison;
pub mod data;
pub mod favorites;
pub mod filters;
pub mod persistence;
pub mod sorting;
pub mod team;
pub mod ui;
