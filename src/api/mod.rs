// =============================================================================
// HTTP surface - thin presentation shell over the analysis pipeline
// =============================================================================

pub mod auth;
pub mod rest;
