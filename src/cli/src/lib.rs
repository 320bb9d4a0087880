//! ACM Mirror CLI - mirror ACM images for disconnected installs.

pub mod commands;
pub mod output;
