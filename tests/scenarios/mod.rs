//! Scenario-based tests for npm-super-pack

mod debug_logs;
mod fallbacks;
mod nesting;
mod traceback;
