//! samplr - statistical profiler driver
//!
//! Runs a program under a `/proc`-based thread sampler, or replays a
//! previously saved capture, and renders the result as a text call tree, a
//! self-contained HTML report, or the raw JSON capture.

pub mod cli;
pub mod error;
pub mod frame;
pub mod html_output;
pub mod profiler;
pub mod render;
pub mod report;
pub mod sampler;
pub mod session;
pub mod target;
pub mod term;
pub mod text_output;
