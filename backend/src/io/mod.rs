//! # IO Module
//!
//! Outward-facing surfaces: chart rendering and the command line.

pub mod chart;
pub mod cli;

pub use chart::{ChartRenderer, RenderedChart, SvgChartRenderer};
pub use cli::{Cli, Command, KindArg};
