//! Bounded web crawling for webpage references.
//!
//! This crate provides:
//! - [`engine`] — Sequential, depth-bounded BFS crawler with per-node
//!   failure isolation
//! - [`Crawler`] / [`CrawlResult`] — The crawl entry point and its output

pub mod engine;

pub use engine::{CrawlResult, Crawler};
