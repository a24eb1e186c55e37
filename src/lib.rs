//! # xmlgraph
//!
//! Turns a folder tree of XML documents into an in-memory entity graph with resolved
//! parent/child hierarchy and typed, bidirectional references across documents.
//!
//! ## Overview
//!
//! Any element carrying the identifier attribute (`Guid` by default) becomes an
//! [`Entity`](entity::Entity). Its other attributes are copied, its nearest identified
//! ancestor becomes its parent, and child elements named `*Ref` declare references:
//!
//! ```xml
//! <Person Guid="p1" Name="Alice">
//!   <Person Guid="p2" Name="Bob"/>
//!   <ChildRef RefId="p3" RefDirection="out"/>
//! </Person>
//! ```
//!
//! Here `p2` is a child of `p1`, and `p1` has an outgoing `Child` edge to `p3`, which may be
//! defined in any other document under the same folder. `p3` gets the matching incoming edge.
//!
//! ## Architecture
//!
//! - **[`codec`]**: per-document entity extraction ([`codec::XmlCodec`])
//! - **[`store`]**: the concurrent aggregation store and the read-only [`store::EntityGraph`]
//! - **[`resolve`]**: the second pass wiring parents, children and references
//! - **[`builder`]**: one full build over a folder, producing a [`builder::BuildReport`]
//! - **[`cache`]**: [`cache::GraphCache`], which decides when to rebuild and serves the graph
//! - **[`watch`]**: change notification feeding the cache's dirty flag
//!
//! Extraction runs one task per file and resolution one task per entity; both fall back to
//! plain loops when there is less work than worker threads.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xmlgraph::{cache::{GraphCache, LoadOutcome}, config::GraphConfig};
//!
//! let mut cache = GraphCache::new(GraphConfig::default());
//! if let LoadOutcome::Rebuilt(report) = cache.load("./data", false)? {
//!     for diagnostic in report.diagnostics.iter() {
//!         eprintln!("{diagnostic}");
//!     }
//! }
//! let graph = cache.graph().expect("graph was loaded");
//! let alice = graph.get("p1").expect("p1 exists");
//! for child in graph.children(&alice) {
//!     println!("{} -> {}", alice.id, child.id);
//! }
//! # Ok::<(), xmlgraph::GraphCacheError>(())
//! ```
//!
//! ## Features
//!
//! - **service** (default): file watching through `notify`
//! - **bin** (default): the `xmlgraph` command line tool

pub mod builder;
pub mod cache;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod parallel;
pub mod resolve;
pub mod store;
pub mod traverse;
pub mod watch;
#[cfg(test)]
mod tests;

pub use error::*;
