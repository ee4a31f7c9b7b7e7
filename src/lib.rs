#![doc(html_root_url = "https://docs.rs/reactive-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Identity-stable, self-synchronizing wrappers around live DOM elements,
//! with a weakly-held selector cache and a hash-fragment router.
//!
//! Everything is written against [`Platform`]. Use [`web::dom`] in the browser (on `wasm32` only),
//! or a [`Dom`] over a [`memory::MemoryPlatform`] anywhere else, e.g. in tests.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod attributes;
mod bridge;
mod config;
mod dom;
mod error;
mod identity;
pub mod memory;
mod node;
mod node_list;
pub mod platform;
pub mod router;
mod selector_cache;
mod style;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use attributes::Attributes;
pub use config::Options;
pub use dom::{Dom, MountTarget};
pub use error::{ConfigurationError, Error, Result};
pub use node::Node;
pub use node_list::NodeList;
pub use platform::{ChangeKind, ChangeRecord, Channel, Child, ObserveOptions, Platform};
pub use router::{parse_location, RouteContext, RoutePattern};
pub use selector_cache::SelectorCache;
