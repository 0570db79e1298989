//! Interactive nearest-neighbor graph explorer.
//!
//! Starting from one element of a vector set, [`explorer::GraphExplorer`]
//! incrementally discovers a graph of similar elements, lays it out and keeps
//! an abstract [`explorer::Scene`] in sync with it.

pub mod config;
pub mod error;
pub mod explorer;
pub mod index;
pub mod prefs;
pub mod util;

pub use config::ExplorerConfig;
pub use error::{ExplorerError, FetchError, PreferenceError, ProjectionError};
pub use explorer::GraphExplorer;
pub use index::VectorIndex;
