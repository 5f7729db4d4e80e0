//! `tf-spatial` — network graph, spatial snapping, and routing.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                     |
//! |-------------|--------------------------------------------------------------|
//! | [`network`] | `NetworkGraph` (CSR + R-tree), `NetworkGraphBuilder`         |
//! | [`router`]  | `Router` trait, `Route`, `DijkstraRouter`                    |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                           |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Propagates `Serialize`/`Deserialize` to `tf-core` types.     |

pub mod error;
pub mod network;
pub mod router;


pub use error::{SpatialError, SpatialResult};
pub use network::{MAX_TOTAL_COST, MIN_COST_UNITS, NetworkGraph, NetworkGraphBuilder};
pub use router::{DijkstraRouter, Route, Router};
