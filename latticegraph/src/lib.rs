#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access, clippy::many_single_char_names)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod types;
pub use types::*;

mod errors;
pub use self::errors::Error;

pub mod expr;

mod lattice;
pub use self::lattice::{Lattice, Boundary, angle_between};

pub mod graph;
pub use self::graph::{UnitCell, LengthIndex, Vertex, Edge, EdgeKey, Offset};
pub use self::graph::{SymmetryOperation, parse_symmetry_operations};

pub mod cluster;
pub use self::cluster::{ClusterVertices, ClusterEdges, CrystalCluster, ClusterParameters};
pub use self::cluster::{DistanceSearch, DistanceSearchParameters};

mod crystal;
pub use self::crystal::CrystalParameters;

pub mod io;

#[cfg(test)]
pub(crate) mod test_utils;
