#![allow(dead_code)]

use std::path::PathBuf;

use approx::assert_relative_eq;

use latticegraph::UnitCell;
use latticegraph::io::LatticeGraphParser;

/// Get the path to a file in the test data directory
pub fn path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(name)
}

/// Get all the XML libraries in the test data directory
pub fn all_libraries() -> Vec<PathBuf> {
    let pattern = path("*.xml");
    let pattern = pattern.to_str().expect("non UTF-8 path to test data");

    let paths = glob::glob(pattern).expect("invalid glob pattern")
        .collect::<Result<Vec<_>, _>>()
        .expect("failed to list test data");
    assert!(!paths.is_empty(), "missing XML test data");
    return paths;
}

pub fn load_library(name: &str) -> LatticeGraphParser {
    LatticeGraphParser::from_path(path(name)).expect("failed to load library")
}

/// Check that the length index of `unit_cell` contains all edges exactly
/// once, in the bucket corresponding to their length
pub fn check_length_index(unit_cell: &UnitCell) {
    let mut indexed = Vec::new();
    for (length, ids) in unit_cell.length_index().iter() {
        for &id in ids {
            let edge = unit_cell.edge(id).expect("missing edge in the unit cell");
            let edge_length = edge.length.expect("missing edge length");
            assert_relative_eq!(edge_length, length, epsilon = 1e-4);
            assert_relative_eq!(unit_cell.edge_length(edge).unwrap(), length, epsilon = 1e-4);
        }
        indexed.extend_from_slice(ids);
    }

    indexed.sort_unstable();
    let mut all = unit_cell.edges().map(|edge| edge.id).collect::<Vec<_>>();
    all.sort_unstable();
    assert_eq!(indexed, all);
}

/// Get a path for a temporary file with the given `name`, unique to this
/// process
pub fn temporary_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("latticegraph-{}-{}", std::process::id(), name))
}
