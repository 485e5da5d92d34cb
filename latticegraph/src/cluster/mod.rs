//! Finite clusters of unit cells.
//!
//! [`ClusterVertices`] and [`ClusterEdges`] repeat the content of a
//! [`UnitCell`] over `L x W x H` cells, and [`CrystalCluster`] bundles them
//! together with the unit cell they are built from.
use std::path::Path;

use log::{info, warn};

use crate::{Edge, Error, UnitCell, Vector3D};
use crate::io::{LatticeGraphExporter, LatticeGraphParser};

mod vertices;
pub use self::vertices::ClusterVertices;

mod edges;
pub use self::edges::{ClusterEdges, DEFAULT_SEARCH_TOLERANCE};

mod search;
pub use self::search::{DistanceSearch, DistanceSearchParameters};

/// Default file name used when exporting a cluster
pub const DEFAULT_LIBRARY_FILE: &str = "myLatticeGraphLib.xml";
/// Default LATTICEGRAPH name used when exporting a cluster
pub const DEFAULT_LATTICE_GRAPH_NAME: &str = "myLatticeGraph";

/// Parameters for a finite cluster
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClusterParameters {
    /// Number of unit cells `[L, W, H]` along each lattice vector
    #[serde(default = "serde_default_size")]
    pub size: [usize; 3],
}

fn serde_default_size() -> [usize; 3] { [2, 2, 2] }

impl Default for ClusterParameters {
    fn default() -> ClusterParameters {
        ClusterParameters { size: serde_default_size() }
    }
}

impl ClusterParameters {
    /// Get the JSON representation of these parameters
    pub fn parameters(&self) -> String {
        serde_json::to_string(self).expect("failed to serialize to JSON")
    }
}

/// Make `size` compatible with a unit cell of the given `dimension`: `H` is
/// set to 1 in 1 and 2 dimensions, and `W` is set to 1 in 1 dimension.
pub fn coerce_size(size: [usize; 3], dimension: usize) -> Result<[usize; 3], Error> {
    if size.contains(&0) {
        return Err(Error::InvalidParameter(format!(
            "all cluster sizes must be at least 1, got {:?}", size
        )));
    }

    let mut coerced = size;
    if dimension <= 2 {
        coerced[2] = 1;
    }
    if dimension == 1 {
        coerced[1] = 1;
    }

    if coerced != size {
        warn!(
            "cluster size {:?} changed to {:?} for a {}-dimensional unit cell",
            size, coerced, dimension
        );
    }
    return Ok(coerced);
}

/// A `CrystalCluster` owns a unit cell, and the cluster vertices and edges
/// built from it.
///
/// All edge editing operations go through this type, keeping the unit cell
/// and the cluster data in sync. Changes made through
/// [`CrystalCluster::unit_cell_mut`] require a call to
/// [`CrystalCluster::rebuild`] before the cluster data can be used again.
#[derive(Debug, Clone)]
pub struct CrystalCluster {
    unit_cell: UnitCell,
    size: [usize; 3],
    vertices: ClusterVertices,
    edges: ClusterEdges,
}

impl CrystalCluster {
    /// Create a new cluster of `size` unit cells for `unit_cell`. The size
    /// is adapted to the unit cell dimension.
    pub fn new(unit_cell: UnitCell, size: [usize; 3]) -> Result<CrystalCluster, Error> {
        let size = coerce_size(size, unit_cell.dimension())?;
        let vertices = ClusterVertices::new(&unit_cell, size);
        let edges = ClusterEdges::new(&unit_cell, &vertices)?;

        return Ok(CrystalCluster {
            unit_cell: unit_cell,
            size: size,
            vertices: vertices,
            edges: edges,
        });
    }

    /// Create a new cluster from JSON-formatted `ClusterParameters`
    pub fn from_json(unit_cell: UnitCell, parameters: &str) -> Result<CrystalCluster, Error> {
        let parameters = serde_json::from_str::<ClusterParameters>(parameters)?;
        return CrystalCluster::new(unit_cell, parameters.size);
    }

    /// Size `[L, W, H]` of this cluster
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }

    /// Get mutable access to the unit cell. The cluster vertices and edges
    /// must be rebuilt after any change to the vertices or edges.
    pub fn unit_cell_mut(&mut self) -> &mut UnitCell {
        &mut self.unit_cell
    }

    /// Get the cluster vertices, if they are up to date with the unit cell
    pub fn vertices(&self) -> Result<&ClusterVertices, Error> {
        self.vertices.ensure_fresh(&self.unit_cell)?;
        Ok(&self.vertices)
    }

    /// Get the cluster edges, if they are up to date with the unit cell
    pub fn edges(&self) -> Result<&ClusterEdges, Error> {
        self.vertices.ensure_fresh(&self.unit_cell)?;
        self.edges.ensure_fresh(&self.unit_cell)?;
        Ok(&self.edges)
    }

    /// Change the size of this cluster, and rebuild the cluster data
    pub fn reset_size(&mut self, size: [usize; 3]) -> Result<(), Error> {
        self.size = coerce_size(size, self.unit_cell.dimension())?;
        return self.rebuild();
    }

    /// Rebuild all cluster vertices and edges from the unit cell
    pub fn rebuild(&mut self) -> Result<(), Error> {
        self.vertices.process_vertices(&self.unit_cell, self.size);
        self.edges.process_edges(&self.unit_cell, &self.vertices)?;
        Ok(())
    }

    /// Replace the unit cell by the LATTICEGRAPH called `name` in the library
    /// at `path` (or the first one if `name` is `None`), and rebuild the
    /// cluster. The current cluster is left unchanged if parsing fails.
    pub fn import_from_file(&mut self, path: impl AsRef<Path>, name: Option<&str>) -> Result<(), Error> {
        let parser = LatticeGraphParser::from_path(path.as_ref())?;
        let unit_cell = parser.parse_lattice_graph(name)?;
        let size = coerce_size(self.size, unit_cell.dimension())?;

        info!(
            "imported unit cell '{}' with {} vertices and {} edges from {}",
            unit_cell.name(), unit_cell.num_vertices(), unit_cell.num_edges(),
            path.as_ref().display()
        );

        self.unit_cell = unit_cell;
        self.size = size;
        return self.rebuild();
    }

    /// Export the unit cell as a LATTICEGRAPH called `name` in a new library
    /// file at `path`. Edges are renumbered from 1.
    pub fn export_to_file(&self, path: impl AsRef<Path>, name: &str) -> Result<(), Error> {
        let exporter = LatticeGraphExporter::new(&self.unit_cell, name);
        return exporter.export_to_file(path);
    }

    /// Add an edge between the cluster vertices at `source_index` and
    /// `target_index`, see [`ClusterEdges::add_edge`]
    pub fn add_edge(&mut self, source_index: usize, target_index: usize) -> Result<Option<usize>, Error> {
        return self.edges.add_edge(&mut self.unit_cell, &self.vertices, source_index, target_index);
    }

    /// Remove the edge with the given `id`, see [`ClusterEdges::remove_edge`]
    pub fn remove_edge(&mut self, id: usize) -> Result<Option<Edge>, Error> {
        self.vertices.ensure_fresh(&self.unit_cell)?;
        return self.edges.remove_edge(&mut self.unit_cell, id);
    }

    /// Change the type of the edge with the given `id`
    pub fn change_edge_type(&mut self, id: usize, edge_type: usize) -> Result<(), Error> {
        self.vertices.ensure_fresh(&self.unit_cell)?;
        return self.edges.change_edge_type(&mut self.unit_cell, id, edge_type);
    }

    /// Search for edges at `distance` with `tolerance` percent, see
    /// [`ClusterEdges::search_edges_by_dist`]
    pub fn search_edges_by_dist(&mut self, edge_type: usize, distance: f64, tolerance: f64) -> Result<Vec<usize>, Error> {
        return self.edges.search_edges_by_dist(
            &mut self.unit_cell, &self.vertices, edge_type, distance, tolerance
        );
    }

    /// Search for edges with the same length as the edge with the given
    /// `id`, and give them the same type.
    pub fn search_similar_edges(&mut self, id: usize) -> Result<Vec<usize>, Error> {
        let edge = self.unit_cell.edge(id).cloned().ok_or_else(|| Error::InvalidParameter(
            format!("there is no edge with id {} in this unit cell", id)
        ))?;
        return self.edges.search_similar_edges(&mut self.unit_cell, &self.vertices, &edge);
    }

    /// Replace all edges by the result of the searches in `parameters`, see
    /// [`ClusterEdges::search_by_parameters`]
    pub fn search_by_parameters(&mut self, parameters: &DistanceSearchParameters) -> Result<Vec<usize>, Error> {
        return self.edges.search_by_parameters(&mut self.unit_cell, &self.vertices, parameters);
    }

    /// Get the segments (in cartesian coordinates) of the lattice net
    /// covering this cluster
    pub fn lattice_lines(&self) -> Vec<[Vector3D; 2]> {
        let lattice = self.unit_cell.lattice();
        let [l, w, h] = self.size.map(|n| n as f64);
        let [n_l, n_w, n_h] = self.size;

        let segment = |start: [f64; 3], stop: [f64; 3]| {
            [lattice.to_cartesian(start.into()), lattice.to_cartesian(stop.into())]
        };

        let mut lines = Vec::with_capacity((n_l + 1) * (n_w + 1) + (n_l + 1) * (n_h + 1) + (n_w + 1) * (n_h + 1));
        for i in 0..=n_l {
            for j in 0..=n_w {
                let (i, j) = (i as f64, j as f64);
                lines.push(segment([i, j, 0.0], [i, j, h]));
            }
        }

        for i in 0..=n_l {
            for j in 0..=n_h {
                let (i, j) = (i as f64, j as f64);
                lines.push(segment([i, 0.0, j], [i, w, j]));
            }
        }

        for i in 0..=n_w {
            for j in 0..=n_h {
                let (i, j) = (i as f64, j as f64);
                lines.push(segment([0.0, i, j], [l, i, j]));
            }
        }

        return lines;
    }

    /// Get the start and end points (in cartesian coordinates) of arrows
    /// representing the three lattice vectors
    pub fn arrows(&self) -> [[Vector3D; 2]; 3] {
        let lattice = self.unit_cell.lattice();
        let start = lattice.to_cartesian(Vector3D::new(-0.1, -0.1, -0.1));
        let arrow = |direction: [f64; 3]| {
            let end = Vector3D::from(direction.map(|value| value - 0.1));
            [start, lattice.to_cartesian(end)]
        };

        return [
            arrow([1.0, 0.0, 0.0]),
            arrow([0.0, 1.0, 0.0]),
            arrow([0.0, 0.0, 1.0]),
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_unit_cell;
    use crate::{Lattice, Matrix3, Vertex};

    use approx::assert_ulps_eq;

    #[test]
    fn parameters() {
        let parameters: ClusterParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(parameters.size, [2, 2, 2]);
        assert_eq!(parameters.parameters(), r#"{"size":[2,2,2]}"#);

        let cluster = CrystalCluster::from_json(test_unit_cell("two-vertices"), r#"{"size": [3, 1, 2]}"#).unwrap();
        assert_eq!(cluster.size(), [3, 1, 2]);

        let error = CrystalCluster::from_json(test_unit_cell("two-vertices"), r#"{"sizes": [3, 1, 2]}"#).unwrap_err();
        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn size_coercion() {
        assert_eq!(coerce_size([3, 4, 5], 3).unwrap(), [3, 4, 5]);
        assert_eq!(coerce_size([3, 4, 5], 2).unwrap(), [3, 4, 1]);
        assert_eq!(coerce_size([3, 4, 5], 1).unwrap(), [3, 1, 1]);

        let error = coerce_size([3, 0, 5], 3).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: all cluster sizes must be at least 1, got [3, 0, 5]");

        let cluster = CrystalCluster::new(test_unit_cell("square"), [3, 3, 3]).unwrap();
        assert_eq!(cluster.size(), [3, 3, 1]);
        // one vertex in each cell, horizontal and vertical edges
        assert_eq!(cluster.vertices().unwrap().len(), 9);
        assert_eq!(cluster.edges().unwrap().len(), 12);

        let mut cluster = CrystalCluster::new(test_unit_cell("chain"), [4, 2, 2]).unwrap();
        assert_eq!(cluster.size(), [4, 1, 1]);
        assert_eq!(cluster.vertices().unwrap().len(), 8);
        assert_eq!(cluster.edges().unwrap().len(), 4 + 3);

        cluster.reset_size([2, 5, 5]).unwrap();
        assert_eq!(cluster.size(), [2, 1, 1]);
        assert_eq!(cluster.edges().unwrap().len(), 2 + 1);
    }

    #[test]
    fn editing() {
        let mut cluster = CrystalCluster::new(test_unit_cell("two-vertices"), [2, 2, 2]).unwrap();
        assert_eq!(cluster.edges().unwrap().len(), 28);

        cluster.change_edge_type(1, 7).unwrap();
        let edges = cluster.edges().unwrap();
        let range = edges.range(1).unwrap();
        assert!(edges.types()[range].iter().all(|&t| t == 7));

        let removed = cluster.remove_edge(1).unwrap().unwrap();
        assert_eq!(removed.edge_type, 7);
        assert_eq!(cluster.edges().unwrap().len(), 20);
        assert!(cluster.remove_edge(1).unwrap().is_none());

        // no other pair of vertices is at the length of edge 2
        let new = cluster.search_similar_edges(2).unwrap();
        assert!(new.is_empty());

        let error = cluster.search_similar_edges(1).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: there is no edge with id 1 in this unit cell");

        let new = cluster.search_edges_by_dist(3, 0.5389, 0.1).unwrap();
        assert_eq!(new, [7]);
        assert_eq!(cluster.edges().unwrap().len(), 28);
        assert_eq!(cluster.unit_cell().edge(7).unwrap().edge_type, 3);
    }

    #[test]
    fn stale_data() {
        let mut cluster = CrystalCluster::new(test_unit_cell("two-vertices"), [2, 2, 2]).unwrap();

        cluster.unit_cell_mut().add_vertex(Vertex::new(0, Vector3D::new(0.5, 0.5, 0.5)));
        assert!(matches!(cluster.vertices(), Err(Error::StaleCache(_))));
        assert!(matches!(cluster.edges(), Err(Error::StaleCache(_))));
        assert!(matches!(cluster.add_edge(0, 1), Err(Error::StaleCache(_))));

        cluster.rebuild().unwrap();
        assert_eq!(cluster.vertices().unwrap().len(), 24);
        assert_eq!(cluster.edges().unwrap().len(), 28);

        cluster.unit_cell_mut().clear_edges();
        assert!(cluster.vertices().is_ok());
        assert!(matches!(cluster.edges(), Err(Error::StaleCache(_))));

        cluster.rebuild().unwrap();
        assert!(cluster.edges().unwrap().is_empty());
    }

    #[test]
    fn lattice_lines() {
        let unit_cell = UnitCell::new(Lattice::new(Matrix3::diagonal(1.0, 2.0, 3.0)));
        let cluster = CrystalCluster::new(unit_cell, [2, 1, 1]).unwrap();

        let lines = cluster.lattice_lines();
        assert_eq!(lines.len(), 3 * 2 + 3 * 2 + 2 * 2);

        assert_ulps_eq!(lines[0][0], Vector3D::new(0.0, 0.0, 0.0));
        assert_ulps_eq!(lines[0][1], Vector3D::new(0.0, 0.0, 3.0));
        assert_ulps_eq!(lines[1][1], Vector3D::new(0.0, 2.0, 3.0));

        assert_ulps_eq!(lines[6][0], Vector3D::new(0.0, 0.0, 0.0));
        assert_ulps_eq!(lines[6][1], Vector3D::new(0.0, 2.0, 0.0));

        assert_ulps_eq!(lines[15][0], Vector3D::new(0.0, 2.0, 3.0));
        assert_ulps_eq!(lines[15][1], Vector3D::new(2.0, 2.0, 3.0));

        let arrows = cluster.arrows();
        assert_ulps_eq!(arrows[0][0], Vector3D::new(-0.1, -0.2, -0.3));
        assert_ulps_eq!(arrows[0][1], Vector3D::new(0.9, -0.2, -0.3));
        assert_ulps_eq!(arrows[1][1], Vector3D::new(-0.1, 1.8, -0.3));
        assert_ulps_eq!(arrows[2][1], Vector3D::new(-0.1, -0.2, 2.7));
    }
}
