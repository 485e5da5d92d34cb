use std::ops::Range;

use indexmap::IndexMap;
use log::{debug, info};
use ndarray::Array2;

use crate::{Edge, Error, Offset, UnitCell, Vector3D};
use super::ClusterVertices;
use super::search::DistanceSearchParameters;

/// Tolerance (in percent of the distance) used when searching edges similar
/// to an existing one
pub const DEFAULT_SEARCH_TOLERANCE: f64 = 0.1;

/// Cells around the origin cell used to search for edges in 3 dimensions.
/// This contains one cell out of each pair of opposite cells.
const NEIGHBOR_CELLS_3D: [[i32; 3]; 14] = [
    [0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1], [1, 1, 0],
    [1, 0, 1], [0, 1, 1], [1, -1, 0], [1, 0, -1], [0, 1, -1],
    [1, 1, 1], [-1, 1, 1], [1, -1, 1], [1, 1, -1],
];

/// Cells around the origin cell used to search for edges in 1 and 2
/// dimensions
const NEIGHBOR_CELLS_2D: [[i32; 3]; 5] = [
    [0, 0, 0], [1, 0, 0], [0, 1, 0], [1, 1, 0], [1, -1, 0],
];

/// Edges of a finite cluster, built by repeating the edges of a `UnitCell`
/// in all the cells of a `ClusterVertices`.
///
/// Each cluster edge is stored as a pair of indexes into the
/// `ClusterVertices` flat arrays. Copies of an unit cell edge going outside
/// of the cluster are dropped. All copies of a given unit cell edge are
/// stored contiguously.
#[derive(Debug, Clone)]
pub struct ClusterEdges {
    size: [usize; 3],
    /// id of the unit cell edge for each cluster edge
    ids: Vec<usize>,
    /// type of each cluster edge
    types: Vec<usize>,
    /// indexes of the source and target cluster vertices of each edge
    source_target: Vec<[usize; 2]>,
    /// range of cluster edges for each unit cell edge id
    array_ind: IndexMap<usize, Range<usize>>,
    /// cells used to build the distance matrix
    neighbor_cells: Vec<Offset>,
    /// distances between the unit cell vertices in the origin cell (columns)
    /// and the unit cell vertices in all neighbor cells (rows)
    dist_matrix: Array2<f64>,
    dist_matrix_version: u64,
    vertices_version: u64,
    edges_version: u64,
}

impl ClusterEdges {
    /// Build the cluster edges of `unit_cell` over the given cluster
    /// `vertices`
    pub fn new(unit_cell: &UnitCell, vertices: &ClusterVertices) -> Result<ClusterEdges, Error> {
        let mut edges = ClusterEdges {
            size: vertices.size(),
            ids: Vec::new(),
            types: Vec::new(),
            source_target: Vec::new(),
            array_ind: IndexMap::new(),
            neighbor_cells: Vec::new(),
            dist_matrix: Array2::zeros((0, 0)),
            dist_matrix_version: 0,
            vertices_version: 0,
            edges_version: 0,
        };
        edges.process_edges(unit_cell, vertices)?;
        return Ok(edges);
    }

    /// Check if this data was built from the current state of `unit_cell`
    pub fn is_fresh(&self, unit_cell: &UnitCell) -> bool {
        self.vertices_version == unit_cell.vertices_version()
            && self.edges_version == unit_cell.edges_version()
    }

    /// Get an error if `unit_cell` changed since this data was built
    pub fn ensure_fresh(&self, unit_cell: &UnitCell) -> Result<(), Error> {
        if self.is_fresh(unit_cell) {
            Ok(())
        } else {
            Err(Error::StaleCache(
                "the unit cell changed since the cluster edges were built".into()
            ))
        }
    }

    /// Check that both this and `vertices` are up to date with `unit_cell`
    fn check(&self, unit_cell: &UnitCell, vertices: &ClusterVertices) -> Result<(), Error> {
        vertices.ensure_fresh(unit_cell)?;
        self.ensure_fresh(unit_cell)?;
        if self.size != vertices.size() {
            return Err(Error::StaleCache(
                "the cluster vertices were resized since the cluster edges were built".into()
            ));
        }
        Ok(())
    }

    /// Size `[L, W, H]` of the cluster
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Total number of cluster edges
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Unit cell edge id of each cluster edge
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Type of each cluster edge
    pub fn types(&self) -> &[usize] {
        &self.types
    }

    /// Indexes of the source and target `ClusterVertices` of each edge
    pub fn source_target(&self) -> &[[usize; 2]] {
        &self.source_target
    }

    /// Get the range of cluster edges which are copies of the unit cell edge
    /// with the given id
    pub fn range(&self, edge_id: usize) -> Option<Range<usize>> {
        self.array_ind.get(&edge_id).cloned()
    }

    /// Cells used in the distance matrix, the row `i` of the matrix
    /// corresponds to vertex `i % n_vertices` in cell
    /// `neighbor_cells[i / n_vertices]`
    pub fn neighbor_cells(&self) -> &[Offset] {
        &self.neighbor_cells
    }

    pub fn dist_matrix(&self) -> &Array2<f64> {
        &self.dist_matrix
    }

    /// Get all the cluster edges corresponding to a single unit cell `edge`
    fn edge_pairs(edge: &Edge, vertices: &ClusterVertices) -> Vec<[usize; 2]> {
        let [l, w, h] = vertices.size();
        let mut pairs = Vec::new();
        for x in 0..l {
            for y in 0..w {
                for z in 0..h {
                    let cell = Offset::new(x as i32, y as i32, z as i32);
                    let source = vertices.array_index(edge.source, cell);
                    let target = cell.checked_add(edge.offset)
                        .and_then(|target_cell| vertices.array_index(edge.target, target_cell));
                    if let (Some(source), Some(target)) = (source, target) {
                        pairs.push([source, target]);
                    }
                }
            }
        }
        return pairs;
    }

    fn push_edge(&mut self, edge: &Edge, vertices: &ClusterVertices) {
        let start = self.ids.len();
        for pair in Self::edge_pairs(edge, vertices) {
            self.ids.push(edge.id);
            self.types.push(edge.edge_type);
            self.source_target.push(pair);
        }
        self.array_ind.insert(edge.id, start..self.ids.len());
    }

    /// Rebuild all cluster edges from the `unit_cell` edges. The distance
    /// matrix is also recomputed if the unit cell vertices changed.
    #[time_graph::instrument(name = "ClusterEdges::process_edges")]
    pub fn process_edges(&mut self, unit_cell: &UnitCell, vertices: &ClusterVertices) -> Result<(), Error> {
        vertices.ensure_fresh(unit_cell)?;

        if self.dist_matrix_version != unit_cell.vertices_version() {
            self.compute_dist_matrix(unit_cell);
        }

        self.size = vertices.size();
        self.ids.clear();
        self.types.clear();
        self.source_target.clear();
        self.array_ind.clear();

        for edge in unit_cell.edges() {
            self.push_edge(edge, vertices);
        }

        self.vertices_version = unit_cell.vertices_version();
        self.edges_version = unit_cell.edges_version();
        debug!(
            "built {} cluster edges from {} unit cell edges",
            self.ids.len(), unit_cell.num_edges()
        );
        Ok(())
    }

    /// Compute the distance matrix between unit cell vertices, used to
    /// search for new edges. This only considers vertices in the cells
    /// directly around the origin cell.
    pub fn compute_dist_matrix(&mut self, unit_cell: &UnitCell) {
        let neighbors: &[[i32; 3]] = if unit_cell.dimension() == 3 {
            &NEIGHBOR_CELLS_3D
        } else {
            &NEIGHBOR_CELLS_2D
        };
        self.neighbor_cells = neighbors.iter().map(|&cell| Offset::from(cell)).collect();

        let lattice = unit_cell.lattice();
        let positions = unit_cell.vertices()
            .map(|vertex| lattice.to_cartesian(vertex.coords))
            .collect::<Vec<_>>();
        let shifts = self.neighbor_cells.iter()
            .map(|cell| lattice.to_cartesian(cell.as_vector()))
            .collect::<Vec<_>>();

        let n_vertices = positions.len();
        self.dist_matrix = Array2::from_shape_fn(
            (n_vertices * shifts.len(), n_vertices),
            |(row, column)| {
                let shifted: Vector3D = positions[row % n_vertices] + shifts[row / n_vertices];
                (positions[column] - shifted).norm()
            }
        );
        self.dist_matrix_version = unit_cell.vertices_version();
    }

    /// Add to `unit_cell` all the edges between vertices at the given
    /// distance. This does not update the cluster edges.
    fn add_edges_by_distance(
        &self,
        unit_cell: &mut UnitCell,
        edge_type: usize,
        distance: f64,
        tolerance: f64,
    ) -> Result<Vec<usize>, Error> {
        let epsilon = distance * tolerance / 100.0;
        let vertex_ids = unit_cell.vertices().map(|vertex| vertex.id).collect::<Vec<_>>();
        let n_vertices = vertex_ids.len();

        let mut new_edges = Vec::new();
        for ((row, column), &value) in self.dist_matrix.indexed_iter() {
            // only keep one of (row, column) and (column, row) in the origin
            // cell, columns are always in the origin cell
            if row <= column || (value - distance).abs() >= epsilon {
                continue;
            }

            let offset = self.neighbor_cells[column / n_vertices] - self.neighbor_cells[row / n_vertices];
            let source = vertex_ids[row % n_vertices];
            let target = vertex_ids[column % n_vertices];

            let mut edge = Edge::new(edge_type, source, target, offset);
            edge.length = Some(distance);
            if let Some(id) = unit_cell.add_edge(edge, false)? {
                new_edges.push(id);
            }
        }

        return Ok(new_edges);
    }

    /// Add to the unit cell all edges between pairs of vertices at `distance`
    /// of each other, up to `tolerance` percent of the distance. New edges
    /// have the given `edge_type` and their length set to `distance`, and
    /// edges already present in the unit cell are left untouched. The type
    /// of existing edges is not used to filter the search.
    ///
    /// All cluster edges are rebuilt afterward. This returns the ids of the
    /// new unit cell edges.
    #[time_graph::instrument(name = "ClusterEdges::search_edges_by_dist")]
    pub fn search_edges_by_dist(
        &mut self,
        unit_cell: &mut UnitCell,
        vertices: &ClusterVertices,
        edge_type: usize,
        distance: f64,
        tolerance: f64,
    ) -> Result<Vec<usize>, Error> {
        self.check(unit_cell, vertices)?;
        check_search(distance, tolerance)?;

        let new_edges = self.add_edges_by_distance(unit_cell, edge_type, distance, tolerance)?;
        self.process_edges(unit_cell, vertices)?;

        info!(
            "found {} new edges at distance {} (tolerance {}%)",
            new_edges.len(), distance, tolerance
        );
        return Ok(new_edges);
    }

    /// Search for all edges with the same length as `edge`, and give them the
    /// type of `edge`
    pub fn search_similar_edges(
        &mut self,
        unit_cell: &mut UnitCell,
        vertices: &ClusterVertices,
        edge: &Edge,
    ) -> Result<Vec<usize>, Error> {
        let distance = unit_cell.edge_length(edge)?;
        return self.search_edges_by_dist(
            unit_cell, vertices, edge.edge_type, distance, DEFAULT_SEARCH_TOLERANCE
        );
    }

    /// Remove all unit cell edges, then run all the enabled searches in
    /// `parameters`. This returns the number of unit cell edges with each
    /// searched distance, or 0 for disabled searches.
    pub fn search_by_parameters(
        &mut self,
        unit_cell: &mut UnitCell,
        vertices: &ClusterVertices,
        parameters: &DistanceSearchParameters,
    ) -> Result<Vec<usize>, Error> {
        self.check(unit_cell, vertices)?;
        for search in &parameters.searches {
            check_search(search.distance, search.tolerance)?;
        }

        unit_cell.clear_edges();
        for search in parameters.searches.iter().filter(|search| search.enabled) {
            self.add_edges_by_distance(unit_cell, search.edge_type, search.distance, search.tolerance)?;
        }
        self.process_edges(unit_cell, vertices)?;

        let counts = parameters.searches.iter().map(|search| {
            if search.enabled {
                unit_cell.length_index().get(search.distance).len()
            } else {
                0
            }
        }).collect::<Vec<_>>();

        info!("found {} edges with {} distance searches", unit_cell.num_edges(), counts.len());
        return Ok(counts);
    }

    /// Add a new edge between the cluster vertices at `source_index` and
    /// `target_index`.
    ///
    /// The corresponding unit cell edge is added to the unit cell, and its
    /// copies are appended to the cluster edges. If the unit cell already
    /// contains this edge, nothing changes and `None` is returned. Otherwise
    /// the id of the new unit cell edge is returned.
    pub fn add_edge(
        &mut self,
        unit_cell: &mut UnitCell,
        vertices: &ClusterVertices,
        source_index: usize,
        target_index: usize,
    ) -> Result<Option<usize>, Error> {
        self.check(unit_cell, vertices)?;
        for index in [source_index, target_index] {
            if index >= vertices.len() {
                return Err(Error::InvalidParameter(format!(
                    "cluster vertex index {} is out of bounds for {} vertices", index, vertices.len()
                )));
            }
        }

        let source = vertices.ids()[source_index];
        let target = vertices.ids()[target_index];
        let offset = vertices.cell(target_index) - vertices.cell(source_index);

        let id = match unit_cell.add_edge(Edge::new(0, source, target, offset), true)? {
            Some(id) => id,
            None => return Ok(None),
        };

        let edge = unit_cell.edge(id).cloned().ok_or_else(|| Error::InvalidParameter(
            format!("missing edge {} after insertion", id)
        ))?;
        self.push_edge(&edge, vertices);
        self.edges_version = unit_cell.edges_version();

        return Ok(Some(id));
    }

    /// Remove the unit cell edge with the given `id` and all its copies in
    /// the cluster. Unknown ids are ignored, and give `Ok(None)`.
    pub fn remove_edge(&mut self, unit_cell: &mut UnitCell, id: usize) -> Result<Option<Edge>, Error> {
        self.ensure_fresh(unit_cell)?;
        if unit_cell.edge(id).is_none() {
            return Ok(None);
        }

        let edge = unit_cell.remove_edge(id)?;
        if let Some(range) = self.array_ind.get(&id).cloned() {
            self.ids.drain(range.clone());
            self.types.drain(range.clone());
            self.source_target.drain(range);
        }

        // all ranges after the removed one moved, rebuild them
        let mut array_ind = unit_cell.edges()
            .map(|remaining| (remaining.id, 0..0))
            .collect::<IndexMap<_, _>>();

        let mut start = 0;
        while start < self.ids.len() {
            let edge_id = self.ids[start];
            let mut end = start + 1;
            while end < self.ids.len() && self.ids[end] == edge_id {
                end += 1;
            }
            array_ind.insert(edge_id, start..end);
            start = end;
        }
        self.array_ind = array_ind;
        self.edges_version = unit_cell.edges_version();

        return Ok(Some(edge));
    }

    /// Change the type of the unit cell edge with the given `id` and of all
    /// its copies in the cluster
    pub fn change_edge_type(&mut self, unit_cell: &mut UnitCell, id: usize, edge_type: usize) -> Result<(), Error> {
        self.ensure_fresh(unit_cell)?;
        unit_cell.set_edge_type(id, edge_type)?;

        if let Some(range) = self.array_ind.get(&id).cloned() {
            for value in &mut self.types[range] {
                *value = edge_type;
            }
        }
        self.edges_version = unit_cell.edges_version();
        Ok(())
    }
}

fn check_search(distance: f64, tolerance: f64) -> Result<(), Error> {
    if !(distance.is_finite() && distance > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "search distance must be positive, got {}", distance
        )));
    }

    if !(tolerance.is_finite() && tolerance >= 0.0) {
        return Err(Error::InvalidParameter(format!(
            "search tolerance must be a positive percentage, got {}", tolerance
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_unit_cell;
    use crate::cluster::DistanceSearch;

    fn sorted_edges(edges: &ClusterEdges) -> Vec<(usize, usize, [usize; 2])> {
        let mut all = edges.ids().iter()
            .zip(edges.types())
            .zip(edges.source_target())
            .map(|((&id, &edge_type), &pair)| (id, edge_type, pair))
            .collect::<Vec<_>>();
        all.sort_unstable();
        return all;
    }

    #[test]
    fn expansion() {
        let unit_cell = test_unit_cell("two-vertices");
        let vertices = ClusterVertices::new(&unit_cell, [2, 2, 2]);
        let edges = ClusterEdges::new(&unit_cell, &vertices).unwrap();

        // 8 copies of the edge inside the cell, 4 copies of the others
        assert_eq!(edges.len(), 28);
        assert_eq!(edges.range(1), Some(0..8));
        assert_eq!(edges.range(2), Some(8..12));
        assert_eq!(edges.range(6), Some(24..28));

        for (&id, &[source, target]) in edges.ids().iter().zip(edges.source_target()) {
            let edge = unit_cell.edge(id).unwrap();
            assert_eq!(vertices.ids()[source], edge.source);
            assert_eq!(vertices.ids()[target], edge.target);
            assert_eq!(vertices.cell(target) - vertices.cell(source), edge.offset);
        }

        assert_eq!(edges.dist_matrix().shape(), [28, 2]);
        assert_eq!(edges.neighbor_cells().len(), 14);
    }

    #[test]
    fn single_cell() {
        let unit_cell = test_unit_cell("two-vertices");
        let vertices = ClusterVertices::new(&unit_cell, [1, 1, 1]);
        let edges = ClusterEdges::new(&unit_cell, &vertices).unwrap();

        // all edges going to another cell are dropped
        assert_eq!(edges.ids(), [1]);
        assert_eq!(edges.source_target(), [[0, 1]]);
        for id in 2..=6 {
            assert_eq!(edges.range(id), Some(1..1));
        }
    }

    #[test]
    fn far_away_edges() {
        let mut unit_cell = test_unit_cell("two-vertices");
        unit_cell.clear_edges();
        unit_cell.add_edge(Edge::new(0, 1, 2, Offset::new(i32::MAX, 0, 0)), true).unwrap();

        let vertices = ClusterVertices::new(&unit_cell, [2, 1, 1]);
        let edges = ClusterEdges::new(&unit_cell, &vertices).unwrap();
        assert!(edges.is_empty());
        assert_eq!(edges.range(1), Some(0..0));
    }

    #[test]
    fn incremental_edits() {
        let mut unit_cell = test_unit_cell("two-vertices");
        let vertices = ClusterVertices::new(&unit_cell, [2, 2, 2]);
        let mut edges = ClusterEdges::new(&unit_cell, &vertices).unwrap();

        unit_cell.clear_edges();
        assert!(edges.add_edge(&mut unit_cell, &vertices, 0, 8).is_err());
        edges.process_edges(&unit_cell, &vertices).unwrap();
        assert!(edges.is_empty());

        // vertex 1 and vertex 2 in the first cell
        assert_eq!(edges.add_edge(&mut unit_cell, &vertices, 0, 8).unwrap(), Some(1));
        assert_eq!(edges.len(), 8);
        assert_eq!(unit_cell.edge(1).unwrap().edge_type, 0);

        // vertex 1 in cells (0, 0, 0) and (1, 0, 0)
        assert_eq!(edges.add_edge(&mut unit_cell, &vertices, 0, 4).unwrap(), Some(2));
        assert_eq!(edges.len(), 12);
        assert_eq!(unit_cell.edge(2).unwrap().offset, Offset::new(1, 0, 0));

        // same edge, in the other direction and in other cells
        assert_eq!(edges.add_edge(&mut unit_cell, &vertices, 5, 1).unwrap(), None);
        assert_eq!(edges.len(), 12);

        let rebuilt = ClusterEdges::new(&unit_cell, &vertices).unwrap();
        assert_eq!(sorted_edges(&edges), sorted_edges(&rebuilt));

        let error = edges.add_edge(&mut unit_cell, &vertices, 0, 16).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid parameter: cluster vertex index 16 is out of bounds for 16 vertices"
        );

        edges.change_edge_type(&mut unit_cell, 2, 4).unwrap();
        assert_eq!(&edges.types()[8..12], [4, 4, 4, 4]);

        let removed = edges.remove_edge(&mut unit_cell, 1).unwrap().unwrap();
        assert_eq!((removed.source, removed.target), (1, 2));
        assert_eq!(edges.len(), 4);
        assert_eq!(edges.range(2), Some(0..4));
        assert_eq!(edges.range(1), None);
        assert!(edges.remove_edge(&mut unit_cell, 1).unwrap().is_none());

        // ids are not re-used after removal
        assert_eq!(edges.add_edge(&mut unit_cell, &vertices, 0, 8).unwrap(), Some(3));

        let rebuilt = ClusterEdges::new(&unit_cell, &vertices).unwrap();
        assert_eq!(sorted_edges(&edges), sorted_edges(&rebuilt));
        assert!(edges.is_fresh(&unit_cell));
    }

    #[test]
    fn search_by_distance() {
        let mut unit_cell = test_unit_cell("two-vertices");
        let vertices = ClusterVertices::new(&unit_cell, [2, 2, 2]);
        let mut edges = ClusterEdges::new(&unit_cell, &vertices).unwrap();

        unit_cell.clear_edges();
        edges.process_edges(&unit_cell, &vertices).unwrap();
        edges.add_edge(&mut unit_cell, &vertices, 0, 8).unwrap();
        edges.add_edge(&mut unit_cell, &vertices, 0, 4).unwrap();

        let edge = unit_cell.edge(2).cloned().unwrap();
        let new = edges.search_similar_edges(&mut unit_cell, &vertices, &edge).unwrap();
        assert_eq!(new, [3, 4, 5]);
        assert_eq!(unit_cell.num_edges(), 5);
        assert_eq!(edges.len(), 24);
        assert_eq!(unit_cell.length_index().get(1.0).len(), 4);

        // nothing new the second time
        let new = edges.search_edges_by_dist(&mut unit_cell, &vertices, 0, 1.0, 1.0).unwrap();
        assert!(new.is_empty());

        assert!(edges.search_edges_by_dist(&mut unit_cell, &vertices, 0, -1.0, 1.0).is_err());
        assert!(edges.search_edges_by_dist(&mut unit_cell, &vertices, 0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn search_parameters() {
        let mut unit_cell = test_unit_cell("two-vertices");
        let vertices = ClusterVertices::new(&unit_cell, [2, 2, 2]);
        let mut edges = ClusterEdges::new(&unit_cell, &vertices).unwrap();

        let parameters = DistanceSearchParameters {
            searches: vec![
                DistanceSearch { edge_type: 1, distance: 1.0, tolerance: 1.0, enabled: true },
                DistanceSearch { edge_type: 2, distance: 0.5389, tolerance: 0.1, enabled: true },
                DistanceSearch { edge_type: 3, distance: 0.7927, tolerance: 1.0, enabled: false },
            ],
        };

        let counts = edges.search_by_parameters(&mut unit_cell, &vertices, &parameters).unwrap();
        assert_eq!(counts, [4, 1, 0]);
        assert_eq!(unit_cell.num_edges(), 5);
        assert_eq!(edges.len(), 24);

        // edge ids restart from 1 after clearing the edges
        let ids = unit_cell.edges().map(|edge| edge.id).collect::<Vec<_>>();
        assert_eq!(ids, [1, 2, 3, 4, 5]);

        let types = unit_cell.edges().map(|edge| edge.edge_type).collect::<Vec<_>>();
        assert_eq!(types, [1, 1, 1, 1, 2]);
    }

    #[test]
    fn two_dimensions() {
        let mut unit_cell = test_unit_cell("square");
        let vertices = ClusterVertices::new(&unit_cell, [3, 3, 1]);
        let mut edges = ClusterEdges::new(&unit_cell, &vertices).unwrap();
        assert_eq!(edges.neighbor_cells().len(), 5);
        assert_eq!(edges.dist_matrix().shape(), [5, 1]);

        // diagonal edges
        let new = edges.search_edges_by_dist(&mut unit_cell, &vertices, 2, f64::sqrt(2.0), 1.0).unwrap();
        assert_eq!(new.len(), 2);
        assert_eq!(edges.len(), 6 + 6 + 4 + 4);
    }
}
