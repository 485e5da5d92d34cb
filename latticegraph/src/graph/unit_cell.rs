use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use log::{debug, info};

use crate::{Error, Lattice, Vector3D};
use crate::lattice::{check_dimension, round_to};

use super::{Edge, EdgeKey, Vertex, SymmetryOperation};
use super::symops::orbit;

/// Number of decimals kept in edge lengths
const LENGTH_DECIMALS: i32 = 4;

/// Get a new version token. Tokens are unique across all unit cells, so that
/// a cluster built from one unit cell is never considered up to date with
/// another one.
fn next_version() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Index from edge length (rounded to 4 decimals) to the ids of the edges
/// with this length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LengthIndex {
    /// lengths are stored as integer multiples of 1e-4
    buckets: BTreeMap<i64, Vec<usize>>,
}

impl LengthIndex {
    fn key(length: f64) -> i64 {
        (length * 10.0_f64.powi(LENGTH_DECIMALS)).round() as i64
    }

    fn length(key: i64) -> f64 {
        key as f64 / 10.0_f64.powi(LENGTH_DECIMALS)
    }

    /// Get the ids of all edges with the given `length` (after rounding to 4
    /// decimals)
    pub fn get(&self, length: f64) -> &[usize] {
        self.buckets.get(&Self::key(length)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over all `(length, edge ids)` in this index, sorted by
    /// increasing length
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[usize])> + '_ {
        self.buckets.iter().map(|(&key, ids)| (Self::length(key), ids.as_slice()))
    }

    /// Get the number of distinct lengths
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn insert(&mut self, length: f64, id: usize) {
        self.buckets.entry(Self::key(length)).or_default().push(id);
    }

    fn remove(&mut self, length: f64, id: usize) {
        let key = Self::key(length);
        if let Some(ids) = self.buckets.get_mut(&key) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// A `UnitCell` contains the vertices and edges of a lattice graph, in
/// fractional coordinates of the associated `Lattice`.
///
/// Vertices and edges are iterated in insertion order. Every mutation
/// changes the version tokens of the unit cell (see
/// [`UnitCell::vertices_version`] and [`UnitCell::edges_version`]), which
/// clusters built from this unit cell use to detect that they need to be
/// rebuilt.
#[derive(Debug)]
pub struct UnitCell {
    name: String,
    dimension: usize,
    lattice: Lattice,
    vertices: IndexMap<usize, Vertex>,
    edges: IndexMap<usize, Edge>,
    /// standard form key => edge id, used to reject duplicated edges
    edge_keys: HashMap<EdgeKey, usize>,
    length_index: LengthIndex,
    /// id of the next edge. This is only reset by `clear_edges`, ids of
    /// removed edges are not re-used otherwise.
    next_edge_id: usize,
    vertices_version: u64,
    edges_version: u64,
}

/// Copies get new version tokens, since they can be modified independently
/// of the original unit cell.
impl Clone for UnitCell {
    fn clone(&self) -> UnitCell {
        UnitCell {
            name: self.name.clone(),
            dimension: self.dimension,
            lattice: self.lattice.clone(),
            vertices: self.vertices.clone(),
            edges: self.edges.clone(),
            edge_keys: self.edge_keys.clone(),
            length_index: self.length_index.clone(),
            next_edge_id: self.next_edge_id,
            vertices_version: next_version(),
            edges_version: next_version(),
        }
    }
}

impl UnitCell {
    /// Create an empty unit cell bound to the given `lattice`, with the
    /// same dimension as the lattice
    pub fn new(lattice: Lattice) -> UnitCell {
        UnitCell {
            name: "myUnitCell".into(),
            dimension: lattice.dimension(),
            lattice: lattice,
            vertices: IndexMap::new(),
            edges: IndexMap::new(),
            edge_keys: HashMap::new(),
            length_index: LengthIndex::default(),
            next_edge_id: 1,
            vertices_version: next_version(),
            edges_version: next_version(),
        }
    }

    /// Set the name of this unit cell
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> UnitCell {
        self.name = name.into();
        self
    }

    /// Set the dimension of this unit cell, which must be 1, 2 or 3
    pub fn with_dimension(mut self, dimension: usize) -> Result<UnitCell, Error> {
        check_dimension(dimension)?;
        self.dimension = dimension;
        self.vertices_version = next_version();
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the lattice currently bound to this unit cell
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Version token of the vertices, changed by any modification of the
    /// vertices and by lattice changes
    pub fn vertices_version(&self) -> u64 {
        self.vertices_version
    }

    /// Version token of the edges, changed by any modification of the edges
    pub fn edges_version(&self) -> u64 {
        self.edges_version
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Iterate over all vertices, in insertion order
    pub fn vertices(&self) -> impl ExactSizeIterator<Item = &Vertex> + '_ {
        self.vertices.values()
    }

    /// Iterate over all edges, in insertion order
    pub fn edges(&self) -> impl ExactSizeIterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    pub fn vertex(&self, id: usize) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn edge(&self, id: usize) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Get the position of the vertex with the given `id` in iteration order
    pub fn vertex_ordinal(&self, id: usize) -> Option<usize> {
        self.vertices.get_index_of(&id)
    }

    /// Get the index from edge lengths to edge ids
    pub fn length_index(&self) -> &LengthIndex {
        &self.length_index
    }

    /// Add a vertex to this unit cell, and return the id assigned to it
    /// (number of vertices after insertion).
    pub fn add_vertex(&mut self, mut vertex: Vertex) -> usize {
        let id = self.vertices.len() + 1;
        vertex.id = id;
        self.vertices.insert(id, vertex);
        self.vertices_version = next_version();
        return id;
    }

    /// Change the type of the vertex with the given `id`
    pub fn set_vertex_type(&mut self, id: usize, vertex_type: usize) -> Result<(), Error> {
        let vertex = self.vertices.get_mut(&id).ok_or_else(|| Error::InvalidParameter(
            format!("there is no vertex with id {} in this unit cell", id)
        ))?;
        vertex.vertex_type = vertex_type;
        self.vertices_version = next_version();
        Ok(())
    }

    /// Get the cartesian length of `edge`, using the lattice bound to this
    /// unit cell. This does not round the length.
    pub fn edge_length(&self, edge: &Edge) -> Result<f64, Error> {
        let source = self.vertex_or_error(edge.source)?;
        let target = self.vertex_or_error(edge.target)?;

        let source = self.lattice.to_cartesian(source.coords);
        let target = self.lattice.to_cartesian(target.coords + edge.offset.as_vector());
        return Ok((target - source).norm());
    }

    fn vertex_or_error(&self, id: usize) -> Result<&Vertex, Error> {
        self.vertices.get(&id).ok_or_else(|| Error::InvalidParameter(
            format!("edge refers to vertex {}, which is not in this unit cell", id)
        ))
    }

    /// Add an edge to this unit cell.
    ///
    /// The edge is put in standard form first. If an edge with the same
    /// `(source, target, offset)` already exists, nothing is added and this
    /// function returns `Ok(None)`. Otherwise, the edge gets the next edge id,
    /// which is returned.
    ///
    /// If `recompute_length` is `true` or the edge does not have a length
    /// yet, the length is computed from the lattice and rounded to 4
    /// decimals. Otherwise the given length is used as-is.
    pub fn add_edge(&mut self, edge: Edge, recompute_length: bool) -> Result<Option<usize>, Error> {
        if edge.offset.checked_neg().is_none() {
            return Err(Error::InvalidParameter(format!(
                "edge offset '{}' is out of range", edge.offset
            )));
        }

        let mut edge = edge.standardized();
        let key = edge.key();
        if self.edge_keys.contains_key(&key) {
            return Ok(None);
        }

        let length = match edge.length {
            Some(length) if !recompute_length => length,
            _ => round_to(self.edge_length(&edge)?, LENGTH_DECIMALS),
        };

        let id = self.next_edge_id;
        self.next_edge_id += 1;

        edge.id = id;
        edge.length = Some(length);

        self.length_index.insert(length, id);
        self.edge_keys.insert(key, id);
        self.edges.insert(id, edge);
        self.edges_version = next_version();

        return Ok(Some(id));
    }

    /// Remove the edge with the given `id` from this unit cell, and return it.
    pub fn remove_edge(&mut self, id: usize) -> Result<Edge, Error> {
        let edge = self.edges.shift_remove(&id).ok_or_else(|| Error::InvalidParameter(
            format!("there is no edge with id {} in this unit cell", id)
        ))?;

        self.edge_keys.remove(&edge.key());
        if let Some(length) = edge.length {
            self.length_index.remove(length, id);
        }
        self.edges_version = next_version();

        return Ok(edge);
    }

    /// Change the type of the edge with the given `id`
    pub fn set_edge_type(&mut self, id: usize, edge_type: usize) -> Result<(), Error> {
        let edge = self.edges.get_mut(&id).ok_or_else(|| Error::InvalidParameter(
            format!("there is no edge with id {} in this unit cell", id)
        ))?;
        edge.edge_type = edge_type;
        self.edges_version = next_version();
        Ok(())
    }

    /// Remove all edges, and restart edge ids at 1
    pub fn clear_edges(&mut self) {
        self.edges.clear();
        self.edge_keys.clear();
        self.length_index.clear();
        self.next_edge_id = 1;
        self.edges_version = next_version();
    }

    /// Bind this unit cell to a new `lattice`, and recompute the length of
    /// all edges for this lattice.
    pub fn compute_edges_length(&mut self, lattice: Lattice) -> Result<(), Error> {
        let previous = std::mem::replace(&mut self.lattice, lattice);

        let lengths = self.edges.values()
            .map(|edge| self.edge_length(edge).map(|length| round_to(length, LENGTH_DECIMALS)))
            .collect::<Result<Vec<_>, _>>();

        let lengths = match lengths {
            Ok(lengths) => lengths,
            Err(error) => {
                self.lattice = previous;
                return Err(error);
            }
        };

        self.length_index.clear();
        for (edge, length) in self.edges.values_mut().zip(lengths) {
            edge.length = Some(length);
            self.length_index.insert(length, edge.id);
        }

        self.vertices_version = next_version();
        self.edges_version = next_version();
        debug!("recomputed the length of {} edges", self.edges.len());
        Ok(())
    }

    /// Replace all vertices of this unit cell by the orbits of `sites` under
    /// the symmetry `operations`.
    ///
    /// Each site is given a distinct type (its index in `sites`) if
    /// `assign_different_types` is `true`, and type 0 otherwise. All edges
    /// are removed, since they refer to the previous vertices. If any
    /// operation fails to evaluate, the unit cell is left unchanged.
    pub fn add_vertices_using_symops(
        &mut self,
        sites: &[Vector3D],
        operations: &[SymmetryOperation],
        assign_different_types: bool,
    ) -> Result<(), Error> {
        let mut vertices = Vec::new();
        for (site_index, &site) in sites.iter().enumerate() {
            let vertex_type = if assign_different_types { site_index } else { 0 };
            for coords in orbit(site, operations)? {
                vertices.push(Vertex::new(vertex_type, coords));
            }
        }

        self.vertices.clear();
        self.clear_edges();
        for vertex in vertices {
            self.add_vertex(vertex);
        }
        self.vertices_version = next_version();

        info!(
            "generated {} vertices from {} sites and {} symmetry operations",
            self.vertices.len(), sites.len(), operations.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClusterVertices, Matrix3, Offset};
    use crate::test_utils::test_unit_cell;

    use approx::assert_relative_eq;

    fn two_vertices() -> UnitCell {
        let mut unit_cell = UnitCell::new(Lattice::new(Matrix3::diagonal(1.0, 1.0, 1.3)));
        unit_cell.add_vertex(Vertex::new(0, Vector3D::new(0.2, 0.2, 0.2)));
        unit_cell.add_vertex(Vertex::new(0, Vector3D::new(0.3, 0.3, 0.6)));
        return unit_cell;
    }

    fn check_length_index(unit_cell: &UnitCell) {
        let mut all_ids = Vec::new();
        for (length, ids) in unit_cell.length_index().iter() {
            for &id in ids {
                let edge = unit_cell.edge(id).unwrap();
                assert_relative_eq!(edge.length.unwrap(), length, epsilon = 1e-4);
            }
            all_ids.extend_from_slice(ids);
        }

        all_ids.sort_unstable();
        let mut edge_ids = unit_cell.edges().map(|edge| edge.id).collect::<Vec<_>>();
        edge_ids.sort_unstable();
        assert_eq!(all_ids, edge_ids);
    }

    #[test]
    fn vertices() {
        let unit_cell = two_vertices();
        assert_eq!(unit_cell.name(), "myUnitCell");
        assert_eq!(unit_cell.dimension(), 3);
        assert_eq!(unit_cell.num_vertices(), 2);

        let ids = unit_cell.vertices().map(|vertex| vertex.id).collect::<Vec<_>>();
        assert_eq!(ids, [1, 2]);
        assert_eq!(unit_cell.vertex(2).unwrap().coords, Vector3D::new(0.3, 0.3, 0.6));
        assert_eq!(unit_cell.vertex_ordinal(2), Some(1));
        assert!(unit_cell.vertex(3).is_none());
    }

    #[test]
    fn add_edges() {
        let mut unit_cell = two_vertices();

        let id = unit_cell.add_edge(Edge::new(1, 1, 2, Offset::zero()), true).unwrap();
        assert_eq!(id, Some(1));

        let edge = unit_cell.edge(1).unwrap();
        assert_eq!(edge.edge_type, 1);
        // sqrt(0.1² + 0.1² + 0.52²)
        assert_eq!(edge.length, Some(0.5389));

        let id = unit_cell.add_edge(Edge::new(0, 2, 1, Offset::new(0, 0, 1)), true).unwrap();
        assert_eq!(id, Some(2));
        let edge = unit_cell.edge(2).unwrap();
        assert_eq!((edge.source, edge.target, edge.offset), (2, 1, Offset::new(0, 0, 1)));

        let error = unit_cell.add_edge(Edge::new(0, 1, 3, Offset::zero()), true).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid parameter: edge refers to vertex 3, which is not in this unit cell"
        );
        assert_eq!(unit_cell.num_edges(), 2);
    }

    #[test]
    fn duplicated_edges() {
        let mut unit_cell = two_vertices();
        assert!(unit_cell.add_edge(Edge::new(0, 1, 1, Offset::new(1, 0, 0)), true).unwrap().is_some());

        let version = unit_cell.edges_version();
        // same edge, reversed and with a different type
        let id = unit_cell.add_edge(Edge::new(3, 1, 1, Offset::new(-1, 0, 0)), true).unwrap();
        assert_eq!(id, None);
        assert_eq!(unit_cell.num_edges(), 1);
        assert_eq!(unit_cell.edge(1).unwrap().edge_type, 0);
        assert_eq!(unit_cell.edges_version(), version);
    }

    #[test]
    fn preset_length() {
        let mut unit_cell = two_vertices();

        let mut edge = Edge::new(0, 1, 1, Offset::new(1, 0, 0));
        edge.length = Some(0.99999);
        unit_cell.add_edge(edge.clone(), false).unwrap();
        assert_eq!(unit_cell.edge(1).unwrap().length, Some(0.99999));
        assert_eq!(unit_cell.length_index().get(1.0), [1]);

        unit_cell.clear_edges();
        unit_cell.add_edge(edge, true).unwrap();
        assert_eq!(unit_cell.edge(1).unwrap().length, Some(1.0));
    }

    #[test]
    fn remove_edges() {
        let mut unit_cell = test_unit_cell("two-vertices");
        assert_eq!(unit_cell.num_edges(), 6);
        check_length_index(&unit_cell);

        assert_eq!(unit_cell.length_index().get(1.0), [3, 4, 5, 6]);

        let edge = unit_cell.remove_edge(4).unwrap();
        assert_eq!(edge.offset, Offset::new(0, 1, 0));
        assert_eq!(unit_cell.length_index().get(1.0), [3, 5, 6]);
        check_length_index(&unit_cell);

        let error = unit_cell.remove_edge(4).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: there is no edge with id 4 in this unit cell");

        // removed edge ids are not re-used
        let id = unit_cell.add_edge(Edge::new(0, 1, 1, Offset::new(0, 1, 0)), true).unwrap();
        assert_eq!(id, Some(7));
        let ids = unit_cell.edges().map(|edge| edge.id).collect::<Vec<_>>();
        assert_eq!(ids, [1, 2, 3, 5, 6, 7]);

        // removing the last edge of a given length removes the length
        let n_lengths = unit_cell.length_index().len();
        unit_cell.remove_edge(1).unwrap();
        assert_eq!(unit_cell.length_index().len(), n_lengths - 1);
        assert!(unit_cell.length_index().get(0.5389).is_empty());
        check_length_index(&unit_cell);

        // ... until all edges are cleared
        unit_cell.clear_edges();
        assert_eq!(unit_cell.num_edges(), 0);
        assert!(unit_cell.length_index().is_empty());
        let id = unit_cell.add_edge(Edge::new(0, 1, 1, Offset::new(0, 1, 0)), true).unwrap();
        assert_eq!(id, Some(1));
    }

    #[test]
    fn edge_types() {
        let mut unit_cell = test_unit_cell("two-vertices");
        let version = unit_cell.edges_version();
        unit_cell.set_edge_type(3, 7).unwrap();
        assert_eq!(unit_cell.edge(3).unwrap().edge_type, 7);
        assert_ne!(unit_cell.edges_version(), version);

        assert!(unit_cell.set_edge_type(42, 7).is_err());

        let version = unit_cell.vertices_version();
        unit_cell.set_vertex_type(1, 2).unwrap();
        assert_eq!(unit_cell.vertex(1).unwrap().vertex_type, 2);
        assert_ne!(unit_cell.vertices_version(), version);
    }

    #[test]
    fn change_lattice() {
        let mut unit_cell = test_unit_cell("two-vertices");
        let version = unit_cell.vertices_version();

        unit_cell.compute_edges_length(Lattice::new(Matrix3::diagonal(2.0, 2.0, 2.6))).unwrap();
        assert_ne!(unit_cell.vertices_version(), version);
        assert_eq!(unit_cell.lattice().a(), 2.0);
        assert_eq!(unit_cell.edge(3).unwrap().length, Some(2.0));
        assert_eq!(unit_cell.length_index().get(2.0), [3, 4, 5, 6]);
        assert!(unit_cell.length_index().get(1.0).is_empty());
        check_length_index(&unit_cell);
    }

    #[test]
    fn versions_are_unique() {
        let first = UnitCell::new(Lattice::default());
        let second = UnitCell::new(Lattice::default());
        assert_ne!(first.vertices_version(), second.vertices_version());
        assert_ne!(first.edges_version(), second.edges_version());
    }

    #[test]
    fn clones_have_new_versions() {
        let unit_cell = test_unit_cell("two-vertices");
        let vertices = ClusterVertices::new(&unit_cell, [2, 2, 2]);

        let mut copy = unit_cell.clone();
        assert_ne!(copy.vertices_version(), unit_cell.vertices_version());
        assert_ne!(copy.edges_version(), unit_cell.edges_version());
        assert_eq!(copy.num_vertices(), 2);
        assert_eq!(copy.num_edges(), 6);

        assert!(vertices.is_fresh(&unit_cell));
        assert!(!vertices.is_fresh(&copy));

        // the copy keeps the edge ids and lengths of the original
        copy.remove_edge(6).unwrap();
        assert_eq!(copy.add_edge(Edge::new(0, 1, 1, Offset::new(0, 0, 1)), true).unwrap(), Some(7));
        assert_eq!(copy.length_index().get(1.0), [3, 4, 5]);
        assert_eq!(unit_cell.num_edges(), 6);
    }

    #[test]
    fn out_of_range_offset() {
        let mut unit_cell = two_vertices();
        let error = unit_cell.add_edge(Edge::new(0, 1, 2, Offset::new(0, i32::MIN, 0)), true).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: edge offset '0 -2147483648 0' is out of range");
        assert_eq!(unit_cell.num_edges(), 0);

        // the largest offsets can still be used
        let id = unit_cell.add_edge(Edge::new(0, 1, 2, Offset::new(0, -i32::MAX, 0)), true).unwrap();
        assert_eq!(id, Some(1));
        assert_eq!(unit_cell.edge(1).unwrap().offset, Offset::new(0, i32::MAX, 0));
    }

    #[test]
    fn symmetry_operations() {
        let mut unit_cell = two_vertices();
        unit_cell.add_edge(Edge::new(0, 1, 2, Offset::zero()), true).unwrap();
        let version = unit_cell.vertices_version();

        let sites = [
            Vector3D::new(0.1, 0.25, 0.5),
            Vector3D::new(0.333, 0.7, 0.0),
            Vector3D::new(1.25, -0.5, 0.125),
        ];
        let identity = [SymmetryOperation::identity()];
        unit_cell.add_vertices_using_symops(&sites, &identity, true).unwrap();

        // previous vertices and edges are replaced, ids restart at 1
        assert_ne!(unit_cell.vertices_version(), version);
        assert_eq!(unit_cell.num_vertices(), 3);
        assert_eq!(unit_cell.num_edges(), 0);
        let vertices = unit_cell.vertices()
            .map(|vertex| (vertex.id, vertex.vertex_type, vertex.coords))
            .collect::<Vec<_>>();
        assert_eq!(vertices, [
            (1, 0, Vector3D::new(0.1, 0.25, 0.5)),
            (2, 1, Vector3D::new(0.333, 0.7, 0.0)),
            (3, 2, Vector3D::new(0.25, 0.5, 0.125)),
        ]);

        // same type for all sites, and a two-fold axis along z
        let operations = [SymmetryOperation::identity(), "-x,-y,z".parse().unwrap()];
        unit_cell.add_vertices_using_symops(&sites[..2], &operations, false).unwrap();
        let vertices = unit_cell.vertices()
            .map(|vertex| (vertex.id, vertex.vertex_type, vertex.coords))
            .collect::<Vec<_>>();
        assert_eq!(vertices, [
            (1, 0, Vector3D::new(0.1, 0.25, 0.5)),
            (2, 0, Vector3D::new(0.9, 0.75, 0.5)),
            (3, 0, Vector3D::new(0.333, 0.7, 0.0)),
            (4, 0, Vector3D::new(0.667, 0.3, 0.0)),
        ]);

        // invalid operations leave the unit cell unchanged
        let invalid = ["x/0,y,z".parse::<SymmetryOperation>().unwrap()];
        assert!(unit_cell.add_vertices_using_symops(&sites, &invalid, true).is_err());
        assert_eq!(unit_cell.num_vertices(), 4);
    }
}
