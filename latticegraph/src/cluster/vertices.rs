use std::ops::Range;

use indexmap::IndexMap;
use log::debug;

use crate::{Error, Offset, UnitCell, Vector3D};

/// Vertices of a finite cluster of `L x W x H` cells, built by repeating
/// the vertices of a `UnitCell` in all cells.
///
/// Data is stored in flat arrays, where all copies of a given unit cell
/// vertex are stored contiguously. Inside such a block, the copy in cell
/// `(x, y, z)` is at position `x * W * H + y * H + z`.
#[derive(Debug, Clone)]
pub struct ClusterVertices {
    size: [usize; 3],
    /// cartesian position of the origin of each cell
    sites: Vec<Vector3D>,
    /// id of the unit cell vertex for each cluster vertex
    ids: Vec<usize>,
    /// type of each cluster vertex
    types: Vec<usize>,
    /// cartesian position of each cluster vertex
    coords: Vec<Vector3D>,
    /// range of cluster vertices for each unit cell vertex id
    array_ind: IndexMap<usize, Range<usize>>,
    /// version of the unit cell vertices used to build this
    vertices_version: u64,
}

impl ClusterVertices {
    /// Build the cluster vertices for the given `unit_cell` and `size`
    pub fn new(unit_cell: &UnitCell, size: [usize; 3]) -> ClusterVertices {
        let mut vertices = ClusterVertices {
            size: size,
            sites: Vec::new(),
            ids: Vec::new(),
            types: Vec::new(),
            coords: Vec::new(),
            array_ind: IndexMap::new(),
            vertices_version: 0,
        };
        vertices.process_vertices(unit_cell, size);
        return vertices;
    }

    /// Rebuild all the data from the `unit_cell` vertices, for a cluster
    /// of the given `size`
    #[time_graph::instrument(name = "ClusterVertices::process_vertices")]
    pub fn process_vertices(&mut self, unit_cell: &UnitCell, size: [usize; 3]) {
        let lattice = unit_cell.lattice();
        self.size = size;
        self.sites = lattice.finite_lattice_sites(size);

        let n_sites = self.sites.len();
        let n_vertices = unit_cell.num_vertices() * n_sites;

        self.ids = Vec::with_capacity(n_vertices);
        self.types = Vec::with_capacity(n_vertices);
        self.coords = Vec::with_capacity(n_vertices);
        self.array_ind.clear();

        for vertex in unit_cell.vertices() {
            let start = self.ids.len();
            let position = lattice.to_cartesian(vertex.coords);
            for site in &self.sites {
                self.ids.push(vertex.id);
                self.types.push(vertex.vertex_type);
                self.coords.push(site + position);
            }
            self.array_ind.insert(vertex.id, start..self.ids.len());
        }

        self.vertices_version = unit_cell.vertices_version();
        debug!(
            "built {} cluster vertices for a {}x{}x{} cluster",
            self.ids.len(), size[0], size[1], size[2]
        );
    }

    /// Check if this data was built from the current state of `unit_cell`
    pub fn is_fresh(&self, unit_cell: &UnitCell) -> bool {
        self.vertices_version == unit_cell.vertices_version()
    }

    /// Get an error if the vertices of `unit_cell` changed since this data
    /// was built
    pub fn ensure_fresh(&self, unit_cell: &UnitCell) -> Result<(), Error> {
        if self.is_fresh(unit_cell) {
            Ok(())
        } else {
            Err(Error::StaleCache(
                "the unit cell vertices changed since the cluster vertices were built".into()
            ))
        }
    }

    /// Size `[L, W, H]` of the cluster
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Number of cells in the cluster
    pub fn n_cells(&self) -> usize {
        self.sites.len()
    }

    /// Cartesian position of the origin of each cell
    pub fn sites(&self) -> &[Vector3D] {
        &self.sites
    }

    /// Total number of cluster vertices
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Unit cell vertex id of each cluster vertex
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Type of each cluster vertex
    pub fn types(&self) -> &[usize] {
        &self.types
    }

    /// Cartesian position of each cluster vertex
    pub fn coords(&self) -> &[Vector3D] {
        &self.coords
    }

    /// Get the range of cluster vertices which are copies of the unit cell
    /// vertex with the given id
    pub fn range(&self, vertex_id: usize) -> Option<Range<usize>> {
        self.array_ind.get(&vertex_id).cloned()
    }

    /// Get the position of `cell` in the list of cells, or `None` if this
    /// cell is outside of the cluster
    pub fn cell_index(&self, cell: Offset) -> Option<usize> {
        let [l, w, h] = self.size;
        let inside = |value: i32, max: usize| value >= 0 && (value as usize) < max;
        if !(inside(cell[0], l) && inside(cell[1], w) && inside(cell[2], h)) {
            return None;
        }

        let (x, y, z) = (cell[0] as usize, cell[1] as usize, cell[2] as usize);
        return Some(x * w * h + y * h + z);
    }

    /// Get the index in the flat arrays of the copy of vertex `vertex_id` in
    /// the given `cell`, or `None` if the vertex or the cell do not exist.
    pub fn array_index(&self, vertex_id: usize, cell: Offset) -> Option<usize> {
        let range = self.array_ind.get(&vertex_id)?;
        let index = self.cell_index(cell)?;
        return Some(range.start + index);
    }

    /// Get the cell containing the cluster vertex at `index` in the flat
    /// arrays.
    ///
    /// # Panics
    ///
    /// If `index` is out of bounds
    pub fn cell(&self, index: usize) -> Offset {
        assert!(index < self.len(), "cluster vertex index {} is out of bounds", index);
        let [_, w, h] = self.size;
        let k = index % self.n_cells();
        return Offset::new((k / (w * h)) as i32, ((k / h) % w) as i32, (k % h) as i32);
    }
}
