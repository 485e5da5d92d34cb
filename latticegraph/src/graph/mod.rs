//! Vertices and edges of a lattice graph, and the `UnitCell` containing them.
use std::ops::{Add, Sub, Neg, Index};

use crate::Vector3D;

mod unit_cell;
pub use self::unit_cell::{UnitCell, LengthIndex};

mod symops;
pub use self::symops::{SymmetryOperation, parse_symmetry_operations};

/// Integer displacement between two cells of the lattice, in units of the
/// lattice vectors. This is used both as the offset crossed by an edge and
/// as the `(x, y, z)` index of a cell in a finite cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Offset([i32; 3]);

impl Offset {
    pub const fn new(x: i32, y: i32, z: i32) -> Offset {
        Offset([x, y, z])
    }

    pub const fn zero() -> Offset {
        Offset([0, 0, 0])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }

    pub fn to_array(self) -> [i32; 3] {
        self.0
    }

    /// Add `other` to this offset, returning `None` on overflow
    pub fn checked_add(self, other: Offset) -> Option<Offset> {
        return Some(Offset([
            self[0].checked_add(other[0])?,
            self[1].checked_add(other[1])?,
            self[2].checked_add(other[2])?,
        ]));
    }

    /// Negate this offset, returning `None` if one of the components is
    /// `i32::MIN`
    pub fn checked_neg(self) -> Option<Offset> {
        return Some(Offset([
            self[0].checked_neg()?,
            self[1].checked_neg()?,
            self[2].checked_neg()?,
        ]));
    }

    /// Get this offset as a vector in fractional coordinates
    pub fn as_vector(&self) -> Vector3D {
        Vector3D::new(self[0] as f64, self[1] as f64, self[2] as f64)
    }
}

impl From<[i32; 3]> for Offset {
    fn from(array: [i32; 3]) -> Offset {
        Offset(array)
    }
}

impl Add<Offset> for Offset {
    type Output = Offset;

    fn add(mut self, rhs: Offset) -> Offset {
        self.0[0] += rhs[0];
        self.0[1] += rhs[1];
        self.0[2] += rhs[2];
        return self;
    }
}

impl Sub<Offset> for Offset {
    type Output = Offset;

    fn sub(mut self, rhs: Offset) -> Offset {
        self.0[0] -= rhs[0];
        self.0[1] -= rhs[1];
        self.0[2] -= rhs[2];
        return self;
    }
}

impl Neg for Offset {
    type Output = Offset;

    fn neg(self) -> Offset {
        Offset([-self[0], -self[1], -self[2]])
    }
}

impl Index<usize> for Offset {
    type Output = i32;

    fn index(&self, index: usize) -> &i32 {
        &self.0[index]
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self[0], self[1], self[2])
    }
}

/// A vertex (site) of the unit cell
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Identifier of this vertex in the unit cell, starting at 1
    pub id: usize,
    /// Type of this vertex
    pub vertex_type: usize,
    /// Fractional coordinates of this vertex
    pub coords: Vector3D,
}

impl Vertex {
    /// Create a new vertex with the given type and fractional coordinates.
    /// The id is assigned when adding the vertex to a `UnitCell`.
    pub fn new(vertex_type: usize, coords: Vector3D) -> Vertex {
        Vertex {
            id: 0,
            vertex_type: vertex_type,
            coords: coords,
        }
    }
}

/// Key identifying an edge for duplicate detection: `(source, target,
/// offset)` of the edge in standard form.
pub type EdgeKey = (usize, usize, Offset);

/// An edge (bond) of the unit cell, going from vertex `source` in the cell
/// at the origin to vertex `target` in the cell at `offset`.
///
/// Edges are stored in the `UnitCell` in standard form, where either the
/// offset is zero and `source <= target`, or the first non-zero component of
/// the offset is positive. This gives a single representation to an edge and
/// its reverse periodic image.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Identifier of this edge in the unit cell, starting at 1
    pub id: usize,
    /// Type of this edge
    pub edge_type: usize,
    /// Id of the source vertex
    pub source: usize,
    /// Id of the target vertex
    pub target: usize,
    /// Cell offset from the source to the target
    pub offset: Offset,
    /// Cartesian length of this edge, if known
    pub length: Option<f64>,
}

impl Edge {
    /// Create a new edge with the given type, endpoints and offset. The id is
    /// assigned when adding the edge to a `UnitCell`.
    pub fn new(edge_type: usize, source: usize, target: usize, offset: Offset) -> Edge {
        Edge {
            id: 0,
            edge_type: edge_type,
            source: source,
            target: target,
            offset: offset,
            length: None,
        }
    }

    /// Check if this edge is in standard form
    pub fn is_standard(&self) -> bool {
        let first_non_zero = self.offset.0.iter().find(|&&value| value != 0);
        match first_non_zero {
            None => self.source <= self.target,
            Some(&value) => value > 0,
        }
    }

    /// Put this edge in standard form, exchanging source and target and
    /// negating the offset if needed
    ///
    /// # Panics
    ///
    /// If the offset has to be negated and one of its components is
    /// `i32::MIN`
    pub fn standardize(&mut self) {
        if !self.is_standard() {
            std::mem::swap(&mut self.source, &mut self.target);
            self.offset = -self.offset;
        }
    }

    /// Get this edge in standard form
    #[must_use]
    pub fn standardized(mut self) -> Edge {
        self.standardize();
        self
    }

    /// Get the key used to detect duplicated edges. Two edges are duplicates
    /// if their keys are equal, regardless of their type.
    pub fn key(&self) -> EdgeKey {
        let standard = if self.is_standard() {
            (self.source, self.target, self.offset)
        } else {
            (self.target, self.source, -self.offset)
        };
        return standard;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset() {
        let a = Offset::new(1, 0, -1);
        let b = Offset::new(0, 2, 1);
        assert_eq!(a + b, Offset::new(1, 2, 0));
        assert_eq!(a - b, Offset::new(1, -2, -2));
        assert_eq!(-a, Offset::new(-1, 0, 1));
        assert_eq!(a[2], -1);
        assert!(!a.is_zero());
        assert!(Offset::zero().is_zero());
        assert_eq!(a.as_vector(), Vector3D::new(1.0, 0.0, -1.0));
        assert_eq!(a.to_string(), "1 0 -1");

        assert_eq!(a.checked_add(b), Some(Offset::new(1, 2, 0)));
        assert_eq!(a.checked_add(Offset::new(0, i32::MAX, 0)), Some(Offset::new(1, i32::MAX, -1)));
        assert_eq!(a.checked_add(Offset::new(i32::MAX, 0, 0)), None);
        assert_eq!(a.checked_neg(), Some(-a));
        assert_eq!(Offset::new(0, i32::MIN, 0).checked_neg(), None);
    }

    #[test]
    fn standard_form() {
        let edge = Edge::new(0, 2, 1, Offset::zero()).standardized();
        assert_eq!((edge.source, edge.target, edge.offset), (1, 2, Offset::zero()));

        let edge = Edge::new(0, 1, 2, Offset::new(0, -1, 1)).standardized();
        assert_eq!((edge.source, edge.target, edge.offset), (2, 1, Offset::new(0, 1, -1)));

        let edge = Edge::new(0, 2, 1, Offset::new(0, 0, 1)).standardized();
        assert_eq!((edge.source, edge.target, edge.offset), (2, 1, Offset::new(0, 0, 1)));

        let edge = Edge::new(0, 1, 1, Offset::new(-1, 0, 0)).standardized();
        assert_eq!((edge.source, edge.target, edge.offset), (1, 1, Offset::new(1, 0, 0)));
    }

    #[test]
    fn standard_form_idempotence() {
        for x in -1..=1 {
            for y in -1..=1 {
                for z in -1..=1 {
                    for (source, target) in [(1, 2), (2, 1), (3, 3)] {
                        let once = Edge::new(0, source, target, Offset::new(x, y, z)).standardized();
                        assert!(once.is_standard());

                        let twice = once.clone().standardized();
                        assert_eq!(once, twice);
                        assert_eq!(once.key(), Edge::new(1, source, target, Offset::new(x, y, z)).key());
                    }
                }
            }
        }
    }

    #[test]
    fn duplicate_keys() {
        let edge = Edge::new(0, 1, 2, Offset::new(1, 0, 0));
        let reversed = Edge::new(3, 2, 1, Offset::new(-1, 0, 0));
        assert_eq!(edge.key(), reversed.key());

        let other = Edge::new(0, 1, 2, Offset::new(-1, 0, 0));
        assert_ne!(edge.key(), other.key());
    }
}
