use crate::{Edge, Lattice, Matrix3, Offset, UnitCell, Vector3D, Vertex};

pub fn test_unit_cell(name: &str) -> UnitCell {
    match name {
        "two-vertices" => get_two_vertices(),
        "square" => get_square(),
        "chain" => get_chain(),
        _ => panic!("unknown test unit cell {}", name)
    }
}

fn add_edges(unit_cell: &mut UnitCell, edges: &[(usize, usize, usize, [i32; 3])]) {
    for &(edge_type, source, target, offset) in edges {
        let edge = Edge::new(edge_type, source, target, Offset::from(offset));
        unit_cell.add_edge(edge, true).unwrap().unwrap();
    }
}

/// Two vertices in an orthorhombic cell, with one edge between them in the
/// same cell, one edge between them in neighboring cells along c, and
/// self-edges along a and b for both vertices.
fn get_two_vertices() -> UnitCell {
    let lattice = Lattice::new(Matrix3::diagonal(1.0, 1.0, 1.3));
    let mut unit_cell = UnitCell::new(lattice);
    unit_cell.add_vertex(Vertex::new(0, Vector3D::new(0.2, 0.2, 0.2)));
    unit_cell.add_vertex(Vertex::new(0, Vector3D::new(0.3, 0.3, 0.6)));

    add_edges(&mut unit_cell, &[
        (1, 1, 2, [0, 0, 0]),
        (2, 2, 1, [0, 0, 1]),
        (0, 1, 1, [1, 0, 0]),
        (0, 1, 1, [0, 1, 0]),
        (0, 2, 2, [1, 0, 0]),
        (0, 2, 2, [0, 1, 0]),
    ]);
    return unit_cell;
}

/// Square lattice with nearest neighbors edges. The third lattice vector is
/// left to zero, as in two dimensional lattice graph libraries.
fn get_square() -> UnitCell {
    let basis = Matrix3::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]);
    let lattice = Lattice::new(basis).with_dimension(2).unwrap();
    let mut unit_cell = UnitCell::new(lattice);
    unit_cell.add_vertex(Vertex::new(0, Vector3D::zero()));

    add_edges(&mut unit_cell, &[
        (0, 1, 1, [1, 0, 0]),
        (1, 1, 1, [0, 1, 0]),
    ]);
    return unit_cell;
}

/// One dimensional chain with two vertices per cell
fn get_chain() -> UnitCell {
    let basis = Matrix3::new([[2.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
    let lattice = Lattice::new(basis).with_dimension(1).unwrap();
    let mut unit_cell = UnitCell::new(lattice);
    unit_cell.add_vertex(Vertex::new(0, Vector3D::zero()));
    unit_cell.add_vertex(Vertex::new(1, Vector3D::new(0.5, 0.0, 0.0)));

    add_edges(&mut unit_cell, &[
        (0, 1, 2, [0, 0, 0]),
        (0, 2, 1, [1, 0, 0]),
    ]);
    return unit_cell;
}
