use std::path::Path;

use log::info;

use crate::{Error, UnitCell};
use super::xml::XmlElement;

const EXTENT_NAMES: [&str; 3] = ["L", "W", "H"];

/// Format a floating point value so that it can be read back exactly, always
/// including a decimal point
fn format_float(value: f64) -> String {
    // avoid writing -0.0
    format!("{:?}", value + 0.0)
}

fn join_floats(values: &[f64]) -> String {
    values.iter().map(|&v| format_float(v)).collect::<Vec<_>>().join(" ")
}

/// Export a unit cell (and the lattice it is bound to) as a library
/// containing a single LATTICEGRAPH.
///
/// Basis vectors and vertex coordinates are written with as many components
/// as the lattice dimension, and the finite lattice uses the `L`, `W`, `H`
/// extent parameters. Edge ids are renumbered from 1 by default.
pub struct LatticeGraphExporter<'a> {
    unit_cell: &'a UnitCell,
    name: String,
    renumber: bool,
}

impl<'a> LatticeGraphExporter<'a> {
    /// Create an exporter writing `unit_cell` in a LATTICEGRAPH called `name`
    pub fn new(unit_cell: &'a UnitCell, name: &str) -> LatticeGraphExporter<'a> {
        LatticeGraphExporter {
            unit_cell: unit_cell,
            name: name.into(),
            renumber: true,
        }
    }

    /// Should edges get new sequential ids (starting at 1) in the output,
    /// or keep their current ids?
    #[must_use]
    pub fn renumber(mut self, renumber: bool) -> LatticeGraphExporter<'a> {
        self.renumber = renumber;
        self
    }

    /// Get the XML text for the library
    pub fn xml_string(&self) -> Result<String, Error> {
        self.library().to_document()
    }

    /// Write the library to the file at `path`, replacing any existing file
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        std::fs::write(path, self.xml_string()?)?;
        info!("exported LATTICEGRAPH '{}' to {}", self.name, path.display());
        Ok(())
    }

    fn library(&self) -> XmlElement {
        let mut graph = XmlElement::new("LATTICEGRAPH").with_attribute("name", &self.name);
        graph.push(self.finite_lattice());
        graph.push(self.unit_cell_element());

        let mut library = XmlElement::new("LATTICES");
        library.push(graph);
        return library;
    }

    fn finite_lattice(&self) -> XmlElement {
        let lattice = self.unit_cell.lattice();
        let dimension = lattice.dimension();

        let mut basis = XmlElement::new("BASIS");
        for i in 0..dimension {
            let vector = lattice.vector(i).to_array();
            basis.push(XmlElement::new("VECTOR").with_text(join_floats(&vector[..dimension])));
        }

        let mut lattice_element = XmlElement::new("LATTICE")
            .with_attribute("name", lattice.name())
            .with_attribute("dimension", dimension);
        lattice_element.push(basis);

        let mut finite_lattice = XmlElement::new("FINITELATTICE");
        finite_lattice.push(lattice_element);

        for i in 0..dimension {
            let mut parameter = XmlElement::new("PARAMETER").with_attribute("name", EXTENT_NAMES[i]);
            if i > 0 {
                parameter = parameter.with_attribute("default", EXTENT_NAMES[i - 1]);
            }
            finite_lattice.push(parameter);
        }

        for (i, name) in EXTENT_NAMES.iter().enumerate().take(dimension) {
            finite_lattice.push(XmlElement::new("EXTENT")
                .with_attribute("dimension", i + 1)
                .with_attribute("size", name)
            );
        }

        finite_lattice.push(XmlElement::new("BOUNDARY").with_attribute("type", lattice.boundary().as_str()));
        return finite_lattice;
    }

    fn unit_cell_element(&self) -> XmlElement {
        let unit_cell = self.unit_cell;
        let dimension = unit_cell.lattice().dimension();

        let mut element = XmlElement::new("UNITCELL")
            .with_attribute("name", unit_cell.name())
            .with_attribute("dimension", unit_cell.dimension())
            .with_attribute("vertices", unit_cell.num_vertices())
            .with_attribute("edges", unit_cell.num_edges());

        for vertex in unit_cell.vertices() {
            let coords = vertex.coords.to_array();
            let mut vertex_element = XmlElement::new("VERTEX")
                .with_attribute("id", vertex.id)
                .with_attribute("type", vertex.vertex_type);
            vertex_element.push(XmlElement::new("COORDINATE").with_text(join_floats(&coords[..dimension])));
            element.push(vertex_element);
        }

        for (i, edge) in unit_cell.edges().enumerate() {
            let id = if self.renumber { i + 1 } else { edge.id };
            let mut edge_element = XmlElement::new("EDGE")
                .with_attribute("id", id)
                .with_attribute("type", edge.edge_type);
            edge_element.push(XmlElement::new("SOURCE").with_attribute("vertex", edge.source));
            edge_element.push(XmlElement::new("TARGET")
                .with_attribute("vertex", edge.target)
                .with_attribute("offset", edge.offset)
            );
            element.push(edge_element);
        }

        return element;
    }
}
