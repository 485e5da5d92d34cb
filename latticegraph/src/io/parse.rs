use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};

use crate::{Boundary, Edge, Error, Lattice, Matrix3, Offset, UnitCell, Vector3D, Vertex};
use crate::expr::evaluate;

use super::xml::XmlElement;

/// Where to read a lattice graph library from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlSource {
    /// Read the library from the file at this path
    Path(PathBuf),
    /// Read the library from the given XML text
    String(String),
}

/// Parser for LATTICEGRAPH libraries, in the format used by ALPS lattice
/// libraries.
///
/// A library contains a set of named `<LATTICEGRAPH>`, each made of a
/// `<FINITELATTICE>` and an `<UNITCELL>`. Lattices and unit cells can be
/// defined inline, or at the top level of the library and referenced by
/// name with a `ref` attribute.
#[derive(Debug, Clone)]
pub struct LatticeGraphParser {
    root: XmlElement,
}

impl LatticeGraphParser {
    /// Load a library from the given `source`
    pub fn new(source: XmlSource) -> Result<LatticeGraphParser, Error> {
        let root = match source {
            XmlSource::Path(path) => {
                debug!("reading lattice graph library from {}", path.display());
                XmlElement::parse(&std::fs::read_to_string(path)?)?
            }
            XmlSource::String(text) => XmlElement::parse(&text)?,
        };

        return Ok(LatticeGraphParser { root });
    }

    /// Load a library from the file at `path`
    pub fn from_path(path: impl AsRef<Path>) -> Result<LatticeGraphParser, Error> {
        LatticeGraphParser::new(XmlSource::Path(path.as_ref().to_path_buf()))
    }

    /// Load a library from XML `text`
    pub fn from_string(text: &str) -> Result<LatticeGraphParser, Error> {
        LatticeGraphParser::new(XmlSource::String(text.into()))
    }

    /// Get the names of all LATTICEGRAPH in this library, in the order they
    /// are defined
    pub fn lattice_graph_names(&self) -> Vec<String> {
        self.root.children("LATTICEGRAPH")
            .filter_map(|graph| graph.attribute("name"))
            .map(String::from)
            .collect()
    }

    /// Parse the LATTICEGRAPH with the given `name`, or the first LATTICEGRAPH
    /// in the library if `name` is `None`. The returned unit cell is bound
    /// to the lattice of this LATTICEGRAPH, and all edges lengths are
    /// computed with this lattice.
    pub fn parse_lattice_graph(&self, name: Option<&str>) -> Result<UnitCell, Error> {
        let graph = match name {
            Some(name) => self.root.named_child("LATTICEGRAPH", name).ok_or_else(|| {
                Error::MissingReference(format!("there is no LATTICEGRAPH named '{}' in this library", name))
            })?,
            None => self.root.child("LATTICEGRAPH").ok_or_else(|| {
                Error::InvalidXml("this library does not contain any LATTICEGRAPH".into())
            })?,
        };
        let graph_name = graph.attribute("name").unwrap_or_default();

        let finite_lattice = required_child(graph, "FINITELATTICE")?;
        let boundary = match finite_lattice.child("BOUNDARY").and_then(|b| b.attribute("type")) {
            Some(boundary) => boundary.parse()?,
            None => Boundary::Periodic,
        };

        let lattice = self.resolve(required_child(finite_lattice, "LATTICE")?)?;
        let lattice = parse_lattice(lattice)?.with_boundary(boundary);

        let unit_cell = self.resolve(required_child(graph, "UNITCELL")?)?;
        let mut unit_cell = parse_unit_cell(unit_cell, lattice)?;

        let lattice = unit_cell.lattice().clone();
        unit_cell.compute_edges_length(lattice)?;

        info!(
            "parsed LATTICEGRAPH '{}' with {} vertices and {} edges",
            graph_name, unit_cell.num_vertices(), unit_cell.num_edges()
        );
        return Ok(unit_cell);
    }

    /// Get the top-level element referenced by `element`, or `element` itself
    /// if it is defined inline
    fn resolve<'a>(&'a self, element: &'a XmlElement) -> Result<&'a XmlElement, Error> {
        if !element.children.is_empty() {
            return Ok(element);
        }

        match element.attribute("ref") {
            Some(reference) => self.root.named_child(&element.name, reference).ok_or_else(|| {
                Error::MissingReference(format!(
                    "{} '{}' is not defined in this library", element.name, reference
                ))
            }),
            None => Ok(element),
        }
    }
}

fn required_child<'a>(element: &'a XmlElement, name: &str) -> Result<&'a XmlElement, Error> {
    element.child(name).ok_or_else(|| Error::InvalidXml(format!(
        "missing <{}> inside <{}>", name, element.name
    )))
}

fn parse_integer<T: std::str::FromStr>(value: &str, what: &str, element: &XmlElement) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::InvalidXml(format!(
        "invalid {} '{}' in <{}>", what, value, element.name
    )))
}

/// Get the value of the `dimension` attribute of `element`, or `default`
fn dimension(element: &XmlElement, default: usize) -> Result<usize, Error> {
    match element.attribute("dimension") {
        Some(value) => parse_integer(value, "dimension", element),
        None => Ok(default),
    }
}

/// Evaluate the `PARAMETER` of `element`, in order. Each parameter default
/// value can use the parameters defined before it.
fn parameters(element: &XmlElement) -> Result<IndexMap<String, f64>, Error> {
    let mut parameters = IndexMap::new();
    for parameter in element.children("PARAMETER") {
        let name = parameter.attribute("name").ok_or_else(|| Error::InvalidXml(
            format!("missing name for a PARAMETER of <{}>", element.name)
        ))?;

        let default = parameter.attribute("default").ok_or_else(|| Error::InvalidXml(
            format!("PARAMETER '{}' of <{}> does not have a default value", name, element.name)
        ))?;

        let value = evaluate(default, &parameters)?;
        parameters.insert(name.to_owned(), value);
    }
    return Ok(parameters);
}

/// Evaluate the (up to 3) space separated expressions in `text`
fn parse_components(text: &str, variables: &IndexMap<String, f64>, element: &XmlElement) -> Result<[f64; 3], Error> {
    let mut values = [0.0; 3];
    for (i, expression) in text.split_whitespace().enumerate() {
        if i >= 3 {
            return Err(Error::InvalidXml(format!(
                "too many components in <{}>: '{}'", element.name, text
            )));
        }
        values[i] = evaluate(expression, variables)?;
    }
    return Ok(values);
}

fn parse_lattice(element: &XmlElement) -> Result<Lattice, Error> {
    let parameters = parameters(element)?;
    let basis = required_child(element, "BASIS")?;

    let mut matrix = Matrix3::zero();
    for (i, vector) in basis.children("VECTOR").enumerate() {
        if i >= 3 {
            return Err(Error::InvalidXml("too many VECTOR in <BASIS>".into()));
        }

        let values = parse_components(&vector.text, &parameters, vector)?;
        for (j, value) in values.into_iter().enumerate() {
            matrix[j][i] = value;
        }
    }

    let lattice = Lattice::new(matrix)
        .with_name(element.attribute("name").unwrap_or("myLattice"))
        .with_dimension(dimension(element, 3)?)?;

    return Ok(lattice);
}

fn parse_unit_cell(element: &XmlElement, lattice: Lattice) -> Result<UnitCell, Error> {
    let default_dimension = lattice.dimension();
    let mut unit_cell = UnitCell::new(lattice)
        .with_name(element.attribute("name").unwrap_or("myUnitCell"))
        .with_dimension(dimension(element, default_dimension)?)?;

    let no_variables = IndexMap::new();
    for vertex in element.children("VERTEX") {
        let vertex_type = match vertex.attribute("type") {
            Some(value) => parse_integer(value, "type", vertex)?,
            None => 0,
        };

        let coords = match vertex.child("COORDINATE") {
            Some(coordinate) => parse_components(&coordinate.text, &no_variables, coordinate)?,
            None => [0.0; 3],
        };

        unit_cell.add_vertex(Vertex::new(vertex_type, Vector3D::from(coords)));
    }

    for edge in element.children("EDGE") {
        let edge_type = match edge.attribute("type") {
            Some(value) => parse_integer(value, "type", edge)?,
            None => 0,
        };

        let source = required_child(edge, "SOURCE")?;
        let target = required_child(edge, "TARGET")?;
        let endpoint = |element: &XmlElement| -> Result<usize, Error> {
            let vertex = element.attribute("vertex").ok_or_else(|| Error::InvalidXml(
                format!("missing vertex attribute in <{}>", element.name)
            ))?;
            parse_integer(vertex, "vertex", element)
        };

        let mut offset = [0; 3];
        if let Some(text) = target.attribute("offset") {
            for (i, value) in text.split_whitespace().enumerate() {
                if i >= 3 {
                    return Err(Error::InvalidXml(format!("too many components in offset '{}'", text)));
                }
                offset[i] = parse_integer(value, "offset", target)?;
            }
        }

        let edge = Edge::new(edge_type, endpoint(source)?, endpoint(target)?, Offset::from(offset));
        if unit_cell.add_edge(edge, true)?.is_none() {
            debug!("ignoring duplicated edge in UNITCELL '{}'", unit_cell.name());
        }
    }

    return Ok(unit_cell);
}
