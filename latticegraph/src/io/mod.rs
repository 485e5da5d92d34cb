//! Reading and writing lattice graphs and crystal data.
//!
//! Lattice graphs are stored in XML libraries compatible with the ALPS
//! lattice library format, and crystal structures are read from CIF files.

mod xml;

mod parse;
pub use self::parse::{LatticeGraphParser, XmlSource};

mod export;
pub use self::export::LatticeGraphExporter;

mod cif;
pub use self::cif::{CifData, CifSite};
