#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// Error while serializing/deserializing JSON data
    Json(serde_json::Error),
    /// Error while reading or writing XML data
    Xml(quick_xml::Error),
    /// The XML document is well-formed, but does not describe a valid
    /// lattice graph library
    InvalidXml(String),
    /// A `ref` attribute or a requested name does not match any element of
    /// the library
    MissingReference(String),
    /// Error while parsing or evaluating an arithmetic expression
    Expression(String),
    /// A symmetry operation is not made of three valid expressions
    SymmetryOperation(String),
    /// Error while reading CIF data
    Cif(String),
    /// A derived cluster structure was built from an older state of the
    /// unit cell, and needs to be rebuilt
    StaleCache(String),
    /// Error while doing IO
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Xml(e) => write!(f, "xml error: {}", e),
            Error::InvalidXml(e) => write!(f, "invalid lattice graph library: {}", e),
            Error::MissingReference(e) => write!(f, "missing reference: {}", e),
            Error::Expression(e) => write!(f, "invalid expression: {}", e),
            Error::SymmetryOperation(e) => write!(f, "invalid symmetry operation: {}", e),
            Error::Cif(e) => write!(f, "CIF error: {}", e),
            Error::StaleCache(e) => write!(f, "stale cluster data, rebuild required: {}", e),
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParameter(_) |
            Error::InvalidXml(_) |
            Error::MissingReference(_) |
            Error::Expression(_) |
            Error::SymmetryOperation(_) |
            Error::Cif(_) |
            Error::StaleCache(_) => None,
            Error::Json(e) => Some(e),
            Error::Xml(e) => Some(e),
            Error::Io(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(error: quick_xml::Error) -> Error {
        Error::Xml(error)
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(error: quick_xml::events::attributes::AttrError) -> Error {
        Error::Xml(quick_xml::Error::from(error))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::Io(error)
    }
}
