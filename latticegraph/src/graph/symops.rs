use indexmap::IndexMap;

use crate::{Error, Vector3D};
use crate::expr::Expression;
use crate::lattice::round_to;

/// Upper bound on the number of decimals used to compare sites
const MAX_SITE_DECIMALS: usize = 12;

/// A crystallographic symmetry operation, such as `-y+1/2, x, z`. Each of
/// the three components is an expression of the fractional coordinates `x`,
/// `y` and `z`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryOperation {
    text: String,
    components: [Expression; 3],
}

impl SymmetryOperation {
    /// The identity operation `x, y, z`
    pub fn identity() -> SymmetryOperation {
        SymmetryOperation {
            text: "x,y,z".into(),
            components: [
                Expression::Variable("x".into()),
                Expression::Variable("y".into()),
                Expression::Variable("z".into()),
            ],
        }
    }

    /// Parse a symmetry operation from its text representation, made of three
    /// comma separated expressions using only the `x`, `y` and `z` variables.
    /// Blanks and quotes are ignored.
    pub fn parse(text: &str) -> Result<SymmetryOperation, Error> {
        let cleaned = text.chars()
            .filter(|c| !c.is_whitespace() && *c != '\'' && *c != '"')
            .collect::<String>();

        let parts = cleaned.split(',').collect::<Vec<_>>();
        if parts.len() != 3 {
            return Err(Error::SymmetryOperation(format!(
                "'{}' should contain 3 comma separated components, got {}", text, parts.len()
            )));
        }

        let mut components = Vec::with_capacity(3);
        for part in parts {
            let expression = Expression::parse(part).map_err(|error| Error::SymmetryOperation(
                format!("'{}': {}", text, error)
            ))?;

            for variable in expression.variables() {
                if !matches!(variable, "x" | "y" | "z" | "pi" | "e") {
                    return Err(Error::SymmetryOperation(format!(
                        "'{}' uses '{}', only x, y and z are allowed", text, variable
                    )));
                }
            }
            components.push(expression);
        }

        let components: [Expression; 3] = components.try_into().map_err(|_| {
            Error::SymmetryOperation(format!("'{}' should contain 3 components", text))
        })?;

        return Ok(SymmetryOperation {
            text: cleaned,
            components: components,
        });
    }

    /// Apply this operation to the fractional coordinates of `site`, without
    /// wrapping the result inside the unit cell
    pub fn apply(&self, site: Vector3D) -> Result<Vector3D, Error> {
        let mut variables = IndexMap::new();
        variables.insert("x".to_string(), site[0]);
        variables.insert("y".to_string(), site[1]);
        variables.insert("z".to_string(), site[2]);

        let mut result = Vector3D::zero();
        for (i, component) in self.components.iter().enumerate() {
            result[i] = component.evaluate(&variables)?;
            if !result[i].is_finite() {
                return Err(Error::SymmetryOperation(format!(
                    "'{}' gives a non finite coordinate for site {:?}", self.text, site.to_array()
                )));
            }
        }
        return Ok(result);
    }
}

impl std::str::FromStr for SymmetryOperation {
    type Err = Error;

    fn from_str(text: &str) -> Result<SymmetryOperation, Error> {
        SymmetryOperation::parse(text)
    }
}

impl std::fmt::Display for SymmetryOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Parse a list of symmetry operations, one per non-empty line of `text`.
///
/// All operations are validated before returning, so that callers can report
/// errors before modifying anything.
pub fn parse_symmetry_operations(text: &str) -> Result<Vec<SymmetryOperation>, Error> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(SymmetryOperation::parse)
        .collect()
}

/// Number of decimals needed to write the coordinates of `site`, as in the
/// shortest representation of each coordinate
fn site_decimals(site: Vector3D) -> i32 {
    let decimals = site.to_array().iter().map(|value| {
        let text = value.to_string();
        match text.find('.') {
            Some(dot) => text.len() - dot - 1,
            None => 1,
        }
    }).max().unwrap_or(1);

    return decimals.min(MAX_SITE_DECIMALS) as i32;
}

/// Wrap fractional coordinates inside `[0, 1)`
fn wrap_site(site: Vector3D) -> Vector3D {
    site.map(|value| value.rem_euclid(1.0))
}

/// Round already wrapped coordinates to `decimals`
fn round_site(site: Vector3D, decimals: i32) -> Vector3D {
    site.map(|value| {
        let rounded = round_to(value, decimals);
        // rounding can bring values back to 1, and get rid of -0
        rounded.rem_euclid(1.0) + 0.0
    })
}

/// Check if `a` and `b` are the same site up to a lattice translation, with
/// each coordinate compared within `tolerance`
fn same_site(a: Vector3D, b: Vector3D, tolerance: f64) -> bool {
    (0..3).all(|i| {
        let delta = a[i] - b[i];
        (delta - delta.round()).abs() < tolerance
    })
}

/// Get all distinct sites generated from `site` by repeatedly applying the
/// symmetry `operations`, starting with `site` itself. The coordinates are
/// wrapped inside the unit cell and rounded to the number of decimals used
/// by the input `site`.
///
/// Operations are always applied to the unrounded coordinates, and two sites
/// are the same if all their coordinates agree within half a unit of the
/// last decimal.
pub(crate) fn orbit(site: Vector3D, operations: &[SymmetryOperation]) -> Result<Vec<Vector3D>, Error> {
    let decimals = site_decimals(site);
    let tolerance = 0.5 * 10.0_f64.powi(-decimals);

    let mut sites = vec![wrap_site(site)];
    loop {
        let n_sites = sites.len();
        for operation in operations {
            for i in 0..sites.len() {
                let new_site = wrap_site(operation.apply(sites[i])?);
                if !sites.iter().any(|&known| same_site(known, new_site, tolerance)) {
                    sites.push(new_site);
                }
            }
        }

        if sites.len() == n_sites {
            break;
        }
    }

    let sites = sites.into_iter()
        .map(|site| round_site(site, decimals))
        .collect::<Vec<_>>();
    return Ok(sites);
}
