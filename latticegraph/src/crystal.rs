use log::info;

use crate::{Error, Lattice, SymmetryOperation, UnitCell, Vector3D};

/// Parameters describing a crystal: the cell geometry, the sites of the
/// asymmetric unit and the symmetry operations of the space group.
///
/// This is used to build a unit cell containing all the sites generated by
/// the symmetry operations.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CrystalParameters {
    /// Lengths `[a, b, c]` of the lattice vectors
    pub cell_lengths: [f64; 3],
    /// Angles `[alpha, beta, gamma]` between the lattice vectors, in degrees
    #[serde(default = "serde_default_cell_angles")]
    pub cell_angles: [f64; 3],
    /// Fractional coordinates of the sites in the asymmetric unit
    pub sites: Vec<[f64; 3]>,
    /// Symmetry operations, written as `x, y, z` triplets (e.g.
    /// `"-x+1/2, y, -z"`)
    #[serde(default = "serde_default_symmetry_operations")]
    pub symmetry_operations: Vec<String>,
    /// Should vertices generated from different sites get different types?
    #[serde(default = "serde_default_assign_different_types")]
    pub assign_different_types: bool,
}

fn serde_default_cell_angles() -> [f64; 3] { [90.0, 90.0, 90.0] }
fn serde_default_symmetry_operations() -> Vec<String> { vec!["x, y, z".into()] }
fn serde_default_assign_different_types() -> bool { true }

impl CrystalParameters {
    /// Get the JSON representation of these parameters
    pub fn parameters(&self) -> String {
        serde_json::to_string(self).expect("failed to serialize to JSON")
    }

    /// Parse all the symmetry operations in these parameters
    pub fn symmetry_operations(&self) -> Result<Vec<SymmetryOperation>, Error> {
        self.symmetry_operations.iter()
            .map(|operation| SymmetryOperation::parse(operation))
            .collect()
    }

    /// Build the unit cell corresponding to these parameters. Everything is
    /// validated before the unit cell is created.
    pub fn build(&self) -> Result<UnitCell, Error> {
        let operations = self.symmetry_operations()?;
        if operations.is_empty() {
            return Err(Error::InvalidParameter("at least one symmetry operation is required".into()));
        }

        for site in &self.sites {
            if site.iter().any(|value| !value.is_finite()) {
                return Err(Error::InvalidParameter(format!(
                    "invalid site coordinates {:?}", site
                )));
            }
        }

        let lattice = Lattice::from_parameters(self.cell_lengths, self.cell_angles)?;
        let sites = self.sites.iter().map(|&site| Vector3D::from(site)).collect::<Vec<_>>();

        let mut unit_cell = UnitCell::new(lattice);
        unit_cell.add_vertices_using_symops(&sites, &operations, self.assign_different_types)?;

        info!(
            "built crystal unit cell with {} vertices from {} sites",
            unit_cell.num_vertices(), sites.len()
        );
        return Ok(unit_cell);
    }
}

impl std::str::FromStr for CrystalParameters {
    type Err = Error;

    fn from_str(json: &str) -> Result<CrystalParameters, Error> {
        Ok(serde_json::from_str(json)?)
    }
}
