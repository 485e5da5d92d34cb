//! The `Lattice` type defines the geometry of the periodic lattice: the three
//! direct lattice vectors, together with a name, a dimension and boundary
//! conditions.
use crate::{Error, Matrix3, Vector3D};

/// Boundary conditions of the finite lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boundary {
    /// Periodic boundary conditions
    #[default]
    Periodic,
    /// Open boundary conditions
    Open,
}

impl Boundary {
    /// Get the name of this boundary condition, as used in XML files
    pub fn as_str(self) -> &'static str {
        match self {
            Boundary::Periodic => "periodic",
            Boundary::Open => "open",
        }
    }
}

impl std::str::FromStr for Boundary {
    type Err = Error;

    fn from_str(value: &str) -> Result<Boundary, Error> {
        match value {
            "periodic" => Ok(Boundary::Periodic),
            "open" => Ok(Boundary::Open),
            other => Err(Error::InvalidParameter(format!(
                "unknown boundary type '{}', expected 'periodic' or 'open'", other
            ))),
        }
    }
}

/// Number of decimals kept in basis matrices built from cell parameters
const BASIS_DECIMALS: i32 = 10;

/// Round `value` to the given number of `decimals`
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10.0_f64.powi(decimals);
    return (value * factor).round() / factor;
}

/// A `Lattice` is defined by its basis matrix. The columns of this matrix
/// are the direct lattice vectors `a`, `b` and `c`, and fractional
/// coordinates are converted to cartesian coordinates with
/// `basis * fractional`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    /// basis matrix, with lattice vectors as columns
    basis: Matrix3,
    /// lengths of the lattice vectors
    lengths: [f64; 3],
    /// angles alpha, beta, gamma in degrees
    angles: [f64; 3],
    name: String,
    dimension: usize,
    boundary: Boundary,
}

impl Default for Lattice {
    fn default() -> Lattice {
        Lattice::new(Matrix3::one())
    }
}

impl Lattice {
    /// Create a new lattice from a basis matrix, where the columns are the
    /// lattice vectors. The lattice is named `myLattice`, is 3-dimensional
    /// and has periodic boundary conditions.
    pub fn new(basis: Matrix3) -> Lattice {
        let (a, b, c) = (basis.column(0), basis.column(1), basis.column(2));

        return Lattice {
            basis: basis,
            lengths: [a.norm(), b.norm(), c.norm()],
            angles: [
                angle_between(b, c).to_degrees(),
                angle_between(a, c).to_degrees(),
                angle_between(a, b).to_degrees(),
            ],
            name: "myLattice".into(),
            dimension: 3,
            boundary: Boundary::Periodic,
        };
    }

    /// Create a new lattice from the lengths `[a, b, c]` of the lattice
    /// vectors and the angles `[alpha, beta, gamma]` between them (in
    /// degrees).
    ///
    /// The lattice vectors are `a = (a, 0, 0)`, `b = (b cos γ, b sin γ, 0)`
    /// and `c = (c cos β, c cos α, c |1 - cos α - cos β|)`, and the basis is
    /// rounded to 10 decimals. This construction is the one used by existing
    /// lattice graph libraries, and is kept as-is so that edge lengths stay
    /// compatible with them.
    pub fn from_parameters(lengths: [f64; 3], angles: [f64; 3]) -> Result<Lattice, Error> {
        let [a, b, c] = lengths;
        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "lattice vectors lengths must be positive, got [{}, {}, {}]", a, b, c
            )));
        }

        if angles.iter().any(|angle| !(angle.is_finite() && *angle > 0.0 && *angle < 180.0)) {
            return Err(Error::InvalidParameter(format!(
                "lattice angles must be in (0, 180) degrees, got {:?}", angles
            )));
        }

        let cos_alpha = angles[0].to_radians().cos();
        let cos_beta = angles[1].to_radians().cos();
        let (sin_gamma, cos_gamma) = angles[2].to_radians().sin_cos();

        let c_z = c * f64::sqrt((1.0 - cos_alpha - cos_beta).powi(2));

        let basis = Matrix3::from_columns(
            Vector3D::new(a, 0.0, 0.0),
            Vector3D::new(b * cos_gamma, b * sin_gamma, 0.0),
            Vector3D::new(c * cos_beta, c * cos_alpha, c_z),
        ).map(|value| round_to(value, BASIS_DECIMALS));

        let mut lattice = Lattice::new(basis);
        lattice.lengths = lengths;
        lattice.angles = angles;
        return Ok(lattice);
    }

    /// Set the name of this lattice
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Lattice {
        self.name = name.into();
        self
    }

    /// Set the dimension of this lattice, which must be 1, 2 or 3
    pub fn with_dimension(mut self, dimension: usize) -> Result<Lattice, Error> {
        check_dimension(dimension)?;
        self.dimension = dimension;
        Ok(self)
    }

    /// Set the boundary conditions of this lattice
    #[must_use]
    pub fn with_boundary(mut self, boundary: Boundary) -> Lattice {
        self.boundary = boundary;
        self
    }

    /// Get the basis matrix, with lattice vectors as columns
    pub fn basis(&self) -> Matrix3 {
        self.basis
    }

    /// Get the lattice vector `i` (0 for `a`, 1 for `b`, 2 for `c`)
    pub fn vector(&self, i: usize) -> Vector3D {
        self.basis.column(i)
    }

    /// Get the lengths of the three lattice vectors
    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    /// Get the three lattice angles `[alpha, beta, gamma]`, in degrees
    pub fn angles(&self) -> [f64; 3] {
        self.angles
    }

    /// Get the length of the first lattice vector
    pub fn a(&self) -> f64 {
        self.lengths[0]
    }

    /// Get the length of the second lattice vector
    pub fn b(&self) -> f64 {
        self.lengths[1]
    }

    /// Get the length of the third lattice vector
    pub fn c(&self) -> f64 {
        self.lengths[2]
    }

    /// Get the angle between `b` and `c`, in degrees
    pub fn alpha(&self) -> f64 {
        self.angles[0]
    }

    /// Get the angle between `a` and `c`, in degrees
    pub fn beta(&self) -> f64 {
        self.angles[1]
    }

    /// Get the angle between `a` and `b`, in degrees
    pub fn gamma(&self) -> f64 {
        self.angles[2]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Convert fractional coordinates to cartesian coordinates
    #[inline]
    pub fn to_cartesian(&self, fractional: Vector3D) -> Vector3D {
        self.basis * fractional
    }

    /// Get the cartesian positions of the origin of all the cells in a
    /// finite lattice of `size = [L, W, H]` cells.
    ///
    /// Cells are enumerated in row-major order: cell `(i, j, k)` is at
    /// position `i * W * H + j * H + k` in the output.
    pub fn finite_lattice_sites(&self, size: [usize; 3]) -> Vec<Vector3D> {
        let [l, w, h] = size;
        let mut sites = Vec::with_capacity(l * w * h);
        for i in 0..l {
            for j in 0..w {
                for k in 0..h {
                    let cell = Vector3D::new(i as f64, j as f64, k as f64);
                    sites.push(self.to_cartesian(cell));
                }
            }
        }
        return sites;
    }
}

pub(crate) fn check_dimension(dimension: usize) -> Result<(), Error> {
    if dimension == 0 || dimension > 3 {
        return Err(Error::InvalidParameter(format!(
            "dimension must be 1, 2 or 3, got {}", dimension
        )));
    }
    Ok(())
}

/// Get the angle (in radians) between the vectors `u` and `v`. Zero vectors
/// (missing lattice vectors in lower dimensional lattices) are taken to be
/// orthogonal to everything.
pub fn angle_between(u: Vector3D, v: Vector3D) -> f64 {
    let norms = u.norm() * v.norm();
    if norms == 0.0 {
        return std::f64::consts::FRAC_PI_2;
    }
    let cos = (u * v) / norms;
    f64::acos(cos.clamp(-1.0, 1.0))
}
