//! 3x3 matrix type
use std::ops::{Add, Sub, Mul, Index, IndexMut};

use super::Vector3D;

/// A 3x3 square matrix, stored in row-major order. `matrix[i][j]` is the
/// element at row `i` and column `j`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3([[f64; 3]; 3]);

impl Matrix3 {
    /// Create a new `Matrix3` from the given rows
    pub const fn new(rows: [[f64; 3]; 3]) -> Matrix3 {
        Matrix3(rows)
    }

    /// Create a new `Matrix3` with all components set to 0
    pub const fn zero() -> Matrix3 {
        Matrix3([[0.0; 3]; 3])
    }

    /// Create the identity matrix
    pub const fn one() -> Matrix3 {
        Matrix3([
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ])
    }

    /// Create a diagonal matrix with the given diagonal elements
    pub const fn diagonal(x: f64, y: f64, z: f64) -> Matrix3 {
        Matrix3([
            [x, 0.0, 0.0],
            [0.0, y, 0.0],
            [0.0, 0.0, z],
        ])
    }

    /// Create a matrix using the three vectors as columns
    pub fn from_columns(a: Vector3D, b: Vector3D, c: Vector3D) -> Matrix3 {
        Matrix3([
            [a[0], b[0], c[0]],
            [a[1], b[1], c[1]],
            [a[2], b[2], c[2]],
        ])
    }

    /// Get the column `j` of this matrix as a vector
    pub fn column(&self, j: usize) -> Vector3D {
        Vector3D::new(self[0][j], self[1][j], self[2][j])
    }

    /// Apply `function` to all the elements of this matrix
    pub fn map(self, function: impl Fn(f64) -> f64) -> Matrix3 {
        let mut res = self;
        for row in &mut res.0 {
            for value in row {
                *value = function(*value);
            }
        }
        return res;
    }
}

impl Index<usize> for Matrix3 {
    type Output = [f64; 3];
    #[inline]
    fn index(&self, index: usize) -> &[f64; 3] {
        &self.0[index]
    }
}

impl IndexMut<usize> for Matrix3 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut [f64; 3] {
        &mut self.0[index]
    }
}

impl_arithmetic!(
    Matrix3, Matrix3, Add, add, Matrix3,
    self, other,
    {
        let mut res = Matrix3::zero();
        for i in 0..3 {
            for j in 0..3 {
                res[i][j] = self[i][j] + other[i][j];
            }
        }
        res
    }
);

impl_arithmetic!(
    Matrix3, Matrix3, Sub, sub, Matrix3,
    self, other,
    {
        let mut res = Matrix3::zero();
        for i in 0..3 {
            for j in 0..3 {
                res[i][j] = self[i][j] - other[i][j];
            }
        }
        res
    }
);

impl_arithmetic!(
    Matrix3, Vector3D, Mul, mul, Vector3D,
    self, vector,
    {
        let x = self[0][0] * vector[0] + self[0][1] * vector[1] + self[0][2] * vector[2];
        let y = self[1][0] * vector[0] + self[1][1] * vector[1] + self[1][2] * vector[2];
        let z = self[2][0] * vector[0] + self[2][1] * vector[1] + self[2][2] * vector[2];
        Vector3D::new(x, y, z)
    }
);

impl approx::AbsDiffEq for Matrix3 {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Matrix3, epsilon: f64) -> bool {
        self.0.iter().flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| f64::abs_diff_eq(a, b, epsilon))
    }
}

impl approx::RelativeEq for Matrix3 {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Matrix3, epsilon: f64, max_relative: f64) -> bool {
        self.0.iter().flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| f64::relative_eq(a, b, epsilon, max_relative))
    }
}

impl approx::UlpsEq for Matrix3 {
    fn default_max_ulps() -> u32 {
        f64::default_max_ulps()
    }

    fn ulps_eq(&self, other: &Matrix3, epsilon: f64, max_ulps: u32) -> bool {
        self.0.iter().flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| f64::ulps_eq(a, b, epsilon, max_ulps))
    }
}
