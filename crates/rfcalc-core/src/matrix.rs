//! Dense complex matrix with a Gauss–Jordan solver.
//!
//! Admittance systems here are small (K < 100 nodes), so dense row-major
//! storage wins over sparse formats: assembly is `add_at` accumulation and
//! the S-parameter engine needs the full inverse anyway (one inversion,
//! one right-hand side per port).
//!
//! Inversion runs Gauss–Jordan elimination on the augmented `[A | I]` block
//! with partial pivoting. A column whose best pivot magnitude falls below
//! `PIVOT_EPS` reports [`NumericalError::SingularMatrix`]; callers decide
//! whether that is fatal (a direct solve) or degradable (a sweep point).

use crate::error::NumericalError;
use num_complex::Complex64;

/// Pivot magnitudes below this are treated as structurally zero.
pub const PIVOT_EPS: f64 = 1e-12;

/// Dense complex matrix in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct CMatrix {
    rows: usize,
    cols: usize,
    /// Element (i, j) is at index `i * cols + j`.
    data: Vec<Complex64>,
}

impl CMatrix {
    /// Zero matrix of the given shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Complex64::new(0.0, 0.0); rows * cols],
        }
    }

    /// Square identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.set(i, i, Complex64::new(1.0, 0.0));
        }
        m
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Complex64) {
        self.data[row * self.cols + col] = value;
    }

    /// Accumulate into element (row, col). This is the assembly primitive:
    /// admittance stamps sum contributions from every element.
    #[inline]
    pub fn add_at(&mut self, row: usize, col: usize, value: Complex64) {
        self.data[row * self.cols + col] += value;
    }

    /// Elementwise sum. Panics on shape mismatch.
    pub fn add(&self, other: &CMatrix) -> CMatrix {
        assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        let mut out = self.clone();
        for (a, b) in out.data.iter_mut().zip(&other.data) {
            *a += b;
        }
        out
    }

    /// Elementwise difference. Panics on shape mismatch.
    pub fn sub(&self, other: &CMatrix) -> CMatrix {
        assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        let mut out = self.clone();
        for (a, b) in out.data.iter_mut().zip(&other.data) {
            *a -= b;
        }
        out
    }

    /// Scalar multiple.
    pub fn scale(&self, k: Complex64) -> CMatrix {
        let mut out = self.clone();
        for a in out.data.iter_mut() {
            *a *= k;
        }
        out
    }

    /// Standard matrix product. Panics when the inner dimensions differ.
    pub fn mul(&self, other: &CMatrix) -> CMatrix {
        assert_eq!(self.cols, other.rows);
        let mut out = CMatrix::new(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == Complex64::new(0.0, 0.0) {
                    continue;
                }
                for j in 0..other.cols {
                    out.add_at(i, j, a * other.get(k, j));
                }
            }
        }
        out
    }

    /// Matrix–vector product. Panics when `v.len() != cols`.
    pub fn mul_vec(&self, v: &[Complex64]) -> Vec<Complex64> {
        assert_eq!(self.cols, v.len());
        let mut out = vec![Complex64::new(0.0, 0.0); self.rows];
        for i in 0..self.rows {
            let mut acc = Complex64::new(0.0, 0.0);
            for j in 0..self.cols {
                acc += self.get(i, j) * v[j];
            }
            out[i] = acc;
        }
        out
    }

    /// Invert via Gauss–Jordan elimination on `[A | I]` with partial
    /// pivoting. Only square matrices are invertible; panics otherwise.
    pub fn inverse(&self) -> Result<CMatrix, NumericalError> {
        assert_eq!(self.rows, self.cols, "inverse of a non-square matrix");
        let n = self.rows;

        // Augmented rows [A | I], width 2n.
        let width = 2 * n;
        let mut aug = vec![Complex64::new(0.0, 0.0); n * width];
        for i in 0..n {
            for j in 0..n {
                aug[i * width + j] = self.get(i, j);
            }
            aug[i * width + n + i] = Complex64::new(1.0, 0.0);
        }

        for col in 0..n {
            // Partial pivot: bring up the largest remaining magnitude.
            let mut pivot_row = col;
            let mut pivot_mag = aug[col * width + col].norm();
            for row in (col + 1)..n {
                let mag = aug[row * width + col].norm();
                if mag > pivot_mag {
                    pivot_mag = mag;
                    pivot_row = row;
                }
            }
            if pivot_mag < PIVOT_EPS {
                return Err(NumericalError::SingularMatrix);
            }
            if pivot_row != col {
                for j in 0..width {
                    aug.swap(col * width + j, pivot_row * width + j);
                }
            }

            // Normalize the pivot row.
            let inv_pivot = Complex64::new(1.0, 0.0) / aug[col * width + col];
            for j in 0..width {
                aug[col * width + j] *= inv_pivot;
            }

            // Eliminate the column everywhere else.
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = aug[row * width + col];
                if factor == Complex64::new(0.0, 0.0) {
                    continue;
                }
                for j in 0..width {
                    let v = aug[col * width + j];
                    aug[row * width + j] -= factor * v;
                }
            }
        }

        let mut inv = CMatrix::new(n, n);
        for i in 0..n {
            for j in 0..n {
                inv.set(i, j, aug[i * width + n + j]);
            }
        }
        Ok(inv)
    }

    /// Solve `A·x = b`. Computes the inverse and multiplies; callers with
    /// several right-hand sides should invert once and use [`mul_vec`]
    /// on the inverse.
    ///
    /// [`mul_vec`]: CMatrix::mul_vec
    pub fn solve(&self, b: &[Complex64]) -> Result<Vec<Complex64>, NumericalError> {
        Ok(self.inverse()?.mul_vec(b))
    }

    /// Frobenius norm, used by conditioning checks.
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_identity() {
        let i3 = CMatrix::identity(3);
        assert_eq!(i3.get(0, 0), c(1.0, 0.0));
        assert_eq!(i3.get(2, 1), c(0.0, 0.0));
    }

    #[test]
    fn test_mul_identity() {
        let mut a = CMatrix::new(2, 2);
        a.set(0, 0, c(1.0, 2.0));
        a.set(0, 1, c(-3.0, 0.5));
        a.set(1, 0, c(0.0, 1.0));
        a.set(1, 1, c(4.0, -1.0));
        let prod = a.mul(&CMatrix::identity(2));
        assert_eq!(prod, a);
    }

    #[test]
    fn test_inverse_real_2x2() {
        let mut a = CMatrix::new(2, 2);
        a.set(0, 0, c(4.0, 0.0));
        a.set(0, 1, c(7.0, 0.0));
        a.set(1, 0, c(2.0, 0.0));
        a.set(1, 1, c(6.0, 0.0));
        let inv = a.inverse().unwrap();
        // det = 10, inverse = [0.6 -0.7; -0.2 0.4]
        assert!((inv.get(0, 0) - c(0.6, 0.0)).norm() < 1e-12);
        assert!((inv.get(0, 1) - c(-0.7, 0.0)).norm() < 1e-12);
        assert!((inv.get(1, 0) - c(-0.2, 0.0)).norm() < 1e-12);
        assert!((inv.get(1, 1) - c(0.4, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_inverse_product_is_identity() {
        // Complex, well-conditioned 3x3
        let mut a = CMatrix::new(3, 3);
        a.set(0, 0, c(2.0, 1.0));
        a.set(0, 1, c(0.0, -1.0));
        a.set(0, 2, c(1.0, 0.0));
        a.set(1, 0, c(-1.0, 0.0));
        a.set(1, 1, c(3.0, 0.5));
        a.set(1, 2, c(0.0, 2.0));
        a.set(2, 0, c(0.5, 0.0));
        a.set(2, 1, c(1.0, 1.0));
        a.set(2, 2, c(4.0, -1.0));
        let inv = a.inverse().unwrap();
        let residual = a.mul(&inv).sub(&CMatrix::identity(3));
        assert!(residual.frobenius_norm() < 1e-9);
    }

    #[test]
    fn test_inverse_needs_pivoting() {
        // Zero in the leading position forces a row swap.
        let mut a = CMatrix::new(2, 2);
        a.set(0, 0, c(0.0, 0.0));
        a.set(0, 1, c(1.0, 0.0));
        a.set(1, 0, c(1.0, 0.0));
        a.set(1, 1, c(0.0, 0.0));
        let inv = a.inverse().unwrap();
        let residual = a.mul(&inv).sub(&CMatrix::identity(2));
        assert!(residual.frobenius_norm() < 1e-12);
    }

    #[test]
    fn test_singular_matrix() {
        let mut a = CMatrix::new(2, 2);
        a.set(0, 0, c(1.0, 0.0));
        a.set(0, 1, c(2.0, 0.0));
        a.set(1, 0, c(2.0, 0.0));
        a.set(1, 1, c(4.0, 0.0));
        assert_eq!(a.inverse().unwrap_err(), NumericalError::SingularMatrix);
    }

    #[test]
    fn test_solve() {
        let mut a = CMatrix::new(2, 2);
        a.set(0, 0, c(3.0, 0.0));
        a.set(0, 1, c(1.0, 0.0));
        a.set(1, 0, c(1.0, 0.0));
        a.set(1, 1, c(2.0, 0.0));
        let x = a.solve(&[c(9.0, 0.0), c(8.0, 0.0)]).unwrap();
        assert!((x[0] - c(2.0, 0.0)).norm() < 1e-12);
        assert!((x[1] - c(3.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_scale_add_sub() {
        let i2 = CMatrix::identity(2);
        let doubled = i2.scale(c(2.0, 0.0));
        assert_eq!(doubled.get(0, 0), c(2.0, 0.0));
        let sum = doubled.add(&i2);
        assert_eq!(sum.get(1, 1), c(3.0, 0.0));
        let diff = sum.sub(&i2);
        assert_eq!(diff.get(1, 1), c(2.0, 0.0));
    }
}
