/// Geometry kernel: homogeneous 3x3 transforms, vectors and rays
use crate::models::Point;

/// Magnitudes at or below this are treated as zero
pub const ALMOST_ZERO: f64 = 0.000001;

/// 2D vector in homogeneous math (shares storage with [`Point`])
pub type Vector2 = Point;

impl Point {
    /// Component-wise sum
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference
    pub fn sub(&self, other: &Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }

    /// Scalar multiple
    pub fn scale(&self, s: f64) -> Vector2 {
        Vector2::new(self.x * s, self.y * s)
    }

    /// Z component of the 3D cross product
    pub fn cross(&self, other: &Vector2) -> f64 {
        self.x * other.y - other.x * self.y
    }

    /// Dot product
    pub fn dot(&self, other: &Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Euclidean length
    pub fn mag(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, `None` for a zero vector
    pub fn normalized(&self) -> Option<Vector2> {
        let mag = self.mag();
        if mag <= ALMOST_ZERO {
            return None;
        }
        Some(self.scale(1.0 / mag))
    }

    /// Apply a homogeneous transform (row vector times matrix)
    ///
    /// Returns `None` when the homogeneous divisor vanishes, i.e. the point
    /// maps to infinity.
    pub fn transform(&self, m: &Matrix3) -> Option<Vector2> {
        let w = self.x * m.0[0][2] + self.y * m.0[1][2] + m.0[2][2];
        if w.abs() <= ALMOST_ZERO {
            return None;
        }
        Some(Vector2::new(
            (self.x * m.0[0][0] + self.y * m.0[1][0] + m.0[2][0]) / w,
            (self.x * m.0[0][1] + self.y * m.0[1][1] + m.0[2][1]) / w,
        ))
    }
}

/// 3x3 matrix acting on row vectors `[x y 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3(pub [[f64; 3]; 3]);

impl Matrix3 {
    /// Identity transform
    pub fn identity() -> Self {
        Matrix3([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Translation by (tx, ty)
    pub fn translate(tx: f64, ty: f64) -> Self {
        let mut m = Self::identity();
        m.0[2][0] = tx;
        m.0[2][1] = ty;
        m
    }

    /// Counter-clockwise rotation by `angle` radians
    pub fn rotate(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        let mut m = Self::identity();
        m.0[0][0] = cos;
        m.0[0][1] = sin;
        m.0[1][0] = -sin;
        m.0[1][1] = cos;
        m
    }

    /// Axis-aligned scale
    pub fn scale(sx: f64, sy: f64) -> Self {
        let mut m = Self::identity();
        m.0[0][0] = sx;
        m.0[1][1] = sy;
        m
    }

    /// Shear: x' = x + y*shx, y' = y + x*shy
    pub fn shear(shx: f64, shy: f64) -> Self {
        let mut m = Self::identity();
        m.0[1][0] = shx;
        m.0[0][1] = shy;
        m
    }

    /// Perspective skew taking a top edge of length `b0` to length `b1`
    pub fn line_skew_top(b0: f64, b1: f64, sz: f64) -> Option<Self> {
        if b0 < ALMOST_ZERO {
            return None;
        }
        let mut m = Self::identity();
        m.0[0][0] = b1 / b0;
        m.0[1][1] = sz / b0;
        m.0[0][2] = (b1 - b0) / (sz * b0);
        Some(m)
    }

    /// Algebraic inverse of [`Matrix3::line_skew_top`]
    pub fn line_skew_top_inv(b0: f64, b1: f64, sz: f64) -> Option<Self> {
        if b1 < ALMOST_ZERO {
            return None;
        }
        let mut m = Self::identity();
        m.0[0][0] = b0 / b1;
        m.0[1][1] = b0 / sz;
        m.0[0][2] = (b0 - b1) / (sz * b1);
        Some(m)
    }

    /// Perspective skew taking a side edge of length `b0` to length `b1`
    pub fn line_skew_side(b0: f64, b1: f64, sz: f64) -> Option<Self> {
        if b0 < ALMOST_ZERO {
            return None;
        }
        let mut m = Self::identity();
        m.0[0][0] = sz / b0;
        m.0[1][1] = b1 / b0;
        m.0[1][2] = (b1 - b0) / (sz * b0);
        Some(m)
    }

    /// Algebraic inverse of [`Matrix3::line_skew_side`]
    pub fn line_skew_side_inv(b0: f64, b1: f64, sz: f64) -> Option<Self> {
        if b1 < ALMOST_ZERO {
            return None;
        }
        let mut m = Self::identity();
        m.0[0][0] = b0 / sz;
        m.0[1][1] = b0 / b1;
        m.0[1][2] = (b0 - b1) / (sz * b1);
        Some(m)
    }

    /// Composition: applying the result equals applying `self` then `other`
    pub fn multiply(&self, other: &Matrix3) -> Matrix3 {
        let mut out = [[0.0f64; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.0[i][k] * other.0[k][j]).sum();
            }
        }
        Matrix3(out)
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::identity()
    }
}

/// Parametric ray: origin plus unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray2 {
    /// Origin
    pub p: Vector2,
    /// Unit direction
    pub v: Vector2,
    /// Lower parameter bound (informational)
    pub t_min: f64,
    /// Upper parameter bound (informational)
    pub t_max: f64,
}

impl Ray2 {
    /// Ray through `p` at `degrees` from the +x axis
    pub fn from_angle(p: Vector2, degrees: f64) -> Self {
        let radians = degrees.to_radians();
        Self {
            p,
            v: Vector2::new(radians.cos(), radians.sin()),
            t_min: 0.0,
            t_max: 1.0,
        }
    }

    /// Point at parameter `t`
    pub fn point_at(&self, t: f64) -> Vector2 {
        self.p.add(&self.v.scale(t))
    }

    /// Intersection with another ray, `None` when (nearly) parallel
    pub fn intersect(&self, other: &Ray2) -> Option<Vector2> {
        let denom = other.v.cross(&self.v);
        if denom.abs() <= ALMOST_ZERO {
            return None;
        }
        let w = other.p.sub(&self.p);
        let numer = other.v.cross(&w);
        Some(self.point_at(numer / denom))
    }
}

/// Cosine of the deviation from `angle` at corner `c1` of the path c0-c1-c2
///
/// Returns 1.0 for a perfect match and decreases as the corner opens or
/// closes away from `angle`.
pub fn right_angle_trueness(c0: &Vector2, c1: &Vector2, c2: &Vector2, angle: f64) -> Option<f64> {
    let va = c0.sub(c1).normalized()?;
    let vb = c2.sub(c1).normalized()?;
    let vb = vb.transform(&Matrix3::rotate(angle))?;
    Some(va.dot(&vb))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Vector2, b: &Vector2) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn test_multiply_order() {
        // translate then scale: (1,1) -> (3,1) -> (6,2)
        let m = Matrix3::translate(2.0, 0.0).multiply(&Matrix3::scale(2.0, 2.0));
        let p = Vector2::new(1.0, 1.0).transform(&m).unwrap();
        assert!(close(&p, &Vector2::new(6.0, 2.0)));
    }

    #[test]
    fn test_rotate_ccw() {
        let p = Vector2::new(1.0, 0.0)
            .transform(&Matrix3::rotate(std::f64::consts::FRAC_PI_2))
            .unwrap();
        assert!(close(&p, &Vector2::new(0.0, 1.0)));
    }

    #[test]
    fn test_line_skew_inverse() {
        let m = Matrix3::line_skew_top(0.7, 1.0, 1.0)
            .unwrap()
            .multiply(&Matrix3::line_skew_top_inv(0.7, 1.0, 1.0).unwrap());
        let p = Vector2::new(0.3, 0.8).transform(&m).unwrap();
        assert!(close(&p, &Vector2::new(0.3, 0.8)));

        let m = Matrix3::line_skew_side(1.0, 1.3, 1.0)
            .unwrap()
            .multiply(&Matrix3::line_skew_side_inv(1.0, 1.3, 1.0).unwrap());
        let p = Vector2::new(0.6, 0.2).transform(&m).unwrap();
        assert!(close(&p, &Vector2::new(0.6, 0.2)));

        assert!(Matrix3::line_skew_top(0.0, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_point_at_infinity() {
        let mut m = Matrix3::identity();
        m.0[2][2] = 0.0;
        assert!(Vector2::new(0.0, 0.0).transform(&m).is_none());
    }

    #[test]
    fn test_ray_intersect() {
        let a = Ray2::from_angle(Vector2::new(0.0, 0.0), 0.0);
        let b = Ray2::from_angle(Vector2::new(5.0, -3.0), 90.0);
        let p = a.intersect(&b).unwrap();
        assert!((p.x - 5.0).abs() < 1e-9 && p.y.abs() < 1e-9);

        let c = Ray2::from_angle(Vector2::new(0.0, 4.0), 0.0);
        assert!(a.intersect(&c).is_none());
    }

    #[test]
    fn test_right_angle_trueness() {
        let t = right_angle_trueness(
            &Vector2::new(0.0, 0.0),
            &Vector2::new(10.0, 0.0),
            &Vector2::new(10.0, 10.0),
            std::f64::consts::FRAC_PI_2,
        )
        .unwrap();
        assert!((t - 1.0).abs() < 1e-9);
    }
}
