use cgmath::Vector3;

/// Axis-aligned box in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl BoundingBox {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        BoundingBox { min, max }
    }

    /// Inverted box that any `union` replaces.
    pub fn empty() -> Self {
        BoundingBox {
            min: Vector3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vector3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: Vector3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Vector3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) / 2.0
    }

    /// Sum of the box's extents along x, y and z.
    pub fn extent_sum(&self) -> f32 {
        (self.max.x - self.min.x) + (self.max.y - self.min.y) + (self.max.z - self.min.z)
    }

    /// All eight `{min, max}^3` corners, each exactly once.
    pub fn corners(&self) -> [Vector3<f32>; 8] {
        let mut corners = [Vector3::new(0.0, 0.0, 0.0); 8];
        let mut n = 0;
        for x in [self.min.x, self.max.x] {
            for y in [self.min.y, self.max.y] {
                for z in [self.min.z, self.max.z] {
                    corners[n] = Vector3::new(x, y, z);
                    n += 1;
                }
            }
        }
        corners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_distinct() {
        let b = BoundingBox::new(Vector3::new(-1.0, -2.0, -3.0), Vector3::new(1.0, 2.0, 3.0));
        let corners = b.corners();
        for i in 0..8 {
            for j in (i + 1)..8 {
                assert_ne!(corners[i], corners[j], "corner {} repeats corner {}", j, i);
            }
        }
        assert!(corners.contains(&b.min));
        assert!(corners.contains(&b.max));
    }

    #[test]
    fn union_with_empty_is_identity() {
        let b = BoundingBox::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        assert!(BoundingBox::empty().is_empty());
        assert_eq!(BoundingBox::empty().union(&b), b);
        assert_eq!(b.extent_sum(), 3.0);
        assert_eq!(b.center(), Vector3::new(0.5, 0.5, 0.5));
    }
}
