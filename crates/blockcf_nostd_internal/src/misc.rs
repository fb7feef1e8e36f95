/// Describes how the separation between two points is measured.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Separation {
    /// plain coordinate differences
    Open,
    /// coordinate differences in a periodic box, using the minimum image
    /// convention. Assumes every coordinate lies within `[0, boxsize)`.
    Periodic { boxsize: [f64; 3] },
}

impl Separation {
    /// the displacement vector pointing from `a` to `b`
    #[inline(always)]
    pub fn displacement(&self, a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
        let mut out = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        if let Separation::Periodic { boxsize } = self {
            for k in 0..3 {
                let half = 0.5 * boxsize[k];
                if out[k] > half {
                    out[k] -= boxsize[k];
                } else if out[k] < -half {
                    out[k] += boxsize[k];
                }
            }
        }
        out
    }
}

/// squared euclidean norm of a 3-vector
#[inline(always)]
pub fn squared_norm(v: [f64; 3]) -> f64 {
    v[0] * v[0] + v[1] * v[1] + v[2] * v[2]
}

/// absolute value (`f64::abs` isn't available in no_std crates)
#[inline(always)]
pub fn abs(x: f64) -> f64 {
    if x < 0.0 { -x } else { x }
}
