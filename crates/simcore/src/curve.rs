//! Piecewise-linear lookup curves used by the tire condition effects.

/// Linear interpolation through `points` (sorted by x). Values outside the
/// covered range clamp to the first or last y.
pub fn interpolate_curve(x: f64, points: &[(f64, f64)]) -> f64 {
    let (Some(&(x0, y0)), Some(&(xn, yn))) = (points.first(), points.last()) else {
        return 0.0;
    };
    if x <= x0 {
        return y0;
    }
    if x >= xn {
        return yn;
    }
    for pair in points.windows(2) {
        let (xa, ya) = pair[0];
        let (xb, yb) = pair[1];
        if x <= xb {
            if xb == xa {
                return yb;
            }
            return ya + (yb - ya) * (x - xa) / (xb - xa);
        }
    }
    yn
}
