//! Geometry helpers for 1-D fibers embedded in 3-D space.

/// Euclidean distance between consecutive nodes; `n` positions give `n - 1` lengths.
pub fn element_lengths(positions: &[[f64; 3]]) -> Vec<f64> {
    positions
        .windows(2)
        .map(|w| {
            let d = [w[1][0] - w[0][0], w[1][1] - w[0][1], w[1][2] - w[0][2]];
            (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lengths_of_bent_chain() {
        let p = [[0.0, 0.0, 0.0], [3.0, 4.0, 0.0], [3.0, 4.0, 2.0]];
        let l = element_lengths(&p);
        assert_relative_eq!(l.as_slice(), [5.0, 2.0].as_slice(), epsilon = 1e-14);
        assert!(element_lengths(&p[..1]).is_empty());
    }
}
