//! Link density scoring.

/// Selects how a slug's link density is derived from its in/out degree.
/// `Unweighted` is the spec default; `Weighted` is the REDESIGN alternative,
/// selected explicitly by configuration — never substituted silently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DensityFormula {
    Unweighted { k: f64 },
    Weighted { in_weight: f64, out_weight: f64 },
}

impl Default for DensityFormula {
    fn default() -> Self {
        DensityFormula::Unweighted { k: 10.0 }
    }
}

impl DensityFormula {
    pub fn score(self, in_degree: usize, out_degree: usize) -> f64 {
        let raw = match self {
            DensityFormula::Unweighted { k } => {
                if k <= 0.0 {
                    0.0
                } else {
                    (in_degree + out_degree) as f64 / k
                }
            }
            DensityFormula::Weighted { in_weight, out_weight } => {
                in_weight * in_degree as f64 + out_weight * out_degree as f64
            }
        };
        raw.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unweighted_clamps_to_one() {
        let formula = DensityFormula::Unweighted { k: 10.0 };
        assert_eq!(formula.score(0, 0), 0.0);
        assert_eq!(formula.score(5, 5), 1.0);
        assert_eq!(formula.score(100, 100), 1.0);
    }

    #[test]
    fn unweighted_matches_spec_default() {
        let formula = DensityFormula::Unweighted { k: 10.0 };
        assert_eq!(formula.score(2, 3), 0.5);
    }

    #[test]
    fn weighted_combines_in_and_out_degree() {
        let formula = DensityFormula::Weighted { in_weight: 0.6, out_weight: 0.4 };
        assert!((formula.score(1, 1) - 1.0).abs() < 1e-9);
    }
}
