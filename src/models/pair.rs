// ============================================================================
// Paires dérivées (cross rates)
// ============================================================================
// À partir de deux instruments A et B :
// - prix direct = prix(A) / prix(B), inverse = prix(B) / prix(A)
// - série directe[i] = hA[i] / hB[i], inverse[i] = hB[i] / hA[i]
//   pour i < min(len(hA), len(hB))
//
// Un prix ou un échantillon nul (ou non fini) rend la paire indéfinie :
// derive_pair() retourne None au lieu de produire des infinis.
// ============================================================================

use crate::models::Instrument;

/// Paire directe et paire inverse
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedPair {
    pub forward: Instrument,
    pub inverse: Instrument,
}

fn usable(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

/// Calcule la paire `numerator / denominator` et son inverse
pub fn derive_pair(
    forward_key: &str,
    inverse_key: &str,
    numerator: &Instrument,
    denominator: &Instrument,
) -> Option<DerivedPair> {
    if !usable(numerator.price) || !usable(denominator.price) {
        return None;
    }

    // zip() tronque à la plus courte des deux séries
    let samples: Vec<(f64, f64)> = numerator
        .history
        .iter()
        .copied()
        .zip(denominator.history.iter().copied())
        .collect();

    if samples.iter().any(|&(a, b)| !usable(a) || !usable(b)) {
        return None;
    }

    let forward_history = samples.iter().map(|&(a, b)| a / b).collect();
    let inverse_history = samples.iter().map(|&(a, b)| b / a).collect();

    Some(DerivedPair {
        forward: Instrument::ratio(
            forward_key.to_string(),
            numerator.price / denominator.price,
            forward_history,
        ),
        inverse: Instrument::ratio(
            inverse_key.to_string(),
            denominator.price / numerator.price,
            inverse_history,
        ),
    })
}
