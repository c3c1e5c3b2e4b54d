//! Ionisation edges used to propose a default edge energy loss.

/// Known ionisation edges as (energy loss in eV, description), ascending.
pub const IONISATION_EDGES: &[(u32, &str)] = &[
    (51, "Magnesium L2,3-edge"),
    (73, "Aluminium L2,3-edge"),
    (86, "Lead O2,3-edge"),
    (96, "Uranium O4,5-edge"),
    (99, "Silicon L2,3-edge"),
    (132, "Phosphorus L2,3-edge"),
    (165, "Sulfur L2,3-edge"),
    (188, "Boron K-edge"),
    (227, "Molybdenum M4,5-edge"),
    (284, "Carbon K-edge"),
    (346, "Calcium L3-edge"),
    (350, "Calcium L2-edge"),
    (367, "Silver M4,5-edge"),
    (381, "Uranium N7-edge"),
    (391, "Uranium N6-edge"),
    (401, "Nitrogen K-edge"),
    (456, "Titanium L3-edge"),
    (462, "Titanium L2-edge"),
    (512, "Vanadium L3-edge"),
    (521, "Vanadium L2-edge"),
    (532, "Oxygen K-edge"),
    (575, "Chromium L3-edge"),
    (584, "Chromium L2-edge"),
    (640, "Manganese L3-edge"),
    (651, "Manganese L2-edge"),
    (685, "Fluorine K-edge"),
    (708, "Iron L3-edge"),
    (721, "Iron L2-edge"),
    (779, "Cobalt L3-edge"),
    (794, "Cobalt L2-edge"),
    (855, "Nickel L3-edge"),
    (872, "Nickel L2-edge"),
    (931, "Copper L3-edge"),
    (951, "Copper L2-edge"),
    (1020, "Zinc L3-edge"),
    (1043, "Zinc L2-edge"),
    (1072, "Sodium K-edge"),
    (1115, "Gallium L3-edge"),
    (1142, "Gallium L2-edge"),
    (1217, "Germanium L3-edge"),
    (1248, "Germanium L2-edge"),
    (1305, "Magnesium K-edge"),
    (1560, "Aluminium K-edge"),
    (1839, "Silicon K-edge"),
    (2146, "Phosphorus K-edge"),
    (2206, "Gold M5-edge"),
    (2291, "Gold M4-edge"),
    (2484, "Lead M5-edge"),
    (2520, "Molybdenum L3-edge"),
    (2586, "Lead M4-edge"),
    (2625, "Molybdenum L2-edge"),
    (3351, "Silver L3-edge"),
    (3524, "Silver L2-edge"),
    (3552, "Uranium M5-edge"),
    (3728, "Uranium M4-edge"),
];

/// Description of the edge listed at exactly `energy_loss` eV.
pub fn edge_label(energy_loss: u32) -> Option<&'static str> {
    IONISATION_EDGES
        .binary_search_by_key(&energy_loss, |&(e, _)| e)
        .ok()
        .map(|i| IONISATION_EDGES[i].1)
}

/// Listed edges with `low <= E < high`.
pub fn edges_in(low: f32, high: f32) -> impl Iterator<Item = (u32, &'static str)> {
    IONISATION_EDGES
        .iter()
        .copied()
        .filter(move |&(e, _)| e as f32 >= low.ceil() && (e as f32) < high)
}

/// The listed edge closest to `energy_loss`.
pub fn nearest_edge(energy_loss: f32) -> (u32, &'static str) {
    IONISATION_EDGES
        .iter()
        .copied()
        .min_by(|a, b| {
            (a.0 as f32 - energy_loss)
                .abs()
                .total_cmp(&(b.0 as f32 - energy_loss).abs())
        })
        .unwrap_or(IONISATION_EDGES[0])
}

/// Propose an edge energy loss for a stack.
///
/// Looks for a listed edge between the two highest energy losses, taking the
/// one closest to their midpoint if several match. Without a listed edge the
/// midpoint itself is used. This assumes a single post-edge image; with more
/// the caller should pass an explicit edge.
///
/// Returns `None` for fewer than two energy losses.
pub fn predict_edge(energy_losses: &[f32]) -> Option<f32> {
    let mut sorted: Vec<f32> = energy_losses.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let (low, high) = match sorted.as_slice() {
        [.., low, high] => (*low, *high),
        _ => return None,
    };
    let mid = (low + high) / 2.0;
    let predicted = edges_in(low, high)
        .min_by(|a, b| (mid - a.0 as f32).abs().total_cmp(&(mid - b.0 as f32).abs()))
        .map(|(e, _)| e as f32)
        .unwrap_or(mid);
    Some(predicted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        assert!(IONISATION_EDGES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_edge_label() {
        assert_eq!(edge_label(284), Some("Carbon K-edge"));
        assert_eq!(edge_label(285), None);
    }

    #[test]
    fn test_predict_single_edge() {
        // Carbon K at 284 eV lies between 250 and 300.
        assert_eq!(predict_edge(&[200.0, 300.0, 250.0]), Some(284.0));
    }

    #[test]
    fn test_predict_prefers_edge_near_midpoint() {
        // Ca L3 (346), Ca L2 (350) and Ag M4,5 (367) lie in [340, 380); midpoint 360.
        assert_eq!(predict_edge(&[300.0, 340.0, 380.0]), Some(367.0));
    }

    #[test]
    fn test_predict_without_listed_edge_uses_midpoint() {
        assert_eq!(predict_edge(&[10.0, 20.0, 30.0]), Some(25.0));
    }

    #[test]
    fn test_predict_needs_two_images() {
        assert_eq!(predict_edge(&[100.0]), None);
    }

    #[test]
    fn test_nearest_edge() {
        assert_eq!(nearest_edge(530.0).0, 532);
    }
}
