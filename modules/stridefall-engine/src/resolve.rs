//! Territory resolution: classify a candidate polygon against the current
//! map snapshot.

use uuid::Uuid;

use stridefall_common::{
    Coordinate, Territory, MINIMUM_AREA_M2, PARTIAL_OVERLAP_THRESHOLD, STEAL_OVERLAP_THRESHOLD,
};
use stridefall_geo::{
    carve_largest, contains, intersection_area_m2, polygon_area_m2, ring_coordinates,
    spherical_polygon_area, to_polygon,
};

/// How a candidate polygon relates to the existing map.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Unclaimed ground. `polygon` is the final claim shape — possibly
    /// carved to exclude partially-overlapped foreign territories.
    New { polygon: Vec<Coordinate>, carved: bool },
    /// ≥80% of the caller's own territory re-run.
    Reinforce { target_id: Uuid, overlap_ratio: f64 },
    /// ≥80% of a foreign territory covered.
    Steal { target_id: Uuid, overlap_ratio: f64 },
    /// Candidate fully inside a foreign territory.
    InteriorConquest { target_id: Uuid, overlap_ratio: f64 },
}

/// Classify `candidate` against the territory snapshot.
///
/// Priority: Steal > Reinforce > InteriorConquest > New. Carving only kicks
/// in for New, against foreign territories overlapped between the partial
/// and steal thresholds, and never reduces the claim below the minimum area
/// (the uncarved shape is kept instead).
pub fn resolve(candidate: &[Coordinate], caller: Uuid, territories: &[Territory]) -> Classification {
    let candidate_poly = to_polygon(candidate);
    let candidate_area = polygon_area_m2(&candidate_poly);

    let mut primary: Option<(&Territory, f64)> = None;
    let mut containing: Option<(&Territory, f64)> = None;
    let mut carve_set: Vec<&Territory> = Vec::new();

    for territory in territories {
        if territory.coordinates.len() < 3 {
            continue;
        }
        let t_poly = to_polygon(&territory.coordinates);
        let overlap = intersection_area_m2(&candidate_poly, &t_poly);
        if overlap <= 0.0 {
            continue;
        }

        let existing_area = if territory.area > 0.0 {
            territory.area
        } else {
            spherical_polygon_area(&territory.coordinates)
        };
        let ratio_of_existing = if existing_area > 0.0 {
            overlap / existing_area
        } else {
            0.0
        };
        let ratio_of_candidate = if candidate_area > 0.0 {
            overlap / candidate_area
        } else {
            0.0
        };

        if primary.map(|(_, r)| ratio_of_existing > r).unwrap_or(true) {
            primary = Some((territory, ratio_of_existing));
        }

        if territory.user_id != caller
            && containing.is_none()
            && contains(&t_poly, &candidate_poly)
        {
            containing = Some((territory, ratio_of_existing));
        }

        let max_ratio = ratio_of_existing.max(ratio_of_candidate);
        if territory.user_id != caller
            && max_ratio >= PARTIAL_OVERLAP_THRESHOLD
            && ratio_of_existing < STEAL_OVERLAP_THRESHOLD
        {
            carve_set.push(territory);
        }
    }

    if let Some((target, ratio)) = primary {
        if ratio >= STEAL_OVERLAP_THRESHOLD {
            if target.user_id != caller {
                return Classification::Steal {
                    target_id: target.id,
                    overlap_ratio: ratio,
                };
            }
            return Classification::Reinforce {
                target_id: target.id,
                overlap_ratio: ratio,
            };
        }
    }

    if let Some((target, ratio)) = containing {
        return Classification::InteriorConquest {
            target_id: target.id,
            overlap_ratio: ratio,
        };
    }

    // New ground; carve out moderately-overlapped foreign footprints.
    if !carve_set.is_empty() {
        let cuts: Vec<_> = carve_set
            .iter()
            .map(|t| to_polygon(&t.coordinates))
            .collect();
        if let Some(carved) = carve_largest(&candidate_poly, &cuts) {
            let carved_ring = ring_coordinates(&carved);
            if spherical_polygon_area(&carved_ring) >= MINIMUM_AREA_M2 {
                return Classification::New {
                    polygon: carved_ring,
                    carved: true,
                };
            }
        }
        // Carving is best-effort enrichment; fall through with the original.
    }

    Classification::New {
        polygon: candidate.to_vec(),
        carved: false,
    }
}
