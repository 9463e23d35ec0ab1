//! KD-tree spatial index for nearest-city queries.
//!
//! Coordinates are projected onto the unit sphere and stored in a 3D KD-tree.
//! Chord length between unit vectors is a monotonic function of great-circle
//! distance, so the Euclidean nearest neighbour is also the great-circle
//! nearest neighbour. The tree only narrows the search: candidates within a
//! hair of the best chord are re-ranked by exact haversine distance with the
//! same lowest-position tie-break as [`crate::find_nearest`], so both
//! strategies always return the same city.
//!
//! # Example
//!
//! ```no_run
//! use georef_lib::{load_dataset, Coordinate, SpatialIndex};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dataset = load_dataset(std::path::Path::new("georef.db"))?;
//! let index = SpatialIndex::build(dataset.cities());
//!
//! let frankfurt = Coordinate::new(50.1109, 8.6821)?;
//! if let Some((position, km)) = index.nearest(frankfurt) {
//!     println!("{} is {km:.2} km away", dataset.cities()[position].name);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use tracing::debug;

use crate::db::City;
use crate::geo::{haversine_km, Coordinate};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Extra chord length (unit sphere) accepted around the best match before
/// exact re-ranking. About 0.6 mm on the Earth's surface.
const CHORD_TOLERANCE: f64 = 1e-7;

/// One distinct coordinate in the tree.
#[derive(Debug, Clone)]
struct IndexNode {
    coordinate: Coordinate,
    /// Candidate-slice positions sharing this coordinate, ascending.
    positions: Vec<usize>,
}

/// Spatial index over the geocoded cities of a candidate slice.
///
/// Results refer to positions in the slice the index was built from; the
/// index must be rebuilt whenever that slice changes.
pub struct SpatialIndex {
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    nodes: Vec<IndexNode>,
    indexed_cities: usize,
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("nodes", &self.nodes.len())
            .field("indexed_cities", &self.indexed_cities)
            .finish()
    }
}

impl SpatialIndex {
    /// Build an index over every city in `cities` that has a coordinate.
    ///
    /// Cities sharing an exact coordinate are stored as a single tree entry.
    pub fn build(cities: &[City]) -> Self {
        let mut nodes: Vec<IndexNode> = Vec::new();
        let mut by_coordinate: HashMap<(u64, u64), usize> = HashMap::new();
        let mut indexed_cities = 0usize;

        for (position, city) in cities.iter().enumerate() {
            let Some(coordinate) = city.coordinate else {
                continue;
            };
            indexed_cities += 1;

            // +0.0 folds negative zero into positive zero.
            let key = (
                (coordinate.latitude() + 0.0).to_bits(),
                (coordinate.longitude() + 0.0).to_bits(),
            );
            match by_coordinate.get(&key) {
                Some(&node) => nodes[node].positions.push(position),
                None => {
                    by_coordinate.insert(key, nodes.len());
                    nodes.push(IndexNode {
                        coordinate,
                        positions: vec![position],
                    });
                }
            }
        }

        let mut tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32> = KdTree::new();
        for (index, node) in nodes.iter().enumerate() {
            tree.add(&node.coordinate.to_unit_vector(), index);
        }

        debug!(
            node_count = nodes.len(),
            indexed_cities, "built spatial index"
        );

        Self {
            tree,
            nodes,
            indexed_cities,
        }
    }

    /// Number of cities reachable through the index.
    pub fn len(&self) -> usize {
        self.indexed_cities
    }

    /// Returns true if the index holds no cities.
    pub fn is_empty(&self) -> bool {
        self.indexed_cities == 0
    }

    /// Find the city closest to `query`.
    ///
    /// Returns the city's position in the slice the index was built from and
    /// its exact great-circle distance in kilometres.
    pub fn nearest(&self, query: Coordinate) -> Option<(usize, f64)> {
        if self.nodes.is_empty() {
            return None;
        }

        let point = query.to_unit_vector();
        let closest = self.tree.nearest_one::<SquaredEuclidean>(&point);
        let radius = closest.distance.max(0.0).sqrt() + CHORD_TOLERANCE;
        let candidates = self
            .tree
            .within::<SquaredEuclidean>(&point, radius * radius);

        let mut best: Option<(usize, f64)> = None;
        for neighbour in candidates {
            let node = &self.nodes[neighbour.item];
            let Some(&position) = node.positions.first() else {
                continue;
            };
            let distance_km = haversine_km(query, node.coordinate);

            let better = match best {
                Some((best_position, best_km)) => {
                    distance_km < best_km || (distance_km == best_km && position < best_position)
                }
                None => true,
            };
            if better {
                best = Some((position, distance_km));
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CityId;
    use crate::nearest::find_nearest;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    fn city(id: CityId, coordinate: Option<Coordinate>) -> City {
        City {
            id,
            name: format!("City {id}"),
            state_code: None,
            country_id: 1,
            coordinate,
        }
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(index.nearest(coord(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_skips_ungeocoded_cities() {
        let cities = vec![city(1, None), city(2, Some(coord(10.0, 10.0)))];
        let index = SpatialIndex::build(&cities);
        assert_eq!(index.len(), 1);

        let (position, _) = index.nearest(coord(0.0, 0.0)).expect("a city");
        assert_eq!(position, 1);
    }

    #[test]
    fn test_duplicate_coordinates_keep_lowest_position() {
        let point = coord(48.8566, 2.3522);
        let cities: Vec<City> = (0..100).map(|id| city(id, Some(point))).collect();
        let index = SpatialIndex::build(&cities);
        assert_eq!(index.len(), 100);

        let (position, km) = index.nearest(coord(48.0, 2.0)).expect("a city");
        assert_eq!(position, 0);
        assert!(km > 0.0);
    }

    #[test]
    fn test_matches_scan_across_the_antimeridian() {
        let cities = vec![
            city(1, Some(coord(0.0, 179.9))),
            city(2, Some(coord(0.0, -170.0))),
            city(3, Some(coord(0.0, 170.0))),
        ];
        let index = SpatialIndex::build(&cities);
        let query = coord(0.0, -179.9);

        let (position, km) = index.nearest(query).expect("a city");
        let expected = find_nearest(query, &cities).expect("a city");
        assert_eq!(cities[position].id, expected.city.id);
        assert_eq!(km, expected.distance_km);
        assert_eq!(expected.city.id, 1);
    }

    #[test]
    fn test_symmetric_tie_matches_scan() {
        let cities = vec![
            city(1, Some(coord(0.0, 1.0))),
            city(2, Some(coord(0.0, -1.0))),
        ];
        let index = SpatialIndex::build(&cities);
        let (position, _) = index.nearest(coord(0.0, 0.0)).expect("a city");
        let expected = find_nearest(coord(0.0, 0.0), &cities).expect("a city");
        assert_eq!(cities[position].id, expected.city.id);
    }
}
