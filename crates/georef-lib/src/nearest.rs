//! Linear nearest-city scan.
//!
//! The scan is the reference behaviour every other lookup strategy must
//! reproduce: cities without a coordinate are skipped, distances are exact
//! haversine kilometres, and on an exact tie the candidate seen first wins.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::db::City;
use crate::error::{Error, Result};
use crate::geo::{haversine_km, round_km, Coordinate};

/// How many candidates are examined between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// The closest city to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest<'a> {
    pub city: &'a City,
    /// The city's coordinate.
    pub coordinate: Coordinate,
    /// Full-precision great-circle distance.
    pub distance_km: f64,
}

impl Nearest<'_> {
    /// Distance rounded to two decimals for output.
    pub fn rounded_distance_km(&self) -> f64 {
        round_km(self.distance_km)
    }
}

/// Find the city closest to `query`.
///
/// Returns `None` when no candidate has a coordinate. Pass cities in
/// ascending id order to get the lowest-id tie-break.
pub fn find_nearest<'a, I>(query: Coordinate, candidates: I) -> Option<Nearest<'a>>
where
    I: IntoIterator<Item = &'a City>,
{
    scan(query, candidates, || false).ok().flatten()
}

/// Same as [`find_nearest`], but stops with [`Error::Cancelled`] once
/// `cancelled` is set.
pub fn find_nearest_cancellable<'a, I>(
    query: Coordinate,
    candidates: I,
    cancelled: &AtomicBool,
) -> Result<Option<Nearest<'a>>>
where
    I: IntoIterator<Item = &'a City>,
{
    scan(query, candidates, || cancelled.load(Ordering::Relaxed))
}

fn scan<'a, I, F>(query: Coordinate, candidates: I, is_cancelled: F) -> Result<Option<Nearest<'a>>>
where
    I: IntoIterator<Item = &'a City>,
    F: Fn() -> bool,
{
    let mut best: Option<Nearest<'a>> = None;

    for (scanned, city) in candidates.into_iter().enumerate() {
        if scanned % CANCEL_CHECK_INTERVAL == 0 && is_cancelled() {
            return Err(Error::Cancelled { scanned });
        }

        let Some(coordinate) = city.coordinate else {
            continue;
        };

        let distance_km = haversine_km(query, coordinate);
        let closer = match &best {
            Some(current) => distance_km < current.distance_km,
            None => true,
        };
        if closer {
            best = Some(Nearest {
                city,
                coordinate,
                distance_km,
            });
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CityId;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    fn city(id: CityId, name: &str, coordinate: Option<Coordinate>) -> City {
        City {
            id,
            name: name.to_string(),
            state_code: None,
            country_id: 1,
            coordinate,
        }
    }

    #[test]
    fn test_frankfurt_prefers_paris_over_london() {
        let cities = vec![
            city(1, "Paris", Some(coord(48.8566, 2.3522))),
            city(2, "London", Some(coord(51.5074, -0.1278))),
        ];

        let nearest = find_nearest(coord(50.1109, 8.6821), &cities).expect("a city");
        assert_eq!(nearest.city.id, 1);
        assert!((nearest.distance_km - 480.0).abs() < 5.0, "got {}", nearest.distance_km);
    }

    #[test]
    fn test_empty_candidates() {
        let cities: Vec<City> = Vec::new();
        assert!(find_nearest(coord(0.0, 0.0), &cities).is_none());
    }

    #[test]
    fn test_ungeocoded_cities_are_skipped() {
        let cities = vec![city(1, "Nowhere", None), city(2, "Also Nowhere", None)];
        assert!(find_nearest(coord(0.0, 0.0), &cities).is_none());

        let cities = vec![
            city(1, "Nowhere", None),
            city(2, "Far", Some(coord(10.0, 10.0))),
        ];
        let nearest = find_nearest(coord(0.0, 0.0), &cities).expect("a city");
        assert_eq!(nearest.city.id, 2);
    }

    #[test]
    fn test_query_on_a_city_returns_it_at_zero() {
        let cities = vec![
            city(1, "Paris", Some(coord(48.8566, 2.3522))),
            city(2, "London", Some(coord(51.5074, -0.1278))),
        ];
        let nearest = find_nearest(coord(51.5074, -0.1278), &cities).expect("a city");
        assert_eq!(nearest.city.id, 2);
        assert_eq!(nearest.distance_km, 0.0);
    }

    #[test]
    fn test_exact_tie_keeps_first_candidate() {
        let point = coord(10.0, 20.0);
        let cities = vec![
            city(5, "First", Some(point)),
            city(6, "Second", Some(point)),
        ];
        let nearest = find_nearest(coord(11.0, 21.0), &cities).expect("a city");
        assert_eq!(nearest.city.id, 5);
    }

    #[test]
    fn test_rounded_distance() {
        let cities = vec![city(1, "Origin", Some(coord(0.0, 0.0)))];
        let nearest = find_nearest(coord(0.0, 1.0), &cities).expect("a city");
        assert_eq!(nearest.rounded_distance_km(), round_km(nearest.distance_km));
        assert!((nearest.rounded_distance_km() - 111.19).abs() < 1e-9);
    }

    #[test]
    fn test_cancelled_scan_stops() {
        let cities = vec![city(1, "Origin", Some(coord(0.0, 0.0)))];
        let flag = AtomicBool::new(true);
        let err = find_nearest_cancellable(coord(0.0, 0.0), &cities, &flag)
            .expect_err("scan cancelled");
        assert!(matches!(err, Error::Cancelled { scanned: 0 }));
    }

    #[test]
    fn test_uncancelled_scan_matches_plain_scan() {
        let cities = vec![
            city(1, "Paris", Some(coord(48.8566, 2.3522))),
            city(2, "London", Some(coord(51.5074, -0.1278))),
        ];
        let flag = AtomicBool::new(false);
        let query = coord(50.1109, 8.6821);
        let cancellable = find_nearest_cancellable(query, &cities, &flag)
            .expect("not cancelled")
            .expect("a city");
        let plain = find_nearest(query, &cities).expect("a city");
        assert_eq!(cancellable, plain);
    }
}
