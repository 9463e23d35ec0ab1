use georef_lib::fixtures::write_fixture_db;
use georef_lib::{City, Country, GeoStore, PrefixQuery, Result};
use tempfile::TempDir;

fn open_fixture() -> Result<(TempDir, GeoStore)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("georef.db");
    write_fixture_db(&path)?;
    let store = GeoStore::open(&path)?;
    Ok((dir, store))
}

fn city_names(cities: &[City]) -> Vec<&str> {
    cities.iter().map(|city| city.name.as_str()).collect()
}

fn country_names(countries: &[Country]) -> Vec<&str> {
    countries.iter().map(|country| country.name.as_str()).collect()
}

#[test]
fn cities_in_country_by_prefix() -> Result<()> {
    let (_dir, store) = open_fixture()?;

    let cities = store.find_by_prefix::<City>(&PrefixQuery::new("ly", 10).in_country(1))?;
    assert_eq!(
        city_names(&cities),
        vec!["Lyon", "Lyons-la-Forêt"]
    );
    Ok(())
}

#[test]
fn country_filter_excludes_other_countries() -> Result<()> {
    let (_dir, store) = open_fixture()?;

    let english = store.find_by_prefix::<City>(&PrefixQuery::new("M", 10).in_country(2))?;
    assert_eq!(city_names(&english), vec!["Manchester"]);

    let anywhere = store.find_by_prefix::<City>(&PrefixQuery::new("M", 10))?;
    assert_eq!(
        city_names(&anywhere),
        vec!["Manchester", "Marseille", "Munich"]
    );
    Ok(())
}

#[test]
fn empty_prefix_lists_everything_ordered_by_name() -> Result<()> {
    let (_dir, store) = open_fixture()?;

    let french = store.find_by_prefix::<City>(&PrefixQuery::new("", 10).in_country(1))?;
    assert_eq!(
        city_names(&french),
        vec!["Lyon", "Lyons-la-Forêt", "Marseille", "Paris"]
    );
    Ok(())
}

#[test]
fn limit_truncates_results() -> Result<()> {
    let (_dir, store) = open_fixture()?;

    let cities = store.find_by_prefix::<City>(&PrefixQuery::new("", 2))?;
    assert_eq!(cities.len(), 2);
    assert_eq!(city_names(&cities), vec!["Bad Data", "Berlin"]);
    Ok(())
}

#[test]
fn wildcards_match_literally() -> Result<()> {
    let (_dir, store) = open_fixture()?;

    let underscore = store.find_by_prefix::<City>(&PrefixQuery::new("L_on", 10))?;
    assert!(underscore.is_empty(), "'_' must not match any character");

    let percent = store.find_by_prefix::<City>(&PrefixQuery::new("%", 10))?;
    assert!(percent.is_empty(), "'%' must not match everything");
    Ok(())
}

#[test]
fn countries_by_prefix() -> Result<()> {
    let (_dir, store) = open_fixture()?;

    let countries = store.find_by_prefix::<Country>(&PrefixQuery::new("united", 10))?;
    assert_eq!(
        country_names(&countries),
        vec!["United Kingdom", "United States"]
    );

    let none = store.find_by_prefix::<Country>(&PrefixQuery::new("Atlantis", 10))?;
    assert!(none.is_empty());
    Ok(())
}

#[test]
fn search_results_keep_unusable_coordinates_absent() -> Result<()> {
    let (_dir, store) = open_fixture()?;

    let cities = store.find_by_prefix::<City>(&PrefixQuery::new("Bad", 10))?;
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].id, 13);
    assert!(cities[0].coordinate.is_none());
    Ok(())
}
