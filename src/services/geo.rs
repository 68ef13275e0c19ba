//! Geographic helpers for schedule construction: haversine distance, walking
//! time estimates, direction links, and the area reference tables (Japanese
//! display names, center coordinates, meeting-point stations).

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const WALKING_SPEED_M_PER_MIN: f64 = 5000.0 / 60.0; // ~83.33 m/min

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Coordinate { lat, lng }
    }
}

/// Straight-line distance between two points in meters.
pub fn haversine_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Walking time estimate in whole minutes, never less than 1.
pub fn walking_minutes(distance_m: f64) -> i64 {
    ((distance_m / WALKING_SPEED_M_PER_MIN).round() as i64).max(1)
}

/// Google Maps transit directions deep link between two coordinates. Returns
/// `None` when either endpoint has no coordinates.
pub fn directions_url(origin: Option<Coordinate>, destination: Option<Coordinate>) -> Option<String> {
    let o = origin?;
    let d = destination?;
    let mut link = url::Url::parse("https://www.google.com/maps/dir/").ok()?;
    link.query_pairs_mut()
        .append_pair("api", "1")
        .append_pair("origin", &format!("{},{}", o.lat, o.lng))
        .append_pair("destination", &format!("{},{}", d.lat, d.lng))
        .append_pair("travelmode", "transit");
    Some(link.to_string())
}

/// Japanese display name for an area slug; unknown areas keep their own name.
pub fn area_japanese(area: &str) -> String {
    match area {
        "shibuya" => "渋谷",
        "shinjuku" => "新宿",
        "ginza" => "銀座",
        "omotesando" => "表参道",
        "harajuku" => "原宿",
        "ebisu" => "恵比寿",
        "daikanyama" => "代官山",
        "nakameguro" => "中目黒",
        "roppongi" => "六本木",
        "marunouchi" => "丸の内",
        "tokyo" => "東京",
        "shinagawa" => "品川",
        "odaiba" => "お台場",
        "ueno" => "上野",
        "asakusa" => "浅草",
        "akihabara" => "秋葉原",
        "ikebukuro" => "池袋",
        "kichijoji" => "吉祥寺",
        "shimokitazawa" => "下北沢",
        "jiyugaoka" => "自由が丘",
        other => return other.to_string(),
    }
    .to_string()
}

/// Reference coordinate when nothing at all could be resolved (Tokyo Station).
pub fn tokyo_fallback() -> Coordinate {
    Coordinate::new(35.6812, 139.7671)
}

fn known_center(area: &str) -> Option<Coordinate> {
    let coord = match area {
        "shibuya" | "渋谷" => (35.6595, 139.7004),
        "shinjuku" | "新宿" => (35.6895, 139.6917),
        "ginza" | "銀座" => (35.6719, 139.7645),
        "omotesando" | "表参道" => (35.6657, 139.7125),
        "harajuku" | "原宿" => (35.6704, 139.7028),
        "ebisu" | "恵比寿" => (35.6467, 139.7100),
        "daikanyama" | "代官山" => (35.6502, 139.7048),
        "nakameguro" | "中目黒" => (35.6417, 139.6979),
        "roppongi" | "六本木" => (35.6627, 139.7291),
        "marunouchi" | "丸の内" | "tokyo" | "東京" | "東京都" => (35.6812, 139.7671),
        "shinagawa" | "品川" => (35.6284, 139.7387),
        "odaiba" | "お台場" => (35.6270, 139.7769),
        "ueno" | "上野" => (35.7138, 139.7770),
        "asakusa" | "浅草" => (35.7148, 139.7967),
        "akihabara" | "秋葉原" => (35.6984, 139.7731),
        "ikebukuro" | "池袋" => (35.7296, 139.7160),
        "kichijoji" | "吉祥寺" => (35.7033, 139.5797),
        "shimokitazawa" | "下北沢" => (35.6613, 139.6681),
        "jiyugaoka" | "自由が丘" => (35.6079, 139.6681),
        "yokohama" | "横浜" => (35.4437, 139.6380),
        _ => return None,
    };
    Some(Coordinate::new(coord.0, coord.1))
}

fn geocoded_cache() -> &'static RwLock<HashMap<String, Coordinate>> {
    static CACHE: OnceLock<RwLock<HashMap<String, Coordinate>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Reference coordinate for a known or previously geocoded area.
pub fn cached_area_center(area: &str) -> Option<Coordinate> {
    if let Some(center) = known_center(area) {
        return Some(center);
    }
    geocoded_cache().read().ok()?.get(area).copied()
}

/// Remember a geocoder result so repeated requests for the same area skip the
/// external call.
pub fn remember_area_center(area: &str, center: Coordinate) {
    if let Ok(mut cache) = geocoded_cache().write() {
        cache.insert(area.to_string(), center);
    }
}

#[derive(Debug, Clone)]
pub struct Station {
    pub name: String,
    pub exit: String,
}

/// Meeting-point station for an area. Area names that already name a station
/// are used as-is; unknown areas get "<name>駅" with a generic exit.
pub fn area_station(area: &str) -> Station {
    if area.contains('駅') {
        return Station {
            name: area.to_string(),
            exit: "改札".to_string(),
        };
    }

    let (name, exit) = match area {
        "shibuya" | "渋谷" => ("渋谷駅", "ハチ公口"),
        "shinjuku" | "新宿" => ("新宿駅", "東口"),
        "ginza" | "銀座" => ("銀座駅", "A1出口"),
        "harajuku" | "原宿" => ("原宿駅", "竹下口"),
        "odaiba" | "お台場" => ("お台場海浜公園駅", "改札"),
        "ueno" | "上野" => ("上野駅", "公園口"),
        "asakusa" | "浅草" => ("浅草駅", "1番出口"),
        "ikebukuro" | "池袋" => ("池袋駅", "東口"),
        other => {
            return Station {
                name: format!("{}駅", area_japanese(other)),
                exit: "改札".to_string(),
            }
        }
    };
    Station {
        name: name.to_string(),
        exit: exit.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKYO_STATION: Coordinate = Coordinate { lat: 35.6812, lng: 139.7671 };
    const SHIBUYA_STATION: Coordinate = Coordinate { lat: 35.6595, lng: 139.7004 };

    #[test]
    fn haversine_is_zero_for_identical_points() {
        assert_eq!(haversine_distance_m(TOKYO_STATION, TOKYO_STATION), 0.0);
    }

    #[test]
    fn haversine_is_symmetric() {
        let ab = haversine_distance_m(TOKYO_STATION, SHIBUYA_STATION);
        let ba = haversine_distance_m(SHIBUYA_STATION, TOKYO_STATION);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn tokyo_to_shibuya_is_roughly_six_and_a_half_km() {
        let dist = haversine_distance_m(TOKYO_STATION, SHIBUYA_STATION);
        assert!(dist > 6_300.0 && dist < 6_600.0, "got {dist}");
    }

    #[test]
    fn walking_minutes_has_a_floor_of_one() {
        assert_eq!(walking_minutes(0.0), 1);
        assert_eq!(walking_minutes(40.0), 1);
        // 1 km at ~83.3 m/min is 12 minutes.
        assert_eq!(walking_minutes(1000.0), 12);
    }

    #[test]
    fn directions_url_requires_both_endpoints() {
        assert!(directions_url(Some(TOKYO_STATION), None).is_none());
        let link = directions_url(Some(TOKYO_STATION), Some(SHIBUYA_STATION)).unwrap();
        assert!(link.contains("travelmode=transit"));
    }

    #[test]
    fn station_lookup_handles_explicit_station_names() {
        assert_eq!(area_station("太田駅").name, "太田駅");
        assert_eq!(area_station("shibuya").exit, "ハチ公口");
        assert_eq!(area_station("kawagoe").name, "kawagoe駅");
    }

    #[test]
    fn geocoded_centers_are_remembered() {
        assert!(cached_area_center("takasaki-test").is_none());
        remember_area_center("takasaki-test", Coordinate::new(36.32, 139.01));
        assert!(cached_area_center("takasaki-test").is_some());
    }
}
