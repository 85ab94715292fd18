use chrono::{Duration, NaiveDate};
use geo::{Area, BooleanOps, Coord, Intersects, LineString, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::commons::basic_functions::parse_date;
use crate::error::{CollectError, CollectResult};

/// Metres per degree of latitude (approximate, spherical earth)
pub const DEG_TO_M_LAT: f64 = 111_320.0;

/// Metres per degree of longitude at the given latitude
pub fn deg_to_m_lon(lat: f64) -> f64 {
    40_075_000.0 * lat.to_radians().cos() / 360.0
}

/// Vertices used to approximate a buffered point
const BUFFER_SEGMENTS: usize = 32;

/// Bounding box structure, WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64, // min longitude
    pub min_y: f64, // min latitude
    pub max_x: f64, // max longitude
    pub max_y: f64, // max latitude
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// East-west extent in metres, measured at the centre latitude
    pub fn width_m(&self) -> f64 {
        let (_, lat_center) = self.center();
        (self.max_x - self.min_x) * deg_to_m_lon(lat_center)
    }

    /// North-south extent in metres
    pub fn height_m(&self) -> f64 {
        (self.max_y - self.min_y) * DEG_TO_M_LAT
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_x && lon <= self.max_x && lat >= self.min_y && lat <= self.max_y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}

/// Geographic area of interest: a single coordinate or a closed polygon.
///
/// Immutable once built. Collectors only use it as a filter predicate and as
/// the footprint of the spatial reduction.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
}

impl Region {
    /// Point region from latitude / longitude in degrees
    pub fn point(lat: f64, lon: f64) -> CollectResult<Self> {
        check_coordinate(lon, lat)?;
        Ok(Region::Point(Point::new(lon, lat)))
    }

    /// Polygon region from a ring of `(lon, lat)` vertices. The ring is closed
    /// automatically.
    pub fn polygon(ring: &[(f64, f64)]) -> CollectResult<Self> {
        for &(lon, lat) in ring {
            check_coordinate(lon, lat)?;
        }
        let mut distinct: Vec<(f64, f64)> = ring.to_vec();
        if distinct.len() > 1 && distinct.first() == distinct.last() {
            distinct.pop();
        }
        if distinct.len() < 3 {
            return Err(CollectError::config(format!(
                "a polygon region needs at least 3 distinct vertices, got {}",
                distinct.len()
            )));
        }
        Ok(Region::Polygon(Polygon::new(LineString::from(distinct), vec![])))
    }

    /// Disc of `radius_m` metres around a point, as a polygon
    pub fn buffered_point(lat: f64, lon: f64, radius_m: f64) -> CollectResult<Self> {
        check_coordinate(lon, lat)?;
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(CollectError::config(format!(
                "buffer radius must be a positive number of metres, got {}",
                radius_m
            )));
        }
        let dlat = radius_m / DEG_TO_M_LAT;
        let dlon = radius_m / deg_to_m_lon(lat);
        let ring: Vec<(f64, f64)> = (0..BUFFER_SEGMENTS)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * i as f64 / BUFFER_SEGMENTS as f64;
                (lon + dlon * angle.cos(), lat + dlat * angle.sin())
            })
            .collect();
        Region::polygon(&ring)
    }

    pub fn bbox(&self) -> BoundingBox {
        match self {
            Region::Point(p) => BoundingBox::new(p.x(), p.y(), p.x(), p.y()),
            Region::Polygon(poly) => {
                let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
                for c in poly.exterior().coords() {
                    bbox.min_x = bbox.min_x.min(c.x);
                    bbox.min_y = bbox.min_y.min(c.y);
                    bbox.max_x = bbox.max_x.max(c.x);
                    bbox.max_y = bbox.max_y.max(c.y);
                }
                bbox
            }
        }
    }

    /// Whether an image footprint touches this region
    pub fn intersects_bbox(&self, footprint: &BoundingBox) -> bool {
        match self {
            Region::Point(p) => footprint.contains(p.x(), p.y()),
            Region::Polygon(poly) => {
                footprint.intersects(&self.bbox()) && poly.intersects(&footprint.to_rect())
            }
        }
    }

    /// Area (square degrees) of the part of the region lying inside `cell`.
    /// Always zero for a point region.
    pub fn clipped_area(&self, cell: &BoundingBox) -> f64 {
        match self {
            Region::Point(_) => 0.0,
            Region::Polygon(poly) => poly
                .intersection(&cell.to_rect().to_polygon())
                .unsigned_area(),
        }
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        match self {
            Region::Point(p) => geojson::Geometry::new(geojson::Value::from(p)),
            Region::Polygon(poly) => geojson::Geometry::new(geojson::Value::from(poly)),
        }
    }
}

fn check_coordinate(lon: f64, lat: f64) -> CollectResult<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(CollectError::config(format!(
            "coordinate out of range: lat {}, lon {}",
            lat, lon
        )));
    }
    Ok(())
}

/// Inclusive calendar date range, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> CollectResult<Self> {
        if start > end {
            return Err(CollectError::config(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }
        Ok(DateRange { start, end })
    }

    /// Parse two `YYYY-MM-DD` dates
    pub fn parse(start: &str, end: &str) -> CollectResult<Self> {
        DateRange::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Consecutive windows of `step_days` days covering the range; the last
    /// window may be shorter.
    pub fn split(&self, step_days: u32) -> CollectResult<Vec<DateRange>> {
        if step_days == 0 {
            return Err(CollectError::config("window length must be at least one day"));
        }
        let mut windows = Vec::new();
        let mut start = self.start;
        while start <= self.end {
            let end = (start + Duration::days(step_days as i64 - 1)).min(self.end);
            windows.push(DateRange { start, end });
            start = end + Duration::days(1);
        }
        Ok(windows)
    }
}
