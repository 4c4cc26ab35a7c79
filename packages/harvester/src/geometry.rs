//! GML to WKT conversion for event place geometries.
//!
//! Coordinates are assumed to be WGS-84 and written latitude first, as the
//! museum systems feeding LIDO do. WKT wants longitude first.

use roxmltree::{Document, Node};
use thiserror::Error;

use crate::types::{Geometry, Position, Warnings};
use crate::xml::{find_by_path, find_child, get_text};

/// Why a GML fragment could not be represented.
///
/// The messages double as record warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("gml polygon missing outer boundary")]
    PolygonMissingOuter,

    #[error("gml linestring missing coordinates")]
    LineStringMissingCoordinates,

    #[error("empty gml pos in point")]
    EmptyPos,

    #[error("empty gml coordinates in point")]
    EmptyCoordinates,

    #[error("gml point missing data")]
    PointMissingData,

    #[error("invalid gml coordinates")]
    InvalidCoordinates,

    #[error("invalid gml")]
    Malformed,
}

fn position(lat: &str, lon: &str) -> Result<Position, GeometryError> {
    let (lat, lon) = (lat.trim(), lon.trim());
    let lat_value: f64 = lat.parse().map_err(|_| GeometryError::InvalidCoordinates)?;
    let lon_value: f64 = lon.parse().map_err(|_| GeometryError::InvalidCoordinates)?;
    if !(-90.0..=90.0).contains(&lat_value) || !(-180.0..=180.0).contains(&lon_value) {
        return Err(GeometryError::InvalidCoordinates);
    }
    Ok(Position::with_text(lat_value, lon_value, lat, lon))
}

/// Parse a `coordinates` list: `lat,lon lat,lon ...`.
fn coordinate_list(text: &str) -> Result<Vec<Position>, GeometryError> {
    text.split_whitespace()
        .map(|pair| {
            let (lat, lon) = pair
                .split_once(',')
                .ok_or(GeometryError::InvalidCoordinates)?;
            position(lat, lon)
        })
        .collect()
}

fn ring(polygon: Node<'_, '_>, boundary: &str) -> Option<String> {
    find_by_path(polygon, &format!("{boundary}/LinearRing/coordinates"))
        .map(get_text)
        .filter(|s| !s.is_empty())
}

fn parse_point(point: Node<'_, '_>) -> Result<Geometry, GeometryError> {
    let (lat, lon) = if let Some(pos) = find_child(point, "pos") {
        let text = get_text(pos);
        if text.is_empty() {
            return Err(GeometryError::EmptyPos);
        }
        let mut parts = text.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(lat), Some(lon)) => (lat.to_string(), lon.to_string()),
            _ => return Err(GeometryError::PointMissingData),
        }
    } else if let Some(coordinates) = find_child(point, "coordinates") {
        let text = get_text(coordinates);
        if text.is_empty() {
            return Err(GeometryError::EmptyCoordinates);
        }
        match text.split_once(',') {
            Some((lat, lon)) => (lat.to_string(), lon.to_string()),
            None => return Err(GeometryError::PointMissingData),
        }
    } else {
        return Err(GeometryError::PointMissingData);
    };

    Ok(Geometry::Point(position(&lat, &lon)?))
}

/// Decode the geometry inside a `gml` element.
///
/// Returns `Ok(None)` when the element holds no polygon, line or point.
pub fn parse_gml(gml: Node<'_, '_>) -> Result<Option<Geometry>, GeometryError> {
    if let Some(polygon) = find_child(gml, "Polygon") {
        let outer = ring(polygon, "outerBoundaryIs").ok_or(GeometryError::PolygonMissingOuter)?;
        let inner = ring(polygon, "innerBoundaryIs")
            .map(|r| coordinate_list(&r))
            .transpose()?;
        return Ok(Some(Geometry::Polygon {
            outer: coordinate_list(&outer)?,
            inner,
        }));
    }

    if let Some(line) = find_child(gml, "LineString") {
        let coordinates = find_child(line, "coordinates")
            .map(get_text)
            .filter(|s| !s.is_empty())
            .ok_or(GeometryError::LineStringMissingCoordinates)?;
        return Ok(Some(Geometry::LineString(coordinate_list(&coordinates)?)));
    }

    if let Some(point) = find_child(gml, "Point") {
        return parse_point(point).map(Some);
    }

    Ok(None)
}

/// Convert a `gml` element to WKT. An unrepresentable geometry yields an
/// empty string and a warning.
pub fn gml_to_wkt(gml: Node<'_, '_>, warnings: &mut Warnings) -> String {
    match parse_gml(gml) {
        Ok(Some(geometry)) => geometry.to_wkt(),
        Ok(None) => String::new(),
        Err(e) => {
            warnings.push(e.to_string());
            String::new()
        }
    }
}

/// Decode a standalone `gml` fragment.
pub fn parse_gml_fragment(fragment: &str) -> Result<Option<Geometry>, GeometryError> {
    let doc = Document::parse(fragment).map_err(|e| {
        tracing::debug!(error = %e, "unparseable gml fragment");
        GeometryError::Malformed
    })?;
    parse_gml(doc.root_element())
}

/// Convert a standalone `gml` fragment to WKT.
///
/// # Examples
/// ```
/// use heritage_harvester::geometry::gml_fragment_to_wkt;
/// use heritage_harvester::types::Warnings;
///
/// let mut warnings = Warnings::new();
/// let gml = "<gml><Point><pos>60.1 24.9</pos></Point></gml>";
/// assert_eq!(gml_fragment_to_wkt(gml, &mut warnings), "POINT (24.9 60.1)");
/// ```
pub fn gml_fragment_to_wkt(fragment: &str, warnings: &mut Warnings) -> String {
    match parse_gml_fragment(fragment) {
        Ok(Some(geometry)) => geometry.to_wkt(),
        Ok(None) => String::new(),
        Err(e) => {
            warnings.push(e.to_string());
            String::new()
        }
    }
}

fn wkt_positions(points: &[Position]) -> String {
    points
        .iter()
        .map(Position::to_wkt)
        .collect::<Vec<_>>()
        .join(",")
}

impl Geometry {
    /// Well-Known Text with longitude first.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        match self {
            Self::Point(p) => format!("POINT ({})", p.to_wkt()),
            Self::LineString(points) => format!("LINESTRING ({})", wkt_positions(points)),
            Self::Polygon { outer, inner: None } => {
                format!("POLYGON (({}))", wkt_positions(outer))
            }
            Self::Polygon {
                outer,
                inner: Some(inner),
            } => format!(
                "POLYGON (({}),({}))",
                wkt_positions(outer),
                wkt_positions(inner)
            ),
        }
    }

    fn positions(&self) -> Box<dyn Iterator<Item = &Position> + '_> {
        match self {
            Self::Point(p) => Box::new(std::iter::once(p)),
            Self::LineString(points) => Box::new(points.iter()),
            Self::Polygon { outer, inner } => {
                Box::new(outer.iter().chain(inner.iter().flatten()))
            }
        }
    }
}

/// Center of the bounding box of all geometries, rendered as `"lon lat"`.
pub fn center_coordinates(geometries: &[Geometry]) -> Option<String> {
    let mut positions = geometries.iter().flat_map(Geometry::positions);
    let first = positions.next()?;
    let (mut min_lat, mut min_lon) = (first.lat, first.lon);
    let (mut max_lat, mut max_lon) = (first.lat, first.lon);
    for p in positions {
        min_lat = min_lat.min(p.lat);
        min_lon = min_lon.min(p.lon);
        max_lat = max_lat.max(p.lat);
        max_lon = max_lon.max(p.lon);
    }
    Some(format!(
        "{} {}",
        (min_lon + max_lon) / 2.0,
        (min_lat + max_lat) / 2.0
    ))
}
