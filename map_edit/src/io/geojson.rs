use std::io;

use ::geojson::feature::Id;
use ::geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue, Value};
use serde::Serialize;

use super::invalid_data;
use crate::feature::{AttributeValue, Attributes, Feature, GEOMETRY_KEY};
use crate::geometry::{Geometry, Point, Polyline};
use crate::transaction::ChangeSet;

fn position(p: &Point) -> Vec<f64> {
    vec![p.x, p.y]
}

fn point(pos: &[f64]) -> io::Result<Point> {
    match pos {
        [x, y, ..] => Ok(Point::new(*x, *y)),
        _ => Err(invalid_data("position needs at least two ordinates")),
    }
}

/// Converts a geometry to GeoJSON. Polygon rings are written closed.
pub fn geometry_to_geojson(geometry: &Geometry) -> ::geojson::Geometry {
    let value = match geometry {
        Geometry::Point(p) => Value::Point(position(p)),
        Geometry::LineString(line) => {
            Value::LineString(line.vertices.iter().map(position).collect())
        }
        Geometry::Polygon(ring) => {
            let mut coords: Vec<Vec<f64>> = ring.iter().map(position).collect();
            if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
                if ring.len() > 1 && first != last {
                    coords.push(position(first));
                }
            }
            Value::Polygon(vec![coords])
        }
    };
    ::geojson::Geometry::new(value)
}

/// Converts Point, LineString and Polygon GeoJSON geometries. Only the
/// exterior ring of a polygon is kept, without its closing vertex.
pub fn geometry_from_geojson(geometry: &::geojson::Geometry) -> io::Result<Geometry> {
    match &geometry.value {
        Value::Point(pos) => Ok(Geometry::Point(point(pos)?)),
        Value::LineString(line) => Ok(Geometry::LineString(Polyline::new(
            line.iter().map(|p| point(p)).collect::<io::Result<_>>()?,
        ))),
        Value::Polygon(rings) => {
            let exterior = rings
                .first()
                .ok_or_else(|| invalid_data("polygon without rings"))?;
            let mut ring: Vec<Point> = exterior
                .iter()
                .map(|p| point(p))
                .collect::<io::Result<_>>()?;
            if ring.len() > 1 && ring.first() == ring.last() {
                ring.pop();
            }
            Ok(Geometry::Polygon(ring))
        }
        _ => Err(invalid_data("unsupported geometry type")),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::Text(s) => JsonValue::String(s.clone()),
        AttributeValue::Geometry(g) => {
            serde_json::to_value(geometry_to_geojson(g)).unwrap_or(JsonValue::Null)
        }
    }
}

fn attribute_from_json(value: &JsonValue) -> Option<AttributeValue> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(AttributeValue::Bool(*b)),
        JsonValue::Number(n) => n.as_f64().map(AttributeValue::Number),
        JsonValue::String(s) => Some(AttributeValue::Text(s.clone())),
        JsonValue::Object(object) if object.contains_key("coordinates") => {
            let geometry = ::geojson::Geometry::from_json_object(object.clone())
                .ok()
                .and_then(|g| geometry_from_geojson(&g).ok());
            Some(match geometry {
                Some(g) => AttributeValue::Geometry(g),
                None => AttributeValue::Text(value.to_string()),
            })
        }
        other => Some(AttributeValue::Text(other.to_string())),
    }
}

/// Converts a feature. The default geometry becomes the GeoJSON geometry,
/// every other attribute a property; the feature id is written as `id`.
pub fn feature_to_geojson(feature: &Feature) -> ::geojson::Feature {
    let mut geometry = None;
    let mut properties = JsonObject::new();
    for (key, value) in feature.attributes() {
        match value {
            AttributeValue::Geometry(g) if key == GEOMETRY_KEY => {
                geometry = Some(geometry_to_geojson(&g));
            }
            other => {
                properties.insert(key, attribute_to_json(&other));
            }
        }
    }
    ::geojson::Feature {
        bbox: None,
        geometry,
        id: Some(Id::Number(feature.id().get().into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Builds a new feature from GeoJSON. Null properties are skipped, nested
/// GeoJSON geometries become geometry attributes, other arrays and objects are
/// kept as JSON text. The GeoJSON `id` is not reused:
/// the new feature receives a fresh identity.
pub fn feature_from_geojson(feature: &::geojson::Feature) -> io::Result<Feature> {
    let mut attributes = Attributes::new();
    if let Some(properties) = &feature.properties {
        for (key, value) in properties {
            if let Some(v) = attribute_from_json(value) {
                attributes.insert(key.clone(), v);
            }
        }
    }
    if let Some(geometry) = &feature.geometry {
        attributes.insert(
            GEOMETRY_KEY.to_string(),
            AttributeValue::Geometry(geometry_from_geojson(geometry)?),
        );
    }
    Ok(Feature::with_attributes(attributes))
}

/// Builds a feature from a GeoJSON Feature object held as JSON.
pub fn feature_from_json(value: JsonValue) -> io::Result<Feature> {
    let feature: ::geojson::Feature =
        serde_json::from_value(value).map_err(|e| invalid_data(e.to_string()))?;
    feature_from_geojson(&feature)
}

pub fn features_to_collection(features: &[Feature]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features.iter().map(feature_to_geojson).collect(),
        foreign_members: None,
    }
}

/// Parses a FeatureCollection, a single Feature or a bare Geometry.
pub fn parse_features_geojson(contents: &str) -> io::Result<Vec<Feature>> {
    let geojson: GeoJson = contents
        .parse()
        .map_err(|e: ::geojson::Error| invalid_data(e.to_string()))?;
    match geojson {
        GeoJson::FeatureCollection(fc) => fc.features.iter().map(feature_from_geojson).collect(),
        GeoJson::Feature(f) => Ok(vec![feature_from_geojson(&f)?]),
        GeoJson::Geometry(g) => Ok(vec![Feature::with_geometry(geometry_from_geojson(&g)?)]),
    }
}

pub fn read_features_geojson(path: &str) -> io::Result<Vec<Feature>> {
    let contents = crate::io::read_to_string(path)?;
    parse_features_geojson(&contents)
}

pub fn write_features_geojson(path: &str, features: &[Feature]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(&features_to_collection(features))
        .map_err(io::Error::other)?;
    crate::io::write_string(path, &json)
}

/// A [`ChangeSet`] as one FeatureCollection per bucket.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSetCollections {
    pub inserts: FeatureCollection,
    pub updates: FeatureCollection,
    pub deletes: FeatureCollection,
}

pub fn change_set_to_geojson(changes: &ChangeSet) -> ChangeSetCollections {
    ChangeSetCollections {
        inserts: features_to_collection(&changes.inserts),
        updates: features_to_collection(&changes.updates),
        deletes: features_to_collection(&changes.deletes),
    }
}

pub fn write_change_set_geojson(path: &str, changes: &ChangeSet) -> io::Result<()> {
    let json = serde_json::to_string_pretty(&change_set_to_geojson(changes))
        .map_err(io::Error::other)?;
    crate::io::write_string(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "a",
                "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                "properties": {"name": "well", "depth": 12, "active": true, "note": null}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]},
                "properties": {"tags": ["x", "y"]}
            }
        ]
    }"#;

    #[test]
    fn parse_collection_maps_properties() {
        let features = parse_features_geojson(COLLECTION).unwrap();
        assert_eq!(features.len(), 2);

        let well = &features[0];
        assert_eq!(well.get("name"), Some(AttributeValue::from("well")));
        assert_eq!(well.get("depth"), Some(AttributeValue::Number(12.0)));
        assert_eq!(well.get("active"), Some(AttributeValue::Bool(true)));
        assert!(!well.contains("note"));
        assert_eq!(well.geometry(), Some(Geometry::Point(Point::new(1.0, 2.0))));

        let area = &features[1];
        assert_eq!(area.get("tags"), Some(AttributeValue::from(r#"["x","y"]"#)));
        assert_eq!(
            area.geometry(),
            Some(Geometry::Polygon(vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
            ]))
        );
    }

    #[test]
    fn feature_export_uses_identity_and_closes_rings() {
        let f = Feature::with_geometry(Geometry::Polygon(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
        ]));
        f.set("label", "lot 4");
        let gj = feature_to_geojson(&f);

        assert_eq!(gj.id, Some(Id::Number(f.id().get().into())));
        let props = gj.properties.unwrap();
        assert_eq!(props.get("label"), Some(&JsonValue::from("lot 4")));
        assert!(!props.contains_key(GEOMETRY_KEY));
        match gj.geometry.unwrap().value {
            Value::Polygon(rings) => assert_eq!(rings[0].len(), 4),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn secondary_geometry_survives_export_and_import() {
        let f = Feature::with_geometry(Geometry::Point(Point::new(0.0, 0.0)));
        let route = Geometry::LineString(Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
        ]));
        f.set("route", route.clone());
        f.set("meta", "{\"coordinates\": 1}");

        let back = feature_from_geojson(&feature_to_geojson(&f)).unwrap();
        assert_eq!(back.get("route"), Some(AttributeValue::Geometry(route)));
        assert_eq!(back.get("meta"), Some(AttributeValue::from("{\"coordinates\": 1}")));

        let bogus = serde_json::json!({
            "type": "Feature",
            "geometry": null,
            "properties": {"shape": {"type": "Nope", "coordinates": 3}}
        });
        let f = feature_from_json(bogus).unwrap();
        assert!(matches!(f.get("shape"), Some(AttributeValue::Text(_))));
    }

    #[test]
    fn unsupported_geometry_is_invalid_data() {
        let err = parse_features_geojson(r#"{"type":"MultiPoint","coordinates":[[0,0]]}"#)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn write_and_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        let path = path.to_str().unwrap();
        let f = Feature::with_geometry(Geometry::Point(Point::new(3.0, 4.0)));
        f.set("kind", "tree");

        write_features_geojson(path, &[f]).unwrap();
        let back = read_features_geojson(path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].get("kind"), Some(AttributeValue::from("tree")));
        assert_eq!(back[0].geometry(), Some(Geometry::Point(Point::new(3.0, 4.0))));
    }

    #[test]
    fn change_set_collections_serialize_per_bucket() {
        let changes = ChangeSet {
            inserts: vec![Feature::new()],
            updates: Vec::new(),
            deletes: vec![Feature::new(), Feature::new()],
        };
        let json = serde_json::to_value(change_set_to_geojson(&changes)).unwrap();
        assert_eq!(json["inserts"]["features"].as_array().unwrap().len(), 1);
        assert_eq!(json["updates"]["features"].as_array().unwrap().len(), 0);
        assert_eq!(json["deletes"]["features"].as_array().unwrap().len(), 2);
    }
}
