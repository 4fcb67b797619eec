// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared decoding helpers for provider implementations.

use crate::fetch::RawAsset;
use crate::provider::ProviderMetadata;
use atlas_core::{
    AdministrativeLevel, AtlasError, AtlasResult, LegalStatus, Provenance,
};
use geo_types::{Geometry, MultiPolygon};
use serde_json::{Map, Value};

/// Decode a GeoJSON FeatureCollection into `(properties, multipolygon)`
/// pairs. Features without geometry, and geometry types other than
/// Polygon/MultiPolygon, fail the payload.
pub(crate) fn parse_feature_collection(
    provider: &str,
    bytes: &[u8],
) -> AtlasResult<Vec<(Map<String, Value>, MultiPolygon<f64>)>> {
    let text = std::str::from_utf8(bytes).map_err(|e| AtlasError::Format {
        provider: provider.to_owned(),
        reason: format!("payload is not UTF-8: {e}"),
    })?;
    let collection: geojson::FeatureCollection =
        text.parse().map_err(|e| AtlasError::Format {
            provider: provider.to_owned(),
            reason: format!("not a GeoJSON feature collection: {e}"),
        })?;

    let mut records = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let geometry = feature.geometry.ok_or_else(|| AtlasError::Schema {
            provider: provider.to_owned(),
            reason: "feature has no geometry".into(),
        })?;
        let geometry = multipolygon_from_geojson(provider, &geometry)?;
        let properties = feature.properties.unwrap_or_default();
        records.push((properties, geometry));
    }
    Ok(records)
}

/// Convert one GeoJSON geometry into a multipolygon.
pub(crate) fn multipolygon_from_geojson(
    provider: &str,
    geometry: &geojson::Geometry,
) -> AtlasResult<MultiPolygon<f64>> {
    let converted = Geometry::<f64>::try_from(geometry).map_err(|e| AtlasError::Format {
        provider: provider.to_owned(),
        reason: format!("unconvertible geometry: {e}"),
    })?;
    match converted {
        Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        other => Err(AtlasError::Schema {
            provider: provider.to_owned(),
            reason: format!("expected polygonal geometry, got {other:?}"),
        }),
    }
}

/// Read a string property, trying each name in order.
pub(crate) fn string_property(
    provider: &str,
    properties: &Map<String, Value>,
    names: &[&str],
) -> AtlasResult<String> {
    for name in names {
        match properties.get(*name) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Ok(s.trim().to_owned()),
            Some(Value::Number(n)) => return Ok(n.to_string()),
            _ => {}
        }
    }
    Err(AtlasError::Schema {
        provider: provider.to_owned(),
        reason: format!("none of {names:?} present on feature"),
    })
}

/// Build the provenance record for one decoded boundary.
pub(crate) fn provenance_for(
    metadata: &ProviderMetadata,
    asset: &RawAsset,
    vintage: u16,
    authority_level: AdministrativeLevel,
    legal_status: LegalStatus,
) -> Provenance {
    Provenance {
        provider_name: metadata.name.clone(),
        url: asset.url.clone(),
        version: vintage.to_string(),
        license: metadata.license.clone(),
        retrieved_at: asset.retrieved_at,
        checksum: asset.checksum.clone(),
        authority_level,
        legal_status,
        coordinate_system: "EPSG:4326".to_owned(),
        geometry_repaired: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature_collection(geometry: Value) -> String {
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"GEOID": "1101", "NAME": "Ward 1"},
                "geometry": geometry
            }]
        })
        .to_string()
    }

    #[test]
    fn polygon_feature_parses() {
        let body = feature_collection(json!({
            "type": "Polygon",
            "coordinates": [[[-77.1, 38.8], [-77.0, 38.8], [-77.0, 38.9], [-77.1, 38.9], [-77.1, 38.8]]]
        }));
        let records = parse_feature_collection("test", body.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0["GEOID"], json!("1101"));
        assert_eq!(records[0].1.0.len(), 1);
    }

    #[test]
    fn point_feature_is_a_schema_error() {
        let body = feature_collection(json!({
            "type": "Point",
            "coordinates": [-77.0, 38.9]
        }));
        let err = parse_feature_collection("test", body.as_bytes()).unwrap_err();
        assert_eq!(err.class(), atlas_core::ErrorClass::SchemaError);
    }

    #[test]
    fn garbage_is_a_format_error() {
        let err = parse_feature_collection("test", b"not json").unwrap_err();
        assert_eq!(err.class(), atlas_core::ErrorClass::FormatError);
    }

    #[test]
    fn string_property_tries_names_in_order() {
        let properties: Map<String, Value> =
            [("GEOID20".to_owned(), json!("5501"))].into_iter().collect();
        assert_eq!(
            string_property("test", &properties, &["GEOID", "GEOID20"]).unwrap(),
            "5501"
        );
        assert!(string_property("test", &properties, &["DISTRICT"]).is_err());
    }

    #[test]
    fn numeric_property_is_stringified() {
        let properties: Map<String, Value> =
            [("WARD".to_owned(), json!(3))].into_iter().collect();
        assert_eq!(string_property("test", &properties, &["WARD"]).unwrap(), "3");
    }
}
