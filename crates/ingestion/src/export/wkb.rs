//! Well-Known Binary encoding and GeoPackage geometry blobs.
//!
//! Everything is written little-endian.

use stac_protocol::Geometry;

const WKB_POINT: u32 = 1;
const WKB_LINE_STRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTI_POINT: u32 = 4;
const WKB_MULTI_LINE_STRING: u32 = 5;
const WKB_MULTI_POLYGON: u32 = 6;

const LITTLE_ENDIAN: u8 = 1;

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_f64(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_header(buf: &mut Vec<u8>, kind: u32) {
    buf.push(LITTLE_ENDIAN);
    put_u32(buf, kind);
}

fn put_positions(buf: &mut Vec<u8>, positions: &[[f64; 2]]) {
    put_u32(buf, positions.len() as u32);
    for [x, y] in positions {
        put_f64(buf, *x);
        put_f64(buf, *y);
    }
}

fn put_rings(buf: &mut Vec<u8>, rings: &[Vec<[f64; 2]>]) {
    put_u32(buf, rings.len() as u32);
    for ring in rings {
        put_positions(buf, ring);
    }
}

/// WKB type code of a geometry.
pub fn wkb_type(geometry: &Geometry) -> u32 {
    match geometry {
        Geometry::Point { .. } => WKB_POINT,
        Geometry::LineString { .. } => WKB_LINE_STRING,
        Geometry::Polygon { .. } => WKB_POLYGON,
        Geometry::MultiPoint { .. } => WKB_MULTI_POINT,
        Geometry::MultiLineString { .. } => WKB_MULTI_LINE_STRING,
        Geometry::MultiPolygon { .. } => WKB_MULTI_POLYGON,
    }
}

/// Encode a geometry as WKB.
pub fn to_wkb(geometry: &Geometry) -> Vec<u8> {
    let mut buf = Vec::new();
    write_geometry(&mut buf, geometry);
    buf
}

fn write_geometry(buf: &mut Vec<u8>, geometry: &Geometry) {
    put_header(buf, wkb_type(geometry));
    match geometry {
        Geometry::Point { coordinates: [x, y] } => {
            put_f64(buf, *x);
            put_f64(buf, *y);
        }
        Geometry::LineString { coordinates } => put_positions(buf, coordinates),
        Geometry::Polygon { coordinates } => put_rings(buf, coordinates),
        Geometry::MultiPoint { coordinates } => {
            put_u32(buf, coordinates.len() as u32);
            for p in coordinates {
                write_geometry(buf, &Geometry::Point { coordinates: *p });
            }
        }
        Geometry::MultiLineString { coordinates } => {
            put_u32(buf, coordinates.len() as u32);
            for line in coordinates {
                put_header(buf, WKB_LINE_STRING);
                put_positions(buf, line);
            }
        }
        Geometry::MultiPolygon { coordinates } => {
            put_u32(buf, coordinates.len() as u32);
            for polygon in coordinates {
                put_header(buf, WKB_POLYGON);
                put_rings(buf, polygon);
            }
        }
    }
}

/// GeoPackage binary geometry: `GP` header, SRS id, XY envelope, WKB.
pub fn to_gpkg_blob(geometry: &Geometry, srs_id: i32) -> Vec<u8> {
    let envelope = geometry.bbox();

    // flags: little-endian, envelope [minx, maxx, miny, maxy] or none.
    let envelope_code: u8 = if envelope.is_some() { 1 } else { 0 };
    let flags = (envelope_code << 1) | LITTLE_ENDIAN;

    let mut buf = vec![b'G', b'P', 0, flags];
    buf.extend_from_slice(&srs_id.to_le_bytes());
    if let Some(b) = envelope {
        put_f64(&mut buf, b.min_x);
        put_f64(&mut buf, b.max_x);
        put_f64(&mut buf, b.min_y);
        put_f64(&mut buf, b.max_y);
    }
    write_geometry(&mut buf, geometry);
    buf
}
