//! Geocell indexing for interest-region subscriptions.
//!
//! Coordinates are discretized into geohash cells (longitude-first bit
//! interleaving over the standard base32 alphabet), so tokens line up with
//! common geohash tooling. Two points in the same cell always produce the
//! same token; nothing about metric distance is guaranteed beyond that.

use siren_types::GeoPoint;
use thiserror::Error;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Longest supported token: 12 chars = 60 interleaved bits.
pub const MAX_PRECISION: usize = 12;

/// Default precision used for interest regions. Six characters is a cell of
/// roughly 1.2 km x 0.6 km, coarse enough to keep subscription churn low
/// while a device moves, fine enough to bound over-fetch.
pub const DEFAULT_PRECISION: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeoError {
    #[error("empty geocell token")]
    EmptyToken,
    #[error("geocell token longer than {} characters", MAX_PRECISION)]
    TokenTooLong,
    #[error("invalid geocell character '{0}'")]
    InvalidChar(char),
}

/// A token's position on the integer grid at its precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellIndex {
    lat: u64,
    lng: u64,
    precision: usize,
}

impl CellIndex {
    fn lat_bits(&self) -> u32 {
        ((self.precision * 5) / 2) as u32
    }

    fn lng_bits(&self) -> u32 {
        (self.precision * 5 - self.precision * 5 / 2) as u32
    }
}

/// Map a point to its cell token at the given precision.
///
/// Latitude is clamped to [-90, 90] and longitude wrapped into [-180, 180).
/// Precision is clamped to [1, `MAX_PRECISION`]. Pure and deterministic.
pub fn cell_of(point: GeoPoint, precision: usize) -> String {
    let precision = precision.clamp(1, MAX_PRECISION);
    let total_bits = precision * 5;
    let lat_bits = (total_bits / 2) as u32;
    let lng_bits = (total_bits - total_bits / 2) as u32;

    let lat = point.lat.clamp(-90.0, 90.0);
    let lng = wrap_lng(point.lng);

    let lat_idx = quantize(lat, -90.0, 180.0, lat_bits);
    let lng_idx = quantize(lng, -180.0, 360.0, lng_bits);

    encode(CellIndex {
        lat: lat_idx,
        lng: lng_idx,
        precision,
    })
}

/// The 8 cells surrounding a token's cell, at the same precision, in
/// row-major order from the north-west (NW, N, NE, W, E, SW, S, SE).
///
/// Longitude wraps at the antimeridian; rows that would cross a pole are
/// skipped, so polar cells yield fewer than 8 neighbors. The center cell is
/// never included.
pub fn neighbors_of(token: &str) -> Result<Vec<String>, GeoError> {
    let center = decode(token)?;
    let lat_max = 1i64 << center.lat_bits();
    let lng_max = 1i64 << center.lng_bits();

    let mut out = Vec::with_capacity(8);
    for dlat in [1i64, 0, -1] {
        for dlng in [-1i64, 0, 1] {
            if dlat == 0 && dlng == 0 {
                continue;
            }
            let lat = center.lat as i64 + dlat;
            if lat < 0 || lat >= lat_max {
                continue; // past a pole
            }
            let lng = (center.lng as i64 + dlng).rem_euclid(lng_max);
            out.push(encode(CellIndex {
                lat: lat as u64,
                lng: lng as u64,
                precision: center.precision,
            }));
        }
    }
    Ok(out)
}

/// The cell containing `point` plus its 8 neighbors: the covering used for
/// interest-region subscriptions. The center cell comes first.
pub fn covering_of(point: GeoPoint, precision: usize) -> Vec<String> {
    let center = cell_of(point, precision);
    let neighbors = neighbors_of(&center).expect("token produced by cell_of is well-formed");
    let mut cells = Vec::with_capacity(neighbors.len() + 1);
    cells.push(center);
    cells.extend(neighbors);
    cells
}

/// Decode a token to the center point of its cell.
pub fn cell_center(token: &str) -> Result<GeoPoint, GeoError> {
    let cell = decode(token)?;
    let lat_span = 180.0 / (1u64 << cell.lat_bits()) as f64;
    let lng_span = 360.0 / (1u64 << cell.lng_bits()) as f64;
    Ok(GeoPoint {
        lat: -90.0 + (cell.lat as f64 + 0.5) * lat_span,
        lng: -180.0 + (cell.lng as f64 + 0.5) * lng_span,
    })
}

fn wrap_lng(lng: f64) -> f64 {
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped.is_nan() { 0.0 } else { wrapped }
}

/// Quantize `value` in [min, min + span) onto a 2^bits grid.
fn quantize(value: f64, min: f64, span: f64, bits: u32) -> u64 {
    let cells = (1u64 << bits) as f64;
    let idx = ((value - min) / span * cells) as u64;
    idx.min((1u64 << bits) - 1)
}

fn encode(cell: CellIndex) -> String {
    let total_bits = cell.precision * 5;
    let mut lat_pos = cell.lat_bits();
    let mut lng_pos = cell.lng_bits();

    let mut out = String::with_capacity(cell.precision);
    let mut acc = 0u8;
    let mut nbits = 0;
    for i in 0..total_bits {
        // Even interleave positions carry longitude bits, odd carry latitude.
        let bit = if i % 2 == 0 {
            lng_pos -= 1;
            ((cell.lng >> lng_pos) & 1) as u8
        } else {
            lat_pos -= 1;
            ((cell.lat >> lat_pos) & 1) as u8
        };
        acc = (acc << 1) | bit;
        nbits += 1;
        if nbits == 5 {
            out.push(BASE32[acc as usize] as char);
            acc = 0;
            nbits = 0;
        }
    }
    out
}

fn decode(token: &str) -> Result<CellIndex, GeoError> {
    if token.is_empty() {
        return Err(GeoError::EmptyToken);
    }
    if token.len() > MAX_PRECISION {
        return Err(GeoError::TokenTooLong);
    }

    let mut lat = 0u64;
    let mut lng = 0u64;
    let mut i = 0usize;
    for ch in token.chars() {
        let value = BASE32
            .iter()
            .position(|&b| b as char == ch)
            .ok_or(GeoError::InvalidChar(ch))? as u64;
        for shift in (0..5).rev() {
            let bit = (value >> shift) & 1;
            if i % 2 == 0 {
                lng = (lng << 1) | bit;
            } else {
                lat = (lat << 1) | bit;
            }
            i += 1;
        }
    }
    Ok(CellIndex {
        lat,
        lng,
        precision: token.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    #[test]
    fn matches_known_geohashes() {
        assert_eq!(cell_of(point(57.64911, 10.40744), 6), "u4pruy");
        assert_eq!(cell_of(point(57.64911, 10.40744), 11), "u4pruydqqvj");
        assert_eq!(cell_of(point(42.605, -5.603), 5), "ezs42");
    }

    #[test]
    fn same_cell_points_share_a_token() {
        // A few meters apart, well inside one precision-6 cell.
        let a = cell_of(point(57.64911, 10.40744), 6);
        let b = cell_of(point(57.64915, 10.40749), 6);
        assert_eq!(a, b);
    }

    #[test]
    fn neighbors_are_eight_distinct_adjacent_cells() {
        let center = "u4pruy";
        let neighbors = neighbors_of(center).unwrap();
        assert_eq!(neighbors.len(), 8);

        let mut unique = neighbors.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 8);
        assert!(!neighbors.contains(&center.to_string()));

        // Adjacency is symmetric: the center is a neighbor of each neighbor.
        for n in &neighbors {
            assert!(neighbors_of(n).unwrap().contains(&center.to_string()));
        }
    }

    #[test]
    fn neighbor_centers_encode_back_to_their_cell() {
        for n in neighbors_of("ezs42").unwrap() {
            let c = cell_center(&n).unwrap();
            assert_eq!(cell_of(c, 5), n);
        }
    }

    #[test]
    fn longitude_wraps_at_the_antimeridian() {
        let east = cell_of(point(0.0, 179.999), 4);
        let west = cell_of(point(0.0, -179.999), 4);
        assert_ne!(east, west);
        assert!(neighbors_of(&east).unwrap().contains(&west));
    }

    #[test]
    fn polar_cells_have_fewer_neighbors() {
        let pole = cell_of(point(89.999, 0.0), 3);
        let neighbors = neighbors_of(&pole).unwrap();
        assert_eq!(neighbors.len(), 5); // no row above the top of the grid
    }

    #[test]
    fn invalid_tokens_are_rejected() {
        assert_eq!(neighbors_of(""), Err(GeoError::EmptyToken));
        assert_eq!(neighbors_of("u4pra"), Err(GeoError::InvalidChar('a')));
        assert_eq!(
            neighbors_of("0123456789012"),
            Err(GeoError::TokenTooLong)
        );
    }

    #[test]
    fn covering_is_center_plus_neighbors() {
        let p = point(57.64911, 10.40744);
        let covering = covering_of(p, 6);
        assert_eq!(covering.len(), 9);
        assert_eq!(covering[0], cell_of(p, 6));
        for token in &covering[1..] {
            assert!(neighbors_of(&covering[0]).unwrap().contains(token));
        }
    }

    #[test]
    fn cell_center_lands_inside_the_cell() {
        let token = cell_of(point(42.605, -5.603), 5);
        let center = cell_center(&token).unwrap();
        assert_eq!(cell_of(center, 5), token);
    }
}
