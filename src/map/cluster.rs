use std::collections::HashMap;
use std::f64::consts::PI;

use serde::Serialize;

pub const CLUSTER_RADIUS_PX: f64 = 80.0;
pub const MAX_ZOOM: u8 = 22;

const TILE_SIZE: f64 = 256.0;
const MAX_LATITUDE: f64 = 85.051_128_78;

/// One map marker group. A cluster of one is drawn as the plain marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// `[lat, lon]` centroid of the members.
    pub center: [f64; 2],
    pub count: usize,
    /// Indices into the marker list handed to `cluster_positions`.
    pub members: Vec<usize>,
}

/// Web-Mercator pixel coordinates at `zoom`.
pub fn project(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let scale = TILE_SIZE * f64::from(1u32 << zoom.min(MAX_ZOOM));
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin_lat = lat.to_radians().sin();

    let x = (lon + 180.0) / 360.0 * scale;
    let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * scale;
    (x, y)
}

/// Groups `[lat, lon]` positions into square pixel cells of `radius_px` at
/// `zoom`. Clusters come out in order of their first member.
pub fn cluster_positions(positions: &[[f64; 2]], zoom: u8, radius_px: f64) -> Vec<Cluster> {
    let radius_px = if radius_px > 0.0 { radius_px } else { CLUSTER_RADIUS_PX };
    let mut cells: HashMap<(i64, i64), usize> = HashMap::new();
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut sums: Vec<(f64, f64)> = Vec::new();

    for (index, [lat, lon]) in positions.iter().copied().enumerate() {
        let (x, y) = project(lat, lon, zoom);
        let key = ((x / radius_px).floor() as i64, (y / radius_px).floor() as i64);

        let slot = *cells.entry(key).or_insert_with(|| {
            clusters.push(Cluster {
                center: [lat, lon],
                count: 0,
                members: Vec::new(),
            });
            sums.push((0.0, 0.0));
            clusters.len() - 1
        });

        let cluster = &mut clusters[slot];
        cluster.count += 1;
        cluster.members.push(index);
        sums[slot].0 += lat;
        sums[slot].1 += lon;
    }

    for (cluster, (lat_sum, lon_sum)) in clusters.iter_mut().zip(sums) {
        let n = cluster.count as f64;
        cluster.center = [lat_sum / n, lon_sum / n];
    }

    clusters
}
