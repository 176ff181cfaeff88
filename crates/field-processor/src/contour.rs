//! Filled contour (isoband) extraction.
//!
//! Each grid cell is split into two triangles along its south-west to
//! north-east diagonal. Within a triangle the field is linear, so the part
//! lying in `[lower, upper]` is a convex polygon found by walking the
//! triangle's edges and cutting them where they cross either threshold.
//!
//! The per-triangle pieces of one interval are merged by edge cancellation:
//! an edge shared by two pieces appears once in each direction and is
//! removed, leaving only the outline of the band. The remaining directed
//! edges are chained into rings. Counter-clockwise rings are exteriors,
//! clockwise rings are holes.
//!
//! Crossing points are computed from the lower-indexed node of each grid
//! edge, so neighbouring triangles produce bit-identical vertices and their
//! shared edges cancel exactly.

use std::collections::{BTreeMap, BTreeSet};

use geo::{Coord, LineString, Polygon};
use map_common::ScalarField;
use rayon::prelude::*;
use tracing::debug;

/// A closed polygonal region where the field lies in one level interval.
#[derive(Debug, Clone)]
pub struct ContourRegion {
    /// Index `i` of the interval `(levels[i], levels[i + 1]]`
    pub interval_index: usize,
    pub lower: f64,
    pub upper: f64,
    pub polygon: Polygon<f64>,
}

/// Bit pattern of a vertex, used to match vertices exactly.
type VertexKey = (u64, u64);

fn key(c: Coord<f64>) -> VertexKey {
    (c.x.to_bits(), c.y.to_bits())
}

fn coord(k: VertexKey) -> Coord<f64> {
    Coord {
        x: f64::from_bits(k.0),
        y: f64::from_bits(k.1),
    }
}

/// A triangle corner: flat node index, position and value.
#[derive(Debug, Clone, Copy)]
struct Corner {
    node: usize,
    pos: Coord<f64>,
    value: f64,
}

/// One threshold interval being traced.
#[derive(Debug, Clone, Copy)]
struct Band {
    lower: f64,
    upper: f64,
    /// The bottom interval also admits its lower bound.
    closed_bottom: bool,
}

impl Band {
    /// Intervals are `(lower, upper]`, so a value exactly on a threshold
    /// belongs to the interval below it.
    fn admits_flat(&self, v: f64) -> bool {
        v <= self.upper && (v > self.lower || (self.closed_bottom && v == self.lower))
    }
}

/// Extract the filled-contour regions for consecutive `levels`.
///
/// Regions come back in ascending interval order. Undefined nodes make the
/// triangles touching them contribute nothing.
pub fn extract_regions(field: &ScalarField, levels: &[f64]) -> Vec<ContourRegion> {
    if levels.len() < 2 {
        return Vec::new();
    }
    let grid = field.grid();
    if grid.nx < 2 || grid.ny < 2 {
        return Vec::new();
    }

    let triangles = triangulate(field);
    let intervals = levels.len() - 1;

    let regions: Vec<ContourRegion> = (0..intervals)
        .into_par_iter()
        .flat_map_iter(|idx| {
            let band = Band {
                lower: levels[idx],
                upper: levels[idx + 1],
                closed_bottom: idx == 0,
            };
            trace_band(&triangles, band)
                .into_iter()
                .map(move |polygon| ContourRegion {
                    interval_index: idx,
                    lower: band.lower,
                    upper: band.upper,
                    polygon,
                })
        })
        .collect();

    debug!(
        intervals,
        triangles = triangles.len(),
        regions = regions.len(),
        "Extracted contour regions"
    );
    regions
}

/// Counter-clockwise triangles covering every fully defined grid cell.
fn triangulate(field: &ScalarField) -> Vec<[Corner; 3]> {
    let grid = field.grid();
    let values = field.values();
    let corner = |i: usize, j: usize| {
        let node = grid.flat_index(i, j);
        Corner {
            node,
            pos: Coord {
                x: grid.lon(i),
                y: grid.lat(j),
            },
            value: values[node],
        }
    };

    let mut triangles = Vec::with_capacity((grid.nx - 1) * (grid.ny - 1) * 2);
    for j in 0..(grid.ny - 1) {
        for i in 0..(grid.nx - 1) {
            let sw = corner(i, j);
            let se = corner(i + 1, j);
            let ne = corner(i + 1, j + 1);
            let nw = corner(i, j + 1);
            for tri in [[sw, se, ne], [sw, ne, nw]] {
                if tri.iter().all(|c| !c.value.is_nan()) {
                    triangles.push(tri);
                }
            }
        }
    }
    triangles
}

/// Point where the edge between `a` and `b` reaches `level`.
fn crossing(a: &Corner, b: &Corner, level: f64) -> Coord<f64> {
    let (p, q) = if a.node < b.node { (a, b) } else { (b, a) };
    let t = (level - p.value) / (q.value - p.value);
    Coord {
        x: p.pos.x + t * (q.pos.x - p.pos.x),
        y: p.pos.y + t * (q.pos.y - p.pos.y),
    }
}

fn crosses(a: f64, b: f64, level: f64) -> bool {
    (a - level) * (b - level) < 0.0
}

/// The part of a triangle lying inside the band, as a vertex loop.
fn clip_triangle(tri: &[Corner; 3], band: Band) -> Vec<Coord<f64>> {
    let (v0, v1, v2) = (tri[0].value, tri[1].value, tri[2].value);
    if v0 == v1 && v1 == v2 {
        return if band.admits_flat(v0) {
            tri.iter().map(|c| c.pos).collect()
        } else {
            Vec::new()
        };
    }

    let lo = v0.min(v1).min(v2);
    let hi = v0.max(v1).max(v2);
    if hi < band.lower || lo > band.upper {
        return Vec::new();
    }

    let mut ring = Vec::with_capacity(7);
    for k in 0..3 {
        let a = &tri[k];
        let b = &tri[(k + 1) % 3];
        if a.value >= band.lower && a.value <= band.upper {
            ring.push(a.pos);
        }

        let mut cuts: Vec<(f64, Coord<f64>)> = Vec::with_capacity(2);
        for level in [band.lower, band.upper] {
            if crosses(a.value, b.value, level) {
                let t = (level - a.value) / (b.value - a.value);
                cuts.push((t, crossing(a, b, level)));
            }
        }
        cuts.sort_by(|x, y| x.0.total_cmp(&y.0));
        ring.extend(cuts.into_iter().map(|(_, c)| c));
    }
    ring
}

/// Merge the band's per-triangle pieces into polygons with holes.
fn trace_band(triangles: &[[Corner; 3]], band: Band) -> Vec<Polygon<f64>> {
    let mut edges: BTreeSet<(VertexKey, VertexKey)> = BTreeSet::new();

    for tri in triangles {
        let piece = clip_triangle(tri, band);
        if piece.len() < 3 || signed_area(&piece) <= 0.0 {
            continue;
        }
        for k in 0..piece.len() {
            let a = key(piece[k]);
            let b = key(piece[(k + 1) % piece.len()]);
            if a == b {
                continue;
            }
            if !edges.remove(&(b, a)) {
                edges.insert((a, b));
            }
        }
    }

    let rings = chain_rings(&edges);
    assemble_polygons(rings)
}

/// Follow directed edges into closed rings.
fn chain_rings(edges: &BTreeSet<(VertexKey, VertexKey)>) -> Vec<Vec<Coord<f64>>> {
    let mut outgoing: BTreeMap<VertexKey, Vec<VertexKey>> = BTreeMap::new();
    for &(a, b) in edges.iter().rev() {
        outgoing.entry(a).or_default().push(b);
    }

    let mut rings = Vec::new();
    while let Some(start) = outgoing
        .iter()
        .find(|(_, targets)| !targets.is_empty())
        .map(|(k, _)| *k)
    {
        let mut ring = vec![coord(start)];
        let mut current = start;
        let mut closed = false;
        while let Some(next) = outgoing.get_mut(&current).and_then(|t| t.pop()) {
            ring.push(coord(next));
            if next == start {
                closed = true;
                break;
            }
            current = next;
        }
        if closed {
            rings.push(ring);
        } else {
            debug!(vertices = ring.len(), "Discarded open contour chain");
        }
    }
    rings
}

/// Pair clockwise holes with the smallest counter-clockwise ring around them.
fn assemble_polygons(rings: Vec<Vec<Coord<f64>>>) -> Vec<Polygon<f64>> {
    let mut exteriors: Vec<(f64, Vec<Coord<f64>>, Vec<LineString<f64>>)> = Vec::new();
    let mut holes: Vec<Vec<Coord<f64>>> = Vec::new();

    for ring in rings {
        if distinct_vertices(&ring) < 3 {
            continue;
        }
        let area = signed_area(&ring);
        if area > 0.0 {
            exteriors.push((area, ring, Vec::new()));
        } else if area < 0.0 {
            holes.push(ring);
        }
    }

    for hole in holes {
        let probe = Coord {
            x: (hole[0].x + hole[1].x) / 2.0,
            y: (hole[0].y + hole[1].y) / 2.0,
        };
        let owner = exteriors
            .iter_mut()
            .filter(|(_, ring, _)| ring_contains(ring, probe))
            .min_by(|a, b| a.0.total_cmp(&b.0));
        match owner {
            Some((_, _, interiors)) => interiors.push(LineString::new(close_ring(hole))),
            None => debug!(vertices = hole.len(), "Discarded contour hole without exterior"),
        }
    }

    exteriors
        .into_iter()
        .map(|(_, ring, interiors)| Polygon::new(LineString::new(close_ring(ring)), interiors))
        .collect()
}

/// Repeat the first vertex at the end if it is not already there.
pub fn close_ring(mut ring: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    ring
}

/// Shoelace area, positive for counter-clockwise loops. The loop may or may
/// not repeat its first vertex.
pub fn signed_area(ring: &[Coord<f64>]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for k in 0..n {
        let a = ring[k];
        let b = ring[(k + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

fn distinct_vertices(ring: &[Coord<f64>]) -> usize {
    ring.iter().map(|c| key(*c)).collect::<BTreeSet<_>>().len()
}

/// Even-odd point-in-ring test.
fn ring_contains(ring: &[Coord<f64>], p: Coord<f64>) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}
