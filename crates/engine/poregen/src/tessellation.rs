//! Voronoi edge networks in 3-D
//!
//! The Voronoi diagram is obtained as the dual of a Delaunay
//! tetrahedralization built by incremental Bowyer-Watson insertion:
//! - Voronoi vertices are the circumcenters of the tetrahedra.
//! - Each Delaunay edge `(a, b)` bounds one Voronoi ridge (the facet between
//!   the cells of `a` and `b`), whose vertices are the circumcenters of the
//!   tetrahedra around that edge, in cyclic order.
//! - A ring of tetrahedra that does not close (edge on the convex hull) gives
//!   an unbounded ridge; it is prefixed with `None`, the vertex at infinity.

use std::collections::BTreeMap;

use glam::DVec3;
use rand::Rng;
use tracing::{debug, info};
use voxel::edt::distance_transform;
use voxel::{line_segment, Grid};

use crate::error::{check_shape, Error, Result};
use crate::progress::{Progress, Reporter, Silent};

/// Magnitude of the offset applied to mirrored seeds. Exact mirror images are
/// cospherical, which Delaunay insertion cannot resolve consistently.
pub const MIRROR_JITTER: f64 = 1e-3;

#[derive(Debug, Clone, Copy)]
struct Tetrahedron {
    vertices: [usize; 4],
    center: DVec3,
    radius_sq: f64,
}

impl Tetrahedron {
    fn new(vertices: [usize; 4], points: &[DVec3]) -> Self {
        let [a, b, c, d] = vertices.map(|i| points[i]);
        match circumsphere(a, b, c, d) {
            Some((center, radius_sq)) => Self {
                vertices,
                center,
                radius_sq,
            },
            // Flat tetrahedra are swallowed by the next insertion
            None => Self {
                vertices,
                center: (a + b + c + d) / 4.0,
                radius_sq: f64::INFINITY,
            },
        }
    }

    fn encloses(&self, p: DVec3) -> bool {
        self.center.distance_squared(p) < self.radius_sq
    }

    fn faces(&self) -> [[usize; 3]; 4] {
        let [a, b, c, d] = self.vertices;
        [[a, b, c], [a, b, d], [a, c, d], [b, c, d]].map(|mut f| {
            f.sort_unstable();
            f
        })
    }
}

/// Center and squared radius of the sphere through four points, `None` when
/// they are (nearly) coplanar.
fn circumsphere(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> Option<(DVec3, f64)> {
    let (u, v, w) = (b - a, c - a, d - a);
    let det = u.dot(v.cross(w));
    let scale = u.length() * v.length() * w.length();
    if !(det.abs() > 1e-12 * scale) {
        return None;
    }
    let offset = (v.cross(w) * u.length_squared()
        + w.cross(u) * v.length_squared()
        + u.cross(v) * w.length_squared())
        / (2.0 * det);
    Some((a + offset, offset.length_squared()))
}

/// Delaunay tetrahedralization of `points` by Bowyer-Watson insertion.
fn delaunay(points: &[DVec3], reporter: &mut Reporter) -> Vec<Tetrahedron> {
    let n = points.len();
    if n < 4 {
        return Vec::new();
    }

    let (lo, hi) = points.iter().fold(
        (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
        |(lo, hi), p| (lo.min(*p), hi.max(*p)),
    );
    let mid = (lo + hi) / 2.0;
    let span = (hi - lo).max_element().max(1.0);
    let m = 50.0 * span;

    // Regular tetrahedron comfortably enclosing every point
    let mut all = points.to_vec();
    all.push(mid + m * DVec3::new(1.0, 1.0, 1.0));
    all.push(mid + m * DVec3::new(1.0, -1.0, -1.0));
    all.push(mid + m * DVec3::new(-1.0, 1.0, -1.0));
    all.push(mid + m * DVec3::new(-1.0, -1.0, 1.0));

    let mut tets = vec![Tetrahedron::new([n, n + 1, n + 2, n + 3], &all)];
    let mut faces: Vec<[usize; 3]> = Vec::new();
    for (i, &p) in points.iter().enumerate() {
        let (cavity, kept): (Vec<Tetrahedron>, Vec<Tetrahedron>) =
            tets.into_iter().partition(|t| t.encloses(p));
        tets = kept;
        if cavity.is_empty() {
            // Duplicate point
            continue;
        }

        // Faces used by exactly one cavity tetrahedron bound the cavity
        faces.clear();
        faces.extend(cavity.iter().flat_map(|t| t.faces()));
        faces.sort_unstable();
        let mut k = 0;
        while k < faces.len() {
            let mut run = 1;
            while k + run < faces.len() && faces[k + run] == faces[k] {
                run += 1;
            }
            if run == 1 {
                let [a, b, c] = faces[k];
                tets.push(Tetrahedron::new([a, b, c, i], &all));
            }
            k += run;
        }
        reporter.update(i as u64 + 1, None);
    }

    tets.retain(|t| t.vertices.iter().all(|&v| v < n));
    tets
}

/// A facet shared by the Voronoi cells of two seeds.
#[derive(Debug, Clone, PartialEq)]
pub struct Ridge {
    /// The two seeds whose cells meet here
    pub points: [usize; 2],
    /// Vertex indices in cyclic order; `None` is the vertex at infinity
    pub vertices: Vec<Option<usize>>,
}

/// Delaunay tetrahedralization of a seed set and its Voronoi dual.
#[derive(Debug, Clone)]
pub struct Tessellation {
    pub points: Vec<DVec3>,
    pub tetrahedra: Vec<[usize; 4]>,
    /// Voronoi vertices; vertex `i` is the circumcenter of tetrahedron `i`
    pub vertices: Vec<DVec3>,
    pub ridges: Vec<Ridge>,
}

impl Tessellation {
    pub fn new(points: &[DVec3]) -> Self {
        let mut silent = Silent;
        let mut reporter = Reporter::new(&mut silent, "tessellation", points.len() as u64);
        Self::build(points, &mut reporter)
    }

    fn build(points: &[DVec3], reporter: &mut Reporter) -> Self {
        let tets = delaunay(points, reporter);
        let vertices = tets.iter().map(|t| t.center).collect();
        let tetrahedra: Vec<[usize; 4]> = tets.iter().map(|t| t.vertices).collect();
        let ridges = ridges_around_edges(&tetrahedra);
        Self {
            points: points.to_vec(),
            tetrahedra,
            vertices,
            ridges,
        }
    }

    /// Unique undirected Voronoi edges as sorted vertex pairs.
    ///
    /// Every ridge is walked as a closed cycle; pairs touching the vertex at
    /// infinity are dropped.
    pub fn edges(&self) -> Vec<[usize; 2]> {
        let mut edges = Vec::new();
        for ridge in &self.ridges {
            let cycle = &ridge.vertices;
            for (k, &from) in cycle.iter().enumerate() {
                let to = cycle[(k + 1) % cycle.len()];
                if let (Some(a), Some(b)) = (from, to) {
                    if a != b {
                        edges.push([a.min(b), a.max(b)]);
                    }
                }
            }
        }
        edges.sort_unstable();
        edges.dedup();
        edges
    }
}

/// Order the tetrahedra around every Delaunay edge into a ridge.
fn ridges_around_edges(tetrahedra: &[[usize; 4]]) -> Vec<Ridge> {
    let mut around: BTreeMap<[usize; 2], Vec<usize>> = BTreeMap::new();
    for (t, tet) in tetrahedra.iter().enumerate() {
        for i in 0..4 {
            for j in i + 1..4 {
                let (a, b) = (tet[i], tet[j]);
                around.entry([a.min(b), a.max(b)]).or_default().push(t);
            }
        }
    }

    let mut ridges = Vec::with_capacity(around.len());
    for (edge, ring) in around {
        // The two vertices of each tetrahedron off the edge; neighbors in the
        // ring share one of them
        let opposite: Vec<[usize; 2]> = ring
            .iter()
            .map(|&t| {
                let mut other = [usize::MAX; 2];
                let mut k = 0;
                for &v in &tetrahedra[t] {
                    if v != edge[0] && v != edge[1] && k < 2 {
                        other[k] = v;
                        k += 1;
                    }
                }
                other
            })
            .collect();
        let mut by_vertex: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (slot, pair) in opposite.iter().enumerate() {
            for &v in pair {
                by_vertex.entry(v).or_default().push(slot);
            }
        }

        // An open ring starts at a hull face, seen by a single tetrahedron
        let open_end = by_vertex.iter().find(|(_, slots)| slots.len() == 1);
        let (start, mut entry) = match open_end {
            Some((&v, slots)) => (slots[0], v),
            None => (0, opposite[0][0]),
        };

        let mut vertices = Vec::with_capacity(ring.len() + 1);
        if open_end.is_some() {
            vertices.push(None);
        }
        let mut slot = start;
        for _ in 0..ring.len() {
            vertices.push(Some(ring[slot]));
            let exit = if opposite[slot][0] == entry {
                opposite[slot][1]
            } else {
                opposite[slot][0]
            };
            let next = by_vertex
                .get(&exit)
                .and_then(|slots| slots.iter().copied().find(|&s| s != slot));
            match next {
                Some(s) if s != start => {
                    slot = s;
                    entry = exit;
                }
                _ => break,
            }
        }
        ridges.push(Ridge {
            points: edge,
            vertices,
        });
    }
    ridges
}

/// Voronoi edge image and the tessellation it was drawn from.
#[derive(Debug, Clone)]
pub struct VoronoiEdges {
    /// Pore space (`true`): voxels farther than the radius from every edge
    pub image: Grid<bool>,
    pub tessellation: Tessellation,
    /// Number of edges with both ends inside the grid
    pub drawn: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiParams {
    /// Edge thickening radius
    pub radius: f64,
    pub ncells: usize,
    /// Mirror seeds across all faces so that cells end flat on the boundary
    pub flat_faces: bool,
}

/// Seeds uniform in the box, plus jittered mirror copies across each face.
fn seed_points<R: Rng + ?Sized>(
    shape: &[usize],
    ncells: usize,
    flat_faces: bool,
    rng: &mut R,
) -> Vec<DVec3> {
    let dims = DVec3::new(shape[0] as f64, shape[1] as f64, shape[2] as f64);
    let base: Vec<DVec3> = (0..ncells)
        .map(|_| DVec3::new(rng.random(), rng.random(), rng.random()) * dims)
        .collect();
    if !flat_faces {
        return base;
    }

    let mut points = base.clone();
    for far in [true, false] {
        for axis in 0..3 {
            for p in &base {
                let mut q = *p;
                q[axis] = if far { 2.0 * dims[axis] - q[axis] } else { -q[axis] };
                let jitter = DVec3::new(
                    rng.random_range(-MIRROR_JITTER..MIRROR_JITTER),
                    rng.random_range(-MIRROR_JITTER..MIRROR_JITTER),
                    rng.random_range(-MIRROR_JITTER..MIRROR_JITTER),
                );
                points.push(q + jitter);
            }
        }
    }
    points
}

/// Snap a Voronoi vertex onto the grid: round, shrink by `(n - 1) / n` so the
/// far faces land on the last voxel, truncate.
fn grid_vertex(v: DVec3, shape: &[usize]) -> [isize; 3] {
    std::array::from_fn(|axis| {
        let n = shape[axis] as f64;
        (v[axis].round_ties_even() * (n - 1.0) / n) as isize
    })
}

pub fn voronoi_edges<R: Rng + ?Sized>(
    shape: &[usize],
    params: &VoronoiParams,
    rng: &mut R,
) -> Result<VoronoiEdges> {
    voronoi_edges_with_progress(shape, params, rng, &mut Silent)
}

pub fn voronoi_edges_with_progress<R: Rng + ?Sized>(
    shape: &[usize],
    params: &VoronoiParams,
    rng: &mut R,
    progress: &mut dyn Progress,
) -> Result<VoronoiEdges> {
    check_shape(shape, &[3])?;
    if !(params.radius.is_finite() && params.radius >= 0.0) {
        return Err(Error::invalid(format!(
            "edge radius must be non-negative, got {}",
            params.radius
        )));
    }
    if params.ncells == 0 {
        return Err(Error::invalid("ncells must be at least 1"));
    }

    let points = seed_points(shape, params.ncells, params.flat_faces, rng);
    let mut reporter = Reporter::new(progress, "voronoi_edges", points.len() as u64);
    let tessellation = Tessellation::build(&points, &mut reporter);
    reporter.finish(points.len() as u64, None);
    let edges = tessellation.edges();
    debug!(
        "voronoi_edges: {} seeds, {} tetrahedra, {} edges",
        points.len(),
        tessellation.tetrahedra.len(),
        edges.len()
    );

    let snapped: Vec<[isize; 3]> = tessellation
        .vertices
        .iter()
        .map(|&v| grid_vertex(v, shape))
        .collect();
    let inside = |p: &[isize; 3]| p.iter().zip(shape).all(|(&c, &n)| c >= 0 && (c as usize) < n);

    let mut network = Grid::new(shape, false);
    let mut drawn = 0;
    for [a, b] in &edges {
        let (pa, pb) = (snapped[*a], snapped[*b]);
        if !(inside(&pa) && inside(&pb)) {
            continue;
        }
        for point in line_segment(pa.map(|c| c as f64), pb.map(|c| c as f64)) {
            if inside(&point) {
                network[point.map(|c| c as usize)] = true;
            }
        }
        drawn += 1;
    }

    let image = distance_transform(&!&network).map(|&d| d > params.radius);
    info!(
        "voronoi_edges: {} cells, {} edges drawn, porosity {:.4}",
        params.ncells,
        drawn,
        image.fraction_true()
    );
    Ok(VoronoiEdges {
        image,
        tessellation,
        drawn,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn random_points(n: usize, seed: u64) -> Vec<DVec3> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| DVec3::new(rng.random(), rng.random(), rng.random()) * 10.0)
            .collect()
    }

    #[test]
    fn test_circumsphere_of_corner_tetrahedron() {
        let (center, r2) = circumsphere(DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z).unwrap();
        assert!(center.distance(DVec3::splat(0.5)) < 1e-12);
        assert!((r2 - 0.75).abs() < 1e-12);
        assert!(circumsphere(DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::new(1.0, 1.0, 0.0)).is_none());
    }

    #[test]
    fn test_single_tetrahedron() {
        let points = [DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z];
        let tess = Tessellation::new(&points);
        assert_eq!(tess.tetrahedra.len(), 1);
        // Every edge is on the hull, so every ridge is open
        assert_eq!(tess.ridges.len(), 6);
        assert!(tess.ridges.iter().all(|r| r.vertices == vec![None, Some(0)]));
        assert!(tess.edges().is_empty());
    }

    #[test]
    fn test_empty_circumspheres() {
        let points = random_points(40, 8);
        let tess = Tessellation::new(&points);
        assert!(!tess.tetrahedra.is_empty());
        for (tet, center) in tess.tetrahedra.iter().zip(&tess.vertices) {
            let r2 = center.distance_squared(points[tet[0]]);
            for (i, p) in points.iter().enumerate() {
                if !tet.contains(&i) {
                    assert!(center.distance_squared(*p) >= r2 * (1.0 - 1e-9));
                }
            }
        }
    }

    #[test]
    fn test_edges_unique_and_sorted() {
        let tess = Tessellation::new(&random_points(30, 2));
        let edges = tess.edges();
        assert!(!edges.is_empty());
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
        assert!(edges
            .iter()
            .all(|&[a, b]| a < b && b < tess.vertices.len()));
    }

    #[test]
    fn test_interior_ridges_are_closed() {
        let tess = Tessellation::new(&random_points(60, 5));
        let closed = tess
            .ridges
            .iter()
            .filter(|r| r.vertices.iter().all(Option::is_some))
            .count();
        assert!(closed > 0);
        for ridge in &tess.ridges {
            let none = ridge.vertices.iter().filter(|v| v.is_none()).count();
            assert!(none <= 1);
            assert!(ridge.vertices.len() >= 2);
        }
    }

    #[test]
    fn test_grid_vertex_snapping() {
        let shape = [10, 10, 10];
        assert_eq!(grid_vertex(DVec3::new(10.0, 0.2, -0.4), &shape), [9, 0, 0]);
        assert_eq!(grid_vertex(DVec3::new(-3.0, 5.5, 4.5), &shape), [-2, 5, 3]);
    }

    #[test]
    fn test_rejects_2d() {
        let mut rng = StdRng::seed_from_u64(0);
        let params = VoronoiParams {
            radius: 1.0,
            ncells: 5,
            flat_faces: true,
        };
        assert!(voronoi_edges(&[20, 20], &params, &mut rng).is_err());
    }
}
