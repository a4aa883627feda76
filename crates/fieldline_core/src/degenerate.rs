//! Degenerate-set extraction on grid nodes.
//!
//! The input is one value per node (typically the eigenvalue gap `|value1 - value2|`).
//! Nodes whose value is numerically zero are grouped by 8-adjacency, and each group is
//! classified as an isolated point, an open curve or a closed region whose border is traced.
//!
//! The border walk is a heuristic driven by how many zero neighbours each node has; it
//! handles single points, curves and simple regions but not composite shapes such as a
//! region with protruding branches.

use crate::error::{FieldError, Result};
use crate::geom::Point2;
use crate::grid::Grid;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Relative factor applied to the mean magnitude to obtain the zero tolerance.
const ZERO_TOLERANCE_FACTOR: f64 = 1e-5;

/// Nodes with at least this many zero neighbours are interior and never on a border.
const INTERIOR_ADJ_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingularityCategory {
    Point,
    Curve,
    Region,
}

/// Common accessors of every extracted shape.
pub trait Shape {
    fn category(&self) -> SingularityCategory;
    /// Every zero node of the group, ascending.
    fn nodes(&self) -> &[usize];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRegion {
    pub node: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRegion {
    pub nodes: Vec<usize>,
    /// The nodes in walking order from one end to the other.
    pub trace: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRegion {
    pub nodes: Vec<usize>,
    /// Closed border in walking order; the last node is adjacent to the first.
    pub border: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Singularity {
    Point(PointRegion),
    Curve(CurveRegion),
    Region(RegionRegion),
}

impl Shape for PointRegion {
    fn category(&self) -> SingularityCategory {
        SingularityCategory::Point
    }

    fn nodes(&self) -> &[usize] {
        std::slice::from_ref(&self.node)
    }
}

impl Shape for CurveRegion {
    fn category(&self) -> SingularityCategory {
        SingularityCategory::Curve
    }

    fn nodes(&self) -> &[usize] {
        &self.nodes
    }
}

impl Shape for RegionRegion {
    fn category(&self) -> SingularityCategory {
        SingularityCategory::Region
    }

    fn nodes(&self) -> &[usize] {
        &self.nodes
    }
}

impl Shape for Singularity {
    fn category(&self) -> SingularityCategory {
        match self {
            Singularity::Point(p) => p.category(),
            Singularity::Curve(c) => c.category(),
            Singularity::Region(r) => r.category(),
        }
    }

    fn nodes(&self) -> &[usize] {
        match self {
            Singularity::Point(p) => p.nodes(),
            Singularity::Curve(c) => c.nodes(),
            Singularity::Region(r) => r.nodes(),
        }
    }
}

impl Singularity {
    /// Ordered node path: the point itself, the curve trace or the region border.
    pub fn path(&self) -> &[usize] {
        match self {
            Singularity::Point(p) => p.nodes(),
            Singularity::Curve(c) => &c.trace,
            Singularity::Region(r) => &r.border,
        }
    }

    /// Coordinates of [`Singularity::path`].
    pub fn path_points(&self, grid: &Grid) -> Result<Vec<Point2>> {
        self.path()
            .iter()
            .map(|&ni| grid.node(ni).map(|n| n.point()))
            .collect()
    }
}

impl RegionRegion {
    /// Whether `(x, y)` lies inside the polygon spanned by the border nodes (ray casting).
    pub fn contains(&self, grid: &Grid, x: f64, y: f64) -> Result<bool> {
        let polygon = self
            .border
            .iter()
            .map(|&ni| grid.node(ni))
            .collect::<Result<Vec<_>>>()?;
        if polygon.len() < 3 {
            return Ok(false);
        }
        let mut inside = false;
        let mut j = polygon.len() - 1;
        for i in 0..polygon.len() {
            let (a, b) = (polygon[i], polygon[j]);
            if (a.y > y) != (b.y > y) {
                let cross_x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
                if x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        Ok(inside)
    }
}

/// Values at or below this magnitude count as zero: the mean magnitude times `1e-5`.
pub fn zero_tolerance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64;
    mean * ZERO_TOLERANCE_FACTOR
}

/// Connected groups (8-adjacency) of zero-valued nodes, each sorted ascending, in the
/// order of their smallest node.
pub fn zero_node_groups(grid: &Grid, values: &[f64]) -> Result<Vec<Vec<usize>>> {
    if values.len() != grid.node_count() {
        return Err(FieldError::InvalidArgument(format!(
            "expected {} node values, got {}",
            grid.node_count(),
            values.len()
        )));
    }
    let tol = zero_tolerance(values);
    let is_zero = |ni: usize| values[ni].abs() <= tol;

    let mut visited = vec![false; values.len()];
    let mut groups = Vec::new();
    let mut stack = Vec::new();
    for start in 0..values.len() {
        if visited[start] || !is_zero(start) {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        let mut group = Vec::new();
        while let Some(ni) = stack.pop() {
            group.push(ni);
            for adj in grid.adj_node_indices(ni)? {
                if !visited[adj] && is_zero(adj) {
                    visited[adj] = true;
                    stack.push(adj);
                }
            }
        }
        group.sort_unstable();
        groups.push(group);
    }
    Ok(groups)
}

/// Classifies one connected group of zero nodes, given in any order.
pub fn classify_zero_nodes(grid: &Grid, nodes: &[usize]) -> Result<Singularity> {
    let mut sorted = nodes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let nodes = sorted.as_slice();
    match nodes {
        [] => return Err(FieldError::EmptyInput),
        [node] => return Ok(Singularity::Point(PointRegion { node: *node })),
        [_, _] => {
            return Ok(Singularity::Curve(CurveRegion {
                nodes: nodes.to_vec(),
                trace: nodes.to_vec(),
            }))
        }
        _ => {}
    }

    let position: HashMap<usize, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let mut adjacent: Vec<Vec<usize>> = Vec::with_capacity(nodes.len());
    for &ni in nodes {
        let near = grid
            .adj_node_indices(ni)?
            .into_iter()
            .filter_map(|adj| position.get(&adj).copied())
            .collect::<Vec<_>>();
        adjacent.push(near);
    }
    let adj_count: Vec<usize> = adjacent.iter().map(Vec::len).collect();

    let mut visited: Vec<bool> = adj_count.iter().map(|&c| c >= INTERIOR_ADJ_COUNT).collect();
    let mut seed: Option<usize> = None;
    for (i, &count) in adj_count.iter().enumerate() {
        if count >= INTERIOR_ADJ_COUNT {
            continue;
        }
        if seed.map_or(true, |s| count > adj_count[s]) {
            seed = Some(i);
        }
    }
    let seed = seed.ok_or_else(|| {
        FieldError::InvalidArgument("zero-node group has no border node".to_string())
    })?;
    visited[seed] = true;

    let forward = walk(seed, &adjacent, &adj_count, &mut visited);
    let backward = walk(seed, &adjacent, &adj_count, &mut visited);

    let mut path: Vec<usize> = backward.iter().rev().map(|&i| nodes[i]).collect();
    path.push(nodes[seed]);
    path.extend(forward.iter().map(|&i| nodes[i]));

    let first = path[0];
    let last = path[path.len() - 1];
    if grid.is_adj_nodes(first, last)? {
        Ok(Singularity::Region(RegionRegion {
            nodes: nodes.to_vec(),
            border: path,
        }))
    } else {
        Ok(Singularity::Curve(CurveRegion {
            nodes: nodes.to_vec(),
            trace: path,
        }))
    }
}

/// Follows unvisited neighbours from `start`, always stepping to the one with the fewest
/// zero neighbours. Returns group positions in walking order, excluding `start`.
fn walk(
    start: usize,
    adjacent: &[Vec<usize>],
    adj_count: &[usize],
    visited: &mut [bool],
) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = start;
    loop {
        let mut next: Option<usize> = None;
        for &candidate in &adjacent[current] {
            if visited[candidate] {
                continue;
            }
            // Ties go to the smaller node, which is also the smaller position.
            let better = match next {
                None => true,
                Some(n) => {
                    adj_count[candidate] < adj_count[n]
                        || (adj_count[candidate] == adj_count[n] && candidate < n)
                }
            };
            if better {
                next = Some(candidate);
            }
        }
        match next {
            Some(n) => {
                visited[n] = true;
                path.push(n);
                current = n;
            }
            None => return path,
        }
    }
}

/// Groups the zero nodes of `values` and classifies every group.
pub fn extract_singularities(grid: &Grid, values: &[f64]) -> Result<Vec<Singularity>> {
    let groups = zero_node_groups(grid, values)?;
    let singularities = groups
        .iter()
        .map(|group| classify_zero_nodes(grid, group))
        .collect::<Result<Vec<_>>>()?;
    debug!(
        "extracted {} singularities from {} nodes",
        singularities.len(),
        values.len()
    );
    Ok(singularities)
}

#[cfg(test)]
mod tests {
    use super::{
        classify_zero_nodes, extract_singularities, zero_node_groups, zero_tolerance, Shape,
        Singularity, SingularityCategory,
    };
    use crate::error::FieldError;
    use crate::geom::Rect;
    use crate::grid::Grid;

    /// 5x5 nodes over [0, 4]^2, so node `(i, j)` sits at `(i, j)`.
    fn grid_5x5() -> Grid {
        let rect = Rect::new(0.0, 0.0, 4.0, 4.0).expect("valid rect");
        Grid::new(rect, 4, 4).expect("valid grid")
    }

    fn values_with_zeros(grid: &Grid, zeros: &[usize]) -> Vec<f64> {
        let mut values = vec![1.0; grid.node_count()];
        for &z in zeros {
            values[z] = 0.0;
        }
        values
    }

    const RING: [usize; 8] = [6, 7, 8, 11, 13, 16, 17, 18];

    #[test]
    fn tolerance_scales_with_mean_magnitude() {
        assert_eq!(zero_tolerance(&[]), 0.0);
        assert!((zero_tolerance(&[2.0, -4.0]) - 3e-5).abs() < 1e-15);
    }

    #[test]
    fn groups_are_connected_and_sorted() {
        let grid = grid_5x5();
        let values = values_with_zeros(&grid, &[24, 0, 6, 18]);
        let groups = zero_node_groups(&grid, &values).expect("matching length");
        assert_eq!(groups, vec![vec![0, 6], vec![18, 24]]);
    }

    #[test]
    fn groups_reject_wrong_length() {
        let grid = grid_5x5();
        assert!(matches!(
            zero_node_groups(&grid, &[0.0; 3]),
            Err(FieldError::InvalidArgument(_))
        ));
    }

    #[test]
    fn all_zero_values_form_one_group() {
        let grid = grid_5x5();
        let groups = zero_node_groups(&grid, &[0.0; 25]).expect("matching length");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 25);
    }

    #[test]
    fn single_zero_is_a_point() {
        let grid = grid_5x5();
        let found = extract_singularities(&grid, &values_with_zeros(&grid, &[12])).expect("valid");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category(), SingularityCategory::Point);
        assert_eq!(found[0].nodes(), &[12]);
    }

    #[test]
    fn empty_group_is_rejected() {
        let grid = grid_5x5();
        assert_eq!(classify_zero_nodes(&grid, &[]), Err(FieldError::EmptyInput));
    }

    #[test]
    fn two_nodes_form_a_curve() {
        let grid = grid_5x5();
        let shape = classify_zero_nodes(&grid, &[0, 6]).expect("valid");
        assert_eq!(shape.category(), SingularityCategory::Curve);
        assert_eq!(shape.path(), &[0, 6]);
    }

    #[test]
    fn straight_line_is_a_curve() {
        let grid = grid_5x5();
        let shape = classify_zero_nodes(&grid, &[0, 1, 2]).expect("valid");
        match shape {
            Singularity::Curve(curve) => {
                assert_eq!(curve.nodes, vec![0, 1, 2]);
                assert_eq!(curve.trace, vec![2, 1, 0]);
            }
            other => panic!("expected a curve, got {other:?}"),
        }
    }

    #[test]
    fn annulus_border_visits_every_ring_node_once() {
        let grid = grid_5x5();
        let shape = classify_zero_nodes(&grid, &RING).expect("valid");
        let region = match shape {
            Singularity::Region(region) => region,
            other => panic!("expected a region, got {other:?}"),
        };
        assert_eq!(region.border.len(), RING.len());
        let mut sorted = region.border.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, RING.to_vec());

        let first = region.border[0];
        let last = region.border[region.border.len() - 1];
        assert!(grid.is_adj_nodes(first, last).expect("valid nodes"));
        for pair in region.border.windows(2) {
            assert!(grid.is_adj_nodes(pair[0], pair[1]).expect("valid nodes"));
        }
    }

    #[test]
    fn node_order_and_duplicates_do_not_change_the_shape() {
        let grid = grid_5x5();
        let sorted = classify_zero_nodes(&grid, &RING).expect("valid");
        let mut shuffled = RING.to_vec();
        shuffled.reverse();
        shuffled.swap(1, 5);
        shuffled.push(RING[3]);
        assert_eq!(classify_zero_nodes(&grid, &shuffled).expect("valid"), sorted);

        let line = classify_zero_nodes(&grid, &[2, 0, 1, 0]).expect("valid");
        assert_eq!(line.path(), &[2, 1, 0]);
        assert_eq!(line.nodes(), &[0, 1, 2]);
        assert_eq!(
            classify_zero_nodes(&grid, &[12, 12]).expect("valid").category(),
            SingularityCategory::Point
        );
    }

    #[test]
    fn filled_square_excludes_interior_from_border() {
        let grid = grid_5x5();
        let mut nodes = RING.to_vec();
        nodes.push(12);
        nodes.sort_unstable();
        let shape = classify_zero_nodes(&grid, &nodes).expect("valid");
        match shape {
            Singularity::Region(region) => {
                assert_eq!(region.nodes.len(), 9);
                assert_eq!(region.border.len(), 8);
                assert!(!region.border.contains(&12));
            }
            other => panic!("expected a region, got {other:?}"),
        }
    }

    #[test]
    fn region_contains_points_inside_border() {
        let grid = grid_5x5();
        let shape = classify_zero_nodes(&grid, &RING).expect("valid");
        let Singularity::Region(region) = shape else {
            panic!("expected a region");
        };
        assert!(region.contains(&grid, 2.0, 2.0).expect("valid nodes"));
        assert!(region.contains(&grid, 1.5, 2.5).expect("valid nodes"));
        assert!(!region.contains(&grid, 0.5, 0.5).expect("valid nodes"));
        assert!(!region.contains(&grid, 3.5, 2.0).expect("valid nodes"));
    }

    #[test]
    fn path_points_follow_node_coordinates() {
        let grid = grid_5x5();
        let found = extract_singularities(&grid, &values_with_zeros(&grid, &[12])).expect("valid");
        let path = found[0].path_points(&grid).expect("valid nodes");
        assert_eq!(path.len(), 1);
        assert!((path[0].x - 2.0).abs() < 1e-12 && (path[0].y - 2.0).abs() < 1e-12);
    }
}
