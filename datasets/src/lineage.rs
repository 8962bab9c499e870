use crate::{DatasetError, DatasetRegistry, PointsDefinition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Walks the derivation chain up to the root collection.
///
/// Stops at a missing parent, so a dangling derivation resolves to the last
/// collection that is still registered.
pub fn source_points<'a>(
    registry: &'a DatasetRegistry,
    points: &'a PointsDefinition,
) -> &'a PointsDefinition {
    let mut current = points;
    for _ in 0..registry.len() {
        match registry.parent_points(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

pub(crate) fn check_terminates(
    registry: &DatasetRegistry,
    points: &PointsDefinition,
) -> Result<(), DatasetError> {
    let mut current = points;
    for _ in 0..=registry.len() {
        match registry.parent_points(current) {
            Some(parent) => current = parent,
            None => return Ok(()),
        }
    }
    Err(DatasetError::DerivationCycle(points.id))
}

/// Maps every local index of `points` to an index in its source collection.
pub fn global_indices(registry: &DatasetRegistry, points: &PointsDefinition) -> Vec<u32> {
    let mut chain = vec![points];
    let mut current = points;
    for _ in 0..registry.len() {
        match registry.parent_points(current) {
            Some(parent) => {
                chain.push(parent);
                current = parent;
            }
            None => break,
        }
    }

    // Resolve from the root down so each subset level indexes its parent's globals.
    let root = chain.pop().unwrap_or(points);
    let mut indices: Vec<u32> = (0..root.num_points() as u32).collect();
    while let Some(level) = chain.pop() {
        indices = match level.subset_indices() {
            Some(local) => local
                .iter()
                .map(|&i| indices.get(i as usize).copied().unwrap_or(i))
                .collect(),
            None => indices,
        };
    }
    indices
}

pub fn extract_dimension(
    registry: &DatasetRegistry,
    points: &PointsDefinition,
    dimension: usize,
) -> Result<Vec<f32>, DatasetError> {
    if dimension >= points.num_dimensions {
        return Err(DatasetError::DimensionOutOfRange {
            id: points.id,
            dimension,
            num_dimensions: points.num_dimensions,
        });
    }

    if points.values.is_empty() {
        if let (Some(indices), Some(parent)) =
            (points.subset_indices(), registry.parent_points(points))
        {
            let column = extract_dimension(registry, parent, dimension)?;
            return Ok(indices
                .iter()
                .map(|&i| column.get(i as usize).copied().unwrap_or_default())
                .collect());
        }
        return Ok(vec![0.0; points.num_points()]);
    }

    Ok(points
        .values
        .chunks_exact(points.num_dimensions)
        .map(|row| row[dimension])
        .collect())
}

pub fn extract_dimensions(
    registry: &DatasetRegistry,
    points: &PointsDefinition,
    x_dimension: usize,
    y_dimension: usize,
) -> Result<Vec<Point2>, DatasetError> {
    let xs = extract_dimension(registry, points, x_dimension)?;
    let ys = extract_dimension(registry, points, y_dimension)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .map(|(x, y)| Point2::new(x, y))
        .collect())
}
