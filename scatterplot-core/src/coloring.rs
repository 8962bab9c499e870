use crate::mapping::{
    full_source_has_same_num_points, is_surjective, selection_mapping_colors_to_positions,
    selection_mapping_position_source_to_colors, selection_mapping_positions_to_colors,
};
use datasets::{
    extract_dimension, global_indices, DatasetError, DatasetId, DatasetRegistry, PointsDefinition,
    Rgb,
};

/// Scalar left on position points no mapping reached.
pub const UNMAPPED_SCALAR: f32 = f32::MIN;

#[derive(thiserror::Error, Debug)]
pub enum ColoringError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("dataset {0} is not a points dataset")]
    NotPoints(DatasetId),
    #[error("dataset {0} is not a clusters dataset")]
    NotClusters(DatasetId),
    #[error("dataset {source_id} has {found} points but the positions have {expected}")]
    CardinalityMismatch {
        source_id: DatasetId,
        expected: usize,
        found: usize,
    },
    #[error("coloring dataset {colors} does not match position dataset {positions} in a known way")]
    NoKnownMapping {
        colors: DatasetId,
        positions: DatasetId,
    },
}

fn points(registry: &DatasetRegistry, id: DatasetId) -> Result<&PointsDefinition, ColoringError> {
    registry.points(id).ok_or(ColoringError::NotPoints(id))
}

/// One scalar per position point, taken from `dimension` of the color dataset.
///
/// When the two datasets differ in size the routes are tried in order:
/// shared full source (global indices), colors to positions, positions to
/// colors, then the positions' source to colors. Mappings must be
/// surjective onto their target to be used.
pub fn map_color_scalars(
    registry: &DatasetRegistry,
    colors: DatasetId,
    positions: DatasetId,
    dimension: usize,
) -> Result<Vec<f32>, ColoringError> {
    let colors = points(registry, colors)?;
    let positions = points(registry, positions)?;
    let scalars = extract_dimension(registry, colors, dimension)?;

    let num_positions = positions.num_points();
    let num_colors = colors.num_points();
    if num_colors == num_positions {
        return Ok(scalars);
    }

    let mut mapped = vec![UNMAPPED_SCALAR; num_positions];

    if full_source_has_same_num_points(registry, positions, colors) {
        log::debug!("coloring {} through global indices", positions.id);
        for (local, global) in global_indices(registry, positions).into_iter().enumerate() {
            if let Some(&value) = scalars.get(global as usize) {
                mapped[local] = value;
            }
        }
        return Ok(mapped);
    }

    if let Some(mapping) = selection_mapping_colors_to_positions(registry, colors, positions)
        .filter(|m| m.num_points_in_target as usize == num_positions)
        .filter(|m| is_surjective(m.linked_data, m.num_points_in_target))
    {
        log::debug!("coloring {} from {} along its linked data", positions.id, colors.id);
        for (from_color, to_positions) in mapping.linked_data.mapping.iter() {
            let Some(&value) = scalars.get(from_color as usize) else {
                continue;
            };
            for &to_position in to_positions {
                if let Some(slot) = mapped.get_mut(to_position as usize) {
                    *slot = value;
                }
            }
        }
        return Ok(mapped);
    }

    if let Some(mapping) = selection_mapping_positions_to_colors(registry, positions, colors)
        .filter(|m| m.num_points_in_target as usize == num_colors)
        .filter(|m| is_surjective(m.linked_data, m.num_points_in_target))
    {
        log::debug!("coloring {} by reverse lookup into {}", positions.id, colors.id);
        for (from_position, to_colors) in mapping.linked_data.mapping.iter() {
            let Some(slot) = mapped.get_mut(from_position as usize) else {
                continue;
            };
            if *slot != UNMAPPED_SCALAR {
                continue;
            }
            // first in-range target wins
            if let Some(&value) = to_colors.iter().find_map(|&c| scalars.get(c as usize)) {
                *slot = value;
            }
        }
        return Ok(mapped);
    }

    if let Some(mapping) = selection_mapping_position_source_to_colors(registry, positions, colors)
        .filter(|m| m.num_points_in_target as usize == num_colors)
        .filter(|m| is_surjective(m.linked_data, m.num_points_in_target))
    {
        log::debug!("coloring {} through the linked data of its source", positions.id);
        for (local, global) in global_indices(registry, positions).into_iter().enumerate() {
            let Some(to_colors) = mapping.linked_data.mapping.get(global) else {
                continue;
            };
            if let Some(&value) = to_colors.iter().find_map(|&c| scalars.get(c as usize)) {
                mapped[local] = value;
            }
        }
        return Ok(mapped);
    }

    Err(ColoringError::NoKnownMapping {
        colors: colors.id,
        positions: positions.id,
    })
}

/// Point size and opacity only accept datasets of the same size as the positions.
pub fn map_point_scalars(
    registry: &DatasetRegistry,
    source: DatasetId,
    positions: DatasetId,
    dimension: usize,
) -> Result<Vec<f32>, ColoringError> {
    let source = points(registry, source)?;
    let positions = points(registry, positions)?;
    if source.num_points() != positions.num_points() {
        return Err(ColoringError::CardinalityMismatch {
            source_id: source.id,
            expected: positions.num_points(),
            found: source.num_points(),
        });
    }
    Ok(extract_dimension(registry, source, dimension)?)
}

/// Paints clusters onto the global index space of the positions' source and
/// reads one color back per position point.
pub fn map_cluster_colors(
    registry: &DatasetRegistry,
    clusters: DatasetId,
    positions: DatasetId,
) -> Result<Vec<Rgb>, ColoringError> {
    let clusters = registry
        .clusters(clusters)
        .ok_or(ColoringError::NotClusters(clusters))?;
    let positions = points(registry, positions)?;

    let total = registry.source_points(positions).num_points();
    let mut global_colors = vec![Rgb::BLACK; total];
    for cluster in &clusters.clusters {
        for &index in &cluster.indices {
            if let Some(slot) = global_colors.get_mut(index as usize) {
                *slot = cluster.color;
            }
        }
    }

    Ok(global_indices(registry, positions)
        .into_iter()
        .map(|global| global_colors.get(global as usize).copied().unwrap_or(Rgb::BLACK))
        .collect())
}

/// Range of the assigned scalars, for the color map axis.
pub fn scalar_range(scalars: &[f32]) -> Option<(f32, f32)> {
    scalars
        .iter()
        .copied()
        .filter(|&v| v != UNMAPPED_SCALAR && v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
