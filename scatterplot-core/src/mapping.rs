//! Resolution of linked-data selection mappings between a color dataset and
//! the displayed positions.
//!
//! Derivation matching only ever looks at the immediate parent. Following a
//! longer chain would need rules for subsets of subsets that the linked data
//! does not record.

use datasets::{DatasetId, DatasetRegistry, LinkedDataDefinition, PointsDefinition};

/// A linked-data entry paired with the target cardinality seen at lookup time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionMapping<'a> {
    pub linked_data: &'a LinkedDataDefinition,
    pub num_points_in_target: u32,
}

/// True if `data` is derived and its immediate parent has as many points as `other`.
pub fn parent_has_same_num_points(
    registry: &DatasetRegistry,
    data: &PointsDefinition,
    other: &PointsDefinition,
) -> bool {
    registry
        .parent_points(data)
        .is_some_and(|parent| parent.num_points() == other.num_points())
}

/// True if `data` is derived and the source at the root of its lineage has
/// as many points as `other`.
pub fn full_source_has_same_num_points(
    registry: &DatasetRegistry,
    data: &PointsDefinition,
    other: &PointsDefinition,
) -> bool {
    data.is_derived() && registry.source_points(data).num_points() == other.num_points()
}

/// Returns the first entry of `source`'s linked data accepted by `matches`.
pub fn find_mapping<'a, F>(
    registry: &DatasetRegistry,
    source: &'a PointsDefinition,
    target: &PointsDefinition,
    matches: F,
) -> Option<SelectionMapping<'a>>
where
    F: Fn(&DatasetRegistry, &LinkedDataDefinition, &PointsDefinition) -> bool,
{
    source
        .linked_data
        .iter()
        .find(|&linked| matches(registry, linked, target))
        .map(|linked_data| SelectionMapping {
            linked_data,
            num_points_in_target: target_count(target.num_points()),
        })
}

/// Point count as stored in a selection mapping, saturating at `u32::MAX`.
fn target_count(num_points: usize) -> u32 {
    u32::try_from(num_points).unwrap_or(u32::MAX)
}

fn targets_dataset(
    _: &DatasetRegistry,
    linked: &LinkedDataDefinition,
    target: &PointsDefinition,
) -> bool {
    linked.target == target.id
}

fn targets_dataset_or_its_parent(
    registry: &DatasetRegistry,
    linked: &LinkedDataDefinition,
    positions: &PointsDefinition,
) -> bool {
    if linked.target == positions.id {
        return true;
    }
    positions.parent() == Some(linked.target)
        && registry
            .points(linked.target)
            .is_some_and(|parent| parent.num_points() == positions.num_points())
}

pub fn selection_mapping_colors_to_positions<'a>(
    registry: &DatasetRegistry,
    colors: &'a PointsDefinition,
    positions: &PointsDefinition,
) -> Option<SelectionMapping<'a>> {
    find_mapping(registry, colors, positions, targets_dataset_or_its_parent)
}

/// Falls back to the linked data of the positions' parent when it is
/// point-for-point the same size.
pub fn selection_mapping_positions_to_colors<'a>(
    registry: &'a DatasetRegistry,
    positions: &'a PointsDefinition,
    colors: &PointsDefinition,
) -> Option<SelectionMapping<'a>> {
    if let Some(mapping) = find_mapping(registry, positions, colors, targets_dataset) {
        return Some(mapping);
    }
    if !parent_has_same_num_points(registry, positions, positions) {
        return None;
    }
    let parent = registry.parent_points(positions)?;
    log::debug!(
        "no mapping from {} to {}, trying parent {}",
        positions.id,
        colors.id,
        parent.id
    );
    find_mapping(registry, parent, colors, targets_dataset)
}

/// Mapping recorded on the source of derived positions. Its source indices
/// are global indices of the positions.
pub fn selection_mapping_position_source_to_colors<'a>(
    registry: &'a DatasetRegistry,
    positions: &'a PointsDefinition,
    colors: &PointsDefinition,
) -> Option<SelectionMapping<'a>> {
    if !positions.is_derived() {
        return None;
    }
    let source = registry.source_points(positions);
    find_mapping(registry, source, colors, targets_dataset)
}

/// Whether every target index is hit by at least one mapped source index.
///
/// Target indices at or past `num_points_in_target` are stale and skipped.
pub fn is_surjective(linked_data: &LinkedDataDefinition, num_points_in_target: u32) -> bool {
    if num_points_in_target == 0 {
        return true;
    }

    let mut found = vec![false; num_points_in_target as usize];
    let mut count = 0u32;

    for (_, targets) in linked_data.mapping.iter() {
        for &target in targets {
            if target >= num_points_in_target {
                continue;
            }
            let slot = &mut found[target as usize];
            if !*slot {
                *slot = true;
                count += 1;
                if count == num_points_in_target {
                    return true;
                }
            }
        }
    }

    false
}

/// Whether `colors` can be applied to every point of `positions` through a
/// recorded mapping, in either direction.
pub fn has_surjective_selection_mapping(
    registry: &DatasetRegistry,
    colors: DatasetId,
    positions: DatasetId,
) -> bool {
    let (Some(colors), Some(positions)) = (registry.points(colors), registry.points(positions))
    else {
        return false;
    };

    let mapping = selection_mapping_colors_to_positions(registry, colors, positions)
        .or_else(|| selection_mapping_positions_to_colors(registry, positions, colors));

    match mapping {
        Some(mapping) => is_surjective(mapping.linked_data, mapping.num_points_in_target),
        None => false,
    }
}
