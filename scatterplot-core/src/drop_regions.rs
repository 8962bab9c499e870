use crate::mapping::{full_source_has_same_num_points, has_surjective_selection_mapping};
use datasets::{Dataset, DatasetId, DatasetRegistry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropRole {
    Position,
    Color,
    PointSize,
    PointOpacity,
    Incompatible,
    NoPointsLoaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropRegion {
    pub role: DropRole,
    pub title: String,
    pub description: String,
    pub droppable: bool,
}

impl DropRegion {
    fn accept(role: DropRole, title: &str, description: String) -> Self {
        Self {
            role,
            title: title.to_string(),
            description,
            droppable: true,
        }
    }

    fn reject(role: DropRole, title: &str, description: &str) -> Self {
        Self {
            role,
            title: title.to_string(),
            description: description.to_string(),
            droppable: false,
        }
    }
}

/// Roles `candidate` can take when dropped on a plot showing `position`.
pub fn drop_regions(
    registry: &DatasetRegistry,
    position: Option<DatasetId>,
    candidate: DatasetId,
) -> Vec<DropRegion> {
    let position = position.and_then(|id| registry.points(id));
    let mut regions = Vec::new();

    match registry.get(candidate) {
        Some(Dataset::Points(candidate)) => {
            let description = format!(
                "Visualize {} as points or density/contour map",
                candidate.name
            );
            let Some(position) = position else {
                regions.push(DropRegion::accept(DropRole::Position, "Point position", description));
                return regions;
            };

            if position.id != candidate.id && candidate.num_dimensions >= 2 {
                regions.push(DropRegion::accept(DropRole::Position, "Point position", description));
            }

            let same_num_points = position.num_points() == candidate.num_points();
            let same_as_full = full_source_has_same_num_points(registry, position, candidate);
            let has_mapping = has_surjective_selection_mapping(registry, candidate.id, position.id);

            if same_num_points || same_as_full || has_mapping {
                regions.push(DropRegion::accept(
                    DropRole::Color,
                    "Point color",
                    format!("Colorize {} points with {}", position.name, candidate.name),
                ));
            }

            if same_num_points {
                regions.push(DropRegion::accept(
                    DropRole::PointSize,
                    "Point size",
                    format!("Size {} points with {}", position.name, candidate.name),
                ));
                regions.push(DropRegion::accept(
                    DropRole::PointOpacity,
                    "Point opacity",
                    format!("Set {} points opacity with {}", position.name, candidate.name),
                ));
            }
        }
        Some(Dataset::Clusters(clusters)) => {
            if position.is_some() {
                regions.push(DropRegion::accept(
                    DropRole::Color,
                    "Color",
                    format!("Color points by {}", clusters.name),
                ));
            } else {
                regions.push(DropRegion::reject(
                    DropRole::NoPointsLoaded,
                    "No points data loaded",
                    "Clusters can only be visualized in concert with points data",
                ));
            }
        }
        // accepted on drop, but offers no role
        Some(Dataset::Colors(_)) => {}
        None => {
            regions.push(DropRegion::reject(
                DropRole::Incompatible,
                "Incompatible data",
                "This type of data is not supported",
            ));
        }
    }

    regions
}
