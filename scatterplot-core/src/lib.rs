//! Data-side core of the scatterplot view plugin: linked-data selection
//! mappings, color mapping, drop targets, pixel selection and settings.

pub mod coloring;
pub mod drop_regions;
pub mod mapping;
pub mod plugin;
pub mod selection;
pub mod settings;
pub mod validation;

pub use coloring::{map_cluster_colors, map_color_scalars, ColoringError, UNMAPPED_SCALAR};
pub use drop_regions::{drop_regions, DropRegion, DropRole};
pub use mapping::{
    find_mapping, full_source_has_same_num_points, has_surjective_selection_mapping,
    is_surjective, parent_has_same_num_points, selection_mapping_colors_to_positions,
    selection_mapping_position_source_to_colors, selection_mapping_positions_to_colors,
    SelectionMapping,
};
pub use plugin::{EventFailure, MappingWarning, PluginError, PointColors, ScatterplotPlugin};
pub use settings::{ScatterplotSettings, SettingsManager};
