use crate::commands::*;
use crate::output::*;
use datasets::{Dataset, DatasetId, DatasetRegistry};
use scatterplot_core::{
    drop_regions, has_surjective_selection_mapping, map_cluster_colors, map_color_scalars,
    SettingsManager,
};
use std::path::Path;

pub fn handle_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::CheckMapping {
            registry,
            colors,
            positions,
            json_query,
        } => {
            let Some(registry) = load_registry(&registry) else {
                return Ok(());
            };
            let (colors, positions) = (DatasetId(colors), DatasetId(positions));
            let surjective = has_surjective_selection_mapping(&registry, colors, positions);
            if json_query {
                print_json(&serde_json::json!({
                    "colors": colors,
                    "positions": positions,
                    "surjective": surjective,
                }));
            } else {
                print_mapping(colors, positions, surjective);
            }
        }
        Commands::DropTargets {
            registry,
            positions,
            candidate,
            json_query,
        } => {
            let Some(registry) = load_registry(&registry) else {
                return Ok(());
            };
            let regions = drop_regions(&registry, positions.map(DatasetId), DatasetId(candidate));
            if json_query {
                print_json(&regions);
            } else {
                print_drop_regions(&regions);
            }
        }
        Commands::Colors {
            registry,
            positions,
            colors,
            dimension,
            json_query,
        } => {
            let Some(registry) = load_registry(&registry) else {
                return Ok(());
            };
            handle_colors(
                &registry,
                DatasetId(colors),
                DatasetId(positions),
                dimension,
                json_query,
            );
        }
        Commands::Settings { dir, command } => handle_settings_command(&dir, command),
    }
    Ok(())
}

fn load_registry(path: &Path) -> Option<DatasetRegistry> {
    match DatasetRegistry::load_from_file(path) {
        Ok(registry) => {
            log::debug!("loaded {} datasets from {}", registry.len(), path.display());
            Some(registry)
        }
        Err(err) => {
            print_error(&format!("Failed to load registry '{}': {err}", path.display()));
            None
        }
    }
}

fn handle_colors(
    registry: &DatasetRegistry,
    colors: DatasetId,
    positions: DatasetId,
    dimension: usize,
    json_query: bool,
) {
    match registry.get(colors) {
        Some(Dataset::Clusters(_)) => match map_cluster_colors(registry, colors, positions) {
            Ok(point_colors) if json_query => print_json(&point_colors),
            Ok(point_colors) => print_point_colors(&point_colors),
            Err(err) => print_error(&err.to_string()),
        },
        _ => match map_color_scalars(registry, colors, positions, dimension) {
            Ok(scalars) if json_query => print_json(&scalars),
            Ok(scalars) => print_scalars(&scalars),
            Err(err) => print_error(&err.to_string()),
        },
    }
}

fn handle_settings_command(dir: &Path, command: SettingsCommands) {
    let mut manager = SettingsManager::new(dir.to_path_buf());
    match command {
        SettingsCommands::Show { json_query } => {
            if json_query {
                print_json(&manager.settings);
            } else {
                print_settings(&manager.settings);
            }
        }
        SettingsCommands::Set { json } => {
            let result = manager
                .apply_settings_json(&json)
                .and_then(|_| manager.persist_current());
            match result {
                Ok(()) => print_info("Settings saved"),
                Err(err) => print_error(&err),
            }
        }
        SettingsCommands::Reset => match manager.reset_defaults_to_factory() {
            Ok(()) => print_info("Settings restored to factory defaults"),
            Err(err) => print_error(&err),
        },
    }
}
