use datasets::{DatasetId, Rgb};
use scatterplot_core::settings::ScatterplotSettings;
use scatterplot_core::{DropRegion, UNMAPPED_SCALAR};

pub fn print_info(message: &str) {
    println!("[Scatterplot][INFO] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[Scatterplot][ERROR]: {message}");
}

pub fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    println!("{json}");
}

pub fn print_mapping(colors: DatasetId, positions: DatasetId, surjective: bool) {
    if surjective {
        print_info(&format!("{colors} covers every point of {positions}"));
    } else {
        print_info(&format!("No surjective mapping from {colors} to {positions}"));
    }
}

pub fn print_drop_regions(regions: &[DropRegion]) {
    print_info("Drop targets:");
    for region in regions {
        let state = if region.droppable {
            "droppable"
        } else {
            "blocked"
        };
        println!("{} [{}] {}", region.title, state, region.description);
    }
}

pub fn print_scalars(scalars: &[f32]) {
    print_info(&format!("{} point scalars:", scalars.len()));
    for (index, value) in scalars.iter().enumerate() {
        if *value == UNMAPPED_SCALAR {
            println!("{index}: (unmapped)");
        } else {
            println!("{index}: {value}");
        }
    }
}

pub fn print_point_colors(colors: &[Rgb]) {
    print_info(&format!("{} point colors:", colors.len()));
    for (index, color) in colors.iter().enumerate() {
        println!("{index}: {:.3} {:.3} {:.3}", color.r, color.g, color.b);
    }
}

pub fn print_settings(settings: &ScatterplotSettings) {
    print_info("Scatterplot settings:");
    println!("render_mode: {:?}", settings.render_mode);
    println!("point_size: {}", settings.point_size);
    println!("point_opacity: {}", settings.point_opacity);
    println!("density_sigma: {}", settings.density_sigma);
    println!("continuous_updates: {}", settings.continuous_updates);
    println!("color_by: {:?}", settings.color_by);
    println!("color_dimension: {}", settings.color_dimension);
    let c = settings.constant_color;
    println!("constant_color: {:.3} {:.3} {:.3}", c.r, c.g, c.b);
    let b = settings.background_color;
    println!("background_color: {:.3} {:.3} {:.3}", b.r, b.g, b.b);
    println!("x_dimension: {}", settings.x_dimension);
    println!("y_dimension: {}", settings.y_dimension);
    println!("freeze_selection: {}", settings.freeze_selection);
}
