use datasets::{
    global_indices, ClustersDefinition, DatasetError, DatasetId, DatasetRegistry, PointsDefinition,
    Rgb, SharedRegistry,
};
use events::{DatasetEvent, EventPublisher, InProcessEventBus};
use scatterplot_core::selection::{ScreenSize, SelectionModifier, ViewRect};
use scatterplot_core::settings::ColorBy;
use scatterplot_core::{PluginError, PointColors, ScatterplotPlugin, ScatterplotSettings};
use std::sync::Arc;

const FULL: DatasetId = DatasetId(1);
const SUBSET: DatasetId = DatasetId(2);
const MARKERS: DatasetId = DatasetId(3);

const VIEW: ViewRect = ViewRect {
    x: 0.0,
    y: 0.0,
    width: 10.0,
    height: 10.0,
};
const SCREEN: ScreenSize = ScreenSize {
    width: 100,
    height: 100,
};

fn registry() -> SharedRegistry {
    let mut registry = DatasetRegistry::new();
    let full = PointsDefinition::from_values(
        1,
        "cells",
        2,
        vec![1.0, 1.0, 2.0, 8.0, 8.0, 8.0, 5.0, 5.0],
    );
    registry.insert(full.clone()).expect("insert full");
    registry
        .insert(PointsDefinition::subset(2, "gated", &full, vec![1, 2, 3]))
        .expect("insert subset");
    registry
        .insert(PointsDefinition::from_values(3, "markers", 1, vec![0.5, 1.5, 2.5, 3.5]))
        .expect("insert markers");
    registry.into_shared()
}

fn plugin(registry: &SharedRegistry) -> (ScatterplotPlugin, Arc<InProcessEventBus>) {
    let bus = Arc::new(InProcessEventBus::new());
    let events: Arc<dyn EventPublisher> = bus.clone();
    let plugin = ScatterplotPlugin::new(registry.clone(), events, ScatterplotSettings::default())
        .expect("plugin");
    (plugin, bus)
}

#[test]
fn lasso_selects_source_points_and_notifies() {
    let registry = registry();
    let (mut plugin, bus) = plugin(&registry);
    let listener = bus.subscribe().expect("subscribe");
    plugin.load_positions(FULL).expect("load positions");
    assert_eq!(plugin.num_points(), 4);

    let hit = plugin
        .select_pixels(&VIEW, SCREEN, SelectionModifier::Replace, false, |x, _| x < 50)
        .expect("select")
        .expect("not frozen");
    assert_eq!(hit.indices, vec![0, 1]);
    assert_eq!(
        registry.read().expect("registry").selection(FULL),
        Some(&[0u32, 1][..])
    );
    assert_eq!(plugin.highlights().expect("highlights"), vec![1, 1, 0, 0]);
    assert_eq!(
        listener.drain().expect("drain"),
        vec![DatasetEvent::SelectionChanged(FULL)]
    );

    // an aborted lasso subtracts what it covered
    plugin
        .select_pixels(&VIEW, SCREEN, SelectionModifier::Add, true, |x, _| x < 15)
        .expect("select");
    assert_eq!(plugin.highlights().expect("highlights"), vec![0, 1, 0, 0]);
}

#[test]
fn subset_selection_is_stored_on_the_source() {
    let registry = registry();
    let (mut plugin, _bus) = plugin(&registry);
    plugin.load_positions(SUBSET).expect("load positions");
    assert_eq!(plugin.num_points(), 3);

    let hit = plugin
        .select_pixels(&VIEW, SCREEN, SelectionModifier::Replace, false, |_, _| true)
        .expect("select")
        .expect("not frozen");
    assert_eq!(hit.indices, vec![1, 2, 3]);
    assert_eq!(
        registry.read().expect("registry").selection(FULL),
        Some(&[1u32, 2, 3][..])
    );
    assert!(registry
        .read()
        .expect("registry")
        .selection(SUBSET)
        .expect("subset")
        .is_empty());
}

#[test]
fn frozen_selection_ignores_lasso() {
    let registry = registry();
    let (mut plugin, _bus) = plugin(&registry);
    plugin.load_positions(FULL).expect("load positions");
    plugin.settings_mut().freeze_selection = true;

    let hit = plugin
        .select_pixels(&VIEW, SCREEN, SelectionModifier::Replace, false, |_, _| true)
        .expect("select");
    assert!(hit.is_none());
    assert_eq!(plugin.highlights().expect("highlights"), vec![0, 0, 0, 0]);
}

#[test]
fn selecting_without_positions_fails() {
    let registry = registry();
    let (mut plugin, _bus) = plugin(&registry);
    let err = plugin
        .select_pixels(&VIEW, SCREEN, SelectionModifier::Replace, false, |_, _| true)
        .unwrap_err();
    assert!(matches!(err, PluginError::NoPositions));
    assert!(plugin.highlights().expect("highlights").is_empty());
}

#[test]
fn color_dataset_follows_position_changes() {
    let registry = registry();
    let (mut plugin, _bus) = plugin(&registry);
    plugin.load_positions(FULL).expect("load positions");
    plugin.set_color_dataset(MARKERS).expect("color");
    assert_eq!(plugin.settings().color_by, ColorBy::Data);
    assert_eq!(
        plugin.colors(),
        &PointColors::Scalars {
            values: vec![0.5, 1.5, 2.5, 3.5],
            range: Some((0.5, 3.5)),
        }
    );

    // markers share the source of the subset, so they still fit
    plugin.load_positions(SUBSET).expect("load subset");
    assert_eq!(plugin.color_dataset(), Some(MARKERS));
    assert!(matches!(
        plugin.colors(),
        PointColors::Scalars { values, .. } if values == &vec![1.5, 2.5, 3.5]
    ));
    assert!(plugin.warnings().is_empty());
}

#[test]
fn unfitting_color_dataset_falls_back_to_constant() {
    let registry = registry();
    registry
        .write()
        .expect("registry")
        .insert(PointsDefinition::new(4, "other", 7, 1))
        .expect("insert");
    let (mut plugin, _bus) = plugin(&registry);
    plugin.load_positions(FULL).expect("load positions");

    let err = plugin.set_color_dataset(DatasetId(4)).unwrap_err();
    assert!(matches!(err, PluginError::Coloring(_)));
    assert_eq!(plugin.color_dataset(), None);
    assert_eq!(plugin.settings().color_by, ColorBy::Constant);

    plugin.set_constant_color(Rgb::WHITE);
    assert_eq!(plugin.colors(), &PointColors::Constant(Rgb::WHITE));
}

#[test]
fn removed_and_changed_datasets_are_handled() {
    let registry = registry();
    let (mut plugin, bus) = plugin(&registry);
    plugin.load_positions(FULL).expect("load positions");
    plugin.set_color_dataset(MARKERS).expect("color");

    registry
        .write()
        .expect("registry")
        .points_mut(MARKERS)
        .expect("markers")
        .values
        .truncate(2);
    bus.publish(DatasetEvent::DataChanged(MARKERS)).expect("publish");
    bus.publish(DatasetEvent::Added(DatasetId(9))).expect("publish");
    assert_eq!(plugin.process_events().expect("events"), 1);
    assert_eq!(plugin.color_dataset(), None);
    let warnings = plugin.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].colors, MARKERS);
    assert_eq!(warnings[0].positions, FULL);

    registry.write().expect("registry").remove(MARKERS).expect("remove");
    assert!(matches!(
        plugin.load_positions(MARKERS),
        Err(PluginError::NotPoints(MARKERS))
    ));

    bus.publish(DatasetEvent::Removed(FULL)).expect("publish");
    assert_eq!(plugin.process_events().expect("events"), 1);
    assert_eq!(plugin.position_dataset(), None);
    assert_eq!(plugin.num_points(), 0);
}

#[test]
fn point_size_and_opacity_need_matching_sizes() {
    let registry = registry();
    let (mut plugin, _bus) = plugin(&registry);
    plugin.load_positions(FULL).expect("load positions");

    plugin.set_point_size_dataset(MARKERS, 0).expect("sizes");
    assert_eq!(plugin.point_sizes(), Some(&[0.5, 1.5, 2.5, 3.5][..]));

    plugin.load_positions(SUBSET).expect("load subset");
    assert!(plugin.point_sizes().is_none());
    assert!(plugin.set_point_opacity_dataset(MARKERS, 0).is_err());
    assert!(plugin.point_opacities().is_none());
}

#[test]
fn dropping_the_plugin_unsubscribes() {
    let registry = registry();
    let (plugin, bus) = plugin(&registry);
    assert_eq!(bus.subscriber_count(), 1);
    drop(plugin);
    assert_eq!(bus.subscriber_count(), 0);
}

fn selection_of(registry: &SharedRegistry, id: DatasetId) -> Vec<u32> {
    registry
        .read()
        .expect("registry")
        .selection(id)
        .unwrap_or_default()
        .to_vec()
}

#[test]
fn failed_load_keeps_the_previous_plot() {
    let registry = registry();
    let (mut plugin, _bus) = plugin(&registry);
    plugin.load_positions(FULL).expect("load positions");

    // markers have one dimension while y defaults to dimension 1
    let err = plugin.load_positions(MARKERS).unwrap_err();
    assert!(matches!(
        err,
        PluginError::Dataset(DatasetError::DimensionOutOfRange { .. })
    ));
    assert_eq!(plugin.position_dataset(), Some(FULL));
    assert_eq!(plugin.num_points(), 4);

    plugin
        .select_pixels(&VIEW, SCREEN, SelectionModifier::Replace, false, |_, _| true)
        .expect("select");
    assert_eq!(selection_of(&registry, FULL), vec![0, 1, 2, 3]);
    assert!(selection_of(&registry, MARKERS).is_empty());
}

#[test]
fn failed_event_does_not_swallow_later_events() {
    let registry = registry();
    let (mut plugin, bus) = plugin(&registry);
    plugin.load_positions(FULL).expect("load positions");

    registry
        .write()
        .expect("registry")
        .points_mut(FULL)
        .expect("full")
        .num_dimensions = 1;
    bus.publish(DatasetEvent::DataChanged(FULL)).expect("publish");
    bus.publish(DatasetEvent::Removed(FULL)).expect("publish");

    assert_eq!(plugin.process_events().expect("events"), 2);
    assert_eq!(plugin.position_dataset(), None);
    let failures = plugin.take_event_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].event, DatasetEvent::DataChanged(FULL));
    assert!(failures[0].message.contains("out of range"));
    assert!(plugin.event_failures().is_empty());
}

#[test]
fn selection_actions_cover_the_plotted_points() {
    let registry = registry();
    let (mut plugin, bus) = plugin(&registry);
    let listener = bus.subscribe().expect("subscribe");
    plugin.load_positions(SUBSET).expect("load positions");

    plugin.select_all().expect("select all");
    assert_eq!(selection_of(&registry, FULL), vec![1, 2, 3]);
    assert_eq!(plugin.highlights().expect("highlights"), vec![1, 1, 1]);

    registry
        .write()
        .expect("registry")
        .set_selection(FULL, vec![0, 1])
        .expect("selection");
    plugin.invert_selection().expect("invert");
    assert_eq!(selection_of(&registry, FULL), vec![0, 2, 3]);

    plugin.clear_selection().expect("clear");
    assert!(selection_of(&registry, FULL).is_empty());
    assert_eq!(
        listener.drain().expect("drain"),
        vec![DatasetEvent::SelectionChanged(FULL); 3]
    );
}

#[test]
fn subsets_are_created_from_the_selection() {
    let registry = registry();
    let (mut plugin, bus) = plugin(&registry);
    let listener = bus.subscribe().expect("subscribe");
    plugin.load_positions(SUBSET).expect("load positions");
    registry
        .write()
        .expect("registry")
        .set_selection(FULL, vec![0, 2, 3])
        .expect("selection");

    let from_source = plugin.create_subset("picked", true).expect("subset");
    let visible = plugin.create_subset("visible", false).expect("subset");
    assert_eq!(from_source, DatasetId(4));
    assert_eq!(visible, DatasetId(5));

    {
        let registry = registry.read().expect("registry");
        let picked = registry.points(from_source).expect("picked");
        assert_eq!(picked.parent(), Some(FULL));
        assert_eq!(picked.subset_indices(), Some(&[0u32, 2, 3][..]));

        let visible = registry.points(visible).expect("visible");
        assert_eq!(visible.parent(), Some(SUBSET));
        assert_eq!(visible.name, "visible");
        assert_eq!(global_indices(&registry, visible), vec![2, 3]);
    }
    assert_eq!(
        listener.drain().expect("drain"),
        vec![
            DatasetEvent::Added(from_source),
            DatasetEvent::Added(visible)
        ]
    );

    plugin.clear_selection().expect("clear");
    assert!(matches!(
        plugin.create_subset("empty", true),
        Err(PluginError::EmptySelection)
    ));
}

#[test]
fn manual_clusters_collect_the_selection() {
    let red = Rgb::new(1.0, 0.0, 0.0);
    let blue = Rgb::new(0.0, 0.0, 1.0);
    let registry = registry();
    let (mut plugin, _bus) = plugin(&registry);
    plugin.load_positions(FULL).expect("load positions");
    registry
        .write()
        .expect("registry")
        .set_selection(FULL, vec![1, 3])
        .expect("selection");

    let clusters = plugin
        .add_manual_cluster(None, "picked", red)
        .expect("first cluster");
    assert_eq!(clusters, DatasetId(4));
    assert_eq!(plugin.color_dataset(), Some(clusters));
    assert_eq!(
        plugin.colors(),
        &PointColors::PerPoint(vec![Rgb::BLACK, red, Rgb::BLACK, red])
    );

    registry
        .write()
        .expect("registry")
        .set_selection(FULL, vec![0])
        .expect("selection");
    plugin
        .add_manual_cluster(Some(clusters), "more", blue)
        .expect("second cluster");
    assert_eq!(
        plugin.colors(),
        &PointColors::PerPoint(vec![blue, red, Rgb::BLACK, red])
    );
    {
        let registry = registry.read().expect("registry");
        let definition = registry.clusters(clusters).expect("clusters");
        assert_eq!(definition.parent, FULL);
        assert_eq!(definition.clusters.len(), 2);
        assert_eq!(definition.clusters[1].indices, vec![0]);
    }

    assert!(matches!(
        plugin.add_manual_cluster(Some(clusters), "  ", blue),
        Err(PluginError::EmptyClusterName)
    ));
}

#[test]
fn manual_clusters_reject_foreign_targets() {
    let registry = registry();
    {
        let mut registry = registry.write().expect("registry");
        registry
            .insert(PointsDefinition::new(10, "other", 2, 2))
            .expect("insert other");
        registry
            .insert(ClustersDefinition {
                id: DatasetId(11),
                name: "other clusters".to_string(),
                parent: DatasetId(10),
                clusters: Vec::new(),
            })
            .expect("insert clusters");
    }
    let (mut plugin, _bus) = plugin(&registry);
    plugin.load_positions(FULL).expect("load positions");

    assert!(matches!(
        plugin.add_manual_cluster(None, "picked", Rgb::WHITE),
        Err(PluginError::EmptySelection)
    ));

    plugin.select_all().expect("select all");
    assert!(matches!(
        plugin.add_manual_cluster(Some(DatasetId(11)), "picked", Rgb::WHITE),
        Err(PluginError::UnrelatedClusters { .. })
    ));
    assert!(matches!(
        plugin.add_manual_cluster(Some(MARKERS), "picked", Rgb::WHITE),
        Err(PluginError::Dataset(DatasetError::NotClusters(MARKERS)))
    ));
}
