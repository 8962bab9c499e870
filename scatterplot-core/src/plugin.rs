use crate::coloring::{
    map_cluster_colors, map_color_scalars, map_point_scalars, scalar_range, ColoringError,
};
use crate::drop_regions::{drop_regions, DropRegion};
use crate::selection::{
    combine_selection, highlights, invert_selection, select_points, PixelSelection, ScreenSize,
    SelectionModifier, ViewRect,
};
use crate::settings::{ColorBy, ScatterplotSettings};
use datasets::{
    extract_dimensions, global_indices, Cluster, ClustersDefinition, Dataset, DatasetError,
    DatasetId, DatasetRegistry, Point2, PointsDefinition, Rgb, SharedRegistry,
};
use events::{DatasetEvent, EventError, EventPublisher, Subscription};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};

/// Name of the clusters dataset created by the first manual cluster.
pub const DEFAULT_CLUSTERS_NAME: &str = "Clusters";

#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Coloring(#[from] ColoringError),
    #[error(transparent)]
    Events(#[from] EventError),
    #[error("no position dataset loaded")]
    NoPositions,
    #[error("dataset {0} is not a points dataset")]
    NotPoints(DatasetId),
    #[error("dataset {0} not found")]
    NotFound(DatasetId),
    #[error("no points are selected")]
    EmptySelection,
    #[error("cluster name must not be empty")]
    EmptyClusterName,
    #[error("clusters dataset {clusters} does not belong to source {source_id}")]
    UnrelatedClusters {
        clusters: DatasetId,
        source_id: DatasetId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointColors {
    Constant(Rgb),
    Scalars {
        values: Vec<f32>,
        range: Option<(f32, f32)>,
    },
    PerPoint(Vec<Rgb>),
}

/// Recorded when a color dataset stopped fitting the displayed positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingWarning {
    pub colors: DatasetId,
    pub positions: DatasetId,
    pub message: String,
}

/// A dataset event that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFailure {
    pub event: DatasetEvent,
    pub message: String,
}

/// Data-side state of one scatterplot view.
///
/// The registry and event bus are owned by the host and injected here. The
/// plugin subscribes on construction and its subscription is released when
/// the plugin is dropped.
pub struct ScatterplotPlugin {
    registry: SharedRegistry,
    events: Arc<dyn EventPublisher>,
    subscription: Subscription,
    settings: ScatterplotSettings,
    position_dataset: Option<DatasetId>,
    position_source: Option<DatasetId>,
    positions: Vec<Point2>,
    global_indices: Vec<u32>,
    color_dataset: Option<DatasetId>,
    colors: PointColors,
    point_sizes: Option<Vec<f32>>,
    point_opacities: Option<Vec<f32>>,
    warnings: Vec<MappingWarning>,
    event_failures: Vec<EventFailure>,
}

impl ScatterplotPlugin {
    pub fn new(
        registry: SharedRegistry,
        events: Arc<dyn EventPublisher>,
        settings: ScatterplotSettings,
    ) -> Result<Self, PluginError> {
        let subscription = events.subscribe()?;
        Ok(Self {
            registry,
            events,
            subscription,
            colors: PointColors::Constant(settings.constant_color),
            settings,
            position_dataset: None,
            position_source: None,
            positions: Vec::new(),
            global_indices: Vec::new(),
            color_dataset: None,
            point_sizes: None,
            point_opacities: None,
            warnings: Vec::new(),
            event_failures: Vec::new(),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DatasetRegistry>, PluginError> {
        self.registry
            .read()
            .map_err(|_| PluginError::Dataset(DatasetError::Poisoned))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DatasetRegistry>, PluginError> {
        self.registry
            .write()
            .map_err(|_| PluginError::Dataset(DatasetError::Poisoned))
    }

    pub fn settings(&self) -> &ScatterplotSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ScatterplotSettings {
        &mut self.settings
    }

    pub fn position_dataset(&self) -> Option<DatasetId> {
        self.position_dataset
    }

    pub fn color_dataset(&self) -> Option<DatasetId> {
        self.color_dataset
    }

    pub fn positions(&self) -> &[Point2] {
        &self.positions
    }

    pub fn num_points(&self) -> usize {
        self.positions.len()
    }

    pub fn colors(&self) -> &PointColors {
        &self.colors
    }

    pub fn point_sizes(&self) -> Option<&[f32]> {
        self.point_sizes.as_deref()
    }

    pub fn point_opacities(&self) -> Option<&[f32]> {
        self.point_opacities.as_deref()
    }

    pub fn warnings(&self) -> &[MappingWarning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<MappingWarning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn event_failures(&self) -> &[EventFailure] {
        &self.event_failures
    }

    pub fn take_event_failures(&mut self) -> Vec<EventFailure> {
        std::mem::take(&mut self.event_failures)
    }

    /// Plots `id`. Nothing changes unless its positions can be extracted.
    pub fn load_positions(&mut self, id: DatasetId) -> Result<(), PluginError> {
        let (source, positions, globals) = self.extract_positions(id)?;
        self.position_dataset = Some(id);
        self.position_source = Some(source);
        self.positions = positions;
        self.global_indices = globals;
        self.point_sizes = None;
        self.point_opacities = None;
        log::debug!("loaded positions {id} ({} points)", self.positions.len());

        if let Some(colors) = self.color_dataset {
            // A failed recolor already fell back to constant coloring.
            if let Err(err) = self.set_color_dataset(colors) {
                self.record_warning(colors, id, &err);
            }
        }
        Ok(())
    }

    pub fn unload_positions(&mut self) {
        self.position_dataset = None;
        self.position_source = None;
        self.positions.clear();
        self.global_indices.clear();
        self.point_sizes = None;
        self.point_opacities = None;
        self.reset_to_constant_color();
    }

    /// Re-extracts the plotted dimensions of the position dataset.
    pub fn update_data(&mut self) -> Result<(), PluginError> {
        let Some(id) = self.position_dataset else {
            self.positions.clear();
            self.global_indices.clear();
            return Ok(());
        };
        let (_, positions, globals) = self.extract_positions(id)?;
        if positions.len() != self.positions.len() {
            self.point_sizes = None;
            self.point_opacities = None;
        }
        self.positions = positions;
        self.global_indices = globals;
        Ok(())
    }

    fn extract_positions(
        &self,
        id: DatasetId,
    ) -> Result<(DatasetId, Vec<Point2>, Vec<u32>), PluginError> {
        let registry = self.read()?;
        let points = registry.points(id).ok_or(PluginError::NotPoints(id))?;
        let positions = extract_dimensions(
            &registry,
            points,
            self.settings.x_dimension,
            self.settings.y_dimension,
        )?;
        Ok((
            registry.source_points(points).id,
            positions,
            global_indices(&registry, points),
        ))
    }

    pub fn drop_regions(&self, candidate: DatasetId) -> Result<Vec<DropRegion>, PluginError> {
        let registry = self.read()?;
        Ok(drop_regions(&registry, self.position_dataset, candidate))
    }

    /// Colors the points by a points, clusters or colors dataset.
    ///
    /// On failure the plot falls back to constant coloring and the error is
    /// returned.
    pub fn set_color_dataset(&mut self, id: DatasetId) -> Result<(), PluginError> {
        let positions = self.position_dataset.ok_or(PluginError::NoPositions)?;
        let result = self.compute_colors(id, positions);
        match result {
            Ok(colors) => {
                self.color_dataset = Some(id);
                self.colors = colors;
                if matches!(self.colors, PointColors::Scalars { .. }) {
                    self.settings.color_by = ColorBy::Data;
                }
                Ok(())
            }
            Err(err) => {
                log::warn!("coloring {positions} with {id} failed: {err}");
                self.reset_to_constant_color();
                Err(err)
            }
        }
    }

    fn compute_colors(&self, id: DatasetId, positions: DatasetId) -> Result<PointColors, PluginError> {
        let registry = self.read()?;
        match registry.get(id) {
            Some(Dataset::Points(_)) => {
                let values =
                    map_color_scalars(&registry, id, positions, self.settings.color_dimension)?;
                let range = scalar_range(&values);
                Ok(PointColors::Scalars { values, range })
            }
            Some(Dataset::Clusters(_)) => {
                Ok(PointColors::PerPoint(map_cluster_colors(&registry, id, positions)?))
            }
            Some(Dataset::Colors(colors)) => {
                if colors.colors.len() != self.positions.len() {
                    return Err(ColoringError::NoKnownMapping {
                        colors: id,
                        positions,
                    }
                    .into());
                }
                Ok(PointColors::PerPoint(colors.colors.clone()))
            }
            None => Err(PluginError::NotFound(id)),
        }
    }

    pub fn set_constant_color(&mut self, color: Rgb) {
        self.settings.constant_color = color;
        self.reset_to_constant_color();
    }

    fn reset_to_constant_color(&mut self) {
        self.color_dataset = None;
        self.settings.color_by = ColorBy::Constant;
        self.colors = PointColors::Constant(self.settings.constant_color);
    }

    pub fn set_point_size_dataset(&mut self, id: DatasetId, dimension: usize) -> Result<(), PluginError> {
        let positions = self.position_dataset.ok_or(PluginError::NoPositions)?;
        let sizes = map_point_scalars(&*self.read()?, id, positions, dimension)?;
        self.point_sizes = Some(sizes);
        Ok(())
    }

    pub fn set_point_opacity_dataset(
        &mut self,
        id: DatasetId,
        dimension: usize,
    ) -> Result<(), PluginError> {
        let positions = self.position_dataset.ok_or(PluginError::NoPositions)?;
        let opacities = map_point_scalars(&*self.read()?, id, positions, dimension)?;
        self.point_opacities = Some(opacities);
        Ok(())
    }

    /// Applies a lasso/brush mask to the selection of the positions' source
    /// and notifies listeners. Returns `None` while the selection is frozen.
    pub fn select_pixels<F>(
        &mut self,
        view: &ViewRect,
        screen: ScreenSize,
        modifier: SelectionModifier,
        aborted: bool,
        mask: F,
    ) -> Result<Option<PixelSelection>, PluginError>
    where
        F: Fn(i32, i32) -> bool,
    {
        if self.settings.freeze_selection {
            return Ok(None);
        }
        let source = self.position_source.ok_or(PluginError::NoPositions)?;
        let hit = select_points(&self.positions, &self.global_indices, view, screen, mask);

        let current = self
            .read()?
            .selection(source)
            .map(<[u32]>::to_vec)
            .unwrap_or_default();
        let combined = combine_selection(&current, hit.indices.clone(), modifier.effective(aborted));
        self.write()?.set_selection(source, combined)?;

        self.events.publish(DatasetEvent::SelectionChanged(source))?;
        Ok(Some(hit))
    }

    pub fn select_all(&mut self) -> Result<(), PluginError> {
        self.update_selection(|_, plotted| {
            plotted.iter().copied().collect::<BTreeSet<u32>>().into_iter().collect()
        })
    }

    pub fn clear_selection(&mut self) -> Result<(), PluginError> {
        self.update_selection(|_, _| Vec::new())
    }

    pub fn invert_selection(&mut self) -> Result<(), PluginError> {
        self.update_selection(invert_selection)
    }

    fn update_selection<F>(&mut self, select: F) -> Result<(), PluginError>
    where
        F: FnOnce(&[u32], &[u32]) -> Vec<u32>,
    {
        let source = self.position_source.ok_or(PluginError::NoPositions)?;
        {
            let mut registry = self.write()?;
            let current = registry.selection(source).unwrap_or_default();
            let next = select(current, &self.global_indices);
            registry.set_selection(source, next)?;
        }
        self.events.publish(DatasetEvent::SelectionChanged(source))?;
        Ok(())
    }

    /// Registers the current selection as a new subset.
    ///
    /// From the source, every selected point is taken and the subset hangs
    /// off the source. Otherwise the selection is restricted to the plotted
    /// points and the subset hangs off the position dataset.
    pub fn create_subset(&mut self, name: &str, from_source: bool) -> Result<DatasetId, PluginError> {
        let positions = self.position_dataset.ok_or(PluginError::NoPositions)?;
        let source = self.position_source.ok_or(PluginError::NoPositions)?;

        let id = {
            let mut registry = self.write()?;
            let selection = registry.selection(source).unwrap_or_default();
            let (parent, indices) = if from_source {
                (source, selection.to_vec())
            } else {
                let selected: HashSet<u32> = selection.iter().copied().collect();
                let local = self
                    .global_indices
                    .iter()
                    .enumerate()
                    .filter(|(_, global)| selected.contains(global))
                    .map(|(local, _)| local as u32)
                    .collect();
                (positions, local)
            };
            if indices.is_empty() {
                return Err(PluginError::EmptySelection);
            }
            let id = registry.next_id();
            let parent = registry.points(parent).ok_or(PluginError::NotPoints(parent))?;
            let subset = PointsDefinition::subset(id.0, name, parent, indices);
            registry.insert(subset)?
        };
        log::debug!("created subset {id} '{name}'");
        self.events.publish(DatasetEvent::Added(id))?;
        Ok(id)
    }

    /// Adds the selected source points as a named cluster.
    ///
    /// Without a target a clusters dataset is created on the positions'
    /// source and the plot is colored by it.
    pub fn add_manual_cluster(
        &mut self,
        target: Option<DatasetId>,
        name: &str,
        color: Rgb,
    ) -> Result<DatasetId, PluginError> {
        let source = self.position_source.ok_or(PluginError::NoPositions)?;
        if name.trim().is_empty() {
            return Err(PluginError::EmptyClusterName);
        }

        let (clusters, created) = {
            let mut registry = self.write()?;
            let indices = registry.selection(source).unwrap_or_default().to_vec();
            if indices.is_empty() {
                return Err(PluginError::EmptySelection);
            }

            let (clusters, created) = match target {
                Some(id) => {
                    let parent = registry
                        .clusters(id)
                        .ok_or(DatasetError::NotClusters(id))?
                        .parent;
                    let parent_source = registry
                        .points(parent)
                        .map(|points| registry.source_points(points).id);
                    if parent_source != Some(source) {
                        return Err(PluginError::UnrelatedClusters {
                            clusters: id,
                            source_id: source,
                        });
                    }
                    (id, false)
                }
                None => {
                    let id = registry.next_id();
                    registry.insert(ClustersDefinition {
                        id,
                        name: DEFAULT_CLUSTERS_NAME.to_string(),
                        parent: source,
                        clusters: Vec::new(),
                    })?;
                    (id, true)
                }
            };

            registry.add_cluster(
                clusters,
                Cluster {
                    name: name.to_string(),
                    color,
                    indices,
                },
            )?;
            (clusters, created)
        };

        if created {
            self.events.publish(DatasetEvent::Added(clusters))?;
        }
        self.events.publish(DatasetEvent::DataChanged(clusters))?;
        if created || self.color_dataset == Some(clusters) {
            self.set_color_dataset(clusters)?;
        }
        Ok(clusters)
    }

    pub fn highlights(&self) -> Result<Vec<u8>, PluginError> {
        let Some(source) = self.position_source else {
            return Ok(Vec::new());
        };
        let registry = self.read()?;
        let selection = registry.selection(source).unwrap_or_default();
        Ok(highlights(selection, &self.global_indices))
    }

    /// Drains pending dataset events and returns how many concerned this plot.
    ///
    /// An event that cannot be applied is recorded as an [`EventFailure`]
    /// and the remaining events are still processed.
    pub fn process_events(&mut self) -> Result<usize, PluginError> {
        let events = self.subscription.drain()?;
        let mut handled = 0;
        for event in events {
            match self.handle_event(event) {
                Ok(true) => handled += 1,
                Ok(false) => {}
                Err(err) => {
                    log::warn!("failed to apply {event:?}: {err}");
                    self.event_failures.push(EventFailure {
                        event,
                        message: err.to_string(),
                    });
                    handled += 1;
                }
            }
        }
        Ok(handled)
    }

    fn handle_event(&mut self, event: DatasetEvent) -> Result<bool, PluginError> {
        let id = event.dataset();
        let is_position = self.position_dataset == Some(id);
        let is_color = self.color_dataset == Some(id);

        match event {
            DatasetEvent::Removed(_) if is_position => {
                log::debug!("position dataset {id} removed, clearing plot");
                self.unload_positions();
                Ok(true)
            }
            DatasetEvent::Removed(_) if is_color => {
                self.reset_to_constant_color();
                Ok(true)
            }
            DatasetEvent::DataChanged(_) if is_position => {
                self.load_positions(id)?;
                Ok(true)
            }
            DatasetEvent::DataChanged(_) if is_color => {
                if let (Err(err), Some(positions)) =
                    (self.set_color_dataset(id), self.position_dataset)
                {
                    self.record_warning(id, positions, &err);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn record_warning(&mut self, colors: DatasetId, positions: DatasetId, err: &PluginError) {
        self.warnings.push(MappingWarning {
            colors,
            positions,
            message: err.to_string(),
        });
    }
}
