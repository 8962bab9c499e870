use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

pub mod lineage;
pub use lineage::{extract_dimension, extract_dimensions, global_indices, source_points, Point2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub u64);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Points,
    Clusters,
    Colors,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Source local index -> ordered target local indices.
///
/// Stored as a list of `[source, targets]` pairs: JSON object keys are
/// strings, which internally tagged datasets cannot read back as `u32`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMap(pub BTreeMap<u32, Vec<u32>>);

impl Serialize for SelectionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for SelectionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(u32, Vec<u32>)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl SelectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: u32, targets: Vec<u32>) -> Option<Vec<u32>> {
        self.0.insert(source, targets)
    }

    pub fn get(&self, source: u32) -> Option<&[u32]> {
        self.0.get(&source).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u32])> + '_ {
        self.0.iter().map(|(&source, targets)| (source, targets.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u32, Vec<u32>)> for SelectionMap {
    fn from_iter<I: IntoIterator<Item = (u32, Vec<u32>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedDataDefinition {
    pub target: DatasetId,
    pub mapping: SelectionMap,
}

impl LinkedDataDefinition {
    pub fn new(target: DatasetId, mapping: SelectionMap) -> Self {
        Self { target, mapping }
    }
}

/// Lineage of a derived point collection.
///
/// With `indices` the collection is a subset: local point `i` is parent
/// point `indices[i]` and carries no values of its own. Without indices the
/// collection is aligned point-for-point with its parent (an embedding, for
/// instance) and stores its own values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    pub parent: DatasetId,
    #[serde(default)]
    pub indices: Option<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsDefinition {
    pub id: DatasetId,
    pub name: String,
    pub num_dimensions: usize,
    #[serde(default)]
    pub values: Vec<f32>,
    #[serde(default)]
    pub derivation: Option<Derivation>,
    #[serde(default)]
    pub linked_data: Vec<LinkedDataDefinition>,
    /// Global indices, only meaningful on source datasets.
    #[serde(default)]
    pub selection: Vec<u32>,
}

impl PointsDefinition {
    /// Full dataset of `num_points` zeroed points.
    pub fn new(id: u64, name: &str, num_points: usize, num_dimensions: usize) -> Self {
        Self {
            id: DatasetId(id),
            name: name.to_string(),
            num_dimensions,
            values: vec![0.0; num_points * num_dimensions],
            derivation: None,
            linked_data: Vec::new(),
            selection: Vec::new(),
        }
    }

    pub fn from_values(id: u64, name: &str, num_dimensions: usize, values: Vec<f32>) -> Self {
        Self {
            values,
            ..Self::new(id, name, 0, num_dimensions)
        }
    }

    pub fn subset(id: u64, name: &str, parent: &PointsDefinition, indices: Vec<u32>) -> Self {
        Self {
            id: DatasetId(id),
            name: name.to_string(),
            num_dimensions: parent.num_dimensions,
            values: Vec::new(),
            derivation: Some(Derivation {
                parent: parent.id,
                indices: Some(indices),
            }),
            linked_data: Vec::new(),
            selection: Vec::new(),
        }
    }

    pub fn derived_from(mut self, parent: DatasetId) -> Self {
        self.derivation = Some(Derivation {
            parent,
            indices: None,
        });
        self
    }

    pub fn with_linked_data(mut self, target: DatasetId, mapping: SelectionMap) -> Self {
        self.linked_data
            .push(LinkedDataDefinition::new(target, mapping));
        self
    }

    pub fn num_points(&self) -> usize {
        if let Some(indices) = self.subset_indices() {
            return indices.len();
        }
        if self.num_dimensions == 0 {
            0
        } else {
            self.values.len() / self.num_dimensions
        }
    }

    pub fn is_derived(&self) -> bool {
        self.derivation.is_some()
    }

    pub fn parent(&self) -> Option<DatasetId> {
        self.derivation.as_ref().map(|d| d.parent)
    }

    pub fn subset_indices(&self) -> Option<&[u32]> {
        self.derivation
            .as_ref()
            .and_then(|d| d.indices.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub color: Rgb,
    /// Global indices into the source of the clustered points.
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClustersDefinition {
    pub id: DatasetId,
    pub name: String,
    pub parent: DatasetId,
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorsDefinition {
    pub id: DatasetId,
    pub name: String,
    pub parent: DatasetId,
    pub colors: Vec<Rgb>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dataset {
    Points(PointsDefinition),
    Clusters(ClustersDefinition),
    Colors(ColorsDefinition),
}

impl Dataset {
    pub fn id(&self) -> DatasetId {
        match self {
            Dataset::Points(points) => points.id,
            Dataset::Clusters(clusters) => clusters.id,
            Dataset::Colors(colors) => colors.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Dataset::Points(points) => &points.name,
            Dataset::Clusters(clusters) => &clusters.name,
            Dataset::Colors(colors) => &colors.name,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Dataset::Points(_) => DataType::Points,
            Dataset::Clusters(_) => DataType::Clusters,
            Dataset::Colors(_) => DataType::Colors,
        }
    }

    /// Id of the points dataset this one hangs off, if any.
    pub fn parent(&self) -> Option<DatasetId> {
        match self {
            Dataset::Points(points) => points.parent(),
            Dataset::Clusters(clusters) => Some(clusters.parent),
            Dataset::Colors(colors) => Some(colors.parent),
        }
    }
}

impl From<PointsDefinition> for Dataset {
    fn from(points: PointsDefinition) -> Self {
        Dataset::Points(points)
    }
}

impl From<ClustersDefinition> for Dataset {
    fn from(clusters: ClustersDefinition) -> Self {
        Dataset::Clusters(clusters)
    }
}

impl From<ColorsDefinition> for Dataset {
    fn from(colors: ColorsDefinition) -> Self {
        Dataset::Colors(colors)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset {0} already exists")]
    DuplicateId(DatasetId),
    #[error("dataset {0} not found")]
    NotFound(DatasetId),
    #[error("dataset {0} is not a points dataset")]
    NotPoints(DatasetId),
    #[error("dataset {0} is not a clusters dataset")]
    NotClusters(DatasetId),
    #[error("dataset {0} has values that do not fill whole points")]
    MalformedValues(DatasetId),
    #[error("subset index {index} of dataset {id} is out of range for a parent with {num_points} points")]
    SubsetIndexOutOfRange {
        id: DatasetId,
        index: u32,
        num_points: usize,
    },
    #[error("dataset {id} has {found} points but its parent has {expected}")]
    CardinalityMismatch {
        id: DatasetId,
        expected: usize,
        found: usize,
    },
    #[error("dimension {dimension} is out of range for dataset {id} with {num_dimensions} dimensions")]
    DimensionOutOfRange {
        id: DatasetId,
        dimension: usize,
        num_dimensions: usize,
    },
    #[error("dataset {0} still has dependent datasets")]
    HasDependents(DatasetId),
    #[error("derivation chain of dataset {0} does not terminate")]
    DerivationCycle(DatasetId),
    #[error("dataset registry lock poisoned")]
    Poisoned,
}

/// Registry handle injected into plugins by the host.
pub type SharedRegistry = Arc<RwLock<DatasetRegistry>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetRegistry {
    #[serde(default)]
    datasets: Vec<Dataset>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dataset> + '_ {
        self.datasets.iter()
    }

    pub fn contains(&self, id: DatasetId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: DatasetId) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id() == id)
    }

    pub fn points(&self, id: DatasetId) -> Option<&PointsDefinition> {
        match self.get(id) {
            Some(Dataset::Points(points)) => Some(points),
            _ => None,
        }
    }

    pub fn points_mut(&mut self, id: DatasetId) -> Option<&mut PointsDefinition> {
        self.datasets.iter_mut().find_map(|d| match d {
            Dataset::Points(points) if points.id == id => Some(points),
            _ => None,
        })
    }

    pub fn clusters(&self, id: DatasetId) -> Option<&ClustersDefinition> {
        match self.get(id) {
            Some(Dataset::Clusters(clusters)) => Some(clusters),
            _ => None,
        }
    }

    pub fn clusters_mut(&mut self, id: DatasetId) -> Option<&mut ClustersDefinition> {
        self.datasets.iter_mut().find_map(|d| match d {
            Dataset::Clusters(clusters) if clusters.id == id => Some(clusters),
            _ => None,
        })
    }

    pub fn colors(&self, id: DatasetId) -> Option<&ColorsDefinition> {
        match self.get(id) {
            Some(Dataset::Colors(colors)) => Some(colors),
            _ => None,
        }
    }

    pub fn parent_points(&self, points: &PointsDefinition) -> Option<&PointsDefinition> {
        points.parent().and_then(|parent| self.points(parent))
    }

    pub fn source_points<'a>(&'a self, points: &'a PointsDefinition) -> &'a PointsDefinition {
        lineage::source_points(self, points)
    }

    /// First id above every registered one.
    pub fn next_id(&self) -> DatasetId {
        DatasetId(self.datasets.iter().map(|d| d.id().0 + 1).max().unwrap_or(1))
    }

    pub fn insert(&mut self, dataset: impl Into<Dataset>) -> Result<DatasetId, DatasetError> {
        let dataset = dataset.into();
        let id = dataset.id();
        if self.contains(id) {
            return Err(DatasetError::DuplicateId(id));
        }
        self.check_dataset(&dataset)?;
        log::debug!("registered {:?} dataset {id} '{}'", dataset.data_type(), dataset.name());
        self.datasets.push(dataset);
        Ok(id)
    }

    pub fn remove(&mut self, id: DatasetId) -> Result<Dataset, DatasetError> {
        let index = self
            .datasets
            .iter()
            .position(|d| d.id() == id)
            .ok_or(DatasetError::NotFound(id))?;
        if self.datasets.iter().any(|d| d.parent() == Some(id)) {
            return Err(DatasetError::HasDependents(id));
        }
        Ok(self.datasets.remove(index))
    }

    pub fn add_linked_data(
        &mut self,
        source: DatasetId,
        linked_data: LinkedDataDefinition,
    ) -> Result<(), DatasetError> {
        let points = self
            .points_mut(source)
            .ok_or(DatasetError::NotPoints(source))?;
        points.linked_data.push(linked_data);
        Ok(())
    }

    pub fn add_cluster(&mut self, id: DatasetId, cluster: Cluster) -> Result<(), DatasetError> {
        let clusters = self
            .clusters_mut(id)
            .ok_or(DatasetError::NotClusters(id))?;
        log::debug!("adding cluster '{}' to {id}", cluster.name);
        clusters.clusters.push(cluster);
        Ok(())
    }

    pub fn selection(&self, id: DatasetId) -> Option<&[u32]> {
        self.points(id).map(|p| p.selection.as_slice())
    }

    pub fn set_selection(&mut self, id: DatasetId, indices: Vec<u32>) -> Result<(), DatasetError> {
        let points = self.points_mut(id).ok_or(DatasetError::NotPoints(id))?;
        points.selection = indices;
        Ok(())
    }

    /// Re-checks every dataset, used after loading from disk where parents
    /// may be listed after their children.
    pub fn validate(&self) -> Result<(), DatasetError> {
        for (index, dataset) in self.datasets.iter().enumerate() {
            let id = dataset.id();
            if self.datasets[..index].iter().any(|d| d.id() == id) {
                return Err(DatasetError::DuplicateId(id));
            }
            self.check_dataset(dataset)?;
            if let Dataset::Points(points) = dataset {
                lineage::check_terminates(self, points)?;
            }
        }
        Ok(())
    }

    fn expect_points_parent(&self, parent: DatasetId) -> Result<&PointsDefinition, DatasetError> {
        match self.get(parent) {
            Some(Dataset::Points(points)) => Ok(points),
            Some(_) => Err(DatasetError::NotPoints(parent)),
            None => Err(DatasetError::NotFound(parent)),
        }
    }

    fn check_dataset(&self, dataset: &Dataset) -> Result<(), DatasetError> {
        match dataset {
            Dataset::Points(points) => self.check_points(points),
            Dataset::Clusters(clusters) => self.expect_points_parent(clusters.parent).map(|_| ()),
            Dataset::Colors(colors) => {
                let parent = self.expect_points_parent(colors.parent)?;
                if parent.num_points() != colors.colors.len() {
                    return Err(DatasetError::CardinalityMismatch {
                        id: colors.id,
                        expected: parent.num_points(),
                        found: colors.colors.len(),
                    });
                }
                Ok(())
            }
        }
    }

    fn check_points(&self, points: &PointsDefinition) -> Result<(), DatasetError> {
        if points.num_dimensions > 0 && points.values.len() % points.num_dimensions != 0 {
            return Err(DatasetError::MalformedValues(points.id));
        }
        let Some(derivation) = &points.derivation else {
            return Ok(());
        };
        let parent = self.expect_points_parent(derivation.parent)?;
        match &derivation.indices {
            Some(indices) => {
                if !points.values.is_empty() {
                    return Err(DatasetError::MalformedValues(points.id));
                }
                let num_points = parent.num_points();
                if let Some(&index) = indices.iter().find(|&&i| i as usize >= num_points) {
                    return Err(DatasetError::SubsetIndexOutOfRange {
                        id: points.id,
                        index,
                        num_points,
                    });
                }
            }
            None => {
                if parent.num_points() != points.num_points() {
                    return Err(DatasetError::CardinalityMismatch {
                        id: points.id,
                        expected: parent.num_points(),
                        found: points.num_points(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let data = fs::read(path)?;
        let registry: DatasetRegistry = serde_json::from_slice(&data)?;
        registry.validate()?;
        Ok(registry)
    }
}
