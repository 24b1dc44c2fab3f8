//! The two-dimensional grid coverage.
//!
//! A coverage couples a raster with a 2D grid geometry and one sample
//! dimension per band, and answers point queries in CRS coordinates.

use std::sync::Arc;

use coverage_common::{CoverageError, Result};
use grid_geometry::{GridGeometry2D, MathTransform};

use crate::band::SampleDimension;
use crate::interpolate::Interpolator;
use crate::raster::Raster;
use crate::transcoder::{default_strategies, TranscoderStrategy};
use crate::views::{SharingKey, ViewKind, ViewsManager};

/// What the raster's stored numbers are.
///
/// The sample dimensions always describe the packed-to-geophysics mapping;
/// this flag says which side of that mapping the raster holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataForm {
    /// Stored samples are packed values the band model applies to.
    Packed,
    /// Stored samples already are real-world values.
    Geophysics,
}

/// How a coverage came to be.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageVariant {
    /// Built directly over a raster.
    Native,
    /// Decorates another coverage with an interpolation policy.
    Interpolated(Interpolator),
    /// Produced by transcoding another coverage's samples.
    Converted {
        kind: ViewKind,
        strategy: TranscoderStrategy,
    },
}

/// A raster with a grid geometry and a band model.
#[derive(Debug)]
pub struct GridCoverage2D {
    name: String,
    raster: Arc<dyn Raster>,
    geometry: GridGeometry2D,
    sample_dimensions: Vec<SampleDimension>,
    data_form: DataForm,
    variant: CoverageVariant,
    strategies: Vec<TranscoderStrategy>,
    sources: Vec<Arc<GridCoverage2D>>,
    views: Arc<ViewsManager>,
}

impl GridCoverage2D {
    /// Build a coverage over packed samples with the default transcoding
    /// strategy table.
    pub fn new(
        name: impl Into<String>,
        raster: Arc<dyn Raster>,
        geometry: GridGeometry2D,
        sample_dimensions: Vec<SampleDimension>,
    ) -> Result<Arc<Self>> {
        Self::build(
            name.into(),
            raster,
            geometry,
            sample_dimensions,
            DataForm::Packed,
            CoverageVariant::Native,
            default_strategies(),
            Vec::new(),
            None,
        )
    }

    /// Like [`new`](Self::new) with an explicit, ordered strategy table.
    pub fn with_strategies(
        name: impl Into<String>,
        raster: Arc<dyn Raster>,
        geometry: GridGeometry2D,
        sample_dimensions: Vec<SampleDimension>,
        strategies: Vec<TranscoderStrategy>,
    ) -> Result<Arc<Self>> {
        Self::build(
            name.into(),
            raster,
            geometry,
            sample_dimensions,
            DataForm::Packed,
            CoverageVariant::Native,
            strategies,
            Vec::new(),
            None,
        )
    }

    /// Build a coverage whose raster already holds real-world values.
    pub fn geophysics(
        name: impl Into<String>,
        raster: Arc<dyn Raster>,
        geometry: GridGeometry2D,
        sample_dimensions: Vec<SampleDimension>,
    ) -> Result<Arc<Self>> {
        Self::build(
            name.into(),
            raster,
            geometry,
            sample_dimensions,
            DataForm::Geophysics,
            CoverageVariant::Native,
            default_strategies(),
            Vec::new(),
            None,
        )
    }

    /// Build a coverage derived from existing ones. When a source presents
    /// the same pixels the same way, its views manager is shared.
    pub fn derived(
        name: impl Into<String>,
        raster: Arc<dyn Raster>,
        geometry: GridGeometry2D,
        sample_dimensions: Vec<SampleDimension>,
        data_form: DataForm,
        sources: Vec<Arc<GridCoverage2D>>,
    ) -> Result<Arc<Self>> {
        let strategies = sources
            .first()
            .map(|s| s.strategies.clone())
            .unwrap_or_else(default_strategies);
        Self::build(
            name.into(),
            raster,
            geometry,
            sample_dimensions,
            data_form,
            CoverageVariant::Native,
            strategies,
            sources,
            None,
        )
    }

    /// Decorate this coverage with an interpolation policy. The result
    /// shares pixels, geometry and views with the receiver.
    pub fn interpolated(self: &Arc<Self>, interpolator: Interpolator) -> Result<Arc<Self>> {
        Self::build(
            self.name.clone(),
            self.raster.clone(),
            self.geometry.clone(),
            self.sample_dimensions.clone(),
            self.data_form,
            CoverageVariant::Interpolated(interpolator),
            self.strategies.clone(),
            vec![self.clone()],
            None,
        )
    }

    /// Constructor for transcoded views; joins an existing manager instead
    /// of searching for one.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn converted(
        name: String,
        raster: Arc<dyn Raster>,
        geometry: GridGeometry2D,
        sample_dimensions: Vec<SampleDimension>,
        data_form: DataForm,
        variant: CoverageVariant,
        sources: Vec<Arc<GridCoverage2D>>,
        strategies: Vec<TranscoderStrategy>,
        views: Arc<ViewsManager>,
    ) -> Result<Arc<Self>> {
        Self::build(
            name,
            raster,
            geometry,
            sample_dimensions,
            data_form,
            variant,
            strategies,
            sources,
            Some(views),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        name: String,
        raster: Arc<dyn Raster>,
        geometry: GridGeometry2D,
        sample_dimensions: Vec<SampleDimension>,
        data_form: DataForm,
        variant: CoverageVariant,
        strategies: Vec<TranscoderStrategy>,
        sources: Vec<Arc<GridCoverage2D>>,
        views: Option<Arc<ViewsManager>>,
    ) -> Result<Arc<Self>> {
        if sample_dimensions.len() != raster.num_bands() {
            return Err(CoverageError::mismatched_dimension(
                raster.num_bands(),
                sample_dimensions.len(),
            ));
        }
        let extent = geometry.extent_2d()?;
        if extent.size(0) != raster.width() as i64 || extent.size(1) != raster.height() as i64
        {
            return Err(CoverageError::invalid_geometry(format!(
                "extent is {}x{} cells but raster is {}x{}",
                extent.size(0),
                extent.size(1),
                raster.width(),
                raster.height()
            )));
        }

        let key = SharingKey::new(&raster, &geometry, &sample_dimensions, data_form, &strategies);
        let (views, founding) = match views {
            Some(manager) => (manager, false),
            None => match ViewsManager::find_shared(&sources, &key) {
                Some(manager) => (manager, false),
                None => (ViewsManager::new(), true),
            },
        };

        let coverage = Arc::new(Self {
            name,
            raster,
            geometry,
            sample_dimensions,
            data_form,
            variant,
            strategies,
            sources,
            views,
        });
        if founding {
            coverage.views.register_native(&coverage);
        }
        Ok(coverage)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raster(&self) -> &Arc<dyn Raster> {
        &self.raster
    }

    pub fn geometry(&self) -> &GridGeometry2D {
        &self.geometry
    }

    pub fn sample_dimensions(&self) -> &[SampleDimension] {
        &self.sample_dimensions
    }

    pub fn num_bands(&self) -> usize {
        self.sample_dimensions.len()
    }

    pub fn data_form(&self) -> DataForm {
        self.data_form
    }

    pub fn variant(&self) -> &CoverageVariant {
        &self.variant
    }

    /// Coverages this one was derived from.
    pub fn sources(&self) -> &[Arc<GridCoverage2D>] {
        &self.sources
    }

    pub fn views_manager(&self) -> &Arc<ViewsManager> {
        &self.views
    }

    pub(crate) fn sharing_key(&self) -> SharingKey {
        SharingKey::new(
            &self.raster,
            &self.geometry,
            &self.sample_dimensions,
            self.data_form,
            &self.strategies,
        )
    }

    pub(crate) fn strategies(&self) -> &[TranscoderStrategy] {
        &self.strategies
    }

    /// Evaluate all bands at a CRS position.
    ///
    /// The position maps through the inverse grid transform to raster
    /// coordinates; the coverage's interpolation policy (nearest unless
    /// decorated) produces one value per band.
    pub fn evaluate(&self, position: &[f64]) -> Result<Vec<f64>> {
        if position.len() != 2 {
            return Err(CoverageError::mismatched_dimension(2, position.len()));
        }
        let inverse = self.geometry.crs_to_grid_2d().map_err(|cause| {
            CoverageError::cannot_evaluate_caused("grid transform is not invertible", cause)
        })?;
        let grid = inverse.transform(position)?;
        let extent = self.geometry.extent_2d()?;
        let x = grid[0] - extent.low(0) as f64;
        let y = grid[1] - extent.low(1) as f64;

        let nearest = Interpolator::nearest();
        let interpolator = match &self.variant {
            CoverageVariant::Interpolated(interpolator) => interpolator,
            _ => &nearest,
        };
        (0..self.num_bands())
            .map(|band| interpolator.evaluate(self.raster.as_ref(), band, x, y, position))
            .collect()
    }

    /// Get or materialize a view of this coverage.
    pub fn view(self: &Arc<Self>, kind: ViewKind) -> Result<Arc<GridCoverage2D>> {
        self.views.view(self, kind)
    }

    /// Release this coverage family's cached views. See
    /// [`ViewsManager::dispose`].
    pub fn dispose(&self, force: bool) -> bool {
        self.views.dispose(force)
    }
}
