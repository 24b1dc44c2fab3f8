//! View management: packed, geophysics and display presentations of one
//! logical coverage, cached and shared across derived coverages.
//!
//! A manager is shared between coverages that present the same pixels with
//! the same band model; the sharing key is structural, so a decorated
//! coverage (an interpolated variant, say) joins its source's manager and
//! materializing a view twice hands back the cached instance. Cache
//! entries are weak: coverages hold their manager, never the other way
//! around, so dropping every handle to a family reclaims it without an
//! explicit dispose.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use coverage_common::{CoverageError, Result};
use grid_geometry::GridGeometry2D;

use crate::band::SampleDimension;
use crate::coverage::{CoverageVariant, DataForm, GridCoverage2D};
use crate::raster::{raster_id, Raster, SampleType};
use crate::transcoder::{select_strategy, SampleTranscoder, TranscoderStrategy};

/// The presentations a coverage can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    /// The coverage as constructed.
    Native,
    /// Raw stored samples, categories unapplied.
    Packed,
    /// Real-world values in sample dimension units.
    Geophysics,
    /// Bands carry no category semantics at all, as in a plain photo.
    Photographic,
    /// A displayable packed form; requires unsigned-representable ranges.
    Rendered,
}

/// Structural identity of a coverage for view-sharing purposes. Two
/// coverages with equal keys present the same pixels the same way.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SharingKey {
    raster: usize,
    geometry: GridGeometry2D,
    sample_dimensions: Vec<SampleDimension>,
    data_form: DataForm,
    strategies: Vec<TranscoderStrategy>,
}

impl SharingKey {
    pub(crate) fn new(
        raster: &Arc<dyn Raster>,
        geometry: &GridGeometry2D,
        sample_dimensions: &[SampleDimension],
        data_form: DataForm,
        strategies: &[TranscoderStrategy],
    ) -> Self {
        Self {
            raster: raster_id(raster),
            geometry: geometry.clone(),
            sample_dimensions: sample_dimensions.to_vec(),
            data_form,
            strategies: strategies.to_vec(),
        }
    }
}

/// Caches materialized views for one family of coverages.
///
/// Entries are weak so the cache never keeps a coverage alive; a dead
/// entry behaves like a miss and is re-materialized on demand.
pub struct ViewsManager {
    views: Mutex<HashMap<ViewKind, Weak<GridCoverage2D>>>,
}

impl fmt::Debug for ViewsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewsManager").finish_non_exhaustive()
    }
}

impl ViewsManager {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            views: Mutex::new(HashMap::new()),
        })
    }

    /// Walk the source graph breadth-first looking for a coverage with the
    /// same sharing key; its manager is reused.
    pub(crate) fn find_shared(
        sources: &[Arc<GridCoverage2D>],
        key: &SharingKey,
    ) -> Option<Arc<ViewsManager>> {
        let mut queue: VecDeque<Arc<GridCoverage2D>> = sources.iter().cloned().collect();
        let mut seen = HashSet::new();
        while let Some(coverage) = queue.pop_front() {
            if !seen.insert(Arc::as_ptr(&coverage) as usize) {
                continue;
            }
            if coverage.sharing_key() == *key {
                debug!(name = coverage.name(), "sharing views manager with source");
                return Some(coverage.views_manager().clone());
            }
            queue.extend(coverage.sources().iter().cloned());
        }
        None
    }

    /// Remember the founding coverage of this family.
    pub(crate) fn register_native(&self, coverage: &Arc<GridCoverage2D>) {
        let mut views = self.lock();
        views
            .entry(ViewKind::Native)
            .or_insert_with(|| Arc::downgrade(coverage));
    }

    /// The kind a coverage's band model naturally is.
    ///
    /// No categories anywhere means the bands carry no value semantics
    /// (photographic); all-identity categories mean stored samples already
    /// are the real values (geophysics); anything else is packed.
    pub fn classify(dimensions: &[SampleDimension]) -> ViewKind {
        if dimensions.iter().all(|d| !d.has_categories()) {
            ViewKind::Photographic
        } else if dimensions.iter().all(SampleDimension::is_identity) {
            ViewKind::Geophysics
        } else {
            ViewKind::Packed
        }
    }

    /// Get or materialize a view of `coverage`.
    ///
    /// Materialization runs under the cache lock, so concurrent requests
    /// for the same kind produce one instance.
    pub fn view(
        self: &Arc<Self>,
        coverage: &Arc<GridCoverage2D>,
        kind: ViewKind,
    ) -> Result<Arc<GridCoverage2D>> {
        let mut views = self.lock();
        if let Some(cached) = views.get(&kind).and_then(Weak::upgrade) {
            trace!(?kind, "view cache hit");
            return Ok(cached);
        }
        let materialized = self.materialize_locked(coverage, kind, &mut views)?;
        views.insert(kind, Arc::downgrade(&materialized));
        Ok(materialized)
    }

    /// Drop cached view entries. Without `force`, a view still referenced
    /// elsewhere keeps its entry; dead entries are pruned. Returns true
    /// when the cache ends up empty.
    pub fn dispose(&self, force: bool) -> bool {
        let mut views = self.lock();
        if force {
            views.clear();
            return true;
        }
        views.retain(|kind, view| {
            let referenced = view.upgrade().is_some();
            if referenced {
                trace!(?kind, "view retained, still referenced");
            }
            referenced
        });
        views.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ViewKind, Weak<GridCoverage2D>>> {
        self.views.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn materialize_locked(
        self: &Arc<Self>,
        coverage: &Arc<GridCoverage2D>,
        kind: ViewKind,
        views: &mut HashMap<ViewKind, Weak<GridCoverage2D>>,
    ) -> Result<Arc<GridCoverage2D>> {
        let dimensions = coverage.sample_dimensions();
        let native_kind = Self::classify(dimensions);
        match kind {
            ViewKind::Native => Ok(coverage.clone()),
            ViewKind::Photographic => {
                if native_kind == ViewKind::Photographic {
                    Ok(coverage.clone())
                } else {
                    Err(CoverageError::invalid_argument(
                        "photographic view requires bands without categories",
                    ))
                }
            }
            ViewKind::Geophysics => {
                if coverage.data_form() == DataForm::Geophysics
                    || native_kind != ViewKind::Packed
                {
                    return Ok(coverage.clone());
                }
                self.materialize_geophysics(coverage)
            }
            ViewKind::Packed => {
                if coverage.data_form() == DataForm::Packed
                    || native_kind != ViewKind::Packed
                {
                    return Ok(coverage.clone());
                }
                self.materialize_packed(coverage)
            }
            ViewKind::Rendered => {
                if !dimensions.iter().all(SampleDimension::fits_unsigned) {
                    return Err(CoverageError::invalid_argument(
                        "rendered view requires unsigned-representable sample ranges",
                    ));
                }
                // A rendered coverage is the packed presentation; reuse it
                // when already cached.
                if let Some(packed) = views.get(&ViewKind::Packed).and_then(Weak::upgrade) {
                    return Ok(packed);
                }
                let packed = self.materialize_locked(coverage, ViewKind::Packed, views)?;
                views.insert(ViewKind::Packed, Arc::downgrade(&packed));
                Ok(packed)
            }
        }
    }

    /// Apply the band model forward over the whole raster.
    fn materialize_geophysics(
        self: &Arc<Self>,
        coverage: &Arc<GridCoverage2D>,
    ) -> Result<Arc<GridCoverage2D>> {
        let dimensions = coverage.sample_dimensions();
        let strategies = coverage.strategies();
        let sample_type = coverage.raster().sample_type();
        let strategy = select_strategy(dimensions, sample_type, strategies);
        debug!(name = coverage.name(), ?strategy, "materializing geophysics view");
        if strategy == TranscoderStrategy::Identity {
            return Ok(coverage.clone());
        }
        let transcoder = SampleTranscoder::forward(dimensions, sample_type, strategies);
        let raster: Arc<dyn Raster> = Arc::new(
            transcoder.transcode(coverage.raster().as_ref(), SampleType::Float64)?,
        );
        GridCoverage2D::converted(
            format!("{} (geophysics)", coverage.name()),
            raster,
            coverage.geometry().clone(),
            dimensions.to_vec(),
            DataForm::Geophysics,
            CoverageVariant::Converted {
                kind: ViewKind::Geophysics,
                strategy,
            },
            vec![coverage.clone()],
            strategies.to_vec(),
            self.clone(),
        )
    }

    /// Recover stored samples from real values, preferring a declared
    /// packed source over numeric inversion.
    fn materialize_packed(
        self: &Arc<Self>,
        coverage: &Arc<GridCoverage2D>,
    ) -> Result<Arc<GridCoverage2D>> {
        let dimensions = coverage.sample_dimensions();
        for source in coverage.sources() {
            if source.data_form() == DataForm::Packed
                && source.geometry() == coverage.geometry()
                && source.sample_dimensions() == dimensions
            {
                debug!(name = source.name(), "packed view resolved from source");
                return Ok(source.clone());
            }
        }
        debug!(name = coverage.name(), "materializing packed view by inversion");
        let transcoder = SampleTranscoder::inverse(dimensions);
        // A poisoned band needs NaN storage, which no integral type has.
        let target_type = if transcoder.poisoned_bands().is_empty()
            && dimensions.iter().all(SampleDimension::fits_unsigned)
        {
            SampleType::UInt16
        } else {
            SampleType::Float64
        };
        let raster: Arc<dyn Raster> =
            Arc::new(transcoder.transcode(coverage.raster().as_ref(), target_type)?);
        GridCoverage2D::converted(
            format!("{} (packed)", coverage.name()),
            raster,
            coverage.geometry().clone(),
            dimensions.to_vec(),
            DataForm::Packed,
            CoverageVariant::Converted {
                kind: ViewKind::Packed,
                strategy: TranscoderStrategy::General,
            },
            vec![coverage.clone()],
            coverage.strategies().to_vec(),
            self.clone(),
        )
    }
}
