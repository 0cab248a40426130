//! Multi-day raster loading.

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, warn};

use reanalysis_common::{Raster, RasterError, RasterResult, TimeRange};

use crate::catalog::VariableCatalog;
use crate::locator::{DailyFileLocator, FileLocator};
use crate::reader::{RasterReader, ZarrDayReader};

/// Loads per-day files and concatenates them along time.
///
/// The loader holds no state between calls; every load re-reads storage.
pub struct RasterLoader {
    locator: Box<dyn FileLocator>,
    reader: Box<dyn RasterReader>,
    catalog: VariableCatalog,
    parallel: bool,
}

impl RasterLoader {
    pub fn new(
        locator: Box<dyn FileLocator>,
        reader: Box<dyn RasterReader>,
        catalog: VariableCatalog,
    ) -> Self {
        Self {
            locator,
            reader,
            catalog,
            parallel: false,
        }
    }

    /// Loader for Zarr day stores under `root` with the ERA5 catalog.
    pub fn zarr(root: impl Into<PathBuf>, resolution: f64) -> Self {
        Self::new(
            Box::new(DailyFileLocator::zarr(root)),
            Box::new(ZarrDayReader::new(resolution)),
            VariableCatalog::era5(),
        )
    }

    /// Read the days of a range on the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load exactly one day file.
    ///
    /// The returned raster holds a single variable keyed by its short name.
    pub fn load_single_day(&self, variable: &str, day: NaiveDate) -> RasterResult<Raster> {
        let short_name = self.catalog.short_name(variable)?;
        self.read_day(variable, short_name, day)
    }

    /// Load every calendar day touched by `range` and concatenate in day order.
    ///
    /// Fails on the first missing or unreadable day; nothing partial is
    /// returned. Time samples outside `range` are kept; trimming them is the
    /// selector's job.
    pub fn load_range(&self, variable: &str, range: &TimeRange) -> RasterResult<Raster> {
        let short_name = self.catalog.short_name(variable)?;
        let days = range.days();
        let start = Instant::now();

        let results: Vec<RasterResult<Raster>> = if self.parallel {
            days.par_iter()
                .map(|day| self.read_day(variable, short_name, *day))
                .collect()
        } else {
            // Stop at the first failure instead of reading the rest.
            let mut out = Vec::with_capacity(days.len());
            for day in &days {
                let result = self.read_day(variable, short_name, *day);
                let failed = result.is_err();
                out.push(result);
                if failed {
                    break;
                }
            }
            out
        };

        let parts = results.into_iter().collect::<RasterResult<Vec<Raster>>>()?;
        self.check_parts(variable, &days, &parts)?;

        let raster = Raster::concat_time(parts)?;
        debug!(
            variable = variable,
            days = days.len(),
            times = raster.times().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded day range"
        );
        Ok(raster)
    }

    fn read_day(&self, variable: &str, short_name: &str, day: NaiveDate) -> RasterResult<Raster> {
        let path = self.locator.locate(variable, day);
        debug!(path = %path.display(), format = self.reader.format_name(), "Reading day file");
        self.reader.read(&path, short_name)
    }

    /// Grid consistency across days, plus a warning for overlapping time.
    fn check_parts(&self, variable: &str, days: &[NaiveDate], parts: &[Raster]) -> RasterResult<()> {
        let Some(first) = parts.first() else {
            return Ok(());
        };

        for (day, part) in days.iter().zip(parts).skip(1) {
            if part.latitudes() != first.latitudes() || part.longitudes() != first.longitudes() {
                let path = self.locator.locate(variable, *day);
                return Err(RasterError::format(format!(
                    "{}: latitude/longitude grid differs from {}",
                    path.display(),
                    days[0]
                )));
            }
        }

        for (pair, day) in parts.windows(2).zip(days.iter().skip(1)) {
            let (Some(prev_last), Some(next_first)) = (pair[0].times().last(), pair[1].times().first())
            else {
                continue;
            };
            if next_first <= prev_last {
                warn!(
                    variable = variable,
                    day = %day,
                    previous_last = %prev_last,
                    next_first = %next_first,
                    "Overlapping timestamps between consecutive day files"
                );
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RasterLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterLoader")
            .field("reader", &self.reader.format_name())
            .field("variables", &self.catalog.len())
            .field("parallel", &self.parallel)
            .finish()
    }
}
