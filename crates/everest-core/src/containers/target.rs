//! Targets: a star, its light curve and everything derived from it.

use super::{Aperture, RawData, TimeSeries};
use crate::config::ensure_dir;
use crate::constants::{EVEREST_VERSION, KEPLER_LONG_CADENCE};
use crate::dvs::{Dvs, DvsOptions, Layout, Panel};
use crate::mission::Mission;
use crate::{Config, EverestError, Season, TargetId, pld};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;

/// All the information, data and attributes of a star de-trended with EVEREST.
#[derive(Debug)]
pub struct Target {
    id: TargetId,
    season: Option<Season>,
    mag: Option<f64>,
    cadence: f64,
    lightcurve: TimeSeries,
    aperture: Option<Aperture>,
    model: Option<Vec<f64>>,
    dvs_layout: Layout,
    mission: Box<dyn Mission>,
}

impl Target {
    /// Create a target with no data, observed at long cadence.
    #[must_use]
    pub fn new(id: impl Into<TargetId>, mission: Box<dyn Mission>) -> Self {
        Self {
            id: id.into(),
            season: None,
            mag: None,
            cadence: KEPLER_LONG_CADENCE,
            lightcurve: TimeSeries::default(),
            aperture: None,
            model: None,
            dvs_layout: Layout::default(),
            mission,
        }
    }

    /// Create a target from a raw data record.
    pub fn from_raw(raw: RawData, mission: Box<dyn Mission>) -> Result<Self, EverestError> {
        let mut target = Self::new(raw.id.clone(), mission);
        target.apply_raw(raw)?;
        Ok(target)
    }

    /// Set the season, quarter or campaign.
    #[must_use]
    pub fn with_season(mut self, season: Season) -> Self {
        self.season = Some(season);
        self
    }

    /// Set the magnitude in the mission band.
    #[must_use]
    pub fn with_mag(mut self, mag: f64) -> Self {
        self.mag = Some(mag);
        self
    }

    /// Set the observation cadence, in days.
    #[must_use]
    pub fn with_cadence(mut self, cadence: f64) -> Self {
        self.cadence = cadence;
        self
    }

    /// Replace the light curve. Any previous model is discarded.
    #[must_use]
    pub fn with_lightcurve(mut self, lightcurve: TimeSeries) -> Self {
        self.lightcurve = lightcurve;
        self.model = None;
        self
    }

    /// Use an explicit photometric aperture.
    #[must_use]
    pub fn with_aperture(mut self, aperture: Aperture) -> Self {
        self.aperture = Some(aperture);
        self
    }

    /// Use a custom DVS page layout.
    #[must_use]
    pub fn with_dvs_layout(mut self, layout: Layout) -> Self {
        self.dvs_layout = layout;
        self
    }

    // ------------------
    // Generic properties
    // ------------------

    /// Identifier of this target.
    #[must_use]
    pub fn id(&self) -> &TargetId {
        &self.id
    }

    /// Season, quarter or campaign of the observation.
    #[must_use]
    pub fn season(&self) -> Option<Season> {
        self.season
    }

    /// Magnitude in the mission band.
    #[must_use]
    pub fn mag(&self) -> Option<f64> {
        self.mag
    }

    /// Observation cadence in days.
    #[must_use]
    pub fn cadence(&self) -> f64 {
        self.cadence
    }

    /// The mission that observed this target.
    #[must_use]
    pub fn mission(&self) -> &dyn Mission {
        self.mission.as_ref()
    }

    // ------------------
    // Light curve stuff
    // ------------------

    #[must_use]
    pub fn lightcurve(&self) -> &TimeSeries {
        &self.lightcurve
    }

    /// The time array.
    #[must_use]
    pub fn time(&self) -> &[f64] {
        self.lightcurve.time()
    }

    /// The explicit aperture, if one was set.
    #[must_use]
    pub fn aperture(&self) -> Option<&Aperture> {
        self.aperture.as_ref()
    }

    /// The aperture used for photometry: the explicit one or the full stamp.
    #[must_use]
    pub fn get_aperture(&self) -> Aperture {
        match &self.aperture {
            Some(ap) => ap.clone(),
            None => Aperture::full(self.lightcurve.ncols(), self.lightcurve.nrows()),
        }
    }

    /// The raw SAP flux inside the aperture.
    pub fn raw(&self) -> Result<Vec<f64>, EverestError> {
        self.lightcurve.sap_flux(Some(&self.get_aperture()))
    }

    /// The de-trended flux: raw flux minus the model, or the raw flux
    /// before de-trending.
    pub fn flux(&self) -> Result<Vec<f64>, EverestError> {
        let raw = self.raw()?;
        match &self.model {
            Some(model) => Ok(raw.iter().zip(model).map(|(f, m)| f - m).collect()),
            None => Ok(raw),
        }
    }

    /// The systematics model, once de-trended.
    #[must_use]
    pub fn model(&self) -> Option<&[f64]> {
        self.model.as_deref()
    }

    /// Assign the systematics model. Its length must match the cadences.
    pub fn set_model(&mut self, model: Vec<f64>) -> Result<(), EverestError> {
        if model.len() != self.lightcurve.ncads() {
            return Err(EverestError::InvalidShape(format!(
                "model has {} values for {} cadences",
                model.len(),
                self.lightcurve.ncads()
            )));
        }
        self.model = Some(model);
        Ok(())
    }

    /// The DVS layout used by [`Target::plot_dvs`].
    #[must_use]
    pub fn dvs_layout(&self) -> &Layout {
        &self.dvs_layout
    }

    // ------------------
    // Paths
    // ------------------

    /// Directory holding this target's products.
    #[must_use]
    pub fn path(&self, config: &Config) -> PathBuf {
        self.mission.path(config).join(self.id.file_stem())
    }

    /// The DVS file.
    #[must_use]
    pub fn dvsfile(&self, config: &Config) -> PathBuf {
        self.path(config)
            .join(format!("{}_dvs.svg", self.id.file_stem()))
    }

    /// The log file.
    #[must_use]
    pub fn logfile(&self, config: &Config) -> PathBuf {
        self.path(config).join(format!("{}.log", self.id.file_stem()))
    }

    /// The cached raw data file.
    #[must_use]
    pub fn rawfile(&self, config: &Config) -> PathBuf {
        self.path(config)
            .join(format!("{}_raw.json", self.id.file_stem()))
    }

    // ------------------
    // Main functions
    // ------------------

    /// Load the raw data: from the cached file when present, otherwise from
    /// the mission.
    pub fn get_raw_data(&mut self, config: &Config) -> Result<(), EverestError> {
        let rawfile = self.rawfile(config);
        let raw = if rawfile.is_file() {
            tracing::info!("Loading raw data from {}", rawfile.display());
            RawData::load(&rawfile)?
        } else {
            tracing::info!("Downloading raw data for {} target {}", self.mission.name(), self.id);
            let raw = self.mission.download(&self.id)?;
            ensure_dir(&self.path(config))?;
            raw.save(&rawfile)?;
            raw
        };
        self.apply_raw(raw)
    }

    /// Write the current light curve to the cached raw data file.
    pub fn save_raw_data(&self, config: &Config) -> Result<PathBuf, EverestError> {
        let mut raw = RawData::from_lightcurve(self.id.clone(), &self.lightcurve);
        raw.season = self.season;
        raw.mag = self.mag;
        raw.cadence = Some(self.cadence);
        raw.aperture = self.aperture.clone();

        ensure_dir(&self.path(config))?;
        let rawfile = self.rawfile(config);
        raw.save(&rawfile)?;
        Ok(rawfile)
    }

    /// De-trend the light curve via [`pld::detrend`].
    pub fn detrend(&mut self) -> Result<(), EverestError> {
        pld::detrend(self)
    }

    /// Scatter metric of the (de-trended) flux, in ppm.
    pub fn scatter(&self) -> Result<f64, EverestError> {
        self.mission.scatter(self.time(), &self.flux()?)
    }

    /// Render the data validation summary and write it to [`Target::dvsfile`].
    pub fn plot_dvs(&self, config: &Config) -> Result<PathBuf, EverestError> {
        let svg = self.render_dvs(DvsOptions {
            layout: self.dvs_layout.clone(),
            ..DvsOptions::from(&config.dvs)
        })?;
        ensure_dir(&self.path(config))?;
        let dvsfile = self.dvsfile(config);
        std::fs::write(&dvsfile, svg).map_err(|e| {
            EverestError::IoError(format!("Cannot write '{}': {}", dvsfile.display(), e))
        })?;
        tracing::info!("DVS written to {}", dvsfile.display());
        Ok(dvsfile)
    }

    /// Append lines to [`Target::logfile`], creating the target directory.
    pub fn append_log(&self, config: &Config, lines: &[String]) -> Result<PathBuf, EverestError> {
        ensure_dir(&self.path(config))?;
        let logfile = self.logfile(config);
        let io_err =
            |e: std::io::Error| EverestError::IoError(format!("'{}': {}", logfile.display(), e));
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logfile)
            .map_err(io_err)?;
        for line in lines {
            writeln!(file, "{}", line).map_err(io_err)?;
        }
        tracing::debug!("Appended {} lines to {}", lines.len(), logfile.display());
        Ok(logfile)
    }

    /// Render the data validation summary as SVG.
    ///
    /// The header, raw and de-trended cells and the footer are filled in;
    /// other cells stay blank.
    pub fn render_dvs(&self, options: DvsOptions) -> Result<String, EverestError> {
        let dvs = Dvs::new(options)?;

        let mut panels = Vec::new();
        if let Some(header) = dvs.header() {
            panels.push((header.extent.n, Panel::Text(self.header_lines())));
        }
        if let Some(raw) = dvs.raw() {
            panels.push((
                raw.extent.n,
                Panel::Curve {
                    x: self.time().to_vec(),
                    y: self.raw()?,
                    label: Some("Raw".to_string()),
                },
            ));
        }
        if let Some(detrended) = dvs.detrended() {
            panels.push((
                detrended.extent.n,
                Panel::Curve {
                    x: self.time().to_vec(),
                    y: self.flux()?,
                    label: Some("De-trended".to_string()),
                },
            ));
        }
        if let Some(footer) = dvs.footer() {
            panels.push((
                footer.extent.n,
                Panel::Text(vec![format!("EVEREST v{}", EVEREST_VERSION)]),
            ));
        }

        dvs.render_svg(&panels)
    }

    fn header_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{} {}", self.mission.name(), self.id)];
        if let Some(season) = self.season {
            lines.push(format!("Season {}", season));
        }
        if let Some(mag) = self.mag {
            lines.push(format!("{} = {:.2}", self.mission.mag_str(), mag));
        }
        match self.scatter() {
            Ok(scatter) => lines.push(format!("Scatter: {:.1} ppm", scatter)),
            Err(e) => tracing::debug!("No scatter in DVS header of {}: {}", self.id, e),
        }
        lines
    }

    fn apply_raw(&mut self, raw: RawData) -> Result<(), EverestError> {
        let lightcurve = raw.lightcurve()?;
        if let Some(ap) = &raw.aperture {
            ap.check_shape(lightcurve.ncols(), lightcurve.nrows())?;
        }
        self.lightcurve = lightcurve;
        self.model = None;
        self.aperture = raw.aperture;
        if raw.season.is_some() {
            self.season = raw.season;
        }
        if raw.mag.is_some() {
            self.mag = raw.mag;
        }
        if let Some(cadence) = raw.cadence {
            self.cadence = cadence;
        }
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} Target: {}>", self.mission.name(), self.id)
    }
}
