//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use everest_core::constants::{
    EVEREST_VERSION, KEPLER_LONG_CADENCE, KEPLER_SHORT_CADENCE, everest_major_minor,
};
use everest_core::formats::{
    IndexFormat, compute_blake3_hash, encode_index, index_checksum, load_index, save_index,
};
use everest_core::search::{IndexBuilder, IndexManifest, search};
use everest_core::{
    Config, Dvs, DvsOptions, EverestError, Layout, RawData, Target, mission_by_name,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a manifest file (64 MB).
const MAX_MANIFEST_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Maximum size of a layout file (64 KB).
const MAX_LAYOUT_FILE_SIZE: u64 = 64 * 1024;

/// Name of the configuration file looked up in the data directory.
pub const CONFIG_FILE_NAME: &str = "everest.toml";

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), EverestError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| EverestError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(EverestError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, EverestError> {
    let canonical = path.canonicalize().map_err(|e| {
        EverestError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(EverestError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must already exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, EverestError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        EverestError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(EverestError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| EverestError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a text file after checking its size.
fn read_text(path: &Path, max_size: u64) -> Result<String, EverestError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read_to_string(&validated)
        .map_err(|e| EverestError::IoError(format!("Cannot read '{}': {}", path.display(), e)))
}

/// Pretty JSON text of a value.
fn json_text<T: Serialize + ?Sized>(value: &T) -> Result<String, EverestError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| EverestError::SerializationError(format!("JSON output: {}", e)))
}

fn print_json(value: &serde_json::Value) -> Result<(), EverestError> {
    println!("{}", json_text(value)?);
    Ok(())
}

/// Output format requested explicitly or implied by the output extension.
fn output_format(output: &Path, format: Option<&str>) -> Result<IndexFormat, EverestError> {
    match format {
        Some(name) => name.parse(),
        None => IndexFormat::from_path(output),
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Load the configuration.
///
/// An explicit path must exist. Otherwise `everest.toml` in the data
/// directory is used when present, and the defaults when not.
pub fn load_config(path: Option<&Path>) -> Result<Config, EverestError> {
    if let Some(path) = path {
        return Config::load(path);
    }
    let candidate = Config::default().data_dir().join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        Config::load(&candidate)
    } else {
        Ok(Config::default())
    }
}

// =============================================================================
// INFO COMMAND
// =============================================================================

/// Show version, data directory and cadences.
pub fn cmd_info(config: &Config, json_mode: bool) -> Result<(), EverestError> {
    let data_dir = config.data_dir();

    if json_mode {
        print_json(&serde_json::json!({
            "version": EVEREST_VERSION,
            "major_minor": everest_major_minor(),
            "data_dir": data_dir.to_string_lossy(),
            "log_file": config.log_file().map(|p| p.to_string_lossy().into_owned()),
            "long_cadence_days": KEPLER_LONG_CADENCE,
            "short_cadence_days": KEPLER_SHORT_CADENCE,
        }))?;
        return Ok(());
    }

    println!("EVEREST v{} ({})", EVEREST_VERSION, everest_major_minor());
    println!("=================");
    println!("Data directory: {}", data_dir.display());
    if let Some(log_file) = config.log_file() {
        println!("Log file:       {}", log_file.display());
    }
    println!("Long cadence:   {:.6} d", KEPLER_LONG_CADENCE);
    println!("Short cadence:  {:.6} d", KEPLER_SHORT_CADENCE);

    Ok(())
}

// =============================================================================
// INDEX COMMANDS
// =============================================================================

/// Run the integrity checks. Fatal violations are an error.
pub fn cmd_index_validate(input: &Path, json_mode: bool, verbose: bool) -> Result<(), EverestError> {
    let index = load_index(&validate_file_path(input)?)?;
    let report = index.check();

    if json_mode {
        print_json(&serde_json::json!({
            "input": input.to_string_lossy(),
            "valid": !report.has_fatal(),
            "violations": report.violations,
        }))?;
    } else {
        println!("Search Index Integrity");
        println!("======================");
        println!("Input:    {}", input.display());
        println!("Contents: {}", index.stats());
        println!();
        let fatal = report.fatal().count();
        let warnings = report.warnings().count();
        println!("Fatal:    {}", fatal);
        println!("Warnings: {}", warnings);
        for violation in report.fatal() {
            println!("  error: {}", violation);
        }
        if verbose || fatal == 0 {
            for violation in report.warnings() {
                println!("  warning: {}", violation);
            }
        }
    }

    index.validate()
}

/// Ranked search.
pub fn cmd_index_search(
    input: &Path,
    query: &str,
    limit: usize,
    json_mode: bool,
    verbose: bool,
) -> Result<(), EverestError> {
    let index = load_index(&validate_file_path(input)?)?;
    let hits = search(&index, query);
    tracing::debug!("Query '{}' matched {} entries", query, hits.len());
    let shown: Vec<_> = hits.iter().take(limit).collect();

    if json_mode {
        print_json(&serde_json::json!({
            "query": query,
            "total": hits.len(),
            "hits": shown,
        }))?;
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results for '{}'", query);
        return Ok(());
    }

    println!("{} result(s) for '{}'", hits.len(), query);
    for hit in shown {
        let link = match &hit.anchor {
            Some(anchor) => format!("{}#{}", hit.docname, anchor),
            None => hit.docname.clone(),
        };
        println!("  [{:>3}] {}  ({})", hit.score, hit.title, link);
        if verbose {
            if let Some(description) = &hit.description {
                println!("        {}", description);
            }
        }
    }

    Ok(())
}

/// Table sizes and checksums.
pub fn cmd_index_stats(input: &Path, json_mode: bool) -> Result<(), EverestError> {
    let index = load_index(&validate_file_path(input)?)?;
    let stats = index.stats();
    let checksum = index_checksum(&index);
    let binary = encode_index(&index, IndexFormat::Binary)?;
    let blake3 = compute_blake3_hash(&binary);

    if json_mode {
        print_json(&serde_json::json!({
            "input": input.to_string_lossy(),
            "envversion": index.envversion,
            "documents": stats.documents,
            "terms": stats.terms,
            "titleterms": stats.titleterms,
            "objects": stats.objects,
            "object_types": stats.object_types,
            "checksum": checksum,
            "blake3": blake3,
        }))?;
        return Ok(());
    }

    println!("Search Index Statistics");
    println!("=======================");
    println!("Input:        {}", input.display());
    if let Some(envversion) = &index.envversion {
        println!("Env version:  {}", envversion);
    }
    println!("Documents:    {}", stats.documents);
    println!("Terms:        {}", stats.terms);
    println!("Title terms:  {}", stats.titleterms);
    println!("Objects:      {}", stats.objects);
    println!("Object types: {}", stats.object_types);
    println!("Checksum:     {:016x}", checksum);
    println!("BLAKE3:       {}", blake3);

    Ok(())
}

/// Convert an index to another format.
pub fn cmd_index_convert(
    input: &Path,
    output: &Path,
    format: Option<&str>,
) -> Result<(), EverestError> {
    let index = load_index(&validate_file_path(input)?)?;
    let format = output_format(output, format)?;
    let output = validate_output_path(output)?;
    save_index(&index, &output, format)?;
    println!(
        "Converted {} to {} ({})",
        input.display(),
        output.display(),
        format
    );
    Ok(())
}

/// Build an index from a JSON manifest.
pub fn cmd_index_build(
    manifest: &Path,
    output: &Path,
    format: Option<&str>,
    json_mode: bool,
) -> Result<(), EverestError> {
    let text = read_text(manifest, MAX_MANIFEST_FILE_SIZE)?;
    let manifest = IndexManifest::from_json_str(&text)?;
    let format = output_format(output, format)?;
    let output = validate_output_path(output)?;

    let index = IndexBuilder::from_manifest(manifest).build()?;
    index.validate()?;
    save_index(&index, &output, format)?;

    if json_mode {
        print_json(&serde_json::json!({
            "output": output.to_string_lossy(),
            "format": format.to_string(),
            "stats": index.stats(),
            "checksum": index_checksum(&index),
        }))?;
    } else {
        println!("Built {} ({})", output.display(), index.stats());
    }
    Ok(())
}

// =============================================================================
// DVS COMMAND
// =============================================================================

/// Render a DVS page, blank or filled in with a target's light curves.
pub fn cmd_dvs(
    config: &Config,
    output: &Path,
    layout: Option<&Path>,
    labels: bool,
    target: Option<&Path>,
    mission: &str,
) -> Result<(), EverestError> {
    let mut options = DvsOptions::from(&config.dvs);
    options.labels |= labels;
    if let Some(path) = layout {
        options.layout = Layout::parse(&read_text(path, MAX_LAYOUT_FILE_SIZE)?)?;
    }
    let output = validate_output_path(output)?;

    let svg = match target {
        Some(path) => {
            let raw = RawData::load(&validate_file_path(path)?)?;
            let target = Target::from_raw(raw, mission_by_name(mission)?)?;
            tracing::info!("Rendering DVS for {}", target);
            target.render_dvs(options)?
        }
        None => Dvs::new(options)?.render_svg(&[])?,
    };

    std::fs::write(&output, svg).map_err(|e| {
        EverestError::IoError(format!("Cannot write '{}': {}", output.display(), e))
    })?;
    println!("DVS written to {}", output.display());
    Ok(())
}

// =============================================================================
// DETREND COMMAND
// =============================================================================

/// De-trend a target from a raw data file and print a summary.
///
/// With `save`, the DVS page is written to the target directory and the
/// summary is appended to the target's log file.
pub fn cmd_detrend(
    config: &Config,
    input: &Path,
    mission: &str,
    save: bool,
    json_mode: bool,
) -> Result<(), EverestError> {
    let raw = RawData::load(&validate_file_path(input)?)?;
    let mut target = Target::from_raw(raw, mission_by_name(mission)?)?;
    let raw_scatter = target.scatter()?;
    target.detrend()?;
    let scatter = target.scatter()?;
    let lightcurve = target.lightcurve();

    let (dvsfile, logfile) = if save {
        let dvsfile = target.plot_dvs(config)?;
        let logfile = target.append_log(
            config,
            &[
                format!("EVEREST v{}: de-trended {}", EVEREST_VERSION, target),
                format!("  input: {}", input.display()),
                format!("  cadences: {}", lightcurve.ncads()),
                format!("  raw scatter: {:.1} ppm", raw_scatter),
                format!("  de-trended scatter: {:.1} ppm", scatter),
                format!("  dvs: {}", dvsfile.display()),
            ],
        )?;
        (Some(dvsfile), Some(logfile))
    } else {
        (None, None)
    };

    if json_mode {
        print_json(&serde_json::json!({
            "target": target.id().to_string(),
            "mission": target.mission().name(),
            "season": target.season().map(|s| s.to_string()),
            "mag": target.mag(),
            "cadences": lightcurve.ncads(),
            "aperture_pixels": target.get_aperture().npix(),
            "raw_scatter_ppm": raw_scatter,
            "scatter_ppm": scatter,
            "dvsfile": dvsfile.as_ref().map(|p| p.to_string_lossy().into_owned()),
            "logfile": logfile.as_ref().map(|p| p.to_string_lossy().into_owned()),
        }))?;
        return Ok(());
    }

    println!("{}", target);
    println!("Cadences:        {}", lightcurve.ncads());
    println!(
        "Stamp:           {} x {} ({} px in aperture)",
        lightcurve.ncols(),
        lightcurve.nrows(),
        target.get_aperture().npix()
    );
    if let Some(season) = target.season() {
        println!("Season:          {}", season);
    }
    if let Some(mag) = target.mag() {
        println!("{:<17}{:.2}", format!("{}:", target.mission().mag_str()), mag);
    }
    println!("Raw scatter:     {:.1} ppm", raw_scatter);
    println!("De-trended:      {:.1} ppm", scatter);
    if let (Some(dvsfile), Some(logfile)) = (&dvsfile, &logfile) {
        println!("DVS:             {}", dvsfile.display());
        println!("Log:             {}", logfile.display());
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn json_text_reports_serialization_failure() {
        assert!(json_text(&serde_json::json!({"ok": true})).unwrap().contains("\"ok\": true"));

        // Non-string map keys cannot be written as JSON
        let bad: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
        assert!(matches!(
            json_text(&bad),
            Err(EverestError::SerializationError(_))
        ));
    }
}
