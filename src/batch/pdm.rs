//! Daily production and injection volumes.
//!
//! Volumes are fetched per wellbore into fragments under `<production dir>/tmp`, each with a
//! completion record, so that an interrupted run can be restarted and only fetches what is
//! missing. Once every fragment is complete they are consolidated into one file per category
//! and the update marker is written.

use super::file_safe_name;
use crate::checkpoint::{remove_fragment, write_atomic, write_fragment, Checkpoint};
use crate::error::WellboreError;
use crate::extractor::{fetch, Extracted};
use crate::models::{endpoint, PdmAddress};
use crate::provider::list_production_wellbores;
use crate::table::Table;

use std::path::{Path, PathBuf};
use strum_macros::Display;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// Name of the update marker written to the production directory
pub const UPDATE_MARKER: &str = ".production_update.yaml";

const TMP_DIR: &str = "tmp";
const EARLIEST_DATE: &str = "1900-01-01";

/// Category of daily volumes
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum VolumeKind {
    Production,
    Injection,
}

impl VolumeKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Production => "prod",
            Self::Injection => "inj",
        }
    }

    fn resource(self) -> &'static str {
        match self {
            Self::Production => "WellBoreProdDay",
            Self::Injection => "WellBoreInjDay",
        }
    }

    fn top(self) -> &'static str {
        match self {
            Self::Production => "200000",
            Self::Injection => "20000",
        }
    }

    /// Columns kept from the volume records.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Production => &[
                "WB_UWBI",
                "GOV_WB_NAME",
                "WELL_UWI",
                "PROD_DAY",
                "WB_OIL_VOL_SM3",
                "WB_GAS_VOL_SM3",
                "WB_WATER_VOL_M3",
                "GOV_FIELD_NAME",
            ],
            Self::Injection => &[
                "WB_UWBI",
                "PROD_DAY",
                "GOV_FIELD_NAME",
                "GOV_WB_NAME",
                "WELL_UWI",
                "INJ_TYPE",
                "WB_INJ_VOL",
            ],
        }
    }

    /// Name of the consolidated file.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Production => "daily_production_volumes.csv",
            Self::Injection => "daily_injection_volumes.csv",
        }
    }

    /// Path of the fragment holding one wellbore's volumes.
    pub fn fragment(self, tmp_dir: &Path, wellbore: &str) -> PathBuf {
        tmp_dir.join(format!("{}_{}.csv", self.prefix(), file_safe_name(wellbore)))
    }

    fn is_fragment(self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| {
                name.starts_with(&format!("{}_", self.prefix())) && name.ends_with(".csv")
            })
    }
}

/// Contents of the update marker
#[derive(Clone, Debug, PartialEq)]
pub struct ProductionUpdate {
    pub start_date: String,
    pub last_date: String,
    pub update_time: String,
}

impl ProductionUpdate {
    pub fn to_yaml(&self) -> String {
        format!(
            "- production:\n   start_date: {}\n   last_date: {}\n   update_time: {}\n",
            self.start_date, self.last_date, self.update_time
        )
    }
}

/// Extract production and injection volumes for the wellbores of the given fields.
///
/// A failed listing or volume request aborts the run. Fragments completed before the failure
/// are kept, and a rerun fetches only the remaining wellbores. Returns `None` if the fields have
/// no production wellbores.
pub async fn extract_pdm_data(
    pdm: &PdmAddress,
    fields: &[String],
    production_dir: &Path,
) -> Result<Option<ProductionUpdate>, WellboreError> {
    info!("Extracting production/injection wellbores from PDM");
    let wellbores = select_wellbores(pdm, fields).await?;
    if wellbores.is_empty() {
        warn!("No production/injection wells found");
        return Ok(None);
    }

    let tmp_dir = production_dir.join(TMP_DIR);
    std::fs::create_dir_all(&tmp_dir)?;
    for kind in [VolumeKind::Production, VolumeKind::Injection] {
        info!("Extracting {} volumes", kind);
        extract_volumes(pdm, &wellbores, kind, &tmp_dir).await?;
    }

    info!("Updating production data");
    let update = update_production_data(production_dir, OffsetDateTime::now_utc())?;
    info!("Done extracting data from PDM");
    Ok(Some(update))
}

/// Wellbores with production data in any of the fields, in listing order.
pub async fn select_wellbores(
    pdm: &PdmAddress,
    fields: &[String],
) -> Result<Vec<String>, WellboreError> {
    let mut wellbores = vec![];
    for field in fields {
        wellbores.extend(list_production_wellbores(pdm, field).await?);
    }
    info!("Production/injection wellbores: {}", wellbores.len());
    Ok(wellbores)
}

/// Fetch the volumes of each wellbore into its fragment, skipping completed fragments.
pub async fn extract_volumes(
    pdm: &PdmAddress,
    wellbores: &[String],
    kind: VolumeKind,
    tmp_dir: &Path,
) -> Result<(), WellboreError> {
    for wellbore in wellbores {
        let fragment = kind.fragment(tmp_dir, wellbore);
        if Checkpoint::is_satisfied(&fragment) {
            debug!("{} data for {} already extracted", kind, wellbore);
            continue;
        }

        let url = endpoint(
            &pdm.api,
            kind.resource(),
            &[("top", kind.top()), ("WB_UWBI", wellbore.as_str())],
        )?;
        let table = match fetch(&pdm.session, &url).await? {
            Extracted::Table(table) => table,
            Extracted::Malformed => {
                warn!("No valid data extracted from endpoint {}", url);
                Table::new()
            }
            Extracted::NotFound => {
                return Err(WellboreError::FetchFailed {
                    endpoint: url.to_string(),
                    status: 404,
                })
            }
            Extracted::Unavailable { status, .. } => {
                return Err(WellboreError::FetchFailed {
                    endpoint: url.to_string(),
                    status: status.as_u16(),
                })
            }
        };

        let mut selected = table.select(kind.columns());
        selected.dedup();
        remove_fragment(&fragment)?;
        let checkpoint = write_fragment(&fragment, &selected)?;
        if checkpoint.rows > 0 {
            info!("{} data stored in {:?}", kind, fragment);
        }
    }
    Ok(())
}

fn fragments(tmp_dir: &Path, kind: VolumeKind) -> Result<Vec<PathBuf>, WellboreError> {
    let mut paths = vec![];
    if !tmp_dir.is_dir() {
        return Ok(paths);
    }
    for entry in std::fs::read_dir(tmp_dir)? {
        let path = entry?.path();
        if kind.is_fragment(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn date_prefix(value: &str) -> String {
    value.chars().take(10).collect()
}

/// Consolidate the fragments under `<production dir>/tmp` into one file per category, remove
/// them and write the update marker.
///
/// The recorded dates span the days covered by every category: `start_date` is the latest of
/// the categories' first days, but not before 1900-01-01, and `last_date` is the earliest of
/// their last days, but not after the date of `now`.
pub fn update_production_data(
    production_dir: &Path,
    now: OffsetDateTime,
) -> Result<ProductionUpdate, WellboreError> {
    let tmp_dir = production_dir.join(TMP_DIR);
    let today = now.format(format_description!("[year]-[month]-[day]"))?;
    let update_time = now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))?;
    let mut start_date = EARLIEST_DATE.to_string();
    let mut last_date = today;

    for kind in [VolumeKind::Production, VolumeKind::Injection] {
        let paths = fragments(&tmp_dir, kind)?;
        let mut tables = vec![];
        for path in &paths {
            tables.push(Table::read_csv(path)?);
        }
        let mut all = Table::concat(tables);
        if all.columns().is_empty() {
            all = all.select(kind.columns());
        }
        all.sort_by_columns(&["WB_UWBI", "PROD_DAY"]);

        let outfile = production_dir.join(kind.file_name());
        write_atomic(&outfile, &all.to_csv_bytes()?)?;
        info!("{} data stored in file {:?}", kind, outfile);

        if let Some(min_date) = all.min_string("PROD_DAY") {
            start_date = date_prefix(&start_date.max(min_date));
        }
        if let Some(max_date) = all.max_string("PROD_DAY") {
            last_date = date_prefix(&last_date.min(max_date));
        }

        for path in paths {
            std::fs::remove_file(path)?;
        }
    }
    if tmp_dir.exists() {
        std::fs::remove_dir_all(&tmp_dir)?;
    }

    let update = ProductionUpdate {
        start_date,
        last_date,
        update_time,
    };
    let marker = production_dir.join(UPDATE_MARKER);
    write_atomic(&marker, update.to_yaml().as_bytes())?;
    info!("Update date saved to file {:?}", marker);
    Ok(update)
}
