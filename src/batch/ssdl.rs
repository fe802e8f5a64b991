//! Subsurface model outlines, faultlines, completions and perforations.

use super::rms_name;
use crate::error::WellboreError;
use crate::extractor::extract;
use crate::models::{endpoint, DrilledWellboreMetadata, SsdlAddress};
use crate::provider::wellbore_records;
use crate::table::{is_truthy, value_to_string, Record, Table};

use hashbrown::HashSet;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

const FAULT_COLUMNS: [&str; 3] = ["SEG I.D.", "geometry", "coordinates"];

/// Fluid contact outlines
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Contact {
    Owc,
    Goc,
}

impl Contact {
    fn resource(self) -> &'static str {
        match self {
            Self::Owc => "OWC",
            Self::Goc => "GOC",
        }
    }

    /// Name written to the `name` column and used as the file stem.
    pub fn outline_name(self) -> &'static str {
        match self {
            Self::Owc => "owc_outline",
            Self::Goc => "goc_outline",
        }
    }
}

/// Extract field model and wellbore data for the given wellbores.
///
/// Outlines and faultlines are written to `polygon_dir`, completions and perforations to
/// `well_dir`.
pub async fn extract_ssdl_data(
    ssdl: &SsdlAddress,
    wellbores: &DrilledWellboreMetadata,
    well_dir: &Path,
    polygon_dir: &Path,
) -> Result<(), WellboreError> {
    info!("Extracting data from SSDL");
    std::fs::create_dir_all(well_dir)?;
    std::fs::create_dir_all(polygon_dir)?;

    extract_faultline_data(ssdl, wellbores, polygon_dir).await?;
    extract_outline_data(ssdl, wellbores, polygon_dir).await?;

    info!("Extracting completions and perforations");
    extract_wellbore_data(ssdl, wellbores, "completion", "completion", well_dir).await?;
    extract_wellbore_data(ssdl, wellbores, "perforations", "perforation", well_dir).await?;
    info!("Done extracting SSDL data");
    Ok(())
}

/// Unique field uuids of the wellbores, in first-seen order.
pub fn field_uuids(wellbores: &DrilledWellboreMetadata) -> Vec<String> {
    let mut seen = HashSet::new();
    wellbores
        .field_uuid
        .iter()
        .flatten()
        .filter(|uuid| seen.insert(*uuid))
        .cloned()
        .collect()
}

/// Default models of a field.
pub async fn default_models(
    ssdl: &SsdlAddress,
    field_uuid: &str,
) -> Result<Vec<Record>, WellboreError> {
    let url = endpoint(&ssdl.api, &format!("Field/{}/model", field_uuid), &[])?;
    let models = extract(&ssdl.session, &url).await;
    Ok(models
        .first_row_records()
        .into_iter()
        .filter(|model| is_truthy(model.get("default_flag")))
        .collect())
}

fn default_model_uuid(model: &Record) -> Option<String> {
    model
        .get("model_uuid")
        .filter(|uuid| !uuid.is_null())
        .map(value_to_string)
}

/// Write the OWC and GOC outlines of the default models of the wellbores' fields.
pub async fn extract_outline_data(
    ssdl: &SsdlAddress,
    wellbores: &DrilledWellboreMetadata,
    polygon_dir: &Path,
) -> Result<(), WellboreError> {
    info!("Extracting outline data");
    let mut owc = vec![];
    let mut goc = vec![];
    for field_uuid in field_uuids(wellbores) {
        for model in default_models(ssdl, &field_uuid).await? {
            let Some(model_uuid) = default_model_uuid(&model) else {
                continue;
            };
            for (contact, outlines) in [(Contact::Owc, &mut owc), (Contact::Goc, &mut goc)] {
                let url = endpoint(
                    &ssdl.api,
                    &format!("Field/{}/outlines/{}", model_uuid, contact.resource()),
                    &[],
                )?;
                let outline = extract(&ssdl.session, &url).await;
                if !outline.is_empty() {
                    outlines.push(outline);
                }
            }
        }
    }

    for (contact, outlines) in [(Contact::Owc, owc), (Contact::Goc, goc)] {
        if outlines.is_empty() {
            info!("{} outline not found", contact.resource());
            continue;
        }
        let mut table = Table::concat(outlines);
        table.set_column("name", json!(contact.outline_name()));
        let outfile = polygon_dir.join(format!("{}.csv", contact.outline_name()));
        table.write_csv(&outfile)?;
        info!("{} outline stored in {:?}", contact.resource(), outfile);
    }
    Ok(())
}

/// Write the faultlines of the default models, which have polygons, to `faults.csv`.
pub async fn extract_faultline_data(
    ssdl: &SsdlAddress,
    wellbores: &DrilledWellboreMetadata,
    polygon_dir: &Path,
) -> Result<(), WellboreError> {
    info!("Extracting faultline data");
    let mut faults = vec![];
    for field_uuid in field_uuids(wellbores) {
        for model in default_models(ssdl, &field_uuid).await? {
            if !is_truthy(model.get("has_polygon")) {
                info!("No fault polygons found for field {}", field_uuid);
                continue;
            }
            let Some(model_uuid) = default_model_uuid(&model) else {
                continue;
            };
            let url = endpoint(&ssdl.api, &format!("Field/{}/faultlines", model_uuid), &[])?;
            let table = extract(&ssdl.session, &url).await;
            faults.extend(table.first_row_records());
        }
    }

    if faults.is_empty() {
        info!("No faultlines found");
        return Ok(());
    }
    let records = faults
        .iter()
        .map(|fault| {
            let mut record: Record = FAULT_COLUMNS
                .iter()
                .map(|column| {
                    let value = fault.get(*column).cloned().unwrap_or(Value::Null);
                    (column.to_string(), value)
                })
                .collect();
            record.insert("name".to_string(), json!("faults"));
            record
        })
        .collect();
    let outfile = polygon_dir.join("faults.csv");
    Table::from_records(records).write_csv(&outfile)?;
    info!("Faultlines stored in {:?}", outfile);
    Ok(())
}

/// Write a wellbore sub-resource to `<name>_<suffix>.csv`, without duplicate records, for every
/// wellbore that has it.
async fn extract_wellbore_data(
    ssdl: &SsdlAddress,
    wellbores: &DrilledWellboreMetadata,
    resource: &str,
    suffix: &str,
    well_dir: &Path,
) -> Result<(), WellboreError> {
    let mut stored = 0;
    for (uuid, name) in wellbores
        .uuid
        .iter()
        .zip(&wellbores.unique_wellbore_identifier)
    {
        let (Some(uuid), Some(name)) = (uuid, name) else {
            continue;
        };
        let table = wellbore_records(ssdl, uuid, resource).await?;
        if table.is_empty() {
            continue;
        }
        let outfile = well_dir.join(format!("{}_{}.csv", rms_name(name), suffix));
        table.write_csv(&outfile)?;
        stored += 1;
    }
    info!("{} {} files stored to {:?}", stored, suffix, well_dir);
    Ok(())
}
