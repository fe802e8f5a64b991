//! Planned well overview and trajectories.

use super::file_safe_name;
use crate::error::WellboreError;
use crate::models::{planned_trajectory, PozoAddress};
use crate::provider::{planned_wells, select_planned_field};
use crate::table::{value_to_string, Table};

use std::path::{Path, PathBuf};
use tracing::info;

/// Directory under the well directory holding planned well trajectories
pub const PLANNED_WELLS_DIR: &str = "Planned_wells";

/// Overview file written to the well directory
pub const OVERVIEW_FILE: &str = "planned_wells_overview.csv";

const OVERVIEW_COLUMNS: [&str; 4] = ["name", "templateName", "fieldName", "wellTypeName"];

/// Extract planned wells of the given fields.
///
/// `<well dir>/Planned_wells` is emptied, or created, and receives one trajectory file per well
/// with points. The overview of all selected wells is written to `<well dir>`. Returns the path
/// of the overview, or `None` if no planned wells were found.
pub async fn extract_planned_well_data(
    pozo: &PozoAddress,
    well_dir: &Path,
    fields: &[String],
) -> Result<Option<PathBuf>, WellboreError> {
    let planned_dir = well_dir.join(PLANNED_WELLS_DIR);
    reset_dir(&planned_dir)?;

    let wells = planned_wells(pozo).await?;
    let mut overview = vec![];
    for field in fields {
        let selected = select_planned_field(&wells, field);
        if selected.is_empty() {
            info!("No planned wells found for {}", field);
            continue;
        }
        overview.push(selected.select(&OVERVIEW_COLUMNS));
        write_trajectories(&selected, &planned_dir)?;
    }

    if overview.is_empty() {
        info!("No planned wells found");
        return Ok(None);
    }
    let outfile = well_dir.join(OVERVIEW_FILE);
    Table::concat(overview).write_csv(&outfile)?;
    info!("Planned wells overview saved as {:?}", outfile);
    Ok(Some(outfile))
}

/// Create a directory, or remove the files in it if it exists.
fn reset_dir(dir: &Path) -> Result<(), WellboreError> {
    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                std::fs::remove_file(path)?;
            }
        }
    } else {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_trajectories(wells: &Table, planned_dir: &Path) -> Result<(), WellboreError> {
    for well in wells.rows() {
        let name = well.get("name").map(value_to_string).unwrap_or_default();
        match planned_trajectory(well) {
            Some(trajectory) => {
                let outfile =
                    planned_dir.join(format!("{}_trajectory.csv", file_safe_name(&name)));
                trajectory.to_table().write_csv(&outfile)?;
                info!("Planned well trajectory written to {:?}", outfile);
            }
            None => info!("Planned well {} does not contain well points", name),
        }
    }
    Ok(())
}
