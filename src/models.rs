//! Backend addresses, query arguments and the records returned by the providers.

use crate::error::WellboreError;
use crate::session::Session;
use crate::table::{value_to_f64, Record, Table};

use ndarray::Array1;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;
use validator::{Validate, ValidationError};

/// Page size of wellbore listings. Only the first page is requested.
pub const MAX_ITEMS: usize = 2000;

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Join a relative path onto an API base URL and append query parameters.
pub fn endpoint(api: &Url, path: &str, query: &[(&str, &str)]) -> Result<Url, WellboreError> {
    let mut url = api.join(path)?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Location of the well master data API
#[derive(Clone, Debug)]
pub struct SmdaAddress {
    pub api: Url,
    pub session: Session,
}

impl SmdaAddress {
    pub fn new(api: Url, session: Session) -> Self {
        Self {
            api: with_trailing_slash(api),
            session,
        }
    }
}

macro_rules! field_address {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            pub api: Url,
            pub session: Session,
            /// Field the address is scoped to
            pub field_identifier: String,
        }

        impl $name {
            pub fn new(api: Url, session: Session, field_identifier: &str) -> Self {
                Self {
                    api: with_trailing_slash(api),
                    session,
                    field_identifier: field_identifier.to_string(),
                }
            }
        }
    };
}

field_address!(
    /// Location of the planned wells API
    PozoAddress
);
field_address!(
    /// Location of the production data API
    PdmAddress
);
field_address!(
    /// Location of the subsurface data API
    SsdlAddress
);

/// Selection of drilled wellbores by field or by license. Exactly one must be given.
#[derive(Debug, Validate)]
#[validate(schema(function = "validate_wellbore_filter"))]
pub struct WellboreFilter {
    #[validate(length(min = 1, message = "field must not be empty"))]
    pub field: Option<String>,
    #[validate(length(min = 1, message = "license must not be empty"))]
    pub license: Option<String>,
}

impl WellboreFilter {
    pub fn new(field: Option<&str>, license: Option<&str>) -> Self {
        Self {
            field: field.map(str::to_string),
            license: license.map(str::to_string),
        }
    }

    /// Query parameter name and value selecting the wellbores.
    pub fn criterion(&self) -> Option<(&'static str, &str)> {
        match (&self.field, &self.license) {
            (Some(field), None) => Some(("field_identifier", field)),
            (None, Some(license)) => Some(("license_identifier", license)),
            _ => None,
        }
    }
}

fn validate_wellbore_filter(filter: &WellboreFilter) -> Result<(), ValidationError> {
    match (&filter.field, &filter.license) {
        (None, None) => Err(ValidationError::new(
            "either field or license must be specified",
        )),
        (Some(field), Some(license)) => {
            let mut error = ValidationError::new("only one of field and license may be specified");
            error.add_param("field".into(), field);
            error.add_param("license".into(), license);
            Err(error)
        }
        _ => Ok(()),
    }
}

/// Arguments of a trajectory query
#[derive(Debug, Validate)]
#[validate(schema(function = "validate_trajectory_query"))]
pub struct TrajectoryQuery {
    #[validate(custom = "validate_wellbore_name")]
    pub wellbore_name: String,
    pub md_min: f64,
    pub md_max: Option<f64>,
}

fn validate_wellbore_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("wellbore name must not be blank"));
    }
    Ok(())
}

fn validate_trajectory_query(query: &TrajectoryQuery) -> Result<(), ValidationError> {
    if query.md_min.is_nan() || query.md_max.map_or(false, f64::is_nan) {
        return Err(ValidationError::new("measured depth limits must be numbers"));
    }
    Ok(())
}

/// Metadata of drilled wellbores, one entry per wellbore in every column
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DrilledWellboreMetadata {
    pub uuid: Vec<Option<String>>,
    pub unique_wellbore_identifier: Vec<Option<String>>,
    pub unique_well_identifier: Vec<Option<String>>,
    pub purpose: Vec<Option<String>>,
    pub status: Vec<Option<String>>,
    pub content: Vec<Option<String>>,
    pub field_identifier: Vec<Option<String>>,
    pub field_uuid: Vec<Option<String>>,
    pub completion_date: Vec<Option<String>>,
    pub license_identifier: Vec<Option<String>>,
}

impl DrilledWellboreMetadata {
    pub fn from_table(table: &Table) -> Self {
        Self {
            uuid: table.column_strings("uuid"),
            unique_wellbore_identifier: table.column_strings("unique_wellbore_identifier"),
            unique_well_identifier: table.column_strings("unique_well_identifier"),
            purpose: table.column_strings("purpose"),
            status: table.column_strings("status"),
            content: table.column_strings("content"),
            field_identifier: table.column_strings("field_identifier"),
            field_uuid: table.column_strings("field_uuid"),
            completion_date: table.column_strings("completion_date"),
            license_identifier: table.column_strings("license_identifier"),
        }
    }

    pub fn len(&self) -> usize {
        self.uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uuid.is_empty()
    }

    /// Wellbore names, skipping missing ones.
    pub fn names(&self) -> Vec<String> {
        self.unique_wellbore_identifier
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Append the wellbores of another listing.
    pub fn extend(&mut self, other: DrilledWellboreMetadata) {
        self.uuid.extend(other.uuid);
        self.unique_wellbore_identifier
            .extend(other.unique_wellbore_identifier);
        self.unique_well_identifier.extend(other.unique_well_identifier);
        self.purpose.extend(other.purpose);
        self.status.extend(other.status);
        self.content.extend(other.content);
        self.field_identifier.extend(other.field_identifier);
        self.field_uuid.extend(other.field_uuid);
        self.completion_date.extend(other.completion_date);
        self.license_identifier.extend(other.license_identifier);
    }
}

/// A wellbore path. All arrays have the same length and are ordered by measured depth.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub coordinate_system: Option<String>,
    /// Easting
    pub x_arr: Array1<f64>,
    /// Northing
    pub y_arr: Array1<f64>,
    /// True vertical depth below mean sea level
    pub z_arr: Array1<f64>,
    /// Measured depth
    pub md_arr: Array1<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.md_arr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.md_arr.is_empty()
    }

    /// The trajectory as a table with `EASTING`, `NORTHING`, `TVDMSL` and `MD` columns.
    pub fn to_table(&self) -> Table {
        let records = (0..self.len())
            .filter_map(|i| {
                json!({
                    "EASTING": self.x_arr[i],
                    "NORTHING": self.y_arr[i],
                    "TVDMSL": self.z_arr[i],
                    "MD": self.md_arr[i],
                })
                .as_object()
                .cloned()
            })
            .collect();
        Table::from_records(records)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "coordinate_system": self.coordinate_system,
            "x_arr": self.x_arr.to_vec(),
            "y_arr": self.y_arr.to_vec(),
            "z_arr": self.z_arr.to_vec(),
            "md_arr": self.md_arr.to_vec(),
        })
    }
}

/// Build a trajectory from survey samples with `easting`, `northing`, `tvd_msl` and `md` columns.
///
/// Samples are sorted by measured depth, missing depths last. When `md_min` is positive only
/// samples with `md_min <= md`, and `md <= md_max` if given, are kept. Otherwise all samples are
/// kept and `md_max` is ignored. Returns `None` if no samples remain.
pub fn select_trajectory(
    samples: &Table,
    coordinate_system: Option<String>,
    md_min: f64,
    md_max: Option<f64>,
) -> Option<Trajectory> {
    let md = samples.column_f64("md");
    let x = samples.column_f64("easting");
    let y = samples.column_f64("northing");
    let z = samples.column_f64("tvd_msl");

    let keep = |depth: f64| {
        md_min <= 0.0 || (depth >= md_min && md_max.map_or(true, |md_max| depth <= md_max))
    };
    let mut order: Vec<usize> = (0..md.len()).filter(|i| keep(md[*i])).collect();
    if order.is_empty() {
        return None;
    }
    order.sort_by(|a, b| md[*a].total_cmp(&md[*b]));

    let pick = |values: &[f64]| order.iter().map(|i| values[*i]).collect::<Array1<f64>>();
    Some(Trajectory {
        coordinate_system,
        x_arr: pick(&x),
        y_arr: pick(&y),
        z_arr: pick(&z),
        md_arr: pick(&md),
    })
}

/// Planned well field names use underscores and mixed case. Requested fields are matched in
/// this normalised form.
pub fn normalize_field_name(name: &str) -> String {
    name.replace('_', " ").to_uppercase()
}

/// Trajectory of a planned well from its `wellPoints`. Depths are positive downwards.
pub fn planned_trajectory(well: &Record) -> Option<Trajectory> {
    let points = well.get("wellPoints")?.as_array()?;
    if points.is_empty() {
        return None;
    }
    let coordinate = |point: &Value, axis: &str| {
        point
            .get("position")
            .and_then(|position| position.get(axis))
            .and_then(value_to_f64)
            .unwrap_or(f64::NAN)
    };
    Some(Trajectory {
        coordinate_system: None,
        x_arr: points.iter().map(|point| coordinate(point, "x")).collect(),
        y_arr: points.iter().map(|point| coordinate(point, "y")).collect(),
        z_arr: points.iter().map(|point| -coordinate(point, "z")).collect(),
        md_arr: points
            .iter()
            .map(|point| {
                point
                    .get("measuredDepth")
                    .and_then(value_to_f64)
                    .unwrap_or(f64::NAN)
            })
            .collect(),
    })
}

/// Metadata of planned wells
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlannedWellboreMetadata {
    pub name: Vec<Option<String>>,
    pub template_name: Vec<Option<String>>,
    pub field_name: Vec<Option<String>>,
    pub well_type_name: Vec<Option<String>>,
    pub update_date: Vec<Option<String>>,
}

impl PlannedWellboreMetadata {
    pub fn from_table(table: &Table) -> Self {
        Self {
            name: table.column_strings("name"),
            template_name: table.column_strings("templateName"),
            field_name: table.column_strings("fieldName"),
            well_type_name: table.column_strings("wellTypeName"),
            update_date: table.column_strings("updateDate"),
        }
    }
}

/// Completion intervals of a wellbore
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub well_completion_id: Vec<Option<String>>,
    pub symbol_name: Vec<Option<String>>,
    pub description: Vec<Option<String>>,
    pub md_top: Array1<f64>,
    pub md_bottom: Array1<f64>,
}

impl Completion {
    pub fn from_table(table: &Table) -> Self {
        Self {
            well_completion_id: table.column_strings("well_completion_id"),
            symbol_name: table.column_strings("symbol_name"),
            description: table.column_strings("description"),
            md_top: Array1::from(table.column_f64("md_top")),
            md_bottom: Array1::from(table.column_f64("md_bottom")),
        }
    }
}

/// Perforated intervals of a wellbore
#[derive(Clone, Debug, PartialEq)]
pub struct Perforation {
    pub well_completion_id: Vec<Option<String>>,
    pub gun_type: Vec<Option<String>>,
    pub md_top: Array1<f64>,
    pub md_bottom: Array1<f64>,
}

impl Perforation {
    pub fn from_table(table: &Table) -> Self {
        Self {
            well_completion_id: table.column_strings("well_completion_id"),
            gun_type: table.column_strings("gun_type"),
            md_top: Array1::from(table.column_f64("md_top")),
            md_bottom: Array1::from(table.column_f64("md_bottom")),
        }
    }
}
