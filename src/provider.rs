//! Wellbore data providers.
//!
//! [WellboreProvider] answers questions about drilled wellbores from the well master data API.
//! [FieldDataProvider] covers planned wells, completions, perforations and production wellbores
//! for a field.

use crate::error::WellboreError;
use crate::extractor::{extract, fetch, Extracted};
use crate::models::{
    endpoint, normalize_field_name, planned_trajectory, select_trajectory, Completion,
    DrilledWellboreMetadata, PdmAddress, Perforation, PlannedWellboreMetadata, PozoAddress,
    SmdaAddress, SsdlAddress, Trajectory, TrajectoryQuery, WellboreFilter, MAX_ITEMS,
};
use crate::table::{value_to_string, Table};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};
use validator::Validate;

/// Queries on drilled wellbores
#[async_trait]
pub trait WellboreProvider: Send + Sync {
    /// Identifier of the provider instance.
    fn provider_id(&self) -> &str;

    /// Names of all drilled wellbores in a field or license.
    ///
    /// Returns an empty list when no wellbores are found.
    async fn drilled_wellbore_names(
        &self,
        smda: &SmdaAddress,
        field: Option<&str>,
        license: Option<&str>,
    ) -> Result<Vec<String>, WellboreError> {
        Ok(self
            .drilled_wellbore_metadata(smda, field, license)
            .await?
            .map(|metadata| metadata.names())
            .unwrap_or_default())
    }

    /// Metadata of all drilled wellbores in a field or license. Exactly one of `field` and
    /// `license` must be given.
    ///
    /// Returns `None` when no wellbores are found or the listing could not be fetched.
    async fn drilled_wellbore_metadata(
        &self,
        smda: &SmdaAddress,
        field: Option<&str>,
        license: Option<&str>,
    ) -> Result<Option<DrilledWellboreMetadata>, WellboreError>;

    /// Trajectory of a drilled wellbore, optionally restricted to a measured depth interval.
    ///
    /// The interval applies only when `md_min` is positive. Returns `None` when no survey
    /// samples are found or none fall inside the interval.
    async fn drilled_wellbore_trajectory(
        &self,
        smda: &SmdaAddress,
        wellbore_name: &str,
        md_min: f64,
        md_max: Option<f64>,
    ) -> Result<Option<Trajectory>, WellboreError>;
}

/// Queries on field-scoped data. The field is taken from the address.
#[async_trait]
pub trait FieldDataProvider: Send + Sync {
    async fn planned_wellbore_metadata(
        &self,
        pozo: &PozoAddress,
    ) -> Result<Option<PlannedWellboreMetadata>, WellboreError>;

    /// Trajectories of the planned wells in the field, by well name. Wells without points are
    /// skipped.
    async fn planned_wellbore_trajectories(
        &self,
        pozo: &PozoAddress,
    ) -> Result<Vec<(String, Trajectory)>, WellboreError>;

    /// Wellbore identifiers with production or injection data in the field.
    async fn production_wellbores(&self, pdm: &PdmAddress) -> Result<Vec<String>, WellboreError>;

    async fn wellbore_completions(
        &self,
        ssdl: &SsdlAddress,
        wellbore_uuid: &str,
    ) -> Result<Option<Completion>, WellboreError>;

    async fn wellbore_perforations(
        &self,
        ssdl: &SsdlAddress,
        wellbore_uuid: &str,
    ) -> Result<Option<Perforation>, WellboreError>;
}

/// Provider reading from the REST APIs
#[derive(Clone, Debug)]
pub struct ProviderImplApi {
    provider_id: String,
    smda_address: SmdaAddress,
}

impl ProviderImplApi {
    pub fn new(provider_id: &str, smda_address: SmdaAddress) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            smda_address,
        }
    }

    /// Address of the well master data API this provider was created with.
    pub fn smda_address(&self) -> &SmdaAddress {
        &self.smda_address
    }
}

#[async_trait]
impl WellboreProvider for ProviderImplApi {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    #[tracing::instrument(level = "DEBUG", skip(self, smda))]
    async fn drilled_wellbore_metadata(
        &self,
        smda: &SmdaAddress,
        field: Option<&str>,
        license: Option<&str>,
    ) -> Result<Option<DrilledWellboreMetadata>, WellboreError> {
        let filter = WellboreFilter::new(field, license);
        filter.validate()?;
        let (key, value) = filter.criterion().ok_or_else(|| {
            validator::ValidationError::new("either field or license must be specified")
        })?;

        let items = MAX_ITEMS.to_string();
        let url = endpoint(
            &smda.api,
            "wellbores",
            &[
                ("_items", items.as_str()),
                ("_order", "asc"),
                ("_page", "1"),
                (key, value),
            ],
        )?;
        let table = extract(&smda.session, &url).await;
        if table.is_empty() {
            return Ok(None);
        }
        if table.len() >= MAX_ITEMS {
            warn!(
                "Wellbore listing for {}={} returned {} rows, results may be truncated",
                key,
                value,
                table.len()
            );
        }
        Ok(Some(DrilledWellboreMetadata::from_table(&table)))
    }

    #[tracing::instrument(level = "DEBUG", skip(self, smda))]
    async fn drilled_wellbore_trajectory(
        &self,
        smda: &SmdaAddress,
        wellbore_name: &str,
        md_min: f64,
        md_max: Option<f64>,
    ) -> Result<Option<Trajectory>, WellboreError> {
        TrajectoryQuery {
            wellbore_name: wellbore_name.to_string(),
            md_min,
            md_max,
        }
        .validate()?;

        let items = MAX_ITEMS.to_string();
        let query = [
            ("_items", items.as_str()),
            ("_order", "asc"),
            ("_page", "1"),
            ("unique_wellbore_identifier", wellbore_name),
        ];
        let samples = extract(
            &smda.session,
            &endpoint(&smda.api, "wellbore-survey-samples", &query)?,
        )
        .await;
        if samples.is_empty() {
            return Ok(None);
        }

        let headers = extract(
            &smda.session,
            &endpoint(&smda.api, "wellbore-survey-headers", &query)?,
        )
        .await;
        let coordinate_system = headers
            .column_strings("projected_coordinate_system")
            .into_iter()
            .next()
            .flatten();

        Ok(select_trajectory(&samples, coordinate_system, md_min, md_max))
    }
}

#[async_trait]
impl FieldDataProvider for ProviderImplApi {
    async fn planned_wellbore_metadata(
        &self,
        pozo: &PozoAddress,
    ) -> Result<Option<PlannedWellboreMetadata>, WellboreError> {
        let wells = select_planned_field(&planned_wells(pozo).await?, &pozo.field_identifier);
        if wells.is_empty() {
            return Ok(None);
        }
        Ok(Some(PlannedWellboreMetadata::from_table(&wells)))
    }

    async fn planned_wellbore_trajectories(
        &self,
        pozo: &PozoAddress,
    ) -> Result<Vec<(String, Trajectory)>, WellboreError> {
        let wells = select_planned_field(&planned_wells(pozo).await?, &pozo.field_identifier);
        Ok(wells
            .rows()
            .iter()
            .filter_map(|well| {
                let name = well.get("name").map(value_to_string)?;
                Some((name, planned_trajectory(well)?))
            })
            .collect())
    }

    async fn production_wellbores(&self, pdm: &PdmAddress) -> Result<Vec<String>, WellboreError> {
        list_production_wellbores(pdm, &pdm.field_identifier).await
    }

    async fn wellbore_completions(
        &self,
        ssdl: &SsdlAddress,
        wellbore_uuid: &str,
    ) -> Result<Option<Completion>, WellboreError> {
        let table = wellbore_records(ssdl, wellbore_uuid, "completion").await?;
        Ok((!table.is_empty()).then(|| Completion::from_table(&table)))
    }

    async fn wellbore_perforations(
        &self,
        ssdl: &SsdlAddress,
        wellbore_uuid: &str,
    ) -> Result<Option<Perforation>, WellboreError> {
        let table = wellbore_records(ssdl, wellbore_uuid, "perforations").await?;
        Ok((!table.is_empty()).then(|| Perforation::from_table(&table)))
    }
}

/// All planned wells, with `fieldName` normalised.
pub async fn planned_wells(pozo: &PozoAddress) -> Result<Table, WellboreError> {
    let url = endpoint(
        &pozo.api,
        "api/v3/RepWellDesign",
        &[("FieldId", ""), ("phase", "1")],
    )?;
    let mut wells = extract(&pozo.session, &url).await;
    wells.update_column("fieldName", |name| match name {
        Value::String(name) => Value::String(normalize_field_name(name)),
        other => other.clone(),
    });
    Ok(wells)
}

/// Planned wells belonging to a field.
pub fn select_planned_field(wells: &Table, field: &str) -> Table {
    let field = normalize_field_name(field);
    wells.filter(|well| {
        well.get("fieldName")
            .and_then(Value::as_str)
            .map_or(false, |name| name == field)
    })
}

/// Wellbore identifiers with production data in a field.
///
/// Any response other than a listing is an error, since extraction can not continue without it.
pub async fn list_production_wellbores(
    pdm: &PdmAddress,
    field: &str,
) -> Result<Vec<String>, WellboreError> {
    let url = endpoint(&pdm.api, "WellBoreMaster", &[("GOV_FIELD_NAME", field)])?;
    let table = match fetch(&pdm.session, &url).await? {
        Extracted::Table(table) => table,
        Extracted::Malformed => {
            warn!("No valid data extracted from endpoint {}", url);
            Table::new()
        }
        Extracted::NotFound => {
            return Err(WellboreError::ListingFailed {
                endpoint: url.to_string(),
                status: 404,
            })
        }
        Extracted::Unavailable { status, .. } => {
            return Err(WellboreError::ListingFailed {
                endpoint: url.to_string(),
                status: status.as_u16(),
            })
        }
    };
    let wellbores: Vec<String> = table.column_strings("WB_UWBI").into_iter().flatten().collect();
    info!("Found {} production wellbores in {}", wellbores.len(), field);
    Ok(wellbores)
}

/// Records of a wellbore sub-resource such as `completion` or `perforations`.
///
/// The resource is a single object whose values are the records. Duplicate records are dropped.
pub async fn wellbore_records(
    ssdl: &SsdlAddress,
    wellbore_uuid: &str,
    resource: &str,
) -> Result<Table, WellboreError> {
    let url = endpoint(
        &ssdl.api,
        &format!("Wellbores/{}/{}", wellbore_uuid, resource),
        &[],
    )?;
    let table = extract(&ssdl.session, &url).await;
    let mut records = Table::from_records(table.first_row_records());
    records.dedup();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockBackend, MockServer, Params};

    use ndarray::array;
    use serde_json::json;

    fn wellbores(params: &Params) -> (u16, String) {
        assert_eq!(params.get("_items").map(String::as_str), Some("2000"));
        assert_eq!(params.get("_order").map(String::as_str), Some("asc"));
        assert_eq!(params.get("_page").map(String::as_str), Some("1"));
        let body = match (params.get("field_identifier"), params.get("license_identifier")) {
            (Some(field), None) if field == "JOHAN SVERDRUP" => json!({"data": {"results": [
                {
                    "uuid": "u1",
                    "unique_wellbore_identifier": "NO 16/2-D-1",
                    "unique_well_identifier": "NO 16/2-D-1",
                    "purpose": "production",
                    "status": "producing",
                    "content": "oil",
                    "field_identifier": "JOHAN SVERDRUP",
                    "field_uuid": "f1",
                    "completion_date": "2019-10-05",
                    "license_identifier": "PL265",
                },
                {
                    "uuid": "u2",
                    "unique_wellbore_identifier": "NO 16/2-D-2",
                    "field_identifier": "JOHAN SVERDRUP",
                    "field_uuid": "f1",
                },
            ]}}),
            (None, Some(license)) if license == "PL265" => json!({"data": {"results": [
                {"uuid": "u1", "unique_wellbore_identifier": "NO 16/2-D-1"},
            ]}}),
            _ => json!({"data": {"results": []}}),
        };
        (200, body.to_string())
    }

    fn survey(params: &Params, body: Value) -> (u16, String) {
        match params.get("unique_wellbore_identifier").map(String::as_str) {
            Some("NO 16/2-D-1") => (200, body.to_string()),
            _ => (404, json!({"message": "not found"}).to_string()),
        }
    }

    fn smda_server() -> MockServer {
        MockBackend::new()
            .get("/wellbores", wellbores)
            .get("/wellbore-survey-samples", |params| {
                survey(
                    params,
                    json!({"data": {"results": [
                        {"md": 500.0, "easting": 5.0, "northing": 50.0, "tvd_msl": 480.0},
                        {"md": 0.0, "easting": 0.0, "northing": 0.0, "tvd_msl": 0.0},
                        {"md": 100.0, "easting": 1.0, "northing": 10.0, "tvd_msl": 100.0},
                    ]}}),
                )
            })
            .get("/wellbore-survey-headers", |params| {
                survey(
                    params,
                    json!({"data": {"results": [
                        {"projected_coordinate_system": "ST_ED50_UTM31N_P23031_T1133"},
                    ]}}),
                )
            })
            .serve()
    }

    fn provider(server: &MockServer) -> ProviderImplApi {
        ProviderImplApi::new("test", server.smda())
    }

    #[tokio::test]
    async fn metadata_by_field() {
        let server = smda_server();
        let provider = provider(&server);
        let metadata = provider
            .drilled_wellbore_metadata(provider.smda_address(), Some("JOHAN SVERDRUP"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.uuid.len(), metadata.license_identifier.len());
        assert_eq!(metadata.license_identifier[1], None);
        assert_eq!(metadata.completion_date[0].as_deref(), Some("2019-10-05"));
        assert_eq!(provider.provider_id(), "test");
    }

    #[tokio::test]
    async fn names_by_license() {
        let server = smda_server();
        let provider = provider(&server);
        let names = provider
            .drilled_wellbore_names(&server.smda(), None, Some("PL265"))
            .await
            .unwrap();
        assert_eq!(names, vec!["NO 16/2-D-1".to_string()]);
    }

    #[tokio::test]
    async fn unknown_field_is_none() {
        let server = smda_server();
        let provider = provider(&server);
        let smda = server.smda();
        assert_eq!(
            provider
                .drilled_wellbore_metadata(&smda, Some("UNKNOWN"), None)
                .await
                .unwrap(),
            None
        );
        assert!(provider
            .drilled_wellbore_names(&smda, Some("UNKNOWN"), None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn field_and_license_are_exclusive() {
        let server = smda_server();
        let provider = provider(&server);
        let smda = server.smda();
        assert!(matches!(
            provider.drilled_wellbore_metadata(&smda, None, None).await,
            Err(WellboreError::InvalidArgument(_))
        ));
        assert!(matches!(
            provider
                .drilled_wellbore_metadata(&smda, Some("JOHAN SVERDRUP"), Some("PL265"))
                .await,
            Err(WellboreError::InvalidArgument(_))
        ));
        assert_eq!(server.hits("/wellbores"), 0);
    }

    #[tokio::test]
    async fn empty_object_is_none() {
        let server = MockBackend::new()
            .get_json("/wellbores", 200, json!({}))
            .get_json("/wellbore-survey-samples", 200, json!({}))
            .serve();
        let provider = provider(&server);
        let smda = server.smda();
        assert_eq!(
            provider
                .drilled_wellbore_metadata(&smda, Some("F"), None)
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            provider
                .drilled_wellbore_trajectory(&smda, "NO 16/2-D-1", 0.0, None)
                .await
                .unwrap(),
            None
        );
        assert_eq!(server.hits("/wellbore-survey-headers"), 0);
    }

    #[tokio::test]
    async fn listing_failure_is_none() {
        let server = MockBackend::new()
            .get_json("/wellbores", 500, json!({"message": "boom"}))
            .serve();
        let provider = provider(&server);
        assert_eq!(
            provider
                .drilled_wellbore_metadata(&server.smda(), Some("F"), None)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn trajectory_full() {
        let server = smda_server();
        let provider = provider(&server);
        let trajectory = provider
            .drilled_wellbore_trajectory(&server.smda(), "NO 16/2-D-1", 0.0, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            trajectory.coordinate_system.as_deref(),
            Some("ST_ED50_UTM31N_P23031_T1133")
        );
        assert_eq!(trajectory.md_arr, array![0.0, 100.0, 500.0]);
        assert_eq!(trajectory.x_arr, array![0.0, 1.0, 5.0]);
        assert_eq!(trajectory.y_arr, array![0.0, 10.0, 50.0]);
        assert_eq!(trajectory.z_arr, array![0.0, 100.0, 480.0]);
    }

    #[tokio::test]
    async fn trajectory_md_window() {
        let server = smda_server();
        let provider = provider(&server);
        let smda = server.smda();
        let trajectory = provider
            .drilled_wellbore_trajectory(&smda, "NO 16/2-D-1", 200.0, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trajectory.md_arr, array![500.0]);
        assert_eq!(trajectory.x_arr, array![5.0]);

        let trajectory = provider
            .drilled_wellbore_trajectory(&smda, "NO 16/2-D-1", 50.0, Some(400.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trajectory.md_arr, array![100.0]);

        assert_eq!(
            provider
                .drilled_wellbore_trajectory(&smda, "NO 16/2-D-1", 600.0, None)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn trajectory_not_found() {
        let server = smda_server();
        let provider = provider(&server);
        assert_eq!(
            provider
                .drilled_wellbore_trajectory(&server.smda(), "NO 1/1-1", 0.0, None)
                .await
                .unwrap(),
            None
        );
        assert_eq!(server.hits("/wellbore-survey-headers"), 0);
    }

    #[tokio::test]
    async fn trajectory_without_headers() {
        let server = MockBackend::new()
            .get_json(
                "/wellbore-survey-samples",
                200,
                json!([{"md": 1.0, "easting": 2.0, "northing": 3.0, "tvd_msl": 4.0}]),
            )
            .get_json("/wellbore-survey-headers", 200, json!({"data": {"results": []}}))
            .serve();
        let provider = provider(&server);
        let trajectory = provider
            .drilled_wellbore_trajectory(&server.smda(), "W", 0.0, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trajectory.coordinate_system, None);
        assert_eq!(trajectory.len(), 1);
    }

    #[tokio::test]
    async fn blank_wellbore_name() {
        let server = smda_server();
        let provider = provider(&server);
        assert!(matches!(
            provider
                .drilled_wellbore_trajectory(&server.smda(), " ", 0.0, None)
                .await,
            Err(WellboreError::InvalidArgument(_))
        ));
    }

    fn pozo_server() -> MockServer {
        MockBackend::new()
            .get("/api/v3/RepWellDesign", |params| {
                if params.get("FieldId").map(String::as_str) != Some("")
                    || params.get("phase").map(String::as_str) != Some("1")
                {
                    return (400, json!({"message": "bad query"}).to_string());
                }
                let body = json!([
                    {
                        "name": "JS P-1",
                        "templateName": "D",
                        "fieldName": "Johan_Sverdrup",
                        "wellTypeName": "Producer",
                        "updateDate": "2021-01-01",
                        "wellPoints": [
                            {"measuredDepth": 0, "position": {"x": 1.0, "y": 2.0, "z": 0.0}},
                            {"measuredDepth": 120, "position": {"x": 1.0, "y": 2.0, "z": -110.0}},
                        ],
                    },
                    {"name": "JS P-2", "fieldName": "JOHAN SVERDRUP", "wellPoints": []},
                    {"name": "GR P-1", "fieldName": "GRANE"},
                ]);
                (200, body.to_string())
            })
            .serve()
    }

    #[tokio::test]
    async fn planned_metadata() {
        let server = pozo_server();
        let provider = provider(&server);
        let metadata = provider
            .planned_wellbore_metadata(&server.pozo("johan sverdrup"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            metadata.name,
            vec![Some("JS P-1".to_string()), Some("JS P-2".to_string())]
        );
        assert_eq!(
            metadata.field_name,
            vec![Some("JOHAN SVERDRUP".to_string()); 2]
        );
        assert_eq!(metadata.template_name[1], None);

        assert_eq!(
            provider
                .planned_wellbore_metadata(&server.pozo("OSEBERG"))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn planned_trajectories() {
        let server = pozo_server();
        let provider = provider(&server);
        let trajectories = provider
            .planned_wellbore_trajectories(&server.pozo("JOHAN_SVERDRUP"))
            .await
            .unwrap();
        assert_eq!(trajectories.len(), 1);
        assert_eq!(trajectories[0].0, "JS P-1");
        assert_eq!(trajectories[0].1.z_arr, array![0.0, 110.0]);
    }

    #[tokio::test]
    async fn production_wellbores() {
        let server = MockBackend::new()
            .get("/WellBoreMaster", |params| {
                match params.get("GOV_FIELD_NAME").map(String::as_str) {
                    Some("GRANE") => (
                        200,
                        json!([{"WB_UWBI": "NO 25/11-G-1"}, {"WB_UWBI": "NO 25/11-G-2"}])
                            .to_string(),
                    ),
                    _ => (503, json!({"message": "unavailable"}).to_string()),
                }
            })
            .serve();
        let provider = provider(&server);
        let wellbores = provider
            .production_wellbores(&server.pdm("GRANE"))
            .await
            .unwrap();
        assert_eq!(wellbores, vec!["NO 25/11-G-1", "NO 25/11-G-2"]);

        match provider.production_wellbores(&server.pdm("OTHER")).await {
            Err(WellboreError::ListingFailed { status, .. }) => assert_eq!(status, 503),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn completions_and_perforations() {
        let server = MockBackend::new()
            .get_json(
                "/Wellbores/w1/completion",
                200,
                json!({
                    "c1": {"well_completion_id": "1", "symbol_name": "screen", "md_top": 100, "md_bottom": 200},
                    "c2": {"well_completion_id": "2", "symbol_name": "packer", "md_top": 250, "md_bottom": 251},
                }),
            )
            .get_json(
                "/Wellbores/w1/perforations",
                200,
                json!({
                    "p1": {"well_completion_id": "1", "gun_type": "TCP", "md_top": 120, "md_bottom": 180},
                    "p2": {"well_completion_id": "1", "gun_type": "TCP", "md_top": 120, "md_bottom": 180},
                }),
            )
            .serve();
        let provider = provider(&server);
        let ssdl = server.ssdl("GRANE");

        let completion = provider
            .wellbore_completions(&ssdl, "w1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completion.md_top, array![100.0, 250.0]);
        assert_eq!(completion.symbol_name[1].as_deref(), Some("packer"));

        let perforation = provider
            .wellbore_perforations(&ssdl, "w1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(perforation.gun_type, vec![Some("TCP".to_string())]);

        assert_eq!(provider.wellbore_completions(&ssdl, "w2").await.unwrap(), None);
    }
}
