//! Command dispatch.

use crate::batch::{pdm, planned, ssdl};
use crate::cli::{Command, CommandLineArgs};
use crate::config::{Backend, Config};
use crate::error::WellboreError;
use crate::models::{DrilledWellboreMetadata, PdmAddress, PozoAddress, SmdaAddress, SsdlAddress};
use crate::provider::{ProviderImplApi, WellboreProvider};
use crate::provider_cache::{CachedProvider, DEFAULT_CACHE_LIFESPAN, DEFAULT_CACHE_SIZE};
use crate::session::connect;

use expanduser::expanduser;
use serde::Serialize;
use tracing::info;

/// Run the command given on the command line.
///
/// Query results are printed to stdout as JSON. Batch commands write their files and log what
/// was written.
pub async fn run(args: &CommandLineArgs) -> Result<(), WellboreError> {
    let env_file = expanduser(&args.env_file)?;
    let cache_dir = expanduser(&args.cache_dir)?;
    let config = Config::from_env_file(&env_file, &cache_dir)?;

    match &args.command {
        Command::Names(scope) => {
            let provider = provider(&config, &args.provider_id).await?;
            let smda = provider.inner().smda_address();
            let names = provider
                .drilled_wellbore_names(smda, scope.field.as_deref(), scope.license.as_deref())
                .await?;
            print_json(&names)
        }
        Command::Metadata(scope) => {
            let provider = provider(&config, &args.provider_id).await?;
            let smda = provider.inner().smda_address();
            let metadata = provider
                .drilled_wellbore_metadata(smda, scope.field.as_deref(), scope.license.as_deref())
                .await?;
            print_json(&metadata)
        }
        Command::Trajectory {
            wellbore,
            md_min,
            md_max,
        } => {
            let provider = provider(&config, &args.provider_id).await?;
            let smda = provider.inner().smda_address();
            let trajectory = provider
                .drilled_wellbore_trajectory(smda, wellbore, *md_min, *md_max)
                .await?;
            print_json(&trajectory.map(|trajectory| trajectory.to_json()))
        }
        Command::ExtractPdm {
            fields,
            production_dir,
        } => {
            let session = connect(&config, Backend::Pdm).await?;
            let pdm = PdmAddress::new(config.pdm.api.clone(), session, first(fields));
            if let Some(update) =
                pdm::extract_pdm_data(&pdm, fields, &expanduser(production_dir)?).await?
            {
                info!(
                    "Production data from {} to {}",
                    update.start_date, update.last_date
                );
            }
            Ok(())
        }
        Command::ExtractSsdl {
            fields,
            well_dir,
            polygon_dir,
        } => {
            let provider = provider(&config, &args.provider_id).await?;
            let smda = provider.inner().smda_address();
            let mut wellbores = DrilledWellboreMetadata::default();
            for field in fields {
                if let Some(metadata) = provider
                    .drilled_wellbore_metadata(smda, Some(field.as_str()), None)
                    .await?
                {
                    wellbores.extend(metadata);
                }
            }
            info!("Drilled wellbores: {}", wellbores.len());

            let session = connect(&config, Backend::Ssdl).await?;
            let ssdl = SsdlAddress::new(config.ssdl.api.clone(), session, first(fields));
            ssdl::extract_ssdl_data(
                &ssdl,
                &wellbores,
                &expanduser(well_dir)?,
                &expanduser(polygon_dir)?,
            )
            .await
        }
        Command::ExtractPlanned { fields, well_dir } => {
            let session = connect(&config, Backend::Pozo).await?;
            let pozo = PozoAddress::new(config.pozo.api.clone(), session, first(fields));
            planned::extract_planned_well_data(&pozo, &expanduser(well_dir)?, fields).await?;
            Ok(())
        }
    }
}

/// Wellbore provider backed by a session to the well master data API.
async fn provider(
    config: &Config,
    provider_id: &str,
) -> Result<CachedProvider<ProviderImplApi>, WellboreError> {
    let session = connect(config, Backend::Smda).await?;
    let smda = SmdaAddress::new(config.smda.api.clone(), session);
    Ok(CachedProvider::new(
        ProviderImplApi::new(provider_id, smda),
        DEFAULT_CACHE_SIZE,
        DEFAULT_CACHE_LIFESPAN,
    ))
}

fn first(fields: &[String]) -> &str {
    fields.first().map(String::as_str).unwrap_or_default()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), WellboreError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
