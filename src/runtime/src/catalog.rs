//! Operator catalog build and mirror.
//!
//! Each app-registry organization is built into a catalog image pushed to
//! `<mirror>/<prefix>/<org>:<tag>`, then that catalog's content is mirrored
//! into the mirror registry. Runs only when enabled in the configuration.

use std::path::Path;

use acm_mirror_core::CatalogConfig;

use crate::tools::{command_line, CatalogBuild, CatalogMirror, ToolRunner};

/// Outcome of a catalog run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogReport {
    /// Organizations built and mirrored
    pub synced: Vec<String>,
    /// Organizations whose build or mirror failed
    pub failed: Vec<String>,
}

/// Build request for one organization.
pub fn build_request(
    config: &CatalogConfig,
    organization: &str,
    mirror_registry: &str,
    registry_config: &Path,
) -> CatalogBuild {
    CatalogBuild {
        organization: organization.to_string(),
        from: format!("{}:{}", config.from_image, config.version),
        to: format!(
            "{}/{}/{}:{}",
            mirror_registry, config.prefix, organization, config.tag
        ),
        registry_config: registry_config.to_path_buf(),
    }
}

/// Build and mirror every configured catalog, one at a time.
///
/// A failed build skips the mirror step for that catalog; other catalogs
/// still run.
pub async fn sync_catalogs(
    runner: &dyn ToolRunner,
    admin_tool: &str,
    config: &CatalogConfig,
    mirror_registry: &str,
    registry_config: &Path,
    dry_run: bool,
) -> CatalogReport {
    let mut report = CatalogReport::default();

    for organization in &config.catalogs {
        let build = build_request(config, organization, mirror_registry, registry_config);
        let mirror = CatalogMirror {
            catalog: build.to.clone(),
            destination: mirror_registry.to_string(),
            registry_config: registry_config.to_path_buf(),
        };

        println!("Syncing Catalog: {}", organization);
        println!("{}", command_line(admin_tool, &build.args()));
        println!("{}", command_line(admin_tool, &mirror.args()));

        if dry_run {
            report.synced.push(organization.clone());
            continue;
        }

        let built = match runner.build_catalog(&build).await {
            Ok(status) if status.success() => true,
            Ok(status) => {
                tracing::warn!(catalog = %organization, status = ?status, "Catalog build failed");
                false
            }
            Err(e) => {
                tracing::warn!(catalog = %organization, error = %e, "Catalog build could not be run");
                false
            }
        };

        let mirrored = built
            && match runner.mirror_catalog(&mirror).await {
                Ok(status) if status.success() => true,
                Ok(status) => {
                    tracing::warn!(catalog = %organization, status = ?status, "Catalog mirror failed");
                    false
                }
                Err(e) => {
                    tracing::warn!(catalog = %organization, error = %e, "Catalog mirror could not be run");
                    false
                }
            };

        if mirrored {
            println!("Done!");
            report.synced.push(organization.clone());
        } else {
            println!("Failed!");
            report.failed.push(organization.clone());
        }
        println!();
    }

    report
}
