//! Site enrollment command handlers.

use tabled::Tabled;

use sconnect_api::{CancellationToken, SecureConnectClient, SiteEnrollment, SiteRecord};

use crate::cli::{GlobalOpts, SitesArgs, SitesCommand};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Region")]
    region: String,
}

impl From<&SiteRecord> for SiteRow {
    fn from(s: &SiteRecord) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            region: s.region_label().unwrap_or_default().to_owned(),
        }
    }
}

fn detail(s: &SiteRecord) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let _ = writeln!(out, "ID:      {}", s.id);
    let _ = writeln!(out, "Name:    {}", s.name);
    let _ = write!(out, "Region:  {}", s.region_label().unwrap_or("-"));
    let mut keys: Vec<_> = s.extra.keys().collect();
    keys.sort();
    for key in keys {
        let _ = write!(out, "\n{key}: {}", s.extra[key]);
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &SecureConnectClient,
    ctx: &Resolved,
    args: SitesArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let org = ctx.organization_id.as_str();
    let api_err = |e: sconnect_api::Error| CliError::from_api(e, &ctx.profile_name);

    match args.command {
        SitesCommand::List => {
            let sites = client.list_sites(org, cancel).await.map_err(api_err)?;
            let out = output::render_list(
                &global.output,
                &sites,
                |s| SiteRow::from(s),
                |s| s.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Get { name } => {
            let site = client
                .find_site_by_name(org, &name, cancel)
                .await
                .map_err(api_err)?;
            let out = output::render_single(&global.output, &site, detail, |s| s.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Create {
            site_id,
            region_type,
            region_id,
            region_name,
        } => {
            let mut enrollment = SiteEnrollment::new(site_id, region_type);
            if let Some(id) = region_id {
                enrollment = enrollment.region_id(id);
            }
            if let Some(name) = region_name {
                enrollment = enrollment.region_name(name);
            }
            client
                .create_site(org, &enrollment, cancel)
                .await
                .map_err(api_err)?;
            if !global.quiet {
                eprintln!("Enrollment submitted for site {}", enrollment.site_id);
            }
            Ok(())
        }

        SitesCommand::Delete { site_id } => {
            if !util::confirm(
                &format!("Remove Secure Connect enrollment for site '{site_id}'?"),
                "sites delete",
                global.yes,
            )? {
                return Ok(());
            }
            client
                .delete_sites(org, &site_id, cancel)
                .await
                .map_err(api_err)?;
            if !global.quiet {
                eprintln!("Enrollment removed for site {site_id}");
            }
            Ok(())
        }
    }
}
