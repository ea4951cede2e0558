use crate::*;

pub fn handle_serve(cli: &Cli, settings: &Settings) -> anyhow::Result<bool> {
    let Commands::Serve { bind } = &cli.command else {
        return Ok(false);
    };
    let cfg = settings.listing_config(bind.as_deref())?;
    serve(&cfg)?;
    Ok(true)
}

pub fn handle_listing_commands(cli: &Cli, settings: &Settings) -> anyhow::Result<bool> {
    let Commands::Listing { command } = &cli.command else {
        return Ok(false);
    };
    let service = ListingService::from_config(&settings.listing_config(None)?);

    match command {
        ListingCommands::List => {
            let files = service.list_files()?;
            print_out(cli.json, &files, |f| format!("{}\t{}", f.name, f.size))?;
        }
        ListingCommands::Ack { names } => {
            let report = service.acknowledge(names);
            if report.status() == AckStatus::Failed {
                return Err(GateError::PartialBatch {
                    failed: report.failed.iter().map(ToString::to_string).collect(),
                }
                .into());
            }
            print_one(cli.json, report, |r| {
                let mut lines: Vec<String> = r
                    .archived
                    .iter()
                    .map(|n| format!("{n}\tarchived"))
                    .chain(r.missing.iter().map(|n| format!("{n}\tmissing")))
                    .collect();
                lines.extend(r.failed.iter().map(|f| format!("{}\tfailed\t{}", f.name, f.error)));
                lines.join("\n")
            })?;
        }
    }

    Ok(true)
}
