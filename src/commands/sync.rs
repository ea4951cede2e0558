use crate::*;

pub fn handle_sync_commands(cli: &Cli, settings: &Settings) -> anyhow::Result<bool> {
    let Commands::Sync { command } = &cli.command else {
        return Ok(false);
    };
    let cfg = settings.sync_config()?;
    let api = ListingClient::new(&cfg.listing_url, cfg.request_timeout)?;

    match command {
        SyncCommands::List => {
            let transport = build_transport(&cfg, Box::new(FailClosed));
            let listing = SyncClient::new(api, transport.as_ref(), &cfg.download).list()?;
            print_one(cli.json, listing, |l| l.scanned_files.join("\n"))?;
        }
        SyncCommands::Pull {
            names,
            ack,
            interactive,
        } => {
            let transport = build_transport(&cfg, host_key_policy(*interactive)?);
            let client = SyncClient::new(api, transport.as_ref(), &cfg.download);
            let pulled = client.pull(names)?;
            let acknowledged = if *ack {
                let durable: Vec<&str> = pulled
                    .iter()
                    .filter(|r| r.is_durable())
                    .map(|r| r.name.as_str())
                    .collect();
                Some(client.acknowledge(&durable)?)
            } else {
                None
            };
            let out = PullOut {
                pulled,
                acknowledged,
            };
            print_one(cli.json, out, |o| {
                let mut lines: Vec<String> = o
                    .pulled
                    .iter()
                    .map(|r| match &r.detail {
                        Some(d) => format!("{}\t{}\t{}", r.name, r.status, d),
                        None => format!("{}\t{}", r.name, r.status),
                    })
                    .collect();
                if let Some(a) = &o.acknowledged {
                    lines.extend(a.acknowledged.iter().map(|n| format!("{n}\tacknowledged")));
                }
                lines.join("\n")
            })?;
        }
        SyncCommands::Ack { names } => {
            // Acknowledging never transfers, so the transport is not opened.
            let transport = build_transport(&cfg, Box::new(FailClosed));
            let client = SyncClient::new(api, transport.as_ref(), &cfg.download);
            let summary = client.acknowledge(names)?;
            print_one(cli.json, summary, |s| {
                s.acknowledged
                    .iter()
                    .map(|n| format!("{n}\tacknowledged"))
                    .chain(s.not_local.iter().map(|n| format!("{n}\tnot_local")))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
    }

    Ok(true)
}
