use crate::*;

pub fn handle_intake_commands(cli: &Cli, settings: &Settings) -> anyhow::Result<bool> {
    let Commands::Intake { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        IntakeCommands::Run => {
            let cfg = settings.intake_config()?;
            let pipeline = IntakePipeline::new(&cfg, Scanner::from_config(&cfg));
            let reports = pipeline.run()?;
            print_out(cli.json, &reports, |r| {
                format!("{}\t{}\t{}", r.file, r.action, r.reason)
            })?;
        }
        IntakeCommands::Check { files } => {
            let opts = settings.validation_options();
            let reports: Vec<CheckReport> = files
                .iter()
                .map(|f| CheckReport {
                    file: f.display().to_string(),
                    validation: classify_model(f, &opts),
                })
                .collect();
            let invalid = reports.iter().filter(|r| !r.validation.is_valid()).count();
            tracing::info!(checked = reports.len(), invalid, "format check finished");
            print_out(cli.json, &reports, |r| match &r.validation {
                Validation::Valid { format, count } => {
                    format!("{}\tvalid\t{}\t{}", r.file, format, count)
                }
                Validation::Invalid { reason } => format!("{}\tinvalid\t{}", r.file, reason),
            })?;
        }
        IntakeCommands::Scan { file } => {
            let cfg = settings.intake_config()?;
            let report = Scanner::from_config(&cfg).scan(file)?;
            let out = ScanOut {
                file: file.display().to_string(),
                verdict: classify(&report.summary),
                report,
            };
            print_one(cli.json, out, |o| {
                let mut lines = vec![format!(
                    "{}\t{}",
                    o.file,
                    format!("{:?}", o.verdict).to_lowercase()
                )];
                for (key, value) in &o.report.summary {
                    let value = match value {
                        SummaryValue::Int(n) => n.to_string(),
                        SummaryValue::Text(t) => t.clone(),
                    };
                    lines.push(format!("  {key}: {value}"));
                }
                lines.join("\n")
            })?;
        }
    }

    Ok(true)
}
