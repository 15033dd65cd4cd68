use clap::Parser;

use vcexport::config::{Cli, ExportConfig};
use vcexport::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let cli = Cli::parse();
    let config = ExportConfig::from_cli(cli)?;

    tracing::info!(host = %config.vcenter_host, "starting export, this will take some time");
    let report = vcexport::run(&config).await?;
    vcexport::print_notices(&report);
    tracing::info!(
        vms = report.exported_vms,
        output = %report.output_dir.display(),
        "export completed"
    );
    Ok(())
}
