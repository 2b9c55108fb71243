#![forbid(unsafe_code)]

mod cli;
mod commands;
mod report;

use anyhow::Result;
use application::scenario_runner::ScenarioRunner;
use infrastructure::logging::init_logging;

use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    init_logging(cli.log_level, cli.log_format)?;

    let output = cli.output;
    let runner = ScenarioRunner::new(commands::runner_config(&cli));
    tracing::debug!(
        default_action = %runner.config().default_action,
        strict_family = runner.config().strict_family,
        "runner configured"
    );

    match cli.command {
        Command::Version => {
            println!("fwsim {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }

        Command::List => commands::cmd_list(output),

        Command::Run { file, out } => commands::cmd_run(&file, out.as_deref(), &runner, output),

        Command::Demo { name, out } => commands::cmd_demo(name, out.as_deref(), &runner, output),

        Command::Check {
            file,
            src,
            dst,
            port,
            src_port,
            protocol,
        } => {
            let packet = commands::adhoc_packet(src, dst, port, src_port, protocol.into())?;
            commands::cmd_check(&file, packet, &runner, output)
        }
    }
}
