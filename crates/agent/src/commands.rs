use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result, bail};
use application::scenario_runner::{PacketOutcome, RunnerConfig, Scenario, ScenarioRunner, Summary};
use domain::common::entity::Protocol;
use domain::firewall::entity::{FirewallRule, IpNetwork, PacketInfo};
use infrastructure::config::{BuiltinScenario, ScenarioConfig, ValidatedScenario};

use crate::cli::OutputFormat;
use crate::report;

// ── Scenario assembly ───────────────────────────────────────────────────

/// Hand a validated scenario file to the runner.
pub fn scenario_from_config(validated: ValidatedScenario) -> Scenario {
    Scenario {
        name: validated.name,
        rules: validated.rules,
        packets: validated.packets,
        default_action: validated.default_action,
    }
}

fn load_scenario(file: &Path) -> Result<Scenario> {
    let validated = ScenarioConfig::load(file)
        .with_context(|| format!("failed to load scenario {}", file.display()))?;
    Ok(scenario_from_config(validated))
}

// ── Run / Demo ──────────────────────────────────────────────────────────

pub fn cmd_run(
    file: &Path,
    out: Option<&Path>,
    runner: &ScenarioRunner,
    output: OutputFormat,
) -> Result<()> {
    let scenario = load_scenario(file)?;
    run_and_print(&scenario, out, runner, output)
}

pub fn cmd_demo(
    builtin: BuiltinScenario,
    out: Option<&Path>,
    runner: &ScenarioRunner,
    output: OutputFormat,
) -> Result<()> {
    let validated = builtin
        .scenario()
        .with_context(|| format!("built-in scenario {builtin} is invalid"))?;
    let scenario = scenario_from_config(validated);
    run_and_print(&scenario, out, runner, output)
}

fn run_and_print(
    scenario: &Scenario,
    out: Option<&Path>,
    runner: &ScenarioRunner,
    output: OutputFormat,
) -> Result<()> {
    let outcomes = runner.run(scenario)?;

    if output == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&run_json(scenario, runner, &outcomes))?
        );
    } else {
        println!(
            "Scenario: {} (default action: {})",
            scenario.name,
            runner.effective_default(scenario)
        );
        println!();
        println!("{}", render_rules(scenario.rules.rules()));
        println!();
        println!("{}", render_results(&outcomes));
    }

    if let Some(path) = out {
        let format = report::write_report(path, &outcomes)?;
        // stdout stays machine-readable in JSON mode
        if output == OutputFormat::Table {
            println!("\nSaved {format} report to {}", path.display());
        }
    }
    Ok(())
}

fn run_json(
    scenario: &Scenario,
    runner: &ScenarioRunner,
    outcomes: &[PacketOutcome],
) -> serde_json::Value {
    serde_json::json!({
        "scenario": scenario.name,
        "default_action": runner.effective_default(scenario),
        "rules": scenario.rules,
        "summary": Summary::of(outcomes),
        "results": outcomes,
    })
}

// ── Check ───────────────────────────────────────────────────────────────

/// Build the packet for `check`. TCP and UDP need a destination port,
/// ICMP has none and uses 0.
pub fn adhoc_packet(
    src: IpAddr,
    dst: IpAddr,
    port: Option<u16>,
    src_port: Option<u16>,
    protocol: Protocol,
) -> Result<PacketInfo> {
    let port = match (port, protocol) {
        (Some(port), _) => port,
        (None, Protocol::Icmp) => 0,
        (None, _) => bail!("--port is required for {protocol}"),
    };
    let packet = PacketInfo::new(src, dst, port, protocol).context("invalid packet")?;
    Ok(match src_port {
        Some(src_port) => packet.with_src_port(src_port),
        None => packet,
    })
}

pub fn cmd_check(
    file: &Path,
    packet: PacketInfo,
    runner: &ScenarioRunner,
    output: OutputFormat,
) -> Result<()> {
    let mut scenario = load_scenario(file)?;
    scenario.packets = vec![packet];

    let outcomes = runner.run(&scenario)?;
    let Some(outcome) = outcomes.first() else {
        bail!("no verdict produced");
    };

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    println!("{}", describe_outcome(&scenario, outcome));
    Ok(())
}

fn describe_outcome(scenario: &Scenario, outcome: &PacketOutcome) -> String {
    let verdict = &outcome.verdict;
    match verdict.rule_index() {
        Some(idx) => {
            let label = outcome
                .rule_id
                .as_ref()
                .map_or_else(|| format!("#{}", idx + 1), |id| format!("{id} (#{})", idx + 1));
            let description = scenario
                .rules
                .rules()
                .get(idx)
                .and_then(|rule| rule.description.as_deref())
                .map(|d| format!(": {d}"))
                .unwrap_or_default();
            format!("{} => matched rule {label}{description}", verdict.action())
        }
        None => format!("{} => no rule matched, default action", verdict.action()),
    }
}

// ── List ────────────────────────────────────────────────────────────────

pub fn cmd_list(output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        let list: Vec<_> = BuiltinScenario::all()
            .iter()
            .map(|b| serde_json::json!({ "name": b.name(), "description": b.description() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!("{:<12}  DESCRIPTION", "NAME");
    for b in BuiltinScenario::all() {
        println!("{:<12}  {}", b.name(), b.description());
    }
    Ok(())
}

// ── Table rendering ─────────────────────────────────────────────────────

fn render_rules(rules: &[FirewallRule]) -> String {
    if rules.is_empty() {
        return "No rules: every packet takes the default action.".to_string();
    }

    let mut lines = vec![format!(
        "{:>3}  {:<12}  {:<6}  {:<5}  {:<20}  {:<20}  {:>11}  {:>11}  {}",
        "#", "ID", "ACTION", "PROTO", "SRC", "DST", "SRC PORT", "DST PORT", "DESCRIPTION"
    )];
    for (i, rule) in rules.iter().enumerate() {
        lines.push(format!(
            "{:>3}  {:<12}  {:<6}  {:<5}  {:<20}  {:<20}  {:>11}  {:>11}  {}",
            i + 1,
            rule.id.as_ref().map_or_else(|| "-".to_string(), ToString::to_string),
            rule.action,
            rule.protocol,
            network_or_any(rule.src_ip.as_ref()),
            network_or_any(rule.dst_ip.as_ref()),
            rule.src_port.to_string(),
            rule.dst_port.to_string(),
            rule.description.as_deref().unwrap_or(""),
        ));
    }
    lines.join("\n")
}

fn render_results(outcomes: &[PacketOutcome]) -> String {
    if outcomes.is_empty() {
        return "No packets evaluated.".to_string();
    }

    let mut lines = vec![format!(
        "{:>3}  {:<39}  {:>8}  {:<39}  {:>8}  {:<5}  {:<6}  {}",
        "#", "SRC", "SRC PORT", "DST", "DST PORT", "PROTO", "ACTION", "RULE"
    )];
    for o in outcomes {
        let p = &o.packet;
        lines.push(format!(
            "{:>3}  {:<39}  {:>8}  {:<39}  {:>8}  {:<5}  {:<6}  {}",
            o.index,
            p.src_addr,
            p.src_port.map_or_else(|| "-".to_string(), |port| port.to_string()),
            p.dst_addr,
            p.dst_port,
            p.protocol,
            o.verdict.action(),
            rule_label(o),
        ));
    }

    let summary = Summary::of(outcomes);
    lines.push(String::new());
    lines.push(format!(
        "{} packet(s): {} allowed, {} denied, {} by default action.",
        outcomes.len(),
        summary.allowed,
        summary.denied,
        summary.defaulted
    ));
    lines.join("\n")
}

fn rule_label(outcome: &PacketOutcome) -> String {
    match (&outcome.rule_id, outcome.verdict.rule_index()) {
        (Some(id), _) => id.to_string(),
        (None, Some(idx)) => format!("#{}", idx + 1),
        (None, None) => "default".to_string(),
    }
}

fn network_or_any(net: Option<&IpNetwork>) -> String {
    net.map_or_else(|| "any".to_string(), ToString::to_string)
}

/// Runner options from global CLI flags.
pub fn runner_config(cli: &crate::cli::Cli) -> RunnerConfig {
    RunnerConfig {
        default_action: cli.default_action.into(),
        strict_family: cli.strict_family,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use domain::firewall::entity::{FirewallAction, Verdict};

    use super::*;
    use crate::cli::Cli;

    fn demo1() -> Scenario {
        scenario_from_config(BuiltinScenario::Demo1.scenario().unwrap())
    }

    // ── Scenario assembly ─────────────────────────────────────────

    #[test]
    fn scenario_from_builtin_config() {
        let s = demo1();
        assert_eq!(s.name, "demo1");
        assert_eq!(s.rules.len(), 3);
        assert_eq!(s.packets.len(), 4);
        assert_eq!(s.default_action, None);
    }

    #[test]
    fn load_scenario_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        let err = load_scenario(&path).unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn runner_config_from_flags() {
        let cli = Cli::try_parse_from([
            "fwsim",
            "--default-action",
            "allow",
            "--strict-family",
            "list",
        ])
        .unwrap();
        assert_eq!(
            runner_config(&cli),
            RunnerConfig {
                default_action: FirewallAction::Allow,
                strict_family: true
            }
        );
    }

    // ── Ad-hoc packets ────────────────────────────────────────────

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn adhoc_packet_requires_port_for_tcp_and_udp() {
        for protocol in [Protocol::Tcp, Protocol::Udp] {
            let err = adhoc_packet(ip("10.0.0.1"), ip("10.0.0.2"), None, None, protocol)
                .unwrap_err();
            assert!(err.to_string().contains("--port is required"));
        }
    }

    #[test]
    fn adhoc_icmp_packet_defaults_port_to_zero() {
        let packet =
            adhoc_packet(ip("10.0.0.1"), ip("10.0.0.2"), None, None, Protocol::Icmp).unwrap();
        assert_eq!(packet.dst_port, 0);
        assert_eq!(packet.protocol, Protocol::Icmp);
    }

    #[test]
    fn adhoc_packet_keeps_ports() {
        let packet = adhoc_packet(
            ip("10.0.0.1"),
            ip("10.0.0.2"),
            Some(443),
            Some(50000),
            Protocol::Tcp,
        )
        .unwrap();
        assert_eq!(packet.dst_port, 443);
        assert_eq!(packet.src_port, Some(50000));
    }

    #[test]
    fn adhoc_packet_rejects_mixed_families() {
        let err = adhoc_packet(ip("10.0.0.1"), ip("::1"), Some(80), None, Protocol::Tcp)
            .unwrap_err();
        assert!(err.to_string().contains("invalid packet"));
    }

    // ── Rendering ─────────────────────────────────────────────────

    #[test]
    fn rules_table_lists_every_rule() {
        let s = demo1();
        let table = render_rules(s.rules.rules());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("R1") && lines[1].contains("Block HTTP"));
        assert!(lines[2].contains("10.0.0.0/24"));
        assert!(lines[3].contains("1000-2000"));
        assert_eq!(
            render_rules(&[]),
            "No rules: every packet takes the default action."
        );
    }

    #[test]
    fn results_table_and_summary() {
        let s = demo1();
        let outcomes = ScenarioRunner::default().run(&s).unwrap();
        let table = render_results(&outcomes);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[1].contains("DENY") && lines[1].ends_with("R1"));
        assert!(lines[2].ends_with("default"));
        assert!(lines[4].contains("ALLOW") && lines[4].ends_with("R2"));
        assert_eq!(
            *lines.last().unwrap(),
            "4 packet(s): 1 allowed, 3 denied, 1 by default action."
        );
    }

    #[test]
    fn rule_label_falls_back_to_position() {
        let outcome = PacketOutcome {
            index: 1,
            packet: PacketInfo::new(ip("1.1.1.1"), ip("2.2.2.2"), 53, Protocol::Udp).unwrap(),
            verdict: Verdict::Matched {
                action: FirewallAction::Allow,
                rule_index: 2,
            },
            rule_id: None,
        };
        assert_eq!(rule_label(&outcome), "#3");
    }

    #[test]
    fn describe_matched_and_default() {
        let s = demo1();
        let outcomes = ScenarioRunner::default().run(&s).unwrap();
        assert_eq!(
            describe_outcome(&s, &outcomes[0]),
            "DENY => matched rule R1 (#1): Block HTTP"
        );
        assert_eq!(
            describe_outcome(&s, &outcomes[1]),
            "DENY => no rule matched, default action"
        );
    }

    #[test]
    fn run_json_shape() {
        let s = demo1();
        let runner = ScenarioRunner::default();
        let outcomes = runner.run(&s).unwrap();
        let value = run_json(&s, &runner, &outcomes);
        assert_eq!(value["scenario"], "demo1");
        assert_eq!(value["default_action"], "deny");
        assert_eq!(value["summary"]["defaulted"], 1);
        assert_eq!(value["results"].as_array().unwrap().len(), 4);
        assert_eq!(value["results"][0]["verdict"]["outcome"], "matched");
        assert_eq!(value["results"][0]["rule_id"], "R1");
    }

    // ── Commands ──────────────────────────────────────────────────

    #[test]
    fn demo_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo1.csv");
        cmd_demo(
            BuiltinScenario::Demo1,
            Some(&path),
            &ScenarioRunner::default(),
            OutputFormat::Json,
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn check_rejects_family_mismatch_in_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "rules:\n  - action: allow\n    src: 10.0.0.0/8\n").unwrap();

        let packet = PacketInfo::new(ip("2001:db8::1"), ip("2001:db8::2"), 443, Protocol::Tcp)
            .unwrap();

        let lenient = ScenarioRunner::default();
        assert!(cmd_check(&path, packet.clone(), &lenient, OutputFormat::Json).is_ok());

        let strict = ScenarioRunner::new(RunnerConfig {
            strict_family: true,
            ..RunnerConfig::default()
        });
        assert!(cmd_check(&path, packet, &strict, OutputFormat::Json).is_err());
    }

    #[test]
    fn list_succeeds() {
        assert!(cmd_list(OutputFormat::Table).is_ok());
        assert!(cmd_list(OutputFormat::Json).is_ok());
    }
}
