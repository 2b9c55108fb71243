// ── Scenario limits ────────────────────────────────────────────────

/// Maximum rules per scenario.
pub const MAX_SCENARIO_RULES: usize = 4096;

/// Maximum packets per scenario.
pub const MAX_SCENARIO_PACKETS: usize = 100_000;

/// Scenario files larger than this are refused before parsing (8 MiB).
pub const MAX_SCENARIO_FILE_BYTES: u64 = 8 * (1 << 20);

// ── Defaults ───────────────────────────────────────────────────────

/// Name given to scenarios that do not set one.
pub const DEFAULT_SCENARIO_NAME: &str = "unnamed";

/// Environment variable overriding the default action on the CLI.
pub const DEFAULT_ACTION_ENV: &str = "FWSIM_DEFAULT_ACTION";
