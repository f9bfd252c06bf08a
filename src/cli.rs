use crate::command::AppCommand;
use anyhow::Result;

pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

pub type CliCommand = AppCommand;

pub fn version_text() -> String {
    format!("validator-sentinel {}", env!("CARGO_PKG_VERSION"))
}

pub fn usage_text() -> String {
    format!(
        "{version}
Validator Sentinel: active-set, slash and performance alerts for validators

Usage:
  validator-sentinel run
  validator-sentinel cycle
  validator-sentinel follow <ADDRESS> --subscriber <ID>
  validator-sentinel unfollow <ADDRESS> --subscriber <ID>
  validator-sentinel following --subscriber <ID>
  validator-sentinel status <ADDRESS>
  validator-sentinel history <ADDRESS> [--limit <N>]
  validator-sentinel --help
  validator-sentinel --version

Commands:
  run        Monitor continuously (one cycle at startup, then every interval)
  cycle      Run a single monitoring cycle and print the report as JSON
  follow     Mention <ID> on every alert for <ADDRESS>
  unfollow   Stop mentioning <ID> for <ADDRESS>
  following  List the validators <ID> follows
  status     Show the current on-chain status of <ADDRESS>
  history    Show recent alerts fired for <ADDRESS>

Options:
  -s, --subscriber <ID>  Subscriber (chat user) id
  -n, --limit <N>        History: number of entries (default: {default_limit})
  -h, --help             Show this help text
  -V, --version          Show version

Environment:
  SENTINEL_CHAIN_API_URL, CHAIN_SS58_PREFIX, DISCORD_TOKEN, DISCORD_CHANNEL_ID,
  SENTINEL_DRY_RUN, SENTINEL_DATA_DIR, SENTINEL_MONITOR_INTERVAL, COOLDOWN_DAYS,
  SENTINEL_INACTIVITY_THRESHOLDS, SENTINEL_INACTIVITY_RESET,
  SENTINEL_MAX_CONCURRENT_FETCHES, SENTINEL_HTTP_TIMEOUT_MS",
        version = version_text(),
        default_limit = DEFAULT_HISTORY_LIMIT
    )
}

fn parse_u32_arg(flag: &str, raw: &str) -> Result<u32> {
    raw.parse::<u32>().ok().filter(|v| *v > 0).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid value for {}: '{}'. Expected a positive integer.\n\n{}",
            flag,
            raw,
            usage_text()
        )
    })
}

fn required_value(flag: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing value for {}.\n\n{}", flag, usage_text()))
}

pub fn parse_cli_args<I, S>(args: I) -> Result<AppCommand>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut iter = args.into_iter();
    let _program_name = iter.next();

    let mut command: Option<String> = None;
    let mut address: Option<String> = None;
    let mut subscriber: Option<String> = None;
    let mut limit: Option<u32> = None;

    while let Some(arg) = iter.next() {
        let arg = arg.as_ref();
        match arg {
            "-h" | "--help" | "help" => return Ok(AppCommand::Help),
            "-V" | "--version" => return Ok(AppCommand::Version),
            "run" | "cycle" | "follow" | "unfollow" | "following" | "status" | "history"
                if command.is_none() =>
            {
                command = Some(arg.to_string());
            }
            "-s" | "--subscriber" => {
                let value = iter.next().map(|v| v.as_ref().to_string());
                subscriber = Some(required_value("--subscriber", value)?);
            }
            "-n" | "--limit" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("Missing value for --limit.\n\n{}", usage_text())
                })?;
                limit = Some(parse_u32_arg("--limit", value.as_ref())?);
            }
            _ if arg.starts_with("--subscriber=") => {
                let value = arg.split_once('=').map(|(_, v)| v.to_string());
                subscriber = Some(required_value("--subscriber", value)?);
            }
            _ if arg.starts_with("--limit=") => {
                let value = arg.split_once('=').map(|(_, v)| v).unwrap_or_default();
                limit = Some(parse_u32_arg("--limit", value)?);
            }
            _ if arg.starts_with('-') => {
                return Err(anyhow::anyhow!(
                    "Unknown argument: {arg}\n\n{}",
                    usage_text()
                ));
            }
            _ if command.is_some() && address.is_none() => {
                address = Some(arg.to_string());
            }
            _ => {
                return Err(anyhow::anyhow!(
                    "Unexpected argument: {arg}\n\n{}",
                    usage_text()
                ));
            }
        }
    }

    let Some(selected) = command else {
        if address.is_none() && subscriber.is_none() && limit.is_none() {
            return Ok(AppCommand::Help);
        }
        return Err(anyhow::anyhow!(
            "Missing command. Use one of: run, cycle, follow, unfollow, following, status, history.\n\n{}",
            usage_text()
        ));
    };

    if limit.is_some() && selected != "history" {
        return Err(anyhow::anyhow!(
            "--limit is only valid with history.\n\n{}",
            usage_text()
        ));
    }

    let needs_address = matches!(
        selected.as_str(),
        "follow" | "unfollow" | "status" | "history"
    );
    let needs_subscriber = matches!(selected.as_str(), "follow" | "unfollow" | "following");

    if !needs_address && address.is_some() {
        return Err(anyhow::anyhow!(
            "{} does not take an address.\n\n{}",
            selected,
            usage_text()
        ));
    }
    if !needs_subscriber && subscriber.is_some() {
        return Err(anyhow::anyhow!(
            "--subscriber is not valid with {}.\n\n{}",
            selected,
            usage_text()
        ));
    }

    let address = if needs_address {
        address.ok_or_else(|| {
            anyhow::anyhow!("{} requires a validator address.\n\n{}", selected, usage_text())
        })?
    } else {
        String::new()
    };
    let subscriber = if needs_subscriber {
        subscriber.ok_or_else(|| {
            anyhow::anyhow!("{} requires --subscriber <ID>.\n\n{}", selected, usage_text())
        })?
    } else {
        String::new()
    };

    match selected.as_str() {
        "run" => Ok(AppCommand::Run),
        "cycle" => Ok(AppCommand::Cycle),
        "follow" => Ok(AppCommand::Follow {
            address,
            subscriber,
        }),
        "unfollow" => Ok(AppCommand::Unfollow {
            address,
            subscriber,
        }),
        "following" => Ok(AppCommand::Following { subscriber }),
        "status" => Ok(AppCommand::Status { address }),
        "history" => Ok(AppCommand::History {
            address,
            limit: limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        }),
        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\n\n{}",
            usage_text()
        )),
    }
}
