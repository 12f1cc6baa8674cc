use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Tables,
    Describe,
    Query,
    Get,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Tables(ConnArgs),
    Describe(DescribeArgs),
    Query(QueryArgs),
    Get(GetArgs),
}

/// Where to find the connection a command runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnArgs {
    pub config: PathBuf,
    pub connection: String,
    /// SQLite path or `postgres://` URL; bypasses the config file.
    pub database: Option<String>,
}

impl Default for ConnArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from("rowbind.toml"),
            connection: rowbind::DEFAULT_CONNECTION.to_string(),
            database: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DescribeArgs {
    pub conn: ConnArgs,
    pub table: String,
}

#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub conn: ConnArgs,
    pub sql: String,
}

#[derive(Debug, Clone)]
pub struct GetArgs {
    pub conn: ConnArgs,
    pub table: String,
    pub key: Vec<String>,
    pub columns: Option<Vec<String>>,
    pub json: bool,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1).map(|s| s.as_str());
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    let topic = match first {
        "-h" | "--help" => return Ok(Command::Help(HelpTopic::Root)),
        "tables" => HelpTopic::Tables,
        "describe" => HelpTopic::Describe,
        "query" => HelpTopic::Query,
        "get" => HelpTopic::Get,
        _ => anyhow::bail!("unknown command: {first}"),
    };

    let mut conn = ConnArgs::default();
    let mut columns: Option<Vec<String>> = None;
    let mut json = false;
    let mut positional: Vec<String> = Vec::new();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(topic)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                conn.config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                conn.config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--connection" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--connection requires a value");
                };
                conn.connection = v.to_string();
            }
            _ if token.starts_with("--connection=") => {
                conn.connection = token.trim_start_matches("--connection=").to_string();
            }
            "--database" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--database requires a value");
                };
                conn.database = Some(v.to_string());
            }
            _ if token.starts_with("--database=") => {
                conn.database = Some(token.trim_start_matches("--database=").to_string());
            }
            "--columns" if topic == HelpTopic::Get => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--columns requires a value");
                };
                columns = Some(parse_columns(v)?);
            }
            _ if topic == HelpTopic::Get && token.starts_with("--columns=") => {
                columns = Some(parse_columns(token.trim_start_matches("--columns="))?);
            }
            "--json" if topic == HelpTopic::Get => json = true,
            other if other.starts_with("--") => anyhow::bail!("unknown argument: {other}"),
            other => positional.push(other.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    let cmd = match topic {
        HelpTopic::Tables => {
            if let Some(extra) = positional.next() {
                anyhow::bail!("unexpected argument: {extra}");
            }
            Command::Tables(conn)
        }
        HelpTopic::Describe => {
            let Some(table) = positional.next() else {
                anyhow::bail!("missing table: expected `rowbind describe <TABLE>`");
            };
            if let Some(extra) = positional.next() {
                anyhow::bail!("unexpected argument: {extra}");
            }
            Command::Describe(DescribeArgs { conn, table })
        }
        HelpTopic::Query => {
            let sql = positional.collect::<Vec<_>>().join(" ");
            if sql.trim().is_empty() {
                anyhow::bail!("missing statement: expected `rowbind query <SQL>`");
            }
            Command::Query(QueryArgs { conn, sql })
        }
        HelpTopic::Get => {
            let Some(table) = positional.next() else {
                anyhow::bail!("missing table: expected `rowbind get <TABLE> <KEY>...`");
            };
            let key: Vec<String> = positional.collect();
            if key.is_empty() {
                anyhow::bail!("missing key: expected `rowbind get <TABLE> <KEY>...`");
            }
            Command::Get(GetArgs {
                conn,
                table,
                key,
                columns,
                json,
            })
        }
        HelpTopic::Root => unreachable!("root help returns early"),
    };

    Ok(cmd)
}

fn parse_columns(v: &str) -> anyhow::Result<Vec<String>> {
    let parsed: Vec<String> = v
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if parsed.is_empty() {
        anyhow::bail!("--columns must not be empty");
    }
    Ok(parsed)
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
rowbind - inspect databases and rows through rowbind connections

USAGE:
  rowbind <COMMAND> [OPTIONS]

COMMANDS:
  tables        List tables
  describe      Show a table's columns and keys
  query         Run one SQL statement
  get           Fetch one row by key

GLOBAL OPTIONS:
  --config <FILE>          Config file path (default: rowbind.toml)
  --connection <NAME>      Connection from the config (default: default)
  --database <PATH|URL>    SQLite path or postgres:// URL; ignores the config
  -h, --help               Print help

Run `rowbind <command> --help` for more."
            );
        }
        HelpTopic::Tables => {
            println!(
                "\
USAGE:
  rowbind tables [OPTIONS]

Lists every table of the connection."
            );
        }
        HelpTopic::Describe => {
            println!(
                "\
USAGE:
  rowbind describe <TABLE> [OPTIONS]

Shows the columns of TABLE in order, marking primary key and
autoincrement columns."
            );
        }
        HelpTopic::Query => {
            println!(
                "\
USAGE:
  rowbind query <SQL> [OPTIONS]

Runs SQL and prints its rows, the inserted id, or the affected row count."
            );
        }
        HelpTopic::Get => {
            println!(
                "\
USAGE:
  rowbind get <TABLE> <KEY>... [OPTIONS]

Fetches the row of TABLE whose key columns equal KEY. Integer keys are
compared as numbers, everything else as text.

GET OPTIONS:
  --columns <A,B>     Key columns (default: the primary key)
  --json              Print the row as JSON"
            );
        }
    }
}
