use factstore::models::Entity;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Entity,
    Migrate,
    Token,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Migrate(GlobalArgs),
    Token(TokenArgs),
    Entity(EntityArgs),
}

/// Options accepted by every command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Config file; `factstore.toml` in the working directory when absent.
    pub config: Option<PathBuf>,
    pub database: Option<String>,
    /// Caller identity for the access check.
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TokenArgs {
    pub global: GlobalArgs,
    pub username: String,
    pub admin: bool,
    /// When set, the user is authenticated and its stored admin flag is used.
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EntityArgs {
    pub global: GlobalArgs,
    pub entity: Entity,
    pub action: EntityAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityAction {
    /// `(filter key, raw value)` in command line order.
    List(Vec<(String, String)>),
    Get(String),
    Create(String),
    Update(String, String),
    Delete(String),
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help(HelpTopic::Root)),
        "migrate" => parse_migrate(it.map(|s| s.as_str())),
        "token" => parse_token(it.map(|s| s.as_str())),
        other => match other.parse::<Entity>() {
            Ok(entity) => parse_entity(entity, it.map(|s| s.as_str())),
            Err(_) => anyhow::bail!("unknown command: {other}"),
        },
    }
}

/// Consume `--name <v>` or `--name=<v>` if `token` is that option.
fn option_value<'a>(
    name: &str,
    token: &'a str,
    it: &mut impl Iterator<Item = &'a str>,
) -> anyhow::Result<Option<String>> {
    if token == name {
        let Some(v) = it.next() else {
            anyhow::bail!("{name} requires a value");
        };
        return Ok(Some(v.to_string()));
    }
    if let Some(v) = token.strip_prefix(name).and_then(|rest| rest.strip_prefix('=')) {
        return Ok(Some(v.to_string()));
    }
    Ok(None)
}

/// Try the global options; `true` when `token` was one of them.
fn parse_global<'a>(
    global: &mut GlobalArgs,
    token: &'a str,
    it: &mut impl Iterator<Item = &'a str>,
) -> anyhow::Result<bool> {
    if let Some(v) = option_value("--config", token, it)? {
        global.config = Some(PathBuf::from(v));
    } else if let Some(v) = option_value("--database", token, it)? {
        global.database = Some(v);
    } else if let Some(v) = option_value("--token", token, it)? {
        global.token = Some(v);
    } else {
        return Ok(false);
    }
    Ok(true)
}

fn parse_migrate<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut global = GlobalArgs::default();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Migrate)),
            _ if parse_global(&mut global, token, &mut it)? => {}
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Migrate(global))
}

fn parse_token<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut global = GlobalArgs::default();
    let mut username: Option<String> = None;
    let mut admin = false;
    let mut password: Option<String> = None;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Token)),
            "--admin" => admin = true,
            _ if parse_global(&mut global, token, &mut it)? => {}
            _ if token.starts_with("--password") => {
                password = option_value("--password", token, &mut it)?;
                if password.is_none() {
                    anyhow::bail!("unknown argument: {token}");
                }
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => {
                if username.is_some() {
                    anyhow::bail!("unexpected positional argument: {other}");
                }
                username = Some(other.to_string());
            }
        }
    }

    let Some(username) = username else {
        anyhow::bail!("missing username: usage `factstore token <username>`");
    };
    if admin && password.is_some() {
        anyhow::bail!("--admin cannot be combined with --password");
    }

    Ok(Command::Token(TokenArgs {
        global,
        username,
        admin,
        password,
    }))
}

fn parse_entity<'a>(entity: Entity, mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut global = GlobalArgs::default();
    let mut action: Option<&str> = None;
    let mut key: Option<String> = None;
    let mut data: Option<String> = None;
    let mut filters: Vec<(String, String)> = Vec::new();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Entity)),
            "list" | "get" | "create" | "update" | "delete" if action.is_none() => {
                action = Some(token);
            }
            _ if parse_global(&mut global, token, &mut it)? => {}
            _ if token == "--data" || token.starts_with("--data=") => {
                data = option_value("--data", token, &mut it)?;
            }
            other if other.starts_with("--") && action == Some("list") => {
                let name = other.trim_start_matches("--");
                let (name, value) = match name.split_once('=') {
                    Some((name, value)) => (name.to_string(), value.to_string()),
                    None => {
                        let Some(v) = it.next() else {
                            anyhow::bail!("--{name} requires a value");
                        };
                        (name.to_string(), v.to_string())
                    }
                };
                filters.push((name, value));
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => {
                if action.is_none() || key.is_some() {
                    anyhow::bail!("unexpected positional argument: {other}");
                }
                key = Some(other.to_string());
            }
        }
    }

    let action = match action {
        None => return Ok(Command::Help(HelpTopic::Entity)),
        Some("list") => {
            if key.is_some() || data.is_some() {
                anyhow::bail!("invalid options for `{entity} list`");
            }
            EntityAction::List(filters)
        }
        Some("get") => EntityAction::Get(require_key(entity, "get", key, &data)?),
        Some("delete") => EntityAction::Delete(require_key(entity, "delete", key, &data)?),
        Some("create") => {
            if key.is_some() {
                anyhow::bail!("`{entity} create` takes no key");
            }
            let Some(data) = data else {
                anyhow::bail!("missing --data: usage `factstore {entity} create --data <JSON>`");
            };
            EntityAction::Create(data)
        }
        Some("update") => {
            let Some(key) = key else {
                anyhow::bail!("missing key: usage `factstore {entity} update <KEY> --data <JSON>`");
            };
            let Some(data) = data else {
                anyhow::bail!("missing --data: usage `factstore {entity} update <KEY> --data <JSON>`");
            };
            EntityAction::Update(key, data)
        }
        Some(other) => anyhow::bail!("unknown action: {other}"),
    };

    Ok(Command::Entity(EntityArgs {
        global,
        entity,
        action,
    }))
}

fn require_key(
    entity: Entity,
    action: &str,
    key: Option<String>,
    data: &Option<String>,
) -> anyhow::Result<String> {
    if data.is_some() {
        anyhow::bail!("`{entity} {action}` takes no --data");
    }
    key.ok_or_else(|| anyhow::anyhow!("missing key: usage `factstore {entity} {action} <KEY>`"))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
factstore - companies, jobs, posts, topics and users in Postgres

USAGE:
  factstore <COMMAND> [OPTIONS]

COMMANDS:
  migrate                        Apply embedded schema migrations
  token <USERNAME>               Mint an access token
  <ENTITY> list|get|create|update|delete

ENTITIES:
  companies, jobs, posts, topics, users

GLOBAL OPTIONS:
  --config <FILE>       Config file path (default: factstore.toml if present)
  --database <URL>      Override the configured database URL
  --token <JWT>         Caller identity for access checks
  -h, --help            Print help

Run `factstore <command> --help` for more."
            );
        }
        HelpTopic::Entity => {
            println!(
                "\
USAGE:
  factstore <ENTITY> list [--<FILTER> <VALUE>]...
  factstore <ENTITY> get <KEY>
  factstore <ENTITY> create --data <JSON>
  factstore <ENTITY> update <KEY> --data <JSON>
  factstore <ENTITY> delete <KEY>

FILTERS:
  companies   --minEmployees N  --maxEmployees N  --nameLike TEXT
  jobs        --minSalary N  --hasEquity true  --titleLike TEXT
  posts       --contentLike TEXT  --username NAME  --topicName NAME
  topics      --nameLike TEXT

KEYS:
  companies: handle, jobs/posts: id, topics: name, users: username"
            );
        }
        HelpTopic::Migrate => {
            println!(
                "\
USAGE:
  factstore migrate [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path
  --database <URL>      Override the configured database URL
  -h, --help            Print help"
            );
        }
        HelpTopic::Token => {
            println!(
                "\
USAGE:
  factstore token <USERNAME> [--admin]
  factstore token <USERNAME> --password <PASSWORD>

OPTIONS:
  --admin               Mint an admin token without checking the database
  --password <PW>       Authenticate the user and use its stored admin flag
  -h, --help            Print help"
            );
        }
    }
}
