use crate::cli::{EntityAction, EntityArgs, GlobalArgs, TokenArgs};
use anyhow::Context;
use factstore::models::{
    self, Company, CompanyFilter, Entity, Job, JobFilter, Operation, Post, PostFilter, Topic,
    TopicFilter, User, UserPatch,
};
use factstore::{
    Access, Claims, PasswordHasher, Store, StoreConfig, TracedClient, authorize, create_token,
    telemetry, verify_token,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};

const TOKEN_ENV: &str = "FACTSTORE_TOKEN";

struct Session {
    config: StoreConfig,
    conn: TracedClient<Store>,
    caller: Option<Claims>,
}

impl Session {
    async fn open(global: &GlobalArgs) -> anyhow::Result<Self> {
        let config = load_config(global)?;
        let store = Store::from_config(&config).await?;

        let mut conn = TracedClient::new(store);
        if let Some(threshold) = config.slow_query_threshold() {
            conn = conn.slow_query_threshold(threshold);
        }

        let token = global.token.clone().or_else(|| std::env::var(TOKEN_ENV).ok());
        let caller = token.and_then(|t| verify_token(&config.auth.secret_key, &t));

        Ok(Self {
            config,
            conn,
            caller,
        })
    }

    fn hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.config.bcrypt_work_factor())
    }

    fn check(&self, entity: Entity, op: Operation, key: Option<&str>) -> anyhow::Result<()> {
        self.require(&models::access(entity, op, key))
    }

    fn require(&self, access: &Access) -> anyhow::Result<()> {
        authorize(access, self.caller.as_ref())?;
        Ok(())
    }

    async fn close(self) -> anyhow::Result<()> {
        self.conn.into_inner().close().await?;
        Ok(())
    }
}

fn load_config(global: &GlobalArgs) -> anyhow::Result<StoreConfig> {
    let mut config = StoreConfig::load(global.config.as_deref())?;
    if let Some(url) = &global.database {
        config.database.url = url.clone();
        config.database.test_url = Some(url.clone());
    }
    telemetry::init_from_config(&config.logging)?;
    Ok(config)
}

pub async fn run_migrate(global: GlobalArgs) -> anyhow::Result<()> {
    let config = load_config(&global)?;
    let mut store = Store::from_config(&config).await?;

    let report = factstore::migrate::run(store.client_mut()).await?;
    let applied = report.applied_migrations();
    if applied.is_empty() {
        println!("Schema is up to date.");
    } else {
        for m in applied {
            println!("applied V{}__{}", m.version(), m.name());
        }
    }

    store.close().await?;
    Ok(())
}

pub async fn run_token(args: TokenArgs) -> anyhow::Result<()> {
    let config = load_config(&args.global)?;

    let claims = match &args.password {
        Some(password) => {
            let store = Store::from_config(&config).await?;
            let conn = TracedClient::new(store);
            let hasher = PasswordHasher::new(config.bcrypt_work_factor());
            let user = User::authenticate(&conn, &hasher, &args.username, password).await;
            conn.into_inner().close().await?;
            let user = user?;
            Claims::new(user.username, user.is_admin, config.auth.token_ttl_hours)
        }
        None => Claims::new(args.username, args.admin, config.auth.token_ttl_hours),
    };

    println!("{}", create_token(&config.auth.secret_key, &claims)?);
    Ok(())
}

pub async fn run_entity(args: EntityArgs) -> anyhow::Result<()> {
    let session = Session::open(&args.global).await?;
    let result = dispatch(&session, args.entity, args.action).await;
    session.close().await?;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

fn operation(action: &EntityAction) -> (Operation, Option<&str>) {
    match action {
        EntityAction::List(_) => (Operation::List, None),
        EntityAction::Get(key) => (Operation::Get, Some(key)),
        EntityAction::Create(_) => (Operation::Create, None),
        EntityAction::Update(key, _) => (Operation::Update, Some(key)),
        EntityAction::Delete(key) => (Operation::Remove, Some(key)),
    }
}

async fn dispatch(session: &Session, entity: Entity, action: EntityAction) -> anyhow::Result<Json> {
    let (op, key) = operation(&action);
    session.check(entity, op, key)?;
    tracing::debug!(target: "factstore.cli", %entity, ?op, key, "dispatching");

    let conn = &session.conn;
    match (entity, action) {
        (Entity::Company, EntityAction::List(f)) => {
            json(Company::find_all(conn, &filters::<CompanyFilter>(f)?).await?)
        }
        (Entity::Company, EntityAction::Get(handle)) => json(Company::get(conn, &handle).await?),
        (Entity::Company, EntityAction::Create(data)) => {
            json(Company::create(conn, body(&data)?).await?)
        }
        (Entity::Company, EntityAction::Update(handle, data)) => {
            json(Company::update(conn, &handle, body(&data)?).await?)
        }
        (Entity::Company, EntityAction::Delete(handle)) => {
            Company::remove(conn, &handle).await?;
            Ok(deleted(&handle))
        }

        (Entity::Job, EntityAction::List(f)) => {
            json(Job::find_all(conn, &filters::<JobFilter>(f)?).await?)
        }
        (Entity::Job, EntityAction::Get(id)) => json(Job::get(conn, int_key(&id)?).await?),
        (Entity::Job, EntityAction::Create(data)) => json(Job::create(conn, body(&data)?).await?),
        (Entity::Job, EntityAction::Update(id, data)) => {
            json(Job::update(conn, int_key(&id)?, body(&data)?).await?)
        }
        (Entity::Job, EntityAction::Delete(id)) => {
            Job::remove(conn, int_key(&id)?).await?;
            Ok(deleted(&id))
        }

        (Entity::Post, EntityAction::List(f)) => {
            json(Post::find_all(conn, &filters::<PostFilter>(f)?).await?)
        }
        (Entity::Post, EntityAction::Get(id)) => json(Post::get(conn, int_key(&id)?).await?),
        (Entity::Post, EntityAction::Create(data)) => json(Post::create(conn, body(&data)?).await?),
        (Entity::Post, EntityAction::Update(id, data)) => {
            json(Post::update(conn, int_key(&id)?, body(&data)?).await?)
        }
        (Entity::Post, EntityAction::Delete(id)) => {
            Post::remove(conn, int_key(&id)?).await?;
            Ok(deleted(&id))
        }

        (Entity::Topic, EntityAction::List(f)) => {
            json(Topic::find_all(conn, &filters::<TopicFilter>(f)?).await?)
        }
        (Entity::Topic, EntityAction::Get(name)) => json(Topic::get(conn, &name).await?),
        (Entity::Topic, EntityAction::Create(data)) => {
            json(Topic::create(conn, body(&data)?).await?)
        }
        (Entity::Topic, EntityAction::Update(name, data)) => {
            json(Topic::update(conn, &name, body(&data)?).await?)
        }
        (Entity::Topic, EntityAction::Delete(name)) => {
            Topic::remove(conn, &name).await?;
            Ok(deleted(&name))
        }

        (Entity::User, EntityAction::List(f)) => {
            if !f.is_empty() {
                anyhow::bail!("users list takes no filters");
            }
            json(User::find_all(conn).await?)
        }
        (Entity::User, EntityAction::Get(username)) => json(User::get(conn, &username).await?),
        (Entity::User, EntityAction::Create(data)) => {
            json(User::register(conn, &session.hasher(), body(&data)?).await?)
        }
        (Entity::User, EntityAction::Update(username, data)) => {
            let patch: UserPatch = body(&data)?;
            session.require(&patch.required_access(&username))?;
            json(User::update(conn, &session.hasher(), &username, patch).await?)
        }
        (Entity::User, EntityAction::Delete(username)) => {
            User::remove(conn, &username).await?;
            Ok(deleted(&username))
        }
    }
}

fn json(value: impl Serialize) -> anyhow::Result<Json> {
    Ok(serde_json::to_value(value)?)
}

fn deleted(key: &str) -> Json {
    let mut out = Map::new();
    out.insert("deleted".to_string(), Json::String(key.to_string()));
    Json::Object(out)
}

fn body<T: DeserializeOwned>(data: &str) -> anyhow::Result<T> {
    serde_json::from_str(data).context("invalid --data JSON")
}

fn int_key(key: &str) -> anyhow::Result<i32> {
    key.parse()
        .with_context(|| format!("expected a numeric id, got {key:?}"))
}

/// Build a typed filter from `--name value` pairs.
///
/// Values parse as JSON scalars when they can (`150`, `true`) and fall back
/// to strings. Numeric text for a text filter must be quoted: `--nameLike '"42"'`.
fn filters<T: DeserializeOwned>(pairs: Vec<(String, String)>) -> anyhow::Result<T> {
    let mut map = Map::new();
    for (name, raw) in pairs {
        let value = serde_json::from_str::<Json>(&raw)
            .ok()
            .filter(|v| !v.is_object() && !v.is_array())
            .unwrap_or(Json::String(raw));
        map.insert(name, value);
    }
    serde_json::from_value(Json::Object(map)).context("invalid filter")
}
