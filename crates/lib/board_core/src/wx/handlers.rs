//! The board's command handlers, in dispatch priority order.

use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::WxError;
use super::client::ProfileClient;
use super::dispatcher::{MessageDispatcher, MessageHandler, command_args};
use super::ip::IpLocator;
use super::message::{Message, Reply};
use crate::probe::RedisProbe;
use crate::store;
use crate::validation::looks_like_ipv4;

pub const WELCOME: &str = "Welcome to Redis Board!";
pub const INVALID_IP: &str = "Invalid IP address.";
pub const IP_NOT_FOUND: &str = "No location found for this IP address.";
pub const NOT_BOUND: &str = "You are not bound to a Redis Board user yet. Send \"bind\" first.";
pub const NO_SERVERS: &str = "No Redis servers yet.";
pub const NOTHING_TO_DELETE: &str = "No servers specified.";

/// Everything the standard handlers need.
#[derive(Clone)]
pub struct HandlerDeps {
    pub pool: SqlitePool,
    pub probe: Arc<dyn RedisProbe>,
    /// Passphrase for sealed server passwords.
    pub secret_key: String,
    /// External base URL of the board, used in bind links.
    pub public_url: String,
    pub profile: Option<Arc<dyn ProfileClient>>,
    pub locator: Arc<dyn IpLocator>,
}

/// The standard chain: subscribe, ip, bind, redis, echo.
pub fn default_dispatcher(deps: HandlerDeps) -> MessageDispatcher {
    MessageDispatcher::new()
        .with(SubscribeHandler::new(deps.profile.clone()))
        .with(IpLocationHandler::new(deps.locator.clone()))
        .with(BindHandler::new(deps.pool.clone(), &deps.public_url))
        .with(RedisCommandHandler::new(
            deps.pool.clone(),
            deps.probe.clone(),
            deps.secret_key.clone(),
        ))
        .with(EchoHandler)
}

/// Greets new subscribers, by nickname when a profile client is available.
pub struct SubscribeHandler {
    profile: Option<Arc<dyn ProfileClient>>,
}

impl SubscribeHandler {
    pub fn new(profile: Option<Arc<dyn ProfileClient>>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl MessageHandler for SubscribeHandler {
    fn name(&self) -> &'static str {
        "subscribe"
    }

    async fn handle(&self, message: &Message) -> Result<Option<Reply>, WxError> {
        if !message.is_subscribe() {
            return Ok(None);
        }
        let nickname = match &self.profile {
            Some(profile) => profile.nickname(message.source()).await?,
            None => None,
        };
        info!(from = message.source(), "new subscriber");
        let text = match nickname {
            Some(name) => format!("Welcome to Redis Board, {name}!"),
            None => WELCOME.to_string(),
        };
        Ok(Some(Reply::text(message, text)))
    }
}

/// `ip <addr>`: look up where an address is.
pub struct IpLocationHandler {
    locator: Arc<dyn IpLocator>,
}

impl IpLocationHandler {
    pub fn new(locator: Arc<dyn IpLocator>) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl MessageHandler for IpLocationHandler {
    fn name(&self) -> &'static str {
        "ip"
    }

    async fn handle(&self, message: &Message) -> Result<Option<Reply>, WxError> {
        let Some(args) = command_args(message, "ip") else {
            return Ok(None);
        };
        let [_, addr] = args.as_slice() else {
            return Ok(Some(Reply::text(message, INVALID_IP)));
        };
        let parsed = looks_like_ipv4(addr)
            .then(|| addr.parse::<Ipv4Addr>().ok())
            .flatten();
        let Some(ip) = parsed else {
            return Ok(Some(Reply::text(message, INVALID_IP)));
        };
        let text = self
            .locator
            .locate(ip)
            .unwrap_or_else(|| IP_NOT_FOUND.to_string());
        Ok(Some(Reply::text(message, text)))
    }
}

/// `bind`: link the subscriber to a board account via a web form.
pub struct BindHandler {
    pool: SqlitePool,
    public_url: String,
}

impl BindHandler {
    pub fn new(pool: SqlitePool, public_url: &str) -> Self {
        Self {
            pool,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MessageHandler for BindHandler {
    fn name(&self) -> &'static str {
        "bind"
    }

    async fn handle(&self, message: &Message) -> Result<Option<Reply>, WxError> {
        if command_args(message, "bind").is_none() {
            return Ok(None);
        }
        if let Some(user) = store::users::find_by_wx_id(&self.pool, message.source()).await? {
            return Ok(Some(Reply::text(
                message,
                format!("You are already bound to {}.", user.name),
            )));
        }
        let url = format!("{}/wx/bind/{}", self.public_url, message.source());
        Ok(Some(Reply::text(
            message,
            format!("Open this link to bind your account: {url}"),
        )))
    }
}

/// `redis ls` and `redis del <name>...` for bound subscribers.
pub struct RedisCommandHandler {
    pool: SqlitePool,
    probe: Arc<dyn RedisProbe>,
    secret_key: String,
}

impl RedisCommandHandler {
    pub fn new(pool: SqlitePool, probe: Arc<dyn RedisProbe>, secret_key: String) -> Self {
        Self {
            pool,
            probe,
            secret_key,
        }
    }

    async fn list(&self) -> Result<String, WxError> {
        let servers = store::servers::list_all(&self.pool).await?;
        if servers.is_empty() {
            return Ok(NO_SERVERS.to_string());
        }
        let checks = servers.iter().map(|server| async move {
            let up = match server.target(&self.secret_key) {
                Ok(target) => self.probe.ping(&target).await.unwrap_or(false),
                Err(e) => {
                    warn!(id = server.id, error = %e, "cannot unseal server password");
                    false
                }
            };
            let status = if up { "ok" } else { "down" };
            format!("{} {} {status}", server.name, server.host)
        });
        Ok(join_all(checks).await.join("\n"))
    }

    async fn delete(&self, names: &[&str]) -> Result<String, WxError> {
        if names.is_empty() {
            return Ok(NOTHING_TO_DELETE.to_string());
        }
        let mut lines = Vec::with_capacity(names.len());
        for name in names {
            match store::servers::find_by_name(&self.pool, name).await? {
                Some(server) => {
                    store::servers::delete(&self.pool, server.id).await?;
                    lines.push(format!("Deleted {name}"));
                }
                None => lines.push(format!("Not found: {name}")),
            }
        }
        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl MessageHandler for RedisCommandHandler {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn handle(&self, message: &Message) -> Result<Option<Reply>, WxError> {
        let Some(args) = command_args(message, "redis") else {
            return Ok(None);
        };
        let Some(user) = store::users::find_by_wx_id(&self.pool, message.source()).await? else {
            return Ok(Some(Reply::text(message, NOT_BOUND)));
        };
        let Some(sub) = args.get(1) else {
            return Ok(None);
        };
        let text = match sub.to_ascii_lowercase().as_str() {
            "ls" => self.list().await?,
            "del" => {
                info!(uid = user.id, servers = ?&args[2..], "deleting servers via chat");
                self.delete(&args[2..]).await?
            }
            _ => return Ok(None),
        };
        Ok(Some(Reply::text(message, text)))
    }
}

/// Echoes any text message back. Last in the chain.
pub struct EchoHandler;

#[async_trait]
impl MessageHandler for EchoHandler {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn handle(&self, message: &Message) -> Result<Option<Reply>, WxError> {
        Ok(message.text().map(|text| Reply::text(message, text)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, Value};

    use super::*;
    use crate::db;
    use crate::models::server::ServerInput;
    use crate::models::user::{USER_CREATE_RULES, UserInput};
    use crate::probe::{ProbeError, RedisTarget};
    use crate::wx::ip::RangeTable;

    const KEY: &str = "test-key";

    /// Only `127.0.0.1` answers.
    struct LocalOnly;

    #[async_trait]
    impl RedisProbe for LocalOnly {
        async fn ping(&self, target: &RedisTarget) -> Result<bool, ProbeError> {
            if target.host == "127.0.0.1" {
                Ok(true)
            } else {
                Err(ProbeError::Unreachable {
                    host: target.host.clone(),
                })
            }
        }

        async fn info(&self, _: &RedisTarget) -> Result<Map<String, Value>, ProbeError> {
            Ok(Map::new())
        }
    }

    struct Nick(Result<Option<String>, ()>);

    #[async_trait]
    impl ProfileClient for Nick {
        async fn nickname(&self, _: &str) -> Result<Option<String>, WxError> {
            self.0.clone().map_err(|_| WxError::Backend("down".into()))
        }
    }

    fn text(from: &str, content: &str) -> Message {
        Message {
            to_user: "gh_board".into(),
            from_user: from.into(),
            msg_type: "text".into(),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    fn subscribe() -> Message {
        Message {
            to_user: "gh_board".into(),
            from_user: "oNew".into(),
            msg_type: "event".into(),
            event: Some("subscribe".into()),
            ..Default::default()
        }
    }

    async fn dispatcher(pool: &SqlitePool) -> MessageDispatcher {
        default_dispatcher(HandlerDeps {
            pool: pool.clone(),
            probe: Arc::new(LocalOnly),
            secret_key: KEY.into(),
            public_url: "http://board.test/".into(),
            profile: None,
            locator: Arc::new(RangeTable::parse("8.8.8.0 8.8.8.255 Google DNS")),
        })
    }

    async fn bound_user(pool: &SqlitePool, wx_id: &str) {
        let user = UserInput {
            name: Some("ops".into()),
            email: Some("ops@example.com".into()),
            password: Some("123456".into()),
            is_admin: None,
        }
        .into_new(USER_CREATE_RULES)
        .unwrap();
        let row = store::users::create(pool, &user).await.unwrap();
        store::users::bind_wx_id(pool, row.id, wx_id).await.unwrap();
    }

    async fn server(pool: &SqlitePool, name: &str, host: &str) {
        let new = ServerInput {
            name: Some(name.into()),
            host: Some(host.into()),
            ..Default::default()
        }
        .into_new()
        .unwrap();
        store::servers::create(pool, &new, KEY).await.unwrap();
    }

    async fn reply(d: &MessageDispatcher, msg: Message) -> String {
        d.dispatch(&msg).await.unwrap().content().unwrap_or("").to_string()
    }

    #[tokio::test]
    async fn welcomes_subscribers() {
        let plain = SubscribeHandler::new(None);
        let reply = plain.handle(&subscribe()).await.unwrap().unwrap();
        assert_eq!(Some(WELCOME), reply.content());

        let named = SubscribeHandler::new(Some(Arc::new(Nick(Ok(Some("Bao".into()))))));
        let reply = named.handle(&subscribe()).await.unwrap().unwrap();
        assert_eq!(Some("Welcome to Redis Board, Bao!"), reply.content());
    }

    #[tokio::test]
    async fn profile_failure_surfaces() {
        let handler = SubscribeHandler::new(Some(Arc::new(Nick(Err(())))));
        assert!(matches!(handler.handle(&subscribe()).await, Err(WxError::Backend(_))));
    }

    #[tokio::test]
    async fn ip_lookup() {
        let pool = db::memory().await.unwrap();
        let d = dispatcher(&pool).await;
        assert_eq!("Google DNS", reply(&d, text("o1", "ip 8.8.8.8")).await);
        assert_eq!(IP_NOT_FOUND, reply(&d, text("o1", "IP 1.1.1.1")).await);
        assert_eq!(INVALID_IP, reply(&d, text("o1", "ip")).await);
        assert_eq!(INVALID_IP, reply(&d, text("o1", "ip 1.1.1.1 2.2.2.2")).await);
        assert_eq!(INVALID_IP, reply(&d, text("o1", "ip 1.1.1")).await);
        assert_eq!(INVALID_IP, reply(&d, text("o1", "ip 999.1.1.1")).await);
    }

    #[tokio::test]
    async fn bind_replies_link_or_current_user() {
        let pool = db::memory().await.unwrap();
        let d = dispatcher(&pool).await;
        let link = reply(&d, text("oWx1", "bind")).await;
        assert!(link.ends_with("http://board.test/wx/bind/oWx1"), "{link}");

        bound_user(&pool, "oWx1").await;
        assert_eq!("You are already bound to ops.", reply(&d, text("oWx1", "bind")).await);
    }

    #[tokio::test]
    async fn redis_requires_binding() {
        let pool = db::memory().await.unwrap();
        let d = dispatcher(&pool).await;
        let got = reply(&d, text("oStranger", "redis ls")).await;
        assert!(got.contains("not bound"), "{got}");
    }

    #[tokio::test]
    async fn redis_ls_reports_status() {
        let pool = db::memory().await.unwrap();
        let d = dispatcher(&pool).await;
        bound_user(&pool, "oWx1").await;
        assert_eq!(NO_SERVERS, reply(&d, text("oWx1", "redis ls")).await);

        server(&pool, "local", "127.0.0.1").await;
        server(&pool, "remote", "10.0.0.9").await;
        assert_eq!(
            "local 127.0.0.1 ok\nremote 10.0.0.9 down",
            reply(&d, text("oWx1", "redis LS")).await
        );
    }

    #[tokio::test]
    async fn redis_del_reports_each_name() {
        let pool = db::memory().await.unwrap();
        let d = dispatcher(&pool).await;
        bound_user(&pool, "oWx1").await;
        server(&pool, "cache", "127.0.0.1").await;

        assert_eq!(NOTHING_TO_DELETE, reply(&d, text("oWx1", "redis del")).await);
        assert_eq!(
            "Deleted cache\nNot found: ghost",
            reply(&d, text("oWx1", "redis del cache ghost")).await
        );
        assert_eq!(0, store::servers::count(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_redis_subcommand_falls_through_to_echo() {
        let pool = db::memory().await.unwrap();
        let d = dispatcher(&pool).await;
        bound_user(&pool, "oWx1").await;
        assert_eq!("redis", reply(&d, text("oWx1", "redis")).await);
        assert_eq!("redis flush", reply(&d, text("oWx1", "redis flush")).await);
    }

    #[tokio::test]
    async fn other_text_is_echoed() {
        let pool = db::memory().await.unwrap();
        let d = dispatcher(&pool).await;
        assert_eq!("hello there", reply(&d, text("o1", "hello there")).await);

        let image = Message {
            msg_type: "image".into(),
            ..text("o1", "")
        };
        assert_eq!(Reply::Empty, d.dispatch(&image).await.unwrap());
    }
}
