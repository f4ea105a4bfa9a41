//! Inbound messages and passive replies.

use chrono::Utc;
use serde::Deserialize;

use super::WxError;

/// A message pushed by the platform.
///
/// Only the fields the board acts on are kept; anything else in the XML
/// (media ids, locations, ...) is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename = "xml")]
pub struct Message {
    #[serde(rename = "ToUserName")]
    pub to_user: String,
    #[serde(rename = "FromUserName")]
    pub from_user: String,
    #[serde(rename = "CreateTime", default)]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
    #[serde(rename = "Event", default)]
    pub event: Option<String>,
    #[serde(rename = "MsgId", default)]
    pub msg_id: Option<i64>,
}

impl Message {
    /// Parse the XML body of a webhook POST.
    pub fn parse(xml: &str) -> Result<Self, WxError> {
        quick_xml::de::from_str(xml).map_err(|e| WxError::Parse(e.to_string()))
    }

    /// Text content, for text messages only.
    pub fn text(&self) -> Option<&str> {
        if self.msg_type == "text" {
            self.content.as_deref()
        } else {
            None
        }
    }

    pub fn is_subscribe(&self) -> bool {
        self.msg_type == "event"
            && self
                .event
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case("subscribe"))
    }

    /// The subscriber's open id.
    pub fn source(&self) -> &str {
        &self.from_user
    }
}

/// A passive text reply, addressed back to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReply {
    pub to_user: String,
    pub from_user: String,
    pub create_time: i64,
    pub content: String,
}

/// What the webhook answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(TextReply),
    /// Acknowledge without replying. Renders as an empty body.
    Empty,
}

impl Reply {
    /// A text reply to `message`.
    pub fn text(message: &Message, content: impl Into<String>) -> Self {
        Reply::Text(TextReply {
            to_user: message.from_user.clone(),
            from_user: message.to_user.clone(),
            create_time: Utc::now().timestamp(),
            content: content.into(),
        })
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Reply::Text(reply) => Some(&reply.content),
            Reply::Empty => None,
        }
    }

    /// Render as the platform's passive reply XML.
    pub fn render(&self) -> String {
        match self {
            Reply::Empty => String::new(),
            Reply::Text(reply) => format!(
                "<xml>\
                 <ToUserName><![CDATA[{}]]></ToUserName>\
                 <FromUserName><![CDATA[{}]]></FromUserName>\
                 <CreateTime>{}</CreateTime>\
                 <MsgType><![CDATA[text]]></MsgType>\
                 <Content><![CDATA[{}]]></Content>\
                 </xml>",
                cdata(&reply.to_user),
                cdata(&reply.from_user),
                reply.create_time,
                cdata(&reply.content),
            ),
        }
    }
}

/// Split any `]]>` so it cannot close the section early.
fn cdata(text: &str) -> String {
    text.replace("]]>", "]]]]><![CDATA[>")
}
