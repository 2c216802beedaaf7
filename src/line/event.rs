use serde::Deserialize;

/// webhook 请求体
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub postback: Option<Postback>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// 由事件解析出的预约操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListSessions,
    MyRegistrations,
    Register {
        session_id: String,
        visitors: Option<i32>,
        name: Option<String>,
        cellphone: Option<String>,
        remark: Option<String>,
    },
    Cancel {
        registration_id: String,
        reason: Option<String>,
    },
}

/// postback data 采用表单编码，例如 `action=register&session_id=S1&visitors=2`
#[derive(Debug, Deserialize)]
struct PostbackData {
    action: String,
    session_id: Option<String>,
    visitors: Option<String>,
    name: Option<String>,
    cellphone: Option<String>,
    remark: Option<String>,
    registration_id: Option<String>,
    reason: Option<String>,
}

impl Command {
    pub fn from_postback(data: &str) -> Option<Self> {
        let data: PostbackData = serde_urlencoded::from_str(data).ok()?;
        match data.action.as_str() {
            "sessions" => Some(Command::ListSessions),
            "mine" => Some(Command::MyRegistrations),
            "register" => Some(Command::Register {
                session_id: data.session_id.filter(|s| !s.is_empty())?,
                // 无法解析的人数交给报名校验处理
                visitors: data
                    .visitors
                    .map(|v| v.trim().parse().unwrap_or(0)),
                name: data.name,
                cellphone: data.cellphone,
                remark: data.remark,
            }),
            "cancel" => Some(Command::Cancel {
                registration_id: data.registration_id.filter(|s| !s.is_empty())?,
                reason: data.reason,
            }),
            _ => None,
        }
    }

    pub fn from_text(text: &str) -> Option<Self> {
        match text.trim() {
            "場次" | "场次" | "sessions" => Some(Command::ListSessions),
            "我的報名" | "我的报名" | "mine" => Some(Command::MyRegistrations),
            _ => None,
        }
    }
}

impl WebhookEvent {
    pub fn user_id(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.user_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// 只处理 postback 与文字指令，其余事件忽略
    pub fn command(&self) -> Option<Command> {
        match self.kind.as_str() {
            "postback" => self
                .postback
                .as_ref()
                .and_then(|p| Command::from_postback(&p.data)),
            "message" => self
                .message
                .as_ref()
                .filter(|m| m.kind == "text")
                .and_then(|m| m.text.as_deref())
                .and_then(Command::from_text),
            _ => None,
        }
    }
}
