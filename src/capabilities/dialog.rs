//! Dialogs: modal surfaces opened by the app and hosted by the host.
//!
//! The opener (content, sidePanel or meetingStage) starts a dialog and may
//! exchange messages with it; the dialog itself runs in the `task` context.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{require_non_empty, to_arg};
use crate::context::FrameContext;
use crate::error::{SdkError, SdkResult};
use crate::session::Session;

pub const CAPABILITY: &str = "dialog";

pub(crate) const START_TASK: &str = "tasks.startTask";
pub(crate) const COMPLETE_TASK: &str = "tasks.completeTask";
pub(crate) const MESSAGE_FOR_PARENT: &str = "messageForParent";
pub(crate) const MESSAGE_FOR_CHILD: &str = "messageForChild";

const OPENER_CONTEXTS: &[FrameContext] = &[
    FrameContext::Content,
    FrameContext::SidePanel,
    FrameContext::MeetingStage,
];

const ANY_DIALOG_CONTEXT: &[FrameContext] = &[
    FrameContext::Content,
    FrameContext::SidePanel,
    FrameContext::Task,
    FrameContext::MeetingStage,
];

const INSIDE_DIALOG: &[FrameContext] = &[FrameContext::Task];

/// Called once when the dialog closes.
pub type SubmitHandler = Box<dyn FnOnce(DialogSubmitResult) + Send>;

/// Called for every message passed between opener and dialog.
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Preset dialog dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogDimensionName {
    Large,
    Medium,
    Small,
}

/// A dialog dimension: either a preset or a pixel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DialogDimension {
    Named(DialogDimensionName),
    Pixels(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogSize {
    pub height: DialogDimension,
    pub width: DialogDimension,
}

impl Default for DialogSize {
    fn default() -> Self {
        Self {
            height: DialogDimension::Named(DialogDimensionName::Small),
            width: DialogDimension::Named(DialogDimensionName::Small),
        }
    }
}

/// What to show in a URL-based dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlDialogInfo {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub size: DialogSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
}

impl UrlDialogInfo {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            size: DialogSize::default(),
            fallback_url: None,
        }
    }

    pub fn with_size(mut self, size: DialogSize) -> Self {
        self.size = size;
        self
    }

    fn validate(&self) -> SdkResult<()> {
        require_non_empty("url", &self.url)?;
        require_non_empty("title", &self.title)
    }
}

/// Wire form of a dialog request; the size is flattened into height and width.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskInfo<'a> {
    url: &'a str,
    title: &'a str,
    height: DialogDimension,
    width: DialogDimension,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_url: Option<&'a str>,
}

impl<'a> From<&'a UrlDialogInfo> for TaskInfo<'a> {
    fn from(info: &'a UrlDialogInfo) -> Self {
        Self {
            url: &info.url,
            title: &info.title,
            height: info.size.height,
            width: info.size.width,
            fallback_url: info.fallback_url.as_deref(),
        }
    }
}

/// Outcome delivered to the submit handler when a dialog closes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogSubmitResult {
    /// Set when the dialog was dismissed or the host reported a failure.
    pub err: Option<String>,
    /// Whatever the dialog submitted.
    pub result: Option<Value>,
}

impl DialogSubmitResult {
    fn from_response(response: SdkResult<Vec<Value>>) -> Self {
        match response {
            Ok(args) => Self {
                err: None,
                result: args.into_iter().next().filter(|v| !v.is_null()),
            },
            Err(SdkError::Host(Value::String(message))) => Self {
                err: Some(message),
                result: None,
            },
            Err(SdkError::Host(payload)) => Self {
                err: Some(payload.to_string()),
                result: None,
            },
            Err(e) => Self {
                err: Some(e.to_string()),
                result: None,
            },
        }
    }
}

/// Open a URL dialog.
///
/// `submit_handler` runs once when the dialog closes. When
/// `message_from_child_handler` is given it receives every message the dialog
/// sends to its parent until the dialog closes.
pub fn open(
    session: &Session,
    info: &UrlDialogInfo,
    submit_handler: Option<SubmitHandler>,
    message_from_child_handler: Option<MessageHandler>,
) -> SdkResult<()> {
    session.ensure_capability(OPENER_CONTEXTS, CAPABILITY)?;
    info.validate()?;

    let task_info = to_arg(&TaskInfo::from(info))?;
    let owner = session.clone();
    session.request_with_callback(START_TASK, vec![task_info], move |response| {
        let result = DialogSubmitResult::from_response(response);
        if let Some(handler) = submit_handler {
            handler(result);
        }
        // After teardown the handlers are already gone.
        let _ = owner.remove_handler(MESSAGE_FOR_PARENT);
    })?;

    if let Some(handler) = message_from_child_handler {
        session.register_handler(MESSAGE_FOR_PARENT, move |args| {
            handler(first_arg(args))
        })?;
    }

    tracing::debug!(url = %info.url, "Opened dialog");
    Ok(())
}

/// Close the current dialog, handing `result` to the opener.
pub fn submit(session: &Session, result: Option<Value>, app_ids: Option<Vec<String>>) -> SdkResult<()> {
    session.ensure_capability(ANY_DIALOG_CONTEXT, CAPABILITY)?;
    session.post(
        COMPLETE_TASK,
        vec![
            result.unwrap_or(Value::Null),
            to_arg(&app_ids.unwrap_or_default())?,
        ],
    )
}

/// Send a message from the opener to the open dialog.
pub fn send_message_to_dialog(session: &Session, message: Value) -> SdkResult<()> {
    session.ensure_capability(OPENER_CONTEXTS, CAPABILITY)?;
    session.post(MESSAGE_FOR_CHILD, vec![message])
}

/// Send a message from inside the dialog to its opener.
pub fn send_message_to_parent(session: &Session, message: Value) -> SdkResult<()> {
    session.ensure_capability(INSIDE_DIALOG, CAPABILITY)?;
    session.post(MESSAGE_FOR_PARENT, vec![message])
}

/// Receive messages the opener sends to this dialog.
pub fn register_on_message_from_parent(session: &Session, handler: MessageHandler) -> SdkResult<()> {
    session.ensure_capability(INSIDE_DIALOG, CAPABILITY)?;
    session.register_handler(MESSAGE_FOR_CHILD, move |args| handler(first_arg(args)))
}

fn first_arg(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Null)
}

/// Changing an open dialog.
pub mod update {
    use super::*;

    pub const CAPABILITY: &str = "dialog.update";

    pub(crate) const UPDATE_TASK: &str = "tasks.updateTask";

    /// Resize the open dialog.
    pub fn resize(session: &Session, size: DialogSize) -> SdkResult<()> {
        session.ensure_capability(ANY_DIALOG_CONTEXT, CAPABILITY)?;
        session.post(UPDATE_TASK, vec![to_arg(&size)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SdkConfig;
    use crate::context::HostClientType;
    use crate::messaging::{Dispatch, InboundMessage, RecordingTransport};
    use crate::runtime::Runtime;
    use crate::session::RuntimeSource;
    use parking_lot::Mutex;
    use serde_json::json;

    fn session_in(context: FrameContext, supports: &str) -> (Arc<RecordingTransport>, Session) {
        let transport = Arc::new(RecordingTransport::new());
        let session = Session::new(transport.clone(), SdkConfig::default());
        let runtime = Runtime::from_json(&format!(r#"{{"apiVersion":2,"supports":{}}}"#, supports)).unwrap();
        session
            .initialize_with_runtime(context, HostClientType::Web, RuntimeSource::Declared(runtime))
            .unwrap();
        (transport, session)
    }

    fn info() -> UrlDialogInfo {
        UrlDialogInfo::new("https://app.example/form", "Feedback")
    }

    #[test]
    fn test_open_sends_flattened_task_info() {
        let (transport, session) = session_in(FrameContext::Content, r#"{"dialog":{}}"#);
        let size = DialogSize {
            height: DialogDimension::Pixels(400),
            width: DialogDimension::Named(DialogDimensionName::Large),
        };

        open(&session, &info().with_size(size), None, None).unwrap();

        let sent = transport.last().unwrap();
        assert_eq!(sent.func, START_TASK);
        assert_eq!(
            sent.args,
            vec![json!({
                "url": "https://app.example/form",
                "title": "Feedback",
                "height": 400,
                "width": "large"
            })]
        );
        assert!(session.handler_names().is_empty());
    }

    #[test]
    fn test_open_delivers_submit_result() {
        let (transport, session) = session_in(FrameContext::SidePanel, r#"{"dialog":{}}"#);
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        open(
            &session,
            &info(),
            Some(Box::new(move |result: DialogSubmitResult| sink.lock().push(result))),
            None,
        )
        .unwrap();
        let id = transport.last().unwrap().id.unwrap();

        session.handle_message(InboundMessage::response(id, vec![Value::Null, json!({"rating": 5})]));
        // Second response for the same id is ignored.
        assert_eq!(
            session.handle_message(InboundMessage::response(id, vec![json!("late")])),
            Dispatch::Dropped
        );

        assert_eq!(
            *received.lock(),
            vec![DialogSubmitResult {
                err: None,
                result: Some(json!({"rating": 5})),
            }]
        );
    }

    #[test]
    fn test_open_reports_dismissal_as_err() {
        let (transport, session) = session_in(FrameContext::Content, r#"{"dialog":{}}"#);
        let received = Arc::new(Mutex::new(None));
        let sink = received.clone();

        open(
            &session,
            &info(),
            Some(Box::new(move |result: DialogSubmitResult| *sink.lock() = Some(result))),
            None,
        )
        .unwrap();
        let id = transport.last().unwrap().id.unwrap();
        session.handle_message(InboundMessage::response(id, vec![json!("User cancelled/closed the task module.")]));

        let result = received.lock().clone().unwrap();
        assert_eq!(result.err.as_deref(), Some("User cancelled/closed the task module."));
        assert_eq!(result.result, None);
    }

    #[test]
    fn test_open_registers_message_handler() {
        let (_, session) = session_in(FrameContext::Content, r#"{"dialog":{}}"#);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();

        open(
            &session,
            &info(),
            None,
            Some(Arc::new(move |message: Value| sink.lock().push(message))),
        )
        .unwrap();

        let dispatch = session.handle_message(InboundMessage::event(MESSAGE_FOR_PARENT, vec![json!("hi")]));
        assert_eq!(dispatch, Dispatch::Delivered(MESSAGE_FOR_PARENT.to_string()));
        assert_eq!(*messages.lock(), vec![json!("hi")]);
    }

    #[test]
    fn test_closed_dialog_stops_receiving_messages() {
        let (transport, session) = session_in(FrameContext::Content, r#"{"dialog":{}}"#);
        let first_seen = Arc::new(Mutex::new(Vec::new()));
        let sink = first_seen.clone();

        open(
            &session,
            &info(),
            None,
            Some(Arc::new(move |message: Value| sink.lock().push(message))),
        )
        .unwrap();
        let first_id = transport.last().unwrap().id.unwrap();
        session.handle_message(InboundMessage::response(first_id, vec![Value::Null, json!("done")]));
        assert!(session.handler_names().is_empty());

        // Reopen without a message handler: the closed dialog's callback must stay silent.
        open(&session, &info(), None, None).unwrap();
        let dispatch = session.handle_message(InboundMessage::event(MESSAGE_FOR_PARENT, vec![json!("from second")]));

        assert_eq!(dispatch, Dispatch::Dropped);
        assert!(first_seen.lock().is_empty());
    }

    #[test]
    fn test_dialog_calls_fail_before_initialization() {
        let transport = Arc::new(RecordingTransport::new());
        let session = Session::new(transport.clone(), SdkConfig::default());

        assert!(matches!(open(&session, &info(), None, None), Err(SdkError::NotInitialized)));
        assert!(matches!(submit(&session, None, None), Err(SdkError::NotInitialized)));
        assert!(matches!(
            send_message_to_dialog(&session, json!("hi")),
            Err(SdkError::NotInitialized)
        ));
        assert!(matches!(
            update::resize(&session, DialogSize::default()),
            Err(SdkError::NotInitialized)
        ));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_open_checks_in_order() {
        // Wrong context wins over missing capability.
        let (transport, session) = session_in(FrameContext::Task, "{}");
        let err = open(&session, &info(), None, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "This call is only allowed in following contexts: [\"content\",\"sidePanel\",\"meetingStage\"]. Current context: \"task\"."
        );

        // Missing capability wins over bad arguments.
        let (_, unsupported) = session_in(FrameContext::Content, r#"{"dialog":null}"#);
        let err = open(&unsupported, &UrlDialogInfo::new("", ""), None, None).unwrap_err();
        assert!(matches!(err, SdkError::NotSupported { .. }));

        let (_, supported) = session_in(FrameContext::Content, r#"{"dialog":{}}"#);
        let err = open(&supported, &UrlDialogInfo::new("https://x", " "), None, None).unwrap_err();
        assert!(matches!(err, SdkError::InvalidArguments { ref message } if message.contains("title")));

        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_submit_posts_complete_task() {
        let (transport, session) = session_in(FrameContext::Task, r#"{"dialog":{}}"#);
        submit(&session, Some(json!({"ok": true})), Some(vec!["app-1".to_string()])).unwrap();
        submit(&session, None, None).unwrap();

        let sent = transport.take();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].id, None);
        assert_eq!(sent[0].func, COMPLETE_TASK);
        assert_eq!(sent[0].args, vec![json!({"ok": true}), json!(["app-1"])]);
        assert_eq!(sent[1].args, vec![Value::Null, json!([])]);
    }

    #[test]
    fn test_message_directions() {
        let (opener_transport, opener) = session_in(FrameContext::Content, r#"{"dialog":{}}"#);
        send_message_to_dialog(&opener, json!("to child")).unwrap();
        assert_eq!(opener_transport.last().unwrap().func, MESSAGE_FOR_CHILD);
        assert!(matches!(
            send_message_to_parent(&opener, json!("nope")),
            Err(SdkError::Context { .. })
        ));

        let (dialog_transport, dialog) = session_in(FrameContext::Task, r#"{"dialog":{}}"#);
        send_message_to_parent(&dialog, json!("to parent")).unwrap();
        assert_eq!(dialog_transport.last().unwrap().func, MESSAGE_FOR_PARENT);
        assert!(matches!(
            send_message_to_dialog(&dialog, json!("nope")),
            Err(SdkError::Context { .. })
        ));
    }

    #[test]
    fn test_register_on_message_from_parent() {
        let (_, dialog) = session_in(FrameContext::Task, r#"{"dialog":{}}"#);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();

        register_on_message_from_parent(&dialog, Arc::new(move |m: Value| sink.lock().push(m))).unwrap();
        dialog.handle_message(InboundMessage::event(MESSAGE_FOR_CHILD, vec![json!({"step": 2})]));
        dialog.handle_message(InboundMessage::event(MESSAGE_FOR_CHILD, vec![]));

        assert_eq!(*messages.lock(), vec![json!({"step": 2}), Value::Null]);
    }

    #[test]
    fn test_resize_requires_update_subcapability() {
        let (transport, session) = session_in(FrameContext::Task, r#"{"dialog":{}}"#);
        let size = DialogSize {
            height: DialogDimension::Named(DialogDimensionName::Medium),
            width: DialogDimension::Pixels(600),
        };
        assert!(matches!(
            update::resize(&session, size),
            Err(SdkError::NotSupported { ref capability }) if capability == update::CAPABILITY
        ));
        assert!(transport.sent().is_empty());

        let (transport, session) = session_in(FrameContext::Task, r#"{"dialog":{"update":{}}}"#);
        update::resize(&session, size).unwrap();
        let sent = transport.last().unwrap();
        assert_eq!(sent.func, update::UPDATE_TASK);
        assert_eq!(sent.args, vec![json!({"height": "medium", "width": 600})]);
    }

    #[test]
    fn test_dimension_parsing() {
        let size: DialogSize = serde_json::from_value(json!({"height": "small", "width": 320})).unwrap();
        assert_eq!(size.height, DialogDimension::Named(DialogDimensionName::Small));
        assert_eq!(size.width, DialogDimension::Pixels(320));
    }
}
