use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ConnId, Notification, Role};

/// Inbound event frames, one JSON object per socket message, tagged by `type`.
///
/// Payloads are validated at this boundary before dispatch; a frame that
/// does not match the catalogue is logged and ignored without terminating
/// the connection.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "candidate:statusUpdate", rename_all = "camelCase")]
    CandidateStatusUpdate { candidate_id: String, status: String },

    #[serde(rename = "interview:join", rename_all = "camelCase")]
    InterviewJoin { interview_id: String },
    #[serde(rename = "interview:leave", rename_all = "camelCase")]
    InterviewLeave { interview_id: String },
    #[serde(rename = "interview:codeUpdate", rename_all = "camelCase")]
    InterviewCodeUpdate {
        interview_id: String,
        code: String,
        language: String,
    },
    #[serde(rename = "interview:codeSave", rename_all = "camelCase")]
    InterviewCodeSave {
        interview_id: String,
        code: String,
        language: String,
    },

    #[serde(rename = "chat:sendMessage", rename_all = "camelCase")]
    ChatSendMessage { interview_id: String, message: String },

    #[serde(rename = "webrtc:joinRoom", rename_all = "camelCase")]
    WebrtcJoinRoom { room_id: String },
    #[serde(rename = "webrtc:leaveRoom", rename_all = "camelCase")]
    WebrtcLeaveRoom { room_id: String },
    #[serde(rename = "webrtc:offer", rename_all = "camelCase")]
    WebrtcOffer { target: ConnId, payload: serde_json::Value },
    #[serde(rename = "webrtc:answer", rename_all = "camelCase")]
    WebrtcAnswer { target: ConnId, payload: serde_json::Value },
    #[serde(rename = "webrtc:iceCandidate", rename_all = "camelCase")]
    WebrtcIceCandidate { target: ConnId, payload: serde_json::Value },
    #[serde(rename = "webrtc:screenShare", rename_all = "camelCase")]
    WebrtcScreenShare { room_id: String, is_sharing: bool },

    #[serde(rename = "note:join", rename_all = "camelCase")]
    NoteJoin { note_id: String },
    #[serde(rename = "note:leave", rename_all = "camelCase")]
    NoteLeave { note_id: String },
    #[serde(rename = "note:update", rename_all = "camelCase")]
    NoteUpdate {
        note_id: String,
        content: String,
        title: Option<String>,
    },
    #[serde(rename = "note:save", rename_all = "camelCase")]
    NoteSave {
        note_id: String,
        content: String,
        title: Option<String>,
    },
    #[serde(rename = "note:cursorUpdate", rename_all = "camelCase")]
    NoteCursorUpdate {
        note_id: String,
        position: serde_json::Value,
    },
}

/// A participant entry in the `webrtc:usersInRoom` reply.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WebrtcUser {
    pub connection_id: ConnId,
    pub user_id: String,
}

/// Outbound event frames, tagged by `type` the same way.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "candidate:statusUpdated", rename_all = "camelCase")]
    CandidateStatusUpdated {
        candidate_id: String,
        status: String,
        updated_by: String,
    },

    #[serde(rename = "interview:userJoined", rename_all = "camelCase")]
    InterviewUserJoined {
        interview_id: String,
        user_id: String,
        role: Role,
    },
    #[serde(rename = "interview:userLeft", rename_all = "camelCase")]
    InterviewUserLeft { interview_id: String, user_id: String },
    #[serde(rename = "interview:codeUpdated", rename_all = "camelCase")]
    InterviewCodeUpdated {
        interview_id: String,
        code: String,
        language: String,
        user_id: String,
    },
    #[serde(rename = "interview:codeSaved", rename_all = "camelCase")]
    InterviewCodeSaved {
        interview_id: String,
        code: String,
        language: String,
        user_id: String,
        saved_at: DateTime<Utc>,
    },

    #[serde(rename = "chat:newMessage", rename_all = "camelCase")]
    ChatNewMessage {
        interview_id: String,
        message: String,
        user_id: String,
        role: Role,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "webrtc:usersInRoom", rename_all = "camelCase")]
    WebrtcUsersInRoom {
        room_id: String,
        users: Vec<WebrtcUser>,
    },
    #[serde(rename = "webrtc:userJoined", rename_all = "camelCase")]
    WebrtcUserJoined {
        room_id: String,
        connection_id: ConnId,
        user_id: String,
    },
    #[serde(rename = "webrtc:userLeft", rename_all = "camelCase")]
    WebrtcUserLeft {
        room_id: String,
        connection_id: ConnId,
        user_id: String,
    },
    #[serde(rename = "webrtc:offer", rename_all = "camelCase")]
    WebrtcOffer { from: ConnId, payload: serde_json::Value },
    #[serde(rename = "webrtc:answer", rename_all = "camelCase")]
    WebrtcAnswer { from: ConnId, payload: serde_json::Value },
    #[serde(rename = "webrtc:iceCandidate", rename_all = "camelCase")]
    WebrtcIceCandidate { from: ConnId, payload: serde_json::Value },
    #[serde(rename = "webrtc:screenShare", rename_all = "camelCase")]
    WebrtcScreenShare {
        room_id: String,
        user_id: String,
        is_sharing: bool,
    },

    #[serde(rename = "note:current", rename_all = "camelCase")]
    NoteCurrent {
        note_id: String,
        content: String,
        title: String,
        last_updated: Option<DateTime<Utc>>,
        editors: Vec<String>,
    },
    #[serde(rename = "note:userJoined", rename_all = "camelCase")]
    NoteUserJoined { note_id: String, user_id: String },
    #[serde(rename = "note:userLeft", rename_all = "camelCase")]
    NoteUserLeft { note_id: String, user_id: String },
    #[serde(rename = "note:contentUpdate", rename_all = "camelCase")]
    NoteContentUpdate {
        note_id: String,
        content: String,
        title: Option<String>,
        user_id: String,
    },
    #[serde(rename = "note:saved", rename_all = "camelCase")]
    NoteSaved {
        note_id: String,
        title: String,
        saved_by: String,
        saved_at: DateTime<Utc>,
    },
    #[serde(rename = "note:cursorUpdate", rename_all = "camelCase")]
    NoteCursorUpdate {
        note_id: String,
        user_id: String,
        position: serde_json::Value,
    },

    #[serde(rename = "notification:new")]
    NotificationNew(Notification),

    #[serde(rename = "error")]
    Error { message: String },
}
