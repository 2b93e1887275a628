use actix_web::{web, HttpResponse};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Conversation, Id, Message, NewMessage, OpenConversation, UnreadCount};

use super::AppState;

/// Conversation lookup restricted to its two participants.
async fn participant_conversation(data: &AppState, id: Id, user: Id) -> Result<Conversation, ApiError> {
    let convo = data.repo.get_conversation(id).await?;
    if !convo.has_participant(user) {
        return Err(ApiError::Forbidden);
    }
    Ok(convo)
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations",
    responses(
        (status = 200, description = "Caller's conversations, newest first", body = [Conversation])
    )
)]
pub async fn list_conversations(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let convos = data.repo.list_conversations_for_user(auth.user_id()?).await?;
    Ok(HttpResponse::Ok().json(convos))
}

#[utoipa::path(
    post,
    path = "/api/v1/conversations",
    request_body = OpenConversation,
    responses(
        (status = 200, description = "Existing or new conversation with the peer", body = Conversation),
        (status = 400, description = "Cannot message yourself"),
        (status = 404, description = "Peer not found")
    )
)]
pub async fn open_conversation(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<OpenConversation>,
) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    let peer = payload.into_inner().peer_id;
    if peer == me.id {
        return Err(ApiError::bad_request("You cannot message yourself"));
    }
    data.repo.get_profile(peer).await?;
    let convo = data.repo.open_conversation(me.id, peer).await?;
    Ok(HttpResponse::Ok().json(convo))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}/messages",
    params(("id" = Id, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages, oldest first", body = [Message]),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn list_messages(auth: Auth, path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let convo = participant_conversation(&data, path.into_inner(), auth.user_id()?).await?;
    let messages = data.repo.list_messages(convo.id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/messages",
    request_body = NewMessage,
    params(("id" = Id, Path, description = "Conversation id")),
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Empty message"),
        (status = 403, description = "Not a participant"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn send_message(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    payload: web::Json<NewMessage>,
) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    let content = payload.into_inner().content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("Message cannot be empty"));
    }
    let convo = participant_conversation(&data, path.into_inner(), me.id).await?;
    data.check_rate(|rl| rl.allow_message(me.id))?;
    let msg = data.repo.create_message(convo.id, me.id, content).await?;
    Ok(HttpResponse::Created().json(msg))
}

#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/read",
    params(("id" = Id, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages marked read", body = UnreadCount),
        (status = 403, description = "Not a participant")
    )
)]
pub async fn mark_read(auth: Auth, path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let me = auth.user_id()?;
    let convo = participant_conversation(&data, path.into_inner(), me).await?;
    let touched = data.repo.mark_messages_read(convo.id, me).await?;
    Ok(HttpResponse::Ok().json(UnreadCount { count: touched as i64 }))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/unread",
    responses(
        (status = 200, description = "Unread messages addressed to the caller", body = UnreadCount)
    )
)]
pub async fn unread_messages(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let count = data.repo.count_unread_messages(auth.user_id()?).await?;
    Ok(HttpResponse::Ok().json(UnreadCount { count }))
}
