//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use auth::Principal;
use auth::domain::UserRepository;
use kernel::id::UserId;
use platform::client::ClientAddress;

use audit::{AuditLog, AuditSink};

use crate::application::{CreateTicketInput, SupportConfig, TicketWorkflow, parse_ticket_id};
use crate::domain::repository::SupportStore;
use crate::error::SupportResult;
use crate::presentation::dto::{
    AssignServiceRequest, AssignServiceResponse, CreateTicketRequest, CreateTicketResponse,
    InviteRequest, MemberResponse, MembersResponse, MessageResponse, MessagesResponse,
    ReplyRequest, TicketResponse, TicketsResponse,
};

/// Shared state for support handlers
pub struct SupportAppState<S, U, A> {
    pub workflow: TicketWorkflow<S, U, A>,
    pub audit: AuditLog<A>,
}

impl<S, U, A> Clone for SupportAppState<S, U, A> {
    fn clone(&self) -> Self {
        Self {
            workflow: self.workflow.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<S, U, A> SupportAppState<S, U, A>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, users: Arc<U>, audit: AuditLog<A>, config: SupportConfig) -> Self {
        Self {
            workflow: TicketWorkflow::new(store, users, audit.clone(), Arc::new(config)),
            audit,
        }
    }

    async fn audited<T>(
        &self,
        operation: &'static str,
        actor: UserId,
        client: &ClientAddress,
        result: SupportResult<T>,
    ) -> SupportResult<T> {
        if let Err(e) = &result {
            if e.is_infrastructure() {
                self.audit
                    .record_infrastructure_failure(
                        operation,
                        Some(actor),
                        client.to_audit_string(),
                        e,
                    )
                    .await;
            }
        }
        result
    }
}

/// POST /api/tickets
pub async fn create_ticket<S, U, A>(
    State(state): State<SupportAppState<S, U, A>>,
    Extension(principal): Extension<Principal>,
    client: ClientAddress,
    payload: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> SupportResult<(StatusCode, Json<CreateTicketResponse>)>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let input = CreateTicketInput {
        subject: req.subject,
        priority: req.priority,
        message: req.message,
        client_ip: client.to_audit_string(),
    };

    let result = state.workflow.create(&principal, input).await;
    let ticket = state
        .audited("create_ticket", principal.user_id, &client, result)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTicketResponse { id: ticket.id }),
    ))
}

/// GET /api/tickets
pub async fn list_tickets<S, U, A>(
    State(state): State<SupportAppState<S, U, A>>,
    Extension(principal): Extension<Principal>,
    client: ClientAddress,
) -> SupportResult<Json<TicketsResponse>>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    let result = state.workflow.list(&principal).await;
    let tickets = state
        .audited("list_tickets", principal.user_id, &client, result)
        .await?;

    Ok(Json(TicketsResponse {
        tickets: tickets.into_iter().map(TicketResponse::from).collect(),
    }))
}

/// GET /api/tickets/{id}/messages
pub async fn list_messages<S, U, A>(
    State(state): State<SupportAppState<S, U, A>>,
    Extension(principal): Extension<Principal>,
    Path(ticket_id): Path<String>,
    client: ClientAddress,
) -> SupportResult<Json<MessagesResponse>>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    let ticket_id = parse_ticket_id(&ticket_id)?;

    let result = state.workflow.messages(&principal, &ticket_id).await;
    let messages = state
        .audited("list_messages", principal.user_id, &client, result)
        .await?;

    Ok(Json(MessagesResponse {
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}

/// GET /api/tickets/{id}/members
pub async fn list_members<S, U, A>(
    State(state): State<SupportAppState<S, U, A>>,
    Extension(principal): Extension<Principal>,
    Path(ticket_id): Path<String>,
    client: ClientAddress,
) -> SupportResult<Json<MembersResponse>>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    let ticket_id = parse_ticket_id(&ticket_id)?;

    let result = state.workflow.members(&principal, &ticket_id).await;
    let members = state
        .audited("list_members", principal.user_id, &client, result)
        .await?;

    Ok(Json(MembersResponse {
        members: members.into_iter().map(MemberResponse::from).collect(),
    }))
}

/// POST /api/tickets/{id}/reply
pub async fn reply<S, U, A>(
    State(state): State<SupportAppState<S, U, A>>,
    Extension(principal): Extension<Principal>,
    Path(ticket_id): Path<String>,
    client: ClientAddress,
    payload: Result<Json<ReplyRequest>, JsonRejection>,
) -> SupportResult<Json<TicketResponse>>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    let ticket_id = parse_ticket_id(&ticket_id)?;
    let Json(req) = payload?;

    let result = state
        .workflow
        .reply(&principal, &ticket_id, &req.text, client.to_audit_string())
        .await;
    let ticket = state
        .audited("reply", principal.user_id, &client, result)
        .await?;

    Ok(Json(TicketResponse::from(ticket)))
}

/// POST /api/tickets/{id}/invite
pub async fn invite<S, U, A>(
    State(state): State<SupportAppState<S, U, A>>,
    Extension(principal): Extension<Principal>,
    Path(ticket_id): Path<String>,
    client: ClientAddress,
    payload: Result<Json<InviteRequest>, JsonRejection>,
) -> SupportResult<(StatusCode, Json<MemberResponse>)>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    let ticket_id = parse_ticket_id(&ticket_id)?;
    let Json(req) = payload?;

    let result = state
        .workflow
        .invite(&principal, &ticket_id, &req.email, client.to_audit_string())
        .await;
    let member = state
        .audited("invite", principal.user_id, &client, result)
        .await?;

    Ok((StatusCode::CREATED, Json(MemberResponse::from(member))))
}

/// POST /api/tickets/{id}/close
pub async fn close<S, U, A>(
    State(state): State<SupportAppState<S, U, A>>,
    Extension(principal): Extension<Principal>,
    Path(ticket_id): Path<String>,
    client: ClientAddress,
) -> SupportResult<Json<TicketResponse>>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    let ticket_id = parse_ticket_id(&ticket_id)?;

    let result = state
        .workflow
        .close(&principal, &ticket_id, client.to_audit_string())
        .await;
    let ticket = state
        .audited("close", principal.user_id, &client, result)
        .await?;

    Ok(Json(TicketResponse::from(ticket)))
}

/// POST /api/admin/tickets/{id}/assign-service
pub async fn assign_service<S, U, A>(
    State(state): State<SupportAppState<S, U, A>>,
    Extension(principal): Extension<Principal>,
    Path(ticket_id): Path<String>,
    client: ClientAddress,
    payload: Result<Json<AssignServiceRequest>, JsonRejection>,
) -> SupportResult<(StatusCode, Json<AssignServiceResponse>)>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    let ticket_id = parse_ticket_id(&ticket_id)?;
    let Json(req) = payload?;

    let result = state
        .workflow
        .assign_service(
            &principal,
            &ticket_id,
            req.service_id,
            client.to_audit_string(),
        )
        .await;
    let assignment = state
        .audited("assign_service", principal.user_id, &client, result)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AssignServiceResponse::from(assignment)),
    ))
}
