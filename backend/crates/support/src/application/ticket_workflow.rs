//! Ticket Workflow
//!
//! Create, list, read, reply, invite, close and assign-service. Every
//! operation receives the already authenticated [`Principal`]; access is
//! checked here against the ticket's owner and member list.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use audit::{AuditEvent, AuditEventType, AuditLog, AuditSink};
use auth::application::PRIVILEGED;
use auth::domain::UserRepository;
use auth::domain::value_object::email::Email;
use auth::{Principal, require_role};
use chrono::Utc;
use kernel::id::{TicketId, UserId};
use kernel::validation::required_text;

use crate::application::config::SupportConfig;
use crate::application::views::{MemberView, MessageView, Profile, TicketView};
use crate::domain::access;
use crate::domain::entity::{
    NewMessage, ServiceAssignment, Ticket, TicketMember, TicketPriority, TicketStatus,
};
use crate::domain::repository::{SupportStore, TicketScope};
use crate::error::{SupportError, SupportResult};

pub struct CreateTicketInput {
    pub subject: String,
    /// Defaults to `Medium`
    pub priority: Option<String>,
    pub message: String,
    pub client_ip: Option<String>,
}

pub fn parse_ticket_id(raw: &str) -> SupportResult<TicketId> {
    raw.parse()
        .map_err(|_| SupportError::Validation("Invalid ticket id".into()))
}

pub struct TicketWorkflow<S, U, A> {
    store: Arc<S>,
    users: Arc<U>,
    audit: AuditLog<A>,
    config: Arc<SupportConfig>,
}

impl<S, U, A> Clone for TicketWorkflow<S, U, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            users: self.users.clone(),
            audit: self.audit.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, U, A> TicketWorkflow<S, U, A>
where
    S: SupportStore,
    U: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<S>,
        users: Arc<U>,
        audit: AuditLog<A>,
        config: Arc<SupportConfig>,
    ) -> Self {
        Self {
            store,
            users,
            audit,
            config,
        }
    }

    /// Open a ticket. The creator becomes its first member.
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateTicketInput,
    ) -> SupportResult<Ticket> {
        let subject = required_text("Subject", &input.subject, self.config.subject_max_chars)?;
        let text = required_text("Message", &input.message, self.config.message_max_chars)?;
        let priority = match input.priority.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(SupportError::Validation("Priority is required".into()));
            }
            Some(raw) => TicketPriority::parse(raw)
                .ok_or_else(|| SupportError::Validation("Invalid priority".into()))?,
        };

        let ticket = Ticket::open(principal.user_id, subject, priority, Utc::now());
        self.store
            .create(&ticket, NewMessage::from_user(principal.user_id, text))
            .await?;

        self.audit
            .record(
                AuditEvent::new(AuditEventType::TicketCreated)
                    .actor(principal.user_id)
                    .client_ip(input.client_ip)
                    .meta("ticketId", ticket.id.to_string())
                    .meta("priority", priority.code()),
            )
            .await;

        tracing::info!(ticket_id = %ticket.id, user_id = %principal.user_id, "Ticket created");
        Ok(ticket)
    }

    /// Staff see every ticket, users the ones they own or were invited to.
    pub async fn list(&self, principal: &Principal) -> SupportResult<Vec<TicketView>> {
        let scope = if principal.is_privileged() {
            TicketScope::All
        } else {
            TicketScope::VisibleTo(principal.user_id)
        };

        let tickets = self.store.list(scope).await?;
        let profiles = self.profiles(tickets.iter().map(|t| t.owner_id)).await?;

        Ok(tickets
            .into_iter()
            .map(|ticket| TicketView {
                creator: profiles.get(&ticket.owner_id).cloned(),
                ticket,
            })
            .collect())
    }

    pub async fn messages(
        &self,
        principal: &Principal,
        ticket_id: &TicketId,
    ) -> SupportResult<Vec<MessageView>> {
        self.accessible(principal, ticket_id).await?;

        let messages = self.store.messages(ticket_id).await?;
        let profiles = self
            .profiles(messages.iter().filter_map(|m| m.author.user_id()))
            .await?;

        Ok(messages
            .into_iter()
            .map(|message| MessageView {
                author: message
                    .author
                    .user_id()
                    .and_then(|id| profiles.get(&id).cloned()),
                message,
            })
            .collect())
    }

    pub async fn members(
        &self,
        principal: &Principal,
        ticket_id: &TicketId,
    ) -> SupportResult<Vec<MemberView>> {
        self.accessible(principal, ticket_id).await?;

        let members = self.store.members(ticket_id).await?;
        let profiles = self.profiles(members.iter().map(|m| m.user_id)).await?;

        Ok(members
            .into_iter()
            .map(|member| MemberView {
                profile: profiles.get(&member.user_id).cloned(),
                member,
            })
            .collect())
    }

    /// Append a reply. A staff reply sets `InProgress`, a user reply `Open`.
    pub async fn reply(
        &self,
        principal: &Principal,
        ticket_id: &TicketId,
        text: &str,
        client_ip: Option<String>,
    ) -> SupportResult<Ticket> {
        let text = required_text("Message", text, self.config.message_max_chars)?;
        let ticket = self.accessible(principal, ticket_id).await?;

        if ticket.status.is_closed() && !self.config.allow_reply_on_closed {
            return Err(SupportError::TicketClosed);
        }

        let next_status = access::status_after_reply(principal.role);
        let (ticket, message) = self
            .store
            .post_message(
                ticket_id,
                NewMessage::from_user(principal.user_id, text),
                Some(next_status),
                Utc::now(),
            )
            .await?
            .ok_or(SupportError::TicketNotFound)?;

        self.audit
            .record(
                AuditEvent::new(AuditEventType::TicketReply)
                    .actor(principal.user_id)
                    .client_ip(client_ip)
                    .meta("ticketId", ticket.id.to_string())
                    .meta("messageId", message.id.to_string())
                    .meta("status", ticket.status.code()),
            )
            .await;

        tracing::info!(
            ticket_id = %ticket.id,
            user_id = %principal.user_id,
            status = %ticket.status,
            "Ticket reply"
        );
        Ok(ticket)
    }

    /// Add the account registered under `email` to the ticket.
    pub async fn invite(
        &self,
        principal: &Principal,
        ticket_id: &TicketId,
        email: &str,
        client_ip: Option<String>,
    ) -> SupportResult<TicketMember> {
        let email = Email::new(email)?;
        self.accessible(principal, ticket_id).await?;

        let invitee = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(SupportError::UserNotFound)?;

        let notice = NewMessage::system(format!(
            "{} added {} to this ticket",
            principal.display_name, email
        ));
        let member = self
            .store
            .add_member(ticket_id, &invitee.user_id, notice, Utc::now())
            .await?;

        self.audit
            .record(
                AuditEvent::new(AuditEventType::TicketMemberAdded)
                    .actor(principal.user_id)
                    .client_ip(client_ip)
                    .meta("ticketId", ticket_id.to_string())
                    .meta("memberId", invitee.user_id.to_string()),
            )
            .await;

        tracing::info!(
            ticket_id = %ticket_id,
            member_id = %invitee.user_id,
            "Ticket member added"
        );
        Ok(member)
    }

    /// Close a ticket. Closing a closed ticket changes nothing.
    pub async fn close(
        &self,
        principal: &Principal,
        ticket_id: &TicketId,
        client_ip: Option<String>,
    ) -> SupportResult<Ticket> {
        let ticket = self.find(ticket_id).await?;
        if !access::can_close(principal.role, &principal.user_id, &ticket) {
            tracing::warn!(ticket_id = %ticket_id, user_id = %principal.user_id, "Close denied");
            return Err(SupportError::Forbidden);
        }
        if ticket.status.is_closed() {
            return Ok(ticket);
        }

        let notice = NewMessage::system(format!("{} closed this ticket", principal.display_name));
        let (ticket, _) = self
            .store
            .post_message(
                ticket_id,
                notice,
                Some(TicketStatus::Closed),
                Utc::now(),
            )
            .await?
            .ok_or(SupportError::TicketNotFound)?;

        self.audit
            .record(
                AuditEvent::new(AuditEventType::TicketClosed)
                    .actor(principal.user_id)
                    .client_ip(client_ip)
                    .meta("ticketId", ticket.id.to_string()),
            )
            .await;

        tracing::info!(ticket_id = %ticket.id, user_id = %principal.user_id, "Ticket closed");
        Ok(ticket)
    }

    /// Book `service_id` for the ticket's owner, bill it and note it on the
    /// ticket. Staff only.
    pub async fn assign_service(
        &self,
        principal: &Principal,
        ticket_id: &TicketId,
        service_id: i64,
        client_ip: Option<String>,
    ) -> SupportResult<ServiceAssignment> {
        require_role(principal, PRIVILEGED)?;

        let ticket = self.find(ticket_id).await?;
        let service = self
            .store
            .find_service(service_id)
            .await?
            .ok_or(SupportError::ServiceNotFound)?;

        let now = Utc::now();
        let assignment =
            ServiceAssignment::new(ticket.owner_id, &service, self.config.payment_terms_days, now);
        let notice = NewMessage::system(format!(
            "Service \"{}\" was booked and an invoice was created",
            service.name
        ));
        self.store.assign(ticket_id, &assignment, notice, now).await?;

        self.audit
            .record(
                AuditEvent::new(AuditEventType::TicketServiceAssigned)
                    .actor(principal.user_id)
                    .client_ip(client_ip)
                    .meta("ticketId", ticket_id.to_string())
                    .meta("customerId", ticket.owner_id.to_string())
                    .meta("serviceId", service.id)
                    .meta("transactionId", assignment.transaction.id.to_string())
                    .meta("amountCents", assignment.transaction.amount_cents),
            )
            .await;

        tracing::info!(
            ticket_id = %ticket_id,
            service_id = service.id,
            customer_id = %ticket.owner_id,
            "Service assigned"
        );
        Ok(assignment)
    }

    async fn find(&self, ticket_id: &TicketId) -> SupportResult<Ticket> {
        self.store
            .find(ticket_id)
            .await?
            .ok_or(SupportError::TicketNotFound)
    }

    /// The ticket, if `principal` may read and reply to it.
    async fn accessible(&self, principal: &Principal, ticket_id: &TicketId) -> SupportResult<Ticket> {
        let ticket = self.find(ticket_id).await?;
        let is_member = self.store.is_member(ticket_id, &principal.user_id).await?;

        if !access::can_access(principal.role, &principal.user_id, &ticket, is_member) {
            tracing::warn!(
                ticket_id = %ticket_id,
                user_id = %principal.user_id,
                "Ticket access denied"
            );
            return Err(SupportError::Forbidden);
        }
        Ok(ticket)
    }

    async fn profiles(
        &self,
        user_ids: impl IntoIterator<Item = UserId>,
    ) -> SupportResult<HashMap<UserId, Profile>> {
        let ids: Vec<UserId> = user_ids
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self.users.find_many(&ids).await?;
        Ok(users
            .iter()
            .map(|user| (user.user_id, Profile::from(user)))
            .collect())
    }
}
