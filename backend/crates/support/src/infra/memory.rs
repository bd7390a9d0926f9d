//! In-memory support repository.
//!
//! One lock covers tickets, messages, members and billing, which gives the
//! same all-or-nothing writes as the PostgreSQL transactions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use kernel::id::{TicketId, UserId};

use crate::domain::entity::message::message_timestamp;
use crate::domain::entity::{
    NewMessage, Service, ServiceAssignment, Ticket, TicketMember, TicketMessage, TicketStatus,
    Transaction, UserService,
};
use crate::domain::repository::{ServiceRepository, TicketRepository, TicketScope};
use crate::error::{SupportError, SupportResult};

#[derive(Default)]
struct State {
    tickets: HashMap<TicketId, Ticket>,
    /// Per ticket, in posting order
    messages: HashMap<TicketId, Vec<TicketMessage>>,
    members: HashMap<TicketId, Vec<TicketMember>>,
    services: HashMap<i64, Service>,
    user_services: Vec<UserService>,
    transactions: Vec<Transaction>,
}

impl State {
    fn is_member(&self, ticket_id: &TicketId, user_id: &UserId) -> bool {
        self.members
            .get(ticket_id)
            .is_some_and(|members| members.iter().any(|m| &m.user_id == user_id))
    }

    /// Stamp `message` for `ticket_id`, store it and move the ticket's
    /// `last_update` to its timestamp.
    fn push_message(
        &mut self,
        ticket_id: &TicketId,
        message: NewMessage,
        next_status: Option<TicketStatus>,
        now: DateTime<Utc>,
    ) -> Option<(Ticket, TicketMessage)> {
        let ticket = self.tickets.get_mut(ticket_id)?;
        let at = message_timestamp(now, ticket.last_update);
        let message = message.stamp(*ticket_id, at);

        ticket.last_update = at;
        if let Some(status) = next_status {
            ticket.status = status;
        }
        let ticket = ticket.clone();

        self.messages
            .entry(*ticket_id)
            .or_default()
            .push(message.clone());
        Some((ticket, message))
    }
}

#[derive(Default)]
pub struct MemorySupportRepository {
    state: Mutex<State>,
}

impl MemorySupportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a catalog entry.
    pub fn insert_service(&self, service: Service) {
        self.lock().services.insert(service.id, service);
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    pub fn user_services(&self) -> Vec<UserService> {
        self.lock().user_services.clone()
    }
}

impl TicketRepository for MemorySupportRepository {
    async fn create(&self, ticket: &Ticket, first: NewMessage) -> SupportResult<TicketMessage> {
        let mut state = self.lock();
        if state.tickets.contains_key(&ticket.id) {
            return Err(SupportError::Internal(format!(
                "duplicate ticket id {}",
                ticket.id
            )));
        }

        let message = first.stamp(ticket.id, ticket.created_at);
        state.tickets.insert(ticket.id, ticket.clone());
        state.messages.insert(ticket.id, vec![message.clone()]);
        state.members.insert(
            ticket.id,
            vec![TicketMember {
                ticket_id: ticket.id,
                user_id: ticket.owner_id,
                added_at: ticket.created_at,
            }],
        );

        Ok(message)
    }

    async fn find(&self, ticket_id: &TicketId) -> SupportResult<Option<Ticket>> {
        Ok(self.lock().tickets.get(ticket_id).cloned())
    }

    async fn list(&self, scope: TicketScope) -> SupportResult<Vec<Ticket>> {
        let state = self.lock();
        let mut tickets: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|t| match scope {
                TicketScope::All => true,
                TicketScope::VisibleTo(user_id) => {
                    t.is_owned_by(&user_id) || state.is_member(&t.id, &user_id)
                }
            })
            .cloned()
            .collect();

        tickets.sort_by(|a, b| b.last_update.cmp(&a.last_update));
        Ok(tickets)
    }

    async fn is_member(&self, ticket_id: &TicketId, user_id: &UserId) -> SupportResult<bool> {
        Ok(self.lock().is_member(ticket_id, user_id))
    }

    async fn post_message(
        &self,
        ticket_id: &TicketId,
        message: NewMessage,
        next_status: Option<TicketStatus>,
        now: DateTime<Utc>,
    ) -> SupportResult<Option<(Ticket, TicketMessage)>> {
        Ok(self
            .lock()
            .push_message(ticket_id, message, next_status, now))
    }

    async fn add_member(
        &self,
        ticket_id: &TicketId,
        user_id: &UserId,
        notice: NewMessage,
        now: DateTime<Utc>,
    ) -> SupportResult<TicketMember> {
        let mut state = self.lock();
        if !state.tickets.contains_key(ticket_id) {
            return Err(SupportError::TicketNotFound);
        }
        if state.is_member(ticket_id, user_id) {
            return Err(SupportError::AlreadyMember);
        }

        let member = TicketMember {
            ticket_id: *ticket_id,
            user_id: *user_id,
            added_at: now,
        };
        state
            .members
            .entry(*ticket_id)
            .or_default()
            .push(member.clone());
        state.push_message(ticket_id, notice, None, now);

        Ok(member)
    }

    async fn messages(&self, ticket_id: &TicketId) -> SupportResult<Vec<TicketMessage>> {
        Ok(self
            .lock()
            .messages
            .get(ticket_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn members(&self, ticket_id: &TicketId) -> SupportResult<Vec<TicketMember>> {
        Ok(self
            .lock()
            .members
            .get(ticket_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl ServiceRepository for MemorySupportRepository {
    async fn find_service(&self, service_id: i64) -> SupportResult<Option<Service>> {
        Ok(self.lock().services.get(&service_id).cloned())
    }

    async fn assign(
        &self,
        ticket_id: &TicketId,
        assignment: &ServiceAssignment,
        notice: NewMessage,
        now: DateTime<Utc>,
    ) -> SupportResult<()> {
        let mut state = self.lock();
        if !state.tickets.contains_key(ticket_id) {
            return Err(SupportError::TicketNotFound);
        }

        state.user_services.push(assignment.user_service.clone());
        state.transactions.push(assignment.transaction.clone());
        state.push_message(ticket_id, notice, None, now);
        Ok(())
    }
}
