//! Repository traits for the support domain

use chrono::{DateTime, Utc};
use kernel::id::{TicketId, UserId};

use crate::domain::entity::{
    NewMessage, Service, ServiceAssignment, Ticket, TicketMember, TicketMessage, TicketStatus,
};
use crate::error::SupportResult;

/// Which tickets a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketScope {
    All,
    /// Owned by or shared with the user
    VisibleTo(UserId),
}

/// Ticket repository trait.
///
/// Every write that touches a ticket's messages runs under that ticket's
/// lock, so a message's `created_at` never precedes an earlier message of
/// the same ticket.
#[trait_variant::make(TicketRepository: Send)]
pub trait LocalTicketRepository {
    /// Insert the ticket, its first message and the owner's membership as
    /// one unit.
    async fn create(&self, ticket: &Ticket, first: NewMessage) -> SupportResult<TicketMessage>;

    async fn find(&self, ticket_id: &TicketId) -> SupportResult<Option<Ticket>>;

    /// Newest `last_update` first.
    async fn list(&self, scope: TicketScope) -> SupportResult<Vec<Ticket>>;

    async fn is_member(&self, ticket_id: &TicketId, user_id: &UserId) -> SupportResult<bool>;

    /// Append a message and move `last_update` to its timestamp, setting
    /// `next_status` when given. `None` when the ticket does not exist.
    async fn post_message(
        &self,
        ticket_id: &TicketId,
        message: NewMessage,
        next_status: Option<TicketStatus>,
        now: DateTime<Utc>,
    ) -> SupportResult<Option<(Ticket, TicketMessage)>>;

    /// Add a member and post `notice` as one unit.
    /// `AlreadyMember` when the user is a member already.
    async fn add_member(
        &self,
        ticket_id: &TicketId,
        user_id: &UserId,
        notice: NewMessage,
        now: DateTime<Utc>,
    ) -> SupportResult<TicketMember>;

    /// Oldest first.
    async fn messages(&self, ticket_id: &TicketId) -> SupportResult<Vec<TicketMessage>>;

    /// In order of joining.
    async fn members(&self, ticket_id: &TicketId) -> SupportResult<Vec<TicketMember>>;
}

/// Service catalog and billing
#[trait_variant::make(ServiceRepository: Send)]
pub trait LocalServiceRepository {
    async fn find_service(&self, service_id: i64) -> SupportResult<Option<Service>>;

    /// Store the booked service and its invoice and post `notice` on the
    /// ticket, as one unit.
    async fn assign(
        &self,
        ticket_id: &TicketId,
        assignment: &ServiceAssignment,
        notice: NewMessage,
        now: DateTime<Utc>,
    ) -> SupportResult<()>;
}

/// Everything the ticket workflow needs from storage.
pub trait SupportStore: TicketRepository + ServiceRepository + Send + Sync + 'static {}

impl<T> SupportStore for T where T: TicketRepository + ServiceRepository + Send + Sync + 'static {}
