use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{
    AdminStats, Booking, BookingDetails, BookingStatus, Car, Center, CreateCenterRequest,
    CreateTimeSlotRequest, NewCar, NewUser, Payment, PaymentStatus, Role, TimeSlot,
    UpdateCenterRequest, User,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract used by every handler. Handlers never see SQL; swapping
/// `PostgresRepository` for `InMemoryRepository` changes nothing above this line.
///
/// Ownership-scoped methods take the caller's `user_id` and behave as if a row owned by
/// someone else does not exist.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    /// Email lookup is case-insensitive (emails are stored lowercased).
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        phone: Option<String>,
    ) -> RepoResult<Option<User>>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepoResult<bool>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>>;

    // --- Password reset ---
    async fn create_reset_token(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<Uuid>;
    /// Marks the token used and stores the new hash in one step. Returns false when the
    /// token is unknown, expired or already used.
    async fn consume_reset_token(
        &self,
        token: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;

    // --- Cars ---
    async fn list_cars(&self, owner_id: Uuid) -> RepoResult<Vec<Car>>;
    /// Fails with `Conflict` when the plate number is already registered.
    async fn create_car(&self, owner_id: Uuid, car: NewCar) -> RepoResult<Car>;
    async fn get_car(&self, id: Uuid, owner_id: Uuid) -> RepoResult<Option<Car>>;
    /// Returns false when the caller owns no such car; `Rejected` while the car has a
    /// PENDING or CONFIRMED booking. The check and the delete are one atomic step.
    async fn delete_car(&self, id: Uuid, owner_id: Uuid) -> RepoResult<bool>;

    // --- Centers & slots ---
    async fn list_centers(
        &self,
        city: Option<String>,
        include_inactive: bool,
    ) -> RepoResult<Vec<Center>>;
    async fn get_center(&self, id: Uuid) -> RepoResult<Option<Center>>;
    async fn create_center(&self, req: CreateCenterRequest) -> RepoResult<Center>;
    async fn update_center(&self, id: Uuid, req: UpdateCenterRequest)
    -> RepoResult<Option<Center>>;
    /// Slots of a center starting inside `[from, to)` with at least one free seat,
    /// earliest first.
    async fn list_available_slots(
        &self,
        center_id: Uuid,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> RepoResult<Vec<TimeSlot>>;
    async fn create_slot(&self, center_id: Uuid, req: CreateTimeSlotRequest)
    -> RepoResult<TimeSlot>;

    // --- Bookings ---
    /// Reserves a seat and creates the booking with its PENDING payment atomically.
    /// `NotFound` for a car the user does not own or an unknown slot; `Rejected` for a
    /// full or past slot, or a slot at an inactive center.
    async fn create_booking(
        &self,
        user_id: Uuid,
        car_id: Uuid,
        time_slot_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Booking>;
    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<BookingDetails>>;
    async fn list_user_bookings(&self, user_id: Uuid) -> RepoResult<Vec<BookingDetails>>;
    async fn list_bookings(&self, status: Option<BookingStatus>)
    -> RepoResult<Vec<BookingDetails>>;
    /// Applies a status change if the lifecycle allows it (`Rejected` otherwise).
    /// Cancelling frees the slot seat and refunds a PAID payment.
    async fn update_booking_status(&self, id: Uuid, status: BookingStatus)
    -> RepoResult<Booking>;

    // --- Payments ---
    async fn list_user_payments(&self, user_id: Uuid) -> RepoResult<Vec<Payment>>;
    async fn list_payments(&self, status: Option<PaymentStatus>) -> RepoResult<Vec<Payment>>;
    /// Lifecycle-checked like bookings; a payment whose booking is CANCELLED can no
    /// longer become PAID.
    async fn update_payment_status(&self, id: Uuid, status: PaymentStatus)
    -> RepoResult<Payment>;

    // --- Dashboard ---
    async fn get_stats(&self) -> RepoResult<AdminStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

pub(crate) fn booking_transition_error(from: BookingStatus, to: BookingStatus) -> RepositoryError {
    RepositoryError::Rejected(format!(
        "Cannot change booking status from {} to {}",
        from.as_str(),
        to.as_str()
    ))
}

pub(crate) fn payment_transition_error(from: PaymentStatus, to: PaymentStatus) -> RepositoryError {
    RepositoryError::Rejected(format!(
        "Cannot change payment status from {} to {}",
        from.as_str(),
        to.as_str()
    ))
}

pub(crate) fn cancelled_booking_payment_error() -> RepositoryError {
    RepositoryError::Rejected("A payment for a cancelled booking cannot be marked as paid".to_string())
}

pub(crate) fn active_booking_error() -> RepositoryError {
    RepositoryError::Rejected(
        "This car has an active booking; cancel it before removing the car".to_string(),
    )
}

/// A slot takes a booking only while it has not started and still has a free seat.
pub(crate) fn ensure_bookable(slot: &TimeSlot, now: DateTime<Utc>) -> RepoResult<()> {
    if slot.is_bookable(now) {
        return Ok(());
    }
    let reason = if slot.starts_at <= now {
        "This time slot has already started"
    } else {
        "This time slot is fully booked"
    };
    Err(RepositoryError::Rejected(reason.to_string()))
}
