use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    RepoResult, Repository, active_booking_error, booking_transition_error,
    cancelled_booking_payment_error, ensure_bookable, payment_transition_error,
};
use crate::error::RepositoryError;
use crate::models::{
    AdminStats, Booking, BookingCount, BookingDetails, BookingStatus, Car, Center,
    CreateCenterRequest, CreateTimeSlotRequest, NewCar, NewUser, Payment, PasswordResetToken,
    PaymentStatus, Role, TimeSlot, UpdateCenterRequest, User,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    reset_tokens: Vec<PasswordResetToken>,
    cars: Vec<Car>,
    centers: Vec<Center>,
    slots: Vec<TimeSlot>,
    bookings: Vec<Booking>,
    payments: Vec<Payment>,
}

impl Tables {
    fn details(&self, booking: &Booking) -> Option<BookingDetails> {
        let center = self.centers.iter().find(|c| c.id == booking.center_id)?;
        let car = self.cars.iter().find(|c| c.id == booking.car_id)?;
        let slot = self.slots.iter().find(|s| s.id == booking.time_slot_id)?;
        let payment = self.payments.iter().find(|p| p.booking_id == booking.id)?;

        Some(BookingDetails {
            id: booking.id,
            user_id: booking.user_id,
            car_id: booking.car_id,
            center_id: booking.center_id,
            time_slot_id: booking.time_slot_id,
            status: booking.status,
            center_name: center.name.clone(),
            center_city: center.city.clone(),
            plate_number: car.plate_number.clone(),
            starts_at: slot.starts_at,
            ends_at: slot.ends_at,
            amount_cents: payment.amount_cents,
            payment_status: payment.status,
            created_at: booking.created_at,
        })
    }

    fn details_sorted(&self, filter: impl Fn(&Booking) -> bool) -> Vec<BookingDetails> {
        let mut list: Vec<BookingDetails> = self
            .bookings
            .iter()
            .filter(|b| filter(*b))
            .filter_map(|b| self.details(b))
            .collect();
        list.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
        list
    }
}

/// InMemoryRepository
///
/// `Repository` held entirely in process memory behind one `RwLock`. Mirrors the
/// Postgres semantics (unique emails and plates, ownership scoping, atomic booking) and
/// backs the test suite and database-less local runs.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        let email = user.email.to_lowercase();
        if tables.users.iter().any(|u| u.email == email) {
            return Err(RepositoryError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email,
            phone: user.phone,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let email = email.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        phone: Option<String>,
    ) -> RepoResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(phone) = phone {
            user.phone = Some(phone);
        }
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    // --- PASSWORD RESET ---

    async fn create_reset_token(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<Uuid> {
        let token = Uuid::new_v4();
        let mut tables = self.tables.write().await;
        tables.reset_tokens.push(PasswordResetToken {
            token,
            user_id,
            expires_at,
            used_at: None,
        });
        Ok(token)
    }

    async fn consume_reset_token(
        &self,
        token: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let user_id = match tables.reset_tokens.iter().find(|t| t.token == token) {
            Some(record) if record.is_usable(now) => record.user_id,
            _ => return Ok(false),
        };

        for record in tables
            .reset_tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.used_at.is_none())
        {
            record.used_at = Some(now);
        }
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(true)
    }

    // --- CARS ---

    async fn list_cars(&self, owner_id: Uuid) -> RepoResult<Vec<Car>> {
        let tables = self.tables.read().await;
        let mut cars: Vec<Car> = tables
            .cars
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        cars.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cars)
    }

    async fn create_car(&self, owner_id: Uuid, car: NewCar) -> RepoResult<Car> {
        let mut tables = self.tables.write().await;
        if tables.cars.iter().any(|c| c.plate_number == car.plate_number) {
            return Err(RepositoryError::Conflict(
                "A car with this plate number is already registered".to_string(),
            ));
        }

        let created = Car {
            id: Uuid::new_v4(),
            owner_id,
            plate_number: car.plate_number,
            brand: car.brand,
            model: car.model,
            year: car.year,
            fuel_type: car.fuel_type,
            created_at: Utc::now(),
        };
        tables.cars.push(created.clone());
        Ok(created)
    }

    async fn get_car(&self, id: Uuid, owner_id: Uuid) -> RepoResult<Option<Car>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cars
            .iter()
            .find(|c| c.id == id && c.owner_id == owner_id)
            .cloned())
    }

    async fn delete_car(&self, id: Uuid, owner_id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.cars.iter().any(|c| c.id == id && c.owner_id == owner_id) {
            return Ok(false);
        }
        if tables
            .bookings
            .iter()
            .any(|b| b.car_id == id && b.status.is_active())
        {
            return Err(active_booking_error());
        }

        let before = tables.cars.len();
        tables
            .cars
            .retain(|c| !(c.id == id && c.owner_id == owner_id));
        let deleted = tables.cars.len() < before;

        if deleted {
            // Mirrors ON DELETE CASCADE.
            let removed: Vec<Uuid> = tables
                .bookings
                .iter()
                .filter(|b| b.car_id == id)
                .map(|b| b.id)
                .collect();
            tables.bookings.retain(|b| b.car_id != id);
            tables.payments.retain(|p| !removed.contains(&p.booking_id));
        }
        Ok(deleted)
    }

    // --- CENTERS & SLOTS ---

    async fn list_centers(
        &self,
        city: Option<String>,
        include_inactive: bool,
    ) -> RepoResult<Vec<Center>> {
        let tables = self.tables.read().await;
        let mut centers: Vec<Center> = tables
            .centers
            .iter()
            .filter(|c| include_inactive || c.is_active)
            .filter(|c| {
                city.as_ref()
                    .is_none_or(|city| c.city.to_lowercase() == city.to_lowercase())
            })
            .cloned()
            .collect();
        centers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(centers)
    }

    async fn get_center(&self, id: Uuid) -> RepoResult<Option<Center>> {
        let tables = self.tables.read().await;
        Ok(tables.centers.iter().find(|c| c.id == id).cloned())
    }

    async fn create_center(&self, req: CreateCenterRequest) -> RepoResult<Center> {
        let center = Center {
            id: Uuid::new_v4(),
            name: req.name,
            city: req.city,
            address: req.address,
            phone: req.phone,
            price_cents: req.price_cents.unwrap_or(0),
            is_active: true,
            created_at: Utc::now(),
        };
        self.tables.write().await.centers.push(center.clone());
        Ok(center)
    }

    async fn update_center(
        &self,
        id: Uuid,
        req: UpdateCenterRequest,
    ) -> RepoResult<Option<Center>> {
        let mut tables = self.tables.write().await;
        let Some(center) = tables.centers.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            center.name = name;
        }
        if let Some(city) = req.city {
            center.city = city;
        }
        if let Some(address) = req.address {
            center.address = address;
        }
        if let Some(phone) = req.phone {
            center.phone = Some(phone);
        }
        if let Some(price) = req.price_cents {
            center.price_cents = price;
        }
        if let Some(active) = req.is_active {
            center.is_active = active;
        }
        Ok(Some(center.clone()))
    }

    async fn list_available_slots(
        &self,
        center_id: Uuid,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> RepoResult<Vec<TimeSlot>> {
        let tables = self.tables.read().await;
        let mut slots: Vec<TimeSlot> = tables
            .slots
            .iter()
            .filter(|s| s.center_id == center_id && s.starts_at >= from)
            .filter(|s| to.is_none_or(|to| s.starts_at < to))
            .filter(|s| s.seats_left() > 0)
            .cloned()
            .collect();
        slots.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        Ok(slots)
    }

    async fn create_slot(
        &self,
        center_id: Uuid,
        req: CreateTimeSlotRequest,
    ) -> RepoResult<TimeSlot> {
        let mut tables = self.tables.write().await;
        if !tables.centers.iter().any(|c| c.id == center_id) {
            return Err(RepositoryError::NotFound("Center not found".to_string()));
        }
        let slot = TimeSlot {
            id: Uuid::new_v4(),
            center_id,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            capacity: req.capacity,
            booked_count: 0,
        };
        tables.slots.push(slot.clone());
        Ok(slot)
    }

    // --- BOOKINGS ---

    async fn create_booking(
        &self,
        user_id: Uuid,
        car_id: Uuid,
        time_slot_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Booking> {
        let mut tables = self.tables.write().await;

        if !tables
            .cars
            .iter()
            .any(|c| c.id == car_id && c.owner_id == user_id)
        {
            return Err(RepositoryError::NotFound("Car not found".to_string()));
        }

        let slot = tables
            .slots
            .iter()
            .find(|s| s.id == time_slot_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound("Time slot not found".to_string()))?;

        let center = tables
            .centers
            .iter()
            .find(|c| c.id == slot.center_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound("Center not found".to_string()))?;

        if !center.is_active {
            return Err(RepositoryError::Rejected(
                "This center is not accepting bookings".to_string(),
            ));
        }
        ensure_bookable(&slot, now)?;

        if let Some(stored) = tables.slots.iter_mut().find(|s| s.id == slot.id) {
            stored.booked_count += 1;
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            user_id,
            car_id,
            center_id: center.id,
            time_slot_id: slot.id,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.bookings.push(booking.clone());
        tables.payments.push(Payment {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            user_id,
            amount_cents: center.price_cents,
            status: PaymentStatus::Pending,
            created_at: now,
            paid_at: None,
        });
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<BookingDetails>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .iter()
            .find(|b| b.id == id)
            .and_then(|b| tables.details(b)))
    }

    async fn list_user_bookings(&self, user_id: Uuid) -> RepoResult<Vec<BookingDetails>> {
        let tables = self.tables.read().await;
        Ok(tables.details_sorted(|b| b.user_id == user_id))
    }

    async fn list_bookings(
        &self,
        status: Option<BookingStatus>,
    ) -> RepoResult<Vec<BookingDetails>> {
        let tables = self.tables.read().await;
        Ok(tables.details_sorted(|b| status.is_none_or(|s| b.status == s)))
    }

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> RepoResult<Booking> {
        let mut tables = self.tables.write().await;

        let booking = tables
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| RepositoryError::NotFound("Booking not found".to_string()))?;

        if !booking.status.can_transition_to(status) {
            return Err(booking_transition_error(booking.status, status));
        }
        booking.status = status;
        booking.updated_at = Utc::now();
        let updated = booking.clone();

        if status == BookingStatus::Cancelled {
            if let Some(slot) = tables
                .slots
                .iter_mut()
                .find(|s| s.id == updated.time_slot_id)
            {
                slot.booked_count = (slot.booked_count - 1).max(0);
            }
            if let Some(payment) = tables
                .payments
                .iter_mut()
                .find(|p| p.booking_id == id && p.status == PaymentStatus::Paid)
            {
                payment.status = PaymentStatus::Refunded;
            }
        }
        Ok(updated)
    }

    // --- PAYMENTS ---

    async fn list_user_payments(&self, user_id: Uuid) -> RepoResult<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn list_payments(&self, status: Option<PaymentStatus>) -> RepoResult<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .iter()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> RepoResult<Payment> {
        let mut tables = self.tables.write().await;
        let Tables {
            payments, bookings, ..
        } = &mut *tables;
        let payment = payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| RepositoryError::NotFound("Payment not found".to_string()))?;

        if !payment.status.can_transition_to(status) {
            return Err(payment_transition_error(payment.status, status));
        }
        let booking_cancelled = bookings
            .iter()
            .any(|b| b.id == payment.booking_id && b.status == BookingStatus::Cancelled);
        if status == PaymentStatus::Paid && booking_cancelled {
            return Err(cancelled_booking_payment_error());
        }
        payment.status = status;
        if status == PaymentStatus::Paid {
            payment.paid_at = Some(Utc::now());
        }
        Ok(payment.clone())
    }

    // --- DASHBOARD ---

    async fn get_stats(&self) -> RepoResult<AdminStats> {
        let tables = self.tables.read().await;
        let bookings_by_status = BookingStatus::ALL
            .iter()
            .map(|status| BookingCount {
                status: *status,
                count: tables.bookings.iter().filter(|b| b.status == *status).count() as i64,
            })
            .collect();

        Ok(AdminStats {
            total_users: tables.users.len() as i64,
            total_cars: tables.cars.len() as i64,
            total_centers: tables.centers.len() as i64,
            bookings_by_status,
            revenue_cents: tables
                .payments
                .iter()
                .filter(|p| p.status == PaymentStatus::Paid)
                .map(|p| p.amount_cents)
                .sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FuelType;
    use chrono::Duration;

    async fn seed(repo: &InMemoryRepository, capacity: i32) -> (User, Car, TimeSlot) {
        let user = repo
            .create_user(NewUser {
                name: "Youssef".into(),
                email: "youssef@example.com".into(),
                phone: None,
                password_hash: "hash".into(),
                role: Role::User,
            })
            .await
            .unwrap();
        let car = repo
            .create_car(
                user.id,
                NewCar {
                    plate_number: "12345A6".into(),
                    brand: "Dacia".into(),
                    model: "Logan".into(),
                    year: 2019,
                    fuel_type: FuelType::Diesel,
                },
            )
            .await
            .unwrap();
        let center = repo
            .create_center(CreateCenterRequest {
                name: "Centre Nord".into(),
                city: "Rabat".into(),
                address: "1 Av. Hassan II".into(),
                phone: None,
                price_cents: Some(25_000),
            })
            .await
            .unwrap();
        let now = Utc::now();
        let slot = repo
            .create_slot(
                center.id,
                CreateTimeSlotRequest {
                    starts_at: now + Duration::days(1),
                    ends_at: now + Duration::days(1) + Duration::minutes(30),
                    capacity,
                },
            )
            .await
            .unwrap();
        (user, car, slot)
    }

    #[tokio::test]
    async fn emails_are_unique_case_insensitively() {
        let repo = InMemoryRepository::new();
        seed(&repo, 1).await;
        let err = repo
            .create_user(NewUser {
                name: "Other".into(),
                email: "YOUSSEF@example.com".into(),
                phone: None,
                password_hash: "hash".into(),
                role: Role::User,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn booking_consumes_a_seat_and_creates_a_payment() {
        let repo = InMemoryRepository::new();
        let (user, car, slot) = seed(&repo, 1).await;

        let booking = repo
            .create_booking(user.id, car.id, slot.id, Utc::now())
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);

        let payments = repo.list_user_payments(user.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_cents, 25_000);

        let err = repo
            .create_booking(user.id, car.id, slot.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Rejected(_)));
    }

    #[tokio::test]
    async fn started_slots_refuse_bookings() {
        let repo = InMemoryRepository::new();
        let (user, car, slot) = seed(&repo, 3).await;

        let later = slot.starts_at + Duration::minutes(1);
        let err = repo
            .create_booking(user.id, car.id, slot.id, later)
            .await
            .unwrap_err();
        assert!(
            matches!(err, RepositoryError::Rejected(ref msg) if msg == "This time slot has already started")
        );

        let open = repo
            .list_available_slots(slot.center_id, Utc::now(), None)
            .await
            .unwrap();
        assert_eq!(open[0].booked_count, 0);
    }

    #[tokio::test]
    async fn cancelling_frees_the_seat_and_refunds() {
        let repo = InMemoryRepository::new();
        let (user, car, slot) = seed(&repo, 1).await;
        let booking = repo
            .create_booking(user.id, car.id, slot.id, Utc::now())
            .await
            .unwrap();

        let payment = repo.list_user_payments(user.id).await.unwrap().remove(0);
        repo.update_payment_status(payment.id, PaymentStatus::Paid)
            .await
            .unwrap();

        repo.update_booking_status(booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        let free = repo
            .list_available_slots(slot.center_id, Utc::now(), None)
            .await
            .unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].booked_count, 0);

        let payment = repo.list_user_payments(user.id).await.unwrap().remove(0);
        assert_eq!(payment.status, PaymentStatus::Refunded);

        let err = repo
            .update_booking_status(booking.id, BookingStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Rejected(_)));
    }

    #[tokio::test]
    async fn payment_of_a_cancelled_booking_cannot_be_paid() {
        let repo = InMemoryRepository::new();
        let (user, car, slot) = seed(&repo, 1).await;
        let booking = repo
            .create_booking(user.id, car.id, slot.id, Utc::now())
            .await
            .unwrap();
        repo.update_booking_status(booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        let payment = repo.list_user_payments(user.id).await.unwrap().remove(0);
        let err = repo
            .update_payment_status(payment.id, PaymentStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Rejected(_)));
        assert_eq!(repo.get_stats().await.unwrap().revenue_cents, 0);
    }

    #[tokio::test]
    async fn car_with_an_active_booking_is_kept_until_cancelled() {
        let repo = InMemoryRepository::new();
        let (user, car, slot) = seed(&repo, 1).await;
        let booking = repo
            .create_booking(user.id, car.id, slot.id, Utc::now())
            .await
            .unwrap();

        let err = repo.delete_car(car.id, user.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Rejected(_)));
        assert!(repo.get_booking(booking.id).await.unwrap().is_some());
        let open = repo
            .list_available_slots(slot.center_id, Utc::now(), None)
            .await
            .unwrap();
        assert!(open.is_empty());

        repo.update_booking_status(booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert!(repo.delete_car(car.id, user.id).await.unwrap());
        assert!(!repo.delete_car(car.id, user.id).await.unwrap());
        let open = repo
            .list_available_slots(slot.center_id, Utc::now(), None)
            .await
            .unwrap();
        assert_eq!(open[0].booked_count, 0);
    }

    #[tokio::test]
    async fn reset_tokens_are_single_use_and_expire() {
        let repo = InMemoryRepository::new();
        let (user, _, _) = seed(&repo, 1).await;
        let now = Utc::now();

        let expired = repo
            .create_reset_token(user.id, now - Duration::minutes(1))
            .await
            .unwrap();
        assert!(!repo.consume_reset_token(expired, "new", now).await.unwrap());

        let token = repo
            .create_reset_token(user.id, now + Duration::hours(1))
            .await
            .unwrap();
        assert!(repo.consume_reset_token(token, "new", now).await.unwrap());
        assert!(!repo.consume_reset_token(token, "newer", now).await.unwrap());

        let stored = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new");
    }
}
