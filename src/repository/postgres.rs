use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
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

const USER_COLUMNS: &str = "id, name, email, phone, password_hash, role, created_at";
const CAR_COLUMNS: &str = "id, owner_id, plate_number, brand, model, year, fuel_type, created_at";
const CENTER_COLUMNS: &str = "id, name, city, address, phone, price_cents, is_active, created_at";
const SLOT_COLUMNS: &str = "id, center_id, starts_at, ends_at, capacity, booked_count";
const BOOKING_COLUMNS: &str =
    "id, user_id, car_id, center_id, time_slot_id, status, created_at, updated_at";
const PAYMENT_COLUMNS: &str = "id, booking_id, user_id, amount_cents, status, created_at, paid_at";

const BOOKING_DETAILS_SELECT: &str = r#"
    SELECT b.id, b.user_id, b.car_id, b.center_id, b.time_slot_id, b.status,
           c.name AS center_name, c.city AS center_city, car.plate_number,
           s.starts_at, s.ends_at, p.amount_cents, p.status AS payment_status, b.created_at
    FROM bookings b
    JOIN centers c ON c.id = b.center_id
    JOIN cars car ON car.id = b.car_id
    JOIN time_slots s ON s.id = b.time_slot_id
    JOIN payments p ON p.booking_id = b.id
"#;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at runtime so the crate
/// builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turns a foreign-key violation (missing parent row) into a `NotFound` carrying `message`.
fn not_found_on_foreign_key(err: sqlx::Error, message: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            RepositoryError::NotFound(message.to_string())
        }
        _ => RepositoryError::Database(err),
    }
}

/// Turns a unique-constraint violation into a `Conflict` carrying `message`.
fn conflict_on_unique(err: sqlx::Error, message: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(message.to_string())
        }
        _ => RepositoryError::Database(err),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, phone, password_hash, role, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(user.email.to_lowercase())
            .bind(&user.phone)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "An account with this email already exists"))
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    /// Partial update: `COALESCE` keeps the stored value for every `None`.
    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        phone: Option<String>,
    ) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), phone = COALESCE($3, phone) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(name)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        let sql = format!("UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- PASSWORD RESET ---

    async fn create_reset_token(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<Uuid> {
        let token = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO password_reset_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(token)
    }

    /// Locks the token row, then burns every outstanding token of the user together
    /// with the password change.
    async fn consume_reset_token(
        &self,
        token: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT token, user_id, expires_at, used_at FROM password_reset_tokens \
             WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(record) = record.filter(|r| r.is_usable(now)) else {
            return Ok(false);
        };

        sqlx::query(
            "UPDATE password_reset_tokens SET used_at = $2 WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(record.user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(record.user_id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    // --- CARS ---

    async fn list_cars(&self, owner_id: Uuid) -> RepoResult<Vec<Car>> {
        let sql = format!(
            "SELECT {CAR_COLUMNS} FROM cars WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Car>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_car(&self, owner_id: Uuid, car: NewCar) -> RepoResult<Car> {
        let sql = format!(
            "INSERT INTO cars (id, owner_id, plate_number, brand, model, year, fuel_type, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) RETURNING {CAR_COLUMNS}"
        );
        sqlx::query_as::<_, Car>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(&car.plate_number)
            .bind(&car.brand)
            .bind(&car.model)
            .bind(car.year)
            .bind(car.fuel_type.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "A car with this plate number is already registered"))
    }

    async fn get_car(&self, id: Uuid, owner_id: Uuid) -> RepoResult<Option<Car>> {
        let sql = format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = $1 AND owner_id = $2");
        Ok(sqlx::query_as::<_, Car>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// The car row lock waits out any booking insert still referencing it, so the
    /// active-booking check below sees every committed booking.
    async fn delete_car(&self, id: Uuid, owner_id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM cars WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Ok(false);
        }

        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bookings \
             WHERE car_id = $1 AND status IN ('PENDING', 'CONFIRMED'))",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if active {
            return Err(active_booking_error());
        }

        sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    // --- CENTERS & SLOTS ---

    async fn list_centers(
        &self,
        city: Option<String>,
        include_inactive: bool,
    ) -> RepoResult<Vec<Center>> {
        let sql = format!(
            "SELECT {CENTER_COLUMNS} FROM centers \
             WHERE ($1::text IS NULL OR LOWER(city) = LOWER($1)) AND ($2 OR is_active) \
             ORDER BY name"
        );
        Ok(sqlx::query_as::<_, Center>(&sql)
            .bind(city)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_center(&self, id: Uuid) -> RepoResult<Option<Center>> {
        let sql = format!("SELECT {CENTER_COLUMNS} FROM centers WHERE id = $1");
        Ok(sqlx::query_as::<_, Center>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_center(&self, req: CreateCenterRequest) -> RepoResult<Center> {
        let sql = format!(
            "INSERT INTO centers (id, name, city, address, phone, price_cents, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW()) RETURNING {CENTER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Center>(&sql)
            .bind(Uuid::new_v4())
            .bind(&req.name)
            .bind(&req.city)
            .bind(&req.address)
            .bind(&req.phone)
            .bind(req.price_cents.unwrap_or(0))
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_center(
        &self,
        id: Uuid,
        req: UpdateCenterRequest,
    ) -> RepoResult<Option<Center>> {
        let sql = format!(
            "UPDATE centers SET \
                name = COALESCE($2, name), \
                city = COALESCE($3, city), \
                address = COALESCE($4, address), \
                phone = COALESCE($5, phone), \
                price_cents = COALESCE($6, price_cents), \
                is_active = COALESCE($7, is_active) \
             WHERE id = $1 RETURNING {CENTER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Center>(&sql)
            .bind(id)
            .bind(req.name)
            .bind(req.city)
            .bind(req.address)
            .bind(req.phone)
            .bind(req.price_cents)
            .bind(req.is_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_available_slots(
        &self,
        center_id: Uuid,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> RepoResult<Vec<TimeSlot>> {
        let sql = format!(
            "SELECT {SLOT_COLUMNS} FROM time_slots \
             WHERE center_id = $1 AND starts_at >= $2 \
               AND ($3::timestamptz IS NULL OR starts_at < $3) \
               AND booked_count < capacity \
             ORDER BY starts_at"
        );
        Ok(sqlx::query_as::<_, TimeSlot>(&sql)
            .bind(center_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_slot(
        &self,
        center_id: Uuid,
        req: CreateTimeSlotRequest,
    ) -> RepoResult<TimeSlot> {
        let sql = format!(
            "INSERT INTO time_slots (id, center_id, starts_at, ends_at, capacity, booked_count) \
             VALUES ($1, $2, $3, $4, $5, 0) RETURNING {SLOT_COLUMNS}"
        );
        sqlx::query_as::<_, TimeSlot>(&sql)
            .bind(Uuid::new_v4())
            .bind(center_id)
            .bind(req.starts_at)
            .bind(req.ends_at)
            .bind(req.capacity)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_on_foreign_key(e, "Center not found"))
    }

    // --- BOOKINGS ---

    /// Locks the slot row for the duration of the transaction so concurrent bookings
    /// cannot oversell its capacity.
    async fn create_booking(
        &self,
        user_id: Uuid,
        car_id: Uuid,
        time_slot_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let owns_car = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM cars WHERE id = $1 AND owner_id = $2)",
        )
        .bind(car_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if !owns_car {
            return Err(RepositoryError::NotFound("Car not found".to_string()));
        }

        let slot_sql = format!("SELECT {SLOT_COLUMNS} FROM time_slots WHERE id = $1 FOR UPDATE");
        let slot = sqlx::query_as::<_, TimeSlot>(&slot_sql)
            .bind(time_slot_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Time slot not found".to_string()))?;

        let center_sql = format!("SELECT {CENTER_COLUMNS} FROM centers WHERE id = $1");
        let center = sqlx::query_as::<_, Center>(&center_sql)
            .bind(slot.center_id)
            .fetch_one(&mut *tx)
            .await?;

        if !center.is_active {
            return Err(RepositoryError::Rejected(
                "This center is not accepting bookings".to_string(),
            ));
        }
        ensure_bookable(&slot, now)?;

        sqlx::query("UPDATE time_slots SET booked_count = booked_count + 1 WHERE id = $1")
            .bind(slot.id)
            .execute(&mut *tx)
            .await?;

        let booking_sql = format!(
            "INSERT INTO bookings (id, user_id, car_id, center_id, time_slot_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, $6) RETURNING {BOOKING_COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&booking_sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(car_id)
            .bind(center.id)
            .bind(slot.id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO payments (id, booking_id, user_id, amount_cents, status, created_at) \
             VALUES ($1, $2, $3, $4, 'PENDING', $5)",
        )
        .bind(Uuid::new_v4())
        .bind(booking.id)
        .bind(user_id)
        .bind(center.price_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<BookingDetails>> {
        let sql = format!("{BOOKING_DETAILS_SELECT} WHERE b.id = $1");
        Ok(sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_user_bookings(&self, user_id: Uuid) -> RepoResult<Vec<BookingDetails>> {
        let sql = format!("{BOOKING_DETAILS_SELECT} WHERE b.user_id = $1 ORDER BY s.starts_at DESC");
        Ok(sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_bookings(
        &self,
        status: Option<BookingStatus>,
    ) -> RepoResult<Vec<BookingDetails>> {
        let sql = format!(
            "{BOOKING_DETAILS_SELECT} WHERE ($1::text IS NULL OR b.status = $1) ORDER BY s.starts_at DESC"
        );
        Ok(sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> RepoResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let select_sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, Booking>(&select_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Booking not found".to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(booking_transition_error(current.status, status));
        }

        let update_sql = format!(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Booking>(&update_sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?;

        if status == BookingStatus::Cancelled {
            sqlx::query(
                "UPDATE time_slots SET booked_count = booked_count - 1 WHERE id = $1 AND booked_count > 0",
            )
            .bind(current.time_slot_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE payments SET status = 'REFUNDED' WHERE booking_id = $1 AND status = 'PAID'",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    // --- PAYMENTS ---

    async fn list_user_payments(&self, user_id: Uuid) -> RepoResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Payment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_payments(&self, status: Option<PaymentStatus>) -> RepoResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Payment>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> RepoResult<Payment> {
        let mut tx = self.pool.begin().await?;

        let booking_id =
            sqlx::query_scalar::<_, Uuid>("SELECT booking_id FROM payments WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::NotFound("Payment not found".to_string()))?;

        // Booking row first, same lock order as update_booking_status.
        let booking_status =
            sqlx::query_scalar::<_, String>("SELECT status FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(booking_id)
                .fetch_one(&mut *tx)
                .await?;

        let select_sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, Payment>(&select_sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if !current.status.can_transition_to(status) {
            return Err(payment_transition_error(current.status, status));
        }
        if status == PaymentStatus::Paid && booking_status == BookingStatus::Cancelled.as_str() {
            return Err(cancelled_booking_payment_error());
        }

        let update_sql = format!(
            "UPDATE payments SET status = $2, \
                paid_at = CASE WHEN $2 = 'PAID' THEN NOW() ELSE paid_at END \
             WHERE id = $1 RETURNING {PAYMENT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Payment>(&update_sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    // --- DASHBOARD ---

    async fn get_stats(&self) -> RepoResult<AdminStats> {
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let total_cars = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cars")
            .fetch_one(&self.pool)
            .await?;
        let total_centers = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM centers")
            .fetch_one(&self.pool)
            .await?;
        let revenue_cents = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM payments WHERE status = 'PAID'",
        )
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM bookings GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let bookings_by_status = BookingStatus::ALL
            .iter()
            .map(|status| BookingCount {
                status: *status,
                count: rows
                    .iter()
                    .find(|(s, _)| s == status.as_str())
                    .map(|(_, count)| *count)
                    .unwrap_or(0),
            })
            .collect();

        Ok(AdminStats {
            total_users,
            total_cars,
            total_centers,
            bookings_by_status,
            revenue_cents,
        })
    }
}
