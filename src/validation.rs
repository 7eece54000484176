use chrono::{Datelike, NaiveDate, Utc};

use crate::{
    auth::MIN_PASSWORD_LEN,
    error::ApiError,
    models::{CreateCarRequest, CreateCenterRequest, CreateTimeSlotRequest, FuelType, NewCar},
};

/// Oldest model year accepted for a registered car.
pub const MIN_CAR_YEAR: i32 = 1900;

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Trims `value`, failing with "`field` is required" when nothing is left.
pub fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

/// Upper-cases a plate and drops all whitespace, so `12345 a 6` and `12345A6` collide.
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Turns an empty optional text into `None` and trims the rest.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_car(req: CreateCarRequest) -> Result<NewCar, ApiError> {
    let plate_number = normalize_plate(&required(&req.plate_number, "Plate number")?);
    let brand = required(&req.brand, "Brand")?;
    let model = required(&req.model, "Model")?;

    let max_year = Utc::now().year() + 1;
    let year = req
        .year
        .ok_or_else(|| ApiError::validation("Year is required"))?;
    if !(MIN_CAR_YEAR..=max_year).contains(&year) {
        return Err(ApiError::validation(format!(
            "Year must be between {MIN_CAR_YEAR} and {max_year}"
        )));
    }

    Ok(NewCar {
        plate_number,
        brand,
        model,
        year,
        fuel_type: req.fuel_type.unwrap_or(FuelType::Petrol),
    })
}

pub fn validate_center(req: CreateCenterRequest) -> Result<CreateCenterRequest, ApiError> {
    let price_cents = req
        .price_cents
        .ok_or_else(|| ApiError::validation("Price is required"))?;
    if price_cents < 0 {
        return Err(ApiError::validation("Price cannot be negative"));
    }

    Ok(CreateCenterRequest {
        name: required(&req.name, "Name")?,
        city: required(&req.city, "City")?,
        address: required(&req.address, "Address")?,
        phone: optional_text(req.phone),
        price_cents: Some(price_cents),
    })
}

pub fn validate_slot(req: &CreateTimeSlotRequest) -> Result<(), ApiError> {
    if req.ends_at <= req.starts_at {
        return Err(ApiError::validation("A time slot must end after it starts"));
    }
    if req.capacity < 1 {
        return Err(ApiError::validation("Capacity must be at least 1"));
    }
    Ok(())
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::validation("Date must use the YYYY-MM-DD format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("driver@example.ma"));
        assert!(is_valid_email("  first.last@sub.example.com "));
        assert!(!is_valid_email("driver"));
        assert!(!is_valid_email("driver@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
        assert!(!is_valid_email("dri ver@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn plates_are_normalized() {
        assert_eq!(normalize_plate(" 12345 a 6 "), "12345A6");
        assert_eq!(normalize_plate("ab-123-cd"), "AB-123-CD");
    }

    #[test]
    fn car_year_range_is_enforced() {
        let base = CreateCarRequest {
            plate_number: "AB-123-CD".into(),
            brand: "Renault".into(),
            model: "Clio".into(),
            year: Some(1899),
            fuel_type: None,
        };
        assert!(validate_car(base.clone()).is_err());

        let next_year = Utc::now().year() + 1;
        let ok = validate_car(CreateCarRequest {
            year: Some(next_year),
            ..base.clone()
        })
        .unwrap();
        assert_eq!(ok.fuel_type, FuelType::Petrol);

        assert!(
            validate_car(CreateCarRequest {
                year: Some(next_year + 1),
                ..base.clone()
            })
            .is_err()
        );
        assert!(validate_car(CreateCarRequest { year: None, ..base }).is_err());
    }

    #[test]
    fn blank_fields_are_named_in_the_message() {
        let err = validate_car(CreateCarRequest {
            plate_number: "AB-123-CD".into(),
            brand: "   ".into(),
            model: "Clio".into(),
            year: Some(2020),
            fuel_type: None,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Brand is required");
    }

    #[test]
    fn password_length_counts_characters() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("éééééééé").is_ok());
    }

    #[test]
    fn dates() {
        assert!(parse_date("2026-03-01").is_ok());
        assert!(parse_date("01/03/2026").is_err());
    }
}
