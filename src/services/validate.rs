//! Input validation shared by the services.
//!
//! Lengths are counted in characters after trimming surrounding whitespace.

use super::error::{ServiceError, ServiceResult};
use crate::geo::GeoPoint;
use crate::models::{MAX_RATING, MIN_RATING};

pub const TITLE_LEN: (usize, usize) = (5, 120);
pub const DESCRIPTION_LEN: (usize, usize) = (10, 2000);
pub const MESSAGE_LEN: (usize, usize) = (1, 2000);
pub const REASON_LEN: (usize, usize) = (5, 1000);
pub const NAME_LEN: (usize, usize) = (2, 80);
pub const COMMENT_MAX: usize = 1000;
pub const APPLICATION_NOTE_MAX: usize = 1000;
pub const BIO_MAX: usize = 500;
pub const CITY_MAX: usize = 80;
pub const ADDRESS_HINT_MAX: usize = 200;
pub const MAX_SKILLS: usize = 20;
pub const SKILL_MAX: usize = 40;
pub const PASSWORD_MIN: usize = 8;

/// Trim `value` and require its length to fall within `bounds`.
pub fn text(field: &str, value: &str, bounds: (usize, usize)) -> ServiceResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    let (min, max) = bounds;
    if len < min {
        return Err(if min == 1 {
            ServiceError::validation(format!("{} must not be empty", field))
        } else {
            ServiceError::validation(format!("{} must be at least {} characters", field, min))
        });
    }
    if len > max {
        return Err(ServiceError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

/// Optional free text; blank input becomes `None`.
pub fn optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ServiceResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => text(field, v, (1, max)).map(Some),
        None => Ok(None),
    }
}

/// Trimmed, de-duplicated (case-insensitively) skill tags.
pub fn skills(values: &[String]) -> ServiceResult<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for raw in values {
        let skill = raw.trim();
        if skill.is_empty() {
            continue;
        }
        if skill.chars().count() > SKILL_MAX {
            return Err(ServiceError::validation(format!(
                "skills must be at most {} characters each",
                SKILL_MAX
            )));
        }
        if !out.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            out.push(skill.to_string());
        }
    }
    if out.len() > MAX_SKILLS {
        return Err(ServiceError::validation(format!(
            "at most {} skills are allowed",
            MAX_SKILLS
        )));
    }
    Ok(out)
}

/// Lower-cased email with an `@` followed somewhere by a dot.
pub fn email(value: &str) -> ServiceResult<String> {
    let email = crate::models::normalize_email(value);
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid && email.len() <= 254 {
        Ok(email)
    } else {
        Err(ServiceError::validation("email address is invalid"))
    }
}

pub fn password(value: &str) -> ServiceResult<()> {
    if value.chars().count() < PASSWORD_MIN {
        return Err(ServiceError::validation(format!(
            "password must be at least {} characters",
            PASSWORD_MIN
        )));
    }
    Ok(())
}

pub fn rating(value: i32) -> ServiceResult<i32> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(value)
    } else {
        Err(ServiceError::validation(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )))
    }
}

/// Both coordinates or neither.
pub fn location(lat: Option<f64>, lng: Option<f64>) -> ServiceResult<Option<GeoPoint>> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Some(GeoPoint::new(lat, lng)?)),
        (None, None) => Ok(None),
        _ => Err(ServiceError::validation(
            "lat and lng must be given together",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_bounds_use_trimmed_chars() {
        assert_eq!(text("title", "  Olá!  ", (4, 10)).unwrap(), "Olá!");
        assert!(text("title", "abc", TITLE_LEN).is_err());
        assert!(text("title", &"x".repeat(121), TITLE_LEN).is_err());
        // Multi-byte characters count once.
        assert!(text("title", &"ç".repeat(120), TITLE_LEN).is_ok());
        let err = text("body", "   ", MESSAGE_LEN).unwrap_err();
        assert_eq!(err.to_string(), "body must not be empty");
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("bio", None, BIO_MAX).unwrap(), None);
        assert_eq!(optional_text("bio", Some("   "), BIO_MAX).unwrap(), None);
        assert_eq!(
            optional_text("bio", Some(" hi "), BIO_MAX).unwrap(),
            Some("hi".to_string())
        );
        assert!(optional_text("bio", Some(&"a".repeat(501)), BIO_MAX).is_err());
    }

    #[test]
    fn test_skills() {
        let input = vec![" Cooking ".to_string(), "cooking".into(), "".into(), "Pets".into()];
        assert_eq!(skills(&input).unwrap(), vec!["Cooking", "Pets"]);

        let too_many: Vec<String> = (0..21).map(|i| format!("skill {i}")).collect();
        assert!(skills(&too_many).is_err());
        assert!(skills(&["x".repeat(41)]).is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(email(" Ana@Example.COM ").unwrap(), "ana@example.com");
        for bad in ["ana", "ana@", "@x.com", "ana@localhost", "ana@x.", "a@b@c.com", "a b@c.com"] {
            assert!(email(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_password_and_rating() {
        assert!(password("1234567").is_err());
        assert!(password("12345678").is_ok());
        assert!(rating(0).is_err());
        assert!(rating(6).is_err());
        assert_eq!(rating(5).unwrap(), 5);
    }

    #[test]
    fn test_location_pairs() {
        assert!(location(None, None).unwrap().is_none());
        assert!(location(Some(1.0), None).is_err());
        assert!(location(Some(95.0), Some(0.0)).is_err());
        assert!(location(Some(-29.6), Some(-53.2)).unwrap().is_some());
    }
}
