use crate::types::{ValidationError, DEFAULT_RATING, MAX_RATING, MIN_RATING};

/// How an unusable rating is treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RatingMode {
    /// Fall back to the default rating; creation never fails on a rating.
    Create,
    /// Reject the value, failing the whole update.
    Update,
}

pub fn validate_rating(raw: &str, mode: RatingMode) -> Result<u8, ValidationError> {
    match parse_rating(raw) {
        Some(rating) => Ok(rating),
        None => match mode {
            RatingMode::Create => {
                log::debug!("Rating '{}' is unusable, defaulting to {}", raw, DEFAULT_RATING);
                Ok(DEFAULT_RATING)
            }
            RatingMode::Update => Err(ValidationError::InvalidRating(raw.to_string())),
        },
    }
}

/// Parses a rating and checks its range, without any defaulting.
pub fn parse_rating(raw: &str) -> Option<u8> {
    let value = raw.trim().parse::<i64>().ok()?;
    if (MIN_RATING as i64..=MAX_RATING as i64).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}

pub fn validate_required_text(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

/// Turns a JSON rating into the raw text the validator parses.
///
/// Numbers and strings keep their textual form; anything else becomes an
/// empty string, which never parses.
pub fn rating_from_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_every_rating_in_range() {
        for r in 1..=5u8 {
            assert_eq!(validate_rating(&r.to_string(), RatingMode::Create), Ok(r));
            assert_eq!(validate_rating(&r.to_string(), RatingMode::Update), Ok(r));
        }
    }

    #[test]
    fn create_defaults_unusable_ratings() {
        for raw in ["0", "6", "-1", "abc", "", "3.5", "99999999999999999999"] {
            assert_eq!(
                validate_rating(raw, RatingMode::Create),
                Ok(DEFAULT_RATING),
                "raw = {raw:?}"
            );
        }
    }

    #[test]
    fn update_rejects_unusable_ratings() {
        for raw in ["0", "6", "9", "abc", ""] {
            assert_eq!(
                validate_rating(raw, RatingMode::Update),
                Err(ValidationError::InvalidRating(raw.to_string()))
            );
        }
    }

    #[test]
    fn rating_tolerates_surrounding_whitespace() {
        assert_eq!(validate_rating(" 4 ", RatingMode::Update), Ok(4));
    }

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(
            validate_required_text("  Kant \n", "author"),
            Ok("Kant".to_string())
        );
        assert_eq!(
            validate_required_text("   ", "text"),
            Err(ValidationError::EmptyField("text"))
        );
    }

    #[test]
    fn json_ratings_keep_their_text() {
        assert_eq!(rating_from_json(&json!(3)), "3");
        assert_eq!(rating_from_json(&json!("5")), "5");
        assert_eq!(rating_from_json(&json!(null)), "");
        assert_eq!(rating_from_json(&json!([1])), "");
    }
}
