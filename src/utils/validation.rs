use crate::error::{Error, Result};

/// Trims `value` and checks it is non-empty and at most `max_chars` long.
pub fn require_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > max_chars {
        return Err(Error::BadRequest(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(trimmed.to_string())
}

pub fn require_range(field: &str, value: u32, min: u32, max: u32) -> Result<u32> {
    if value < min || value > max {
        return Err(Error::BadRequest(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed_and_bounded() {
        assert_eq!(require_text("subject", "  Math ", 100).unwrap(), "Math");
        assert!(require_text("subject", "   ", 100).is_err());
        assert!(require_text("topic", &"x".repeat(101), 100).is_err());
    }

    #[test]
    fn range_is_inclusive() {
        assert_eq!(require_range("count", 1, 1, 20).unwrap(), 1);
        assert_eq!(require_range("count", 20, 1, 20).unwrap(), 20);
        assert!(require_range("count", 0, 1, 20).is_err());
        assert!(require_range("count", 21, 1, 20).is_err());
    }
}
