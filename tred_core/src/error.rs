use thiserror::Error;

/// Rejected user input. Lengths are counted in characters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} needs at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} allows at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

pub(crate) fn check_len(
    field: &'static str,
    value: &str,
    min: usize,
    max: Option<usize>,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    match max {
        Some(max) if len > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_characters_not_bytes() {
        assert!(check_len("tred", "héé", 3, None).is_ok());
        assert_eq!(
            check_len("tred", "hi", 3, None),
            Err(ValidationError::TooShort {
                field: "tred",
                min: 3
            })
        );
    }

    #[test]
    fn enforces_upper_bound() {
        let err = check_len("bio", &"x".repeat(11), 0, Some(10)).unwrap_err();
        assert_eq!(err.to_string(), "bio allows at most 10 characters");
    }
}
