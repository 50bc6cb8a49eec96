use crate::common::ValidationError;

/// Characters that cannot appear in a name because names end up near file paths.
pub const RESERVED_CHARACTERS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

pub const MIN_AGE: i64 = 1;
pub const MAX_AGE: i64 = 150;

/// Enrollment input that passed every rule, names already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
}

pub fn validate_enrollment(first_name: &str, last_name: &str, age: i64) -> Result<ValidatedInput, ValidationError> {
    let first_name = first_name.trim();
    let last_name = last_name.trim();

    if first_name.is_empty() {
        return Err(ValidationError::MissingFirstName);
    }
    if last_name.is_empty() {
        return Err(ValidationError::MissingLastName);
    }

    check_reserved("First name", first_name)?;
    check_reserved("Last name", last_name)?;

    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(ValidationError::AgeOutOfRange(age));
    }

    Ok(ValidatedInput {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        age: age as u32,
    })
}

fn check_reserved(field: &'static str, value: &str) -> Result<(), ValidationError> {
    match value.chars().find(|c| RESERVED_CHARACTERS.contains(c)) {
        Some(character) => Err(ValidationError::ReservedCharacter { field, character }),
        None => Ok(()),
    }
}
