use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Side, ATTRIBUTES, FIELD_EMAIL, FIELD_TEL};

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{label} est obligatoire")]
    MissingField { field: &'static str, label: String },
    #[error("Le champ {label} doit contenir du texte en {}", .expected.language_name())]
    ScriptMismatch {
        field: &'static str,
        label: String,
        expected: Side,
    },
    #[error("Tous les champs sont requis.")]
    MissingCredentials,
    #[error("Email invalide.")]
    InvalidEmail,
    #[error("Les mots de passe ne correspondent pas.")]
    PasswordMismatch,
    #[error("Le mot de passe doit faire au moins {} caractères.", MIN_PASSWORD_LEN)]
    PasswordTooShort,
    #[error("Email déjà utilisé.")]
    EmailTaken,
}

impl ValidationError {
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field, .. } | Self::ScriptMismatch { field, .. } => Some(*field),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    values: BTreeMap<String, String>,
}

impl ProfileForm {
    pub fn from_submission<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            if let Some(known) = known_key(key.as_ref()) {
                form.set(known, value.as_ref());
            }
        }
        form
    }

    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.trim().to_string());
    }
}

fn known_key(key: &str) -> Option<&'static str> {
    ATTRIBUTES
        .iter()
        .flat_map(|attribute| [attribute.form_key(Side::Fr), attribute.form_key(Side::Ar)])
        .chain([FIELD_TEL, FIELD_EMAIL])
        .find(|candidate| *candidate == key)
}

fn side_label(label: &str, side: Side) -> String {
    match side {
        Side::Fr => format!("{label} (Français)"),
        Side::Ar => format!("{label} (عربي)"),
    }
}

pub fn validate_required_bilingual(form: &ProfileForm) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for attribute in ATTRIBUTES {
        for side in [Side::Fr, Side::Ar] {
            let field = attribute.form_key(side);
            if form.get(field).trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    field,
                    label: side_label(attribute.label(side), side),
                });
            }
        }
    }
    for (field, label) in [(FIELD_TEL, "Téléphone"), (FIELD_EMAIL, "Email")] {
        if form.get(field).trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field,
                label: label.to_string(),
            });
        }
    }
    errors
}

/// Empty values are skipped here; they are reported by [`validate_required_bilingual`].
pub fn validate_script_conformance(form: &ProfileForm) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for side in [Side::Fr, Side::Ar] {
        for attribute in ATTRIBUTES {
            let field = attribute.form_key(side);
            let value = form.get(field).trim();
            if value.is_empty() || has_script(value, side) {
                continue;
            }
            let label = match side {
                Side::Fr => format!("{} (Français)", attribute.key()),
                Side::Ar => format!("{} (العربية)", attribute.key()),
            };
            errors.push(ValidationError::ScriptMismatch {
                field,
                label,
                expected: side,
            });
        }
    }
    errors
}

pub fn validate_profile(form: &ProfileForm) -> Vec<ValidationError> {
    let mut errors = validate_required_bilingual(form);
    errors.extend(validate_script_conformance(form));
    errors
}

pub fn has_script(text: &str, side: Side) -> bool {
    match side {
        Side::Fr => text.chars().any(is_french_letter),
        Side::Ar => text.chars().any(is_arabic_char),
    }
}

fn is_french_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || "àâäéèêëïîôöùûüÿçÀÂÄÉÈÊËÏÎÔÖÙÛÜŸÇ".contains(c)
}

fn is_arabic_char(c: char) -> bool {
    matches!(
        c,
        '\u{0600}'..='\u{06FF}'
            | '\u{0750}'..='\u{077F}'
            | '\u{08A0}'..='\u{08FF}'
            | '\u{FB50}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFF}'
    )
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Registration rules, checked in order; only the first failure is reported.
pub fn validate_registration(
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if email.trim().is_empty() || password.is_empty() || confirm_password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    if !is_valid_email(&normalize_email(email)) {
        return Err(ValidationError::InvalidEmail);
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}
