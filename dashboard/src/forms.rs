//! Editable policy and contact forms
//!
//! A form keeps the raw text the operator typed plus per-field validation
//! messages. Editing a field clears its message; [`PolicyFormState::validate`]
//! and [`ContactFormState::validate`] either produce the request body or
//! record and return every field error, so nothing reaches the network
//! until the input is valid.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use tour_desk_client::{CancellationPolicy, CancellationPolicyForm, Contact, ContactForm, PolicyStatus};

#[allow(clippy::expect_used)] // constant pattern
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Shortest accepted phone number after trimming
pub const MIN_PHONE_LEN: usize = 10;

/// Whether `email` has the `local@domain.tld` shape
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Whether `phone` is long enough once surrounding whitespace is removed
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    phone.trim().chars().count() >= MIN_PHONE_LEN
}

/// Parse a policy status case-insensitively
#[must_use]
pub fn parse_status(input: &str) -> Option<PolicyStatus> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("active") {
        Some(PolicyStatus::Active)
    } else if input.eq_ignore_ascii_case("inactive") {
        Some(PolicyStatus::Inactive)
    } else {
        None
    }
}

/// Field-keyed validation messages
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationErrors<F: Ord> {
    errors: BTreeMap<F, String>,
}

impl<F: Ord> Default for ValidationErrors<F> {
    fn default() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }
}

impl<F: Ord + Copy> ValidationErrors<F> {
    /// Message for `field`
    #[must_use]
    pub fn get(&self, field: F) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// No field failed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failed fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Failed fields and their messages, in field order
    pub fn iter(&self) -> impl Iterator<Item = (F, &str)> {
        self.errors.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn insert(&mut self, field: F, message: &str) {
        self.errors.insert(field, message.to_string());
    }

    fn clear(&mut self, field: F) {
        self.errors.remove(&field);
    }
}

impl<F: Ord + Copy> fmt::Display for ValidationErrors<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.iter().map(|(_, message)| message).collect();
        f.write_str(&messages.join("; "))
    }
}

impl<F: Ord + Copy + fmt::Debug> std::error::Error for ValidationErrors<F> {}

/// Fields of the cancellation policy form
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyField {
    /// ACTIVE / INACTIVE
    Status,
    /// Minutes before the tour starts
    CancellationBeforeMinutes,
}

/// Cancellation policy form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyFormState {
    status: String,
    minutes: String,
    errors: ValidationErrors<PolicyField>,
}

impl Default for PolicyFormState {
    fn default() -> Self {
        Self::from_policy(None)
    }
}

impl PolicyFormState {
    /// Form seeded from `policy`, or `ACTIVE` with empty minutes
    #[must_use]
    pub fn from_policy(policy: Option<&CancellationPolicy>) -> Self {
        let (status, minutes) = policy.map_or((PolicyStatus::Active, None), |p| {
            (p.status, p.cancellation_before_minutes)
        });
        Self {
            status: status.as_str().to_string(),
            minutes: minutes.map(|m| m.to_string()).unwrap_or_default(),
            errors: ValidationErrors::default(),
        }
    }

    /// Raw status text
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Raw minutes text
    #[must_use]
    pub fn minutes(&self) -> &str {
        &self.minutes
    }

    /// Messages recorded by the last failed validation
    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors<PolicyField> {
        &self.errors
    }

    /// Edit the status field
    pub fn set_status(&mut self, input: impl Into<String>) {
        self.status = input.into();
        self.errors.clear(PolicyField::Status);
    }

    /// Edit the minutes field
    pub fn set_minutes(&mut self, input: impl Into<String>) {
        self.minutes = input.into();
        self.errors.clear(PolicyField::CancellationBeforeMinutes);
    }

    /// Validate and build the request body
    ///
    /// # Errors
    ///
    /// Returns every field error; the same messages stay on the form until
    /// the offending field is edited.
    pub fn validate(&mut self) -> Result<CancellationPolicyForm, ValidationErrors<PolicyField>> {
        let mut errors = ValidationErrors::default();

        let status = parse_status(&self.status);
        if status.is_none() {
            errors.insert(PolicyField::Status, "Please choose ACTIVE or INACTIVE");
        }

        let minutes = self.minutes.trim();
        let cancellation_before_minutes = if minutes.is_empty() {
            None
        } else if let Ok(minutes) = minutes.parse::<u32>() {
            Some(minutes)
        } else {
            errors.insert(
                PolicyField::CancellationBeforeMinutes,
                "Please enter a whole number of minutes (0 or more)",
            );
            None
        };

        self.errors = errors.clone();
        match status {
            Some(status) if errors.is_empty() => Ok(CancellationPolicyForm {
                status,
                cancellation_before_minutes,
            }),
            _ => Err(errors),
        }
    }
}

/// Fields of the contact form
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContactField {
    /// Phone number
    Phone,
    /// Email address
    Email,
}

/// Contact information form
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactFormState {
    phone: String,
    email: String,
    errors: ValidationErrors<ContactField>,
}

impl ContactFormState {
    /// Form seeded from `contact`, or empty
    #[must_use]
    pub fn from_contact(contact: Option<&Contact>) -> Self {
        contact.map_or_else(Self::default, |c| Self {
            phone: c.phone.clone(),
            email: c.email.clone(),
            errors: ValidationErrors::default(),
        })
    }

    /// Raw phone text
    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Raw email text
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Messages recorded by the last failed validation
    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors<ContactField> {
        &self.errors
    }

    /// Edit the phone field
    pub fn set_phone(&mut self, input: impl Into<String>) {
        self.phone = input.into();
        self.errors.clear(ContactField::Phone);
    }

    /// Edit the email field
    pub fn set_email(&mut self, input: impl Into<String>) {
        self.email = input.into();
        self.errors.clear(ContactField::Email);
    }

    /// Validate and build the request body
    ///
    /// # Errors
    ///
    /// Returns every field error, also kept on the form.
    pub fn validate(&mut self) -> Result<ContactForm, ValidationErrors<ContactField>> {
        let mut errors = ValidationErrors::default();

        if self.email.trim().is_empty() {
            errors.insert(ContactField::Email, "Email is required");
        } else if !is_valid_email(&self.email) {
            errors.insert(ContactField::Email, "Please enter a valid email address");
        }

        if self.phone.trim().is_empty() {
            errors.insert(ContactField::Phone, "Phone number is required");
        } else if !is_valid_phone(&self.phone) {
            errors.insert(ContactField::Phone, "Please enter a valid phone number");
        }

        self.errors = errors.clone();
        if errors.is_empty() {
            Ok(ContactForm {
                phone: self.phone.clone(),
                email: self.email.clone(),
            })
        } else {
            Err(errors)
        }
    }
}
