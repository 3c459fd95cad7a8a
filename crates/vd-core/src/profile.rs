//! User profile record and registration rules.
//!
//! The record shape matches what the external account service stores per
//! user. Passwords are only checked for presence and confirmation here; they
//! are never stored.

use crate::streak::StreakState;
use crate::types::Category;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Youngest age (by calendar-year difference) allowed to register.
pub const MIN_REGISTRATION_AGE: i32 = 13;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("please fill in all fields (missing {0})")]
    MissingField(&'static str),
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("please accept the terms and conditions")]
    TermsNotAccepted,
    #[error("you must be at least {min_age} years old")]
    Underage { min_age: i32 },
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no authenticated user")]
    NotSignedIn,
    #[error("profile store: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Stored per-user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Last nofap check-in; the virgin streak is derived from the birth date.
    #[serde(default)]
    pub last_check_in: Option<NaiveDate>,
    #[serde(default)]
    pub streak_count: u32,
}

/// Sign-up form contents.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub date_of_birth: NaiveDate,
    pub accepted_terms: bool,
}

/// Sign-in form contents.
#[derive(Debug, Clone)]
pub struct Login {
    pub email: String,
    pub password: String,
}

impl Login {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.email.trim().is_empty() {
            return Err(ProfileError::MissingField("email"));
        }
        if self.password.is_empty() {
            return Err(ProfileError::MissingField("password"));
        }
        Ok(())
    }

    /// Email as stored on the account record.
    pub fn email(&self) -> &str {
        self.email.trim()
    }
}

/// Age as the difference of calendar years, ignoring month and day.
pub fn year_difference(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    today.year() - date_of_birth.year()
}

fn check_age(date_of_birth: NaiveDate, today: NaiveDate, min_age: i32) -> Result<(), ProfileError> {
    if year_difference(date_of_birth, today) < min_age {
        return Err(ProfileError::Underage { min_age });
    }
    Ok(())
}

impl Registration {
    /// Validate the form in the order the sign-up screen reports problems.
    pub fn validate(&self, today: NaiveDate, min_age: i32) -> Result<(), ProfileError> {
        if self.email.trim().is_empty() {
            return Err(ProfileError::MissingField("email"));
        }
        if self.password.is_empty() {
            return Err(ProfileError::MissingField("password"));
        }
        if self.confirm_password.is_empty() {
            return Err(ProfileError::MissingField("confirm password"));
        }
        if self.password != self.confirm_password {
            return Err(ProfileError::PasswordMismatch);
        }
        if !self.accepted_terms {
            return Err(ProfileError::TermsNotAccepted);
        }
        check_age(self.date_of_birth, today, min_age)
    }

    /// Validate and build the initial stored record.
    pub fn into_profile(self, now: DateTime<Utc>, min_age: i32) -> Result<UserProfile, ProfileError> {
        self.validate(now.date_naive(), min_age)?;
        Ok(UserProfile {
            email: self.email.trim().to_string(),
            date_of_birth: self.date_of_birth,
            created_at: now,
            last_check_in: None,
            streak_count: 0,
        })
    }
}

impl UserProfile {
    /// Change the birth date, applying the registration age rule.
    pub fn update_date_of_birth(
        &mut self,
        date_of_birth: NaiveDate,
        today: NaiveDate,
        min_age: i32,
    ) -> Result<(), ProfileError> {
        check_age(date_of_birth, today, min_age)?;
        self.date_of_birth = date_of_birth;
        Ok(())
    }

    /// Mirror a nofap streak into the record. Returns whether anything changed.
    pub fn record_streak(&mut self, state: &StreakState) -> bool {
        if state.category != Category::NoFap {
            return false;
        }
        let changed = self.streak_count != state.count || self.last_check_in != state.last_check_in;
        self.streak_count = state.count;
        self.last_check_in = state.last_check_in;
        changed
    }
}

/// Read/write contract of the external authenticated storage.
pub trait ProfileStore {
    fn load(&self) -> Result<Option<UserProfile>, ProfileError>;
    fn save(&mut self, profile: &UserProfile) -> Result<(), ProfileError>;
    /// Sign out. Whether the record itself survives is up to the store.
    fn clear(&mut self) -> Result<(), ProfileError>;

    /// Load the signed-in profile, failing when nobody is signed in.
    fn require(&self) -> Result<UserProfile, ProfileError> {
        self.load()?.ok_or(ProfileError::NotSignedIn)
    }
}

/// Process-local store, for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profile: Option<UserProfile>,
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> Result<Option<UserProfile>, ProfileError> {
        Ok(self.profile.clone())
    }

    fn save(&mut self, profile: &UserProfile) -> Result<(), ProfileError> {
        self.profile = Some(profile.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ProfileError> {
        self.profile = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn form() -> Registration {
        Registration {
            email: " user@example.com ".into(),
            password: "hunter22".into(),
            confirm_password: "hunter22".into(),
            date_of_birth: date("2000-06-15"),
            accepted_terms: true,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_registration_builds_profile() {
        let profile = form().into_profile(now(), MIN_REGISTRATION_AGE).unwrap();
        assert_eq!(profile.email, "user@example.com");
        assert_eq!(profile.date_of_birth, date("2000-06-15"));
        assert_eq!(profile.created_at, now());
        assert_eq!(profile.streak_count, 0);
        assert_eq!(profile.last_check_in, None);
    }

    #[test]
    fn test_registration_errors() {
        let today = date("2024-03-01");

        let mut f = form();
        f.email = "  ".into();
        assert!(matches!(f.validate(today, 13), Err(ProfileError::MissingField("email"))));

        let mut f = form();
        f.confirm_password = "other".into();
        assert!(matches!(f.validate(today, 13), Err(ProfileError::PasswordMismatch)));

        let mut f = form();
        f.accepted_terms = false;
        assert!(matches!(f.validate(today, 13), Err(ProfileError::TermsNotAccepted)));

        let mut f = form();
        f.date_of_birth = date("2012-01-01");
        assert!(matches!(
            f.validate(today, 13),
            Err(ProfileError::Underage { min_age: 13 })
        ));
    }

    #[test]
    fn test_login_requires_all_fields() {
        let login = |email: &str, password: &str| Login {
            email: email.into(),
            password: password.into(),
        };
        assert!(matches!(
            login(" ", "pw").validate(),
            Err(ProfileError::MissingField("email"))
        ));
        assert!(matches!(
            login("a@b.c", "").validate(),
            Err(ProfileError::MissingField("password"))
        ));
        let ok = login(" a@b.c ", "pw");
        assert!(ok.validate().is_ok());
        assert_eq!(ok.email(), "a@b.c");
    }

    #[test]
    fn test_store_error_keeps_source() {
        use std::error::Error as _;
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = ProfileError::Store(Box::new(io));
        assert_eq!(err.to_string(), "profile store: read-only");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_age_uses_calendar_years() {
        // Born late December 2011: 13 by year difference on 2024-01-01.
        assert_eq!(year_difference(date("2011-12-31"), date("2024-01-01")), 13);
        let mut f = form();
        f.date_of_birth = date("2011-12-31");
        assert!(f.validate(date("2024-01-01"), 13).is_ok());
    }

    #[test]
    fn test_update_date_of_birth() {
        let mut profile = form().into_profile(now(), 13).unwrap();
        assert!(profile
            .update_date_of_birth(date("2020-01-01"), date("2024-03-01"), 13)
            .is_err());
        assert_eq!(profile.date_of_birth, date("2000-06-15"));
        profile
            .update_date_of_birth(date("1999-02-02"), date("2024-03-01"), 13)
            .unwrap();
        assert_eq!(profile.date_of_birth, date("1999-02-02"));
    }

    #[test]
    fn test_record_streak_only_nofap() {
        let mut profile = form().into_profile(now(), 13).unwrap();
        let virgin = StreakState {
            category: Category::Virgin,
            count: 9000,
            last_check_in: Some(date("2024-03-01")),
        };
        assert!(!profile.record_streak(&virgin));
        assert_eq!(profile.streak_count, 0);

        let nofap = StreakState {
            category: Category::NoFap,
            count: 3,
            last_check_in: Some(date("2024-03-01")),
        };
        assert!(profile.record_streak(&nofap));
        assert!(!profile.record_streak(&nofap));
        assert_eq!(profile.streak_count, 3);
        assert_eq!(profile.last_check_in, Some(date("2024-03-01")));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryProfileStore::default();
        assert!(matches!(store.require(), Err(ProfileError::NotSignedIn)));
        let profile = form().into_profile(now(), 13).unwrap();
        store.save(&profile).unwrap();
        assert_eq!(store.require().unwrap(), profile);
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_profile_json_shape() {
        let profile = form().into_profile(now(), 13).unwrap();
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["email"], "user@example.com");
        assert_eq!(json["date_of_birth"], "2000-06-15");
        assert_eq!(json["streak_count"], 0);
    }
}
