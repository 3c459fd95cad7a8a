//! Application layer: ties face input, the state file, and the core together.

use crate::auth::Credential;
use crate::config::Config;
use crate::store::{Account, StateFile, StoreError};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vd_core::catalog::{self, StatusTitle};
use vd_core::{
    Analysis, AnalysisError, Category, FaceLandmarks, Login, Milestone, ProfileError,
    ProfileStore, Registration, StreakBook, StreakError, UserProfile,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Streak(#[from] StreakError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("already signed in as {0}; log out first")]
    AlreadySignedIn(String),
    #[error("an account already exists for {0}")]
    EmailInUse(String),
    #[error("faces file {path}: {source}")]
    FacesRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("faces file {path} is not valid face JSON: {source}")]
    FacesParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Face detector output: one face record or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FacesInput {
    Many(Vec<FaceLandmarks>),
    One(FaceLandmarks),
}

/// Read detector output from a JSON file.
pub fn read_faces(path: &Path) -> Result<Vec<FaceLandmarks>, AppError> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::FacesRead {
        path: path.to_path_buf(),
        source,
    })?;
    let input: FacesInput = serde_json::from_str(&text).map_err(|source| AppError::FacesParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match input {
        FacesInput::Many(faces) => faces,
        FacesInput::One(face) => vec![face],
    })
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub analysis: Analysis,
    pub title: Option<StatusTitle>,
    pub share_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckInReport {
    pub category: Category,
    pub count: u32,
    pub advanced: bool,
    pub newly_achieved: Vec<Milestone>,
    pub progress: f32,
    pub progress_message: String,
}

#[derive(Debug, Serialize)]
pub struct TrackSummary {
    pub category: Category,
    pub count: u32,
    pub last_check_in: Option<NaiveDate>,
    pub progress: f32,
    pub progress_message: String,
    pub milestones: Vec<Milestone>,
    /// Rewards already earned on this track.
    pub achieved: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FactReport {
    pub category: Category,
    pub fact: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct LogoutReport {
    pub logged_out: String,
}

pub struct App {
    config: Config,
    store: StateFile,
    rng: StdRng,
    today: NaiveDate,
}

impl App {
    pub fn new(config: Config, today: NaiveDate) -> Result<Self, AppError> {
        let store = StateFile::open(&config.state_path)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        tracing::debug!(
            state = %store.path().display(),
            seeded = config.seed.is_some(),
            %today,
            "app initialised"
        );
        Ok(Self {
            config,
            store,
            rng,
            today,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Estimate age and draw a verdict for the first detected face.
    pub fn analyze(&mut self, faces: &[FaceLandmarks]) -> Result<AnalysisReport, AppError> {
        let analysis = vd_core::analyze(faces, &mut self.rng)?;
        let title = catalog::catalog().pick_status(&mut self.rng).cloned();
        let share_message = title.as_ref().map(StatusTitle::share_message);
        tracing::info!(
            age = analysis.age,
            is_virgin = analysis.verdict.is_virgin,
            "photo analysed"
        );
        Ok(AnalysisReport {
            analysis,
            title,
            share_message,
        })
    }

    /// Wall-clock time, or midnight UTC of `today` when the date is overridden.
    fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        if now.with_timezone(&Local).date_naive() == self.today {
            now
        } else {
            Utc.from_utc_datetime(&self.today.and_time(NaiveTime::MIN))
        }
    }

    /// The signed-in account with its virgin streak seeded from the birth date.
    fn seeded_account(&mut self) -> Result<&mut Account, AppError> {
        let today = self.today;
        let account = self.store.account_mut()?;
        let dob = account.profile.date_of_birth;
        account.streaks.seed_from_birth(dob, today);
        Ok(account)
    }

    /// Daily check-in: the photo must contain at least one face.
    pub fn check_in(&mut self, category: Category, faces: &[FaceLandmarks]) -> Result<CheckInReport, AppError> {
        if faces.is_empty() {
            return Err(AnalysisError::NoFaceDetected.into());
        }
        let today = self.today;
        let account = self.seeded_account()?;
        let advance = account.streaks.check_in(category, today)?;
        account.profile.record_streak(&advance.state);

        for m in &advance.newly_achieved {
            tracing::info!(%category, reward = %m.reward, days = m.threshold_days, "milestone achieved");
        }
        if !advance.advanced {
            tracing::info!(%category, "already checked in today");
        }

        let book = &account.streaks;
        let report = CheckInReport {
            category,
            count: advance.state.count,
            advanced: advance.advanced,
            newly_achieved: advance.newly_achieved,
            progress: book.progress(category),
            progress_message: book.progress_message(category),
        };
        self.store.persist()?;
        Ok(report)
    }

    /// Reset a streak to zero; returns the days survived.
    pub fn reset(&mut self, category: Category) -> Result<u32, AppError> {
        let account = self.store.account_mut()?;
        let survived = account.streaks.reset(category);
        account
            .profile
            .record_streak(&account.streaks.track(category).state);
        self.store.persist()?;
        Ok(survived)
    }

    /// Current state of every streak track.
    pub fn streaks(&mut self) -> Result<Vec<TrackSummary>, AppError> {
        let seeded_before = self.store.account_mut()?.streaks.birth_seeded;
        let book: StreakBook = self.seeded_account()?.streaks.clone();
        if !seeded_before {
            self.store.persist()?;
        }
        Ok(Category::ALL
            .iter()
            .map(|&category| {
                let track = book.track(category);
                TrackSummary {
                    category,
                    count: track.state.count,
                    last_check_in: track.state.last_check_in,
                    progress: book.progress(category),
                    progress_message: book.progress_message(category),
                    milestones: track.milestones.clone(),
                    achieved: track.achieved().map(|m| m.reward.clone()).collect(),
                }
            })
            .collect())
    }

    pub fn daily_fact(&mut self, category: Category) -> FactReport {
        FactReport {
            category,
            fact: catalog::catalog().daily_fact(category, &mut self.rng),
        }
    }

    fn ensure_signed_out(&self) -> Result<(), AppError> {
        match self.store.load()? {
            Some(existing) => Err(AppError::AlreadySignedIn(existing.email)),
            None => Ok(()),
        }
    }

    pub fn register(&mut self, registration: Registration) -> Result<UserProfile, AppError> {
        self.ensure_signed_out()?;
        let password = registration.password.clone();
        let profile = registration.into_profile(self.now(), self.config.min_age)?;
        if self.store.state.accounts.contains_key(&profile.email) {
            return Err(AppError::EmailInUse(profile.email));
        }
        self.store.open_account(Account {
            credential: Credential::new(&password, &mut self.rng),
            profile: profile.clone(),
            streaks: StreakBook::default(),
        })?;
        tracing::info!(email = %profile.email, "registered");
        Ok(profile)
    }

    /// Sign in to an existing account and restore its record.
    pub fn login(&mut self, login: Login) -> Result<UserProfile, AppError> {
        self.ensure_signed_out()?;
        login.validate()?;
        let email = login.email();
        let verified = self
            .store
            .state
            .accounts
            .get(email)
            .is_some_and(|a| a.credential.verify(&login.password));
        if !verified {
            tracing::warn!(%email, "login rejected");
            return Err(ProfileError::InvalidCredentials.into());
        }
        self.store.sign_in(email)?;
        tracing::info!(%email, "logged in");
        Ok(self.store.require()?)
    }

    pub fn profile(&self) -> Result<UserProfile, AppError> {
        Ok(self.store.require()?)
    }

    pub fn set_date_of_birth(&mut self, date_of_birth: NaiveDate) -> Result<UserProfile, AppError> {
        let mut profile = self.store.require()?;
        profile.update_date_of_birth(date_of_birth, self.today, self.config.min_age)?;
        self.store.save(&profile)?;
        tracing::info!(%date_of_birth, "date of birth updated");
        Ok(profile)
    }

    /// End the session; the account record stays stored.
    pub fn logout(&mut self) -> Result<LogoutReport, AppError> {
        let profile = self.store.require()?;
        self.store.clear()?;
        tracing::info!(email = %profile.email, "logged out");
        Ok(LogoutReport {
            logged_out: profile.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vd_core::{BoundingBox, Point};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn app_at(dir: &tempfile::TempDir, today: &str) -> App {
        let config = Config {
            state_path: dir.path().join("state.json"),
            seed: Some(17),
            min_age: 13,
        };
        App::new(config, date(today)).unwrap()
    }

    fn face() -> FaceLandmarks {
        FaceLandmarks {
            bounding_box: Some(BoundingBox { width: 200.0, height: 240.0 }),
            left_eye: Some(Point::new(70.0, 100.0)),
            right_eye: Some(Point::new(130.0, 100.0)),
            nose_base: Some(Point::new(100.0, 150.0)),
            ..Default::default()
        }
    }

    fn registration(dob: &str) -> Registration {
        Registration {
            email: "tester@example.com".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
            date_of_birth: date(dob),
            accepted_terms: true,
        }
    }

    #[test]
    fn test_read_faces_single_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.json");
        std::fs::write(&one, serde_json::to_string(&face()).unwrap()).unwrap();
        assert_eq!(read_faces(&one).unwrap().len(), 1);

        let many = dir.path().join("many.json");
        std::fs::write(&many, serde_json::to_string(&vec![face(), face()]).unwrap()).unwrap();
        assert_eq!(read_faces(&many).unwrap().len(), 2);

        let none = dir.path().join("none.json");
        std::fs::write(&none, "[]").unwrap();
        assert!(read_faces(&none).unwrap().is_empty());

        assert!(matches!(
            read_faces(&dir.path().join("missing.json")),
            Err(AppError::FacesRead { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ nope").unwrap();
        let err = read_faces(&bad).unwrap_err();
        assert!(matches!(err, AppError::FacesParse { .. }));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<serde_json::Error>().is_some());
    }

    #[test]
    fn test_analyze_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_at(&dir, "2024-03-01");
        let report = app.analyze(&[face()]).unwrap();
        assert!((8..=40).contains(&report.analysis.age));
        assert!(report.title.is_some());
        assert!(report.share_message.unwrap().contains("Virgin Detector"));
        assert!(matches!(
            app.analyze(&[]),
            Err(AppError::Analysis(AnalysisError::NoFaceDetected))
        ));
    }

    #[test]
    fn test_streaks_need_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_at(&dir, "2024-03-01");
        for category in Category::ALL {
            assert!(matches!(
                app.check_in(category, &[face()]),
                Err(AppError::Profile(ProfileError::NotSignedIn))
            ));
        }
        assert!(app.streaks().is_err());
        assert!(app.reset(Category::NoFap).is_err());
    }

    #[test]
    fn test_check_in_flow_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut app = app_at(&dir, "2024-03-01");
            app.register(registration("2024-02-20")).unwrap_err();
            app.register(registration("2000-01-01")).unwrap();

            let report = app.check_in(Category::Virgin, &[face()]).unwrap();
            // 2000-01-01 → 2024-03-01 is 8826 days, plus today's check-in.
            assert_eq!(report.count, 8827);
            let rewards: Vec<_> = report.newly_achieved.iter().map(|m| m.reward.as_str()).collect();
            assert_eq!(
                rewards,
                vec!["Bronze Virgin Badge", "Silver Virgin Badge", "Golden Virgin Badge"]
            );

            let report = app.check_in(Category::NoFap, &[face()]).unwrap();
            assert_eq!(report.count, 1);
            assert_eq!(report.progress_message, "0% to Legendary NoFap Status");
        }
        {
            let mut app = app_at(&dir, "2024-03-01");
            let again = app.check_in(Category::NoFap, &[face()]).unwrap();
            assert!(!again.advanced);
            assert_eq!(again.count, 1);
            let profile = app.profile().unwrap();
            assert_eq!(profile.streak_count, 1);
            assert_eq!(profile.last_check_in, Some(date("2024-03-01")));
        }
        {
            let mut app = app_at(&dir, "2024-03-02");
            assert_eq!(app.check_in(Category::NoFap, &[face()]).unwrap().count, 2);
            assert_eq!(app.reset(Category::NoFap).unwrap(), 2);
            let summary = app.streaks().unwrap();
            assert_eq!(summary[1].count, 0);
            assert_eq!(
                summary[0].achieved,
                vec!["Bronze Virgin Badge", "Silver Virgin Badge", "Golden Virgin Badge"]
            );
            assert!(summary[1].achieved.is_empty());
            assert_eq!(app.profile().unwrap().streak_count, 0);
        }
    }

    #[test]
    fn test_check_in_without_face() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_at(&dir, "2024-03-01");
        assert!(matches!(
            app.check_in(Category::NoFap, &[]),
            Err(AppError::Analysis(AnalysisError::NoFaceDetected))
        ));
    }

    #[test]
    fn test_account_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_at(&dir, "2024-03-01");
        assert!(matches!(app.profile(), Err(AppError::Profile(ProfileError::NotSignedIn))));

        app.register(registration("1999-05-05")).unwrap();
        assert!(matches!(
            app.register(registration("1999-05-05")),
            Err(AppError::AlreadySignedIn(_))
        ));

        let updated = app.set_date_of_birth(date("1998-01-01")).unwrap();
        assert_eq!(updated.date_of_birth, date("1998-01-01"));
        assert!(app.set_date_of_birth(date("2020-01-01")).is_err());

        assert_eq!(app.logout().unwrap().logged_out, "tester@example.com");
        assert!(app.profile().is_err());
        assert!(app.logout().is_err());
        assert!(matches!(
            app.register(registration("1999-05-05")),
            Err(AppError::EmailInUse(_))
        ));
    }

    fn login(password: &str) -> Login {
        Login {
            email: "tester@example.com".into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_logout_then_login_restores_streaks() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut app = app_at(&dir, "2024-03-01");
            app.register(registration("2000-01-01")).unwrap();
            app.check_in(Category::NoFap, &[face()]).unwrap();
            app.check_in(Category::Virgin, &[face()]).unwrap();
            app.logout().unwrap();
        }
        let mut app = app_at(&dir, "2024-03-02");
        assert!(app.profile().is_err());
        assert!(matches!(
            app.check_in(Category::NoFap, &[face()]),
            Err(AppError::Profile(ProfileError::NotSignedIn))
        ));

        let profile = app.login(login("secret")).unwrap();
        assert_eq!(profile.streak_count, 1);
        assert_eq!(profile.last_check_in, Some(date("2024-03-01")));

        let summary = app.streaks().unwrap();
        assert_eq!(summary[0].count, 8827);
        assert_eq!(summary[0].achieved.len(), 3);
        assert_eq!(summary[1].count, 1);
        assert_eq!(app.check_in(Category::NoFap, &[face()]).unwrap().count, 2);
    }

    #[test]
    fn test_login_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_at(&dir, "2024-03-01");
        assert!(matches!(
            app.login(login("secret")),
            Err(AppError::Profile(ProfileError::InvalidCredentials))
        ));

        app.register(registration("2000-01-01")).unwrap();
        assert!(matches!(
            app.login(login("secret")),
            Err(AppError::AlreadySignedIn(_))
        ));
        app.logout().unwrap();

        assert!(matches!(
            app.login(login("")),
            Err(AppError::Profile(ProfileError::MissingField("password")))
        ));
        assert!(matches!(
            app.login(Login { email: " ".into(), password: "secret".into() }),
            Err(AppError::Profile(ProfileError::MissingField("email")))
        ));
        assert!(matches!(
            app.login(login("wrong")),
            Err(AppError::Profile(ProfileError::InvalidCredentials))
        ));
        assert!(app.profile().is_err());
        assert!(app.login(login("secret")).is_ok());
    }

    #[test]
    fn test_register_uses_overridden_today() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_at(&dir, "2024-03-01");
        // 2024 - 2012 = 12, under age on the overridden date.
        assert!(matches!(
            app.register(registration("2012-01-01")),
            Err(AppError::Profile(ProfileError::Underage { min_age: 13 }))
        ));
        let profile = app.register(registration("2011-01-01")).unwrap();
        assert_eq!(profile.created_at.date_naive(), date("2024-03-01"));
    }

    #[test]
    fn test_daily_fact() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_at(&dir, "2024-03-01");
        let report = app.daily_fact(Category::NoFap);
        assert!(report.fact.is_some());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["category"], "nofap");
        assert_eq!(json["fact"], report.fact.unwrap());
    }

    #[test]
    fn test_logout_report_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_at(&dir, "2024-03-01");
        app.register(registration("2000-01-01")).unwrap();
        let json = serde_json::to_value(app.logout().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({ "logged_out": "tester@example.com" }));
    }
}
