//! Four-step pandit registration.

use std::sync::Arc;

use anyhow::{Context, anyhow};
use regex::Regex;
use shubhkarya_shared::PanditSignupPayload;
use tracing::{info, instrument, warn};

use crate::api::BookingApi;

pub const NAME_REQUIRED: &str = "Name is required.";
pub const INVALID_PHONE: &str = "Enter valid 10-digit phone.";
pub const INVALID_EMAIL: &str = "Enter valid email.";
pub const PASSWORD_LENGTH: &str = "Password must be exactly 8 characters.";
pub const CONFIRM_PASSWORD: &str = "Please confirm your password.";
pub const PASSWORD_MISMATCH: &str = "Password and confirm password must match.";
pub const CITY_REQUIRED: &str = "City is required.";
pub const EXPERIENCE_REQUIRED: &str = "Experience is required.";
pub const SIGNUP_FAILED: &str = "Something went wrong";
pub const SIGNUP_DONE: &str =
    "Pandit registered successfully. Please wait for admin verification.";

const PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignupStep {
    Contact = 1,
    Password = 2,
    Practice = 3,
    Profile = 4,
}

impl SignupStep {
    pub fn number(self) -> u8 {
        self as u8
    }

    fn next(self) -> Self {
        match self {
            Self::Contact => Self::Password,
            Self::Password => Self::Practice,
            Self::Practice | Self::Profile => Self::Profile,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Contact | Self::Password => Self::Contact,
            Self::Practice => Self::Password,
            Self::Profile => Self::Practice,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub city: String,
    pub experience_years: String,
    /// Comma separated.
    pub languages: String,
    /// Comma separated.
    pub specialties: String,
    pub bio: String,
    pub profile_photo_url: String,
}

impl SignupForm {
    pub fn to_payload(&self) -> PanditSignupPayload {
        PanditSignupPayload {
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            city: self.city.clone(),
            experience_years: self.experience_years.clone(),
            languages: split_list(&self.languages),
            specialties: split_list(&self.specialties),
            bio: self.bio.clone(),
            profile_photo_url: self.profile_photo_url.clone(),
        }
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct PanditSignup {
    api: Arc<dyn BookingApi>,
    phone_re: Regex,
    email_re: Regex,
    step: SignupStep,
    error: Option<String>,
    pub form: SignupForm,
}

impl PanditSignup {
    pub fn new(api: Arc<dyn BookingApi>) -> anyhow::Result<Self> {
        let phone_re = Regex::new(r"^[6-9]\d{9}$")
            .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
        let email_re = Regex::new(r"^\S+@\S+\.\S+$")
            .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
        Ok(Self {
            api,
            phone_re,
            email_re,
            step: SignupStep::Contact,
            error: None,
            form: SignupForm::default(),
        })
    }

    pub fn step(&self) -> SignupStep {
        self.step
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// First failing rule of the current step.
    pub fn validate_step(&self) -> Option<&'static str> {
        let form = &self.form;
        match self.step {
            SignupStep::Contact => {
                if form.name.trim().is_empty() {
                    Some(NAME_REQUIRED)
                } else if !self.phone_re.is_match(&form.phone) {
                    Some(INVALID_PHONE)
                } else if !self.email_re.is_match(&form.email) {
                    Some(INVALID_EMAIL)
                } else {
                    None
                }
            }
            SignupStep::Password => {
                if form.password.chars().count() != PASSWORD_CHARS {
                    Some(PASSWORD_LENGTH)
                } else if form.confirm_password.is_empty() {
                    Some(CONFIRM_PASSWORD)
                } else if form.password != form.confirm_password {
                    Some(PASSWORD_MISMATCH)
                } else {
                    None
                }
            }
            SignupStep::Practice => {
                if form.city.trim().is_empty() {
                    Some(CITY_REQUIRED)
                } else if form.experience_years.is_empty() {
                    Some(EXPERIENCE_REQUIRED)
                } else {
                    None
                }
            }
            SignupStep::Profile => None,
        }
    }

    /// Advances when the current step validates, otherwise records why not.
    pub fn next_step(&mut self) -> bool {
        if let Some(message) = self.validate_step() {
            self.error = Some(message.to_string());
            return false;
        }
        self.error = None;
        self.step = self.step.next();
        true
    }

    pub fn prev_step(&mut self) {
        self.error = None;
        self.step = self.step.prev();
    }

    /// Walks every step from the start; stops on the first step that fails.
    pub fn validate_all(&mut self) -> bool {
        self.step = SignupStep::Contact;
        while self.step < SignupStep::Profile {
            if !self.next_step() {
                return false;
            }
        }
        true
    }

    #[instrument(skip(self), fields(email = %self.form.email))]
    pub async fn submit(&mut self) -> anyhow::Result<()> {
        if !self.validate_all() {
            let reason = self.error.clone().unwrap_or_default();
            return Err(anyhow!(reason)).context("signup form is incomplete");
        }

        let payload = self.form.to_payload();
        match self.api.signup_pandit(&payload).await {
            Ok(()) => {
                info!("pandit registered");
                self.error = None;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "signup failed");
                let message = err.user_message(SIGNUP_FAILED);
                self.error = Some(message.clone());
                Err(anyhow!(message))
            }
        }
    }
}
