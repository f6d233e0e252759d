use serde::{Deserialize, Serialize};

use crate::error::{Result, TutordeskError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub degree: String,
    pub institution: String,
    pub year: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TutorProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub bio: String,
    pub accepting_students: bool,
    /// Display text, e.g. `$45`.
    pub hourly_rate: String,
    pub subjects: Vec<String>,
    pub education: Vec<Education>,
    pub years_experience: u32,
}

impl Default for TutorProfile {
    fn default() -> Self {
        Self {
            name: "Emma Wilson".into(),
            email: "emma.wilson@tutormail.com".into(),
            phone: "+1 (555) 123-4567".into(),
            location: "San Francisco, CA".into(),
            bio: "Passionate math and science tutor with 5+ years of experience teaching \
                  high school and college students. I specialize in making complex concepts \
                  simple and engaging."
                .into(),
            accepting_students: true,
            hourly_rate: "$45".into(),
            subjects: vec![
                "Calculus".into(),
                "Physics".into(),
                "Algebra".into(),
                "Statistics".into(),
            ],
            education: vec![
                Education {
                    degree: "M.S. in Mathematics".into(),
                    institution: "Stanford University".into(),
                    year: "2018".into(),
                },
                Education {
                    degree: "B.S. in Physics".into(),
                    institution: "UC Berkeley".into(),
                    year: "2016".into(),
                },
            ],
            years_experience: 5,
        }
    }
}

/// The editable subset of the profile form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub bio: String,
    #[serde(default)]
    pub accepting_students: bool,
    pub hourly_rate: String,
}

impl TutorProfile {
    pub fn apply(&mut self, update: ProfileUpdate) {
        self.name = update.name.trim().to_string();
        self.email = update.email.trim().to_string();
        self.phone = update.phone.trim().to_string();
        self.location = update.location.trim().to_string();
        self.bio = update.bio.trim().to_string();
        self.accepting_students = update.accepting_students;
        self.hourly_rate = update.hourly_rate.trim().to_string();
    }
}

fn require_min(field: &str, value: &str, min: usize) -> Result<()> {
    if value.trim().chars().count() < min {
        return Err(TutordeskError::InvalidInput(format!(
            "{field} must be at least {min} characters"
        )));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
        && !email.chars().any(char::is_whitespace)
}

/// Validate a profile before it is saved.
pub fn validate_profile(profile: &TutorProfile) -> Result<()> {
    require_min("name", &profile.name, 2)?;
    if !looks_like_email(profile.email.trim()) {
        return Err(TutordeskError::InvalidInput(
            "please enter a valid email address".into(),
        ));
    }
    require_min("phone", &profile.phone, 5)?;
    require_min("location", &profile.location, 2)?;
    require_min("bio", &profile.bio, 10)?;
    if profile.hourly_rate.trim().is_empty() {
        return Err(TutordeskError::InvalidInput(
            "please enter your hourly rate".into(),
        ));
    }
    Ok(())
}
