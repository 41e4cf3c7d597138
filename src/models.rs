use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Closed set of entity kinds; each maps to one storage collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Teacher,
    Student,
    Subject,
    Lecture,
    Exam,
    Grade,
    NewsletterSubscriber,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::Teacher,
        Kind::Student,
        Kind::Subject,
        Kind::Lecture,
        Kind::Exam,
        Kind::Grade,
        Kind::NewsletterSubscriber,
    ];

    pub fn collection(self) -> &'static str {
        match self {
            Kind::Teacher => "teacher",
            Kind::Student => "student",
            Kind::Subject => "subject",
            Kind::Lecture => "lecture",
            Kind::Exam => "exam",
            Kind::Grade => "grade",
            Kind::NewsletterSubscriber => "newslettersubscriber",
        }
    }
}

/// A storable document type.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const KIND: Kind;
}

/// Shape checks a create request must pass before a record is built from it.
pub trait Validate {
    fn validate(&self) -> Result<(), Error>;
}

fn bounded(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), Error> {
    if value < min || value > max {
        return Err(Error::validation(
            field,
            format!("must be between {} and {}, got {}", min, max, value),
        ));
    }
    Ok(())
}

lazy_static! {
    static ref EMAIL: Regex = Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$"
    )
    .unwrap();
}

pub fn validate_email(field: &'static str, email: &str) -> Result<(), Error> {
    // The regex admits exactly one `@`, so the split only runs on a
    // well-formed address.
    let valid = email.len() <= 254
        && EMAIL.is_match(email)
        && email
            .split_once('@')
            .map_or(false, |(local, _)| local.len() <= 64);
    if !valid {
        return Err(Error::validation(
            field,
            format!("`{}` is not a valid email address", email),
        ));
    }
    Ok(())
}

/// A schedule time as the client sent it: RFC 3339 with an offset, or a
/// naive `YYYY-MM-DDTHH:MM:SS[.f]` local time. The text is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Timestamp {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let parses = DateTime::parse_from_rfc3339(&raw).is_ok()
            || NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            || NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f").is_ok();
        if !parses {
            return Err(format!("`{}` is not a valid datetime", raw));
        }
        Ok(Timestamp(raw))
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
}

impl Record for Teacher {
    const KIND: Kind = Kind::Teacher;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeacher {
    pub name: String,
    pub email: String,
    pub department: Option<String>,
}

impl Validate for CreateTeacher {
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl From<CreateTeacher> for Teacher {
    fn from(req: CreateTeacher) -> Self {
        Teacher {
            name: req.name,
            email: req.email,
            department: req.department,
            phone: None,
            avatar_url: None,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub roll_number: String,
    pub class_name: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub avatar_url: Option<String>,
    /// `active`, `graduated` or `inactive`; not enforced.
    pub status: String,
}

impl Record for Student {
    const KIND: Kind = Kind::Student;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudent {
    pub first_name: String,
    pub last_name: String,
    pub roll_number: String,
    pub email: Option<String>,
    pub class_name: Option<String>,
}

impl Validate for CreateStudent {
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl From<CreateStudent> for Student {
    fn from(req: CreateStudent) -> Self {
        Student {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            roll_number: req.roll_number,
            class_name: req.class_name,
            guardian_name: None,
            guardian_phone: None,
            avatar_url: None,
            status: "active".to_string(),
        }
    }
}

pub const DEFAULT_CREDITS: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub credits: i64,
}

impl Record for Subject {
    const KIND: Kind = Kind::Subject;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubject {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub credits: Option<i64>,
}

impl Validate for CreateSubject {
    fn validate(&self) -> Result<(), Error> {
        bounded("credits", self.credits.unwrap_or(DEFAULT_CREDITS), 0, 10)
    }
}

impl From<CreateSubject> for Subject {
    fn from(req: CreateSubject) -> Self {
        Subject {
            name: req.name,
            code: req.code,
            description: req.description,
            credits: req.credits.unwrap_or(DEFAULT_CREDITS),
        }
    }
}

pub const DEFAULT_DURATION_MINUTES: i64 = 45;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lecture {
    pub subject_code: String,
    pub topic: String,
    pub description: Option<String>,
    pub scheduled_at: Option<Timestamp>,
    pub teacher_email: Option<String>,
    pub duration_minutes: i64,
}

impl Record for Lecture {
    const KIND: Kind = Kind::Lecture;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLecture {
    pub subject_code: String,
    pub topic: String,
    pub description: Option<String>,
    pub scheduled_at: Option<Timestamp>,
    pub teacher_email: Option<String>,
    pub duration_minutes: Option<i64>,
}

impl Validate for CreateLecture {
    fn validate(&self) -> Result<(), Error> {
        bounded(
            "duration_minutes",
            self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
            10,
            300,
        )
    }
}

impl From<CreateLecture> for Lecture {
    fn from(req: CreateLecture) -> Self {
        Lecture {
            subject_code: req.subject_code,
            topic: req.topic,
            description: req.description,
            scheduled_at: req.scheduled_at,
            teacher_email: req.teacher_email,
            duration_minutes: req.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
        }
    }
}

pub const DEFAULT_TOTAL_MARKS: i64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub title: String,
    pub subject_code: String,
    pub scheduled_at: Option<Timestamp>,
    pub total_marks: i64,
}

impl Record for Exam {
    const KIND: Kind = Kind::Exam;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExam {
    pub title: String,
    pub subject_code: String,
    pub scheduled_at: Option<Timestamp>,
    pub total_marks: Option<i64>,
}

impl Validate for CreateExam {
    fn validate(&self) -> Result<(), Error> {
        bounded(
            "total_marks",
            self.total_marks.unwrap_or(DEFAULT_TOTAL_MARKS),
            1,
            1000,
        )
    }
}

impl From<CreateExam> for Exam {
    fn from(req: CreateExam) -> Self {
        Exam {
            title: req.title,
            subject_code: req.subject_code,
            scheduled_at: req.scheduled_at,
            total_marks: req.total_marks.unwrap_or(DEFAULT_TOTAL_MARKS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub roll_number: String,
    pub subject_code: String,
    pub exam_title: Option<String>,
    pub marks_obtained: f64,
    pub remarks: Option<String>,
}

impl Record for Grade {
    const KIND: Kind = Kind::Grade;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGrade {
    pub roll_number: String,
    pub subject_code: String,
    pub marks_obtained: f64,
    pub exam_title: Option<String>,
    pub remarks: Option<String>,
}

impl Validate for CreateGrade {
    fn validate(&self) -> Result<(), Error> {
        if self.marks_obtained < 0.0 {
            return Err(Error::validation(
                "marks_obtained",
                format!("must be at least 0, got {}", self.marks_obtained),
            ));
        }
        Ok(())
    }
}

impl From<CreateGrade> for Grade {
    fn from(req: CreateGrade) -> Self {
        Grade {
            roll_number: req.roll_number,
            subject_code: req.subject_code,
            exam_title: req.exam_title,
            marks_obtained: req.marks_obtained,
            remarks: req.remarks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsletterSubscriber {
    pub email: String,
    pub status: SubscriptionStatus,
    pub token: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Record for NewsletterSubscriber {
    const KIND: Kind = Kind::NewsletterSubscriber;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNewsletterSubscribe {
    pub email: String,
}

impl Validate for CreateNewsletterSubscribe {
    fn validate(&self) -> Result<(), Error> {
        validate_email("email", &self.email)
    }
}
