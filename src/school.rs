use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::document::{filter, serialize_docs, Document};
use crate::models::{
    CreateExam, CreateGrade, CreateLecture, CreateStudent, CreateSubject, CreateTeacher, Exam,
    Grade, Lecture, Record, Student, Subject, Teacher, Validate,
};
use crate::store::Store;
use crate::{proceeds, Error, Payload};

#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub id: String,
}

async fn create<C, R>(
    store: &Store,
    payload: Result<Json<C>, JsonRejection>,
) -> Payload<Created>
where
    C: Validate,
    R: Record + From<C>,
{
    let Json(request) = payload?;
    request.validate()?;
    let record = R::from(request);
    proceeds(Created {
        id: store.create(&record).await?,
    })
}

async fn list<R: Record>(store: &Store, filter: Document) -> Payload<Vec<Document>> {
    let docs = store.list::<R>(&filter).await?;
    proceeds(serialize_docs(docs))
}

pub async fn create_teacher(
    Extension(store): Extension<Store>,
    payload: Result<Json<CreateTeacher>, JsonRejection>,
) -> Payload<Created> {
    create::<_, Teacher>(&store, payload).await
}

pub async fn list_teachers(Extension(store): Extension<Store>) -> Payload<Vec<Document>> {
    list::<Teacher>(&store, Document::new()).await
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentQuery {
    pub class_name: Option<String>,
}

pub async fn create_student(
    Extension(store): Extension<Store>,
    payload: Result<Json<CreateStudent>, JsonRejection>,
) -> Payload<Created> {
    create::<_, Student>(&store, payload).await
}

pub async fn list_students(
    Extension(store): Extension<Store>,
    query: Result<Query<StudentQuery>, QueryRejection>,
) -> Payload<Vec<Document>> {
    let Query(query) = query?;
    list::<Student>(&store, filter([("class_name", query.class_name.as_deref())])).await
}

pub async fn create_subject(
    Extension(store): Extension<Store>,
    payload: Result<Json<CreateSubject>, JsonRejection>,
) -> Payload<Created> {
    create::<_, Subject>(&store, payload).await
}

pub async fn list_subjects(Extension(store): Extension<Store>) -> Payload<Vec<Document>> {
    list::<Subject>(&store, Document::new()).await
}

/// Filter shared by the lecture and exam listings.
#[derive(Debug, Default, Deserialize)]
pub struct SubjectQuery {
    pub subject_code: Option<String>,
}

impl SubjectQuery {
    fn filter(&self) -> Document {
        filter([("subject_code", self.subject_code.as_deref())])
    }
}

pub async fn create_lecture(
    Extension(store): Extension<Store>,
    payload: Result<Json<CreateLecture>, JsonRejection>,
) -> Payload<Created> {
    create::<_, Lecture>(&store, payload).await
}

pub async fn list_lectures(
    Extension(store): Extension<Store>,
    query: Result<Query<SubjectQuery>, QueryRejection>,
) -> Payload<Vec<Document>> {
    let Query(query) = query?;
    list::<Lecture>(&store, query.filter()).await
}

pub async fn create_exam(
    Extension(store): Extension<Store>,
    payload: Result<Json<CreateExam>, JsonRejection>,
) -> Payload<Created> {
    create::<_, Exam>(&store, payload).await
}

pub async fn list_exams(
    Extension(store): Extension<Store>,
    query: Result<Query<SubjectQuery>, QueryRejection>,
) -> Payload<Vec<Document>> {
    let Query(query) = query?;
    list::<Exam>(&store, query.filter()).await
}

#[derive(Debug, Default, Deserialize)]
pub struct GradeQuery {
    pub roll_number: Option<String>,
    pub subject_code: Option<String>,
}

pub async fn create_grade(
    Extension(store): Extension<Store>,
    payload: Result<Json<CreateGrade>, JsonRejection>,
) -> Payload<Created> {
    create::<_, Grade>(&store, payload).await
}

pub async fn list_grades(
    Extension(store): Extension<Store>,
    query: Result<Query<GradeQuery>, QueryRejection>,
) -> Payload<Vec<Document>> {
    let Query(query) = query?;
    list::<Grade>(
        &store,
        filter([
            ("roll_number", query.roll_number.as_deref()),
            ("subject_code", query.subject_code.as_deref()),
        ]),
    )
    .await
}
