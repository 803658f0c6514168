use std::ops::{Deref, DerefMut};

use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, STUDENT_LOGIN_FAILED};
use crate::model::mongodb::{is_duplicate_key_error, Coll, Id};

/// Core student data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentCore {
    pub student_number: String,
    /// Set exactly once, by the transaction that records the student's vote.
    pub voted: bool,
}

impl StudentCore {
    /// A student who has not voted yet.
    pub fn new(student_number: impl Into<String>) -> Self {
        Self {
            student_number: student_number.into(),
            voted: false,
        }
    }
}

/// A student without an ID.
pub type NewStudent = StudentCore;

/// A student from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub student: StudentCore,
}

impl Student {
    /// Find the student with the given number, provided they have not voted yet.
    ///
    /// Unknown students and students who already voted fail identically.
    pub async fn authenticate(students: &Coll<Student>, student_number: &str) -> Result<Self> {
        let filter = doc! {
            "student_number": student_number,
            "voted": false,
        };
        students
            .find_one(filter, None)
            .await?
            .ok_or(Error::InvalidCredentials(STUDENT_LOGIN_FAILED))
    }
}

impl Deref for Student {
    type Target = StudentCore;

    fn deref(&self) -> &Self::Target {
        &self.student
    }
}

impl DerefMut for Student {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.student
    }
}

/// Register the given student numbers, skipping blanks and numbers that are
/// already registered. Returns how many students were created.
pub async fn provision_students<I, S>(students: &Coll<NewStudent>, numbers: I) -> Result<u64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut created = 0;
    for number in numbers {
        let number = number.as_ref().trim();
        if number.is_empty() {
            continue;
        }
        let result = students.insert_one(NewStudent::new(number), None).await;
        if is_duplicate_key_error(result.as_ref()) {
            continue;
        }
        result?;
        created += 1;
    }
    Ok(created)
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl StudentCore {
        pub fn example() -> Self {
            Self::new("20230001")
        }

        pub fn example2() -> Self {
            Self::new("20230002")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[backend_test]
    async fn authenticate_registered_student(
        students: Coll<Student>,
        new_students: Coll<NewStudent>,
    ) {
        new_students
            .insert_one(NewStudent::example(), None)
            .await
            .unwrap();

        let student = Student::authenticate(&students, &NewStudent::example().student_number)
            .await
            .unwrap();
        assert_eq!(student.student, NewStudent::example());
    }

    #[backend_test]
    async fn unknown_and_voted_students_fail_alike(
        students: Coll<Student>,
        new_students: Coll<NewStudent>,
    ) {
        let mut voted = NewStudent::example2();
        voted.voted = true;
        new_students.insert_one(voted, None).await.unwrap();

        let unknown = Student::authenticate(&students, "does-not-exist").await;
        let already_voted =
            Student::authenticate(&students, &NewStudent::example2().student_number).await;

        for result in [unknown, already_voted] {
            assert!(matches!(
                result,
                Err(Error::InvalidCredentials(STUDENT_LOGIN_FAILED))
            ));
        }
    }

    #[backend_test]
    async fn provisioning_skips_duplicates(students: Coll<NewStudent>) {
        let created = provision_students(&students, ["20230001", " 20230002 ", ""])
            .await
            .unwrap();
        assert_eq!(created, 2);

        let created = provision_students(&students, ["20230002", "20230003"])
            .await
            .unwrap();
        assert_eq!(created, 1);

        assert_eq!(students.count_documents(None, None).await.unwrap(), 3);
        let trimmed = students
            .find_one(doc! { "student_number": "20230002" }, None)
            .await
            .unwrap();
        assert!(trimmed.is_some());
    }
}
