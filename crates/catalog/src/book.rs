use chrono::{DateTime, Utc};
use serde::Serialize;

use libris_core::{AuthorId, BookId, Entity};

use crate::form::{self, Form, FormErrors, Submission};
use crate::resource::Resource;

/// A stored book. Always owned by exactly one author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub summary: Option<String>,
    pub year: Option<i32>,
    pub author: AuthorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Build a freshly inserted book (both timestamps set to `now`).
    pub fn from_fields(id: BookId, fields: BookFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: fields.title,
            summary: fields.summary,
            year: fields.year,
            author: fields.author,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated, persistable book fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFields {
    pub title: String,
    pub summary: Option<String>,
    pub year: Option<i32>,
    pub author: AuthorId,
}

/// Book field set while a body is being bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookData {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub year: Option<i32>,
    pub author: Option<AuthorId>,
}

/// Input schema for books.
///
/// `author` only checks the shape of the reference; whether the author exists
/// is decided by the store when the book is written.
pub struct BookForm;

impl Form for BookForm {
    const FIELDS: &'static [&'static str] = &["title", "summary", "year", "author"];

    type Data = BookData;
    type Fields = BookFields;

    fn bind(data: &mut BookData, submission: &mut Submission<'_>) {
        submission.text("title", &mut data.title);
        submission.text("summary", &mut data.summary);
        submission.integer("year", &mut data.year);
        submission.reference("author", &mut data.author);
    }

    fn validate(data: BookData) -> Result<BookFields, FormErrors> {
        let mut errors = FormErrors::new();
        form::max_length(&mut errors, "title", data.title.as_deref());
        form::max_length(&mut errors, "summary", data.summary.as_deref());
        let title = form::required(&mut errors, "title", data.title);
        let author = form::required(&mut errors, "author", data.author);

        match (title, author) {
            (Some(title), Some(author)) if errors.is_empty() => Ok(BookFields {
                title,
                summary: data.summary,
                year: data.year,
                author,
            }),
            _ => Err(errors),
        }
    }
}

/// Public view of a book; `author` is the owning author's identifier.
#[derive(Debug, Clone, Serialize)]
pub struct BookView {
    pub id: BookId,
    pub title: String,
    pub summary: Option<String>,
    pub year: Option<i32>,
    pub author: AuthorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Book {
    type Id = BookId;

    fn id(&self) -> BookId {
        self.id
    }
}

impl Resource for Book {
    type Form = BookForm;
    type View = BookView;

    const LABEL: &'static str = "book";
    const EMPTY_LIST_MESSAGE: &'static str = "No entities found";

    fn form_data(&self) -> BookData {
        BookData {
            title: Some(self.title.clone()),
            summary: self.summary.clone(),
            year: self.year,
            author: Some(self.author),
        }
    }

    fn apply(&mut self, fields: BookFields) {
        self.title = fields.title;
        self.summary = fields.summary;
        self.year = fields.year;
        self.author = fields.author;
    }

    fn view(&self) -> BookView {
        BookView {
            id: self.id,
            title: self.title.clone(),
            summary: self.summary.clone(),
            year: self.year,
            author: self.author,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{submit, NOT_BLANK, NOT_VALID};
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn stored_book() -> Book {
        Book::from_fields(
            BookId::new(10).unwrap(),
            BookFields {
                title: "1984".into(),
                summary: Some("Big Brother".into()),
                year: Some(1949),
                author: AuthorId::new(1).unwrap(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn create_binds_all_fields() {
        let fields = submit::<BookForm>(
            BookData::default(),
            &body(json!({ "title": "1984", "year": 1949, "author": 1 })),
            true,
        )
        .unwrap();
        assert_eq!(fields.title, "1984");
        assert_eq!(fields.summary, None);
        assert_eq!(fields.year, Some(1949));
        assert_eq!(fields.author.get(), 1);
    }

    #[test]
    fn create_reports_every_missing_required_field() {
        let errors = submit::<BookForm>(BookData::default(), &body(json!({ "year": 1949 })), true).unwrap_err();
        assert_eq!(errors.field("title"), &[NOT_BLANK.to_string()]);
        assert_eq!(errors.field("author"), &[NOT_BLANK.to_string()]);
        assert!(!errors.has_field("year"));
    }

    #[test]
    fn malformed_values_are_not_also_reported_blank() {
        let errors = submit::<BookForm>(
            BookData::default(),
            &body(json!({ "title": "1984", "author": "abc", "year": "soon" })),
            true,
        )
        .unwrap_err();
        assert_eq!(errors.field("author"), &[NOT_VALID.to_string()]);
        assert_eq!(errors.field("year"), &[NOT_VALID.to_string()]);
    }

    #[test]
    fn author_reference_accepts_digit_strings() {
        let fields = submit::<BookForm>(
            BookData::default(),
            &body(json!({ "title": "Animal Farm", "author": "2" })),
            true,
        )
        .unwrap();
        assert_eq!(fields.author.get(), 2);
    }

    #[test]
    fn update_without_clear_keeps_omitted_fields() {
        let book = stored_book();
        let fields = submit::<BookForm>(book.form_data(), &body(json!({ "year": 1950 })), false).unwrap();
        assert_eq!(fields.title, "1984");
        assert_eq!(fields.summary.as_deref(), Some("Big Brother"));
        assert_eq!(fields.year, Some(1950));
        assert_eq!(fields.author, book.author);
    }

    #[test]
    fn update_with_null_required_field_fails() {
        let book = stored_book();
        let errors = submit::<BookForm>(book.form_data(), &body(json!({ "title": null })), false).unwrap_err();
        assert_eq!(errors.field("title"), &[NOT_BLANK.to_string()]);
    }

    #[test]
    fn view_exposes_author_id() {
        let view = serde_json::to_value(stored_book().view()).unwrap();
        assert_eq!(view["author"], 1);
        assert_eq!(view["title"], "1984");
        assert_eq!(view["year"], 1949);
    }

    proptest! {
        #[test]
        fn partial_update_preserves_untouched_fields(
            year in proptest::option::of(-3000i32..3000),
            send_title in any::<bool>(),
            send_summary in any::<bool>(),
            send_year in any::<bool>(),
        ) {
            let book = stored_book();
            let mut map = Map::new();
            if send_title {
                map.insert("title".into(), json!("Nineteen Eighty-Four"));
            }
            if send_summary {
                map.insert("summary".into(), json!("Dystopia"));
            }
            if send_year {
                map.insert("year".into(), json!(year));
            }

            let fields = submit::<BookForm>(book.form_data(), &map, false).unwrap();

            if send_title {
                prop_assert_eq!(fields.title.as_str(), "Nineteen Eighty-Four");
            } else {
                prop_assert_eq!(&fields.title, &book.title);
            }
            if send_summary {
                prop_assert_eq!(fields.summary.as_deref(), Some("Dystopia"));
            } else {
                prop_assert_eq!(&fields.summary, &book.summary);
            }
            if send_year {
                prop_assert_eq!(fields.year, year);
            } else {
                prop_assert_eq!(fields.year, book.year);
            }
            prop_assert_eq!(fields.author, book.author);
        }
    }
}
