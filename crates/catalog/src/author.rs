use chrono::{DateTime, Utc};
use serde::Serialize;

use libris_core::{AuthorId, Entity};

use crate::form::{self, Form, FormErrors, Submission};
use crate::resource::Resource;

/// A stored author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Author {
    /// Build a freshly inserted author (both timestamps set to `now`).
    pub fn from_fields(id: AuthorId, fields: AuthorFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated, persistable author fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorFields {
    pub name: String,
}

/// Author field set while a body is being bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorData {
    pub name: Option<String>,
}

/// Input schema for authors.
pub struct AuthorForm;

impl Form for AuthorForm {
    const FIELDS: &'static [&'static str] = &["name"];

    type Data = AuthorData;
    type Fields = AuthorFields;

    fn bind(data: &mut AuthorData, submission: &mut Submission<'_>) {
        submission.text("name", &mut data.name);
    }

    fn validate(data: AuthorData) -> Result<AuthorFields, FormErrors> {
        let mut errors = FormErrors::new();
        form::max_length(&mut errors, "name", data.name.as_deref());
        let name = form::required(&mut errors, "name", data.name);

        match name {
            Some(name) if errors.is_empty() => Ok(AuthorFields { name }),
            _ => Err(errors),
        }
    }
}

/// Public view of an author.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: AuthorId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Author {
    type Id = AuthorId;

    fn id(&self) -> AuthorId {
        self.id
    }
}

impl Resource for Author {
    type Form = AuthorForm;
    type View = AuthorView;

    const LABEL: &'static str = "author";
    const EMPTY_LIST_MESSAGE: &'static str = "No authors found";

    fn form_data(&self) -> AuthorData {
        AuthorData {
            name: Some(self.name.clone()),
        }
    }

    fn apply(&mut self, fields: AuthorFields) {
        self.name = fields.name;
    }

    fn view(&self) -> AuthorView {
        AuthorView {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
