use serde::{Deserialize, Serialize};

use crate::document::{DocumentId, Filter, FindOptions, Projection, Status, ID_FIELD};

/// Projectable question fields. The id is always returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionField {
    Title,
    IncludeIn,
    Weight,
    Order,
    Status,
    Category,
    CreatedAt,
}

impl QuestionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionField::Title => "title",
            QuestionField::IncludeIn => "include_in",
            QuestionField::Weight => "weight",
            QuestionField::Order => "order",
            QuestionField::Status => "status",
            QuestionField::Category => "category",
            QuestionField::CreatedAt => "created_at",
        }
    }
}

/// Batch lookup of questions by id, narrowed by tag and status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionCriteria {
    pub ids: Vec<DocumentId>,
    pub include_in: Option<String>,
    pub status: Option<Status>,
    pub projection: Option<Vec<QuestionField>>,
}

impl QuestionCriteria {
    pub fn by_ids(ids: impl IntoIterator<Item = DocumentId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn included_in(mut self, tag: impl Into<String>) -> Self {
        self.include_in = Some(tag.into());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn project(mut self, fields: impl IntoIterator<Item = QuestionField>) -> Self {
        self.projection = Some(fields.into_iter().collect());
        self
    }

    pub fn filter(&self) -> Filter {
        let mut filter = Filter::by_ids(&self.ids);
        if let Some(tag) = &self.include_in {
            filter = filter.contains("include_in", tag.as_str());
        }
        if let Some(status) = self.status {
            filter = filter.eq("status", status.as_str());
        }
        filter
    }

    pub fn find_options(&self) -> FindOptions {
        let options = FindOptions::default();
        match &self.projection {
            Some(fields) => options.with_projection(Projection::new(
                std::iter::once(ID_FIELD).chain(fields.iter().map(QuestionField::as_str)),
            )),
            None => options,
        }
    }
}
