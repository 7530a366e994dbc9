//! Wire types of the CMS REST API and the query parameters sent with them.
use model::RawDocument;
use serde::{Deserialize, Serialize};

/// One ref (master, preview or release) advertised by the API root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

/// The API root document. Only the parts preview needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&ApiRef> {
        self.refs.iter().find(|r| r.is_master_ref)
    }

    pub fn find_ref(&self, id: &str) -> Option<&ApiRef> {
        self.refs.iter().find(|r| r.id == id)
    }
}

/// One page of a document search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub page: u32,
    #[serde(default)]
    pub results_per_page: u32,
    #[serde(default)]
    pub total_results_size: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub next_page: Option<String>,
    pub results: Vec<RawDocument>,
}

impl SearchPage {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Parameters shared by every document query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Content ref to read at; the master ref when `None`.
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub lang: Option<String>,
    #[serde(default)]
    pub fetch_links: Vec<String>,
    /// Raw `q` predicates, e.g. `[at(document.type,"page")]`.
    #[serde(default)]
    pub predicates: Vec<String>,
    pub page_size: Option<u32>,
}

impl QueryOptions {
    pub fn at_ref(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_fetch_links(mut self, fetch_links: Vec<String>) -> Self {
        self.fetch_links = fetch_links;
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Query string pairs, `q` repeated once per predicate.
    pub fn to_params(&self, page: Option<u32>) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(reference) = &self.reference {
            params.push(("ref".to_string(), reference.clone()));
        }
        for predicate in &self.predicates {
            params.push(("q".to_string(), format!("[{predicate}]")));
        }
        if let Some(lang) = &self.lang {
            params.push(("lang".to_string(), lang.clone()));
        }
        if !self.fetch_links.is_empty() {
            params.push(("fetchLinks".to_string(), self.fetch_links.join(",")));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize".to_string(), size.to_string()));
        }
        if let Some(page) = page {
            params.push(("page".to_string(), page.to_string()));
        }
        params
    }
}

/// `at(document.id, "...")`
pub fn id_predicate(id: &str) -> String {
    format!("at(document.id,{})", quote(id))
}

/// `in(document.id, [...])`
pub fn ids_predicate<S: AsRef<str>>(ids: &[S]) -> String {
    let list: Vec<String> = ids.iter().map(|id| quote(id.as_ref())).collect();
    format!("in(document.id,[{}])", list.join(","))
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}
