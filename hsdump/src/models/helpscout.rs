use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Pagination block returned with every list response.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    pub number: u32,
    pub total_pages: u32,
    pub total_elements: u64,
}

impl PageCursor {
    pub fn is_last(&self) -> bool {
        self.number >= self.total_pages
    }
}

#[derive(Debug, Deserialize)]
pub struct Page<E> {
    #[serde(rename = "_embedded", default)]
    pub embedded: E,
    pub page: PageCursor,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationList {
    #[serde(default)]
    pub conversations: Vec<ConversationStub>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagList {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConversationStub {
    pub id: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub ticket_count: u64,
}

/// A full conversation as returned by the detail endpoint. Only `id` is
/// interpreted; everything else is carried through untouched so the saved
/// file matches what the API sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// The subset of a saved conversation the summary needs. Every field is
/// optional because older exports and partial records lack some of them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationDigest {
    pub id: Option<u64>,
    pub subject: Option<String>,
    pub primary_customer: Option<Customer>,
    pub tags: Option<Vec<ConversationTag>>,
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
    #[serde(rename = "_embedded")]
    pub embedded: Option<EmbeddedThreads>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub first: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConversationTag {
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddedThreads {
    pub threads: Option<Vec<Thread>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thread {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub created_at: Option<String>,
    pub created_by: Option<Creator>,
    pub body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Creator {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl Thread {
    /// Line items and internal notes never reach the customer.
    pub fn is_conversational(&self) -> bool {
        !matches!(self.kind.as_deref(), Some("lineitem") | Some("note"))
    }

    pub fn is_from_customer(&self) -> bool {
        self.created_by
            .as_ref()
            .and_then(|creator| creator.kind.as_deref())
            == Some("customer")
    }
}
