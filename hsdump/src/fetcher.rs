use std::collections::VecDeque;

use log::debug;

use crate::api::helpscout::HelpScoutApi;
use crate::error::Result;
use crate::models::{Conversation, ConversationStub, PageCursor, QueryFilter, Tag};

/// Walks the conversation search one record at a time. Only the stubs of the
/// current page are held; each full conversation is requested when it is
/// about to be returned.
pub struct ConversationPager<'a, A: HelpScoutApi + ?Sized> {
    api: &'a mut A,
    filter: QueryFilter,
    cursor: Option<PageCursor>,
    pending: VecDeque<ConversationStub>,
}

impl<'a, A: HelpScoutApi + ?Sized> ConversationPager<'a, A> {
    pub fn new(api: &'a mut A, filter: QueryFilter) -> Self {
        Self {
            api,
            filter,
            cursor: None,
            pending: VecDeque::new(),
        }
    }

    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        self.cursor
    }

    /// Number of matches reported by the first page, requesting it if needed.
    pub async fn total_elements(&mut self) -> Result<u64> {
        if self.cursor.is_none() {
            self.fetch_next_page().await?;
        }
        Ok(self.cursor.map_or(0, |cursor| cursor.total_elements))
    }

    pub async fn next(&mut self) -> Result<Option<Conversation>> {
        loop {
            if let Some(stub) = self.pending.pop_front() {
                let conversation = self.api.get_conversation_details(stub.id).await?;
                return Ok(Some(conversation));
            }

            if self.is_exhausted() {
                return Ok(None);
            }

            self.fetch_next_page().await?;
        }
    }

    fn is_exhausted(&self) -> bool {
        match self.cursor {
            Some(cursor) => cursor.total_elements == 0 || cursor.is_last(),
            None => false,
        }
    }

    async fn fetch_next_page(&mut self) -> Result<()> {
        let requested = self.cursor.map_or(1, |cursor| cursor.number + 1);
        let page = self.api.list_conversations(&self.filter, requested).await?;

        let mut cursor = page.page;
        // never move backwards, whatever the server claims
        cursor.number = cursor.number.max(requested);

        debug!(
            "page {}/{} with {} conversations ({} total)",
            cursor.number,
            cursor.total_pages,
            page.embedded.conversations.len(),
            cursor.total_elements
        );

        if cursor.total_elements > 0 {
            self.pending.extend(page.embedded.conversations);
        }
        self.cursor = Some(cursor);

        Ok(())
    }
}

pub async fn list_all_tags<A: HelpScoutApi + ?Sized>(api: &mut A) -> Result<Vec<Tag>> {
    let mut tags = Vec::new();
    let mut page_number = 1;

    loop {
        let page = api.list_tags(page_number).await?;
        tags.extend(page.embedded.tags);

        if page.page.number.max(page_number) >= page.page.total_pages {
            break;
        }
        page_number += 1;
    }

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversationList, Page, TagList};
    use async_trait::async_trait;
    use serde_json::json;

    /// Serves `pages` of conversation ids and records every call.
    struct FakeApi {
        pages: Vec<Vec<u64>>,
        total_elements: u64,
        page_requests: Vec<u32>,
        detail_requests: Vec<u64>,
    }

    impl FakeApi {
        fn new(pages: Vec<Vec<u64>>) -> Self {
            let total_elements = pages.iter().map(|p| p.len() as u64).sum();
            Self {
                pages,
                total_elements,
                page_requests: Vec::new(),
                detail_requests: Vec::new(),
            }
        }
    }

    fn page_of<E>(embedded: E, number: u32, total_pages: u32, total_elements: u64) -> Page<E> {
        Page {
            embedded,
            page: PageCursor {
                number,
                total_pages,
                total_elements,
            },
        }
    }

    #[async_trait]
    impl HelpScoutApi for FakeApi {
        async fn list_conversations(
            &mut self,
            _filter: &QueryFilter,
            page: u32,
        ) -> Result<Page<ConversationList>> {
            self.page_requests.push(page);
            let ids = self
                .pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default();
            Ok(page_of(
                ConversationList {
                    conversations: ids.into_iter().map(|id| ConversationStub { id }).collect(),
                },
                page,
                self.pages.len() as u32,
                self.total_elements,
            ))
        }

        async fn get_conversation_details(&mut self, conversation_id: u64) -> Result<Conversation> {
            self.detail_requests.push(conversation_id);
            Ok(serde_json::from_value(json!({"id": conversation_id, "_embedded": {"threads": []}}))?)
        }

        async fn list_tags(&mut self, page: u32) -> Result<Page<TagList>> {
            let tag = Tag {
                id: page as u64,
                name: format!("tag-{}", page),
                slug: format!("tag-{}", page),
                color: None,
                ticket_count: 1,
            };
            Ok(page_of(TagList { tags: vec![tag] }, page, 3, 3))
        }
    }

    fn filter() -> QueryFilter {
        use chrono::{TimeZone, Utc};
        QueryFilter::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    async fn collect_ids(api: &mut FakeApi) -> Vec<u64> {
        let mut pager = ConversationPager::new(api, filter());
        let mut ids = Vec::new();
        while let Some(conversation) = pager.next().await.unwrap() {
            ids.push(conversation.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_empty_result_stops_after_first_page() {
        let mut api = FakeApi::new(vec![]);

        let mut pager = ConversationPager::new(&mut api, filter());
        assert_eq!(pager.total_elements().await.unwrap(), 0);
        assert!(pager.next().await.unwrap().is_none());

        assert_eq!(api.page_requests, vec![1]);
        assert!(api.detail_requests.is_empty());
    }

    #[tokio::test]
    async fn test_records_follow_page_order() {
        let mut api = FakeApi::new(vec![vec![30, 10], vec![20], vec![50, 40]]);

        let ids = collect_ids(&mut api).await;

        assert_eq!(ids, vec![30, 10, 20, 50, 40]);
        assert_eq!(api.page_requests, vec![1, 2, 3]);
        assert_eq!(api.detail_requests, ids);
    }

    #[tokio::test]
    async fn test_page_count_does_not_change_records() {
        let mut single = FakeApi::new(vec![vec![1, 2, 3, 4]]);
        let mut split = FakeApi::new(vec![vec![1], vec![2, 3], vec![4]]);

        assert_eq!(collect_ids(&mut single).await, collect_ids(&mut split).await);
        assert_eq!(single.page_requests, vec![1]);
        assert_eq!(split.page_requests, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_total_elements_does_not_refetch_first_page() {
        let mut api = FakeApi::new(vec![vec![1], vec![2]]);

        let mut pager = ConversationPager::new(&mut api, filter());
        assert_eq!(pager.total_elements().await.unwrap(), 2);
        assert_eq!(pager.total_elements().await.unwrap(), 2);
        assert_eq!(pager.next().await.unwrap().map(|c| c.id), Some(1));
        assert_eq!(pager.cursor().map(|c| c.number), Some(1));

        assert_eq!(api.page_requests, vec![1]);
    }

    #[tokio::test]
    async fn test_list_all_tags_walks_every_page() {
        let mut api = FakeApi::new(vec![]);

        let tags = list_all_tags(&mut api).await.unwrap();

        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["tag-1", "tag-2", "tag-3"]);
    }
}
