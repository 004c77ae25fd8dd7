//! List query resolution and page assembly

use crate::db::{ListPage, ListQuery};
use crate::errors::{AppError, Result};
use crate::flashcards::types::{FlashcardView, ListFlashcardsParams, PaginatedResponse, Pagination};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

/// Apply defaults and bounds to raw list parameters
pub fn resolve_list_query(params: ListFlashcardsParams) -> Result<ListQuery> {
    let page = params.page.unwrap_or(DEFAULT_PAGE);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    let mut fields = Vec::new();
    if page < 1 {
        fields.push("page".to_string());
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        fields.push("limit".to_string());
    }
    if !fields.is_empty() {
        return Err(AppError::Validation {
            message: format!(
                "page must be at least 1 and limit between 1 and {} (invalid: {})",
                MAX_LIMIT,
                fields.join(", ")
            ),
            fields,
        });
    }

    Ok(ListQuery {
        page,
        limit,
        sort: params.sort.unwrap_or_default(),
        order: params.order.unwrap_or_default(),
        source: params.source,
    })
}

/// Number of pages needed for `total` rows
pub fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}

/// Wrap a store page in the response envelope
pub fn paginate(page: ListPage, query: &ListQuery) -> PaginatedResponse<FlashcardView> {
    PaginatedResponse {
        data: page.items.into_iter().map(FlashcardView::from).collect(),
        pagination: Pagination {
            total: page.total,
            page: query.page,
            limit: query.limit,
            pages: page_count(page.total, query.limit),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SortField, SortOrder};

    #[test]
    fn test_defaults() {
        let query = resolve_list_query(ListFlashcardsParams::default()).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 20);
        assert_eq!(query.sort, SortField::CreatedAt);
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.source, None);
    }

    #[test]
    fn test_out_of_range_params() {
        let err = resolve_list_query(ListFlashcardsParams {
            page: Some(0),
            limit: Some(101),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.fields(), ["page".to_string(), "limit".to_string()]);

        let err = resolve_list_query(ListFlashcardsParams {
            limit: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.fields(), ["limit".to_string()]);

        assert!(resolve_list_query(ListFlashcardsParams {
            limit: Some(100),
            ..Default::default()
        })
        .is_ok());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(39, 20), 2);
    }

    #[test]
    fn test_page_beyond_last_is_empty() {
        let query = resolve_list_query(ListFlashcardsParams {
            page: Some(5),
            limit: Some(20),
            ..Default::default()
        })
        .unwrap();

        let response = paginate(ListPage { items: Vec::new(), total: 35 }, &query);
        assert!(response.data.is_empty());
        assert_eq!(
            response.pagination,
            Pagination { total: 35, page: 5, limit: 20, pages: 2 }
        );
    }

    #[test]
    fn test_huge_page_is_accepted_with_bounded_offset() {
        let query = resolve_list_query(ListFlashcardsParams {
            page: Some(u64::MAX / 50),
            limit: Some(100),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(query.offset(), crate::db::MAX_OFFSET);
        assert!(i64::try_from(query.offset()).is_ok());

        let response = paginate(ListPage { items: Vec::new(), total: 3 }, &query);
        assert!(response.data.is_empty());
        assert_eq!(response.pagination.page, u64::MAX / 50);
        assert_eq!(response.pagination.pages, 1);
    }
}
