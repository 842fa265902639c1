use crate::error::{ApiError, ApiResult};
use garde::Validate;
use novela_dal::{Batch, ListingParams, Order};
use serde::Serialize;

pub const MAX_PAGE_SIZE: u32 = 1000;

/// Query parameters of paginated listings, pages are numbered from 0
#[derive(Debug, Clone, Default, Validate, serde::Deserialize)]
#[serde(deny_unknown_fields)]
#[garde(allow_unvalidated)]
pub struct Paging {
    page: Option<u32>,
    #[garde(range(min = 1, max = MAX_PAGE_SIZE))]
    limit: Option<u32>,
    #[garde(length(max = 255))]
    sort: Option<String>,
}

fn parse_ordering(orderings: &str) -> ApiResult<Vec<Order>> {
    orderings
        .split(',')
        .map(|name| {
            let (field_name, descending) = match name.trim() {
                "" => {
                    return Err(ApiError::Validation("Empty ordering name".to_string()))
                }
                name if name.len() > 100 => {
                    return Err(ApiError::Validation("Ordering name too long".to_string()))
                }
                name if name.starts_with('+') => (&name[1..], false),
                name if name.starts_with('-') => (&name[1..], true),
                name => (name, false),
            };

            let order = if descending {
                Order::Desc(field_name.to_string())
            } else {
                Order::Asc(field_name.to_string())
            };

            Ok(order)
        })
        .collect()
}

impl Paging {
    pub fn new(page: u32, limit: u32) -> Self {
        Paging {
            page: Some(page),
            limit: Some(limit),
            sort: None,
        }
    }

    pub fn into_listing_params(self, default_page_size: u32) -> ApiResult<ListingParams> {
        let limit = self.limit(default_page_size);
        let offset = i64::from(self.page.unwrap_or(0)) * i64::from(limit);
        let params = ListingParams::new(offset, limit.into());
        match self.sort {
            Some(sort) => Ok(params.with_order(parse_ordering(&sort)?)),
            None => Ok(params),
        }
    }

    pub fn limit(&self, default_page_size: u32) -> u32 {
        self.limit.unwrap_or(default_page_size).clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    page: u32,
    limit: u32,
    total_pages: u32,
    total_count: u64,
    page_data: Vec<T>,
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl<T> Page<T>
where
    T: Serialize,
{
    pub fn from_batch(batch: Batch<T>, limit: u32) -> Self {
        let limit = limit.max(1);
        let offset = u64::try_from(batch.offset).unwrap_or(0);
        Self {
            page: saturating_u32(offset / u64::from(limit)),
            limit,
            total_pages: saturating_u32(batch.total.div_ceil(u64::from(limit))),
            total_count: batch.total,
            page_data: batch.rows,
        }
    }
}
