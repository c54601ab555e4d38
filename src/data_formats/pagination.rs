use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::errors::RequestError;

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn with_results<U>(self, results: Vec<U>) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results,
        }
    }
}

/// Slices an ordered sequence into the requested page.
pub fn paginate<T>(
    items: Vec<T>,
    params: PageParams,
    default_size: u32,
    uri: &Uri,
) -> Result<Page<T>, RequestError> {
    let page = params.page.unwrap_or(1);
    let size = params.limit.filter(|limit| *limit > 0).unwrap_or(default_size) as usize;
    if page == 0 {
        return Err(RequestError::NotFound("Invalid page"));
    }
    let count = items.len();
    let start = (page as usize - 1) * size;
    if start >= count && page != 1 {
        return Err(RequestError::NotFound("Invalid page"));
    }
    let results: Vec<T> = items.into_iter().skip(start).take(size).collect();
    let next = (start + size < count).then(|| page_link(uri, page + 1));
    let previous = (page > 1).then(|| page_link(uri, page - 1));
    Ok(Page {
        count,
        next,
        previous,
        results,
    })
}

fn page_link(uri: &Uri, page: u32) -> String {
    let mut query: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("page="))
        .collect();
    let page = format!("page={page}");
    query.push(&page);
    format!("{}?{}", uri.path(), query.join("&"))
}
