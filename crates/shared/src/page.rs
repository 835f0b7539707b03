use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const DEFAULT_PER_PAGE: u64 = 20;
const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PageQuery {
  /// 1-based page number
  #[serde(default = "default_page")]
  pub page: u64,
  /// Items per page (1-100)
  #[serde(default = "default_per_page")]
  pub per_page: u64,
}

const fn default_page() -> u64 {
  1
}

const fn default_per_page() -> u64 {
  DEFAULT_PER_PAGE
}

impl Default for PageQuery {
  fn default() -> Self {
    Self {
      page: default_page(),
      per_page: default_per_page(),
    }
  }
}

impl PageQuery {
  #[must_use]
  pub fn per_page(&self) -> u64 {
    self.per_page.clamp(1, MAX_PER_PAGE)
  }

  /// Zero-based page index, as sea-orm paginators expect.
  #[must_use]
  pub const fn index(&self) -> u64 {
    self.page.saturating_sub(1)
  }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
  pub page: u64,
  pub per_page: u64,
}

impl<T> Page<T> {
  #[must_use]
  pub fn new(items: Vec<T>, total: u64, query: &PageQuery) -> Self {
    Self {
      items,
      total,
      page: query.index() + 1,
      per_page: query.per_page(),
    }
  }

  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      items: self.items.into_iter().map(f).collect(),
      total: self.total,
      page: self.page,
      per_page: self.per_page,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::PageQuery;

  #[test]
  fn clamps_per_page_and_page_index() {
    let query = PageQuery {
      page: 0,
      per_page: 500,
    };
    assert_eq!(query.per_page(), 100);
    assert_eq!(query.index(), 0);

    let query = PageQuery {
      page: 3,
      per_page: 0,
    };
    assert_eq!(query.per_page(), 1);
    assert_eq!(query.index(), 2);
  }
}
