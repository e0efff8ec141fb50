use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{PaginatorTrait, QueryFilter, QueryOrder, prelude::*};

use crate::{EngineError, ResultEngine, Transaction, transactions};

use super::super::Engine;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// One page of a listing. `page` is 1-based.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

fn validate_page(page: u64, page_size: u64) -> ResultEngine<()> {
    if page == 0 {
        return Err(EngineError::InvalidPage("page starts at 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(EngineError::InvalidPage(format!(
            "page_size must be within 1..={MAX_PAGE_SIZE}"
        )));
    }
    Ok(())
}

impl Engine {
    /// Lists the transactions of an asset, newest first.
    ///
    /// Ordering is `(occurred_at DESC, id DESC)` so pages are stable when
    /// several transactions share a timestamp.
    pub async fn list_transactions_by_asset(
        &self,
        asset_id: Uuid,
        user_id: &str,
        page: u64,
        page_size: u64,
    ) -> ResultEngine<Page<Transaction>> {
        validate_page(page, page_size)?;
        self.require_asset(&self.database, asset_id, user_id)
            .await?;

        let paginator = transactions::Entity::find()
            .filter(transactions::Column::AssetId.eq(asset_id))
            .filter(transactions::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id)
            .paginate(&self.database, page_size);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds() {
        assert!(validate_page(0, 10).is_err());
        assert!(validate_page(1, 0).is_err());
        assert!(validate_page(1, MAX_PAGE_SIZE + 1).is_err());
        assert!(validate_page(3, MAX_PAGE_SIZE).is_ok());
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<()> = Page {
            items: Vec::new(),
            page: 1,
            page_size: 10,
            total: 21,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
    }
}
